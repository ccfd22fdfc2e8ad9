//! Domain layer
//!
//! Identifier types and content records shared by the storage, service and API layers.

pub mod content;
pub mod id;

pub use content::{Comment, FollowEntry, Post};
pub use id::{AccountId, CommentId, PostId, RoleId};
