//! Repository modules for data access
//!
//! Each repository pairs an async trait with its SQLx SQLite implementation.

pub mod account;
pub mod comment;
pub mod follow;
pub mod post;
pub mod role;

pub use account::{AccountRepository, SqlxAccountRepository};
pub use comment::{CommentRepository, SqlxCommentRepository};
pub use follow::{FollowRepository, SqlxFollowRepository};
pub use post::{PostRepository, SqlxPostRepository};
pub use role::{RoleRepository, SqlxRoleRepository};
