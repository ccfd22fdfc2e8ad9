//! # Storage and Persistence
//!
//! SQLite connectivity, schema bootstrap and the repositories backing accounts,
//! roles, follows, posts and comments.

pub mod pool;
pub mod repositories;
pub mod schema;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use crate::config::DatabaseConfig;

pub use pool::{check_connection, create_pool, DbPool};
pub use repositories::{
    AccountRepository, CommentRepository, FollowRepository, PostRepository, RoleRepository,
    SqlxAccountRepository, SqlxCommentRepository, SqlxFollowRepository, SqlxPostRepository,
    SqlxRoleRepository,
};
