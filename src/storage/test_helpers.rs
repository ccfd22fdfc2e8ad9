//! Test database utilities for in-library tests.
//!
//! Each call opens a private in-memory SQLite database with the schema applied
//! and the standard roles seeded.

use crate::auth::role::seed_roles;
use crate::config::DatabaseConfig;
use crate::storage::{create_pool, DbPool, SqlxRoleRepository};

pub async fn memory_pool() -> DbPool {
    let config = DatabaseConfig { url: "sqlite::memory:".to_string(), ..Default::default() };
    let pool = create_pool(&config).await.expect("in-memory pool");
    seed_roles(&SqlxRoleRepository::new(pool.clone())).await.expect("seed roles");
    pool
}
