//! # Penwright
//!
//! Account lifecycle, role-based permissions and a paginated JSON API for a
//! small blogging service.
//!
//! ## Architecture
//!
//! ```text
//! REST API (axum) → Services → Repositories (SQLx/SQLite)
//!      ↓               ↓
//!  Basic auth     Token codec, permissions, mailer
//! ```
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use penwright::{config::AppConfig, storage::create_pool, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = AppConfig::load(None)?;
//!     let pool = create_pool(&config.database).await?;
//!     penwright::auth::seed_roles(&penwright::storage::SqlxRoleRepository::new(pool)).await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod domain;
pub mod errors;
pub mod mail;
pub mod observability;
pub mod pagination;
pub mod services;
pub mod storage;

pub use config::AppConfig;
pub use errors::{Error, Result};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_available() {
        assert!(!VERSION.is_empty());
        assert_eq!(APP_NAME, "penwright");
    }
}
