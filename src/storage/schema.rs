//! # Schema Bootstrap
//!
//! Idempotent `CREATE ... IF NOT EXISTS` statements for the tables the
//! repositories read and write. Uniqueness of role names, account emails and
//! usernames is enforced here, not only by application checks.

use crate::errors::{Error, Result};
use crate::storage::DbPool;
use tracing::info;

const STATEMENTS: &[(&str, &str)] = &[
    (
        "roles",
        r#"
        CREATE TABLE IF NOT EXISTS roles (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            permissions INTEGER NOT NULL,
            is_default BOOLEAN NOT NULL DEFAULT 0
        )
        "#,
    ),
    (
        "accounts",
        r#"
        CREATE TABLE IF NOT EXISTS accounts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            email TEXT NOT NULL UNIQUE,
            username TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            role_id INTEGER NOT NULL REFERENCES roles(id),
            confirmed BOOLEAN NOT NULL DEFAULT 0,
            name TEXT,
            location TEXT,
            about_me TEXT,
            member_since TEXT NOT NULL,
            last_seen TEXT NOT NULL
        )
        "#,
    ),
    (
        "follows",
        r#"
        CREATE TABLE IF NOT EXISTS follows (
            follower_id INTEGER NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
            followed_id INTEGER NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
            created_at TEXT NOT NULL,
            PRIMARY KEY (follower_id, followed_id)
        )
        "#,
    ),
    (
        "posts",
        r#"
        CREATE TABLE IF NOT EXISTS posts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            body TEXT NOT NULL,
            created_at TEXT NOT NULL,
            author_id INTEGER NOT NULL REFERENCES accounts(id) ON DELETE CASCADE
        )
        "#,
    ),
    (
        "comments",
        r#"
        CREATE TABLE IF NOT EXISTS comments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            body TEXT NOT NULL,
            created_at TEXT NOT NULL,
            disabled BOOLEAN NOT NULL DEFAULT 0,
            author_id INTEGER NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
            post_id INTEGER NOT NULL REFERENCES posts(id) ON DELETE CASCADE
        )
        "#,
    ),
    (
        "idx_posts_created_at",
        "CREATE INDEX IF NOT EXISTS idx_posts_created_at ON posts (created_at)",
    ),
    ("idx_posts_author", "CREATE INDEX IF NOT EXISTS idx_posts_author ON posts (author_id)"),
    ("idx_comments_post", "CREATE INDEX IF NOT EXISTS idx_comments_post ON comments (post_id)"),
    (
        "idx_follows_followed",
        "CREATE INDEX IF NOT EXISTS idx_follows_followed ON follows (followed_id)",
    ),
];

/// Create every table and index that does not exist yet.
pub async fn bootstrap(pool: &DbPool) -> Result<()> {
    for (name, statement) in STATEMENTS {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(|e| Error::database(e, format!("Failed to create schema object '{}'", name)))?;
    }

    info!(objects = STATEMENTS.len(), "Database schema ready");
    Ok(())
}
