//! Follow graph repository

use crate::domain::{AccountId, FollowEntry};
use crate::errors::{Error, Result};
use crate::storage::DbPool;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use tracing::instrument;

#[derive(Debug, Clone, FromRow)]
struct FollowEntryRow {
    pub account_id: i64,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

impl From<FollowEntryRow> for FollowEntry {
    fn from(row: FollowEntryRow) -> Self {
        FollowEntry {
            account_id: AccountId::new(row.account_id),
            username: row.username,
            since: row.created_at,
        }
    }
}

#[async_trait]
pub trait FollowRepository: Send + Sync {
    /// Record that `follower` follows `followed`. Returns false if the edge already existed.
    async fn follow(&self, follower: AccountId, followed: AccountId) -> Result<bool>;

    /// Remove the edge. Returns false if there was nothing to remove.
    async fn unfollow(&self, follower: AccountId, followed: AccountId) -> Result<bool>;

    async fn is_following(&self, follower: AccountId, followed: AccountId) -> Result<bool>;

    async fn count_followers(&self, account: AccountId) -> Result<i64>;

    async fn count_following(&self, account: AccountId) -> Result<i64>;

    /// Accounts following `account`, newest edge first.
    async fn list_followers(
        &self,
        account: AccountId,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<FollowEntry>>;

    /// Accounts `account` follows, newest edge first.
    async fn list_following(
        &self,
        account: AccountId,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<FollowEntry>>;
}

#[derive(Debug, Clone)]
pub struct SqlxFollowRepository {
    pool: DbPool,
}

impl SqlxFollowRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FollowRepository for SqlxFollowRepository {
    #[instrument(
        skip(self),
        fields(follower = %follower, followed = %followed),
        name = "db_follow"
    )]
    async fn follow(&self, follower: AccountId, followed: AccountId) -> Result<bool> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO follows (follower_id, followed_id, created_at) VALUES ($1, $2, $3)",
        )
        .bind(follower)
        .bind(followed)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|err| Error::database(err, "Failed to create follow"))?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(
        skip(self),
        fields(follower = %follower, followed = %followed),
        name = "db_unfollow"
    )]
    async fn unfollow(&self, follower: AccountId, followed: AccountId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM follows WHERE follower_id = $1 AND followed_id = $2")
            .bind(follower)
            .bind(followed)
            .execute(&self.pool)
            .await
            .map_err(|err| Error::database(err, "Failed to delete follow"))?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), name = "db_is_following")]
    async fn is_following(&self, follower: AccountId, followed: AccountId) -> Result<bool> {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM follows WHERE follower_id = $1 AND followed_id = $2)",
        )
        .bind(follower)
        .bind(followed)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| Error::database(err, "Failed to check follow"))?;

        Ok(exists)
    }

    #[instrument(skip(self), name = "db_count_followers")]
    async fn count_followers(&self, account: AccountId) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM follows WHERE followed_id = $1")
            .bind(account)
            .fetch_one(&self.pool)
            .await
            .map_err(|err| Error::database(err, "Failed to count followers"))?;

        Ok(count)
    }

    #[instrument(skip(self), name = "db_count_following")]
    async fn count_following(&self, account: AccountId) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM follows WHERE follower_id = $1")
            .bind(account)
            .fetch_one(&self.pool)
            .await
            .map_err(|err| Error::database(err, "Failed to count followed accounts"))?;

        Ok(count)
    }

    #[instrument(skip(self), name = "db_list_followers")]
    async fn list_followers(
        &self,
        account: AccountId,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<FollowEntry>> {
        let rows = sqlx::query_as::<_, FollowEntryRow>(
            r#"
            SELECT a.id AS account_id, a.username, f.created_at
            FROM follows f
            JOIN accounts a ON a.id = f.follower_id
            WHERE f.followed_id = $1
            ORDER BY f.created_at DESC, a.id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(account)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|err| Error::database(err, "Failed to list followers"))?;

        Ok(rows.into_iter().map(FollowEntry::from).collect())
    }

    #[instrument(skip(self), name = "db_list_following")]
    async fn list_following(
        &self,
        account: AccountId,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<FollowEntry>> {
        let rows = sqlx::query_as::<_, FollowEntryRow>(
            r#"
            SELECT a.id AS account_id, a.username, f.created_at
            FROM follows f
            JOIN accounts a ON a.id = f.followed_id
            WHERE f.follower_id = $1
            ORDER BY f.created_at DESC, a.id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(account)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|err| Error::database(err, "Failed to list followed accounts"))?;

        Ok(rows.into_iter().map(FollowEntry::from).collect())
    }
}
