//! Post repository
//!
//! Listings are newest first. Row ids grow with insertion time, so they break ties
//! between posts created within the same instant.

use crate::domain::{AccountId, Post, PostId};
use crate::errors::{Error, Result};
use crate::storage::DbPool;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use tracing::instrument;

#[derive(Debug, Clone, FromRow)]
struct PostRow {
    pub id: i64,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub author_id: i64,
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        Post {
            id: PostId::new(row.id),
            body: row.body,
            created_at: row.created_at,
            author_id: AccountId::new(row.author_id),
        }
    }
}

#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn create_post(&self, author: AccountId, body: &str) -> Result<Post>;

    async fn get_post(&self, id: PostId) -> Result<Option<Post>>;

    async fn update_body(&self, id: PostId, body: &str) -> Result<Post>;

    async fn count_posts(&self) -> Result<i64>;

    async fn list_posts(&self, offset: i64, limit: i64) -> Result<Vec<Post>>;

    async fn count_by_author(&self, author: AccountId) -> Result<i64>;

    async fn list_by_author(&self, author: AccountId, offset: i64, limit: i64)
        -> Result<Vec<Post>>;

    /// Posts written by the accounts `reader` follows.
    async fn count_timeline(&self, reader: AccountId) -> Result<i64>;

    async fn list_timeline(&self, reader: AccountId, offset: i64, limit: i64)
        -> Result<Vec<Post>>;
}

#[derive(Debug, Clone)]
pub struct SqlxPostRepository {
    pool: DbPool,
}

impl SqlxPostRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PostRepository for SqlxPostRepository {
    #[instrument(skip(self, body), fields(author = %author), name = "db_create_post")]
    async fn create_post(&self, author: AccountId, body: &str) -> Result<Post> {
        let result =
            sqlx::query("INSERT INTO posts (body, created_at, author_id) VALUES ($1, $2, $3)")
                .bind(body)
                .bind(Utc::now())
                .bind(author)
                .execute(&self.pool)
                .await
                .map_err(|err| Error::database(err, "Failed to create post"))?;

        let id = PostId::new(result.last_insert_rowid());
        self.get_post(id).await?.ok_or_else(|| Error::internal("Post not found after creation"))
    }

    #[instrument(skip(self), fields(post_id = %id), name = "db_get_post")]
    async fn get_post(&self, id: PostId) -> Result<Option<Post>> {
        let row = sqlx::query_as::<_, PostRow>(
            "SELECT id, body, created_at, author_id FROM posts WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| Error::database(err, "Failed to fetch post"))?;

        Ok(row.map(Post::from))
    }

    #[instrument(skip(self, body), fields(post_id = %id), name = "db_update_post")]
    async fn update_body(&self, id: PostId, body: &str) -> Result<Post> {
        let result = sqlx::query("UPDATE posts SET body = $1 WHERE id = $2")
            .bind(body)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|err| Error::database(err, "Failed to update post"))?;

        if result.rows_affected() == 0 {
            return Err(Error::not_found("post", id.to_string()));
        }
        self.get_post(id).await?.ok_or_else(|| Error::not_found("post", id.to_string()))
    }

    #[instrument(skip(self), name = "db_count_posts")]
    async fn count_posts(&self) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM posts")
            .fetch_one(&self.pool)
            .await
            .map_err(|err| Error::database(err, "Failed to count posts"))?;

        Ok(count)
    }

    #[instrument(skip(self), name = "db_list_posts")]
    async fn list_posts(&self, offset: i64, limit: i64) -> Result<Vec<Post>> {
        let rows = sqlx::query_as::<_, PostRow>(
            "SELECT id, body, created_at, author_id FROM posts ORDER BY id DESC LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|err| Error::database(err, "Failed to list posts"))?;

        Ok(rows.into_iter().map(Post::from).collect())
    }

    #[instrument(skip(self), fields(author = %author), name = "db_count_posts_by_author")]
    async fn count_by_author(&self, author: AccountId) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM posts WHERE author_id = $1")
            .bind(author)
            .fetch_one(&self.pool)
            .await
            .map_err(|err| Error::database(err, "Failed to count posts by author"))?;

        Ok(count)
    }

    #[instrument(skip(self), fields(author = %author), name = "db_list_posts_by_author")]
    async fn list_by_author(
        &self,
        author: AccountId,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Post>> {
        let rows = sqlx::query_as::<_, PostRow>(
            r#"
            SELECT id, body, created_at, author_id FROM posts
            WHERE author_id = $1
            ORDER BY id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(author)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|err| Error::database(err, "Failed to list posts by author"))?;

        Ok(rows.into_iter().map(Post::from).collect())
    }

    #[instrument(skip(self), fields(reader = %reader), name = "db_count_timeline")]
    async fn count_timeline(&self, reader: AccountId) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM posts p
            JOIN follows f ON f.followed_id = p.author_id
            WHERE f.follower_id = $1
            "#,
        )
        .bind(reader)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| Error::database(err, "Failed to count timeline"))?;

        Ok(count)
    }

    #[instrument(skip(self), fields(reader = %reader), name = "db_list_timeline")]
    async fn list_timeline(
        &self,
        reader: AccountId,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Post>> {
        let rows = sqlx::query_as::<_, PostRow>(
            r#"
            SELECT p.id, p.body, p.created_at, p.author_id FROM posts p
            JOIN follows f ON f.followed_id = p.author_id
            WHERE f.follower_id = $1
            ORDER BY p.id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(reader)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|err| Error::database(err, "Failed to list timeline"))?;

        Ok(rows.into_iter().map(Post::from).collect())
    }
}
