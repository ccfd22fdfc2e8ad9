//! Comment repository
//!
//! Comments under a post read oldest first; the global moderation listing reads
//! newest first.

use crate::domain::{AccountId, Comment, CommentId, PostId};
use crate::errors::{Error, Result};
use crate::storage::DbPool;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use tracing::instrument;

#[derive(Debug, Clone, FromRow)]
struct CommentRow {
    pub id: i64,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub disabled: bool,
    pub author_id: i64,
    pub post_id: i64,
}

impl From<CommentRow> for Comment {
    fn from(row: CommentRow) -> Self {
        Comment {
            id: CommentId::new(row.id),
            body: row.body,
            created_at: row.created_at,
            disabled: row.disabled,
            author_id: AccountId::new(row.author_id),
            post_id: PostId::new(row.post_id),
        }
    }
}

const COMMENT_COLUMNS: &str = "id, body, created_at, disabled, author_id, post_id";

#[async_trait]
pub trait CommentRepository: Send + Sync {
    async fn create_comment(&self, post: PostId, author: AccountId, body: &str)
        -> Result<Comment>;

    async fn get_comment(&self, id: CommentId) -> Result<Option<Comment>>;

    async fn set_disabled(&self, id: CommentId, disabled: bool) -> Result<Comment>;

    async fn count_comments(&self) -> Result<i64>;

    async fn list_comments(&self, offset: i64, limit: i64) -> Result<Vec<Comment>>;

    async fn count_for_post(&self, post: PostId) -> Result<i64>;

    async fn list_for_post(&self, post: PostId, offset: i64, limit: i64)
        -> Result<Vec<Comment>>;
}

#[derive(Debug, Clone)]
pub struct SqlxCommentRepository {
    pool: DbPool,
}

impl SqlxCommentRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CommentRepository for SqlxCommentRepository {
    #[instrument(
        skip(self, body),
        fields(post_id = %post, author = %author),
        name = "db_create_comment"
    )]
    async fn create_comment(
        &self,
        post: PostId,
        author: AccountId,
        body: &str,
    ) -> Result<Comment> {
        let result = sqlx::query(
            "INSERT INTO comments (body, created_at, disabled, author_id, post_id) VALUES ($1, $2, 0, $3, $4)",
        )
        .bind(body)
        .bind(Utc::now())
        .bind(author)
        .bind(post)
        .execute(&self.pool)
        .await
        .map_err(|err| Error::database(err, "Failed to create comment"))?;

        let id = CommentId::new(result.last_insert_rowid());
        self.get_comment(id)
            .await?
            .ok_or_else(|| Error::internal("Comment not found after creation"))
    }

    #[instrument(skip(self), fields(comment_id = %id), name = "db_get_comment")]
    async fn get_comment(&self, id: CommentId) -> Result<Option<Comment>> {
        let row = sqlx::query_as::<_, CommentRow>(&format!(
            "SELECT {} FROM comments WHERE id = $1",
            COMMENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| Error::database(err, "Failed to fetch comment"))?;

        Ok(row.map(Comment::from))
    }

    #[instrument(skip(self), fields(comment_id = %id), name = "db_set_comment_disabled")]
    async fn set_disabled(&self, id: CommentId, disabled: bool) -> Result<Comment> {
        let result = sqlx::query("UPDATE comments SET disabled = $1 WHERE id = $2")
            .bind(disabled)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|err| Error::database(err, "Failed to moderate comment"))?;

        if result.rows_affected() == 0 {
            return Err(Error::not_found("comment", id.to_string()));
        }
        self.get_comment(id).await?.ok_or_else(|| Error::not_found("comment", id.to_string()))
    }

    #[instrument(skip(self), name = "db_count_comments")]
    async fn count_comments(&self) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM comments")
            .fetch_one(&self.pool)
            .await
            .map_err(|err| Error::database(err, "Failed to count comments"))?;

        Ok(count)
    }

    #[instrument(skip(self), name = "db_list_comments")]
    async fn list_comments(&self, offset: i64, limit: i64) -> Result<Vec<Comment>> {
        let rows = sqlx::query_as::<_, CommentRow>(&format!(
            "SELECT {} FROM comments ORDER BY id DESC LIMIT $1 OFFSET $2",
            COMMENT_COLUMNS
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|err| Error::database(err, "Failed to list comments"))?;

        Ok(rows.into_iter().map(Comment::from).collect())
    }

    #[instrument(skip(self), fields(post_id = %post), name = "db_count_post_comments")]
    async fn count_for_post(&self, post: PostId) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM comments WHERE post_id = $1")
            .bind(post)
            .fetch_one(&self.pool)
            .await
            .map_err(|err| Error::database(err, "Failed to count post comments"))?;

        Ok(count)
    }

    #[instrument(skip(self), fields(post_id = %post), name = "db_list_post_comments")]
    async fn list_for_post(
        &self,
        post: PostId,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Comment>> {
        let rows = sqlx::query_as::<_, CommentRow>(&format!(
            "SELECT {} FROM comments WHERE post_id = $1 ORDER BY id ASC LIMIT $2 OFFSET $3",
            COMMENT_COLUMNS
        ))
        .bind(post)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|err| Error::database(err, "Failed to list post comments"))?;

        Ok(rows.into_iter().map(Comment::from).collect())
    }
}
