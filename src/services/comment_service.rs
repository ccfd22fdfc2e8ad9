//! Comment and moderation business logic

use std::sync::Arc;

use tracing::{info, instrument};

use crate::auth::authorization::{require, require_account};
use crate::auth::{AuthError, Permission, Principal};
use crate::domain::{Comment, CommentId, PostId};
use crate::pagination::Page;
use crate::services::fetch_page;
use crate::storage::{CommentRepository, DbPool, PostRepository};
use crate::storage::{SqlxCommentRepository, SqlxPostRepository};

#[derive(Clone)]
pub struct CommentService {
    posts: Arc<dyn PostRepository>,
    comments: Arc<dyn CommentRepository>,
}

impl CommentService {
    pub fn new(posts: Arc<dyn PostRepository>, comments: Arc<dyn CommentRepository>) -> Self {
        Self { posts, comments }
    }

    pub fn with_sqlx(pool: DbPool) -> Self {
        Self::new(
            Arc::new(SqlxPostRepository::new(pool.clone())),
            Arc::new(SqlxCommentRepository::new(pool)),
        )
    }

    async fn ensure_post(&self, id: PostId) -> Result<(), AuthError> {
        match self.posts.get_post(id).await? {
            Some(_) => Ok(()),
            None => Err(AuthError::not_found("post", id)),
        }
    }

    #[instrument(skip(self, actor, body), fields(post_id = %post, author = ?actor.account_id()))]
    pub async fn add_comment(
        &self,
        actor: &Principal,
        post: PostId,
        body: &str,
    ) -> Result<Comment, AuthError> {
        require(actor, Permission::COMMENT)?;
        let author = require_account(actor)?.id;
        let body = body.trim();
        if body.is_empty() {
            return Err(AuthError::Validation("Comment body cannot be empty".into()));
        }
        self.ensure_post(post).await?;

        let comment = self.comments.create_comment(post, author, body).await?;
        info!(comment_id = %comment.id, "comment added");
        Ok(comment)
    }

    pub async fn get_comment(&self, id: CommentId) -> Result<Comment, AuthError> {
        self.comments.get_comment(id).await?.ok_or_else(|| AuthError::not_found("comment", id))
    }

    /// Enable or disable a comment. Requires `MODERATE_COMMENTS`.
    #[instrument(skip(self, actor), fields(moderator = ?actor.account_id()))]
    pub async fn moderate(
        &self,
        actor: &Principal,
        id: CommentId,
        disabled: bool,
    ) -> Result<Comment, AuthError> {
        require(actor, Permission::MODERATE_COMMENTS)?;
        self.get_comment(id).await?;

        let comment = self.comments.set_disabled(id, disabled).await?;
        info!(comment_id = %id, disabled, "comment moderated");
        Ok(comment)
    }

    pub async fn list_comments(
        &self,
        page: i64,
        page_size: u32,
    ) -> Result<Page<Comment>, AuthError> {
        let total = self.comments.count_comments().await?;
        let comments = self.comments.clone();
        Ok(fetch_page(total, page, page_size, |offset, limit| async move {
            comments.list_comments(offset, limit).await
        })
        .await?)
    }

    pub async fn list_for_post(
        &self,
        post: PostId,
        page: i64,
        page_size: u32,
    ) -> Result<Page<Comment>, AuthError> {
        self.ensure_post(post).await?;
        let total = self.comments.count_for_post(post).await?;
        let comments = self.comments.clone();
        Ok(fetch_page(total, page, page_size, |offset, limit| async move {
            comments.list_for_post(post, offset, limit).await
        })
        .await?)
    }

    pub async fn comment_count(&self, post: PostId) -> Result<i64, AuthError> {
        Ok(self.comments.count_for_post(post).await?)
    }
}
