//! Post business logic

use std::sync::Arc;

use tracing::{info, instrument};

use crate::auth::authorization::{require, require_account, require_owner_or_admin};
use crate::auth::{AuthError, Permission, Principal};
use crate::domain::{AccountId, Post, PostId};
use crate::pagination::Page;
use crate::services::fetch_page;
use crate::storage::{AccountRepository, DbPool, PostRepository};
use crate::storage::{SqlxAccountRepository, SqlxPostRepository};

#[derive(Clone)]
pub struct PostService {
    accounts: Arc<dyn AccountRepository>,
    posts: Arc<dyn PostRepository>,
}

fn validate_body(body: &str) -> Result<&str, AuthError> {
    let body = body.trim();
    if body.is_empty() {
        return Err(AuthError::Validation("Post body cannot be empty".into()));
    }
    Ok(body)
}

impl PostService {
    pub fn new(accounts: Arc<dyn AccountRepository>, posts: Arc<dyn PostRepository>) -> Self {
        Self { accounts, posts }
    }

    pub fn with_sqlx(pool: DbPool) -> Self {
        Self::new(
            Arc::new(SqlxAccountRepository::new(pool.clone())),
            Arc::new(SqlxPostRepository::new(pool)),
        )
    }

    #[instrument(skip(self, actor, body), fields(author = ?actor.account_id()))]
    pub async fn create_post(&self, actor: &Principal, body: &str) -> Result<Post, AuthError> {
        require(actor, Permission::WRITE_ARTICLES)?;
        let author = require_account(actor)?.id;
        let body = validate_body(body)?;

        let post = self.posts.create_post(author, body).await?;
        info!(post_id = %post.id, "post created");
        Ok(post)
    }

    pub async fn get_post(&self, id: PostId) -> Result<Post, AuthError> {
        self.posts.get_post(id).await?.ok_or_else(|| AuthError::not_found("post", id))
    }

    /// Replace the body of a post. Only its author or an administrator may.
    #[instrument(skip(self, actor, body), fields(post_id = %id, editor = ?actor.account_id()))]
    pub async fn edit_post(
        &self,
        actor: &Principal,
        id: PostId,
        body: &str,
    ) -> Result<Post, AuthError> {
        let existing = self.get_post(id).await?;
        require_owner_or_admin(actor, existing.author_id)?;
        let body = validate_body(body)?;

        let post = self.posts.update_body(id, body).await?;
        info!("post updated");
        Ok(post)
    }

    pub async fn list_posts(&self, page: i64, page_size: u32) -> Result<Page<Post>, AuthError> {
        let total = self.posts.count_posts().await?;
        let posts = self.posts.clone();
        Ok(fetch_page(total, page, page_size, |offset, limit| async move {
            posts.list_posts(offset, limit).await
        })
        .await?)
    }

    pub async fn list_by_author(
        &self,
        author: AccountId,
        page: i64,
        page_size: u32,
    ) -> Result<Page<Post>, AuthError> {
        self.ensure_account(author).await?;
        let total = self.posts.count_by_author(author).await?;
        let posts = self.posts.clone();
        Ok(fetch_page(total, page, page_size, |offset, limit| async move {
            posts.list_by_author(author, offset, limit).await
        })
        .await?)
    }

    /// Posts from the accounts `reader` follows, newest first.
    pub async fn timeline(
        &self,
        reader: AccountId,
        page: i64,
        page_size: u32,
    ) -> Result<Page<Post>, AuthError> {
        self.ensure_account(reader).await?;
        let total = self.posts.count_timeline(reader).await?;
        let posts = self.posts.clone();
        Ok(fetch_page(total, page, page_size, |offset, limit| async move {
            posts.list_timeline(reader, offset, limit).await
        })
        .await?)
    }

    pub async fn post_count(&self, author: AccountId) -> Result<i64, AuthError> {
        Ok(self.posts.count_by_author(author).await?)
    }

    async fn ensure_account(&self, id: AccountId) -> Result<(), AuthError> {
        match self.accounts.get_account(id).await? {
            Some(_) => Ok(()),
            None => Err(AuthError::not_found("account", id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::models::NewAccount;
    use crate::auth::Account;
    use crate::domain::RoleId;
    use crate::storage::test_helpers::memory_pool;
    use crate::storage::{FollowRepository, SqlxFollowRepository};

    async fn account(pool: &DbPool, name: &str) -> Account {
        SqlxAccountRepository::new(pool.clone())
            .create_account(NewAccount {
                email: format!("{}@example.com", name),
                username: name.to_string(),
                password_hash: "hash".to_string(),
                role_id: RoleId::new(1),
                confirmed: true,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn create_list_and_edit() {
        let pool = memory_pool().await;
        let alice = account(&pool, "alice").await;
        let bob = account(&pool, "bob").await;
        let service = PostService::with_sqlx(pool);

        let as_alice = Principal::authenticated(alice.clone(), Permission::BASE_USER, false);
        let as_bob = Principal::authenticated(bob.clone(), Permission::BASE_USER, false);
        let as_admin = Principal::authenticated(bob.clone(), Permission::ALL, false);

        for n in 0..25 {
            service.create_post(&as_alice, &format!("post {}", n)).await.unwrap();
        }

        let first = service.list_posts(1, 20).await.unwrap();
        assert_eq!(first.items.len(), 20);
        assert_eq!(first.items[0].body, "post 24");
        assert!(first.window.has_next);

        let second = service.list_posts(2, 20).await.unwrap();
        assert_eq!(second.items.len(), 5);
        assert!(!second.window.has_next);

        let beyond = service.list_posts(7, 20).await.unwrap();
        assert!(beyond.items.is_empty());

        let target = first.items[0].id;
        assert!(matches!(
            service.edit_post(&as_bob, target, "hijacked").await,
            Err(AuthError::Forbidden(_))
        ));
        assert_eq!(service.edit_post(&as_alice, target, "edited").await.unwrap().body, "edited");
        assert_eq!(
            service.edit_post(&as_admin, target, "moderated").await.unwrap().body,
            "moderated"
        );
        assert_eq!(service.post_count(alice.id).await.unwrap(), 25);
    }

    #[tokio::test]
    async fn writing_requires_permission_and_body() {
        let pool = memory_pool().await;
        let alice = account(&pool, "alice").await;
        let service = PostService::with_sqlx(pool);

        let reader = Principal::authenticated(alice.clone(), Permission::FOLLOW, false);
        assert!(matches!(service.create_post(&reader, "hi").await, Err(AuthError::Forbidden(_))));

        let writer = Principal::authenticated(alice, Permission::BASE_USER, false);
        assert!(matches!(service.create_post(&writer, "   ").await, Err(AuthError::Validation(_))));
        assert!(matches!(
            service.get_post(PostId::new(404)).await,
            Err(AuthError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn timeline_shows_followed_authors() {
        let pool = memory_pool().await;
        let alice = account(&pool, "alice").await;
        let bob = account(&pool, "bob").await;
        let carol = account(&pool, "carol").await;
        let service = PostService::with_sqlx(pool.clone());

        for author in [&alice, &carol] {
            let principal = Principal::authenticated(author.clone(), Permission::BASE_USER, false);
            service.create_post(&principal, &format!("by {}", author.username)).await.unwrap();
        }
        SqlxFollowRepository::new(pool).follow(bob.id, alice.id).await.unwrap();

        let timeline = service.timeline(bob.id, 1, 20).await.unwrap();
        assert_eq!(timeline.window.total, 1);
        assert_eq!(timeline.items[0].body, "by alice");

        let by_carol = service.list_by_author(carol.id, 1, 20).await.unwrap();
        assert_eq!(by_carol.items.len(), 1);
    }
}
