//! Follow graph business logic

use std::sync::Arc;

use tracing::{info, instrument};

use crate::auth::authorization::{require, require_account};
use crate::auth::{AuthError, Permission, Principal};
use crate::domain::{AccountId, FollowEntry};
use crate::pagination::Page;
use crate::services::fetch_page;
use crate::storage::{AccountRepository, DbPool, FollowRepository};
use crate::storage::{SqlxAccountRepository, SqlxFollowRepository};

#[derive(Clone)]
pub struct FollowService {
    accounts: Arc<dyn AccountRepository>,
    follows: Arc<dyn FollowRepository>,
}

impl FollowService {
    pub fn new(accounts: Arc<dyn AccountRepository>, follows: Arc<dyn FollowRepository>) -> Self {
        Self { accounts, follows }
    }

    pub fn with_sqlx(pool: DbPool) -> Self {
        Self::new(
            Arc::new(SqlxAccountRepository::new(pool.clone())),
            Arc::new(SqlxFollowRepository::new(pool)),
        )
    }

    async fn ensure_account(&self, id: AccountId) -> Result<(), AuthError> {
        match self.accounts.get_account(id).await? {
            Some(_) => Ok(()),
            None => Err(AuthError::not_found("account", id)),
        }
    }

    /// Follow `target`. Returns false when the caller already followed it.
    #[instrument(skip(self, actor), fields(follower = ?actor.account_id(), followed = %target))]
    pub async fn follow(&self, actor: &Principal, target: AccountId) -> Result<bool, AuthError> {
        require(actor, Permission::FOLLOW)?;
        let follower = require_account(actor)?.id;
        if follower == target {
            return Err(AuthError::Validation("Accounts cannot follow themselves".into()));
        }
        self.ensure_account(target).await?;

        let created = self.follows.follow(follower, target).await?;
        if created {
            info!("now following");
        }
        Ok(created)
    }

    /// Stop following `target`. Returns false when there was no edge.
    #[instrument(skip(self, actor), fields(follower = ?actor.account_id(), followed = %target))]
    pub async fn unfollow(&self, actor: &Principal, target: AccountId) -> Result<bool, AuthError> {
        require(actor, Permission::FOLLOW)?;
        let follower = require_account(actor)?.id;
        self.ensure_account(target).await?;

        Ok(self.follows.unfollow(follower, target).await?)
    }

    pub async fn is_following(
        &self,
        follower: AccountId,
        followed: AccountId,
    ) -> Result<bool, AuthError> {
        Ok(self.follows.is_following(follower, followed).await?)
    }

    pub async fn followers(
        &self,
        account: AccountId,
        page: i64,
        page_size: u32,
    ) -> Result<Page<FollowEntry>, AuthError> {
        self.ensure_account(account).await?;
        let total = self.follows.count_followers(account).await?;
        let follows = self.follows.clone();
        Ok(fetch_page(total, page, page_size, |offset, limit| async move {
            follows.list_followers(account, offset, limit).await
        })
        .await?)
    }

    pub async fn following(
        &self,
        account: AccountId,
        page: i64,
        page_size: u32,
    ) -> Result<Page<FollowEntry>, AuthError> {
        self.ensure_account(account).await?;
        let total = self.follows.count_following(account).await?;
        let follows = self.follows.clone();
        Ok(fetch_page(total, page, page_size, |offset, limit| async move {
            follows.list_following(account, offset, limit).await
        })
        .await?)
    }
}
