//! Account repository
//!
//! Emails are stored lower-cased; callers normalize before lookups. The UNIQUE
//! constraints on `email` and `username` surface as `Error::Database` values whose
//! [`Error::unique_violation`] names the column.

use crate::auth::models::{Account, NewAccount, ProfileUpdate};
use crate::domain::{AccountId, RoleId};
use crate::errors::{Error, Result};
use crate::storage::DbPool;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use tracing::instrument;

#[derive(Debug, Clone, FromRow)]
struct AccountRow {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub role_id: i64,
    pub confirmed: bool,
    pub name: Option<String>,
    pub location: Option<String>,
    pub about_me: Option<String>,
    pub member_since: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

impl AccountRow {
    fn into_parts(self) -> (Account, String) {
        let account = Account {
            id: AccountId::new(self.id),
            email: self.email,
            username: self.username,
            role_id: RoleId::new(self.role_id),
            confirmed: self.confirmed,
            name: self.name,
            location: self.location,
            about_me: self.about_me,
            member_since: self.member_since,
            last_seen: self.last_seen,
        };
        (account, self.password_hash)
    }

    fn into_account(self) -> Account {
        self.into_parts().0
    }
}

#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Insert a new account
    async fn create_account(&self, account: NewAccount) -> Result<Account>;

    async fn get_account(&self, id: AccountId) -> Result<Option<Account>>;

    async fn get_account_by_email(&self, email: &str) -> Result<Option<Account>>;

    async fn get_account_by_username(&self, username: &str) -> Result<Option<Account>>;

    /// Get an account with its password hash for credential checks
    async fn get_account_with_password(&self, email: &str) -> Result<Option<(Account, String)>>;

    async fn get_password_hash(&self, id: AccountId) -> Result<Option<String>>;

    async fn email_exists(&self, email: &str) -> Result<bool>;

    async fn username_exists(&self, username: &str) -> Result<bool>;

    async fn mark_confirmed(&self, id: AccountId) -> Result<()>;

    async fn update_password(&self, id: AccountId, password_hash: String) -> Result<()>;

    async fn update_email(&self, id: AccountId, email: &str) -> Result<()>;

    async fn update_role(&self, id: AccountId, role_id: RoleId) -> Result<()>;

    /// Overwrite the administrator-editable identity columns in one statement.
    async fn update_identity(
        &self,
        id: AccountId,
        email: &str,
        username: &str,
        confirmed: bool,
        role_id: RoleId,
    ) -> Result<()>;

    async fn update_profile(&self, id: AccountId, update: ProfileUpdate) -> Result<Account>;

    async fn touch_last_seen(&self, id: AccountId, at: DateTime<Utc>) -> Result<()>;

    async fn count_accounts(&self) -> Result<i64>;
}

#[derive(Debug, Clone)]
pub struct SqlxAccountRepository {
    pool: DbPool,
}

impl SqlxAccountRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn fetch_one_where(&self, clause: &str, value: &str) -> Result<Option<AccountRow>> {
        sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {} FROM accounts WHERE {} = $1",
            ACCOUNT_COLUMNS, clause
        ))
        .bind(value)
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| Error::database(err, format!("Failed to fetch account by {}", clause)))
    }

    fn expect_updated(id: AccountId, rows: u64) -> Result<()> {
        if rows == 0 {
            return Err(Error::not_found("account", id.to_string()));
        }
        Ok(())
    }
}

const ACCOUNT_COLUMNS: &str = "id, email, username, password_hash, role_id, confirmed, name, \
                               location, about_me, member_since, last_seen";

#[async_trait]
impl AccountRepository for SqlxAccountRepository {
    #[instrument(
        skip(self, account),
        fields(username = %account.username),
        name = "db_create_account"
    )]
    async fn create_account(&self, account: NewAccount) -> Result<Account> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO accounts (email, username, password_hash, role_id, confirmed, member_since, last_seen)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(&account.email)
        .bind(&account.username)
        .bind(&account.password_hash)
        .bind(account.role_id)
        .bind(account.confirmed)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|err| Error::database(err, "Failed to create account"))?;

        let id = AccountId::new(result.last_insert_rowid());
        self.get_account(id)
            .await?
            .ok_or_else(|| Error::internal("Account not found after creation"))
    }

    #[instrument(skip(self), fields(account_id = %id), name = "db_get_account")]
    async fn get_account(&self, id: AccountId) -> Result<Option<Account>> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {} FROM accounts WHERE id = $1",
            ACCOUNT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| Error::database(err, "Failed to fetch account"))?;

        Ok(row.map(AccountRow::into_account))
    }

    #[instrument(skip(self, email), name = "db_get_account_by_email")]
    async fn get_account_by_email(&self, email: &str) -> Result<Option<Account>> {
        Ok(self.fetch_one_where("email", email).await?.map(AccountRow::into_account))
    }

    #[instrument(skip(self), name = "db_get_account_by_username")]
    async fn get_account_by_username(&self, username: &str) -> Result<Option<Account>> {
        Ok(self.fetch_one_where("username", username).await?.map(AccountRow::into_account))
    }

    #[instrument(skip(self, email), name = "db_get_account_with_password")]
    async fn get_account_with_password(&self, email: &str) -> Result<Option<(Account, String)>> {
        Ok(self.fetch_one_where("email", email).await?.map(AccountRow::into_parts))
    }

    #[instrument(skip(self), fields(account_id = %id), name = "db_get_password_hash")]
    async fn get_password_hash(&self, id: AccountId) -> Result<Option<String>> {
        let hash: Option<(String,)> =
            sqlx::query_as("SELECT password_hash FROM accounts WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|err| Error::database(err, "Failed to fetch password hash"))?;

        Ok(hash.map(|(h,)| h))
    }

    #[instrument(skip(self, email), name = "db_email_exists")]
    async fn email_exists(&self, email: &str) -> Result<bool> {
        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM accounts WHERE email = $1)")
                .bind(email)
                .fetch_one(&self.pool)
                .await
                .map_err(|err| Error::database(err, "Failed to check email"))?;

        Ok(exists)
    }

    #[instrument(skip(self), name = "db_username_exists")]
    async fn username_exists(&self, username: &str) -> Result<bool> {
        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM accounts WHERE username = $1)")
                .bind(username)
                .fetch_one(&self.pool)
                .await
                .map_err(|err| Error::database(err, "Failed to check username"))?;

        Ok(exists)
    }

    #[instrument(skip(self), fields(account_id = %id), name = "db_mark_confirmed")]
    async fn mark_confirmed(&self, id: AccountId) -> Result<()> {
        let result = sqlx::query("UPDATE accounts SET confirmed = 1 WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|err| Error::database(err, "Failed to confirm account"))?;

        Self::expect_updated(id, result.rows_affected())
    }

    #[instrument(skip(self, password_hash), fields(account_id = %id), name = "db_update_password")]
    async fn update_password(&self, id: AccountId, password_hash: String) -> Result<()> {
        let result = sqlx::query("UPDATE accounts SET password_hash = $1 WHERE id = $2")
            .bind(password_hash)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|err| Error::database(err, "Failed to update password"))?;

        Self::expect_updated(id, result.rows_affected())
    }

    #[instrument(skip(self, email), fields(account_id = %id), name = "db_update_email")]
    async fn update_email(&self, id: AccountId, email: &str) -> Result<()> {
        let result = sqlx::query("UPDATE accounts SET email = $1 WHERE id = $2")
            .bind(email)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|err| Error::database(err, "Failed to update email"))?;

        Self::expect_updated(id, result.rows_affected())
    }

    #[instrument(skip(self), fields(account_id = %id, role_id = %role_id), name = "db_update_role")]
    async fn update_role(&self, id: AccountId, role_id: RoleId) -> Result<()> {
        let result = sqlx::query("UPDATE accounts SET role_id = $1 WHERE id = $2")
            .bind(role_id)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|err| Error::database(err, "Failed to update account role"))?;

        Self::expect_updated(id, result.rows_affected())
    }

    #[instrument(skip(self, email), fields(account_id = %id), name = "db_update_identity")]
    async fn update_identity(
        &self,
        id: AccountId,
        email: &str,
        username: &str,
        confirmed: bool,
        role_id: RoleId,
    ) -> Result<()> {
        let result = sqlx::query(
            "UPDATE accounts SET email = $1, username = $2, confirmed = $3, role_id = $4 WHERE id = $5",
        )
        .bind(email)
        .bind(username)
        .bind(confirmed)
        .bind(role_id)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|err| Error::database(err, "Failed to update account"))?;

        Self::expect_updated(id, result.rows_affected())
    }

    #[instrument(skip(self, update), fields(account_id = %id), name = "db_update_profile")]
    async fn update_profile(&self, id: AccountId, update: ProfileUpdate) -> Result<Account> {
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET name = CASE WHEN $1 IS NULL THEN name ELSE NULLIF($1, '') END,
                location = CASE WHEN $2 IS NULL THEN location ELSE NULLIF($2, '') END,
                about_me = CASE WHEN $3 IS NULL THEN about_me ELSE NULLIF($3, '') END
            WHERE id = $4
            "#,
        )
        .bind(update.name)
        .bind(update.location)
        .bind(update.about_me)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|err| Error::database(err, "Failed to update profile"))?;

        Self::expect_updated(id, result.rows_affected())?;
        self.get_account(id)
            .await?
            .ok_or_else(|| Error::not_found("account", id.to_string()))
    }

    #[instrument(skip(self), fields(account_id = %id), name = "db_touch_last_seen")]
    async fn touch_last_seen(&self, id: AccountId, at: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE accounts SET last_seen = $1 WHERE id = $2")
            .bind(at)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|err| Error::database(err, "Failed to update last seen"))?;

        Ok(())
    }

    #[instrument(skip(self), name = "db_count_accounts")]
    async fn count_accounts(&self) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM accounts")
            .fetch_one(&self.pool)
            .await
            .map_err(|err| Error::database(err, "Failed to count accounts"))?;

        Ok(count)
    }
}
