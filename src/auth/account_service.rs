//! Account lifecycle: registration, confirmation, password reset and change,
//! email change, credential checks and API token authentication.
//!
//! Every token-gated transition verifies the token's intent and that its subject
//! is the account being modified before anything is written.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::{field, info, instrument, warn};
use validator::Validate;

use crate::auth::authorization::require;
use crate::auth::hashing::{self, DUMMY_HASH};
use crate::auth::models::{Account, AccountDraft, AuthError, NewAccount, Principal, ProfileUpdate};
use crate::auth::permission::Permission;
use crate::auth::role::{AdminEmailRoleResolver, Role, RoleResolver};
use crate::auth::token_codec::{TokenCodec, TokenIntent, VerifiedToken};
use crate::auth::validation::{
    normalize_email, validate_email, validate_password, validate_username, AdminAccountRequest,
    RegisterRequest,
};
use crate::config::AuthConfig;
use crate::domain::AccountId;
use crate::mail::{templates, Mailer};
use crate::storage::{AccountRepository, DbPool, RoleRepository};
use crate::storage::{SqlxAccountRepository, SqlxRoleRepository};

/// How long each kind of token stays valid, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenLifetimes {
    pub confirmation: u64,
    pub reset: u64,
    pub email_change: u64,
    pub api: u64,
}

impl Default for TokenLifetimes {
    fn default() -> Self {
        Self { confirmation: 3600, reset: 3600, email_change: 3600, api: 3600 }
    }
}

impl From<&AuthConfig> for TokenLifetimes {
    fn from(config: &AuthConfig) -> Self {
        Self {
            confirmation: config.confirmation_ttl_seconds,
            reset: config.reset_ttl_seconds,
            email_change: config.email_change_ttl_seconds,
            api: config.api_token_ttl_seconds,
        }
    }
}

/// An API token and the number of seconds it stays valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub expires_in: u64,
}

#[derive(Clone)]
pub struct AccountService {
    accounts: Arc<dyn AccountRepository>,
    roles: Arc<dyn RoleRepository>,
    codec: Arc<TokenCodec>,
    mailer: Arc<dyn Mailer>,
    role_resolver: Arc<dyn RoleResolver>,
    lifetimes: TokenLifetimes,
}

impl AccountService {
    pub fn new(
        accounts: Arc<dyn AccountRepository>,
        roles: Arc<dyn RoleRepository>,
        codec: Arc<TokenCodec>,
        mailer: Arc<dyn Mailer>,
        role_resolver: Arc<dyn RoleResolver>,
        lifetimes: TokenLifetimes,
    ) -> Self {
        Self { accounts, roles, codec, mailer, role_resolver, lifetimes }
    }

    /// Wire the service to SQLite repositories and the configured secret.
    pub fn with_sqlx(pool: DbPool, config: &AuthConfig, mailer: Arc<dyn Mailer>) -> Self {
        let roles: Arc<dyn RoleRepository> = Arc::new(SqlxRoleRepository::new(pool.clone()));
        let resolver = AdminEmailRoleResolver::new(roles.clone(), config.admin_email.as_deref());
        Self::new(
            Arc::new(SqlxAccountRepository::new(pool)),
            roles,
            Arc::new(TokenCodec::new(config.secret_key.as_bytes())),
            mailer,
            Arc::new(resolver),
            TokenLifetimes::from(config),
        )
    }

    pub fn lifetimes(&self) -> TokenLifetimes {
        self.lifetimes
    }

    pub async fn get_account(&self, id: AccountId) -> Result<Account, AuthError> {
        self.accounts.get_account(id).await?.ok_or_else(|| AuthError::not_found("account", id))
    }

    pub async fn role_of(&self, account: &Account) -> Result<Role, AuthError> {
        self.roles
            .get_role(account.role_id)
            .await?
            .ok_or_else(|| AuthError::not_found("role", account.role_id))
    }

    /// Build the request principal for an authenticated account.
    pub async fn principal_for(
        &self,
        account: Account,
        token_used: bool,
    ) -> Result<Principal, AuthError> {
        let permissions = match self.roles.get_role(account.role_id).await? {
            Some(role) => role.permissions,
            None => {
                warn!(
                    account_id = %account.id,
                    role_id = %account.role_id,
                    "account references a missing role"
                );
                Permission::empty()
            }
        };
        Ok(Principal::authenticated(account, permissions, token_used))
    }

    /// Create an account whose role is chosen by `role_resolver`.
    #[instrument(
        skip(self, draft, role_resolver),
        fields(username = %draft.username, account_id = field::Empty)
    )]
    pub async fn create_account(
        &self,
        draft: AccountDraft,
        role_resolver: &dyn RoleResolver,
    ) -> Result<Account, AuthError> {
        let email = normalize_email(&draft.email);
        validate_email(&email).map_err(|_| AuthError::Validation("Invalid email".into()))?;
        validate_username(&draft.username)
            .map_err(|_| AuthError::Validation("Invalid username".into()))?;
        validate_password(&draft.password)
            .map_err(|_| AuthError::Validation("Invalid password".into()))?;

        if self.accounts.email_exists(&email).await? {
            return Err(AuthError::DuplicateEmail);
        }
        if self.accounts.username_exists(&draft.username).await? {
            return Err(AuthError::DuplicateUsername);
        }

        let password_hash = hashing::hash_password(&draft.password)?;
        let role = role_resolver.resolve(&email).await?;

        let account = self
            .accounts
            .create_account(NewAccount {
                email,
                username: draft.username,
                password_hash,
                role_id: role.id,
                confirmed: false,
            })
            .await
            .map_err(AuthError::from_storage)?;

        tracing::Span::current().record("account_id", field::display(account.id));
        info!(role = %role.name, "account created");
        Ok(account)
    }

    /// Register with the service's own role resolver and mail a confirmation token.
    #[instrument(skip(self, request), fields(username = %request.username))]
    pub async fn register(&self, request: RegisterRequest) -> Result<Account, AuthError> {
        request.validate()?;

        let resolver = self.role_resolver.clone();
        let account = self
            .create_account(
                AccountDraft {
                    email: request.email,
                    username: request.username,
                    password: request.password,
                },
                resolver.as_ref(),
            )
            .await?;

        let token = self.request_confirmation(account.id)?;
        self.mailer.send(
            &account.email,
            "Confirm Your Account",
            templates::CONFIRM,
            json!({ "username": account.username, "token": token }),
        );

        Ok(account)
    }

    /// Mint a confirmation token for `subject`.
    pub fn request_confirmation(&self, subject: AccountId) -> Result<String, AuthError> {
        Ok(self.codec.mint(TokenIntent::Confirm, subject, None, self.lifetimes.confirmation)?)
    }

    /// Mail a fresh confirmation token to an unconfirmed account.
    #[instrument(skip(self), fields(account_id = %subject))]
    pub async fn resend_confirmation(&self, subject: AccountId) -> Result<(), AuthError> {
        let account = self.get_account(subject).await?;
        if account.confirmed {
            return Ok(());
        }

        let token = self.request_confirmation(subject)?;
        self.mailer.send(
            &account.email,
            "Confirm Your Account",
            templates::CONFIRM,
            json!({ "username": account.username, "token": token }),
        );
        Ok(())
    }

    /// Confirm `subject` with a confirmation token issued to it.
    ///
    /// Confirming an already confirmed account succeeds without writing.
    #[instrument(skip(self, token), fields(account_id = %subject))]
    pub async fn confirm(&self, token: &str, subject: AccountId) -> Result<(), AuthError> {
        self.verify_for(token, TokenIntent::Confirm, subject)?;

        let account = self.get_account(subject).await?;
        if account.confirmed {
            return Ok(());
        }

        self.accounts.mark_confirmed(subject).await?;
        info!("account confirmed");
        Ok(())
    }

    /// Mail a reset token when an account with `email` exists.
    ///
    /// Returns the token for that case and `None` otherwise; callers answer both
    /// the same way.
    #[instrument(skip(self, email))]
    pub async fn request_password_reset(&self, email: &str) -> Result<Option<String>, AuthError> {
        let email = normalize_email(email);
        let Some(account) = self.accounts.get_account_by_email(&email).await? else {
            info!("password reset requested for unknown email");
            return Ok(None);
        };

        let token = self.codec.mint(TokenIntent::Reset, account.id, None, self.lifetimes.reset)?;
        self.mailer.send(
            &account.email,
            "Reset Your Password",
            templates::RESET_PASSWORD,
            json!({ "username": account.username, "token": token }),
        );
        Ok(Some(token))
    }

    #[instrument(skip(self, token, new_password), fields(account_id = %subject))]
    pub async fn reset_password(
        &self,
        token: &str,
        subject: AccountId,
        new_password: &str,
    ) -> Result<(), AuthError> {
        self.verify_for(token, TokenIntent::Reset, subject)?;
        validate_password(new_password)
            .map_err(|_| AuthError::Validation("Invalid password".into()))?;

        let password_hash = hashing::hash_password(new_password)?;
        self.accounts.update_password(subject, password_hash).await?;
        info!("password reset");
        Ok(())
    }

    /// Reset where the caller names the account by email rather than id.
    ///
    /// An unknown email fails exactly like a bad token.
    pub async fn reset_password_by_email(
        &self,
        token: &str,
        email: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let email = normalize_email(email);
        let account =
            self.accounts.get_account_by_email(&email).await?.ok_or(AuthError::InvalidToken)?;
        self.reset_password(token, account.id, new_password).await
    }

    /// Fail with `Unauthorized` unless `password` is the account's current password.
    pub async fn check_password(
        &self,
        subject: AccountId,
        password: &str,
    ) -> Result<(), AuthError> {
        let stored = self
            .accounts
            .get_password_hash(subject)
            .await?
            .ok_or_else(|| AuthError::not_found("account", subject))?;

        if hashing::verify_password(password, &stored)? {
            Ok(())
        } else {
            Err(AuthError::unauthorized("Invalid password"))
        }
    }

    #[instrument(skip(self, old_password, new_password), fields(account_id = %subject))]
    pub async fn change_password(
        &self,
        subject: AccountId,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        self.check_password(subject, old_password).await?;
        validate_password(new_password)
            .map_err(|_| AuthError::Validation("Invalid password".into()))?;

        let password_hash = hashing::hash_password(new_password)?;
        self.accounts.update_password(subject, password_hash).await?;
        info!("password changed");
        Ok(())
    }

    /// Mint a token carrying `new_email` and mail it to that address.
    #[instrument(skip(self, new_email), fields(account_id = %subject))]
    pub async fn request_email_change(
        &self,
        subject: AccountId,
        new_email: &str,
    ) -> Result<String, AuthError> {
        let new_email = normalize_email(new_email);
        validate_email(&new_email).map_err(|_| AuthError::Validation("Invalid email".into()))?;

        let account = self.get_account(subject).await?;
        if self.accounts.email_exists(&new_email).await? {
            return Err(AuthError::DuplicateEmail);
        }

        let token = self.codec.mint(
            TokenIntent::ChangeEmail,
            subject,
            Some(&new_email),
            self.lifetimes.email_change,
        )?;
        self.mailer.send(
            &new_email,
            "Confirm your email address",
            templates::CHANGE_EMAIL,
            json!({ "username": account.username, "token": token }),
        );
        Ok(token)
    }

    /// Apply an email change, re-checking that the new address is still free.
    #[instrument(skip(self, token), fields(account_id = %subject))]
    pub async fn apply_email_change(
        &self,
        token: &str,
        subject: AccountId,
    ) -> Result<Account, AuthError> {
        let verified = self.verify_for(token, TokenIntent::ChangeEmail, subject)?;
        let new_email =
            verified.aux.map(|email| normalize_email(&email)).ok_or(AuthError::InvalidToken)?;
        validate_email(&new_email).map_err(|_| AuthError::InvalidToken)?;

        if let Some(holder) = self.accounts.get_account_by_email(&new_email).await? {
            if holder.id != subject {
                warn!("email change target was taken after the request");
                return Err(AuthError::DuplicateEmail);
            }
            return Ok(holder);
        }

        self.accounts.update_email(subject, &new_email).await.map_err(AuthError::from_storage)?;
        info!("email changed");
        self.get_account(subject).await
    }

    /// Check an email/password pair. Unknown emails cost the same hashing work.
    #[instrument(skip(self, email, password))]
    pub async fn verify_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Account, AuthError> {
        let email = normalize_email(email);
        let Some((account, stored)) = self.accounts.get_account_with_password(&email).await? else {
            if let Err(e) = hashing::verify_password(password, &DUMMY_HASH) {
                warn!(error = %e, "dummy hash verification failed unexpectedly");
            }
            return Err(AuthError::unauthorized("Invalid credentials"));
        };

        if !hashing::verify_password(password, &stored)? {
            warn!(account_id = %account.id, "login attempt with incorrect password");
            return Err(AuthError::unauthorized("Invalid credentials"));
        }
        Ok(account)
    }

    pub fn issue_api_token(&self, subject: AccountId) -> Result<IssuedToken, AuthError> {
        let token = self.codec.mint(TokenIntent::Auth, subject, None, self.lifetimes.api)?;
        Ok(IssuedToken { token, expires_in: self.lifetimes.api })
    }

    /// Resolve an API token to its account.
    pub async fn authenticate_token(&self, token: &str) -> Result<Account, AuthError> {
        let verified = self.codec.verify(token, TokenIntent::Auth)?;
        self.accounts
            .get_account(verified.subject)
            .await?
            .ok_or_else(|| AuthError::unauthorized("Invalid credentials"))
    }

    /// Interpret HTTP Basic credentials.
    ///
    /// An empty username is anonymous. An empty password means the username field
    /// carries an API token. Anything else is an email and password.
    #[instrument(skip_all, fields(account_id = field::Empty, token_used = field::Empty))]
    pub async fn authenticate_basic(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Principal, AuthError> {
        if username.is_empty() {
            return Ok(Principal::anonymous());
        }

        let token_used = password.is_empty();
        let account = if token_used {
            self.authenticate_token(username).await.map_err(|err| match err {
                AuthError::Persistence(inner) => AuthError::Persistence(inner),
                _ => AuthError::unauthorized("Invalid credentials"),
            })?
        } else {
            self.verify_credentials(username, password).await?
        };

        let span = tracing::Span::current();
        span.record("account_id", field::display(account.id));
        span.record("token_used", token_used);
        self.principal_for(account, token_used).await
    }

    /// Give `target` the role named `role_name`. Requires `ADMINISTER`.
    #[instrument(skip(self, actor), fields(actor = ?actor.account_id(), target = %target))]
    pub async fn assign_role(
        &self,
        actor: &Principal,
        target: AccountId,
        role_name: &str,
    ) -> Result<Account, AuthError> {
        require(actor, Permission::ADMINISTER)?;

        let role = self
            .roles
            .get_role_by_name(role_name)
            .await?
            .ok_or_else(|| AuthError::not_found("role", role_name))?;
        self.get_account(target).await?;

        self.accounts.update_role(target, role.id).await?;
        info!(role = %role.name, "role assigned");
        self.get_account(target).await
    }

    /// Let an administrator rewrite another account's identity, role and profile.
    ///
    /// Email and username stay unique; the storage constraint backs up the checks.
    #[instrument(skip(self, actor, request), fields(target = %target, role = %request.role))]
    pub async fn admin_update_account(
        &self,
        actor: &Principal,
        target: AccountId,
        request: AdminAccountRequest,
    ) -> Result<Account, AuthError> {
        require(actor, Permission::ADMINISTER)?;
        request.validate()?;

        let current = self.get_account(target).await?;
        let email = normalize_email(&request.email);
        if email != current.email && self.accounts.email_exists(&email).await? {
            return Err(AuthError::DuplicateEmail);
        }
        if request.username != current.username
            && self.accounts.username_exists(&request.username).await?
        {
            return Err(AuthError::DuplicateUsername);
        }

        let role = self
            .roles
            .get_role_by_name(&request.role)
            .await?
            .ok_or_else(|| AuthError::not_found("role", &request.role))?;

        self.accounts
            .update_identity(target, &email, &request.username, request.confirmed, role.id)
            .await
            .map_err(AuthError::from_storage)?;
        let account = self
            .accounts
            .update_profile(
                target,
                ProfileUpdate {
                    name: request.name,
                    location: request.location,
                    about_me: request.about_me,
                },
            )
            .await?;

        info!(role = %role.name, "account edited by administrator");
        Ok(account)
    }

    pub async fn touch_last_seen(&self, subject: AccountId) -> Result<(), AuthError> {
        self.accounts.touch_last_seen(subject, Utc::now()).await?;
        Ok(())
    }

    #[instrument(skip(self, update), fields(account_id = %subject))]
    pub async fn update_profile(
        &self,
        subject: AccountId,
        update: ProfileUpdate,
    ) -> Result<Account, AuthError> {
        Ok(self.accounts.update_profile(subject, update).await?)
    }

    fn verify_for(
        &self,
        token: &str,
        intent: TokenIntent,
        subject: AccountId,
    ) -> Result<VerifiedToken, AuthError> {
        let verified = self.codec.verify(token, intent)?;
        if verified.subject != subject {
            warn!(intent = %intent, "token subject does not match the account");
            return Err(AuthError::SubjectMismatch);
        }
        Ok(verified)
    }
}
