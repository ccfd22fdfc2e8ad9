//! Account records, the authenticated principal and the auth error taxonomy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auth::permission::Permission;
use crate::auth::token_codec::TokenError;
use crate::domain::{AccountId, RoleId};
use crate::errors::Error;

/// Stored representation of an account, without its password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub email: String,
    pub username: String,
    pub role_id: RoleId,
    pub confirmed: bool,
    pub name: Option<String>,
    pub location: Option<String>,
    pub about_me: Option<String>,
    pub member_since: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

/// Caller-supplied fields for a new account; the role is resolved separately.
#[derive(Debug, Clone)]
pub struct AccountDraft {
    pub email: String,
    pub username: String,
    pub password: String,
}

/// New account database payload.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub role_id: RoleId,
    pub confirmed: bool,
}

/// Profile fields an account may edit about itself.
///
/// `None` leaves a field untouched; an empty string clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub location: Option<String>,
    pub about_me: Option<String>,
}

/// Identity attached to a request after the auth boundary ran.
#[derive(Debug, Clone)]
pub struct Principal {
    account: Option<Account>,
    permissions: Permission,
    token_used: bool,
}

impl Principal {
    /// Caller that presented no credentials; holds no permissions.
    pub fn anonymous() -> Self {
        Self { account: None, permissions: Permission::empty(), token_used: false }
    }

    pub fn authenticated(account: Account, permissions: Permission, token_used: bool) -> Self {
        Self { account: Some(account), permissions, token_used }
    }

    pub fn is_anonymous(&self) -> bool {
        self.account.is_none()
    }

    pub fn account(&self) -> Option<&Account> {
        self.account.as_ref()
    }

    pub fn account_id(&self) -> Option<AccountId> {
        self.account.as_ref().map(|account| account.id)
    }

    pub fn permissions(&self) -> Permission {
        self.permissions
    }

    /// True when the request authenticated with an API token rather than a password.
    pub fn token_used(&self) -> bool {
        self.token_used
    }

    pub fn is_confirmed(&self) -> bool {
        self.account.as_ref().is_some_and(|account| account.confirmed)
    }
}

/// Errors produced by the account lifecycle and the API auth boundary.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid token")]
    InvalidToken,
    #[error("token expired")]
    ExpiredToken,
    #[error("token was issued for a different operation")]
    IntentMismatch,
    #[error("token was issued for a different account")]
    SubjectMismatch,
    #[error("email already registered")]
    DuplicateEmail,
    #[error("username already in use")]
    DuplicateUsername,
    #[error("{resource} '{id}' not found")]
    NotFound { resource: &'static str, id: String },
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Persistence(#[from] Error),
}

impl AuthError {
    pub fn not_found(resource: &'static str, id: impl ToString) -> Self {
        AuthError::NotFound { resource, id: id.to_string() }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        AuthError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        AuthError::Forbidden(message.into())
    }

    /// Translate a storage error, surfacing unique violations on accounts.
    pub fn from_storage(error: Error) -> Self {
        match error.unique_violation() {
            Some("email") => AuthError::DuplicateEmail,
            Some("username") => AuthError::DuplicateUsername,
            _ => AuthError::Persistence(error),
        }
    }
}

impl From<TokenError> for AuthError {
    fn from(error: TokenError) -> Self {
        match error {
            TokenError::Invalid => AuthError::InvalidToken,
            TokenError::Expired => AuthError::ExpiredToken,
            TokenError::IntentMismatch { .. } => AuthError::IntentMismatch,
            other => AuthError::Persistence(Error::internal(other.to_string())),
        }
    }
}

impl From<validator::ValidationErrors> for AuthError {
    fn from(errors: validator::ValidationErrors) -> Self {
        match Error::from(errors) {
            Error::Validation(message) => AuthError::Validation(message),
            other => AuthError::Persistence(other),
        }
    }
}
