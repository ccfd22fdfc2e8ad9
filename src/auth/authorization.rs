//! Authorization helpers applied to the request principal.
//!
//! Every check reduces to [`Permission::contains`] on the principal's mask; an
//! anonymous principal holds the empty mask.

use crate::auth::models::{Account, AuthError, Principal};
use crate::auth::permission::Permission;
use crate::domain::AccountId;

/// Check whether the principal holds every bit of `required`.
///
/// ```rust
/// use penwright::auth::authorization::can;
/// use penwright::auth::{Permission, Principal};
///
/// let anonymous = Principal::anonymous();
/// assert!(!can(&anonymous, Permission::FOLLOW));
/// assert!(can(&anonymous, Permission::empty()));
/// ```
pub fn can(principal: &Principal, required: Permission) -> bool {
    principal.permissions().contains(required)
}

pub fn is_administrator(principal: &Principal) -> bool {
    can(principal, Permission::ADMINISTER)
}

/// Fail with `Forbidden` unless the principal holds `required`.
pub fn require(principal: &Principal, required: Permission) -> Result<(), AuthError> {
    if can(principal, required) {
        Ok(())
    } else {
        Err(AuthError::forbidden("Insufficient permissions"))
    }
}

/// The authenticated account, or `Unauthorized` for anonymous callers.
pub fn require_account(principal: &Principal) -> Result<&Account, AuthError> {
    principal.account().ok_or_else(|| AuthError::unauthorized("Invalid credentials"))
}

/// Authenticated callers whose account is not confirmed are refused.
pub fn require_confirmed(principal: &Principal) -> Result<(), AuthError> {
    match principal.account() {
        Some(account) if !account.confirmed => Err(AuthError::forbidden("Unconfirmed account")),
        _ => Ok(()),
    }
}

/// Owners may edit their own content; administrators may edit anyone's.
pub fn require_owner_or_admin(principal: &Principal, owner: AccountId) -> Result<(), AuthError> {
    if principal.account_id() == Some(owner) || is_administrator(principal) {
        Ok(())
    } else {
        Err(AuthError::forbidden("Insufficient permissions"))
    }
}
