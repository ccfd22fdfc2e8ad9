//! Authentication and authorization module entry point.
//!
//! This module exposes the account stack for Penwright: the token codec, the
//! permission model and roles, the account lifecycle service and its validation
//! layer.

pub mod account_service;
pub mod authorization;
mod hashing;
pub mod middleware;
pub mod models;
pub mod permission;
pub mod role;
pub mod token_codec;
pub mod validation;

pub use account_service::{AccountService, IssuedToken, TokenLifetimes};
pub use models::{Account, AccountDraft, AuthError, NewAccount, Principal, ProfileUpdate};
pub use permission::Permission;
pub use role::{seed_roles, AdminEmailRoleResolver, Role, RoleResolver};
pub use token_codec::{TokenCodec, TokenError, TokenIntent, VerifiedToken};
