//! API token issuance and account lifecycle handlers.
//!
//! Lifecycle routes live under `/api/v1/auth` and are reachable by unconfirmed
//! accounts, since confirming is one of them.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Extension, Json,
};
use tracing::{info, instrument};
use validator::Validate;

use crate::api::dto::{MessageResponse, TokenResponse, UserResource};
use crate::api::error::ApiError;
use crate::api::handlers::posts::location;
use crate::api::handlers::users::user_resource;
use crate::api::routes::ApiState;
use crate::auth::authorization::require_account;
use crate::auth::validation::{
    ChangePasswordRequest, ConfirmRequest, EmailChangeRequest, PasswordResetConfirmRequest,
    PasswordResetRequest, RegisterRequest, UpdateProfileRequest,
};
use crate::auth::{Principal, ProfileUpdate};

/// Issue an API token to a caller that authenticated with email and password.
///
/// Token-authenticated callers are refused so a token cannot mint its successor.
#[instrument(skip(state, principal), fields(account_id = ?principal.account_id()))]
pub async fn get_token_handler(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<TokenResponse>, ApiError> {
    if principal.is_anonymous() || principal.token_used() {
        return Err(ApiError::unauthorized("Invalid credentials"));
    }
    let account = require_account(&principal)?;
    let issued = state.accounts.issue_api_token(account.id)?;
    Ok(Json(TokenResponse { token: issued.token, expiration: issued.expires_in }))
}

#[instrument(skip(state, payload), fields(username = %payload.username))]
pub async fn register_handler(
    State(state): State<ApiState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, HeaderMap, Json<UserResource>), ApiError> {
    payload.validate()?;
    let account = state.accounts.register(payload).await?;
    let resource = user_resource(&state, &account).await?;
    Ok((StatusCode::CREATED, location(&resource.url)?, Json(resource)))
}

#[instrument(skip(state, principal, payload), fields(account_id = ?principal.account_id()))]
pub async fn confirm_handler(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
    Json(payload): Json<ConfirmRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    payload.validate()?;
    let account = require_account(&principal)?;
    state.accounts.confirm(&payload.token, account.id).await?;
    Ok(Json(MessageResponse::new("You have confirmed your account")))
}

#[instrument(skip(state, principal), fields(account_id = ?principal.account_id()))]
pub async fn resend_confirmation_handler(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<MessageResponse>, ApiError> {
    let account = require_account(&principal)?;
    state.accounts.resend_confirmation(account.id).await?;
    Ok(Json(MessageResponse::new("A new confirmation email has been sent")))
}

/// Always answers the same way so callers cannot probe which emails exist.
#[instrument(skip(state, payload))]
pub async fn request_password_reset_handler(
    State(state): State<ApiState>,
    Json(payload): Json<PasswordResetRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    payload.validate()?;
    if state.accounts.request_password_reset(&payload.email).await?.is_some() {
        info!("password reset mail queued");
    }
    Ok((
        StatusCode::ACCEPTED,
        Json(MessageResponse::new(
            "An email with instructions to reset your password has been sent",
        )),
    ))
}

#[instrument(skip(state, payload))]
pub async fn reset_password_handler(
    State(state): State<ApiState>,
    Json(payload): Json<PasswordResetConfirmRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    payload.validate()?;
    state
        .accounts
        .reset_password_by_email(&payload.token, &payload.email, &payload.new_password)
        .await?;
    Ok(Json(MessageResponse::new("Your password has been updated")))
}

#[instrument(skip(state, principal, payload), fields(account_id = ?principal.account_id()))]
pub async fn change_password_handler(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    payload.validate()?;
    let account = require_account(&principal)?;
    state
        .accounts
        .change_password(account.id, &payload.old_password, &payload.new_password)
        .await?;
    Ok(Json(MessageResponse::new("Your password has been updated")))
}

#[instrument(skip(state, principal, payload), fields(account_id = ?principal.account_id()))]
pub async fn request_email_change_handler(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
    Json(payload): Json<EmailChangeRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    payload.validate()?;
    let account = require_account(&principal)?;
    state.accounts.check_password(account.id, &payload.password).await?;
    state.accounts.request_email_change(account.id, &payload.new_email).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(MessageResponse::new(
            "An email with instructions to confirm your new email address has been sent",
        )),
    ))
}

#[instrument(skip(state, principal, payload), fields(account_id = ?principal.account_id()))]
pub async fn apply_email_change_handler(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
    Json(payload): Json<ConfirmRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    payload.validate()?;
    let account = require_account(&principal)?;
    state.accounts.apply_email_change(&payload.token, account.id).await?;
    Ok(Json(MessageResponse::new("Your email address has been updated")))
}

#[instrument(skip(state, principal, payload), fields(account_id = ?principal.account_id()))]
pub async fn update_profile_handler(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<UserResource>, ApiError> {
    payload.validate()?;
    let account = require_account(&principal)?;
    let update = ProfileUpdate {
        name: payload.name,
        location: payload.location,
        about_me: payload.about_me,
    };
    let account = state.accounts.update_profile(account.id, update).await?;
    Ok(Json(user_resource(&state, &account).await?))
}
