//! Axum middleware for the HTTP Basic auth boundary.

use axum::{
    body::Body,
    extract::{Extension, State},
    http::{header::AUTHORIZATION, HeaderMap, Method, Request},
    middleware::Next,
    response::Response,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use tracing::{field, warn, Instrument};

use crate::api::error::ApiError;
use crate::auth::account_service::AccountService;
use crate::auth::authorization::require_confirmed;
use crate::auth::models::{AuthError, Principal};

/// Credentials carried by an `Authorization: Basic` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicCredentials {
    pub username: String,
    pub password: String,
}

/// Parse the Basic credentials of a request.
///
/// A missing header yields `Ok(None)`; a header that is present but malformed is
/// an error.
pub fn basic_credentials(headers: &HeaderMap) -> Result<Option<BasicCredentials>, AuthError> {
    let Some(value) = headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let invalid = || AuthError::unauthorized("Invalid credentials");

    let value = value.to_str().map_err(|_| invalid())?;
    let (scheme, encoded) = value.trim().split_once(' ').ok_or_else(invalid)?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return Err(invalid());
    }

    let decoded = STANDARD.decode(encoded.trim()).map_err(|_| invalid())?;
    let decoded = String::from_utf8(decoded).map_err(|_| invalid())?;
    let (username, password) = decoded.split_once(':').ok_or_else(invalid)?;

    Ok(Some(BasicCredentials { username: username.to_string(), password: password.to_string() }))
}

/// Resolve the caller into a [`Principal`] and attach it to the request.
pub async fn authenticate(
    State(accounts): State<AccountService>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    if request.method() == Method::OPTIONS {
        return Ok(next.run(request).await);
    }

    let span = crate::request_span!(request.method(), request.uri().path());

    async move {
        let principal = match basic_credentials(request.headers()) {
            Ok(None) => Principal::anonymous(),
            Ok(Some(credentials)) => accounts
                .authenticate_basic(&credentials.username, &credentials.password)
                .await
                .map_err(|err| {
                    warn!(error = %err, "authentication failed");
                    map_auth_error(err)
                })?,
            Err(err) => {
                warn!("malformed authorization header");
                return Err(map_auth_error(err));
            }
        };

        if let Some(id) = principal.account_id() {
            tracing::Span::current().record("account_id", field::display(id));
            if let Err(err) = accounts.touch_last_seen(id).await {
                warn!(error = %err, "failed to record last seen");
            }
        }

        request.extensions_mut().insert(principal);
        Ok(next.run(request).await)
    }
    .instrument(span)
    .await
}

/// Refuse authenticated callers whose account is not yet confirmed.
pub async fn ensure_confirmed(
    Extension(principal): Extension<Principal>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    require_confirmed(&principal).map_err(map_auth_error)?;
    Ok(next.run(request).await)
}

fn map_auth_error(err: AuthError) -> ApiError {
    match err {
        AuthError::Unauthorized(_)
        | AuthError::InvalidToken
        | AuthError::ExpiredToken
        | AuthError::IntentMismatch => ApiError::unauthorized("Invalid credentials"),
        other => ApiError::from(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn parses_basic_credentials() {
        let encoded = STANDARD.encode("john@example.com:cat:dog");
        let parsed = basic_credentials(&headers(&format!("Basic {}", encoded))).unwrap().unwrap();
        assert_eq!(parsed.username, "john@example.com");
        assert_eq!(parsed.password, "cat:dog");
    }

    #[test]
    fn token_form_has_empty_password() {
        let encoded = STANDARD.encode("some.jwt.token:");
        let parsed = basic_credentials(&headers(&format!("basic {}", encoded))).unwrap().unwrap();
        assert_eq!(parsed.username, "some.jwt.token");
        assert!(parsed.password.is_empty());
    }

    #[test]
    fn missing_header_is_anonymous() {
        assert_eq!(basic_credentials(&HeaderMap::new()).unwrap(), None);
    }

    #[test]
    fn malformed_headers_are_rejected() {
        let no_colon = format!("Basic {}", STANDARD.encode("nocolon"));
        for value in ["Bearer abc", "Basic", "Basic !!!", no_colon.as_str()] {
            assert!(basic_credentials(&headers(value)).is_err(), "{value}");
        }
    }
}
