//! Signed, self-expiring tokens for account confirmation, password reset,
//! email change and API authentication.
//!
//! Tokens are HS256 JWTs whose claims carry an explicit [`TokenIntent`], the
//! subject account id and an optional auxiliary string (the requested address for
//! email changes). Nothing is persisted; a token is valid exactly while its
//! signature checks out, its `exp` lies in the future and its intent matches what
//! the caller expects.

use std::fmt;

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::AccountId;

/// Operation a token authorizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenIntent {
    Confirm,
    Reset,
    ChangeEmail,
    Auth,
}

impl TokenIntent {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenIntent::Confirm => "confirm",
            TokenIntent::Reset => "reset",
            TokenIntent::ChangeEmail => "change_email",
            TokenIntent::Auth => "auth",
        }
    }
}

impl fmt::Display for TokenIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Claims embedded in every token.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TokenClaims {
    intent: TokenIntent,
    sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    aux: Option<String>,
    iat: u64,
    exp: u64,
}

/// Payload of a token that passed verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedToken {
    pub intent: TokenIntent,
    pub subject: AccountId,
    pub aux: Option<String>,
    pub expires_at: u64,
}

/// Reasons a token can be refused.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("token is malformed or its signature is invalid")]
    Invalid,
    #[error("token has expired")]
    Expired,
    #[error("token intent mismatch: expected {expected}, found {found}")]
    IntentMismatch { expected: TokenIntent, found: TokenIntent },
    #[error("token lifetime must be positive")]
    InvalidTtl,
    #[error("failed to sign token: {0}")]
    Signing(String),
}

/// Mints and verifies intent-tagged tokens with an injected secret.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCodec").field("algorithm", &Algorithm::HS256).finish_non_exhaustive()
    }
}

impl TokenCodec {
    /// Create a codec signing with `secret`.
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Sign a token for `subject` that stays valid for `ttl_seconds`.
    pub fn mint(
        &self,
        intent: TokenIntent,
        subject: AccountId,
        aux: Option<&str>,
        ttl_seconds: u64,
    ) -> Result<String, TokenError> {
        if ttl_seconds == 0 {
            return Err(TokenError::InvalidTtl);
        }

        let now = jsonwebtoken::get_current_timestamp();
        let claims = TokenClaims {
            intent,
            sub: subject.get().to_string(),
            aux: aux.map(str::to_string),
            iat: now,
            exp: now.saturating_add(ttl_seconds),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Check signature, expiry and intent, returning the embedded payload.
    pub fn verify(
        &self,
        token: &str,
        expected: TokenIntent,
    ) -> Result<VerifiedToken, TokenError> {
        let data = decode::<TokenClaims>(token.trim(), &self.decoding_key, &self.validation)
            .map_err(|err| match err.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            })?;

        let claims = data.claims;
        if claims.intent != expected {
            return Err(TokenError::IntentMismatch { expected, found: claims.intent });
        }
        let subject = claims.sub.parse::<i64>().map_err(|_| TokenError::Invalid)?;

        Ok(VerifiedToken {
            intent: claims.intent,
            subject: AccountId::new(subject),
            aux: claims.aux,
            expires_at: claims.exp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

    const SECRET: &[u8] = b"unit-test-secret-that-is-long-enough";

    fn codec() -> TokenCodec {
        TokenCodec::new(SECRET)
    }

    #[test]
    fn round_trip_returns_subject() {
        let codec = codec();
        for ttl in [1, 60, 3600, 86_400 * 30] {
            let token = codec.mint(TokenIntent::Confirm, AccountId::new(17), None, ttl).unwrap();
            let verified = codec.verify(&token, TokenIntent::Confirm).unwrap();
            assert_eq!(verified.subject, AccountId::new(17));
            assert_eq!(verified.aux, None);
        }
    }

    #[test]
    fn aux_payload_survives() {
        let codec = codec();
        let token = codec
            .mint(TokenIntent::ChangeEmail, AccountId::new(3), Some("new@example.com"), 600)
            .unwrap();
        let verified = codec.verify(&token, TokenIntent::ChangeEmail).unwrap();
        assert_eq!(verified.aux.as_deref(), Some("new@example.com"));
    }

    #[test]
    fn intent_mismatch_is_rejected() {
        let codec = codec();
        let token = codec.mint(TokenIntent::Confirm, AccountId::new(1), None, 3600).unwrap();
        assert_eq!(
            codec.verify(&token, TokenIntent::Reset),
            Err(TokenError::IntentMismatch {
                expected: TokenIntent::Reset,
                found: TokenIntent::Confirm
            })
        );
    }

    #[test]
    fn expired_token_is_rejected() {
        let codec = codec();
        let token = codec.mint(TokenIntent::Reset, AccountId::new(1), None, 1).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(2100));
        assert_eq!(codec.verify(&token, TokenIntent::Reset), Err(TokenError::Expired));
    }

    #[test]
    fn foreign_secret_is_rejected() {
        let token = codec().mint(TokenIntent::Auth, AccountId::new(1), None, 3600).unwrap();
        let other = TokenCodec::new(b"another-secret-of-sufficient-length!");
        assert_eq!(other.verify(&token, TokenIntent::Auth), Err(TokenError::Invalid));
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let codec = codec();
        let token = codec.mint(TokenIntent::Auth, AccountId::new(1), None, 3600).unwrap();
        let mut parts: Vec<String> = token.split('.').map(str::to_string).collect();
        let payload = String::from_utf8(URL_SAFE_NO_PAD.decode(&parts[1]).unwrap()).unwrap();
        parts[1] = URL_SAFE_NO_PAD.encode(payload.replace("\"sub\":\"1\"", "\"sub\":\"2\""));
        assert_eq!(codec.verify(&parts.join("."), TokenIntent::Auth), Err(TokenError::Invalid));
    }

    #[test]
    fn subject_is_carried_as_a_string_claim() {
        let codec = codec();
        let token = codec.mint(TokenIntent::Confirm, AccountId::new(17), None, 3600).unwrap();
        let payload = URL_SAFE_NO_PAD.decode(token.split('.').nth(1).unwrap()).unwrap();
        let claims: serde_json::Value = serde_json::from_slice(&payload).unwrap();
        assert_eq!(claims["sub"], "17");

        let raw = decode::<TokenClaims>(&token, &codec.decoding_key, &codec.validation);
        assert!(raw.is_ok(), "{:?}", raw.err());
    }

    #[test]
    fn non_numeric_subject_is_rejected() {
        let codec = codec();
        let now = jsonwebtoken::get_current_timestamp();
        let claims = TokenClaims {
            intent: TokenIntent::Auth,
            sub: "admin".to_string(),
            aux: None,
            iat: now,
            exp: now + 3600,
        };
        let token =
            encode(&Header::new(Algorithm::HS256), &claims, &EncodingKey::from_secret(SECRET))
                .unwrap();
        assert_eq!(codec.verify(&token, TokenIntent::Auth), Err(TokenError::Invalid));
    }

    #[test]
    fn malformed_strings_are_rejected() {
        let codec = codec();
        for garbage in ["", "abc", "a.b.c", "not.a.token.at.all"] {
            assert_eq!(codec.verify(garbage, TokenIntent::Confirm), Err(TokenError::Invalid));
        }
    }

    #[test]
    fn zero_ttl_is_refused() {
        assert_eq!(
            codec().mint(TokenIntent::Confirm, AccountId::new(1), None, 0),
            Err(TokenError::InvalidTtl)
        );
    }

    #[test]
    fn debug_does_not_print_secret() {
        let rendered = format!("{:?}", codec());
        assert!(!rendered.contains("unit-test-secret"));
    }
}
