//! Session token issuance and validation.
//!
//! Logging in exchanges credentials for an opaque session token that gates
//! the realtime subscription endpoint. Tokens are stateless: the server
//! keeps no session table, and any process holding the signing key can
//! validate a token issued by any other.
//!
//! # Token Format
//!
//! ```text
//! bt.<base64url(claims)>.<base64url(signature)>
//! ```
//!
//! where `claims` is `<user_id>.<issued_at_unix_millis>` in ASCII and the
//! signature is Ed25519 over the raw claims bytes. Both segments use the
//! URL-safe base64 alphabet without padding. A token is valid for 24 hours
//! from its issue time.
//!
//! Signing the claims makes the token tamper-evident: a string with the
//! right shape but no valid signature fails validation.
//!
//! Validation does not consult the account directory. A token for a user
//! id that no longer resolves still validates; callers that need the
//! account re-check via [`AccountDirectory`](crate::directory::AccountDirectory).
//!
//! # Example
//!
//! ```rust
//! use bustrack_server::token::TokenService;
//!
//! let tokens = TokenService::ephemeral();
//! let token = tokens.issue(42);
//!
//! let claims = tokens.validate(&token).expect("freshly issued token");
//! assert_eq!(claims.user_id, 42);
//! ```

use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use ed25519_dalek::{Signature, Signer, SigningKey, SECRET_KEY_LENGTH, SIGNATURE_LENGTH};
use rand::Rng;
use thiserror::Error;
use tracing::trace;

/// Structural prefix identifying a BusTrack session token.
const TOKEN_PREFIX: &str = "bt";

/// How long a token remains valid after issue (24 hours).
const VALIDITY_WINDOW_HOURS: i64 = 24;

/// Errors that can occur during token validation.
///
/// All variants degrade to "unauthenticated" at the HTTP boundary; the
/// granularity exists for logging and tests, not for callers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// The token is absent, has the wrong prefix, the wrong number of
    /// segments, or claims that do not parse.
    #[error("malformed token")]
    Malformed,

    /// A segment contains invalid base64 or non-UTF-8 claim bytes.
    #[error("invalid token encoding")]
    InvalidEncoding,

    /// The signature does not verify against the claims.
    #[error("invalid token signature")]
    InvalidSignature,

    /// The token's issue time is outside the validity window.
    #[error("token expired")]
    Expired,
}

impl TokenError {
    /// Returns `true` if this error indicates structurally bad input
    /// rather than a verification or freshness failure.
    #[must_use]
    pub fn is_format_error(&self) -> bool {
        matches!(self, Self::Malformed | Self::InvalidEncoding)
    }
}

/// Validated token claims: who the token was issued to, and when.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenClaims {
    /// The account identity the token was issued for.
    pub user_id: u64,

    /// When the token was issued.
    pub issued_at: DateTime<Utc>,
}

/// Issues and validates signed session tokens.
///
/// The service holds a single Ed25519 signing key. It is `Clone` and cheap
/// to share across handlers; clones reference the same key.
#[derive(Clone)]
pub struct TokenService {
    signing_key: Arc<SigningKey>,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("signing_key", &"<redacted>")
            .finish()
    }
}

impl TokenService {
    /// Creates a token service from a 32-byte Ed25519 seed.
    ///
    /// Use this with a configured key so tokens survive process restarts
    /// and can be validated by other instances sharing the key.
    #[must_use]
    pub fn from_seed(seed: [u8; SECRET_KEY_LENGTH]) -> Self {
        Self {
            signing_key: Arc::new(SigningKey::from_bytes(&seed)),
        }
    }

    /// Creates a token service with a random, process-local key.
    ///
    /// Tokens issued by an ephemeral service become invalid when the
    /// process exits.
    #[must_use]
    pub fn ephemeral() -> Self {
        let mut seed = [0u8; SECRET_KEY_LENGTH];
        rand::rng().fill(&mut seed);
        Self::from_seed(seed)
    }

    /// Issues a token binding `user_id` to the current time.
    ///
    /// Always succeeds; no server-side state is retained.
    #[must_use]
    pub fn issue(&self, user_id: u64) -> String {
        self.issue_at(user_id, Utc::now())
    }

    /// Issues a token with an explicit issue time.
    fn issue_at(&self, user_id: u64, issued_at: DateTime<Utc>) -> String {
        let claims = format!("{user_id}.{}", issued_at.timestamp_millis());
        let signature = self.signing_key.sign(claims.as_bytes());

        format!(
            "{TOKEN_PREFIX}.{}.{}",
            URL_SAFE_NO_PAD.encode(claims.as_bytes()),
            URL_SAFE_NO_PAD.encode(signature.to_bytes())
        )
    }

    /// Validates a token against the current time.
    ///
    /// Returns the embedded claims if the token is structurally sound,
    /// carries a valid signature, and was issued within the last 24 hours.
    /// Every failure mode returns a [`TokenError`]; this function never
    /// panics on untrusted input.
    pub fn validate(&self, token: &str) -> Result<TokenClaims, TokenError> {
        self.validate_at(token, Utc::now())
    }

    /// Validation against an explicit "now", so the window boundary is
    /// testable without sleeping.
    fn validate_at(&self, token: &str, now: DateTime<Utc>) -> Result<TokenClaims, TokenError> {
        if token.is_empty() {
            return Err(TokenError::Malformed);
        }

        let segments: Vec<&str> = token.split('.').collect();
        if segments.len() != 3 || segments[0] != TOKEN_PREFIX {
            trace!(segments = segments.len(), "Token has wrong structure");
            return Err(TokenError::Malformed);
        }

        let claims_bytes = URL_SAFE_NO_PAD
            .decode(segments[1])
            .map_err(|_| TokenError::InvalidEncoding)?;
        let claims =
            String::from_utf8(claims_bytes.clone()).map_err(|_| TokenError::InvalidEncoding)?;

        let (user_id, issued_at) = parse_claims(&claims)?;

        let signature_bytes = URL_SAFE_NO_PAD
            .decode(segments[2])
            .map_err(|_| TokenError::InvalidEncoding)?;
        let signature_array: [u8; SIGNATURE_LENGTH] = signature_bytes
            .try_into()
            .map_err(|_| TokenError::InvalidSignature)?;
        let signature = Signature::from_bytes(&signature_array);

        self.signing_key
            .verifying_key()
            .verify_strict(&claims_bytes, &signature)
            .map_err(|_| TokenError::InvalidSignature)?;

        let age = now.signed_duration_since(issued_at);
        if age > Duration::hours(VALIDITY_WINDOW_HOURS) || age < Duration::zero() {
            trace!(user_id, "Token outside validity window");
            return Err(TokenError::Expired);
        }

        Ok(TokenClaims { user_id, issued_at })
    }
}

/// Parses `<user_id>.<issued_at_unix_millis>` claim text.
fn parse_claims(claims: &str) -> Result<(u64, DateTime<Utc>), TokenError> {
    let (id_str, ts_str) = claims.split_once('.').ok_or(TokenError::Malformed)?;

    let user_id: u64 = id_str.parse().map_err(|_| TokenError::Malformed)?;
    let millis: i64 = ts_str.parse().map_err(|_| TokenError::Malformed)?;
    let issued_at = DateTime::from_timestamp_millis(millis).ok_or(TokenError::Malformed)?;

    Ok((user_id, issued_at))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Deterministic service for reproducible tests.
    fn test_service() -> TokenService {
        let mut seed = [0u8; SECRET_KEY_LENGTH];
        for (i, byte) in seed.iter_mut().enumerate() {
            *byte = (i as u8).wrapping_add(7);
        }
        TokenService::from_seed(seed)
    }

    #[test]
    fn issued_token_validates() {
        let tokens = test_service();
        let token = tokens.issue(1);

        let claims = tokens.validate(&token).expect("fresh token is valid");
        assert_eq!(claims.user_id, 1);
    }

    #[test]
    fn token_has_expected_structure() {
        let tokens = test_service();
        let token = tokens.issue(42);

        let segments: Vec<&str> = token.split('.').collect();
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0], "bt");
    }

    #[test]
    fn claims_round_trip_identity_and_time() {
        let tokens = test_service();
        let issued_at = DateTime::from_timestamp_millis(1_700_000_000_000).unwrap();

        let token = tokens.issue_at(9000, issued_at);
        let claims = tokens.validate_at(&token, issued_at).unwrap();

        assert_eq!(claims.user_id, 9000);
        assert_eq!(claims.issued_at, issued_at);
    }

    #[test]
    fn validates_just_inside_window() {
        let tokens = test_service();
        let issued_at = Utc::now();
        let token = tokens.issue_at(5, issued_at);

        let at = issued_at + Duration::hours(23) + Duration::minutes(59);
        assert!(tokens.validate_at(&token, at).is_ok());
    }

    #[test]
    fn fails_just_outside_window() {
        let tokens = test_service();
        let issued_at = Utc::now();
        let token = tokens.issue_at(5, issued_at);

        let at = issued_at + Duration::hours(24) + Duration::minutes(1);
        assert_eq!(tokens.validate_at(&token, at), Err(TokenError::Expired));
    }

    #[test]
    fn rejects_future_issue_time() {
        let tokens = test_service();
        let now = Utc::now();
        let token = tokens.issue_at(5, now + Duration::hours(1));

        assert_eq!(tokens.validate_at(&token, now), Err(TokenError::Expired));
    }

    #[test]
    fn empty_token_is_malformed() {
        let tokens = test_service();
        assert_eq!(tokens.validate(""), Err(TokenError::Malformed));
    }

    #[test]
    fn wrong_prefix_is_malformed() {
        let tokens = test_service();
        let token = tokens.issue(1);
        let forged = token.replacen("bt.", "xx.", 1);

        assert_eq!(tokens.validate(&forged), Err(TokenError::Malformed));
    }

    #[test]
    fn wrong_segment_count_is_malformed() {
        let tokens = test_service();
        assert_eq!(tokens.validate("bt.onlyone"), Err(TokenError::Malformed));
        assert_eq!(
            tokens.validate("bt.a.b.c.extra"),
            Err(TokenError::Malformed)
        );
    }

    #[test]
    fn garbage_base64_is_invalid_encoding() {
        let tokens = test_service();
        assert_eq!(
            tokens.validate("bt.!!!not-base64!!!.AAAA"),
            Err(TokenError::InvalidEncoding)
        );
    }

    #[test]
    fn unparsable_claims_are_malformed() {
        let tokens = test_service();
        let claims = URL_SAFE_NO_PAD.encode(b"not-numeric-claims");
        let token = format!("bt.{claims}.AAAA");

        assert_eq!(tokens.validate(&token), Err(TokenError::Malformed));
    }

    #[test]
    fn tampered_claims_fail_signature_check() {
        let tokens = test_service();
        let token = tokens.issue(1);
        let segments: Vec<&str> = token.split('.').collect();

        // Re-encode claims for a different user but keep the original
        // signature segment.
        let forged_claims = URL_SAFE_NO_PAD.encode(format!("2.{}", Utc::now().timestamp_millis()));
        let forged = format!("bt.{forged_claims}.{}", segments[2]);

        assert_eq!(
            tokens.validate(&forged),
            Err(TokenError::InvalidSignature)
        );
    }

    #[test]
    fn well_shaped_unsigned_token_does_not_validate() {
        let tokens = test_service();

        // An attacker who knows the shape but not the key cannot mint a
        // token that validates.
        let claims = format!("7.{}", Utc::now().timestamp_millis());
        let fake_sig = [0u8; SIGNATURE_LENGTH];
        let forged = format!(
            "bt.{}.{}",
            URL_SAFE_NO_PAD.encode(claims.as_bytes()),
            URL_SAFE_NO_PAD.encode(fake_sig)
        );

        assert_eq!(
            tokens.validate(&forged),
            Err(TokenError::InvalidSignature)
        );
    }

    #[test]
    fn wrong_length_signature_is_invalid() {
        let tokens = test_service();
        let claims = format!("7.{}", Utc::now().timestamp_millis());
        let forged = format!(
            "bt.{}.{}",
            URL_SAFE_NO_PAD.encode(claims.as_bytes()),
            URL_SAFE_NO_PAD.encode([0u8; 16])
        );

        assert_eq!(
            tokens.validate(&forged),
            Err(TokenError::InvalidSignature)
        );
    }

    #[test]
    fn token_from_different_key_is_rejected() {
        let issuer = test_service();
        let other = TokenService::ephemeral();

        let token = issuer.issue(1);
        assert_eq!(
            other.validate(&token),
            Err(TokenError::InvalidSignature)
        );
    }

    #[test]
    fn same_seed_validates_across_instances() {
        let seed = [9u8; SECRET_KEY_LENGTH];
        let issuer = TokenService::from_seed(seed);
        let validator = TokenService::from_seed(seed);

        let token = issuer.issue(3);
        assert_eq!(validator.validate(&token).unwrap().user_id, 3);
    }

    #[test]
    fn validation_is_stateless_and_repeatable() {
        let tokens = test_service();
        let token = tokens.issue(1);

        assert!(tokens.validate(&token).is_ok());
        assert!(tokens.validate(&token).is_ok());
    }

    #[test]
    fn error_format_classification() {
        assert!(TokenError::Malformed.is_format_error());
        assert!(TokenError::InvalidEncoding.is_format_error());
        assert!(!TokenError::InvalidSignature.is_format_error());
        assert!(!TokenError::Expired.is_format_error());
    }

    #[test]
    fn debug_redacts_key_material() {
        let tokens = test_service();
        let debug = format!("{tokens:?}");
        assert!(debug.contains("<redacted>"));
    }
}
