//! Error types for the BusTrack server.
//!
//! This module defines the API-facing error taxonomy and its mapping to
//! HTTP responses. Every error carries a wire message matching the
//! reference API contract (`{"message": ...}` bodies).
//!
//! # Error Types
//!
//! - [`ApiError`] - Request-level failures surfaced to HTTP callers
//!
//! Module-specific errors ([`DirectoryError`](crate::directory::DirectoryError)
//! and [`TokenError`](crate::token::TokenError)) convert into [`ApiError`] at
//! the handler boundary via `From`, so handlers propagate with `?`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error as ThisError;

use crate::directory::DirectoryError;
use crate::token::TokenError;

/// JSON error body: `{"message": "..."}`.
#[derive(Debug, Serialize)]
struct ErrorBody {
    message: String,
}

/// Request-level errors surfaced to HTTP callers.
///
/// # Error Categories
///
/// - **Conflict**: a resource already exists (duplicate email on register)
/// - **InvalidCredentials**: login failed; unknown email and wrong password
///   are deliberately indistinguishable
/// - **NotFound**: lookup of an absent resource (unknown profile id)
/// - **Unauthorized**: missing, malformed, or expired session token
/// - **Internal**: unexpected server-side failure, surfaced generically
#[derive(Debug, ThisError, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The resource already exists.
    #[error("user already exists")]
    Conflict,

    /// Authentication failed; the cause is not disclosed.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The requested resource does not exist.
    #[error("user not found")]
    NotFound,

    /// The session token is missing or invalid.
    #[error("invalid token")]
    Unauthorized,

    /// Unexpected internal failure. The detail is logged server-side and
    /// never sent to the caller.
    #[error("internal server error")]
    Internal,
}

impl ApiError {
    /// The HTTP status code this error maps to.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Conflict | Self::InvalidCredentials => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The wire message for the JSON body, matching the reference API.
    #[must_use]
    pub fn message(&self) -> &'static str {
        match self {
            Self::Conflict => "User already exists",
            Self::InvalidCredentials => "Invalid credentials",
            Self::NotFound => "User not found",
            Self::Unauthorized => "Invalid token",
            Self::Internal => "Server error",
        }
    }

    /// Returns `true` if this error indicates a client-side problem.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Internal)
    }

    /// Returns `true` if this error indicates a server-side problem.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::Internal)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            message: self.message().to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

impl From<DirectoryError> for ApiError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::Conflict => Self::Conflict,
            DirectoryError::InvalidCredentials => Self::InvalidCredentials,
            DirectoryError::NotFound => Self::NotFound,
        }
    }
}

impl From<TokenError> for ApiError {
    fn from(_: TokenError) -> Self {
        // Every token failure degrades to unauthenticated; the parse
        // detail is not disclosed to the caller.
        Self::Unauthorized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(ApiError::Conflict.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::InvalidCredentials.status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::Internal.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn wire_messages_match_reference_api() {
        assert_eq!(ApiError::Conflict.message(), "User already exists");
        assert_eq!(ApiError::InvalidCredentials.message(), "Invalid credentials");
        assert_eq!(ApiError::NotFound.message(), "User not found");
        assert_eq!(ApiError::Internal.message(), "Server error");
    }

    #[test]
    fn directory_errors_convert() {
        assert_eq!(ApiError::from(DirectoryError::Conflict), ApiError::Conflict);
        assert_eq!(
            ApiError::from(DirectoryError::InvalidCredentials),
            ApiError::InvalidCredentials
        );
        assert_eq!(ApiError::from(DirectoryError::NotFound), ApiError::NotFound);
    }

    #[test]
    fn token_errors_all_map_to_unauthorized() {
        assert_eq!(ApiError::from(TokenError::Malformed), ApiError::Unauthorized);
        assert_eq!(
            ApiError::from(TokenError::InvalidEncoding),
            ApiError::Unauthorized
        );
        assert_eq!(
            ApiError::from(TokenError::InvalidSignature),
            ApiError::Unauthorized
        );
        assert_eq!(ApiError::from(TokenError::Expired), ApiError::Unauthorized);
    }

    #[test]
    fn classification_helpers() {
        assert!(ApiError::Conflict.is_client_error());
        assert!(ApiError::InvalidCredentials.is_client_error());
        assert!(ApiError::NotFound.is_client_error());
        assert!(ApiError::Unauthorized.is_client_error());
        assert!(!ApiError::Internal.is_client_error());
        assert!(ApiError::Internal.is_server_error());
        assert!(!ApiError::Conflict.is_server_error());
    }

    #[tokio::test]
    async fn into_response_carries_message_body() {
        let response = ApiError::Conflict.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["message"], "User already exists");
    }
}
