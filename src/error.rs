//! Error types and HTTP error response handling.
//!
//! This module defines all application errors and how they are converted
//! into HTTP responses with appropriate status codes and JSON bodies.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::providers::ProviderError;

/// Application-wide error type.
///
/// Callers can tell "not found" from "upstream failure" from "validation
/// failure"; nothing is swallowed into an empty result.
///
/// # Error Categories
///
/// - **Session Errors**: missing/expired session, bad credentials
/// - **Resource Errors**: user profile or bank record not found
/// - **Business Rule Errors**: duplicate link, no funding source, no account
/// - **Validation Errors**: invalid request data
/// - **Upstream Errors**: identity, document, aggregator or processor failures
///   (local postgres storage failures surface as 500 instead of 502)
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A provider call failed.
    ///
    /// Returns HTTP 502 Bad Gateway; provider details are logged, not returned.
    #[error("Upstream error: {0}")]
    Upstream(#[from] ProviderError),

    /// No session cookie, or the session is no longer valid.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("Not signed in")]
    Unauthorized,

    /// Email/password pair was rejected.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("Invalid credentials. Please try again.")]
    InvalidCredentials,

    /// Identity exists but has no profile document.
    ///
    /// Returns HTTP 404 Not Found.
    #[error("User not found")]
    UserNotFound,

    /// Bank record does not exist or belongs to another user.
    ///
    /// Returns HTTP 404 Not Found.
    #[error("Bank account not found")]
    BankNotFound,

    /// Sign-up with an email the identity provider already knows.
    ///
    /// Returns HTTP 409 Conflict.
    #[error("Email is already registered")]
    EmailAlreadyRegistered,

    /// The selected aggregator account already has a bank record.
    ///
    /// Returns HTTP 409 Conflict.
    #[error("Bank account is already linked")]
    BankAlreadyLinked,

    /// The processor accepted the request but returned no funding source.
    ///
    /// Returns HTTP 422 Unprocessable Entity.
    #[error("Funding source was not created")]
    FundingSourceNotCreated,

    /// The linked item exposes no accounts.
    ///
    /// Returns HTTP 422 Unprocessable Entity.
    #[error("Linked item has no accounts")]
    NoLinkableAccount,

    /// Request body or parameters are invalid.
    ///
    /// Returns HTTP 400 Bad Request.
    #[error("Invalid request")]
    InvalidRequest(String),
}

impl AppError {
    /// Machine-readable code used in the JSON body.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Upstream(ProviderError::Storage(_)) => "internal_error",
            AppError::Upstream(_) => "upstream_error",
            AppError::Unauthorized => "unauthorized",
            AppError::InvalidCredentials => "invalid_credentials",
            AppError::UserNotFound => "user_not_found",
            AppError::BankNotFound => "bank_not_found",
            AppError::EmailAlreadyRegistered => "email_already_registered",
            AppError::BankAlreadyLinked => "bank_already_linked",
            AppError::FundingSourceNotCreated => "funding_source_not_created",
            AppError::NoLinkableAccount => "no_linkable_account",
            AppError::InvalidRequest(_) => "invalid_request",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Upstream(ProviderError::Storage(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::Unauthorized | AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::UserNotFound | AppError::BankNotFound => StatusCode::NOT_FOUND,
            AppError::EmailAlreadyRegistered | AppError::BankAlreadyLinked => StatusCode::CONFLICT,
            AppError::FundingSourceNotCreated | AppError::NoLinkableAccount => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

/// Convert AppError into an HTTP response.
///
/// # Response Format
///
/// All errors return JSON in this format:
/// ```json
/// {
///   "error": {
///     "code": "error_type",
///     "message": "Human-readable error message"
///   }
/// }
/// ```
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = match &self {
            AppError::InvalidRequest(msg) => msg.clone(),
            AppError::Upstream(ProviderError::Storage(err)) => {
                tracing::error!(error = %err, "Document storage failure");
                "An internal error occurred".to_string()
            }
            AppError::Upstream(err) => {
                tracing::error!(error = %err, "Upstream provider failure");
                "An upstream provider failed".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": {
                "code": self.code(),
                "message": message
            }
        }));

        (self.status(), body).into_response()
    }
}
