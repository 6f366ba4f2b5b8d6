/// Error handling for the API server
///
/// Handlers return `Result<T, ApiError>`. Every layer error converts into one
/// of these variants, which fixes the status code:
///
/// | Variant | Status |
/// |---|---|
/// | `BadRequest`, `ValidationError`, `Conflict` | 400 |
/// | `Unauthorized` | 401 |
/// | `NotFound` | 404 |
/// | `InternalError` | 500 |
///
/// Conflicts (duplicate email) are reported as 400 like any other invalid
/// input. Internal errors are logged and their detail is withheld.
///
/// # Example
///
/// ```
/// use tasktrack_api::error::{ApiError, ApiResult};
///
/// fn parse_age(raw: &str) -> ApiResult<i32> {
///     raw.parse()
///         .map_err(|_| ApiError::BadRequest("Age must be a number".to_string()))
/// }
///
/// assert!(parse_age("x").is_err());
/// ```

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    extract::multipart::{MultipartError, MultipartRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use tasktrack_shared::auth::password::PasswordError;
use tasktrack_shared::auth::session::SessionError;
use tasktrack_shared::avatar::AvatarError;
use tasktrack_shared::id::InvalidObjectId;
use tasktrack_shared::store::StoreError;
use tasktrack_shared::validation::FieldError;

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Malformed input (400)
    BadRequest(String),

    /// Field rules violated (400)
    ValidationError(Vec<FieldError>),

    /// Duplicate unique value (400)
    Conflict(String),

    /// Missing, invalid or revoked token (401)
    Unauthorized(String),

    /// Absent or not owned by the caller (404)
    NotFound(String),

    /// Store or infrastructure failure (500)
    InternalError(String),
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code (e.g., "bad_request", "unauthorized")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// Field-level failures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldError>>,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::ValidationError(_) | ApiError::Conflict(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 401 with the single message every auth failure shares
    pub fn unauthenticated() -> Self {
        ApiError::Unauthorized("Please authenticate.".to_string())
    }

    /// One-field validation failure
    pub fn invalid_field(field: &str, message: impl Into<String>) -> Self {
        ApiError::ValidationError(vec![FieldError::new(field, message)])
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::ValidationError(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let (error_code, message, details) = match self {
            ApiError::BadRequest(msg) => ("bad_request", msg, None),
            ApiError::ValidationError(errors) => (
                "validation_error",
                "Request validation failed".to_string(),
                Some(errors),
            ),
            ApiError::Conflict(msg) => ("conflict", msg, None),
            ApiError::Unauthorized(msg) => ("unauthorized", msg, None),
            ApiError::NotFound(msg) => ("not_found", msg, None),
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
            details,
        });

        (status, body).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(msg) => ApiError::Conflict(msg),
            StoreError::Database(e) => ApiError::InternalError(format!("Database error: {}", e)),
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        if err.is_unauthorized() {
            tracing::debug!(reason = %err, "Rejected session");
            ApiError::unauthenticated()
        } else {
            ApiError::InternalError(format!("Session error: {}", err))
        }
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::InternalError(format!("Password operation failed: {}", err))
    }
}

impl From<AvatarError> for ApiError {
    fn from(err: AvatarError) -> Self {
        if err.is_client_error() {
            ApiError::invalid_field("avatar", err.to_string())
        } else {
            ApiError::InternalError(format!("Avatar processing failed: {}", err))
        }
    }
}

impl From<InvalidObjectId> for ApiError {
    fn from(_: InvalidObjectId) -> Self {
        ApiError::BadRequest("Task ID must be 24 characters long and hexadecimal.".to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError::BadRequest(format!("Invalid upload: {}", err))
    }
}
