// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};
use std::collections::HashMap;

/// HTTP API error with stable machine-readable codes and client-safe messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    MissingFields(String),
    ValidationError {
        message: String,
        field_errors: Option<HashMap<String, String>>,
    },
    InvalidType(String),
    VerificationFailed(String),

    // 401 Unauthorized
    MissingToken(String),
    InvalidToken(String),
    InvalidCredentials(String),
    Unauthorized(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    UserNotFound(String),
    NotFound(String),

    // 409 Conflict
    EmailExists(String),

    // 429 Too Many Requests
    TooManyRequests(String),

    // 500 Internal Server Error
    InternalServerError(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::MissingFields(_) => 400,
            ApiError::ValidationError { .. } => 400,
            ApiError::InvalidType(_) => 400,
            ApiError::VerificationFailed(_) => 400,
            ApiError::MissingToken(_) => 401,
            ApiError::InvalidToken(_) => 401,
            ApiError::InvalidCredentials(_) => 401,
            ApiError::Unauthorized(_) => 401,
            ApiError::Forbidden(_) => 403,
            ApiError::UserNotFound(_) => 404,
            ApiError::NotFound(_) => 404,
            ApiError::EmailExists(_) => 409,
            ApiError::TooManyRequests(_) => 429,
            ApiError::InternalServerError(_) => 500,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::MissingFields(msg) => msg,
            ApiError::ValidationError { message, .. } => message,
            ApiError::InvalidType(msg) => msg,
            ApiError::VerificationFailed(msg) => msg,
            ApiError::MissingToken(msg) => msg,
            ApiError::InvalidToken(msg) => msg,
            ApiError::InvalidCredentials(msg) => msg,
            ApiError::Unauthorized(msg) => msg,
            ApiError::Forbidden(msg) => msg,
            ApiError::UserNotFound(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::EmailExists(msg) => msg,
            ApiError::TooManyRequests(msg) => msg,
            ApiError::InternalServerError(msg) => msg,
        }
    }

    /// Get stable error code for programmatic client branching
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::MissingFields(_) => "MISSING_FIELDS",
            ApiError::ValidationError { .. } => "VALIDATION_ERROR",
            ApiError::InvalidType(_) => "INVALID_TYPE",
            ApiError::VerificationFailed(_) => "VERIFICATION_FAILED",
            ApiError::MissingToken(_) => "MISSING_TOKEN",
            ApiError::InvalidToken(_) => "INVALID_TOKEN",
            ApiError::InvalidCredentials(_) => "INVALID_CREDENTIALS",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::UserNotFound(_) => "USER_NOT_FOUND",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::EmailExists(_) => "EMAIL_EXISTS",
            ApiError::TooManyRequests(_) => "TOO_MANY_REQUESTS",
            ApiError::InternalServerError(_) => "SERVER_ERROR",
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        match self {
            ApiError::ValidationError { message, field_errors } => {
                let mut response = json!({
                    "error": true,
                    "message": message,
                    "code": "VALIDATION_ERROR"
                });

                if let Some(field_errors) = field_errors {
                    response["field_errors"] = json!(field_errors);
                }

                response
            }
            _ => {
                json!({
                    "error": true,
                    "message": self.message(),
                    "code": self.error_code()
                })
            }
        }
    }
}

// Static constructor methods
impl ApiError {
    pub fn missing_fields(message: impl Into<String>) -> Self {
        ApiError::MissingFields(message.into())
    }

    pub fn validation_error(
        message: impl Into<String>,
        field_errors: Option<HashMap<String, String>>,
    ) -> Self {
        ApiError::ValidationError {
            message: message.into(),
            field_errors,
        }
    }

    pub fn invalid_type(message: impl Into<String>) -> Self {
        ApiError::InvalidType(message.into())
    }

    pub fn verification_failed() -> Self {
        // Single flat message on purpose: callers must not be able to tell
        // wrong-code from expired from not-found.
        ApiError::VerificationFailed("Verification failed".to_string())
    }

    pub fn missing_token(message: impl Into<String>) -> Self {
        ApiError::MissingToken(message.into())
    }

    pub fn invalid_token(message: impl Into<String>) -> Self {
        ApiError::InvalidToken(message.into())
    }

    pub fn invalid_credentials() -> Self {
        ApiError::InvalidCredentials("Invalid email or password".to_string())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn user_not_found() -> Self {
        ApiError::UserNotFound("User not found".to_string())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn email_exists() -> Self {
        ApiError::EmailExists("An account with this email already exists".to_string())
    }

    pub fn too_many_requests(message: impl Into<String>) -> Self {
        ApiError::TooManyRequests(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }
}

// Convert other error types to ApiError
impl From<crate::database::manager::DatabaseError> for ApiError {
    fn from(err: crate::database::manager::DatabaseError) -> Self {
        match err {
            crate::database::manager::DatabaseError::NotFound(msg) => ApiError::not_found(msg),
            other => {
                // Don't expose internal database errors to clients
                tracing::error!("Database error: {}", other);
                ApiError::internal_server_error("An error occurred while processing your request")
            }
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!("SQLx error: {}", err);
        ApiError::internal_server_error("Database error occurred")
    }
}

impl From<crate::services::token_service::TokenError> for ApiError {
    fn from(err: crate::services::token_service::TokenError) -> Self {
        use crate::services::token_service::TokenError;
        match err {
            TokenError::InvalidToken => ApiError::invalid_token("Invalid or expired refresh token"),
            TokenError::UserNotFound => ApiError::user_not_found(),
            TokenError::SigningKeyMissing => {
                tracing::error!("JWT signing secret not configured");
                ApiError::internal_server_error("Authentication temporarily unavailable")
            }
            TokenError::Jwt(e) => {
                tracing::error!("JWT encoding error: {}", e);
                ApiError::internal_server_error("Failed to issue tokens")
            }
            TokenError::Database(e) => {
                tracing::error!("Token store error: {}", e);
                ApiError::internal_server_error("An error occurred while processing your request")
            }
        }
    }
}

impl From<crate::services::verification_service::VerificationError> for ApiError {
    fn from(err: crate::services::verification_service::VerificationError) -> Self {
        use crate::services::verification_service::VerificationError;
        match err {
            // Wrong code, expired code, and unknown email all collapse into one
            // generic failure so the endpoint cannot be used for enumeration.
            VerificationError::NoMatch | VerificationError::Expired | VerificationError::AlreadyUsed => {
                ApiError::verification_failed()
            }
            VerificationError::Throttled => {
                ApiError::too_many_requests("A code was sent recently, try again later")
            }
            VerificationError::Database(e) => {
                tracing::error!("Verification store error: {}", e);
                ApiError::internal_server_error("An error occurred while processing your request")
            }
        }
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authentication_failures_are_401() {
        assert_eq!(ApiError::missing_token("no header").status_code(), 401);
        assert_eq!(ApiError::invalid_token("bad sig").status_code(), 401);
        assert_eq!(ApiError::missing_token("x").error_code(), "MISSING_TOKEN");
        assert_eq!(ApiError::invalid_token("x").error_code(), "INVALID_TOKEN");
    }

    #[test]
    fn authorization_failure_is_403_forbidden() {
        let err = ApiError::forbidden("missing capability");
        assert_eq!(err.status_code(), 403);
        assert_eq!(err.error_code(), "FORBIDDEN");
    }

    #[test]
    fn verification_failure_is_generic() {
        let err = ApiError::verification_failed();
        let body = err.to_json();
        assert_eq!(body["code"], "VERIFICATION_FAILED");
        // The message must not leak which check failed
        assert_eq!(body["message"], "Verification failed");
    }

    #[test]
    fn body_carries_stable_code_field() {
        let body = ApiError::email_exists().to_json();
        assert_eq!(body["error"], true);
        assert_eq!(body["code"], "EMAIL_EXISTS");
    }
}
