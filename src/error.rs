use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// The application's error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// A database pool error.
    #[error("Pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    /// A PostgreSQL error.
    #[error("Database error: {0}")]
    Database(#[from] tokio_postgres::Error),

    /// A Redis error.
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// An I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A login failure. The message is identical for unknown email and
    /// wrong password.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// No authenticated session attached to the request.
    #[error("Unauthorized")]
    Unauthorized,

    /// A CSRF check failure.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// A resource not found error.
    #[error("Resource not found")]
    NotFound,

    /// A malformed request (missing/invalid parameter).
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// A validation error on user-supplied fields.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A uniqueness conflict (duplicate email).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A multipart error.
    #[error("Multipart error: {0}")]
    Multipart(String),

    /// A missing column in a database row.
    #[error("Missing data: {0}")]
    MissingData(String),

    /// An internal server error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<deadpool_postgres::CreatePoolError> for AppError {
    fn from(e: deadpool_postgres::CreatePoolError) -> Self {
        AppError::Internal(format!("Pool creation failed: {}", e))
    }
}

/// A `Result` type that uses `AppError` as the error type.
pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    /// Maps the error to an HTTP status and the client-facing message.
    ///
    /// Infrastructure failures are logged server-side and collapse to a
    /// generic message so no internal detail crosses the boundary.
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            AppError::Pool(e) => {
                tracing::error!("Pool error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }

            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }

            AppError::Redis(e) => {
                tracing::error!("Redis error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }

            AppError::Io(e) => {
                tracing::error!("IO error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }

            AppError::InvalidCredentials => {
                tracing::warn!("Login failed");
                (StatusCode::UNAUTHORIZED, "Invalid credentials".to_string())
            }

            AppError::Unauthorized => {
                tracing::warn!("Unauthenticated request rejected");
                (StatusCode::UNAUTHORIZED, "Unauthorized".to_string())
            }

            AppError::Forbidden(msg) => {
                tracing::warn!("CSRF rejection: {}", msg);
                (StatusCode::FORBIDDEN, "Invalid CSRF token".to_string())
            }

            AppError::NotFound => {
                tracing::debug!("Resource not found");
                (StatusCode::NOT_FOUND, "User not found".to_string())
            }

            AppError::BadRequest(msg) => {
                tracing::debug!("Bad request: {}", msg);
                (StatusCode::BAD_REQUEST, msg.clone())
            }

            AppError::Validation(msg) => {
                tracing::debug!("Validation error: {}", msg);
                (StatusCode::UNPROCESSABLE_ENTITY, msg.clone())
            }

            AppError::Conflict(msg) => {
                tracing::debug!("Conflict: {}", msg);
                (StatusCode::CONFLICT, msg.clone())
            }

            AppError::Multipart(msg) => {
                tracing::debug!("Multipart error: {}", msg);
                (StatusCode::BAD_REQUEST, msg.clone())
            }

            AppError::MissingData(col) => {
                tracing::error!("Missing column in row: {}", col);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }

            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();

        let body = sonic_rs::to_string(&sonic_rs::json!({
            "error": message
        }))
        .unwrap_or_else(|_| r#"{"error":"Internal server error"}"#.to_string());

        (status, body).into_response()
    }
}
