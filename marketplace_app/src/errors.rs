// marketplace_app/src/errors.rs

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use krishi::{ErrorKind, SettlementError};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
  #[error("Validation Error: {0}")]
  Validation(String),

  #[error("Authentication Failed: {0}")]
  Auth(String),

  /// Authenticated, but not the party allowed to act on the resource.
  #[error("Forbidden: {0}")]
  Forbidden(String),

  #[error("Resource Not Found: {0}")]
  NotFound(String),

  #[error("Conflict: {0}")]
  Conflict(String),

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Database Error: {0}")]
  Sqlx(#[from] sqlx::Error),

  #[error(transparent)]
  Settlement(#[from] SettlementError),

  #[error("Internal Server Error: {0}")]
  Internal(String),
}

fn settlement_status(kind: ErrorKind) -> StatusCode {
  match kind {
    ErrorKind::Validation => StatusCode::BAD_REQUEST,
    ErrorKind::Auth => StatusCode::UNAUTHORIZED,
    ErrorKind::NotFound => StatusCode::NOT_FOUND,
    ErrorKind::Conflict | ErrorKind::Consistency => StatusCode::CONFLICT,
    ErrorKind::Upstream => StatusCode::SERVICE_UNAVAILABLE,
    ErrorKind::Storage | ErrorKind::Pipeline => StatusCode::INTERNAL_SERVER_ERROR,
  }
}

impl ResponseError for AppError {
  fn status_code(&self) -> StatusCode {
    match self {
      AppError::Validation(_) => StatusCode::BAD_REQUEST,
      AppError::Auth(_) => StatusCode::UNAUTHORIZED,
      AppError::Forbidden(_) => StatusCode::FORBIDDEN,
      AppError::NotFound(_) => StatusCode::NOT_FOUND,
      AppError::Conflict(_) => StatusCode::CONFLICT,
      AppError::Settlement(err) => settlement_status(err.kind()),
      AppError::Config(_) | AppError::Sqlx(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }

  fn error_response(&self) -> HttpResponse {
    let status = self.status_code();
    if status.is_server_error() {
      tracing::error!(application_error = %self, "Responding with error");
    } else {
      tracing::warn!(application_error = %self, status = status.as_u16(), "Responding with error");
    }

    let body = match self {
      AppError::Validation(m) | AppError::Auth(m) | AppError::Forbidden(m) | AppError::NotFound(m) | AppError::Conflict(m) => {
        json!({ "error": m })
      }
      AppError::Config(_) => json!({ "error": "Configuration issue" }),
      AppError::Sqlx(_) => json!({ "error": "Database operation failed" }),
      AppError::Internal(_) => json!({ "error": "An internal error occurred" }),
      AppError::Settlement(err) => match err {
        SettlementError::Consistency { gateway_order_ref, .. } => json!({
          "error": err.to_string(),
          "gateway_order_ref": gateway_order_ref,
          "requires_refund": true,
        }),
        SettlementError::Storage { .. } => json!({ "error": "Database operation failed" }),
        SettlementError::Pipeline(_) => json!({ "error": "An internal error occurred" }),
        _ => json!({ "error": err.to_string() }),
      },
    };

    HttpResponse::build(status).json(body)
  }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;
