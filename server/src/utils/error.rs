use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{error, warn};

use crate::utils::response::error as error_response;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Out of stock: {0}")]
    OutOfStock(String),

    #[error("Tier expired: {0}")]
    TierExpired(String),

    #[error("Partial payment not allowed: {0}")]
    PartialNotAllowed(String),

    #[error("Already redeemed: {0}")]
    AlreadyRedeemed(String),

    #[error("Invalid code: {0}")]
    InvalidCode(String),

    #[error("Payment mismatch: {0}")]
    PaymentMismatch(String),

    #[error("Guest limit exceeded: {0}")]
    GuestLimitExceeded(String),

    #[error("Negative guests: {0}")]
    NegativeGuests(String),

    #[error("Already claimed: {0}")]
    AlreadyClaimed(String),

    #[error("Out of window: {0}")]
    OutOfWindow(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Database error")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Internal server error")]
    InternalServerError(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::OutOfStock(_)
            | AppError::AlreadyRedeemed(_)
            | AppError::AlreadyClaimed(_) => StatusCode::CONFLICT,
            AppError::TierExpired(_) | AppError::OutOfWindow(_) => StatusCode::GONE,
            AppError::PartialNotAllowed(_)
            | AppError::InvalidCode(_)
            | AppError::GuestLimitExceeded(_)
            | AppError::NegativeGuests(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::PaymentMismatch(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::AuthError(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::OutOfStock(_) => "OUT_OF_STOCK",
            AppError::TierExpired(_) => "TIER_EXPIRED",
            AppError::PartialNotAllowed(_) => "PARTIAL_NOT_ALLOWED",
            AppError::AlreadyRedeemed(_) => "ALREADY_REDEEMED",
            AppError::InvalidCode(_) => "INVALID_CODE",
            AppError::PaymentMismatch(_) => "PAYMENT_MISMATCH",
            AppError::GuestLimitExceeded(_) => "GUEST_LIMIT_EXCEEDED",
            AppError::NegativeGuests(_) => "NEGATIVE_GUESTS",
            AppError::AlreadyClaimed(_) => "ALREADY_CLAIMED",
            AppError::OutOfWindow(_) => "OUT_OF_WINDOW",
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::AuthError(_) => "AUTH_ERROR",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::DatabaseError(_) => "DATABASE_ERROR",
            AppError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    /// Rejections a door scanner shows as "not valid" rather than as a failure.
    pub fn is_scan_rejection(&self) -> bool {
        matches!(
            self,
            AppError::AlreadyRedeemed(_) | AppError::InvalidCode(_) | AppError::OutOfWindow(_)
        )
    }

    /// Human-readable message that is safe to show to the caller.
    pub fn public_message(&self) -> String {
        match self {
            AppError::OutOfStock(msg)
            | AppError::TierExpired(msg)
            | AppError::PartialNotAllowed(msg)
            | AppError::AlreadyRedeemed(msg)
            | AppError::InvalidCode(msg)
            | AppError::PaymentMismatch(msg)
            | AppError::GuestLimitExceeded(msg)
            | AppError::NegativeGuests(msg)
            | AppError::AlreadyClaimed(msg)
            | AppError::OutOfWindow(msg)
            | AppError::ValidationError(msg)
            | AppError::AuthError(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg)
            | AppError::InternalServerError(msg) => msg.clone(),
            AppError::DatabaseError(_) => "A database error occurred".to_string(),
        }
    }

    fn log(&self) {
        match self {
            AppError::DatabaseError(e) => {
                error!(error = ?e, "Database error");
            }
            AppError::InternalServerError(msg) => {
                error!(error = ?self, message = %msg, "Application error");
            }
            _ => {
                warn!(code = self.code(), message = %self.public_message(), "Request rejected");
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        // Log internal details
        self.log();

        // Do not expose internal details in the API response
        let details = None;

        error_response(code, self.public_message(), details, status)
    }
}
