use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

use crate::utils::response::error as error_response;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Business condition, not a system failure: one or more requested
    /// ticket types cannot cover the quantity. The whole order is rejected.
    #[error("Inventory exhausted: {0}")]
    InventoryExhausted(String),

    /// Redemption hit a code that already went unused -> used. Reported
    /// distinctly from NotFound so door staff can tell "never valid" from
    /// "already entered".
    #[error("Ticket already used: {0}")]
    TicketAlreadyUsed(String),

    #[error("Database error")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Internal server error")]
    InternalServerError(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InventoryExhausted(_) => StatusCode::CONFLICT,
            AppError::TicketAlreadyUsed(_) => StatusCode::CONFLICT,
            AppError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::InventoryExhausted(_) => "INVENTORY_EXHAUSTED",
            AppError::TicketAlreadyUsed(_) => "TICKET_ALREADY_USED",
            AppError::DatabaseError(_) => "DATABASE_ERROR",
            AppError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    /// Whether a caller may safely retry the same request. Retries are safe
    /// on infrastructure failures because fulfillment is keyed on the
    /// payment reference and redemption on the ticket code.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::DatabaseError(_) | AppError::InternalServerError(_)
        )
    }

    fn log(&self) {
        match self {
            AppError::ValidationError(msg)
            | AppError::NotFound(msg)
            | AppError::InventoryExhausted(msg)
            | AppError::TicketAlreadyUsed(msg)
            | AppError::InternalServerError(msg) => {
                error!(error = ?self, message = %msg, "Application error");
            }
            AppError::DatabaseError(e) => {
                error!(error = ?e, "Database error");
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

        // Only expose high-level message to the client
        let public_message = match &self {
            AppError::ValidationError(msg)
            | AppError::NotFound(msg)
            | AppError::InventoryExhausted(msg)
            | AppError::TicketAlreadyUsed(msg)
            | AppError::InternalServerError(msg) => msg.clone(),
            AppError::DatabaseError(_) => "A database error occurred".to_string(),
        };

        // Do not expose internal details in the API response
        let details = None;

        error_response(code, public_message, details, status)
    }
}

/// Maps a failed insert to the validation taxonomy: referencing an unknown
/// buyer, event, or ticket type is caller error, not an outage.
pub fn foreign_key_as_validation(err: sqlx::Error, what: &str) -> AppError {
    match &err {
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
            AppError::ValidationError(format!("{what} references an unknown record"))
        }
        _ => AppError::DatabaseError(err),
    }
}
