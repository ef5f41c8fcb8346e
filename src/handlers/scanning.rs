use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::redemption::{self, RedeemOutcome, TicketStatus};
use crate::utils::error::AppError;
use crate::utils::response::success;
use crate::AppState;

/// The scanned QR payload: the ticket code, verbatim.
#[derive(Debug, Deserialize)]
pub struct ScanRequest {
    pub code: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResult {
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticket_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_used: Option<bool>,
}

/// POST /api/tickets/scan
///
/// Read-only peek for the scanner UI. A code that names no ticket is a
/// regular 200 with `exists: false`; the scanner renders it, it is not an
/// error.
pub async fn scan_ticket(
    State(state): State<AppState>,
    Json(payload): Json<ScanRequest>,
) -> Result<Response, AppError> {
    match redemption::lookup(&state.pool, &payload.code).await? {
        TicketStatus::Found { ticket_id, is_used } => {
            let result = ScanResult {
                exists: true,
                ticket_id: Some(ticket_id),
                is_used: Some(is_used),
            };
            Ok(success(result, "Ticket found").into_response())
        }
        TicketStatus::NotFound => {
            let result = ScanResult {
                exists: false,
                ticket_id: None,
                is_used: None,
            };
            Ok(success(
                result,
                format!("Ticket with code '{}' not found", payload.code),
            )
            .into_response())
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedeemRequest {
    pub ticket_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RedeemResult {
    pub ticket_id: Uuid,
    pub redeemed_at: Option<DateTime<Utc>>,
}

/// POST /api/tickets/redeem
///
/// Commits the one-way `unused -> used` transition. 404 for an unknown
/// code, 409 for a ticket that already entered, so door staff can tell the
/// two apart.
pub async fn redeem_ticket(
    State(state): State<AppState>,
    Json(payload): Json<RedeemRequest>,
) -> Result<Response, AppError> {
    match redemption::redeem(&state.pool, &payload.ticket_id).await? {
        RedeemOutcome::Redeemed(ticket) => {
            let result = RedeemResult {
                ticket_id: ticket.id,
                redeemed_at: ticket.redeemed_at,
            };
            Ok(success(result, "Ticket validated successfully").into_response())
        }
        RedeemOutcome::AlreadyUsed { ticket_id } => Err(AppError::TicketAlreadyUsed(format!(
            "Ticket {ticket_id} has already been used"
        ))),
        RedeemOutcome::NotFound => Err(AppError::NotFound(format!(
            "Ticket with code '{}' was not found",
            payload.ticket_id
        ))),
    }
}
