use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::engine::fulfillment::{self, FulfillmentRequest, LineItem};
use crate::handlers::orders::OrderWithTickets;
use crate::utils::error::AppError;
use crate::utils::response::{created, success};
use crate::AppState;

/// Confirmed-payment notification, in the payment provider's shape.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmedPayment {
    /// The provider's session/charge id; used as the idempotency key.
    pub transaction_id: String,
    pub user_id: Uuid,
    pub event_id: Uuid,
    pub total_amount: String,
    pub tickets: Vec<LineItem>,
}

/// POST /api/payments/confirmed
///
/// 201 with the fulfilled order, or 200 with the stored order when the
/// payment reference was already fulfilled (safe retry).
pub async fn confirm_payment(
    State(state): State<AppState>,
    Json(payload): Json<ConfirmedPayment>,
) -> Result<Response, AppError> {
    let request = FulfillmentRequest {
        payment_ref: payload.transaction_id,
        buyer_id: payload.user_id,
        event_id: payload.event_id,
        declared_amount: payload.total_amount,
        line_items: payload.tickets,
    };

    let fulfilled = fulfillment::fulfill(&state.pool, request).await?;
    let duplicate = fulfilled.duplicate;
    if !duplicate {
        state.notifier.dispatch(&fulfilled.order, &fulfilled.tickets);
    }

    let body = OrderWithTickets::new(fulfilled.order, &fulfilled.tickets);
    if duplicate {
        Ok(success(body, "Payment reference already fulfilled").into_response())
    } else {
        Ok(created(body, "Order fulfilled").into_response())
    }
}
