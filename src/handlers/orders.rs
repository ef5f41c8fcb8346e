use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::{Order, Ticket, TicketType};
use crate::utils::error::AppError;
use crate::utils::response::success;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct TicketDetail {
    pub id: Uuid,
    pub ticket_type_id: i32,
    pub is_used: bool,
}

/// Order summary plus its tickets, as returned by the fulfillment and
/// order-lookup endpoints.
#[derive(Debug, Serialize)]
pub struct OrderWithTickets {
    pub id: Uuid,
    pub user_id: Uuid,
    pub event_id: Uuid,
    pub total_amount_cents: i64,
    pub status: String,
    pub payment_ref: String,
    pub ticket_quantity: i32,
    pub created_at: DateTime<Utc>,
    pub tickets: Vec<TicketDetail>,
}

impl OrderWithTickets {
    pub fn new(order: Order, tickets: &[Ticket]) -> Self {
        Self {
            id: order.id,
            user_id: order.user_id,
            event_id: order.event_id,
            total_amount_cents: order.total_amount_cents,
            status: order.status,
            payment_ref: order.payment_ref,
            ticket_quantity: order.ticket_quantity,
            created_at: order.created_at,
            tickets: tickets
                .iter()
                .map(|t| TicketDetail {
                    id: t.id,
                    ticket_type_id: t.ticket_type_id,
                    is_used: t.is_used,
                })
                .collect(),
        }
    }
}

/// GET /api/orders/payment/{payment_ref}
///
/// Recovery read for callers whose fulfillment call timed out: the
/// idempotency key resolves to the stored order, if any.
pub async fn get_order_by_payment_ref(
    State(state): State<AppState>,
    Path(payment_ref): Path<String>,
) -> Result<Response, AppError> {
    let order: Option<Order> = sqlx::query_as(
        "SELECT id, user_id, event_id, total_amount_cents, status, payment_ref, ticket_quantity, created_at
         FROM orders WHERE payment_ref = $1",
    )
    .bind(&payment_ref)
    .fetch_optional(&state.pool)
    .await?;

    let Some(order) = order else {
        return Err(AppError::NotFound(format!(
            "No order for payment reference '{payment_ref}'"
        )));
    };

    let tickets: Vec<Ticket> = sqlx::query_as(
        "SELECT id, order_id, event_id, user_id, ticket_type_id, is_used, created_at, redeemed_at
         FROM tickets WHERE order_id = $1
         ORDER BY created_at, id",
    )
    .bind(order.id)
    .fetch_all(&state.pool)
    .await?;

    Ok(success(OrderWithTickets::new(order, &tickets), "Order retrieved").into_response())
}

/// GET /api/events/{event_id}/ticket-types
///
/// Live availability for the purchase page.
pub async fn list_ticket_types(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let types: Vec<TicketType> = sqlx::query_as(
        "SELECT id, event_id, name, description, price_cents, total_quantity, available_quantity, created_at, updated_at
         FROM ticket_types WHERE event_id = $1
         ORDER BY price_cents, id",
    )
    .bind(event_id)
    .fetch_all(&state.pool)
    .await?;

    if types.is_empty() {
        // An event with no types yet is an empty list; an unknown event is 404.
        let event_exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM events WHERE id = $1")
            .bind(event_id)
            .fetch_optional(&state.pool)
            .await?;
        if event_exists.is_none() {
            return Err(AppError::NotFound(format!("Event {event_id} was not found")));
        }
    }

    Ok(success(types, "Ticket types retrieved").into_response())
}
