use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::utils::error::AppError;

/// Reserves `quantity` units of a ticket type inside the caller's
/// transaction.
///
/// The decrement is conditional on enough inventory remaining, so
/// concurrent reservations serialize on the row and can never jointly
/// oversell the type. Returns the new available count.
pub async fn reserve(
    tx: &mut Transaction<'_, Postgres>,
    event_id: Uuid,
    ticket_type_id: i32,
    quantity: i32,
) -> Result<i32, AppError> {
    let updated: Option<(i32,)> = sqlx::query_as(
        "UPDATE ticket_types
         SET available_quantity = available_quantity - $3, updated_at = now()
         WHERE id = $1 AND event_id = $2 AND available_quantity >= $3
         RETURNING available_quantity",
    )
    .bind(ticket_type_id)
    .bind(event_id)
    .bind(quantity)
    .fetch_optional(&mut **tx)
    .await?;

    if let Some((available,)) = updated {
        return Ok(available);
    }

    // Zero rows updated: tell an unknown ticket type apart from a sold-out
    // one before reporting.
    let current: Option<(i32,)> = sqlx::query_as(
        "SELECT available_quantity FROM ticket_types WHERE id = $1 AND event_id = $2",
    )
    .bind(ticket_type_id)
    .bind(event_id)
    .fetch_optional(&mut **tx)
    .await?;

    match current {
        None => Err(AppError::ValidationError(format!(
            "Ticket type {ticket_type_id} does not exist for this event"
        ))),
        Some((available,)) => Err(AppError::InventoryExhausted(format!(
            "Ticket type {ticket_type_id} has {available} left but {quantity} were requested"
        ))),
    }
}
