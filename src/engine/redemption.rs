use sqlx::PgPool;
use uuid::Uuid;

use crate::models::Ticket;
use crate::utils::error::AppError;

/// Result of an attempted `unused -> used` transition.
#[derive(Debug)]
pub enum RedeemOutcome {
    Redeemed(Ticket),
    AlreadyUsed { ticket_id: Uuid },
    NotFound,
}

/// Read-only status of a presented code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketStatus {
    Found { ticket_id: Uuid, is_used: bool },
    NotFound,
}

// Ticket codes are uuids; anything else cannot name a ticket and is
// answered without touching the store.
fn parse_code(code: &str) -> Option<Uuid> {
    Uuid::parse_str(code.trim()).ok()
}

/// Pre-scan peek for the scanner UI. Never mutates state.
pub async fn lookup(pool: &PgPool, code: &str) -> Result<TicketStatus, AppError> {
    let Some(ticket_id) = parse_code(code) else {
        return Ok(TicketStatus::NotFound);
    };

    let row: Option<(Uuid, bool)> =
        sqlx::query_as("SELECT id, is_used FROM tickets WHERE id = $1")
            .bind(ticket_id)
            .fetch_optional(pool)
            .await?;

    Ok(match row {
        Some((id, is_used)) => TicketStatus::Found {
            ticket_id: id,
            is_used,
        },
        None => TicketStatus::NotFound,
    })
}

/// Marks a ticket used, exactly once.
///
/// The transition is one conditional UPDATE, so two racing scans of the
/// same code produce exactly one `Redeemed`; the loser observes
/// `AlreadyUsed`.
pub async fn redeem(pool: &PgPool, code: &str) -> Result<RedeemOutcome, AppError> {
    let Some(ticket_id) = parse_code(code) else {
        return Ok(RedeemOutcome::NotFound);
    };

    let redeemed: Option<Ticket> = sqlx::query_as(
        "UPDATE tickets
         SET is_used = TRUE, redeemed_at = now()
         WHERE id = $1 AND is_used = FALSE
         RETURNING id, order_id, event_id, user_id, ticket_type_id, is_used, created_at, redeemed_at",
    )
    .bind(ticket_id)
    .fetch_optional(pool)
    .await?;

    if let Some(ticket) = redeemed {
        tracing::info!(ticket_id = %ticket.id, "Ticket redeemed");
        return Ok(RedeemOutcome::Redeemed(ticket));
    }

    // Zero rows changed: either the code is unknown or the ticket had
    // already been used (including losing a concurrent scan).
    let existing: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM tickets WHERE id = $1")
        .bind(ticket_id)
        .fetch_optional(pool)
        .await?;

    Ok(match existing {
        Some((id,)) => {
            tracing::warn!(ticket_id = %id, "Redemption refused: ticket already used");
            RedeemOutcome::AlreadyUsed { ticket_id: id }
        }
        None => RedeemOutcome::NotFound,
    })
}
