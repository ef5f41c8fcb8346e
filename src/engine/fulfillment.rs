use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::engine::inventory;
use crate::models::{Order, Ticket};
use crate::utils::error::{foreign_key_as_validation, AppError};

/// One (ticket type, quantity) pair of a purchase.
#[derive(Debug, Clone, Deserialize)]
pub struct LineItem {
    pub ticket_type_id: i32,
    pub quantity: i32,
}

/// The input contract of the pipeline: a confirmed payment plus the
/// requested ticket breakdown. Transient, never persisted as its own row.
#[derive(Debug, Clone)]
pub struct FulfillmentRequest {
    /// External payment reference; the idempotency key for retries.
    pub payment_ref: String,
    pub buyer_id: Uuid,
    pub event_id: Uuid,
    /// Amount as reported by the payment provider, e.g. "120,00 PLN".
    pub declared_amount: String,
    pub line_items: Vec<LineItem>,
}

#[derive(Debug)]
pub struct FulfilledOrder {
    pub order: Order,
    pub tickets: Vec<Ticket>,
    /// True when the payment reference had already been fulfilled and the
    /// stored result was returned instead of minting again.
    pub duplicate: bool,
}

/// Turns a confirmed payment into a durable order plus one uniquely-coded
/// ticket per purchased unit, depleting inventory, as a single transaction.
///
/// All-or-nothing: if any requested type cannot cover its quantity the
/// whole order is rejected with no partial depletion and no partial rows.
/// A payment reference that was already fulfilled returns the stored order
/// unchanged.
pub async fn fulfill(
    pool: &PgPool,
    request: FulfillmentRequest,
) -> Result<FulfilledOrder, AppError> {
    let total_amount_cents = validate(&request)?;
    let ticket_quantity: i32 = request.line_items.iter().map(|item| item.quantity).sum();

    let mut tx = pool.begin().await?;

    // The order row goes in first so a duplicate payment reference is
    // detected before any inventory moves. ON CONFLICT DO NOTHING waits out
    // a concurrent insert of the same reference, so exactly one caller
    // mints; the rest read the committed result below.
    let inserted: Option<Order> = sqlx::query_as(
        "INSERT INTO orders (user_id, event_id, total_amount_cents, status, payment_ref, ticket_quantity)
         VALUES ($1, $2, $3, 'completed', $4, $5)
         ON CONFLICT (payment_ref) DO NOTHING
         RETURNING id, user_id, event_id, total_amount_cents, status, payment_ref, ticket_quantity, created_at",
    )
    .bind(request.buyer_id)
    .bind(request.event_id)
    .bind(total_amount_cents)
    .bind(&request.payment_ref)
    .bind(ticket_quantity)
    .fetch_optional(&mut *tx)
    .await
    .map_err(|e| foreign_key_as_validation(e, "Order"))?;

    let Some(order) = inserted else {
        tx.rollback().await?;
        return previously_fulfilled(pool, &request.payment_ref).await;
    };

    for item in &request.line_items {
        inventory::reserve(&mut tx, request.event_id, item.ticket_type_id, item.quantity)
            .await?;
    }

    let mut tickets = Vec::with_capacity(ticket_quantity as usize);
    for item in &request.line_items {
        for _ in 0..item.quantity {
            let ticket: Ticket = sqlx::query_as(
                "INSERT INTO tickets (id, order_id, event_id, user_id, ticket_type_id)
                 VALUES ($1, $2, $3, $4, $5)
                 RETURNING id, order_id, event_id, user_id, ticket_type_id, is_used, created_at, redeemed_at",
            )
            .bind(Uuid::new_v4())
            .bind(order.id)
            .bind(order.event_id)
            .bind(order.user_id)
            .bind(item.ticket_type_id)
            .fetch_one(&mut *tx)
            .await?;
            tickets.push(ticket);
        }
    }

    tx.commit().await?;

    tracing::info!(
        order_id = %order.id,
        payment_ref = %order.payment_ref,
        tickets = tickets.len(),
        "Order fulfilled"
    );

    Ok(FulfilledOrder {
        order,
        tickets,
        duplicate: false,
    })
}

async fn previously_fulfilled(
    pool: &PgPool,
    payment_ref: &str,
) -> Result<FulfilledOrder, AppError> {
    let order: Order = sqlx::query_as(
        "SELECT id, user_id, event_id, total_amount_cents, status, payment_ref, ticket_quantity, created_at
         FROM orders WHERE payment_ref = $1",
    )
    .bind(payment_ref)
    .fetch_one(pool)
    .await?;

    let tickets: Vec<Ticket> = sqlx::query_as(
        "SELECT id, order_id, event_id, user_id, ticket_type_id, is_used, created_at, redeemed_at
         FROM tickets WHERE order_id = $1
         ORDER BY created_at, id",
    )
    .bind(order.id)
    .fetch_all(pool)
    .await?;

    tracing::info!(
        order_id = %order.id,
        payment_ref = %payment_ref,
        "Payment reference already fulfilled; returning stored order"
    );

    Ok(FulfilledOrder {
        order,
        tickets,
        duplicate: true,
    })
}

fn validate(request: &FulfillmentRequest) -> Result<i64, AppError> {
    if request.payment_ref.trim().is_empty() {
        return Err(AppError::ValidationError(
            "Payment reference is required".to_string(),
        ));
    }
    if request.line_items.is_empty() {
        return Err(AppError::ValidationError(
            "At least one ticket line item is required".to_string(),
        ));
    }
    for item in &request.line_items {
        if item.quantity <= 0 {
            return Err(AppError::ValidationError(format!(
                "Quantity for ticket type {} must be a positive integer",
                item.ticket_type_id
            )));
        }
    }
    parse_amount_cents(&request.declared_amount)
}

/// Parses a provider-reported amount into integer minor units. Tolerates a
/// currency prefix or suffix and a European decimal comma.
fn parse_amount_cents(raw: &str) -> Result<i64, AppError> {
    let trimmed = raw.trim();
    if trimmed.starts_with('-') {
        return Err(AppError::ValidationError(format!(
            "Amount {trimmed:?} must not be negative"
        )));
    }

    fn is_amount_char(c: char) -> bool {
        c.is_ascii_digit() || c == '.' || c == ','
    }
    let start = trimmed.find(is_amount_char).ok_or_else(|| {
        AppError::ValidationError(format!("No numeric amount found in {raw:?}"))
    })?;
    let run = &trimmed[start..];
    let end = run
        .find(|c: char| !is_amount_char(c))
        .unwrap_or(run.len());
    // A single decimal comma is treated as the decimal point.
    let normalized = run[..end].replacen(',', ".", 1);

    let amount: Decimal = normalized
        .parse()
        .map_err(|_| AppError::ValidationError(format!("Unparseable amount {raw:?}")))?;

    (amount * Decimal::from(100))
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or_else(|| AppError::ValidationError(format!("Amount {raw:?} is out of range")))
}
