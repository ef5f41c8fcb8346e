use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A purchasable category of admission within one event.
///
/// `available_quantity` only ever moves downward, through the conditional
/// decrement in the inventory module, and stays within `0..=total_quantity`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TicketType {
    pub id: i32,
    pub event_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub total_quantity: i32,
    pub available_quantity: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One admission unit. The id doubles as the redemption code carried in
/// the QR payload, so it must be unguessable (uuid v4).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Ticket {
    pub id: Uuid,
    pub order_id: Uuid,
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub ticket_type_id: i32,
    pub is_used: bool,
    pub created_at: DateTime<Utc>,
    pub redeemed_at: Option<DateTime<Utc>>,
}
