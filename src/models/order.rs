use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One fulfilled purchase. Immutable once written; `payment_ref` is the
/// external payment reference and carries a UNIQUE constraint so a retried
/// fulfillment can never create a second order.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub event_id: Uuid,
    pub total_amount_cents: i64,
    pub status: String,
    pub payment_ref: String,
    pub ticket_quantity: i32,
    pub created_at: DateTime<Utc>,
}
