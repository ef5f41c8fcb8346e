use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Display data for a scheduled event. Event CRUD lives outside this
/// service; the engine only reads events for validation and confirmations.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub location_name: String,
    pub location_address: Option<String>,
    pub start_time: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    /// Single-line venue string for confirmation messages.
    pub fn display_location(&self) -> String {
        match self.location_address.as_deref() {
            Some(address) if !address.is_empty() => {
                format!("{}, {}", self.location_name, address)
            }
            _ => self.location_name.clone(),
        }
    }
}
