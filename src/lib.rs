pub mod config;
pub mod engine;
pub mod handlers;
pub mod models;
pub mod notifier;
pub mod routes;
pub mod utils;

use sqlx::PgPool;

use crate::notifier::Notifier;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub notifier: Notifier,
}
