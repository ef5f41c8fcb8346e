use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::config::{create_cors_layer, create_security_headers_layer};
use crate::handlers::{health_check, orders, payments, scanning};
use crate::AppState;

pub fn create_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/payments/confirmed", post(payments::confirm_payment))
        .route("/api/tickets/scan", post(scanning::scan_ticket))
        .route("/api/tickets/redeem", post(scanning::redeem_ticket))
        .route(
            "/api/orders/payment/:payment_ref",
            get(orders::get_order_by_payment_ref),
        )
        .route(
            "/api/events/:event_id/ticket-types",
            get(orders::list_ticket_types),
        )
        .layer(TraceLayer::new_for_http())
        .layer(create_security_headers_layer())
        .layer(create_cors_layer())
        .with_state(state)
}
