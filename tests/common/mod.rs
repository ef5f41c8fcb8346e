#![allow(dead_code)] // not every test binary touches every helper

//! Shared setup for database-backed tests.
//!
//! These tests exercise the engine against a real Postgres. They look for
//! `TEST_DATABASE_URL` and skip quietly when it is not set, so `cargo test`
//! stays green on machines without a database.

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

pub async fn try_pool() -> Option<PgPool> {
    let url = match std::env::var("TEST_DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("TEST_DATABASE_URL not set; skipping database test");
            return None;
        }
    };

    let pool = PgPoolOptions::new()
        .max_connections(8)
        .connect(&url)
        .await
        .expect("failed to connect to TEST_DATABASE_URL");

    // Concurrent callers serialize on sqlx's migration lock.
    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("failed to run migrations");

    Some(pool)
}

pub async fn seed_buyer(pool: &PgPool) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO users (id, username, email) VALUES ($1, $2, $3)")
        .bind(id)
        .bind(format!("buyer-{id}"))
        .bind(format!("buyer-{id}@example.com"))
        .execute(pool)
        .await
        .expect("failed to seed buyer");
    id
}

pub async fn seed_event(pool: &PgPool) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO events (id, title, location_name, start_time)
         VALUES ($1, $2, $3, now() + interval '7 days')",
    )
    .bind(id)
    .bind("Integration Gig")
    .bind("Test Hall")
    .execute(pool)
    .await
    .expect("failed to seed event");
    id
}

pub async fn seed_ticket_type(pool: &PgPool, event_id: Uuid, total: i32) -> i32 {
    let (id,): (i32,) = sqlx::query_as(
        "INSERT INTO ticket_types (event_id, name, price_cents, total_quantity, available_quantity)
         VALUES ($1, 'General', 2500, $2, $2)
         RETURNING id",
    )
    .bind(event_id)
    .bind(total)
    .fetch_one(pool)
    .await
    .expect("failed to seed ticket type");
    id
}

pub fn unique_ref(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4())
}

pub async fn available(pool: &PgPool, ticket_type_id: i32) -> i32 {
    let (available,): (i32,) =
        sqlx::query_as("SELECT available_quantity FROM ticket_types WHERE id = $1")
            .bind(ticket_type_id)
            .fetch_one(pool)
            .await
            .expect("failed to read availability");
    available
}
