mod common;

use std::collections::HashSet;

use boxoffice_server::engine::fulfillment::{fulfill, FulfillmentRequest, LineItem};
use boxoffice_server::utils::error::AppError;
use uuid::Uuid;

fn request(
    payment_ref: String,
    buyer_id: Uuid,
    event_id: Uuid,
    amount: &str,
    line_items: Vec<LineItem>,
) -> FulfillmentRequest {
    FulfillmentRequest {
        payment_ref,
        buyer_id,
        event_id,
        declared_amount: amount.to_string(),
        line_items,
    }
}

#[tokio::test]
async fn fulfill_mints_tickets_and_depletes_inventory() {
    let Some(pool) = common::try_pool().await else { return };
    let buyer = common::seed_buyer(&pool).await;
    let event = common::seed_event(&pool).await;
    let general = common::seed_ticket_type(&pool, event, 5).await;
    let vip = common::seed_ticket_type(&pool, event, 3).await;

    let fulfilled = fulfill(
        &pool,
        request(
            common::unique_ref("pay"),
            buyer,
            event,
            "89,97 PLN",
            vec![
                LineItem { ticket_type_id: general, quantity: 2 },
                LineItem { ticket_type_id: vip, quantity: 1 },
            ],
        ),
    )
    .await
    .expect("fulfillment should succeed");

    assert!(!fulfilled.duplicate);
    assert_eq!(fulfilled.order.status, "completed");
    assert_eq!(fulfilled.order.total_amount_cents, 8997);
    assert_eq!(fulfilled.order.ticket_quantity, 3);
    assert_eq!(fulfilled.tickets.len(), 3);
    assert!(fulfilled.tickets.iter().all(|t| !t.is_used));

    // Every minted code is fresh and unique.
    let codes: HashSet<Uuid> = fulfilled.tickets.iter().map(|t| t.id).collect();
    assert_eq!(codes.len(), 3);

    assert_eq!(common::available(&pool, general).await, 3);
    assert_eq!(common::available(&pool, vip).await, 2);
}

#[tokio::test]
async fn short_inventory_rejects_the_whole_order() {
    let Some(pool) = common::try_pool().await else { return };
    let buyer = common::seed_buyer(&pool).await;
    let event = common::seed_event(&pool).await;
    let plenty = common::seed_ticket_type(&pool, event, 5).await;
    let scarce = common::seed_ticket_type(&pool, event, 1).await;

    let payment_ref = common::unique_ref("pay");
    let err = fulfill(
        &pool,
        request(
            payment_ref.clone(),
            buyer,
            event,
            "100.00",
            vec![
                LineItem { ticket_type_id: plenty, quantity: 2 },
                LineItem { ticket_type_id: scarce, quantity: 2 },
            ],
        ),
    )
    .await
    .expect_err("fulfillment should be rejected");

    assert!(matches!(err, AppError::InventoryExhausted(_)));

    // All-or-nothing: the first reservation rolled back with the rest.
    assert_eq!(common::available(&pool, plenty).await, 5);
    assert_eq!(common::available(&pool, scarce).await, 1);

    let orders: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM orders WHERE payment_ref = $1")
            .bind(&payment_ref)
            .fetch_optional(&pool)
            .await
            .unwrap();
    assert!(orders.is_none(), "no order row may survive a rejected fulfillment");
}

#[tokio::test]
async fn sold_out_type_stays_at_zero() {
    let Some(pool) = common::try_pool().await else { return };
    let buyer = common::seed_buyer(&pool).await;
    let event = common::seed_event(&pool).await;
    let ticket_type = common::seed_ticket_type(&pool, event, 2).await;

    let fulfilled = fulfill(
        &pool,
        request(
            common::unique_ref("pay1"),
            buyer,
            event,
            "50.00",
            vec![LineItem { ticket_type_id: ticket_type, quantity: 2 }],
        ),
    )
    .await
    .expect("first fulfillment should succeed");
    assert_eq!(fulfilled.tickets.len(), 2);
    assert_eq!(common::available(&pool, ticket_type).await, 0);

    let err = fulfill(
        &pool,
        request(
            common::unique_ref("pay2"),
            buyer,
            event,
            "25.00",
            vec![LineItem { ticket_type_id: ticket_type, quantity: 1 }],
        ),
    )
    .await
    .expect_err("sold-out type must reject");
    assert!(matches!(err, AppError::InventoryExhausted(_)));
    assert_eq!(common::available(&pool, ticket_type).await, 0);
}

#[tokio::test]
async fn duplicate_payment_ref_returns_the_stored_order() {
    let Some(pool) = common::try_pool().await else { return };
    let buyer = common::seed_buyer(&pool).await;
    let event = common::seed_event(&pool).await;
    let ticket_type = common::seed_ticket_type(&pool, event, 10).await;

    let payment_ref = common::unique_ref("pay");
    let first = fulfill(
        &pool,
        request(
            payment_ref.clone(),
            buyer,
            event,
            "75.00",
            vec![LineItem { ticket_type_id: ticket_type, quantity: 3 }],
        ),
    )
    .await
    .expect("first fulfillment should succeed");

    // A retried confirmation, even with a different breakdown, must not
    // mint again or deplete inventory twice.
    let retried = fulfill(
        &pool,
        request(
            payment_ref.clone(),
            buyer,
            event,
            "75.00",
            vec![LineItem { ticket_type_id: ticket_type, quantity: 5 }],
        ),
    )
    .await
    .expect("duplicate fulfillment should return the stored order");

    assert!(retried.duplicate);
    assert_eq!(retried.order.id, first.order.id);
    assert_eq!(retried.tickets.len(), first.tickets.len());

    let first_codes: HashSet<Uuid> = first.tickets.iter().map(|t| t.id).collect();
    let retried_codes: HashSet<Uuid> = retried.tickets.iter().map(|t| t.id).collect();
    assert_eq!(first_codes, retried_codes);

    assert_eq!(common::available(&pool, ticket_type).await, 7);
}

#[tokio::test]
async fn concurrent_fulfillments_cannot_oversell() {
    let Some(pool) = common::try_pool().await else { return };
    let buyer = common::seed_buyer(&pool).await;
    let event = common::seed_event(&pool).await;
    let ticket_type = common::seed_ticket_type(&pool, event, 2).await;

    let left = fulfill(
        &pool,
        request(
            common::unique_ref("left"),
            buyer,
            event,
            "50.00",
            vec![LineItem { ticket_type_id: ticket_type, quantity: 2 }],
        ),
    );
    let right = fulfill(
        &pool,
        request(
            common::unique_ref("right"),
            buyer,
            event,
            "50.00",
            vec![LineItem { ticket_type_id: ticket_type, quantity: 2 }],
        ),
    );

    let (left, right) = tokio::join!(left, right);
    let outcomes = [left, right];

    let wins = outcomes.iter().filter(|r| r.is_ok()).count();
    let exhausted = outcomes
        .iter()
        .filter(|r| matches!(r, Err(AppError::InventoryExhausted(_))))
        .count();

    assert_eq!(wins, 1, "exactly one concurrent fulfillment may win");
    assert_eq!(exhausted, 1, "the loser must see exhausted inventory");
    assert_eq!(common::available(&pool, ticket_type).await, 0);
}

#[tokio::test]
async fn unknown_ticket_type_is_a_validation_error() {
    let Some(pool) = common::try_pool().await else { return };
    let buyer = common::seed_buyer(&pool).await;
    let event = common::seed_event(&pool).await;

    let payment_ref = common::unique_ref("pay");
    let err = fulfill(
        &pool,
        request(
            payment_ref.clone(),
            buyer,
            event,
            "10.00",
            vec![LineItem { ticket_type_id: i32::MAX, quantity: 1 }],
        ),
    )
    .await
    .expect_err("unknown ticket type must be rejected");
    assert!(matches!(err, AppError::ValidationError(_)));

    let order: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM orders WHERE payment_ref = $1")
        .bind(&payment_ref)
        .fetch_optional(&pool)
        .await
        .unwrap();
    assert!(order.is_none());
}

#[tokio::test]
async fn unknown_buyer_is_a_validation_error() {
    let Some(pool) = common::try_pool().await else { return };
    let event = common::seed_event(&pool).await;
    let ticket_type = common::seed_ticket_type(&pool, event, 5).await;

    let err = fulfill(
        &pool,
        request(
            common::unique_ref("pay"),
            Uuid::new_v4(),
            event,
            "10.00",
            vec![LineItem { ticket_type_id: ticket_type, quantity: 1 }],
        ),
    )
    .await
    .expect_err("unknown buyer must be rejected");
    assert!(matches!(err, AppError::ValidationError(_)));
    assert_eq!(common::available(&pool, ticket_type).await, 5);
}
