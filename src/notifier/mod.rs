//! Fire-and-forget confirmation dispatch.
//!
//! Fulfillment hands finished orders to a detached worker task over a
//! bounded channel. The worker resolves the buyer email and event display
//! data, then feeds a [`ConfirmationSink`] (email/templating lives behind
//! that trait, outside this service). Nothing on this path can unwind a
//! committed fulfillment: a full queue drops the job with a warning, and
//! delivery errors are logged, never retried synchronously.

use std::future::Future;

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::models::{Event, Order, Ticket, User};

/// Jobs queued ahead of a slow sink before dispatch starts shedding.
const DISPATCH_QUEUE_DEPTH: usize = 256;

/// Everything a renderer needs to produce a confirmation message.
#[derive(Debug, Clone)]
pub struct TicketConfirmation {
    pub order: Order,
    pub tickets: Vec<Ticket>,
    pub buyer_email: String,
    pub event_title: String,
    pub event_location: String,
    pub event_starts_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
#[error("confirmation delivery failed: {0}")]
pub struct DeliveryError(pub String);

/// Downstream consumer of a finished order (an email sender in
/// production).
pub trait ConfirmationSink: Send + Sync + 'static {
    fn deliver(
        &self,
        confirmation: &TicketConfirmation,
    ) -> impl Future<Output = Result<(), DeliveryError>> + Send;
}

/// Default sink: records the confirmation in the service log. Stands in
/// for the external email collaborator.
#[derive(Debug, Clone, Default)]
pub struct LoggingSink;

impl ConfirmationSink for LoggingSink {
    async fn deliver(&self, confirmation: &TicketConfirmation) -> Result<(), DeliveryError> {
        tracing::info!(
            order_id = %confirmation.order.id,
            buyer_email = %confirmation.buyer_email,
            event = %confirmation.event_title,
            tickets = confirmation.tickets.len(),
            "Ticket confirmation ready for delivery"
        );
        Ok(())
    }
}

struct Job {
    order: Order,
    tickets: Vec<Ticket>,
}

/// Handle for dispatching confirmations. Cheap to clone; shared through
/// the router state.
#[derive(Clone)]
pub struct Notifier {
    tx: mpsc::Sender<Job>,
}

impl Notifier {
    /// Spawns the worker task and returns the dispatch handle. The worker
    /// owns its own pool handle and runs detached from any request.
    pub fn spawn<S: ConfirmationSink>(pool: PgPool, sink: S) -> Self {
        let (tx, mut rx) = mpsc::channel::<Job>(DISPATCH_QUEUE_DEPTH);

        tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                let order_id = job.order.id;
                if let Err(e) = deliver(&pool, &sink, job).await {
                    tracing::error!(order_id = %order_id, error = %e, "Confirmation dispatch failed");
                }
            }
        });

        Self { tx }
    }

    /// Queues a confirmation for the given fulfilled order. Non-blocking;
    /// called only after the fulfillment transaction committed.
    pub fn dispatch(&self, order: &Order, tickets: &[Ticket]) {
        let job = Job {
            order: order.clone(),
            tickets: tickets.to_vec(),
        };
        if let Err(e) = self.tx.try_send(job) {
            tracing::warn!(error = %e, "Confirmation dropped: dispatch queue unavailable");
        }
    }

    #[cfg(test)]
    fn from_sender(tx: mpsc::Sender<Job>) -> Self {
        Self { tx }
    }
}

async fn deliver<S: ConfirmationSink>(
    pool: &PgPool,
    sink: &S,
    job: Job,
) -> Result<(), DeliveryError> {
    let confirmation = resolve(pool, job)
        .await
        .map_err(|e| DeliveryError(e.to_string()))?;
    sink.deliver(&confirmation).await
}

/// Joins the order with buyer and event display data. Runs outside the
/// fulfillment transaction, on the worker.
async fn resolve(pool: &PgPool, job: Job) -> Result<TicketConfirmation, sqlx::Error> {
    let buyer: User = sqlx::query_as(
        "SELECT id, username, email, created_at, updated_at FROM users WHERE id = $1",
    )
    .bind(job.order.user_id)
    .fetch_one(pool)
    .await?;

    let event: Event = sqlx::query_as(
        "SELECT id, title, location_name, location_address, start_time, created_at, updated_at
         FROM events WHERE id = $1",
    )
    .bind(job.order.event_id)
    .fetch_one(pool)
    .await?;

    Ok(TicketConfirmation {
        order: job.order,
        tickets: job.tickets,
        buyer_email: buyer.email,
        event_title: event.title.clone(),
        event_location: event.display_location(),
        event_starts_at: event.start_time,
    })
}
