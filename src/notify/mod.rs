//! Operator notifications
//!
//! Producers call [`NotifyRelay::publish`], which never blocks and never
//! fails. A tokio task polls the queue and hands each event to the configured
//! [`Notifier`]. Delivery is best effort: a full queue or a failed send is
//! logged and dropped.

pub mod telegram;

use async_trait::async_trait;
use crossbeam_queue::ArrayQueue;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::interval;

use crate::core_types::{Amount, BookingId, DriverId};

pub use telegram::TelegramNotifier;

const DRAIN_BATCH: usize = 100;
const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, PartialEq)]
pub enum NotifyEvent {
    BookingCreated {
        booking_id: BookingId,
        reference: String,
        route: String,
        service_type: String,
    },
    DriverSignedUp {
        driver_id: DriverId,
        masked_phone: String,
    },
    BookingAccepted {
        booking_id: BookingId,
        driver_id: DriverId,
        fee: Amount,
    },
    /// Compensation failure or balance drift; needs a human
    ReconciliationAlert { message: String },
}

impl NotifyEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            NotifyEvent::BookingCreated { .. } => "booking_created",
            NotifyEvent::DriverSignedUp { .. } => "driver_signed_up",
            NotifyEvent::BookingAccepted { .. } => "booking_accepted",
            NotifyEvent::ReconciliationAlert { .. } => "reconciliation_alert",
        }
    }

    /// Plain-text message body
    pub fn render(&self) -> String {
        match self {
            NotifyEvent::BookingCreated {
                booking_id,
                reference,
                route,
                service_type,
            } => format!(
                "New booking #{} [{}]\n{}\nservice: {}",
                booking_id, reference, route, service_type
            ),
            NotifyEvent::DriverSignedUp {
                driver_id,
                masked_phone,
            } => format!("New driver #{} ({}) awaiting review", driver_id, masked_phone),
            NotifyEvent::BookingAccepted {
                booking_id,
                driver_id,
                fee,
            } => format!(
                "Booking #{} accepted by driver #{} (fee {})",
                booking_id, driver_id, fee
            ),
            NotifyEvent::ReconciliationAlert { message } => format!("ALERT: {}", message),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Rejected by upstream: {0}")]
    Rejected(String),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, event: &NotifyEvent) -> Result<(), NotifyError>;
}

/// Writes events to the log only
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, event: &NotifyEvent) -> Result<(), NotifyError> {
        tracing::info!(kind = event.kind(), message = %event.render(), "Notification");
        Ok(())
    }
}

#[derive(Clone)]
pub struct NotifyRelay {
    queue: Arc<ArrayQueue<NotifyEvent>>,
}

impl NotifyRelay {
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: Arc::new(ArrayQueue::new(capacity.max(1))),
        }
    }

    /// Enqueue without waiting
    pub fn publish(&self, event: NotifyEvent) {
        if let Err(dropped) = self.queue.push(event) {
            tracing::warn!(kind = dropped.kind(), "Notification queue full, event dropped");
        }
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Take everything currently queued
    pub fn drain(&self) -> Vec<NotifyEvent> {
        let mut events = Vec::with_capacity(self.queue.len());
        while let Some(event) = self.queue.pop() {
            events.push(event);
        }
        events
    }

    /// Spawn the delivery task
    pub fn spawn(&self, notifier: Arc<dyn Notifier>) -> JoinHandle<()> {
        let queue = self.queue.clone();
        tokio::spawn(async move {
            let mut tick = interval(POLL_INTERVAL);
            tracing::info!("Notification relay started");

            loop {
                tick.tick().await;

                let mut count = 0;
                while let Some(event) = queue.pop() {
                    if let Err(e) = notifier.send(&event).await {
                        tracing::warn!(kind = event.kind(), error = %e, "Notification delivery failed");
                    }
                    count += 1;
                    if count >= DRAIN_BATCH {
                        break;
                    }
                }
            }
        })
    }
}
