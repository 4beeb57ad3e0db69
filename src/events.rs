//! # Domain Events
//!
//! Booking lifecycle notifications published after their database
//! transaction has committed. The bus is a bounded queue and publishing
//! never blocks a request: when the queue is full the event is dropped and
//! counted, and when no dispatcher is running it is silently discarded.
//!
//! Failed delivery to a sink is logged and counted but never retried, and a
//! sink failure never affects the ledger write that produced the event.

use async_trait::async_trait;
use metrics::counter;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::status::BookingStatus;

/// Events emitted by the booking lifecycle
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    BookingCreated {
        organization_id: Uuid,
        booking_id: Uuid,
        booking_number: String,
    },
    BookingStatusChanged {
        organization_id: Uuid,
        booking_id: Uuid,
        previous_status: BookingStatus,
        new_status: BookingStatus,
    },
}

impl DomainEvent {
    /// Stable event name used in logs and metrics
    pub fn name(&self) -> &'static str {
        match self {
            DomainEvent::BookingCreated { .. } => "booking.created",
            DomainEvent::BookingStatusChanged { .. } => "booking.status_changed",
        }
    }

    pub fn organization_id(&self) -> Uuid {
        match self {
            DomainEvent::BookingCreated {
                organization_id, ..
            }
            | DomainEvent::BookingStatusChanged {
                organization_id, ..
            } => *organization_id,
        }
    }

    pub fn booking_id(&self) -> Uuid {
        match self {
            DomainEvent::BookingCreated { booking_id, .. }
            | DomainEvent::BookingStatusChanged { booking_id, .. } => *booking_id,
        }
    }
}

/// Destination for dispatched domain events
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Short identifier used in logs and failure metrics
    fn name(&self) -> &'static str;

    async fn deliver(&self, event: &DomainEvent) -> anyhow::Result<()>;
}

/// Sink that writes events to the structured log.
///
/// Payload logging is off by default because booking numbers and statuses
/// can end up in shared log storage.
pub struct LoggingSink {
    log_payloads: bool,
}

impl LoggingSink {
    pub fn new(log_payloads: bool) -> Self {
        Self { log_payloads }
    }
}

#[async_trait]
impl EventSink for LoggingSink {
    fn name(&self) -> &'static str {
        "logging"
    }

    async fn deliver(&self, event: &DomainEvent) -> anyhow::Result<()> {
        if self.log_payloads {
            let payload = serde_json::to_string(event)?;
            info!(
                event = event.name(),
                organization_id = %event.organization_id(),
                payload = %payload,
                "Domain event"
            );
        } else {
            info!(
                event = event.name(),
                organization_id = %event.organization_id(),
                booking_id = %event.booking_id(),
                "Domain event"
            );
        }
        Ok(())
    }
}

/// Publishing handle shared across request handlers
#[derive(Clone)]
pub struct EventBus {
    tx: mpsc::Sender<DomainEvent>,
}

impl EventBus {
    /// Create a bus with the given queue capacity, returning the receiving
    /// half for [`spawn_dispatcher`].
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<DomainEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    /// Queue an event for dispatch. Must only be called after the database
    /// transaction that produced the event has committed.
    pub fn publish(&self, event: DomainEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {
                counter!("domain_events_published_total").increment(1);
            }
            Err(mpsc::error::TrySendError::Full(event)) => {
                warn!(event = event.name(), "Event queue full, dropping event");
                counter!("domain_events_dropped_total").increment(1);
            }
            Err(mpsc::error::TrySendError::Closed(event)) => {
                debug!(event = event.name(), "Event dispatcher not running");
            }
        }
    }
}

/// Run the dispatch loop until the shutdown token fires or every publisher
/// is gone.
pub fn spawn_dispatcher(
    mut rx: mpsc::Receiver<DomainEvent>,
    sinks: Vec<Box<dyn EventSink>>,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(sinks = sinks.len(), "Starting event dispatcher");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Event dispatcher shutdown requested");
                    break;
                }
                event = rx.recv() => {
                    let Some(event) = event else {
                        debug!("All event publishers dropped");
                        break;
                    };
                    dispatch(&event, &sinks).await;
                }
            }
        }

        info!("Event dispatcher stopped");
    })
}

async fn dispatch(event: &DomainEvent, sinks: &[Box<dyn EventSink>]) {
    for sink in sinks {
        if let Err(err) = sink.deliver(event).await {
            warn!(
                sink = sink.name(),
                event = event.name(),
                error = ?err,
                "Event sink delivery failed"
            );
            let metric_labels = vec![("sink", sink.name().to_string())];
            counter!("event_sink_failures_total", &metric_labels).increment(1);
        }
    }
}
