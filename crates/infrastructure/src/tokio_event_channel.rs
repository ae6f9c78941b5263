use std::sync::Arc;

use async_trait::async_trait;
use multibank_application::DomainEventPublisher;
use multibank_core::AppResult;
use multibank_domain::DomainEvent;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Downstream handler of published domain events.
#[async_trait]
pub trait EventConsumer: Send + Sync {
    /// Handles one event. Failures are logged by the drain loop.
    async fn consume(&self, event: &DomainEvent) -> AppResult<()>;
}

/// Creates a bounded event channel. A capacity of zero is raised to one.
#[must_use]
pub fn event_channel(capacity: usize) -> (ChannelEventPublisher, EventReceiver) {
    let (sender, receiver) = mpsc::channel(capacity.max(1));
    (ChannelEventPublisher { sender }, EventReceiver { receiver })
}

/// Publisher half of the event channel.
///
/// Never blocks: a full or closed channel drops the event with a warning.
#[derive(Clone)]
pub struct ChannelEventPublisher {
    sender: mpsc::Sender<DomainEvent>,
}

impl DomainEventPublisher for ChannelEventPublisher {
    fn publish(&self, event: DomainEvent) {
        match self.sender.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                warn!(
                    event_type = event.event_type(),
                    provider = %event.provider(),
                    client_id = %event.client_id(),
                    "event channel full, dropping domain event"
                );
            }
            Err(TrySendError::Closed(event)) => {
                warn!(
                    event_type = event.event_type(),
                    provider = %event.provider(),
                    client_id = %event.client_id(),
                    "event channel closed, dropping domain event"
                );
            }
        }
    }
}

/// Receiver half of the event channel.
pub struct EventReceiver {
    receiver: mpsc::Receiver<DomainEvent>,
}

impl EventReceiver {
    /// Hands every event to the consumer until all publishers are dropped.
    /// Returns the number of events consumed successfully.
    pub async fn drain(mut self, consumer: Arc<dyn EventConsumer>) -> u64 {
        let mut consumed = 0_u64;

        while let Some(event) = self.receiver.recv().await {
            match consumer.consume(&event).await {
                Ok(()) => consumed = consumed.saturating_add(1),
                Err(error) => {
                    warn!(
                        event_type = event.event_type(),
                        provider = %event.provider(),
                        error = %error,
                        "event consumer failed"
                    );
                }
            }
        }

        consumed
    }

    /// Runs [`EventReceiver::drain`] on a background task.
    #[must_use]
    pub fn spawn_drain(self, consumer: Arc<dyn EventConsumer>) -> JoinHandle<u64> {
        tokio::spawn(self.drain(consumer))
    }
}

/// Consumer that logs every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventConsumer;

#[async_trait]
impl EventConsumer for TracingEventConsumer {
    async fn consume(&self, event: &DomainEvent) -> AppResult<()> {
        info!(
            event_type = event.event_type(),
            provider = %event.provider(),
            client_id = %event.client_id(),
            "domain event"
        );
        Ok(())
    }
}
