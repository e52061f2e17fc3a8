use async_trait::async_trait;
use domain::DomainEvent;
use domain::event::{EventPublisher, PublishError};
use tokio::sync::broadcast;

/// Publishes events to in-process subscribers (e.g. the SSE stream).
///
/// Events published while nobody is subscribed are dropped.
#[derive(Clone)]
pub struct BroadcastEventPublisher {
    tx: broadcast::Sender<DomainEvent>,
}

impl BroadcastEventPublisher {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.tx.subscribe()
    }
}

#[async_trait]
impl EventPublisher for BroadcastEventPublisher {
    async fn publish(&self, event: DomainEvent) -> Result<(), PublishError> {
        if self.tx.send(event).is_err() {
            tracing::trace!("No event subscribers, event dropped");
        }
        Ok(())
    }
}
