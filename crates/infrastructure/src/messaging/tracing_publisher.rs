use async_trait::async_trait;
use domain::DomainEvent;
use domain::event::{EventPublisher, PublishError};
use tracing::info;

/// Writes every event to the log
pub struct TracingEventPublisher;

#[async_trait]
impl EventPublisher for TracingEventPublisher {
    async fn publish(&self, event: DomainEvent) -> Result<(), PublishError> {
        let payload = serde_json::to_string(&event)?;
        info!(event_type = %event.event_type(), payload = %payload, "Printer event");
        Ok(())
    }
}
