use crate::DomainEvent;
use async_trait::async_trait;

pub type PublishError = Box<dyn std::error::Error + Send + Sync>;

/// Sink for printer lifecycle events.
///
/// Publishing is best-effort: callers log failures and carry on, a failed
/// publish never changes connection or job state.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: DomainEvent) -> Result<(), PublishError>;
}
