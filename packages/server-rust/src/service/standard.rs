//! Standard tier: in-process event handling.

use std::time::Duration;

use async_trait::async_trait;
use eventrelay_core::Envelope;
use tracing::debug;

use super::error::StandardError;

/// Pluggable in-process handler for events that are not delegated.
///
/// Analytics, storage, or webhook fan-out belong behind this trait; the
/// dispatcher reports an `Err` as a failed outcome.
#[async_trait]
pub trait StandardHandler: Send + Sync {
    /// Processes one event.
    ///
    /// # Errors
    ///
    /// Returns [`StandardError`] if processing fails.
    async fn handle(&self, event: &Envelope) -> Result<(), StandardError>;
}

/// Placeholder handler with a fixed nominal latency. Never fails.
#[derive(Debug, Clone)]
pub struct PlaceholderHandler {
    latency: Duration,
}

impl PlaceholderHandler {
    #[must_use]
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }
}

#[async_trait]
impl StandardHandler for PlaceholderHandler {
    async fn handle(&self, event: &Envelope) -> Result<(), StandardError> {
        debug!(event_id = event.id(), app_id = event.app_id(), "processing event");
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        Ok(())
    }
}
