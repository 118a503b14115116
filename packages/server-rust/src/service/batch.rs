//! Batch dispatch over the shared [`Dispatcher`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use eventrelay_core::{BatchResult, Envelope};
use futures_util::stream::{self, StreamExt};
use tracing::debug;

use super::dispatcher::Dispatcher;
use super::error::BatchError;

/// Dispatches an ordered sequence of events and accounts for every outcome.
///
/// Up to `concurrency` events are in flight at once; outcomes are collected
/// in input order either way, so `errors` follows the order of the batch.
/// A failing event never stops the rest of the batch.
#[derive(Debug, Clone)]
pub struct BatchCoordinator {
    dispatcher: Arc<Dispatcher>,
    concurrency: usize,
}

impl BatchCoordinator {
    /// `concurrency` of 0 is treated as 1 (sequential).
    #[must_use]
    pub fn new(dispatcher: Arc<Dispatcher>, concurrency: usize) -> Self {
        Self {
            dispatcher,
            concurrency: concurrency.max(1),
        }
    }

    #[must_use]
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Dispatches every event with the dispatcher's default native deadline.
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::Empty`] for a zero-length batch, before any
    /// dispatch work.
    pub async fn dispatch_batch(&self, events: &[Envelope]) -> Result<BatchResult, BatchError> {
        self.dispatch_batch_within(events, self.dispatcher.native_timeout())
            .await
    }

    /// Dispatches every event, bounding each native delegation by `deadline`.
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::Empty`] for a zero-length batch.
    pub async fn dispatch_batch_within(
        &self,
        events: &[Envelope],
        deadline: Duration,
    ) -> Result<BatchResult, BatchError> {
        if events.is_empty() {
            return Err(BatchError::Empty);
        }

        let start = Instant::now();
        // Futures are built up front so the stream holds no closure borrowing
        // its argument; that keeps this future `Send` for spawned callers.
        let pending: Vec<_> = events
            .iter()
            .map(|event| self.dispatcher.dispatch_within(event, deadline))
            .collect();
        let outcomes: Vec<_> = stream::iter(pending)
            .buffered(self.concurrency)
            .collect()
            .await;
        let result = BatchResult::accumulate(outcomes, start.elapsed());

        debug!(
            total = result.total,
            processed = result.processed_count,
            failed = result.failed_count,
            duration_ms = result.duration_ms,
            "batch dispatched"
        );
        Ok(result)
    }
}
