//! Admission control for native delegations.
//!
//! At most `max_concurrent` delegations run at once. Up to `max_queued`
//! further callers wait for a slot; beyond that, delegations are rejected
//! with `NativeError::Overloaded` instead of launching more processes.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use eventrelay_core::Envelope;
use tokio::sync::Semaphore;
use tower::Layer;
use tracing::warn;

use crate::observability;
use crate::service::bridge::{CallContext, Delegation, NativeBridge};
use crate::service::error::NativeError;

// ---------------------------------------------------------------------------
// AdmissionLayer
// ---------------------------------------------------------------------------

/// Tower layer that bounds concurrent delegations via a semaphore and caps
/// the number of waiters.
#[derive(Debug, Clone)]
pub struct AdmissionLayer {
    semaphore: Arc<Semaphore>,
    waiting: Arc<AtomicU32>,
    max_queued: u32,
}

impl AdmissionLayer {
    /// Create a new `AdmissionLayer` with the given concurrency and queue limits.
    #[must_use]
    pub fn new(max_concurrent: u32, max_queued: u32) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent as usize)),
            waiting: Arc::new(AtomicU32::new(0)),
            max_queued,
        }
    }
}

impl<B> Layer<B> for AdmissionLayer {
    type Service = AdmissionBridge<B>;

    fn layer(&self, inner: B) -> Self::Service {
        AdmissionBridge {
            inner,
            semaphore: self.semaphore.clone(),
            waiting: self.waiting.clone(),
            max_queued: self.max_queued,
        }
    }
}

// ---------------------------------------------------------------------------
// AdmissionBridge
// ---------------------------------------------------------------------------

/// Bridge wrapper that holds a permit for the duration of each delegation.
#[derive(Debug, Clone)]
pub struct AdmissionBridge<B> {
    inner: B,
    semaphore: Arc<Semaphore>,
    waiting: Arc<AtomicU32>,
    max_queued: u32,
}

/// Occupies one queue position; released on drop, including when the
/// waiting caller is cancelled by its deadline.
struct QueueSlot(Arc<AtomicU32>);

impl Drop for QueueSlot {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

impl<B> AdmissionBridge<B> {
    fn reserve_queue_slot(&self) -> Option<QueueSlot> {
        let max = self.max_queued;
        self.waiting
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| (n < max).then_some(n + 1))
            .ok()
            .map(|_| QueueSlot(self.waiting.clone()))
    }
}

#[async_trait]
impl<B: NativeBridge> NativeBridge for AdmissionBridge<B> {
    async fn delegate(&self, event: &Envelope, ctx: CallContext) -> Result<Delegation, NativeError> {
        let permit = if let Ok(permit) = self.semaphore.clone().try_acquire_owned() {
            permit
        } else {
            let Some(slot) = self.reserve_queue_slot() else {
                warn!(call_id = ctx.call_id, "native admission queue full, rejecting");
                observability::record_native_rejected();
                return Err(NativeError::Overloaded);
            };
            let permit = self
                .semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|_closed| NativeError::Overloaded)?;
            drop(slot);
            permit
        };

        // Hold the permit for the duration of the delegation.
        let result = self.inner.delegate(event, ctx).await;
        drop(permit);
        result
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
