//! Deadline middleware for native delegations.
//!
//! Fails delegations that exceed their `ctx.timeout` with
//! `NativeError::Timeout`. The inner future is dropped on expiry, which
//! kills a running child process.

use async_trait::async_trait;
use eventrelay_core::Envelope;
use tower::Layer;
use tracing::warn;

use crate::service::bridge::{CallContext, Delegation, NativeBridge};
use crate::service::error::NativeError;

// ---------------------------------------------------------------------------
// DeadlineLayer
// ---------------------------------------------------------------------------

/// Tower layer that wraps bridges with per-call deadline enforcement.
///
/// The deadline is read from each call's `ctx.timeout`, so callers can
/// supply their own.
#[derive(Debug, Clone)]
pub struct DeadlineLayer;

impl<B> Layer<B> for DeadlineLayer {
    type Service = DeadlineBridge<B>;

    fn layer(&self, inner: B) -> Self::Service {
        DeadlineBridge { inner }
    }
}

// ---------------------------------------------------------------------------
// DeadlineBridge
// ---------------------------------------------------------------------------

/// Bridge wrapper that enforces per-call deadlines.
#[derive(Debug, Clone)]
pub struct DeadlineBridge<B> {
    inner: B,
}

#[async_trait]
impl<B: NativeBridge> NativeBridge for DeadlineBridge<B> {
    async fn delegate(&self, event: &Envelope, ctx: CallContext) -> Result<Delegation, NativeError> {
        match tokio::time::timeout(ctx.timeout, self.inner.delegate(event, ctx)).await {
            Ok(result) => result,
            Err(_elapsed) => {
                #[allow(clippy::cast_possible_truncation)]
                let timeout_ms = ctx.timeout.as_millis() as u64;
                warn!(call_id = ctx.call_id, timeout_ms, "native delegation deadline expired");
                Err(NativeError::Timeout { timeout_ms })
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;
    use crate::service::bridge::ProcessBridge;
    use crate::service::test_support::{driver_script, FakeBridge, FakeResult, ScriptDir};

    fn ctx(timeout_ms: u64) -> CallContext {
        CallContext {
            call_id: 1,
            timeout: Duration::from_millis(timeout_ms),
        }
    }

    fn event() -> Envelope {
        Envelope::new("1", "app", "match:1")
    }

    #[tokio::test]
    async fn completes_within_deadline() {
        let bridge = DeadlineLayer.layer(FakeBridge::new(Duration::from_millis(10), FakeResult::Completed));
        let result = bridge.delegate(&event(), ctx(1_000)).await.unwrap();
        assert_eq!(result, Delegation::Completed);
    }

    #[tokio::test]
    async fn exceeds_deadline_returns_timeout() {
        let bridge = DeadlineLayer.layer(FakeBridge::new(Duration::from_millis(200), FakeResult::Completed));
        let err = bridge.delegate(&event(), ctx(50)).await.unwrap_err();
        assert!(matches!(err, NativeError::Timeout { timeout_ms: 50 }));
    }

    #[tokio::test]
    async fn expired_deadline_terminates_child_process() {
        let dir = ScriptDir::new();
        let marker = dir.path().join("finished");
        let body = format!("sleep 2\ntouch '{}'", marker.display());
        let bridge = DeadlineLayer.layer(ProcessBridge::new(driver_script(&dir, "slow", &body)));

        let start = Instant::now();
        let err = bridge.delegate(&event(), ctx(100)).await.unwrap_err();
        assert!(matches!(err, NativeError::Timeout { .. }));
        assert!(start.elapsed() < Duration::from_secs(2));

        tokio::time::sleep(Duration::from_millis(2_500)).await;
        assert!(!marker.exists(), "child outlived its deadline");
    }
}
