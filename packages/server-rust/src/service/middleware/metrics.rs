//! Metrics middleware for native delegations.
//!
//! Records delegation duration and outcome in a `tracing` span and through
//! the `metrics` facade.

use std::time::Instant;

use async_trait::async_trait;
use eventrelay_core::Envelope;
use tower::Layer;
use tracing::{info_span, Instrument};

use crate::observability;
use crate::service::bridge::{CallContext, Delegation, NativeBridge};
use crate::service::error::NativeError;

// ---------------------------------------------------------------------------
// MetricsLayer
// ---------------------------------------------------------------------------

/// Tower layer that instruments delegations with timing and outcome.
#[derive(Debug, Clone)]
pub struct MetricsLayer;

impl<B> Layer<B> for MetricsLayer {
    type Service = MetricsBridge<B>;

    fn layer(&self, inner: B) -> Self::Service {
        MetricsBridge { inner }
    }
}

// ---------------------------------------------------------------------------
// MetricsBridge
// ---------------------------------------------------------------------------

/// Bridge wrapper that records delegation duration and outcome.
#[derive(Debug, Clone)]
pub struct MetricsBridge<B> {
    inner: B,
}

/// Outcome label for a delegation result.
fn outcome_label(result: &Result<Delegation, NativeError>) -> &'static str {
    match result {
        Ok(Delegation::Completed) => "completed",
        Ok(Delegation::Unavailable { .. }) => "unavailable",
        Err(e) => e.kind(),
    }
}

#[async_trait]
impl<B: NativeBridge> NativeBridge for MetricsBridge<B> {
    async fn delegate(&self, event: &Envelope, ctx: CallContext) -> Result<Delegation, NativeError> {
        let span = info_span!(
            "native_delegate",
            call_id = ctx.call_id,
            event_id = event.id(),
            channel = event.channel(),
            duration_ms = tracing::field::Empty,
            outcome = tracing::field::Empty,
        );

        async move {
            let start = Instant::now();
            let result = self.inner.delegate(event, ctx).await;
            let elapsed = start.elapsed();

            let outcome = outcome_label(&result);
            #[allow(clippy::cast_possible_truncation)]
            let duration_ms = elapsed.as_millis() as u64;
            tracing::Span::current().record("duration_ms", duration_ms);
            tracing::Span::current().record("outcome", outcome);

            tracing::debug!(
                call_id = ctx.call_id,
                duration_ms,
                outcome,
                "native delegation complete"
            );
            observability::record_native(outcome, elapsed);

            result
        }
        .instrument(span)
        .await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
