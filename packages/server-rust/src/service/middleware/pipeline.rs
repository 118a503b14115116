//! Pipeline composition: combines all bridge layers into a single stack.

use tower::ServiceBuilder;

use super::admission::AdmissionLayer;
use super::deadline::DeadlineLayer;
use super::metrics::MetricsLayer;
use crate::service::bridge::NativeBridge;
use crate::service::config::DispatchConfig;

/// Wrap a concrete bridge with the delegation middleware layers.
///
/// Layer order (outermost to innermost):
/// 1. `DeadlineLayer` -- the caller's deadline covers the admission wait too
/// 2. `AdmissionLayer` -- bounded worker pool, reject when the queue is full
/// 3. `MetricsLayer` -- record timing and outcome of admitted delegations
#[must_use]
pub fn build_bridge_pipeline<B>(bridge: B, config: &DispatchConfig) -> impl NativeBridge + 'static
where
    B: NativeBridge + 'static,
{
    ServiceBuilder::new()
        .layer(DeadlineLayer)
        .layer(AdmissionLayer::new(
            config.max_concurrent_native,
            config.max_queued_native,
        ))
        .layer(MetricsLayer)
        .service(bridge)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
