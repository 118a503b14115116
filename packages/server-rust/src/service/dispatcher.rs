//! Per-event dispatch: classify, run the selected tier, time it.
//!
//! The [`Dispatcher`] is the single place where processing time is
//! measured. Both transports hold it behind an `Arc` and report its
//! `duration_ms` verbatim.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use eventrelay_core::{Envelope, Outcome, RoutingConfig, Tier};
use tracing::{debug, warn};

use super::bridge::{CallContext, Delegation, NativeBridge, ProcessBridge};
use super::config::DispatchConfig;
use super::middleware::build_bridge_pipeline;
use super::standard::{PlaceholderHandler, StandardHandler};
use crate::observability;

/// Routes each event to its tier and captures every failure in the
/// returned [`Outcome`].
pub struct Dispatcher {
    routing: RoutingConfig,
    bridge: Arc<dyn NativeBridge>,
    standard: Arc<dyn StandardHandler>,
    native_timeout: Duration,
    next_call_id: AtomicU64,
}

impl Dispatcher {
    /// Creates a dispatcher over explicit collaborators.
    ///
    /// `bridge` is used as given; wrap it with
    /// [`build_bridge_pipeline`] to get admission control and deadlines.
    #[must_use]
    pub fn new(
        routing: RoutingConfig,
        bridge: Arc<dyn NativeBridge>,
        standard: Arc<dyn StandardHandler>,
        native_timeout: Duration,
    ) -> Self {
        Self {
            routing,
            bridge,
            standard,
            native_timeout,
            next_call_id: AtomicU64::new(1),
        }
    }

    /// Creates the production dispatcher: a process bridge behind the full
    /// middleware pipeline and the placeholder standard handler.
    #[must_use]
    pub fn from_config(config: &DispatchConfig) -> Self {
        let bridge = build_bridge_pipeline(ProcessBridge::new(config.driver_path.clone()), config);
        Self::new(
            config.routing(),
            Arc::new(bridge),
            Arc::new(PlaceholderHandler::new(config.standard_latency())),
            config.native_timeout(),
        )
    }

    #[must_use]
    pub fn routing(&self) -> RoutingConfig {
        self.routing
    }

    #[must_use]
    pub fn native_timeout(&self) -> Duration {
        self.native_timeout
    }

    /// Dispatches one event with the configured native deadline.
    pub async fn dispatch(&self, event: &Envelope) -> Outcome {
        self.dispatch_within(event, self.native_timeout).await
    }

    /// Dispatches one event, bounding a native delegation by `deadline`.
    ///
    /// Never fails: native and standard errors become a failed outcome.
    pub async fn dispatch_within(&self, event: &Envelope, deadline: Duration) -> Outcome {
        let start = Instant::now();
        let call_id = self.next_call_id.fetch_add(1, Ordering::Relaxed);
        let tier = self.routing.classify(event.channel());

        debug!(
            call_id,
            event_id = event.id(),
            channel = event.channel(),
            tier = tier.as_str(),
            "dispatching event"
        );

        let outcome = match tier {
            Tier::Delegated => self.run_delegated(event, call_id, deadline, start).await,
            Tier::Standard => self.run_standard(event, start).await,
        };

        observability::record_dispatch(outcome.tier, outcome.processed, start.elapsed());
        if let Some(error) = &outcome.error {
            warn!(
                call_id,
                event_id = event.id(),
                tier = outcome.tier.as_str(),
                error = %error,
                "event processing failed"
            );
        }
        outcome
    }

    async fn run_delegated(
        &self,
        event: &Envelope,
        call_id: u64,
        deadline: Duration,
        start: Instant,
    ) -> Outcome {
        let ctx = CallContext {
            call_id,
            timeout: deadline,
        };
        match self.bridge.delegate(event, ctx).await {
            Ok(Delegation::Completed) => Outcome::success(Tier::Delegated, start.elapsed()),
            Ok(Delegation::Unavailable { path }) => {
                warn!(
                    call_id,
                    event_id = event.id(),
                    path = %path.display(),
                    "native component unavailable, falling back to standard tier"
                );
                observability::record_fallback();
                self.run_standard(event, start).await
            }
            Err(e) => Outcome::failure(Tier::Delegated, start.elapsed(), e.to_string()),
        }
    }

    async fn run_standard(&self, event: &Envelope, start: Instant) -> Outcome {
        match self.standard.handle(event).await {
            Ok(()) => Outcome::success(Tier::Standard, start.elapsed()),
            Err(e) => Outcome::failure(Tier::Standard, start.elapsed(), e.to_string()),
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("routing", &self.routing)
            .field("native_timeout", &self.native_timeout)
            .finish_non_exhaustive()
    }
}
