//! HTTP handlers and the state they share.
//!
//! Handlers are thin adapters: decode into [`eventrelay_core::Envelope`],
//! call the shared [`Dispatcher`]/[`BatchCoordinator`], and shape the reply
//! from the returned outcome.

pub mod health;
pub mod process;

pub use health::{health_handler, liveness_handler, readiness_handler, status_handler};
pub use process::{process_batch_handler, process_handler};

use std::sync::Arc;
use std::time::Instant;

use super::{NetworkConfig, ShutdownController};
use crate::service::{BatchCoordinator, Dispatcher};

/// Shared application state passed to all axum handlers via `State`.
///
/// Everything is behind `Arc` (or cheap to clone), so per-request clones
/// are cheap.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub batch: BatchCoordinator,
    pub shutdown: Arc<ShutdownController>,
    pub config: Arc<NetworkConfig>,
    /// Process start time, for uptime reporting.
    pub start_time: Instant,
}
