//! Tower layers wrapping the native bridge.
//!
//! - [`deadline`]: Bounds each delegation by the caller's deadline
//! - [`admission`]: Bounded worker pool with a maximum wait queue
//! - [`metrics`]: Delegation timing and outcome via `tracing` spans and `metrics`
//! - [`pipeline`]: Composes all layers around a concrete bridge

pub mod admission;
pub mod deadline;
pub mod metrics;
pub mod pipeline;

pub use admission::AdmissionLayer;
pub use deadline::DeadlineLayer;
pub use metrics::MetricsLayer;
pub use pipeline::build_bridge_pipeline;
