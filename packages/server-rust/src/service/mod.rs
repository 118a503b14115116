//! Event dispatch: tier routing, native delegation, and batching.
//!
//! 1. **Bridge** (`bridge`): `NativeBridge` capability and the process implementation
//! 2. **Middleware** (`middleware`): Tower layers around the bridge (deadline, admission, metrics)
//! 3. **Standard tier** (`standard`): Pluggable in-process handler
//! 4. **Dispatcher** (`dispatcher`): Classify, run one tier, time it
//! 5. **Batching** (`batch`): Ordered batch dispatch with accounting

pub mod batch;
pub mod bridge;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod middleware;
pub mod standard;

#[cfg(test)]
pub mod test_support;

pub use batch::BatchCoordinator;
pub use bridge::{CallContext, Delegation, NativeBridge, ProcessBridge};
pub use config::DispatchConfig;
pub use dispatcher::Dispatcher;
pub use error::{BatchError, NativeError, StandardError};
pub use standard::{PlaceholderHandler, StandardHandler};
