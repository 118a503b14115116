use std::path::PathBuf;
use std::time::Duration;

use eventrelay_core::RoutingConfig;

/// Default location of the external native component.
pub const DEFAULT_DRIVER_PATH: &str = "./cpp_driver/driver";

/// Dispatch-level configuration, fixed at startup.
///
/// Controls tier routing, the native component invocation, its admission
/// limits, and batch concurrency.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Route `ticker:`/`match:` channels to the native component.
    pub delegation_enabled: bool,
    /// Executable invoked for delegated events.
    pub driver_path: PathBuf,
    /// Default deadline for one native invocation (including admission wait).
    pub native_timeout_ms: u64,
    /// Maximum native invocations running at once.
    pub max_concurrent_native: u32,
    /// Maximum callers waiting for a native slot before rejection.
    pub max_queued_native: u32,
    /// Nominal latency of the standard tier placeholder.
    pub standard_latency_ms: u64,
    /// Events of one batch dispatched concurrently. 1 means sequential.
    pub batch_concurrency: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            delegation_enabled: true,
            driver_path: PathBuf::from(DEFAULT_DRIVER_PATH),
            native_timeout_ms: 5_000,
            max_concurrent_native: 64,
            max_queued_native: 1_024,
            standard_latency_ms: 1,
            batch_concurrency: 1,
        }
    }
}

impl DispatchConfig {
    #[must_use]
    pub fn routing(&self) -> RoutingConfig {
        RoutingConfig {
            delegation_enabled: self.delegation_enabled,
        }
    }

    #[must_use]
    pub fn native_timeout(&self) -> Duration {
        Duration::from_millis(self.native_timeout_ms)
    }

    #[must_use]
    pub fn standard_latency(&self) -> Duration {
        Duration::from_millis(self.standard_latency_ms)
    }
}
