//! Command-line arguments and their conversion into runtime configuration.
//!
//! Every flag can also be set through an `EVENTRELAY_*` environment variable.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::network::NetworkConfig;
use crate::observability::{LogFormat, ObservabilityConfig};
use crate::rpc::RpcConfig;
use crate::service::config::DEFAULT_DRIVER_PATH;
use crate::service::DispatchConfig;

/// Tiered event dispatch server with HTTP and `MsgPack` RPC transports.
#[derive(Parser, Debug, Clone)]
#[command(name = "eventrelay", version, about)]
pub struct Cli {
    /// Bind address for both transports
    #[arg(long, default_value = "0.0.0.0", env = "EVENTRELAY_HOST")]
    pub host: String,

    /// HTTP port (0 = OS-assigned)
    #[arg(long, default_value_t = 8080, env = "EVENTRELAY_HTTP_PORT")]
    pub http_port: u16,

    /// RPC port (0 = OS-assigned)
    #[arg(long, default_value_t = 9090, env = "EVENTRELAY_RPC_PORT")]
    pub rpc_port: u16,

    /// Executable of the native processing component
    #[arg(long, default_value = DEFAULT_DRIVER_PATH, env = "EVENTRELAY_DRIVER_PATH")]
    pub driver_path: PathBuf,

    /// Route every event to the standard tier
    #[arg(long, env = "EVENTRELAY_DISABLE_DELEGATION")]
    pub disable_delegation: bool,

    /// Default deadline for one native invocation, in milliseconds
    #[arg(long, default_value_t = 5_000, env = "EVENTRELAY_NATIVE_TIMEOUT_MS")]
    pub native_timeout_ms: u64,

    /// Maximum native invocations running at once
    #[arg(
        long,
        default_value_t = 64,
        env = "EVENTRELAY_MAX_NATIVE_CONCURRENCY",
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub max_native_concurrency: u32,

    /// Maximum callers waiting for a native slot
    #[arg(long, default_value_t = 1_024, env = "EVENTRELAY_MAX_NATIVE_QUEUE")]
    pub max_native_queue: u32,

    /// Nominal latency of the standard tier, in milliseconds
    #[arg(long, default_value_t = 1, env = "EVENTRELAY_STANDARD_LATENCY_MS")]
    pub standard_latency_ms: u64,

    /// Events of one batch dispatched concurrently (1 = sequential)
    #[arg(long, default_value_t = 1, env = "EVENTRELAY_BATCH_CONCURRENCY")]
    pub batch_concurrency: usize,

    /// Seconds shutdown waits for in-flight dispatches
    #[arg(long, default_value_t = 30, env = "EVENTRELAY_DRAIN_TIMEOUT_SECS")]
    pub drain_timeout_secs: u64,

    /// Log output format
    #[arg(long, value_enum, default_value = "json", env = "EVENTRELAY_LOG_FORMAT")]
    pub log_format: LogFormat,

    /// Log filter used when `RUST_LOG` is unset
    #[arg(long, default_value = "info", env = "EVENTRELAY_LOG_LEVEL")]
    pub log_level: String,

    /// Expose Prometheus metrics on this port
    #[arg(long, env = "EVENTRELAY_METRICS_PORT")]
    pub metrics_port: Option<u16>,
}

impl Cli {
    #[must_use]
    pub fn dispatch_config(&self) -> DispatchConfig {
        DispatchConfig {
            delegation_enabled: !self.disable_delegation,
            driver_path: self.driver_path.clone(),
            native_timeout_ms: self.native_timeout_ms,
            max_concurrent_native: self.max_native_concurrency,
            max_queued_native: self.max_native_queue,
            standard_latency_ms: self.standard_latency_ms,
            batch_concurrency: self.batch_concurrency,
        }
    }

    #[must_use]
    pub fn network_config(&self) -> NetworkConfig {
        NetworkConfig {
            host: self.host.clone(),
            port: self.http_port,
            drain_timeout: Duration::from_secs(self.drain_timeout_secs),
            ..NetworkConfig::default()
        }
    }

    #[must_use]
    pub fn rpc_config(&self) -> RpcConfig {
        RpcConfig {
            host: self.host.clone(),
            port: self.rpc_port,
            ..RpcConfig::default()
        }
    }

    #[must_use]
    pub fn observability_config(&self) -> ObservabilityConfig {
        ObservabilityConfig {
            log_format: self.log_format,
            default_log_level: self.log_level.clone(),
            metrics_port: self.metrics_port,
        }
    }
}
