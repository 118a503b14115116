//! Tracing subscriber setup, Prometheus exporter, and metric helpers.
//!
//! All metric names live here so the dispatch, bridge, and transport code
//! only call the `record_*` helpers. Without an installed recorder the
//! `metrics` macros are no-ops, which keeps tests free of global state.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use anyhow::{Context, Result};
use eventrelay_core::Tier;
use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Structured JSON, one object per line.
    #[default]
    Json,
    /// Multi-line human readable output.
    Pretty,
    /// Single-line human readable output.
    Compact,
}

#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    pub log_format: LogFormat,
    /// Filter used when `RUST_LOG` is unset.
    pub default_log_level: String,
    /// Port for the Prometheus scrape endpoint. `None` disables it.
    pub metrics_port: Option<u16>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Json,
            default_log_level: "info".to_string(),
            metrics_port: None,
        }
    }
}

/// Installs the global tracing subscriber and, if configured, the
/// Prometheus exporter.
///
/// # Errors
///
/// Fails if a global subscriber or recorder is already installed, or the
/// metrics listener cannot be set up.
pub fn init(config: &ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.default_log_level))
        .context("invalid log level")?;

    let registry = tracing_subscriber::registry().with(filter);
    match config.log_format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_target(true).with_current_span(true))
            .try_init(),
        LogFormat::Pretty => registry.with(fmt::layer().pretty()).try_init(),
        LogFormat::Compact => registry.with(fmt::layer().compact()).try_init(),
    }
    .context("failed to initialize tracing subscriber")?;

    if let Some(port) = config.metrics_port {
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port);
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .context("failed to install Prometheus recorder")?;
        tracing::info!(port, "prometheus metrics endpoint listening");
    }

    tracing::info!(
        log_format = ?config.log_format,
        metrics_port = ?config.metrics_port,
        "observability initialized"
    );
    Ok(())
}

#[allow(clippy::cast_precision_loss)]
fn millis(duration: Duration) -> f64 {
    duration.as_micros() as f64 / 1_000.0
}

/// One event finished dispatch on `tier`.
pub fn record_dispatch(tier: Tier, processed: bool, duration: Duration) {
    let outcome = if processed { "processed" } else { "failed" };
    counter!("eventrelay_dispatch_total", "tier" => tier.as_str(), "outcome" => outcome)
        .increment(1);
    histogram!("eventrelay_dispatch_duration_ms", "tier" => tier.as_str()).record(millis(duration));
}

/// A delegated event ran on the standard tier because the native component
/// was unavailable.
pub fn record_fallback() {
    counter!("eventrelay_native_fallback_total").increment(1);
}

/// One native delegation finished with `outcome`.
pub fn record_native(outcome: &'static str, duration: Duration) {
    counter!("eventrelay_native_calls_total", "outcome" => outcome).increment(1);
    histogram!("eventrelay_native_duration_ms").record(millis(duration));
}

pub fn record_native_rejected() {
    counter!("eventrelay_native_rejected_total").increment(1);
}

/// A batch was dispatched on `transport`.
pub fn record_batch(transport: &'static str, total: u64, failed: u64) {
    counter!("eventrelay_batches_total", "transport" => transport).increment(1);
    #[allow(clippy::cast_precision_loss)]
    histogram!("eventrelay_batch_size").record(total as f64);
    if failed > 0 {
        counter!("eventrelay_batch_failed_events_total").increment(failed);
    }
}

/// A request was rejected before dispatch (malformed or invalid input).
pub fn record_rejected(transport: &'static str, kind: &'static str) {
    counter!("eventrelay_rejected_total", "transport" => transport, "kind" => kind).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ObservabilityConfig::default();
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.default_log_level, "info");
        assert!(config.metrics_port.is_none());
    }

    #[test]
    fn helpers_are_noops_without_recorder() {
        record_dispatch(Tier::Standard, true, Duration::from_millis(3));
        record_fallback();
        record_native("completed", Duration::from_millis(1));
        record_native_rejected();
        record_batch("http", 3, 1);
        record_rejected("rpc", "decode");
    }

    #[test]
    fn millis_keeps_sub_millisecond_precision() {
        assert!((millis(Duration::from_micros(1_500)) - 1.5).abs() < f64::EPSILON);
    }
}
