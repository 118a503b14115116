//! HTTP transport with deferred startup.
//!
//! `new()` allocates shared state, `start()` binds the listener, and
//! `serve()` accepts requests until shutdown. The shutdown controller is
//! created here and handed to the RPC server between `new()` and `serve()`
//! so both transports share one lifecycle.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tracing::{info, warn};

use super::config::NetworkConfig;
use super::handlers::{
    health_handler, liveness_handler, process_batch_handler, process_handler, readiness_handler,
    status_handler, AppState,
};
use super::middleware::{build_http_layers, health_timeout_layer};
use super::shutdown::ShutdownController;
use crate::service::{BatchCoordinator, Dispatcher};

/// Assembles the router with all routes and HTTP middleware.
///
/// Routes:
/// - `POST /process` -- dispatch one event
/// - `POST /process-batch` -- dispatch a batch
/// - `GET /health` -- `{"status":"ok"}`
/// - `GET /health/live` -- liveness probe
/// - `GET /health/ready` -- readiness probe
/// - `GET /health/status` -- lifecycle details
///
/// Only the health routes carry `request_timeout`. Bodies above
/// `max_body_bytes` get 413. Other methods on these paths get 405 from
/// axum's method routing.
pub fn build_router(state: AppState, config: &NetworkConfig) -> Router {
    let health = Router::new()
        .route("/health", get(health_handler))
        .route("/health/live", get(liveness_handler))
        .route("/health/ready", get(readiness_handler))
        .route("/health/status", get(status_handler))
        .layer(health_timeout_layer(config));

    Router::new()
        .route("/process", post(process_handler))
        .route("/process-batch", post(process_batch_handler))
        .merge(health)
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .layer(build_http_layers(config))
        .with_state(state)
}

/// Manages the HTTP server lifecycle.
pub struct NetworkModule {
    config: NetworkConfig,
    listener: Option<TcpListener>,
    dispatcher: Arc<Dispatcher>,
    batch: BatchCoordinator,
    shutdown: Arc<ShutdownController>,
}

impl NetworkModule {
    /// Creates the module without binding a port.
    #[must_use]
    pub fn new(config: NetworkConfig, dispatcher: Arc<Dispatcher>, batch: BatchCoordinator) -> Self {
        Self {
            config,
            listener: None,
            dispatcher,
            batch,
            shutdown: Arc::new(ShutdownController::new()),
        }
    }

    /// Shared shutdown controller, for the RPC server and signal handling.
    #[must_use]
    pub fn shutdown_controller(&self) -> Arc<ShutdownController> {
        Arc::clone(&self.shutdown)
    }

    fn app_state(&self) -> AppState {
        AppState {
            dispatcher: Arc::clone(&self.dispatcher),
            batch: self.batch.clone(),
            shutdown: Arc::clone(&self.shutdown),
            config: Arc::new(self.config.clone()),
            start_time: Instant::now(),
        }
    }

    /// Binds the TCP listener and returns the bound port (useful with
    /// port 0).
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound.
    pub async fn start(&mut self) -> anyhow::Result<u16> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr).await?;
        let port = listener.local_addr()?.port();

        info!(host = %self.config.host, port, "HTTP listener bound");

        self.listener = Some(listener);
        Ok(port)
    }

    /// Serves requests until `shutdown` resolves, then drains.
    ///
    /// On the signal the controller moves to Draining (which also stops the
    /// RPC server), axum finishes open requests, and the drain waits up to
    /// `drain_timeout` for in-flight dispatches before moving to Stopped.
    ///
    /// # Errors
    ///
    /// Returns an error if the server hits a fatal I/O error.
    ///
    /// # Panics
    ///
    /// Panics if `start()` was not called before `serve()`.
    pub async fn serve(
        mut self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> anyhow::Result<()> {
        let listener = self
            .listener
            .take()
            .expect("start() must be called before serve()");
        let router = build_router(self.app_state(), &self.config);
        let controller = self.shutdown;

        controller.set_ready();
        info!("serving HTTP requests");

        let signal = {
            let controller = Arc::clone(&controller);
            async move {
                shutdown.await;
                info!("shutdown signal received, draining");
                controller.trigger_shutdown();
            }
        };
        axum::serve(listener, router)
            .with_graceful_shutdown(signal)
            .await?;

        if controller.wait_for_drain(self.config.drain_timeout).await {
            info!("all in-flight dispatches drained");
        } else {
            warn!(
                in_flight = controller.in_flight_count(),
                "drain timeout expired with dispatches still in flight"
            );
        }
        Ok(())
    }
}
