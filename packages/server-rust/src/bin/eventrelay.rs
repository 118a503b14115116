use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use eventrelay_server::cli::Cli;
use eventrelay_server::network::NetworkModule;
use eventrelay_server::observability;
use eventrelay_server::rpc::{RpcServer, RpcService};
use eventrelay_server::service::{BatchCoordinator, Dispatcher};
use tracing::{error, info};

/// Resolves on Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    observability::init(&cli.observability_config())?;

    let dispatch_config = cli.dispatch_config();
    let dispatcher = Arc::new(Dispatcher::from_config(&dispatch_config));
    let batch = BatchCoordinator::new(Arc::clone(&dispatcher), dispatch_config.batch_concurrency);
    info!(
        delegation_enabled = dispatch_config.delegation_enabled,
        driver_path = %dispatch_config.driver_path.display(),
        batch_concurrency = dispatch_config.batch_concurrency,
        "dispatcher ready"
    );

    let mut http = NetworkModule::new(cli.network_config(), Arc::clone(&dispatcher), batch.clone());
    let mut rpc = RpcServer::new(
        cli.rpc_config(),
        RpcService::new(dispatcher, batch),
        http.shutdown_controller(),
    );

    let http_port = http.start().await.context("failed to bind HTTP listener")?;
    let rpc_port = rpc.start().await.context("failed to bind RPC listener")?;
    info!(http_port, rpc_port, "eventrelay started");

    // The RPC server stops when the HTTP module triggers the shared controller.
    let rpc_task = tokio::spawn(rpc.serve());
    http.serve(shutdown_signal()).await?;
    rpc_task.await.context("RPC server task panicked")?;

    info!("eventrelay stopped");
    Ok(())
}
