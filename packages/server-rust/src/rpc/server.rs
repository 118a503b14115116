//! RPC listener with deferred startup.
//!
//! Each connection reads frames in one task and writes replies from a
//! dedicated writer task fed by a bounded channel. Calls on a connection run
//! concurrently, so replies may leave in a different order than the calls
//! arrived; clients match them by `callId`.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use eventrelay_core::messages::{CallDecodeError, RejectKind, RpcCall, RpcError, RpcReply, RpcResponse};
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn, Instrument};
use uuid::Uuid;

use super::codec::{framed, DEFAULT_MAX_FRAME_BYTES};
use super::service::RpcService;
use crate::network::ShutdownController;
use crate::observability;

/// Pause after a failed accept (for example `EMFILE`) before trying again.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
pub struct RpcConfig {
    pub host: String,
    /// 0 means OS-assigned.
    pub port: u16,
    pub max_frame_bytes: usize,
    /// Replies buffered per connection before call tasks wait on the writer.
    pub outbound_channel_capacity: usize,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 0,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
            outbound_channel_capacity: 256,
        }
    }
}

/// Source of incoming connections.
#[async_trait]
trait Accept: Send {
    type Io: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    /// Next connection and a printable peer address.
    async fn accept(&mut self) -> io::Result<(Self::Io, String)>;
}

#[async_trait]
impl Accept for TcpListener {
    type Io = TcpStream;

    async fn accept(&mut self) -> io::Result<(TcpStream, String)> {
        let (stream, peer) = TcpListener::accept(self).await?;
        Ok((stream, peer.to_string()))
    }
}

/// Length-delimited `MsgPack` RPC server.
///
/// Same lifecycle as [`crate::network::NetworkModule`]: `new()`, then
/// `start()` to bind, then `serve()` until the shared shutdown controller
/// is triggered.
pub struct RpcServer {
    config: RpcConfig,
    listener: Option<TcpListener>,
    service: Arc<RpcService>,
    shutdown: Arc<ShutdownController>,
}

impl RpcServer {
    #[must_use]
    pub fn new(config: RpcConfig, service: RpcService, shutdown: Arc<ShutdownController>) -> Self {
        Self {
            config,
            listener: None,
            service: Arc::new(service),
            shutdown,
        }
    }

    /// Binds the listener and returns the bound port.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound.
    pub async fn start(&mut self) -> anyhow::Result<u16> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr).await?;
        let port = listener.local_addr()?.port();

        info!(host = %self.config.host, port, "RPC listener bound");

        self.listener = Some(listener);
        Ok(port)
    }

    /// Accepts connections until shutdown is triggered.
    ///
    /// Accept failures are logged and retried after a short pause, so the
    /// transport outlives transient errors such as file descriptor
    /// exhaustion. Open connections stop reading new calls on shutdown but
    /// still deliver replies for calls already running; the in-flight guards
    /// they hold are what the HTTP module's drain waits on.
    ///
    /// # Panics
    ///
    /// Panics if `start()` was not called before `serve()`.
    pub async fn serve(mut self) {
        let listener = self
            .listener
            .take()
            .expect("start() must be called before serve()");

        info!("serving RPC connections");
        accept_loop(listener, self.service, self.shutdown, self.config).await;
        info!("RPC listener stopped");
    }
}

async fn accept_loop<A: Accept>(
    mut acceptor: A,
    service: Arc<RpcService>,
    shutdown: Arc<ShutdownController>,
    config: RpcConfig,
) {
    let mut shutdown_rx = shutdown.shutdown_receiver();
    loop {
        if *shutdown_rx.borrow_and_update() {
            break;
        }
        tokio::select! {
            accepted = acceptor.accept() => match accepted {
                Ok((stream, peer)) => {
                    let conn_id = Uuid::new_v4();
                    let span = tracing::info_span!("rpc_connection", %conn_id, %peer);
                    tokio::spawn(
                        handle_connection(
                            stream,
                            Arc::clone(&service),
                            Arc::clone(&shutdown),
                            config.clone(),
                        )
                        .instrument(span),
                    );
                }
                Err(e) => {
                    warn!(error = %e, "failed to accept rpc connection, retrying");
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                }
            },
            _ = shutdown_rx.changed() => {}
        }
    }
}

fn decode_error_reply(err: &CallDecodeError) -> RpcReply {
    observability::record_rejected("rpc", RejectKind::Decode.as_str());
    RpcReply {
        call_id: err.call_id(),
        response: RpcResponse::Error(RpcError {
            kind: RejectKind::Decode,
            message: err.to_string(),
        }),
    }
}

async fn handle_connection<T>(
    stream: T,
    service: Arc<RpcService>,
    shutdown: Arc<ShutdownController>,
    config: RpcConfig,
) where
    T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    debug!("rpc connection opened");
    let (mut sink, mut frames) = framed(stream, config.max_frame_bytes).split();
    let (tx, mut rx) = mpsc::channel::<RpcReply>(config.outbound_channel_capacity);
    let mut shutdown_rx: watch::Receiver<bool> = shutdown.shutdown_receiver();

    let writer = tokio::spawn(
        async move {
            while let Some(reply) = rx.recv().await {
                let bytes = match reply.encode() {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        warn!(call_id = reply.call_id, error = %e, "failed to encode rpc reply");
                        continue;
                    }
                };
                if let Err(e) = sink.send(Bytes::from(bytes)).await {
                    debug!(error = %e, "rpc write failed, closing writer");
                    break;
                }
            }
        }
        .in_current_span(),
    );

    loop {
        if *shutdown_rx.borrow_and_update() {
            break;
        }
        tokio::select! {
            frame = frames.next() => match frame {
                Some(Ok(bytes)) => match RpcCall::decode_frame(&bytes) {
                    Ok(call) => {
                        let guard = shutdown.in_flight_guard();
                        let service = Arc::clone(&service);
                        let tx = tx.clone();
                        tokio::spawn(
                            async move {
                                let response = service.handle(call.request).await;
                                let reply = RpcReply { call_id: call.call_id, response };
                                if tx.send(reply).await.is_err() {
                                    debug!(call_id = call.call_id, "connection closed before reply");
                                }
                                drop(guard);
                            }
                            .in_current_span(),
                        );
                    }
                    Err(e) => {
                        debug!(call_id = e.call_id(), error = %e, "undecodable rpc call");
                        if tx.send(decode_error_reply(&e)).await.is_err() {
                            break;
                        }
                    }
                },
                Some(Err(e)) => {
                    warn!(error = %e, "rpc framing error, closing connection");
                    break;
                }
                None => break,
            },
            _ = shutdown_rx.changed() => {}
        }
    }

    // The writer exits once every call task has sent its reply.
    drop(tx);
    if let Err(e) = writer.await {
        warn!(error = %e, "rpc writer task failed");
    }
    debug!("rpc connection closed");
}
