//! Minimal RPC client for tests and tooling.
//!
//! Issues one call at a time over a single connection and waits for the
//! reply carrying its `callId`.

use bytes::Bytes;
use eventrelay_core::messages::{
    HealthRequest, ProcessBatchRequest, ProcessRequest, RpcCall, RpcReply, RpcRequest, RpcResponse,
};
use eventrelay_core::WireEvent;
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpStream, ToSocketAddrs};
use tracing::debug;

use super::codec::{framed, FramedConnection, DEFAULT_MAX_FRAME_BYTES};

#[derive(Debug, thiserror::Error)]
pub enum RpcClientError {
    #[error("rpc i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode rpc call: {0}")]
    Encode(#[from] rmp_serde::encode::Error),
    #[error("failed to decode rpc reply: {0}")]
    Decode(#[from] rmp_serde::decode::Error),
    #[error("connection closed before reply")]
    Closed,
}

pub struct RpcClient {
    framed: FramedConnection<TcpStream>,
    next_call_id: u64,
}

impl RpcClient {
    /// # Errors
    ///
    /// Returns an error if the TCP connection cannot be established.
    pub async fn connect(addr: impl ToSocketAddrs) -> Result<Self, RpcClientError> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        Ok(Self {
            framed: framed(stream, DEFAULT_MAX_FRAME_BYTES),
            next_call_id: 1,
        })
    }

    /// Sends `request` and waits for its reply. Replies for other call ids
    /// (including `callId` 0 decode errors) are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure, codec failure, or if the server
    /// closes the connection first.
    pub async fn call(&mut self, request: RpcRequest) -> Result<RpcResponse, RpcClientError> {
        let call_id = self.next_call_id;
        self.next_call_id += 1;

        let frame = RpcCall { call_id, request }.encode()?;
        self.framed.send(Bytes::from(frame)).await?;

        while let Some(frame) = self.framed.next().await {
            let reply = RpcReply::decode(&frame?)?;
            if reply.call_id == call_id {
                return Ok(reply.response);
            }
            debug!(expected = call_id, got = reply.call_id, "skipping unmatched rpc reply");
        }
        Err(RpcClientError::Closed)
    }

    /// # Errors
    ///
    /// See [`RpcClient::call`].
    pub async fn process(
        &mut self,
        event: WireEvent,
        deadline_ms: Option<u64>,
    ) -> Result<RpcResponse, RpcClientError> {
        self.call(RpcRequest::Process(ProcessRequest {
            event: Some(event),
            deadline_ms,
        }))
        .await
    }

    /// # Errors
    ///
    /// See [`RpcClient::call`].
    pub async fn process_batch(
        &mut self,
        events: Vec<WireEvent>,
        deadline_ms: Option<u64>,
    ) -> Result<RpcResponse, RpcClientError> {
        self.call(RpcRequest::ProcessBatch(ProcessBatchRequest {
            events,
            deadline_ms,
        }))
        .await
    }

    /// # Errors
    ///
    /// See [`RpcClient::call`].
    pub async fn health(&mut self) -> Result<RpcResponse, RpcClientError> {
        self.call(RpcRequest::Health(HealthRequest {})).await
    }
}
