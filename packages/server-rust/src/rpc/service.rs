//! RPC request handling over the shared dispatcher.
//!
//! Applies the same decoding and validation as the HTTP handlers, so any
//! event yields the same `processed`/`error` on either transport.

use std::sync::Arc;
use std::time::Duration;

use eventrelay_core::messages::{
    HealthResponse, ProcessBatchRequest, ProcessBatchResponse, ProcessRequest, ProcessResponse,
    RejectKind, RpcError, RpcRequest, RpcResponse,
};
use eventrelay_core::{envelopes_from_wire, Envelope, EnvelopeError};
use tracing::debug;

use crate::observability;
use crate::service::{BatchCoordinator, BatchError, Dispatcher};

/// Maps [`RpcRequest`]s onto the dispatcher and batch coordinator.
#[derive(Debug, Clone)]
pub struct RpcService {
    dispatcher: Arc<Dispatcher>,
    batch: BatchCoordinator,
}

fn reject(kind: RejectKind, message: impl Into<String>) -> RpcResponse {
    let message = message.into();
    debug!(kind = kind.as_str(), error = %message, "rpc request rejected");
    observability::record_rejected("rpc", kind.as_str());
    RpcResponse::Error(RpcError { kind, message })
}

fn invalid_event(err: &EnvelopeError) -> RpcResponse {
    reject(RejectKind::from(err), err.to_string())
}

fn invalid_batch(err: BatchError) -> RpcResponse {
    match err {
        BatchError::Empty => reject(RejectKind::EmptyBatch, err.to_string()),
    }
}

impl RpcService {
    #[must_use]
    pub fn new(dispatcher: Arc<Dispatcher>, batch: BatchCoordinator) -> Self {
        Self { dispatcher, batch }
    }

    /// Handles one request. Rejections come back as `RpcResponse::Error`;
    /// dispatch failures are ordinary `PROCESS` replies with
    /// `processed=false`.
    pub async fn handle(&self, request: RpcRequest) -> RpcResponse {
        match request {
            RpcRequest::Process(req) => self.process(req).await,
            RpcRequest::ProcessBatch(req) => self.process_batch(req).await,
            RpcRequest::Health(_) => RpcResponse::Health(HealthResponse::ok()),
        }
    }

    fn deadline(&self, deadline_ms: Option<u64>) -> Result<Duration, RpcResponse> {
        match deadline_ms {
            None => Ok(self.dispatcher.native_timeout()),
            Some(0) => Err(reject(RejectKind::Validation, "`deadlineMs` must be positive")),
            Some(ms) => Ok(Duration::from_millis(ms)),
        }
    }

    async fn process(&self, req: ProcessRequest) -> RpcResponse {
        let deadline = match self.deadline(req.deadline_ms) {
            Ok(deadline) => deadline,
            Err(rejected) => return rejected,
        };
        let Some(wire) = req.event else {
            return invalid_event(&EnvelopeError::missing("event"));
        };
        let event = match Envelope::try_from(wire) {
            Ok(event) => event,
            Err(e) => return invalid_event(&e),
        };

        let outcome = self.dispatcher.dispatch_within(&event, deadline).await;
        RpcResponse::Process(ProcessResponse::from(&outcome))
    }

    async fn process_batch(&self, req: ProcessBatchRequest) -> RpcResponse {
        let deadline = match self.deadline(req.deadline_ms) {
            Ok(deadline) => deadline,
            Err(rejected) => return rejected,
        };
        let events = match envelopes_from_wire(req.events) {
            Ok(events) => events,
            Err(e) => return invalid_event(&e),
        };

        match self.batch.dispatch_batch_within(&events, deadline).await {
            Ok(result) => {
                observability::record_batch("rpc", result.total, result.failed_count);
                RpcResponse::ProcessBatch(ProcessBatchResponse::from(&result))
            }
            Err(e) => invalid_batch(e),
        }
    }
}
