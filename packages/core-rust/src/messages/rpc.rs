//! `MsgPack` frames for the RPC transport.
//!
//! A client sends [`RpcCall`] frames and receives [`RpcReply`] frames with
//! the same `callId`. Requests and responses are internally tagged on
//! `"type"` with `SCREAMING_SNAKE_CASE` variant names, mirroring the three
//! HTTP endpoints: `PROCESS`, `PROCESS_BATCH`, `HEALTH`.

use serde::{Deserialize, Serialize};

use super::{RejectKind, HEALTH_OK};
use crate::envelope::WireEvent;
use crate::outcome::{BatchResult, Outcome};

/// Client-to-server frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcCall {
    pub call_id: u64,
    pub request: RpcRequest,
}

/// Server-to-client frame. `call_id` is 0 when the originating frame could
/// not be decoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcReply {
    pub call_id: u64,
    pub response: RpcResponse,
}

macro_rules! msgpack_codec {
    ($ty:ty) => {
        impl $ty {
            /// Encodes as a named `MsgPack` map.
            ///
            /// # Errors
            ///
            /// Propagates `rmp_serde` encode failures.
            pub fn encode(&self) -> Result<Vec<u8>, rmp_serde::encode::Error> {
                rmp_serde::to_vec_named(self)
            }

            /// Decodes from `MsgPack` bytes.
            ///
            /// # Errors
            ///
            /// Returns an error when `bytes` is not a valid frame of this type.
            pub fn decode(bytes: &[u8]) -> Result<Self, rmp_serde::decode::Error> {
                rmp_serde::from_slice(bytes)
            }
        }
    };
}

msgpack_codec!(RpcCall);
msgpack_codec!(RpcReply);

/// Why an incoming call frame could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CallDecodeError {
    /// Not a readable `{callId, request}` map, so no call id to answer to.
    #[error("invalid frame: {0}")]
    Frame(String),
    /// The call id was readable but its request was not.
    #[error("invalid request: {message}")]
    Request { call_id: u64, message: String },
}

impl CallDecodeError {
    /// Call id the rejection should be sent under; 0 when unknown.
    #[must_use]
    pub fn call_id(&self) -> u64 {
        match self {
            Self::Frame(_) => 0,
            Self::Request { call_id, .. } => *call_id,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CallHeader {
    call_id: u64,
    request: rmpv::Value,
}

impl RpcCall {
    /// Decodes the envelope `{callId, request}` first and the request
    /// second, so a malformed request still reports its call id.
    ///
    /// # Errors
    ///
    /// [`CallDecodeError::Frame`] when the outer map is unreadable,
    /// [`CallDecodeError::Request`] when only the request is.
    pub fn decode_frame(bytes: &[u8]) -> Result<Self, CallDecodeError> {
        let header: CallHeader =
            rmp_serde::from_slice(bytes).map_err(|e| CallDecodeError::Frame(e.to_string()))?;
        let request = rmpv::ext::from_value(header.request).map_err(|e| CallDecodeError::Request {
            call_id: header.call_id,
            message: e.to_string(),
        })?;
        Ok(Self {
            call_id: header.call_id,
            request,
        })
    }
}

/// RPC operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RpcRequest {
    Process(ProcessRequest),
    ProcessBatch(ProcessBatchRequest),
    Health(HealthRequest),
}

/// Payload of `PROCESS`. `event` is optional on the wire so that its
/// absence can be reported as a validation error rather than a decode error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessRequest {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub event: Option<WireEvent>,
    /// Caller deadline for delegated processing.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub deadline_ms: Option<u64>,
}

/// Payload of `PROCESS_BATCH`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessBatchRequest {
    #[serde(default)]
    pub events: Vec<WireEvent>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub deadline_ms: Option<u64>,
}

/// Payload of `HEALTH`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthRequest {}

/// RPC results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RpcResponse {
    Process(ProcessResponse),
    ProcessBatch(ProcessBatchResponse),
    Health(HealthResponse),
    /// Request rejected before dispatch.
    Error(RpcError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessResponse {
    pub processed: bool,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

impl From<&Outcome> for ProcessResponse {
    fn from(outcome: &Outcome) -> Self {
        Self {
            processed: outcome.processed,
            duration_ms: outcome.duration_ms,
            error: outcome.error.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessBatchResponse {
    pub processed: u64,
    pub failed: u64,
    pub total: u64,
    pub duration_ms: u64,
    pub errors: Vec<String>,
}

impl From<&BatchResult> for ProcessBatchResponse {
    fn from(result: &BatchResult) -> Self {
        Self {
            processed: result.processed_count,
            failed: result.failed_count,
            total: result.total,
            duration_ms: result.duration_ms,
            errors: result.errors.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

impl HealthResponse {
    #[must_use]
    pub fn ok() -> Self {
        Self {
            status: HEALTH_OK.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcError {
    pub kind: RejectKind,
    pub message: String,
}
