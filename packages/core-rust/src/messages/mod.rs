//! Wire schemas for the two transports.
//!
//! - [`http`]: JSON bodies for the request/response transport.
//! - [`rpc`]: `MsgPack` frames for the remote-procedure transport, encoded
//!   with `rmp_serde::to_vec_named()` and camelCase field names.
//!
//! Both decode events through [`crate::WireEvent`] and shape replies from the
//! same [`crate::Outcome`]/[`crate::BatchResult`] values, which is what keeps
//! the transports behaviorally identical.

pub mod http;
pub mod rpc;

use serde::{Deserialize, Serialize};

use crate::envelope::EnvelopeError;

pub use http::{BatchBody, BatchReply, ErrorReply, HealthReply, ProcessReply};
pub use rpc::{
    CallDecodeError, HealthRequest, HealthResponse, ProcessBatchRequest, ProcessBatchResponse,
    ProcessRequest, ProcessResponse, RpcCall, RpcError, RpcReply, RpcRequest, RpcResponse,
};

/// Status string reported by both health endpoints.
pub const HEALTH_OK: &str = "ok";

/// Why a request was rejected before reaching the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectKind {
    /// Input was not well-formed structured data.
    Decode,
    /// A required field was missing.
    Validation,
    /// A batch contained zero events.
    EmptyBatch,
}

impl RejectKind {
    /// Same spelling as the serialized form, for logs and metric labels.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Decode => "decode",
            Self::Validation => "validation",
            Self::EmptyBatch => "empty_batch",
        }
    }
}

impl From<&EnvelopeError> for RejectKind {
    fn from(err: &EnvelopeError) -> Self {
        match err {
            EnvelopeError::Decode(_) => Self::Decode,
            EnvelopeError::Validation { .. } => Self::Validation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reject_kind_label_matches_wire_form() {
        for kind in [RejectKind::Decode, RejectKind::Validation, RejectKind::EmptyBatch] {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
    }

    #[test]
    fn envelope_errors_map_to_kinds() {
        let decode = EnvelopeError::Decode("eof".to_string());
        assert_eq!(RejectKind::from(&decode), RejectKind::Decode);
        assert_eq!(RejectKind::from(&EnvelopeError::missing("channel")), RejectKind::Validation);
    }
}
