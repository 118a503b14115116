//! JSON bodies for the HTTP transport.
//!
//! Field names are `snake_case` to match the public HTTP contract
//! (`{"processed": true, "duration_ms": 3}`).

use serde::{Deserialize, Serialize};

use super::{RejectKind, HEALTH_OK};
use crate::envelope::WireEvent;
use crate::outcome::{BatchResult, Outcome};

/// Reply body for `POST /process`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessReply {
    pub processed: bool,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

impl From<&Outcome> for ProcessReply {
    fn from(outcome: &Outcome) -> Self {
        Self {
            processed: outcome.processed,
            duration_ms: outcome.duration_ms,
            error: outcome.error.clone(),
        }
    }
}

/// Request body for `POST /process-batch`. A missing `events` key is
/// treated as an empty batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchBody {
    #[serde(default)]
    pub events: Vec<WireEvent>,
}

/// Reply body for `POST /process-batch`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReply {
    pub total: u64,
    pub processed: u64,
    pub failed: u64,
    pub errors: Vec<String>,
    pub duration_ms: u64,
}

impl From<&BatchResult> for BatchReply {
    fn from(result: &BatchResult) -> Self {
        Self {
            total: result.total,
            processed: result.processed_count,
            failed: result.failed_count,
            errors: result.errors.clone(),
            duration_ms: result.duration_ms,
        }
    }
}

/// Reply body for `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReply {
    pub status: String,
}

impl HealthReply {
    #[must_use]
    pub fn ok() -> Self {
        Self {
            status: HEALTH_OK.to_string(),
        }
    }
}

/// Client-error body for rejected requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReply {
    pub error: String,
    pub kind: RejectKind,
}
