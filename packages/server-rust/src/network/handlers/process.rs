//! `POST /process` and `POST /process-batch`.
//!
//! Malformed input is rejected with 400 before reaching the dispatcher.
//! Once an event is dispatched the caller always gets a normal reply body;
//! a failed single event is signalled with 500, a partially failed batch
//! with 200 and non-zero `failed`.

use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use bytes::Bytes;
use eventrelay_core::messages::{BatchBody, BatchReply, ErrorReply, ProcessReply, RejectKind};
use eventrelay_core::{envelopes_from_wire, Envelope, EnvelopeError};
use tracing::debug;

use super::AppState;
use crate::observability;
use crate::service::BatchError;

/// Optional request header carrying the caller's deadline for native
/// delegation, in milliseconds.
pub const DEADLINE_HEADER: &str = "x-deadline-ms";

// ---------------------------------------------------------------------------
// Rejection
// ---------------------------------------------------------------------------

/// Input rejected before dispatch, answered with 400.
#[derive(Debug)]
pub struct Rejection {
    kind: RejectKind,
    message: String,
}

impl Rejection {
    fn validation(message: impl Into<String>) -> Self {
        Self {
            kind: RejectKind::Validation,
            message: message.into(),
        }
    }
}

impl From<EnvelopeError> for Rejection {
    fn from(err: EnvelopeError) -> Self {
        Self {
            kind: RejectKind::from(&err),
            message: err.to_string(),
        }
    }
}

impl From<BatchError> for Rejection {
    fn from(err: BatchError) -> Self {
        match err {
            BatchError::Empty => Self {
                kind: RejectKind::EmptyBatch,
                message: err.to_string(),
            },
        }
    }
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        debug!(kind = self.kind.as_str(), error = %self.message, "request rejected");
        observability::record_rejected("http", self.kind.as_str());
        let body = ErrorReply {
            error: self.message,
            kind: self.kind,
        };
        (StatusCode::BAD_REQUEST, Json(body)).into_response()
    }
}

/// Reads [`DEADLINE_HEADER`], falling back to `default` when absent.
fn caller_deadline(headers: &HeaderMap, default: Duration) -> Result<Duration, Rejection> {
    let Some(value) = headers.get(DEADLINE_HEADER) else {
        return Ok(default);
    };
    value
        .to_str()
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|ms| *ms > 0)
        .map(Duration::from_millis)
        .ok_or_else(|| Rejection::validation(format!("invalid `{DEADLINE_HEADER}` header")))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `POST /process`: one envelope as a JSON object.
///
/// # Errors
///
/// [`Rejection`] for an undecodable body, a missing channel, or an invalid
/// deadline header.
pub async fn process_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, Rejection> {
    let _guard = state.shutdown.in_flight_guard();

    let deadline = caller_deadline(&headers, state.dispatcher.native_timeout())?;
    let event = Envelope::from_json_slice(&body)?;

    let outcome = state.dispatcher.dispatch_within(&event, deadline).await;
    let status = if outcome.processed {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    Ok((status, Json(ProcessReply::from(&outcome))).into_response())
}

/// `POST /process-batch`: `{"events": [...]}`.
///
/// # Errors
///
/// [`Rejection`] for an undecodable body, an event without channel (the
/// message names its index), an empty batch, or an invalid deadline header.
pub async fn process_batch_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<BatchReply>, Rejection> {
    let _guard = state.shutdown.in_flight_guard();

    let deadline = caller_deadline(&headers, state.dispatcher.native_timeout())?;
    let batch: BatchBody =
        serde_json::from_slice(&body).map_err(|e| EnvelopeError::Decode(e.to_string()))?;
    let events = envelopes_from_wire(batch.events)?;

    let result = state.batch.dispatch_batch_within(&events, deadline).await?;
    observability::record_batch("http", result.total, result.failed_count);
    Ok(Json(BatchReply::from(&result)))
}
