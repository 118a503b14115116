//! Per-event and per-batch dispatch results.

use std::time::Duration;

use crate::classify::Tier;

/// Result of dispatching one envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// `true` iff the executed tier completed without error.
    pub processed: bool,
    /// Wall-clock time spent inside the dispatcher.
    pub duration_ms: u64,
    /// Failure cause; `Some` iff `processed` is `false`.
    pub error: Option<String>,
    /// Tier that actually ran, after any fallback.
    pub tier: Tier,
}

impl Outcome {
    #[must_use]
    pub fn success(tier: Tier, elapsed: Duration) -> Self {
        Self {
            processed: true,
            duration_ms: millis(elapsed),
            error: None,
            tier,
        }
    }

    #[must_use]
    pub fn failure(tier: Tier, elapsed: Duration, error: impl Into<String>) -> Self {
        Self {
            processed: false,
            duration_ms: millis(elapsed),
            error: Some(error.into()),
            tier,
        }
    }
}

/// Aggregate result over an ordered sequence of outcomes.
///
/// Only constructed through [`BatchResult::accumulate`], which keeps
/// `processed_count + failed_count == total` and
/// `errors.len() == failed_count`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchResult {
    pub total: u64,
    pub processed_count: u64,
    pub failed_count: u64,
    /// One entry per failed event, in dispatch order.
    pub errors: Vec<String>,
    pub duration_ms: u64,
}

impl BatchResult {
    /// Folds ordered outcomes into a batch result with the given total
    /// wall-clock time.
    pub fn accumulate<I>(outcomes: I, elapsed: Duration) -> Self
    where
        I: IntoIterator<Item = Outcome>,
    {
        let mut result = Self {
            total: 0,
            processed_count: 0,
            failed_count: 0,
            errors: Vec::new(),
            duration_ms: 0,
        };
        for outcome in outcomes {
            result.total += 1;
            if outcome.processed {
                result.processed_count += 1;
            } else {
                result.failed_count += 1;
                result
                    .errors
                    .push(outcome.error.unwrap_or_else(|| "unknown error".to_string()));
            }
        }
        result.duration_ms = millis(elapsed);
        result
    }
}

#[allow(clippy::cast_possible_truncation)]
fn millis(elapsed: Duration) -> u64 {
    elapsed.as_millis() as u64
}
