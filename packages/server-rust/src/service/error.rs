//! Errors raised inside the dispatch pipeline.

use std::path::PathBuf;

/// Failure of the delegated tier after it was engaged.
#[derive(Debug, thiserror::Error)]
pub enum NativeError {
    #[error("native component exited with {status}")]
    Exit { status: std::process::ExitStatus },
    #[error("failed to launch native component {path}: {source}")]
    Launch {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to wait for native component: {0}")]
    Wait(#[source] std::io::Error),
    #[error("failed to serialize event: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("native component timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    #[error("native component overloaded, try again later")]
    Overloaded,
}

impl NativeError {
    /// Short label used as a metric tag.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Exit { .. } => "exit",
            Self::Launch { .. } => "launch",
            Self::Wait(_) => "wait",
            Self::Serialize(_) => "serialize",
            Self::Timeout { .. } => "timeout",
            Self::Overloaded => "overloaded",
        }
    }
}

/// Failure of the standard tier. The placeholder handler never returns it;
/// handlers with real side effects do.
#[derive(Debug, thiserror::Error)]
pub enum StandardError {
    #[error("standard processing failed: {0}")]
    Failed(String),
}

/// Batch rejected before any dispatch work began.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BatchError {
    #[error("empty batch")]
    Empty,
}
