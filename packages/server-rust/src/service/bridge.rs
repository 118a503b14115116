//! Delegated tier: hands events to the external native component.
//!
//! [`NativeBridge`] is the capability seam the dispatcher depends on.
//! [`ProcessBridge`] implements it by launching one process per event with
//! the serialized envelope as its only argument. Admission limits and
//! deadlines are layered on top (see [`crate::service::middleware`]).

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use eventrelay_core::Envelope;
use tokio::process::Command;
use tracing::{debug, warn};

use super::error::NativeError;

/// Per-call data threaded through the bridge decorators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallContext {
    /// Dispatcher-assigned identifier, for correlation in logs.
    pub call_id: u64,
    /// Deadline for the whole delegation, admission wait included.
    pub timeout: Duration,
}

/// Non-error results of a delegation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delegation {
    /// The component ran and exited with status zero.
    Completed,
    /// The component could not be located; the caller falls back to the
    /// standard tier.
    Unavailable { path: PathBuf },
}

/// Capability to run one event through the external native component.
///
/// Implementations may exec a process, call a local socket, or run native
/// code in-process; the dispatcher only sees this contract.
#[async_trait]
pub trait NativeBridge: Send + Sync {
    /// Delegates `event` and waits for the component to finish.
    ///
    /// # Errors
    ///
    /// Returns [`NativeError`] when the component was engaged but did not
    /// complete successfully.
    async fn delegate(&self, event: &Envelope, ctx: CallContext) -> Result<Delegation, NativeError>;
}

#[async_trait]
impl<B: NativeBridge + ?Sized> NativeBridge for std::sync::Arc<B> {
    async fn delegate(&self, event: &Envelope, ctx: CallContext) -> Result<Delegation, NativeError> {
        (**self).delegate(event, ctx).await
    }
}

// ---------------------------------------------------------------------------
// ProcessBridge
// ---------------------------------------------------------------------------

/// Runs the native component as a child process per event.
///
/// Success is solely "exited with status zero"; stdout and stderr are
/// discarded. The child is killed if the delegation future is dropped, so
/// an enclosing deadline terminates it.
#[derive(Debug, Clone)]
pub struct ProcessBridge {
    driver_path: PathBuf,
}

impl ProcessBridge {
    #[must_use]
    pub fn new(driver_path: impl Into<PathBuf>) -> Self {
        Self {
            driver_path: driver_path.into(),
        }
    }

    #[must_use]
    pub fn driver_path(&self) -> &Path {
        &self.driver_path
    }

    async fn driver_missing(&self) -> bool {
        matches!(
            tokio::fs::metadata(&self.driver_path).await,
            Err(e) if e.kind() == ErrorKind::NotFound
        )
    }

    fn unavailable(&self) -> Delegation {
        warn!(
            path = %self.driver_path.display(),
            "native component not found, falling back to standard processing"
        );
        Delegation::Unavailable {
            path: self.driver_path.clone(),
        }
    }
}

#[async_trait]
impl NativeBridge for ProcessBridge {
    async fn delegate(&self, event: &Envelope, ctx: CallContext) -> Result<Delegation, NativeError> {
        match tokio::fs::metadata(&self.driver_path).await {
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(self.unavailable()),
            Err(source) => {
                return Err(NativeError::Launch {
                    path: self.driver_path.clone(),
                    source,
                })
            }
        }

        let payload = event.to_json()?;

        let spawned = Command::new(&self.driver_path)
            .arg(payload)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn();
        let mut child = match spawned {
            Ok(child) => child,
            Err(source) => {
                // ENOENT also reports a missing interpreter or loader. Only a
                // driver removed since the existence check is unavailable.
                if source.kind() == ErrorKind::NotFound && self.driver_missing().await {
                    return Ok(self.unavailable());
                }
                return Err(NativeError::Launch {
                    path: self.driver_path.clone(),
                    source,
                });
            }
        };

        debug!(call_id = ctx.call_id, pid = child.id(), "native component launched");

        let status = child.wait().await.map_err(NativeError::Wait)?;
        if status.success() {
            Ok(Delegation::Completed)
        } else {
            Err(NativeError::Exit { status })
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::os::unix::fs::PermissionsExt;

    use super::*;
    use crate::service::test_support::{driver_script, ScriptDir};

    fn ctx() -> CallContext {
        CallContext {
            call_id: 1,
            timeout: Duration::from_secs(5),
        }
    }

    fn event() -> Envelope {
        Envelope::new("evt-1", "demo", "ticker:BTCUSD")
    }

    #[tokio::test]
    async fn missing_driver_is_unavailable() {
        let bridge = ProcessBridge::new("/nonexistent/eventrelay/driver");
        let result = bridge.delegate(&event(), ctx()).await.unwrap();
        assert_eq!(
            result,
            Delegation::Unavailable {
                path: PathBuf::from("/nonexistent/eventrelay/driver")
            }
        );
    }

    #[tokio::test]
    async fn zero_exit_is_completed() {
        let dir = ScriptDir::new();
        let bridge = ProcessBridge::new(driver_script(&dir, "ok", "exit 0"));
        let result = bridge.delegate(&event(), ctx()).await.unwrap();
        assert_eq!(result, Delegation::Completed);
    }

    #[tokio::test]
    async fn non_zero_exit_is_error() {
        let dir = ScriptDir::new();
        let bridge = ProcessBridge::new(driver_script(&dir, "fail", "exit 3"));
        let err = bridge.delegate(&event(), ctx()).await.unwrap_err();
        let NativeError::Exit { status } = err else {
            panic!("expected exit error, got {err:?}");
        };
        assert_eq!(status.code(), Some(3));
    }

    #[tokio::test]
    async fn passes_serialized_envelope_as_single_argument() {
        let dir = ScriptDir::new();
        let out = dir.path().join("captured.json");
        let body = format!(
            "[ \"$#\" -eq 1 ] || exit 9\nprintf '%s' \"$1\" > '{}'",
            out.display()
        );
        let bridge = ProcessBridge::new(driver_script(&dir, "capture", &body));

        let env = event().with_type("price");
        bridge.delegate(&env, ctx()).await.unwrap();

        let captured = std::fs::read(&out).unwrap();
        assert_eq!(Envelope::from_json_slice(&captured).unwrap(), env);
    }

    #[tokio::test]
    async fn non_executable_driver_is_launch_error() {
        let dir = ScriptDir::new();
        let path = dir.path().join("not-executable");
        std::fs::write(&path, "#!/bin/sh\nexit 0\n").unwrap();

        let bridge = ProcessBridge::new(&path);
        let err = bridge.delegate(&event(), ctx()).await.unwrap_err();
        assert!(matches!(err, NativeError::Launch { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn missing_interpreter_is_launch_error() {
        let dir = ScriptDir::new();
        let path = dir.path().join("bad-shebang");
        std::fs::write(&path, "#!/nonexistent/eventrelay/interp\nexit 0\n").unwrap();
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();

        let bridge = ProcessBridge::new(&path);
        let err = bridge.delegate(&event(), ctx()).await.unwrap_err();
        match err {
            NativeError::Launch { source, .. } => assert_eq!(source.kind(), ErrorKind::NotFound),
            other => panic!("expected launch error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn arc_bridge_forwards() {
        let bridge: std::sync::Arc<dyn NativeBridge> =
            std::sync::Arc::new(ProcessBridge::new("/nonexistent/driver"));
        let result = bridge.delegate(&event(), ctx()).await.unwrap();
        assert!(matches!(result, Delegation::Unavailable { .. }));
    }
}
