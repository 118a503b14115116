//! Fake native components for tests: shell scripts in a temp dir and an
//! in-memory bridge.

use std::os::unix::fs::PermissionsExt;
use std::os::unix::process::ExitStatusExt;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use eventrelay_core::Envelope;

use super::bridge::{CallContext, Delegation, NativeBridge};
use super::error::NativeError;

pub struct ScriptDir(tempfile::TempDir);

impl ScriptDir {
    pub fn new() -> Self {
        Self(tempfile::tempdir().expect("create temp dir"))
    }

    pub fn path(&self) -> &Path {
        self.0.path()
    }
}

/// Writes an executable `/bin/sh` script named `name` with `body` and
/// returns its path.
pub fn driver_script(dir: &ScriptDir, name: &str, body: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write script");
    let mut perms = std::fs::metadata(&path).expect("stat script").permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).expect("chmod script");
    path
}

/// Script that exits 2 for channels starting with `match:` and 0 otherwise.
/// The envelope JSON is the single argument.
pub fn failing_on_match(dir: &ScriptDir) -> PathBuf {
    driver_script(
        dir,
        "fail-on-match",
        "case \"$1\" in *'\"channel\":\"match:'*) exit 2 ;; esac\nexit 0",
    )
}

/// What a [`FakeBridge`] returns after its delay.
#[derive(Debug, Clone, Copy)]
pub enum FakeResult {
    Completed,
    Unavailable,
    Exit,
}

/// In-memory bridge with a configurable delay, counting calls.
pub struct FakeBridge {
    pub delay: Duration,
    pub result: FakeResult,
    pub calls: Arc<AtomicU32>,
}

impl FakeBridge {
    pub fn new(delay: Duration, result: FakeResult) -> Self {
        Self {
            delay,
            result,
            calls: Arc::default(),
        }
    }
}

#[async_trait]
impl NativeBridge for FakeBridge {
    async fn delegate(&self, _event: &Envelope, _ctx: CallContext) -> Result<Delegation, NativeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        match self.result {
            FakeResult::Completed => Ok(Delegation::Completed),
            FakeResult::Unavailable => Ok(Delegation::Unavailable {
                path: PathBuf::from("/missing"),
            }),
            FakeResult::Exit => Err(NativeError::Exit {
                status: exit_status(1),
            }),
        }
    }
}

/// Builds an `ExitStatus` with the given exit code.
pub fn exit_status(code: i32) -> ExitStatus {
    ExitStatus::from_raw(code << 8)
}
