// src/exec/backend.rs

//! Pluggable process backend abstraction.
//!
//! The supervisor talks to a `ProcessBackend` instead of spawning processes
//! itself. Production code uses [`RealProcessBackend`]; tests provide a
//! backend that replays scripted output and exit events without touching
//! the OS.

use std::process::Stdio;

use tokio::process::Command;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::engine::{ProcessEvent, RunId};
use crate::errors::{Result, ScriptrunError};
use crate::task::LaunchRequest;

use super::process::supervise_child;

/// Trait abstracting how a launch request becomes a running process.
///
/// A backend reports everything that happens to the process as
/// [`ProcessEvent`]s tagged with the `run_id` it was launched with, on the
/// channel that the supervisor was built with.
pub trait ProcessBackend: Send {
    /// Start the process. Returns its OS id when one is known.
    ///
    /// An `Err` means nothing was started; the supervisor turns it into an
    /// `Errored` state.
    fn launch(&mut self, run_id: RunId, request: &LaunchRequest) -> Result<Option<u32>>;

    /// Hard-kill the process started for `run_id`, if it is still alive.
    /// No further events must be reported for it.
    fn kill(&mut self, run_id: RunId);
}

/// Internal handle for the currently running child.
struct ActiveProcess {
    run_id: RunId,
    cancel: oneshot::Sender<()>,
}

/// Real backend used in production: one `tokio::process::Child` at a time.
pub struct RealProcessBackend {
    events: mpsc::Sender<ProcessEvent>,
    active: Option<ActiveProcess>,
}

impl RealProcessBackend {
    pub fn new(events: mpsc::Sender<ProcessEvent>) -> Self {
        Self {
            events,
            active: None,
        }
    }
}

impl ProcessBackend for RealProcessBackend {
    fn launch(&mut self, run_id: RunId, request: &LaunchRequest) -> Result<Option<u32>> {
        let mut cmd = Command::new(&request.program);
        cmd.args(&request.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &request.working_dir {
            cmd.current_dir(dir);
        }

        let child = cmd.spawn().map_err(|source| ScriptrunError::Launch {
            program: request.program.clone(),
            source,
        })?;
        let pid = child.id();

        let (cancel, cancel_rx) = oneshot::channel();
        tokio::spawn(supervise_child(run_id, child, self.events.clone(), cancel_rx));

        // A previous child has already exited, so its handle is just dropped.
        self.active = Some(ActiveProcess { run_id, cancel });
        Ok(pid)
    }

    fn kill(&mut self, run_id: RunId) {
        match self.active.take() {
            Some(active) if active.run_id == run_id => {
                if active.cancel.send(()).is_err() {
                    debug!(run_id, "process already finished");
                }
            }
            other => {
                debug!(run_id, "kill requested for unknown run");
                self.active = other;
            }
        }
    }
}
