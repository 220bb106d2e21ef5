// src/engine/mod.rs

//! Supervision engine.
//!
//! This module ties together:
//! - the run state machine (what state the one supervised process is in)
//! - the events reported by process backends (output chunks, exit, failure)
//! - the events published to the presentation layer
//!
//! The pure core state machine lives in [`machine`]; the async shell that
//! serializes commands and backend events through it is [`supervisor`].

use std::fmt;

/// Identifies one accepted `start`. Events tagged with an older id are
/// stale and ignored.
pub type RunId = u64;

/// Externally observable lifecycle of the supervisor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    /// The process exited on its own with this code.
    Finished(i32),
    Cancelled,
    Errored(String),
}

impl RunState {
    pub fn is_running(&self) -> bool {
        matches!(self, RunState::Running)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunState::Finished(_) | RunState::Cancelled | RunState::Errored(_)
        )
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Idle => f.write_str("Ready"),
            RunState::Running => f.write_str("Running..."),
            RunState::Finished(code) => write!(f, "Finished (code {code})"),
            RunState::Cancelled => f.write_str("Cancelled"),
            RunState::Errored(reason) => write!(f, "Error: {reason}"),
        }
    }
}

/// Events published to the presentation layer, in the order they happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupervisorEvent {
    /// One complete line of merged output, without its line terminator.
    OutputLine(String),
    /// Progress percentage in `0..=100`.
    Progress(u8),
    StateChanged(RunState),
}

/// The pipe an output chunk was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// Events flowing from a process backend into the supervisor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessEvent {
    /// A chunk of one pipe, not necessarily line-aligned. Lines are split
    /// per stream and merged in the order they complete.
    Output {
        run_id: RunId,
        stream: OutputStream,
        chunk: Vec<u8>,
    },
    /// The process terminated normally.
    Exited { run_id: RunId, code: i32 },
    /// The output stream could not be read or the process died abnormally.
    Failed { run_id: RunId, reason: String },
}

impl ProcessEvent {
    pub fn run_id(&self) -> RunId {
        match self {
            ProcessEvent::Output { run_id, .. }
            | ProcessEvent::Exited { run_id, .. }
            | ProcessEvent::Failed { run_id, .. } => *run_id,
        }
    }
}

pub mod machine;
pub mod supervisor;

pub use machine::{ProcessHandle, ProcessSnapshot, RunStateMachine};
pub use supervisor::{Supervisor, SupervisorHandle, spawn_process_supervisor, spawn_supervisor};
