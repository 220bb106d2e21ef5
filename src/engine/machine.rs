// src/engine/machine.rs

//! Pure run state machine.
//!
//! [`RunStateMachine`] consumes commands (`begin`, `cancel`, `reset`) and
//! backend [`ProcessEvent`]s and returns the [`SupervisorEvent`]s they
//! produce. It owns the [`ProcessHandle`] of the one supervised process.
//!
//! It has **no** channels, no Tokio types and performs no IO, so every
//! transition can be unit tested with synthetic events.

use tracing::debug;

use crate::errors::{Result, ScriptrunError};
use crate::progress::{LineBuffer, parse_progress_line};

use super::{OutputStream, ProcessEvent, RunId, RunState, SupervisorEvent};

/// Runtime state of the supervised process.
#[derive(Debug)]
pub struct ProcessHandle {
    run_id: RunId,
    pid: Option<u32>,
    argv: Vec<String>,
    /// Every byte of merged output received so far.
    output: Vec<u8>,
    stdout_lines: LineBuffer,
    stderr_lines: LineBuffer,
    progress: Option<u8>,
}

impl ProcessHandle {
    fn new(run_id: RunId, argv: Vec<String>) -> Self {
        Self {
            run_id,
            pid: None,
            argv,
            output: Vec::new(),
            stdout_lines: LineBuffer::new(),
            stderr_lines: LineBuffer::new(),
            progress: None,
        }
    }

    fn absorb_line(&mut self, line: String, events: &mut Vec<SupervisorEvent>) {
        let progress = parse_progress_line(&line);
        events.push(SupervisorEvent::OutputLine(line));
        if let Some(percent) = progress {
            self.progress = Some(percent);
            events.push(SupervisorEvent::Progress(percent));
        }
    }

    fn lines_mut(&mut self, stream: OutputStream) -> &mut LineBuffer {
        match stream {
            OutputStream::Stdout => &mut self.stdout_lines,
            OutputStream::Stderr => &mut self.stderr_lines,
        }
    }

    fn flush_partial(&mut self, events: &mut Vec<SupervisorEvent>) {
        for stream in [OutputStream::Stdout, OutputStream::Stderr] {
            if let Some(line) = self.lines_mut(stream).finish() {
                self.absorb_line(line, events);
            }
        }
    }
}

/// Immutable copy of the supervisor's state for polling callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSnapshot {
    pub state: RunState,
    pub run_id: Option<RunId>,
    pub pid: Option<u32>,
    pub argv: Vec<String>,
    pub output: Vec<u8>,
    pub progress: Option<u8>,
}

impl ProcessSnapshot {
    pub fn output_text(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }
}

#[derive(Debug)]
pub struct RunStateMachine {
    state: RunState,
    next_run_id: RunId,
    handle: Option<ProcessHandle>,
}

impl Default for RunStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl RunStateMachine {
    pub fn new() -> Self {
        Self {
            state: RunState::Idle,
            next_run_id: 1,
            handle: None,
        }
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    /// Id of the run currently in `Running`, if any.
    pub fn current_run(&self) -> Option<RunId> {
        match (&self.state, &self.handle) {
            (RunState::Running, Some(h)) => Some(h.run_id),
            _ => None,
        }
    }

    /// Accept a new run.
    ///
    /// Fails with [`ScriptrunError::Busy`] while a run is active and leaves
    /// the state untouched. A terminal state passes through `Idle` first.
    pub fn begin(&mut self, argv: Vec<String>) -> Result<(RunId, Vec<SupervisorEvent>)> {
        if self.state.is_running() {
            return Err(ScriptrunError::Busy);
        }

        let mut events = Vec::new();
        if self.state.is_terminal() {
            self.state = RunState::Idle;
            events.push(SupervisorEvent::StateChanged(RunState::Idle));
        }

        let run_id = self.next_run_id;
        self.next_run_id += 1;
        self.handle = Some(ProcessHandle::new(run_id, argv));
        self.state = RunState::Running;
        events.push(SupervisorEvent::StateChanged(RunState::Running));

        debug!(run_id, "run accepted");
        Ok((run_id, events))
    }

    pub fn attach_pid(&mut self, run_id: RunId, pid: Option<u32>) {
        if let Some(handle) = self.running_handle(run_id) {
            handle.pid = pid;
        }
    }

    /// Feed one backend event through the machine.
    pub fn apply(&mut self, event: ProcessEvent) -> Vec<SupervisorEvent> {
        match event {
            ProcessEvent::Output {
                run_id,
                stream,
                chunk,
            } => self.on_output(run_id, stream, &chunk),
            ProcessEvent::Exited { run_id, code } => self.on_exit(run_id, code),
            ProcessEvent::Failed { run_id, reason } => self.on_failure(run_id, reason),
        }
    }

    pub fn on_output(
        &mut self,
        run_id: RunId,
        stream: OutputStream,
        chunk: &[u8],
    ) -> Vec<SupervisorEvent> {
        let Some(handle) = self.running_handle(run_id) else {
            debug!(run_id, bytes = chunk.len(), "dropping output for inactive run");
            return Vec::new();
        };

        handle.output.extend_from_slice(chunk);
        let mut events = Vec::new();
        for line in handle.lines_mut(stream).push(chunk) {
            handle.absorb_line(line, &mut events);
        }
        events
    }

    /// Normal termination. Progress is forced to 100 so the indicator
    /// always completes, even when the task never printed `PROGRESS 100`.
    pub fn on_exit(&mut self, run_id: RunId, code: i32) -> Vec<SupervisorEvent> {
        let Some(handle) = self.running_handle(run_id) else {
            debug!(run_id, code, "ignoring exit of inactive run");
            return Vec::new();
        };

        let mut events = Vec::new();
        handle.flush_partial(&mut events);
        if handle.progress != Some(100) {
            handle.progress = Some(100);
            events.push(SupervisorEvent::Progress(100));
        }

        self.state = RunState::Finished(code);
        events.push(SupervisorEvent::StateChanged(self.state.clone()));
        events
    }

    pub fn on_failure(&mut self, run_id: RunId, reason: String) -> Vec<SupervisorEvent> {
        let Some(handle) = self.running_handle(run_id) else {
            debug!(run_id, %reason, "ignoring failure of inactive run");
            return Vec::new();
        };

        let mut events = Vec::new();
        handle.flush_partial(&mut events);

        self.state = RunState::Errored(reason);
        events.push(SupervisorEvent::StateChanged(self.state.clone()));
        events
    }

    /// Stop the active run. Returns `None` (a no-op) when nothing is running.
    ///
    /// Buffered partial output is discarded: nothing is published for a run
    /// after its cancellation.
    pub fn cancel(&mut self) -> Option<(RunId, Vec<SupervisorEvent>)> {
        let run_id = self.current_run()?;
        self.state = RunState::Cancelled;
        Some((run_id, vec![SupervisorEvent::StateChanged(RunState::Cancelled)]))
    }

    /// Return to `Idle` from a terminal state, discarding the old handle.
    ///
    /// Rejected with [`ScriptrunError::Busy`] while running; a no-op when
    /// already idle.
    pub fn reset(&mut self) -> Result<Vec<SupervisorEvent>> {
        match self.state {
            RunState::Running => Err(ScriptrunError::Busy),
            RunState::Idle => Ok(Vec::new()),
            _ => {
                self.state = RunState::Idle;
                self.handle = None;
                Ok(vec![SupervisorEvent::StateChanged(RunState::Idle)])
            }
        }
    }

    pub fn snapshot(&self) -> ProcessSnapshot {
        match &self.handle {
            Some(h) => ProcessSnapshot {
                state: self.state.clone(),
                run_id: Some(h.run_id),
                pid: h.pid,
                argv: h.argv.clone(),
                output: h.output.clone(),
                progress: h.progress,
            },
            None => ProcessSnapshot {
                state: self.state.clone(),
                run_id: None,
                pid: None,
                argv: Vec::new(),
                output: Vec::new(),
                progress: None,
            },
        }
    }

    fn running_handle(&mut self, run_id: RunId) -> Option<&mut ProcessHandle> {
        if !self.state.is_running() {
            return None;
        }
        self.handle.as_mut().filter(|h| h.run_id == run_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started() -> (RunStateMachine, RunId) {
        let mut machine = RunStateMachine::new();
        let (run_id, events) = machine.begin(vec!["task".into()]).unwrap();
        assert_eq!(events, vec![SupervisorEvent::StateChanged(RunState::Running)]);
        (machine, run_id)
    }

    fn progress_of(events: &[SupervisorEvent]) -> Vec<u8> {
        events
            .iter()
            .filter_map(|e| match e {
                SupervisorEvent::Progress(p) => Some(*p),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn begin_while_running_is_busy_and_changes_nothing() {
        let (mut machine, run_id) = started();
        assert!(matches!(machine.begin(vec![]), Err(ScriptrunError::Busy)));
        assert_eq!(machine.state(), &RunState::Running);
        assert_eq!(machine.current_run(), Some(run_id));
    }

    #[test]
    fn cancel_when_idle_is_a_noop() {
        let mut machine = RunStateMachine::new();
        assert!(machine.cancel().is_none());
        assert_eq!(machine.state(), &RunState::Idle);
    }

    #[test]
    fn progress_split_across_chunks_is_reported_once() {
        let (mut machine, run_id) = started();
        assert!(machine.on_output(run_id, OutputStream::Stdout, b"PROG").is_empty());
        let events = machine.on_output(run_id, OutputStream::Stdout, b"RESS 42\n");
        assert_eq!(
            events,
            vec![
                SupervisorEvent::OutputLine("PROGRESS 42".into()),
                SupervisorEvent::Progress(42),
            ]
        );
    }

    #[test]
    fn partial_lines_are_kept_per_stream() {
        let (mut machine, run_id) = started();
        assert!(machine.on_output(run_id, OutputStream::Stdout, b"PROG").is_empty());
        let events = machine.on_output(run_id, OutputStream::Stderr, b"warning\n");
        assert_eq!(events, vec![SupervisorEvent::OutputLine("warning".into())]);

        let events = machine.on_output(run_id, OutputStream::Stdout, b"RESS 30\n");
        assert_eq!(
            events,
            vec![
                SupervisorEvent::OutputLine("PROGRESS 30".into()),
                SupervisorEvent::Progress(30),
            ]
        );
    }

    #[test]
    fn finish_forces_progress_to_100() {
        let (mut machine, run_id) = started();
        machine.on_output(run_id, OutputStream::Stdout, b"PROGRESS 80\n");
        let events = machine.on_exit(run_id, 0);
        assert_eq!(
            events,
            vec![
                SupervisorEvent::Progress(100),
                SupervisorEvent::StateChanged(RunState::Finished(0)),
            ]
        );
        assert_eq!(machine.snapshot().progress, Some(100));
    }

    #[test]
    fn finish_after_explicit_100_does_not_repeat_it() {
        let (mut machine, run_id) = started();
        let mut events = Vec::new();
        for line in ["PROGRESS 0\n", "PROGRESS 50\n", "PROGRESS 100\n"] {
            events.extend(machine.on_output(run_id, OutputStream::Stdout, line.as_bytes()));
        }
        events.extend(machine.on_exit(run_id, 0));
        assert_eq!(progress_of(&events), vec![0, 50, 100]);
        assert_eq!(
            events.last(),
            Some(&SupervisorEvent::StateChanged(RunState::Finished(0)))
        );
    }

    #[test]
    fn unterminated_last_line_is_flushed_on_exit() {
        let (mut machine, run_id) = started();
        machine.on_output(run_id, OutputStream::Stdout, b"Done.");
        let events = machine.on_exit(run_id, 2);
        assert_eq!(events[0], SupervisorEvent::OutputLine("Done.".into()));
        assert_eq!(machine.snapshot().output_text(), "Done.");
    }

    #[test]
    fn nothing_is_published_after_cancel() {
        let (mut machine, run_id) = started();
        machine.on_output(run_id, OutputStream::Stdout, b"partial");

        let (cancelled, events) = machine.cancel().unwrap();
        assert_eq!(cancelled, run_id);
        assert_eq!(events, vec![SupervisorEvent::StateChanged(RunState::Cancelled)]);

        assert!(machine.on_output(run_id, OutputStream::Stdout, b" line\nmore\n").is_empty());
        assert!(machine.on_exit(run_id, 0).is_empty());
        assert_eq!(machine.state(), &RunState::Cancelled);
    }

    #[test]
    fn failure_records_reason() {
        let (mut machine, run_id) = started();
        let events = machine.on_failure(run_id, "stream closed".into());
        assert_eq!(
            events,
            vec![SupervisorEvent::StateChanged(RunState::Errored("stream closed".into()))]
        );
    }

    #[test]
    fn stale_run_events_are_ignored_after_restart() {
        let (mut machine, first) = started();
        machine.on_exit(first, 0);

        let (second, events) = machine.begin(vec!["again".into()]).unwrap();
        assert_eq!(
            events,
            vec![
                SupervisorEvent::StateChanged(RunState::Idle),
                SupervisorEvent::StateChanged(RunState::Running),
            ]
        );
        assert_ne!(first, second);
        assert!(machine.on_output(first, OutputStream::Stdout, b"old\n").is_empty());
        assert_eq!(machine.on_output(second, OutputStream::Stdout, b"new\n").len(), 1);
        assert_eq!(machine.snapshot().argv, vec!["again".to_string()]);
    }

    #[test]
    fn reset_only_from_terminal_states() {
        let (mut machine, run_id) = started();
        assert!(matches!(machine.reset(), Err(ScriptrunError::Busy)));

        machine.on_exit(run_id, 1);
        assert_eq!(
            machine.reset().unwrap(),
            vec![SupervisorEvent::StateChanged(RunState::Idle)]
        );
        assert_eq!(machine.snapshot().run_id, None);
        assert!(machine.reset().unwrap().is_empty());
    }
}
