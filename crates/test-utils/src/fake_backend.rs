use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use scriptrun::engine::{OutputStream, ProcessEvent, RunId, SupervisorEvent, SupervisorHandle, spawn_supervisor};
use scriptrun::errors::{Result, ScriptrunError};
use scriptrun::exec::ProcessBackend;
use scriptrun::task::LaunchRequest;
use tokio::sync::{Notify, mpsc};
use tokio::task::JoinHandle;

/// One thing a scripted process does.
#[derive(Debug, Clone)]
pub enum Step {
    /// Emit a raw stdout chunk (not necessarily a whole line).
    Chunk(Vec<u8>),
    /// Same as `Chunk`, on stderr.
    ErrChunk(Vec<u8>),
    Exit(i32),
    Fail(String),
    /// Block until the test calls `notify_one` on it.
    WaitFor(Arc<Notify>),
    Pause(Duration),
}

/// A complete output line, newline included.
pub fn line(text: &str) -> Step {
    Step::Chunk(format!("{text}\n").into_bytes())
}

pub fn chunk(bytes: &str) -> Step {
    Step::Chunk(bytes.as_bytes().to_vec())
}

pub fn err_chunk(bytes: &str) -> Step {
    Step::ErrChunk(bytes.as_bytes().to_vec())
}

/// What the next `launch` does.
#[derive(Debug, Clone)]
pub enum Script {
    Run(Vec<Step>),
    /// Fail the launch as if the program did not exist.
    LaunchError,
}

/// Everything the supervisor asked the backend to do.
#[derive(Debug, Default, Clone)]
pub struct BackendRecord {
    pub launches: Vec<LaunchRequest>,
    pub kills: Vec<RunId>,
}

/// A fake backend that replays one [`Script`] per launch instead of
/// spawning processes. Killing a run aborts its replay, so nothing more is
/// reported for it, like a real hard kill.
pub struct ScriptedBackend {
    events: mpsc::Sender<ProcessEvent>,
    scripts: VecDeque<Script>,
    record: Arc<Mutex<BackendRecord>>,
    running: Option<(RunId, JoinHandle<()>)>,
}

impl ScriptedBackend {
    pub fn new(
        events: mpsc::Sender<ProcessEvent>,
        scripts: Vec<Script>,
        record: Arc<Mutex<BackendRecord>>,
    ) -> Self {
        Self {
            events,
            scripts: scripts.into(),
            record,
            running: None,
        }
    }
}

impl ProcessBackend for ScriptedBackend {
    fn launch(&mut self, run_id: RunId, request: &LaunchRequest) -> Result<Option<u32>> {
        self.record.lock().unwrap().launches.push(request.clone());

        let steps = match self.scripts.pop_front() {
            Some(Script::Run(steps)) => steps,
            Some(Script::LaunchError) | None => {
                return Err(ScriptrunError::Launch {
                    program: request.program.clone(),
                    source: io::Error::new(io::ErrorKind::NotFound, "No such file or directory"),
                });
            }
        };

        let tx = self.events.clone();
        let handle = tokio::spawn(async move {
            for step in steps {
                match step {
                    Step::Chunk(chunk) => {
                        let stream = OutputStream::Stdout;
                        let _ = tx.send(ProcessEvent::Output { run_id, stream, chunk }).await;
                    }
                    Step::ErrChunk(chunk) => {
                        let stream = OutputStream::Stderr;
                        let _ = tx.send(ProcessEvent::Output { run_id, stream, chunk }).await;
                    }
                    Step::Exit(code) => {
                        let _ = tx.send(ProcessEvent::Exited { run_id, code }).await;
                        return;
                    }
                    Step::Fail(reason) => {
                        let _ = tx.send(ProcessEvent::Failed { run_id, reason }).await;
                        return;
                    }
                    Step::WaitFor(notify) => notify.notified().await,
                    Step::Pause(duration) => tokio::time::sleep(duration).await,
                }
            }
        });
        self.running = Some((run_id, handle));
        Ok(Some(10_000 + run_id as u32))
    }

    fn kill(&mut self, run_id: RunId) {
        self.record.lock().unwrap().kills.push(run_id);
        if let Some((running, handle)) = self.running.take() {
            if running == run_id {
                handle.abort();
            } else {
                self.running = Some((running, handle));
            }
        }
    }
}

/// A supervisor wired to a [`ScriptedBackend`].
pub struct ScriptedSupervisor {
    pub handle: SupervisorHandle,
    pub events: mpsc::UnboundedReceiver<SupervisorEvent>,
    pub record: Arc<Mutex<BackendRecord>>,
}

impl ScriptedSupervisor {
    pub fn launches(&self) -> Vec<LaunchRequest> {
        self.record.lock().unwrap().launches.clone()
    }

    pub fn kills(&self) -> Vec<RunId> {
        self.record.lock().unwrap().kills.clone()
    }

    /// Events that are already queued, without waiting.
    pub fn drain(&mut self) -> Vec<SupervisorEvent> {
        let mut out = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            out.push(event);
        }
        out
    }
}

/// Spawn a supervisor whose launches replay `scripts` in order.
pub fn spawn_scripted(scripts: Vec<Script>) -> ScriptedSupervisor {
    let (tx, rx) = mpsc::channel(64);
    let record = Arc::new(Mutex::new(BackendRecord::default()));
    let backend = ScriptedBackend::new(tx, scripts, Arc::clone(&record));
    let (handle, events) = spawn_supervisor(backend, rx);
    ScriptedSupervisor {
        handle,
        events,
        record,
    }
}
