// src/engine/supervisor.rs

use std::fmt;

use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, info, warn};

use crate::errors::{Result, ScriptrunError};
use crate::exec::{ProcessBackend, RealProcessBackend};
use crate::task::LaunchRequest;

use super::machine::{ProcessSnapshot, RunStateMachine};
use super::{ProcessEvent, RunId, RunState, SupervisorEvent};

const COMMAND_CAPACITY: usize = 32;
const PROCESS_EVENT_CAPACITY: usize = 64;

/// Requests sent from [`SupervisorHandle`] to the actor.
#[derive(Debug)]
enum SupervisorCommand {
    Start {
        request: LaunchRequest,
        reply: oneshot::Sender<Result<RunId>>,
    },
    Cancel {
        reply: oneshot::Sender<bool>,
    },
    Reset {
        reply: oneshot::Sender<Result<()>>,
    },
    Snapshot {
        reply: oneshot::Sender<ProcessSnapshot>,
    },
}

/// Owns the [`RunStateMachine`] and serializes every mutation through it.
///
/// This is the async IO shell around the machine: it reads caller commands
/// and backend [`ProcessEvent`]s, feeds them into the machine and publishes
/// the resulting [`SupervisorEvent`]s. Commands are polled first, so a
/// `cancel` is handled before any output still queued for the cancelled run.
pub struct Supervisor<B: ProcessBackend> {
    machine: RunStateMachine,
    backend: B,
    commands: mpsc::Receiver<SupervisorCommand>,
    process_rx: mpsc::Receiver<ProcessEvent>,
    events_tx: mpsc::UnboundedSender<SupervisorEvent>,
    state_tx: watch::Sender<RunState>,
}

impl<B: ProcessBackend> fmt::Debug for Supervisor<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Supervisor")
            .field("machine", &self.machine)
            .finish_non_exhaustive()
    }
}

impl<B: ProcessBackend> Supervisor<B> {
    /// Build a supervisor around `backend`.
    ///
    /// `process_rx` must receive the events that `backend` reports.
    pub fn new(
        backend: B,
        process_rx: mpsc::Receiver<ProcessEvent>,
    ) -> (Self, SupervisorHandle, mpsc::UnboundedReceiver<SupervisorEvent>) {
        let (command_tx, commands) = mpsc::channel(COMMAND_CAPACITY);
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(RunState::Idle);

        let supervisor = Self {
            machine: RunStateMachine::new(),
            backend,
            commands,
            process_rx,
            events_tx,
            state_tx,
        };
        let handle = SupervisorHandle {
            commands: command_tx,
            state: state_rx,
        };
        (supervisor, handle, events_rx)
    }

    /// Main loop. Returns once every [`SupervisorHandle`] has been dropped,
    /// killing a process that is still running.
    pub async fn run(mut self) {
        info!("supervisor started");

        loop {
            tokio::select! {
                biased;

                command = self.commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => {
                        info!("all supervisor handles dropped; exiting");
                        if let Some((run_id, _)) = self.machine.cancel() {
                            self.backend.kill(run_id);
                        }
                        break;
                    }
                },

                Some(event) = self.process_rx.recv() => self.handle_process_event(event),
            }
        }

        info!("supervisor exiting");
    }

    fn handle_command(&mut self, command: SupervisorCommand) {
        match command {
            SupervisorCommand::Start { request, reply } => {
                let result = self.start(request);
                let _ = reply.send(result);
            }
            SupervisorCommand::Cancel { reply } => {
                let _ = reply.send(self.cancel());
            }
            SupervisorCommand::Reset { reply } => {
                let result = self.machine.reset().map(|events| self.publish(events));
                let _ = reply.send(result);
            }
            SupervisorCommand::Snapshot { reply } => {
                let _ = reply.send(self.machine.snapshot());
            }
        }
    }

    fn start(&mut self, request: LaunchRequest) -> Result<RunId> {
        let (run_id, events) = self.machine.begin(request.argv())?;
        self.publish(events);

        match self.backend.launch(run_id, &request) {
            Ok(pid) => {
                info!(task = %request.task, run_id, ?pid, "process started");
                self.machine.attach_pid(run_id, pid);
            }
            Err(err) => {
                // Launch failures are reported through the state, not the
                // reply: the run was accepted.
                error!(task = %request.task, run_id, error = %err, "launch failed");
                let events = self.machine.on_failure(run_id, err.to_string());
                self.publish(events);
            }
        }
        Ok(run_id)
    }

    fn cancel(&mut self) -> bool {
        match self.machine.cancel() {
            Some((run_id, events)) => {
                info!(run_id, "cancelling running process");
                self.backend.kill(run_id);
                self.publish(events);
                true
            }
            None => {
                debug!("cancel requested with nothing running");
                false
            }
        }
    }

    fn handle_process_event(&mut self, event: ProcessEvent) {
        let run_id = event.run_id();
        let failed = matches!(event, ProcessEvent::Failed { .. });
        if let ProcessEvent::Exited { code, .. } = &event {
            info!(run_id, exit_code = code, "process exited");
        }

        let events = self.machine.apply(event);
        if failed && !events.is_empty() {
            warn!(run_id, "process stream failed; killing process");
            self.backend.kill(run_id);
        }
        self.publish(events);
    }

    fn publish(&mut self, events: Vec<SupervisorEvent>) {
        for event in events {
            if let SupervisorEvent::StateChanged(state) = &event {
                debug!(%state, "state changed");
                self.state_tx.send_replace(state.clone());
            }
            // A caller that dropped the receiver only polls snapshots.
            let _ = self.events_tx.send(event);
        }
    }
}

/// Cheap, cloneable client for a running [`Supervisor`].
#[derive(Debug, Clone)]
pub struct SupervisorHandle {
    commands: mpsc::Sender<SupervisorCommand>,
    state: watch::Receiver<RunState>,
}

impl SupervisorHandle {
    /// Launch a process. Returns once it has been spawned (or its launch
    /// failed and the state moved to `Errored`), never when it finishes.
    pub async fn start(&self, request: LaunchRequest) -> Result<RunId> {
        let (reply, rx) = oneshot::channel();
        self.send(SupervisorCommand::Start { request, reply }).await?;
        rx.await.map_err(|_| ScriptrunError::SupervisorClosed)?
    }

    /// Hard-kill the running process. Returns `false` when nothing was
    /// running.
    pub async fn cancel(&self) -> Result<bool> {
        let (reply, rx) = oneshot::channel();
        self.send(SupervisorCommand::Cancel { reply }).await?;
        rx.await.map_err(|_| ScriptrunError::SupervisorClosed)
    }

    pub async fn reset(&self) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.send(SupervisorCommand::Reset { reply }).await?;
        rx.await.map_err(|_| ScriptrunError::SupervisorClosed)?
    }

    pub async fn snapshot(&self) -> Result<ProcessSnapshot> {
        let (reply, rx) = oneshot::channel();
        self.send(SupervisorCommand::Snapshot { reply }).await?;
        rx.await.map_err(|_| ScriptrunError::SupervisorClosed)
    }

    /// Latest published state.
    pub fn state(&self) -> RunState {
        self.state.borrow().clone()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<RunState> {
        self.state.clone()
    }

    /// Wait until the state is terminal. Returns immediately when it
    /// already is.
    pub async fn wait_terminal(&self) -> Result<RunState> {
        let mut rx = self.state.clone();
        let state = rx
            .wait_for(RunState::is_terminal)
            .await
            .map_err(|_| ScriptrunError::SupervisorClosed)?;
        Ok(state.clone())
    }

    async fn send(&self, command: SupervisorCommand) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| ScriptrunError::SupervisorClosed)
    }
}

/// Spawn a supervisor for `backend` on the current Tokio runtime.
pub fn spawn_supervisor<B>(
    backend: B,
    process_rx: mpsc::Receiver<ProcessEvent>,
) -> (SupervisorHandle, mpsc::UnboundedReceiver<SupervisorEvent>)
where
    B: ProcessBackend + 'static,
{
    let (supervisor, handle, events) = Supervisor::new(backend, process_rx);
    tokio::spawn(supervisor.run());
    (handle, events)
}

/// Spawn a supervisor that runs real OS processes.
pub fn spawn_process_supervisor() -> (SupervisorHandle, mpsc::UnboundedReceiver<SupervisorEvent>) {
    let (process_tx, process_rx) = mpsc::channel(PROCESS_EVENT_CAPACITY);
    spawn_supervisor(RealProcessBackend::new(process_tx), process_rx)
}
