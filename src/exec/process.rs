// src/exec/process.rs

//! Supervision of one spawned child process.

use std::process::ExitStatus;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Child;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::engine::{OutputStream, ProcessEvent, RunId};

const CHUNK_SIZE: usize = 8 * 1024;

/// How long to wait for the pipes to close after the child exited. A
/// grandchild that inherited them can keep them open forever.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Pump the child's output and wait for it to exit or be cancelled.
///
/// stdout and stderr are read by two pumps writing into the same channel,
/// each chunk tagged with its pipe, so the supervisor can split lines per
/// stream and still merge them in arrival order. Once the child
/// exits and both pumps reached end of stream, exactly one `Exited` (or
/// `Failed`, for an abnormal termination) event is sent.
///
/// If the cancel channel fires, the child is killed and **no** terminal
/// event is sent for this run: the supervisor already moved to `Cancelled`.
pub async fn supervise_child(
    run_id: RunId,
    mut child: Child,
    events: mpsc::Sender<ProcessEvent>,
    mut cancel_rx: oneshot::Receiver<()>,
) {
    let mut pumps = JoinSet::new();
    if let Some(stdout) = child.stdout.take() {
        pumps.spawn(pump(run_id, OutputStream::Stdout, stdout, events.clone()));
    }
    if let Some(stderr) = child.stderr.take() {
        pumps.spawn(pump(run_id, OutputStream::Stderr, stderr, events.clone()));
    }

    tokio::select! {
        status = child.wait() => {
            let drained = tokio::time::timeout(DRAIN_TIMEOUT, async {
                while pumps.join_next().await.is_some() {}
            })
            .await;
            if drained.is_err() {
                warn!(run_id, "output still open after exit; dropping the rest");
                pumps.abort_all();
            }

            let event = match status {
                Ok(status) => match status.code() {
                    Some(code) => ProcessEvent::Exited { run_id, code },
                    None => ProcessEvent::Failed {
                        run_id,
                        reason: describe_abnormal_exit(status),
                    },
                },
                Err(err) => {
                    error!(run_id, error = %err, "waiting for process failed");
                    ProcessEvent::Failed {
                        run_id,
                        reason: format!("waiting for process failed: {err}"),
                    }
                }
            };

            if events.send(event).await.is_err() {
                debug!(run_id, "supervisor gone; exit not reported");
            }
        }

        cancel = &mut cancel_rx => {
            match cancel {
                Ok(()) => info!(run_id, "cancellation requested; killing process"),
                Err(_) => debug!(run_id, "backend dropped; killing process"),
            }
            if let Err(e) = child.kill().await {
                warn!(run_id, error = %e, "failed to kill child process");
            }
            pumps.abort_all();
        }
    }
}

/// Forward raw chunks from one pipe. Chunks are not line-aligned.
async fn pump<R>(
    run_id: RunId,
    stream: OutputStream,
    mut reader: R,
    events: mpsc::Sender<ProcessEvent>,
) where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                let chunk = buf[..n].to_vec();
                let event = ProcessEvent::Output { run_id, stream, chunk };
                if events.send(event).await.is_err() {
                    break;
                }
            }
            Err(err) => {
                error!(run_id, ?stream, error = %err, "reading output failed");
                let reason = format!("reading {} failed: {err}", stream_name(stream));
                let _ = events.send(ProcessEvent::Failed { run_id, reason }).await;
                break;
            }
        }
    }
    debug!(run_id, ?stream, "output stream closed");
}

fn stream_name(stream: OutputStream) -> &'static str {
    match stream {
        OutputStream::Stdout => "stdout",
        OutputStream::Stderr => "stderr",
    }
}

fn describe_abnormal_exit(status: ExitStatus) -> String {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return format!("process terminated by signal {signal}");
        }
    }
    format!("process terminated abnormally ({status})")
}
