pub mod builders;
pub mod fake_backend;

use std::sync::Once;

use scriptrun::engine::SupervisorEvent;
use tokio::sync::mpsc;
use tracing_subscriber::{EnvFilter, fmt};

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing** tests
///   (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g.:
/// `RUST_LOG=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .init();
    });
}

/// Run a future with a 5-second timeout.
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(std::time::Duration::from_secs(5), f)
        .await
        .expect("Test timed out after 5 seconds")
}

/// Receive supervisor events up to and including the first terminal
/// `StateChanged`.
pub async fn collect_until_terminal(
    events: &mut mpsc::UnboundedReceiver<SupervisorEvent>,
) -> Vec<SupervisorEvent> {
    let mut seen = Vec::new();
    while let Some(event) = events.recv().await {
        let done = matches!(&event, SupervisorEvent::StateChanged(s) if s.is_terminal());
        seen.push(event);
        if done {
            break;
        }
    }
    seen
}

/// Only the `Progress` values, in order.
pub fn progress_values(events: &[SupervisorEvent]) -> Vec<u8> {
    events
        .iter()
        .filter_map(|e| match e {
            SupervisorEvent::Progress(p) => Some(*p),
            _ => None,
        })
        .collect()
}

/// Only the `OutputLine` texts, in order.
pub fn output_lines(events: &[SupervisorEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            SupervisorEvent::OutputLine(line) => Some(line.clone()),
            _ => None,
        })
        .collect()
}
