// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod progress;
pub mod schema;
pub mod session;
pub mod task;
pub mod types;

use anyhow::{Context, Result, anyhow};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::cli::{CliArgs, parse_assignment};
use crate::config::loader::load_and_validate;
use crate::config::model::ConfigFile;
use crate::engine::{RunState, SupervisorEvent, spawn_process_supervisor};
use crate::schema::FieldKind;
use crate::session::Session;

/// Exit status reported when the run was cancelled (as for SIGINT).
pub const EXIT_CANCELLED: i32 = 130;

/// High-level entry point used by `main.rs`. Returns the process exit code.
///
/// This wires together:
/// - config loading
/// - task selection and field assignments from the command line
/// - the process supervisor
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<i32> {
    let cfg = load_and_validate(&args.config)
        .with_context(|| format!("loading config '{}'", args.config))?;

    if args.list {
        print_task_list(&cfg);
        return Ok(0);
    }

    let (supervisor, events) = spawn_process_supervisor();
    let mut session = Session::new(cfg.into_tasks(), supervisor);

    if let Some(name) = &args.task {
        session.select_task(name)?;
    }
    if let Some(input) = &args.input {
        session.set_primary_input(input.as_str());
    }
    for assignment in &args.set {
        let (key, value) = parse_assignment(assignment)
            .ok_or_else(|| anyhow!("invalid --set '{assignment}': expected KEY=VALUE"))?;
        session
            .set_value(key, value)
            .with_context(|| format!("setting field '{key}'"))?;
    }

    if args.dry_run {
        let request = session.prepare()?;
        println!("{}", shell_words(&request.argv()));
        debug!("dry-run complete (no execution)");
        return Ok(0);
    }

    // Ctrl-C → cancel the running task.
    {
        let supervisor = session.supervisor().clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for Ctrl+C");
                return;
            }
            info!("Ctrl+C received; cancelling");
            let _ = supervisor.cancel().await;
        });
    }

    session.run().await?;
    let state = follow_run(events).await?;
    Ok(exit_code(&state))
}

/// Print output lines to stdout until the run reaches a terminal state.
async fn follow_run(mut events: mpsc::UnboundedReceiver<SupervisorEvent>) -> Result<RunState> {
    while let Some(event) = events.recv().await {
        match event {
            SupervisorEvent::OutputLine(line) => println!("{line}"),
            SupervisorEvent::Progress(percent) => info!(percent, "progress"),
            SupervisorEvent::StateChanged(state) => {
                info!(%state, "state changed");
                if state.is_terminal() {
                    return Ok(state);
                }
            }
        }
    }
    Err(anyhow!("supervisor stopped before the task finished"))
}

/// `Finished(c)` → `c`, `Cancelled` → 130, anything else → 1.
pub fn exit_code(state: &RunState) -> i32 {
    match state {
        RunState::Finished(code) => *code,
        RunState::Cancelled => EXIT_CANCELLED,
        _ => 1,
    }
}

/// Join arguments for display, quoting the ones a shell would split.
fn shell_words(argv: &[String]) -> String {
    argv.iter()
        .map(|arg| {
            if arg.is_empty() || arg.chars().any(|c| c.is_whitespace() || c == '"' || c == '\'') {
                format!("{arg:?}")
            } else {
                arg.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn print_task_list(cfg: &ConfigFile) {
    println!("tasks ({}):", cfg.tasks().len());
    for task in cfg.tasks() {
        println!("  - {}", task.name());
        if let Some(description) = task.description() {
            println!("      {description}");
        }
        match task.interpreter() {
            Some(interpreter) => println!(
                "      program: {} {}",
                interpreter.display(),
                task.program().display()
            ),
            None => println!("      program: {}", task.program().display()),
        }
        println!("      {}: {}", task.input_label(), task.input_style());
        for field in task.schema().fields() {
            let required = if field.required() { ", required" } else { "" };
            let key = if field.key().is_empty() { "(no flag)" } else { field.key() };
            let options = match field.kind() {
                FieldKind::Choice(c) => format!(" [{}]", c.options.join("|")),
                _ => String::new(),
            };
            println!(
                "      {key}  '{}' ({}{required}){options}",
                field.label(),
                field.kind().name()
            );
        }
        if !task.extra_args().is_empty() {
            println!("      extra args: {}", shell_words(task.extra_args()));
        }
    }
}
