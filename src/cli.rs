// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `scriptrun`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "scriptrun",
    version,
    about = "Run configured scripts with validated arguments and report their progress.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Scriptrun.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = "Scriptrun.toml")]
    pub config: String,

    /// List the configured tasks and their fields, then exit.
    #[arg(long)]
    pub list: bool,

    /// Task to run. Defaults to the first task in the config.
    #[arg(long, value_name = "NAME")]
    pub task: Option<String>,

    /// Primary input path handed to the task (its log file or folder).
    #[arg(long, value_name = "PATH")]
    pub input: Option<String>,

    /// Set a field: `--set --a=3`, `--set a=3` or `--set "first number=3"`.
    ///
    /// May be repeated. The key is matched against field keys (with or
    /// without leading dashes) and labels.
    #[arg(long = "set", value_name = "KEY=VALUE", allow_hyphen_values = true)]
    pub set: Vec<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `SCRIPTRUN_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Validate and print the command line, but don't launch anything.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Split a `--set` argument at its first `=`.
pub fn parse_assignment(raw: &str) -> Option<(&str, &str)> {
    let (key, value) = raw.split_once('=')?;
    let key = key.trim();
    (!key.is_empty()).then_some((key, value))
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_accepts_dash_prefixed_assignments() {
        let args = CliArgs::try_parse_from([
            "scriptrun",
            "--task",
            "Add numbers",
            "--set",
            "--a=3",
            "--set",
            "b=-4",
            "--dry-run",
        ])
        .unwrap();
        assert_eq!(args.set, vec!["--a=3", "b=-4"]);
        assert_eq!(args.config, "Scriptrun.toml");
        assert!(args.dry_run);
    }

    #[test]
    fn assignment_splits_at_first_equals() {
        assert_eq!(parse_assignment("--expr=a=b"), Some(("--expr", "a=b")));
        assert_eq!(parse_assignment("flag="), Some(("flag", "")));
        assert_eq!(parse_assignment("=3"), None);
        assert_eq!(parse_assignment("novalue"), None);
    }
}
