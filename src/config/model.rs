// src/config/model.rs

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::errors::{Result, ScriptrunError};
use crate::task::TaskDescriptor;
use crate::types::{InputArgStyle, InputKind};

/// Configuration exactly as read from a TOML file.
///
/// ```toml
/// [defaults]
/// interpreter = "python3"
/// extra_args = ["--mode", "gui"]
///
/// [[task]]
/// name = "Add numbers"
/// program = "add_numbers.py"
/// input_arg = "--log"
///
/// [[task.field]]
/// key = "--a"
/// label = "first number"
/// type = "int"
/// required = true
/// ```
///
/// Tasks are an array so their order (the order a task list is shown in)
/// is the order in the file.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub defaults: DefaultsSection,

    #[serde(default)]
    pub task: Vec<RawTaskConfig>,
}

/// `[defaults]` section, inherited by every task that does not override it.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct DefaultsSection {
    /// Program that runs every task's `program`, e.g. `python3`.
    #[serde(default)]
    pub interpreter: Option<String>,

    /// Arguments appended after the field arguments.
    #[serde(default)]
    pub extra_args: Vec<String>,
}

/// One `[[task]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct RawTaskConfig {
    pub name: String,

    /// Script or executable. Relative paths are relative to the config file.
    pub program: String,

    #[serde(default)]
    pub description: Option<String>,

    /// `"positional"` or the flag that precedes the input path.
    /// Defaults to `--log`.
    #[serde(default)]
    pub input_arg: Option<InputArgStyle>,

    #[serde(default)]
    pub input_kind: InputKind,

    #[serde(default)]
    pub input_label: Option<String>,

    /// Overrides `defaults.interpreter`; an empty string disables it.
    #[serde(default)]
    pub interpreter: Option<String>,

    /// Replaces `defaults.extra_args` when present.
    #[serde(default)]
    pub extra_args: Option<Vec<String>>,

    #[serde(default)]
    pub working_dir: Option<String>,

    #[serde(default, rename = "field")]
    pub fields: Vec<RawFieldConfig>,
}

impl RawTaskConfig {
    /// Interpreter after applying `[defaults]`.
    pub fn effective_interpreter(&self, defaults: &DefaultsSection) -> Option<String> {
        self.interpreter
            .as_ref()
            .or(defaults.interpreter.as_ref())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    pub fn effective_extra_args(&self, defaults: &DefaultsSection) -> Vec<String> {
        self.extra_args
            .clone()
            .unwrap_or_else(|| defaults.extra_args.clone())
    }
}

/// Field type names accepted in `[[task.field]]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    #[serde(alias = "string")]
    Text,
    #[serde(alias = "integer")]
    Int,
    #[serde(alias = "real")]
    Float,
    #[serde(alias = "choice")]
    Select,
    #[serde(alias = "bool", alias = "boolean")]
    Checkbox,
    #[serde(alias = "file", alias = "path")]
    FileOpen,
    FileSave,
}

/// One `[[task.field]]` entry.
///
/// `default`, `min`, `max` and `step` stay untyped here; their meaning
/// depends on `type` and is checked during validation.
#[derive(Debug, Clone, Deserialize)]
pub struct RawFieldConfig {
    #[serde(default)]
    pub key: String,

    #[serde(default)]
    pub label: String,

    #[serde(rename = "type")]
    pub kind: FieldType,

    #[serde(default)]
    pub required: bool,

    #[serde(default)]
    pub default: Option<toml::Value>,

    #[serde(default)]
    pub min: Option<toml::Value>,

    #[serde(default)]
    pub max: Option<toml::Value>,

    #[serde(default)]
    pub step: Option<toml::Value>,

    #[serde(default)]
    pub options: Vec<String>,

    #[serde(default)]
    pub placeholder: Option<String>,

    #[serde(default)]
    pub decimals: Option<u8>,

    #[serde(default)]
    pub filter: Option<String>,

    #[serde(default)]
    pub dialog_title: Option<String>,
}

impl RawConfigFile {
    /// Make relative paths relative to `base` (the config file's directory).
    ///
    /// A bare program name without an interpreter is left alone unless a
    /// file of that name exists in `base`, so `program = "sh"` still goes
    /// through `PATH`.
    pub fn resolve_paths(&mut self, base: &Path) {
        for task in &mut self.task {
            let scripted = task.effective_interpreter(&self.defaults).is_some();
            let program = Path::new(task.program.trim());
            let candidate = base.join(program);
            if program.is_relative()
                && !program.as_os_str().is_empty()
                && (scripted || program.components().count() > 1 || candidate.exists())
            {
                task.program = candidate.to_string_lossy().into_owned();
            }

            let resolved = task
                .working_dir
                .as_deref()
                .map(Path::new)
                .filter(|dir| dir.is_relative())
                .map(|dir| base.join(dir).to_string_lossy().into_owned());
            if resolved.is_some() {
                task.working_dir = resolved;
            }
        }
    }
}

/// Validated configuration: the task list, in file order.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    tasks: Vec<TaskDescriptor>,
}

impl ConfigFile {
    /// Build from descriptors that have already been validated.
    pub(crate) fn new_unchecked(tasks: Vec<TaskDescriptor>) -> Self {
        Self { tasks }
    }

    pub fn tasks(&self) -> &[TaskDescriptor] {
        &self.tasks
    }

    pub fn task(&self, name: &str) -> Result<&TaskDescriptor> {
        self.tasks
            .iter()
            .find(|t| t.name() == name)
            .ok_or_else(|| ScriptrunError::TaskNotFound(name.to_string()))
    }

    pub fn task_names(&self) -> impl Iterator<Item = &str> {
        self.tasks.iter().map(|t| t.name())
    }

    pub fn into_tasks(self) -> Vec<TaskDescriptor> {
        self.tasks
    }
}

/// Directory relative paths in a config file are resolved against.
///
/// A bare file name like `Scriptrun.toml` has an empty parent, in which
/// case the current working directory is used.
pub fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}
