// src/task.rs

//! Task descriptors and launch preparation.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::errors::{Result, ScriptrunError};
use crate::schema::{FormModel, FormSchema};
use crate::types::{InputArgStyle, InputKind};

/// Static description of one launchable task.
///
/// Immutable once built. The schema is shared with every [`FormModel`]
/// created through [`TaskDescriptor::form`], which is how a launch request
/// can tell whether a form really belongs to this task.
#[derive(Debug, Clone)]
pub struct TaskDescriptor {
    name: String,
    program: PathBuf,
    interpreter: Option<PathBuf>,
    input_style: InputArgStyle,
    input_kind: InputKind,
    input_label: Option<String>,
    description: Option<String>,
    schema: Arc<FormSchema>,
    extra_args: Vec<String>,
    working_dir: Option<PathBuf>,
}

impl TaskDescriptor {
    pub fn new(name: impl Into<String>, program: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            interpreter: None,
            input_style: InputArgStyle::default(),
            input_kind: InputKind::default(),
            input_label: None,
            description: None,
            schema: Arc::new(FormSchema::default()),
            extra_args: Vec::new(),
            working_dir: None,
        }
    }

    pub fn with_interpreter(mut self, interpreter: Option<PathBuf>) -> Self {
        self.interpreter = interpreter;
        self
    }

    pub fn with_input_style(mut self, style: InputArgStyle) -> Self {
        self.input_style = style;
        self
    }

    pub fn with_input_kind(mut self, kind: InputKind) -> Self {
        self.input_kind = kind;
        self
    }

    pub fn with_input_label(mut self, label: Option<String>) -> Self {
        self.input_label = label.filter(|l| !l.trim().is_empty());
        self
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    pub fn with_schema(mut self, schema: FormSchema) -> Self {
        self.schema = Arc::new(schema);
        self
    }

    pub fn with_extra_args(mut self, extra_args: Vec<String>) -> Self {
        self.extra_args = extra_args;
        self
    }

    pub fn with_working_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.working_dir = dir;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn interpreter(&self) -> Option<&Path> {
        self.interpreter.as_deref()
    }

    pub fn input_style(&self) -> &InputArgStyle {
        &self.input_style
    }

    pub fn input_kind(&self) -> InputKind {
        self.input_kind
    }

    /// Label of the primary input, used in its "required" violation.
    pub fn input_label(&self) -> &str {
        self.input_label
            .as_deref()
            .unwrap_or_else(|| self.input_kind.default_label())
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn schema(&self) -> &Arc<FormSchema> {
        &self.schema
    }

    pub fn extra_args(&self) -> &[String] {
        &self.extra_args
    }

    pub fn working_dir(&self) -> Option<&Path> {
        self.working_dir.as_deref()
    }

    /// A fresh form with every field at its default.
    pub fn form(&self) -> FormModel {
        FormModel::new(Arc::clone(&self.schema))
    }

    /// Full command line, program first:
    /// `[interpreter] program [input-flag] input field-args... extra-args...`.
    ///
    /// No validation happens here; see [`TaskDescriptor::launch_request`].
    pub fn command_line(&self, input: &str, form: &FormModel) -> Vec<String> {
        let mut argv = Vec::new();
        if let Some(interpreter) = &self.interpreter {
            argv.push(interpreter.to_string_lossy().into_owned());
        }
        argv.push(self.program.to_string_lossy().into_owned());
        if let InputArgStyle::Flag(flag) = &self.input_style {
            argv.push(flag.clone());
        }
        argv.push(input.trim().to_string());
        argv.extend(form.build_arguments());
        argv.extend(self.extra_args.iter().cloned());
        argv
    }

    /// Validate the primary input and `form`, then build the request the
    /// supervisor launches.
    ///
    /// Every violation is collected, the missing primary input first, and
    /// returned together as [`ScriptrunError::Validation`].
    pub fn launch_request(&self, input: &str, form: &FormModel) -> Result<LaunchRequest> {
        if !form.is_bound_to(&self.schema) {
            return Err(ScriptrunError::ConfigError(format!(
                "form does not belong to task '{}'",
                self.name
            )));
        }

        let mut violations = Vec::new();
        if input.trim().is_empty() {
            violations.push(format!("'{}' is required.", self.input_label()));
        }
        violations.extend(form.validate());
        if !violations.is_empty() {
            debug!(task = %self.name, ?violations, "launch rejected");
            return Err(ScriptrunError::Validation(violations));
        }

        if has_directory_part(&self.program) && !self.program.exists() {
            warn!(
                task = %self.name,
                program = %self.program.display(),
                "script not found; launching anyway"
            );
        }

        let mut argv = self.command_line(input, form).into_iter();
        let program = argv.next().map(PathBuf::from).unwrap_or_default();
        Ok(LaunchRequest {
            task: self.name.clone(),
            program,
            args: argv.collect(),
            working_dir: self.working_dir.clone(),
        })
    }
}

/// Bare names like `sh` are looked up on `PATH` by the OS, so only paths
/// can be checked up front.
fn has_directory_part(path: &Path) -> bool {
    path.is_absolute() || path.components().count() > 1
}

/// Everything needed to spawn one process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchRequest {
    /// Name of the task, for logging.
    pub task: String,
    pub program: PathBuf,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
}

impl LaunchRequest {
    pub fn new(task: impl Into<String>, program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            task: task.into(),
            program: program.into(),
            args,
            working_dir: None,
        }
    }

    /// Program followed by its arguments.
    pub fn argv(&self) -> Vec<String> {
        std::iter::once(self.program.to_string_lossy().into_owned())
            .chain(self.args.iter().cloned())
            .collect()
    }
}
