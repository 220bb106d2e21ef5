// src/session.rs

//! Presentation-facing façade.
//!
//! A [`Session`] holds what a launcher window holds, minus the rendering:
//! the task list, the selected task with its [`FormModel`], the primary
//! input path, and a handle to the supervisor. A GUI or the CLI drive the
//! core only through it.

use tracing::{debug, info};

use crate::engine::{RunId, RunState, SupervisorHandle};
use crate::errors::{Result, ScriptrunError};
use crate::schema::FormModel;
use crate::task::{LaunchRequest, TaskDescriptor};

#[derive(Debug)]
pub struct Session {
    tasks: Vec<TaskDescriptor>,
    selected: Option<(usize, FormModel)>,
    primary_input: String,
    supervisor: SupervisorHandle,
}

impl Session {
    /// Create a session with the first task selected.
    pub fn new(tasks: Vec<TaskDescriptor>, supervisor: SupervisorHandle) -> Self {
        let selected = tasks.first().map(|t| (0, t.form()));
        Self {
            tasks,
            selected,
            primary_input: String::new(),
            supervisor,
        }
    }

    pub fn tasks(&self) -> &[TaskDescriptor] {
        &self.tasks
    }

    pub fn current_task(&self) -> Option<&TaskDescriptor> {
        self.selected.as_ref().map(|(i, _)| &self.tasks[*i])
    }

    /// Switch to another task. Its form is built fresh, so values typed for
    /// the previous task never leak into this one.
    pub fn select_task(&mut self, name: &str) -> Result<&TaskDescriptor> {
        if self.supervisor.state().is_running() {
            return Err(ScriptrunError::Busy);
        }
        let index = self
            .tasks
            .iter()
            .position(|t| t.name() == name)
            .ok_or_else(|| ScriptrunError::TaskNotFound(name.to_string()))?;

        debug!(task = %name, "task selected");
        let task = &self.tasks[index];
        self.selected = Some((index, task.form()));
        Ok(task)
    }

    pub fn primary_input(&self) -> &str {
        &self.primary_input
    }

    pub fn set_primary_input(&mut self, path: impl Into<String>) {
        self.primary_input = path.into();
    }

    pub fn form(&self) -> Option<&FormModel> {
        self.selected.as_ref().map(|(_, form)| form)
    }

    pub fn form_mut(&mut self) -> Option<&mut FormModel> {
        self.selected.as_mut().map(|(_, form)| form)
    }

    /// Set one field of the current form from text.
    pub fn set_value(&mut self, name: &str, raw: &str) -> Result<()> {
        self.selected_form_mut()?.set_value(name, raw)?;
        Ok(())
    }

    /// Paste a selection into the focused field, or the first required
    /// field, or the first field. Returns the position that was filled.
    pub fn paste(&mut self, focused: Option<usize>, text: &str) -> Result<usize> {
        Ok(self.selected_form_mut()?.paste(focused, text)?)
    }

    /// The command line a `run` would launch, without validating it.
    pub fn command_preview(&self) -> Result<Vec<String>> {
        let (task, form) = self.selected()?;
        Ok(task.command_line(&self.primary_input, form))
    }

    /// Validate and launch the current task.
    ///
    /// Violations are returned as [`ScriptrunError::Validation`] and nothing
    /// is started. A task that fails to launch is reported through the
    /// supervisor's state, not here.
    pub async fn run(&self) -> Result<RunId> {
        let request = self.prepare()?;
        info!(task = %request.task, argv = ?request.argv(), "launching task");
        self.supervisor.start(request).await
    }

    /// Validate the current task's inputs and build its launch request
    /// without starting anything.
    pub fn prepare(&self) -> Result<LaunchRequest> {
        let (task, form) = self.selected()?;
        task.launch_request(&self.primary_input, form)
    }

    pub async fn cancel(&self) -> Result<bool> {
        self.supervisor.cancel().await
    }

    pub async fn reset(&self) -> Result<()> {
        self.supervisor.reset().await
    }

    /// Stop whatever is running, return the supervisor to `Idle`, clear the
    /// primary input and rebuild the form with its defaults.
    pub async fn clear_all(&mut self) -> Result<()> {
        self.supervisor.cancel().await?;
        self.supervisor.reset().await?;

        self.primary_input.clear();
        if let Some((index, form)) = &mut self.selected {
            *form = self.tasks[*index].form();
        }
        debug!("session cleared");
        Ok(())
    }

    pub fn state(&self) -> RunState {
        self.supervisor.state()
    }

    pub fn supervisor(&self) -> &SupervisorHandle {
        &self.supervisor
    }

    fn selected(&self) -> Result<(&TaskDescriptor, &FormModel)> {
        self.selected
            .as_ref()
            .map(|(i, form)| (&self.tasks[*i], form))
            .ok_or_else(no_task_selected)
    }

    fn selected_form_mut(&mut self) -> Result<&mut FormModel> {
        self.form_mut().ok_or_else(no_task_selected)
    }
}

fn no_task_selected() -> ScriptrunError {
    ScriptrunError::ConfigError("no task selected".to_string())
}
