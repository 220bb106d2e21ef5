// src/config/validate.rs

use std::collections::HashSet;

use crate::config::model::{ConfigFile, DefaultsSection, FieldType, RawConfigFile, RawFieldConfig, RawTaskConfig};
use crate::errors::{Result, ScriptrunError};
use crate::schema::{
    ChoiceConstraints, FieldKind, FieldSpec, FormSchema, IntegerConstraints, PathConstraints,
    RealConstraints, TextConstraints,
};
use crate::task::TaskDescriptor;
use crate::types::FileDialogMode;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = ScriptrunError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_config(&raw)?;
        let tasks = raw
            .task
            .iter()
            .map(|task| build_task(task, &raw.defaults))
            .collect::<Result<Vec<_>>>()?;
        Ok(ConfigFile::new_unchecked(tasks))
    }
}

/// Checks that do not depend on field types: task presence, names and
/// programs.
pub fn validate_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_tasks(cfg)?;
    validate_task_names(cfg)?;
    validate_programs(cfg)?;
    Ok(())
}

fn ensure_has_tasks(cfg: &RawConfigFile) -> Result<()> {
    if cfg.task.is_empty() {
        return Err(ScriptrunError::ConfigError(
            "config must contain at least one [[task]] entry".to_string(),
        ));
    }
    Ok(())
}

fn validate_task_names(cfg: &RawConfigFile) -> Result<()> {
    let mut seen = HashSet::new();
    for (index, task) in cfg.task.iter().enumerate() {
        let name = task.name.trim();
        if name.is_empty() {
            return Err(ScriptrunError::ConfigError(format!(
                "task #{} has an empty name",
                index + 1
            )));
        }
        if !seen.insert(name) {
            return Err(ScriptrunError::ConfigError(format!(
                "task '{name}' is defined more than once"
            )));
        }
    }
    Ok(())
}

fn validate_programs(cfg: &RawConfigFile) -> Result<()> {
    for task in &cfg.task {
        if task.program.trim().is_empty() {
            return Err(ScriptrunError::ConfigError(format!(
                "task '{}' has an empty program",
                task.name
            )));
        }
    }
    Ok(())
}

fn build_task(raw: &RawTaskConfig, defaults: &DefaultsSection) -> Result<TaskDescriptor> {
    let fields = raw
        .fields
        .iter()
        .map(build_field)
        .collect::<Result<Vec<_>>>()
        .map_err(|err| in_task(&raw.name, err))?;
    let schema = FormSchema::new(fields).map_err(|err| in_task(&raw.name, err.into()))?;

    let task = TaskDescriptor::new(raw.name.trim(), raw.program.trim())
        .with_interpreter(raw.effective_interpreter(defaults).map(Into::into))
        .with_input_style(raw.input_arg.clone().unwrap_or_default())
        .with_input_kind(raw.input_kind)
        .with_input_label(raw.input_label.clone())
        .with_description(raw.description.clone())
        .with_schema(schema)
        .with_extra_args(raw.effective_extra_args(defaults))
        .with_working_dir(raw.working_dir.as_ref().map(Into::into));
    Ok(task)
}

fn in_task(task: &str, err: ScriptrunError) -> ScriptrunError {
    ScriptrunError::ConfigError(format!("task '{task}': {err}"))
}

fn build_field(raw: &RawFieldConfig) -> Result<FieldSpec> {
    let name = if raw.label.trim().is_empty() { &raw.key } else { &raw.label };
    let kind = match raw.kind {
        FieldType::Text => FieldKind::Text(TextConstraints {
            placeholder: raw.placeholder.clone(),
            default: opt(&raw.default, name, "default", as_text)?,
        }),
        FieldType::Int => {
            let base = IntegerConstraints::default();
            FieldKind::Integer(IntegerConstraints {
                min: opt(&raw.min, name, "min", as_integer)?.unwrap_or(base.min),
                max: opt(&raw.max, name, "max", as_integer)?.unwrap_or(base.max),
                step: opt(&raw.step, name, "step", as_integer)?.unwrap_or(base.step),
                default: opt(&raw.default, name, "default", as_integer)?,
            })
        }
        FieldType::Float => {
            let base = RealConstraints::default();
            FieldKind::Real(RealConstraints {
                min: opt(&raw.min, name, "min", as_real)?.unwrap_or(base.min),
                max: opt(&raw.max, name, "max", as_real)?.unwrap_or(base.max),
                step: opt(&raw.step, name, "step", as_real)?.unwrap_or(base.step),
                decimals: raw.decimals.unwrap_or(base.decimals),
                default: opt(&raw.default, name, "default", as_real)?,
            })
        }
        FieldType::Select => FieldKind::Choice(ChoiceConstraints {
            options: raw.options.clone(),
            default: opt(&raw.default, name, "default", as_text)?,
        }),
        FieldType::Checkbox => FieldKind::Boolean {
            default: opt(&raw.default, name, "default", as_bool)?.unwrap_or(false),
        },
        FieldType::FileOpen | FieldType::FileSave => FieldKind::FilePath(PathConstraints {
            mode: if raw.kind == FieldType::FileSave {
                FileDialogMode::Save
            } else {
                FileDialogMode::Open
            },
            filter: raw.filter.clone(),
            dialog_title: raw.dialog_title.clone(),
            default: opt(&raw.default, name, "default", as_text)?,
        }),
    };

    Ok(FieldSpec::new(raw.key.clone(), raw.label.clone(), raw.required, kind)?)
}

/// Convert an optional untyped TOML value, naming the field and attribute
/// in the error.
fn opt<T>(
    value: &Option<toml::Value>,
    field: &str,
    attr: &str,
    convert: fn(&toml::Value) -> Option<T>,
) -> Result<Option<T>> {
    match value {
        None => Ok(None),
        Some(v) => convert(v).map(Some).ok_or_else(|| {
            ScriptrunError::ConfigError(format!(
                "field '{field}': invalid {attr} {v} for this field type"
            ))
        }),
    }
}

fn as_text(value: &toml::Value) -> Option<String> {
    match value {
        toml::Value::String(s) => Some(s.clone()),
        toml::Value::Integer(i) => Some(i.to_string()),
        toml::Value::Float(f) => Some(f.to_string()),
        _ => None,
    }
}

/// Whole numbers, or finite floats truncated toward zero.
fn as_integer(value: &toml::Value) -> Option<i64> {
    match value {
        toml::Value::Integer(i) => Some(*i),
        toml::Value::Float(f) if f.is_finite() => Some(f.trunc() as i64),
        _ => None,
    }
}

fn as_real(value: &toml::Value) -> Option<f64> {
    match value {
        toml::Value::Integer(i) => Some(*i as f64),
        toml::Value::Float(f) => Some(*f),
        _ => None,
    }
}

fn as_bool(value: &toml::Value) -> Option<bool> {
    value.as_bool()
}
