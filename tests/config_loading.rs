use std::error::Error;
use std::fs;
use std::path::Path;

use tempfile::TempDir;

use scriptrun::config::{load_and_validate, load_from_path};
use scriptrun::errors::ScriptrunError;
use scriptrun::schema::{FieldKind, FieldValue};
use scriptrun::types::{FileDialogMode, InputArgStyle, InputKind};

type TestResult = Result<(), Box<dyn Error>>;

fn write_config(dir: &Path, contents: &str) -> std::io::Result<std::path::PathBuf> {
    let path = dir.join("Scriptrun.toml");
    fs::write(&path, contents)?;
    Ok(path)
}

const LAUNCHER: &str = r#"
[defaults]
interpreter = "python3"
extra_args = ["--mode", "gui"]

[[task]]
name = "Add numbers"
program = "add_numbers.py"
description = "Adds two numbers and appends the result to the log"
input_arg = "--log"
input_label = "Log file"

[[task.field]]
key = "--a"
label = "first number"
type = "int"
required = true

[[task.field]]
key = "--b"
label = "second number"
type = "int"
required = true

[[task]]
name = "Batch"
program = "tools/batch.py"
input_arg = "positional"
input_kind = "directory"
working_dir = "work"

[[task.field]]
key = "--mode"
label = "Mode"
type = "select"
options = ["fast", "accurate"]
default = "fast"

[[task.field]]
key = "--ratio"
label = "Ratio"
type = "float"
min = 0
max = 1
decimals = 2

[[task.field]]
key = "--out"
label = "Output"
type = "file_save"
filter = "Text (*.txt)"

[[task.field]]
key = "--verbose"
label = "Verbose"
type = "checkbox"
default = true
"#;

#[test]
fn loads_tasks_in_file_order_with_resolved_paths() -> TestResult {
    let dir = TempDir::new()?;
    let path = write_config(dir.path(), LAUNCHER)?;

    let cfg = load_and_validate(&path)?;
    let names: Vec<_> = cfg.task_names().collect();
    assert_eq!(names, vec!["Add numbers", "Batch"]);

    let add = cfg.task("Add numbers")?;
    assert_eq!(add.program(), dir.path().join("add_numbers.py"));
    assert_eq!(add.interpreter(), Some(Path::new("python3")));
    assert_eq!(add.input_style(), &InputArgStyle::Flag("--log".into()));
    assert_eq!(add.input_label(), "Log file");
    assert_eq!(
        add.description(),
        Some("Adds two numbers and appends the result to the log")
    );
    assert_eq!(add.extra_args(), ["--mode", "gui"]);

    let batch = cfg.task("Batch")?;
    assert_eq!(batch.program(), dir.path().join("tools/batch.py"));
    assert_eq!(batch.input_style(), &InputArgStyle::Positional);
    assert_eq!(batch.input_kind(), InputKind::Directory);
    assert_eq!(batch.input_label(), "Input directory");
    assert_eq!(batch.working_dir(), Some(dir.path().join("work").as_path()));
    Ok(())
}

#[test]
fn field_types_map_to_kinds_with_defaults() -> TestResult {
    let dir = TempDir::new()?;
    let path = write_config(dir.path(), LAUNCHER)?;
    let cfg = load_and_validate(&path)?;
    let batch = cfg.task("Batch")?;

    let fields = batch.schema().fields();
    assert_eq!(fields.len(), 4);
    match fields[1].kind() {
        FieldKind::Real(c) => {
            assert_eq!((c.min, c.max, c.decimals), (0.0, 1.0, 2));
            assert_eq!(c.step, 0.1);
        }
        other => panic!("unexpected kind {other:?}"),
    }
    match fields[2].kind() {
        FieldKind::FilePath(c) => {
            assert_eq!(c.mode, FileDialogMode::Save);
            assert_eq!(c.filter.as_deref(), Some("Text (*.txt)"));
        }
        other => panic!("unexpected kind {other:?}"),
    }

    let form = batch.form();
    assert_eq!(form.value("--mode"), Some(FieldValue::Choice(Some("fast".into()))));
    assert_eq!(form.value("Verbose"), Some(FieldValue::Boolean(true)));
    assert_eq!(
        form.build_arguments(),
        vec!["--mode", "fast", "--out", "", "--verbose"]
    );
    Ok(())
}

#[test]
fn bare_program_without_interpreter_uses_path_lookup() -> TestResult {
    let dir = TempDir::new()?;
    let path = write_config(
        dir.path(),
        r#"
        [[task]]
        name = "shell"
        program = "sh"
        "#,
    )?;
    let cfg = load_and_validate(&path)?;
    assert_eq!(cfg.task("shell")?.program(), Path::new("sh"));
    assert_eq!(cfg.task("shell")?.interpreter(), None);
    Ok(())
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = TempDir::new().unwrap();
    let err = load_and_validate(dir.path().join("nope.toml")).unwrap_err();
    assert!(matches!(err, ScriptrunError::IoError(_)), "{err:?}");
}

#[test]
fn malformed_toml_is_a_toml_error() -> TestResult {
    let dir = TempDir::new()?;
    let path = write_config(dir.path(), "[[task]\nname = ")?;
    assert!(matches!(load_from_path(&path), Err(ScriptrunError::TomlError(_))));
    Ok(())
}

#[test]
fn unknown_field_type_and_empty_input_arg_are_rejected() -> TestResult {
    let dir = TempDir::new()?;
    let path = write_config(
        dir.path(),
        r#"
        [[task]]
        name = "t"
        program = "t.sh"

        [[task.field]]
        key = "--x"
        type = "slider"
        "#,
    )?;
    assert!(matches!(load_and_validate(&path), Err(ScriptrunError::TomlError(_))));

    let path = write_config(
        dir.path(),
        r#"
        [[task]]
        name = "t"
        program = "t.sh"
        input_arg = "  "
        "#,
    )?;
    assert!(matches!(load_and_validate(&path), Err(ScriptrunError::TomlError(_))));
    Ok(())
}

#[test]
fn schema_problems_are_config_errors() -> TestResult {
    let dir = TempDir::new()?;
    let cases = [
        (
            r#"
            [[task]]
            name = "dup"
            program = "t.sh"
            [[task.field]]
            key = "--a"
            type = "int"
            [[task.field]]
            key = "--a"
            type = "text"
            "#,
            "duplicate field key '--a'",
        ),
        (
            r#"
            [[task]]
            name = "opts"
            program = "t.sh"
            [[task.field]]
            key = "--m"
            type = "select"
            options = []
            "#,
            "option list is empty",
        ),
        (
            r#"
            [[task]]
            name = "nodefault"
            program = "t.sh"
            [[task.field]]
            key = "--m"
            type = "select"
            options = ["a", "b"]
            default = "c"
            "#,
            "not one of the options",
        ),
        (
            r#"
            [[task]]
            name = "noprogram"
            program = " "
            "#,
            "empty program",
        ),
    ];

    for (toml, expected) in cases {
        let path = write_config(dir.path(), toml)?;
        match load_and_validate(&path) {
            Err(ScriptrunError::ConfigError(msg)) => {
                assert!(msg.contains(expected), "{msg:?} should contain {expected:?}");
            }
            other => panic!("expected ConfigError containing {expected:?}, got {other:?}"),
        }
    }
    Ok(())
}
