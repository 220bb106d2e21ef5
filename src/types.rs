// src/types.rs

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// How the primary input path is handed to a task.
///
/// - `Flag(flag)`: `<flag> <path>`, e.g. `--log /tmp/run.log`.
/// - `Positional`: the bare path.
///
/// In configuration this is the `input_arg` string: `"positional"` selects
/// [`InputArgStyle::Positional`], anything else is used as the flag.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum InputArgStyle {
    Flag(String),
    Positional,
}

impl Default for InputArgStyle {
    fn default() -> Self {
        InputArgStyle::Flag("--log".to_string())
    }
}

impl FromStr for InputArgStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err("input_arg must be \"positional\" or a non-empty flag".to_string());
        }
        if s.eq_ignore_ascii_case("positional") {
            Ok(InputArgStyle::Positional)
        } else {
            Ok(InputArgStyle::Flag(s.to_string()))
        }
    }
}

impl TryFrom<String> for InputArgStyle {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for InputArgStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputArgStyle::Flag(flag) => write!(f, "{flag} <input>"),
            InputArgStyle::Positional => f.write_str("<input>"),
        }
    }
}

/// What the primary input points at. Presentation layers use this to pick
/// a file or directory chooser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    File,
    Directory,
}

impl Default for InputKind {
    fn default() -> Self {
        InputKind::File
    }
}

impl InputKind {
    pub fn default_label(self) -> &'static str {
        match self {
            InputKind::File => "Input file",
            InputKind::Directory => "Input directory",
        }
    }
}

/// Which dialog a file-path field opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileDialogMode {
    Open,
    Save,
}

impl Default for FileDialogMode {
    fn default() -> Self {
        FileDialogMode::Open
    }
}
