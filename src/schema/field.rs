// src/schema/field.rs

//! Declarative field descriptions.
//!
//! A [`FieldSpec`] is a tagged variant: each [`FieldKind`] carries only the
//! constraints that make sense for it, and [`FieldSpec::new`] rejects
//! ill-formed combinations up front (inverted ranges, defaults outside the
//! range or option set, ...). Everything downstream can therefore trust the
//! constraints it reads.

use std::collections::HashSet;

use thiserror::Error;

use crate::types::FileDialogMode;

pub const DEFAULT_INTEGER_MIN: i64 = -1_000_000_000;
pub const DEFAULT_INTEGER_MAX: i64 = 1_000_000_000;
pub const DEFAULT_REAL_MIN: f64 = -1e9;
pub const DEFAULT_REAL_MAX: f64 = 1e9;
pub const DEFAULT_REAL_STEP: f64 = 0.1;
pub const DEFAULT_REAL_DECIMALS: u8 = 6;
const MAX_REAL_DECIMALS: u8 = 15;

/// Reasons a field description is rejected at construction time.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("field needs a key or a label")]
    MissingLabel,

    #[error("'{label}': min ({min}) is greater than max ({max})")]
    InvertedRange { label: String, min: String, max: String },

    #[error("'{label}': bounds must be finite numbers")]
    NonFiniteBound { label: String },

    #[error("'{label}': step must be greater than zero")]
    InvalidStep { label: String },

    #[error("'{label}': decimals must be at most {max}")]
    InvalidDecimals { label: String, max: u8 },

    #[error("'{label}': default {value} is outside [{min}, {max}]")]
    DefaultOutOfRange {
        label: String,
        value: String,
        min: String,
        max: String,
    },

    #[error("'{label}': option list is empty")]
    EmptyOptions { label: String },

    #[error("'{label}': option '{option}' is listed twice")]
    DuplicateOption { label: String, option: String },

    #[error("'{label}': default '{value}' is not one of the options")]
    DefaultNotAnOption { label: String, value: String },

    #[error("duplicate field key '{0}'")]
    DuplicateKey(String),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TextConstraints {
    pub placeholder: Option<String>,
    pub default: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IntegerConstraints {
    pub min: i64,
    pub max: i64,
    pub step: i64,
    pub default: Option<i64>,
}

impl Default for IntegerConstraints {
    fn default() -> Self {
        Self {
            min: DEFAULT_INTEGER_MIN,
            max: DEFAULT_INTEGER_MAX,
            step: 1,
            default: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RealConstraints {
    pub min: f64,
    pub max: f64,
    pub step: f64,
    /// Digits after the decimal point used when the value is put on the
    /// command line.
    pub decimals: u8,
    pub default: Option<f64>,
}

impl Default for RealConstraints {
    fn default() -> Self {
        Self {
            min: DEFAULT_REAL_MIN,
            max: DEFAULT_REAL_MAX,
            step: DEFAULT_REAL_STEP,
            decimals: DEFAULT_REAL_DECIMALS,
            default: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChoiceConstraints {
    pub options: Vec<String>,
    pub default: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PathConstraints {
    pub mode: FileDialogMode,
    /// Dialog name filter, e.g. `"Log/Text (*.log *.txt);;All Files (*)"`.
    pub filter: Option<String>,
    pub dialog_title: Option<String>,
    pub default: Option<String>,
}

/// The kind of a field together with its kind-specific constraints.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    Text(TextConstraints),
    Integer(IntegerConstraints),
    Real(RealConstraints),
    Choice(ChoiceConstraints),
    Boolean { default: bool },
    FilePath(PathConstraints),
}

impl FieldKind {
    pub fn name(&self) -> &'static str {
        match self {
            FieldKind::Text(_) => "text",
            FieldKind::Integer(_) => "integer",
            FieldKind::Real(_) => "real",
            FieldKind::Choice(_) => "choice",
            FieldKind::Boolean { .. } => "boolean",
            FieldKind::FilePath(_) => "file path",
        }
    }

    fn check(&self, label: &str) -> Result<(), SchemaError> {
        match self {
            FieldKind::Text(_) | FieldKind::Boolean { .. } | FieldKind::FilePath(_) => Ok(()),
            FieldKind::Integer(c) => {
                if c.min > c.max {
                    return Err(SchemaError::InvertedRange {
                        label: label.to_string(),
                        min: c.min.to_string(),
                        max: c.max.to_string(),
                    });
                }
                if c.step <= 0 {
                    return Err(SchemaError::InvalidStep {
                        label: label.to_string(),
                    });
                }
                match c.default {
                    Some(d) if d < c.min || d > c.max => Err(SchemaError::DefaultOutOfRange {
                        label: label.to_string(),
                        value: d.to_string(),
                        min: c.min.to_string(),
                        max: c.max.to_string(),
                    }),
                    _ => Ok(()),
                }
            }
            FieldKind::Real(c) => {
                if !c.min.is_finite() || !c.max.is_finite() {
                    return Err(SchemaError::NonFiniteBound {
                        label: label.to_string(),
                    });
                }
                if c.min > c.max {
                    return Err(SchemaError::InvertedRange {
                        label: label.to_string(),
                        min: c.min.to_string(),
                        max: c.max.to_string(),
                    });
                }
                if !(c.step > 0.0 && c.step.is_finite()) {
                    return Err(SchemaError::InvalidStep {
                        label: label.to_string(),
                    });
                }
                if c.decimals > MAX_REAL_DECIMALS {
                    return Err(SchemaError::InvalidDecimals {
                        label: label.to_string(),
                        max: MAX_REAL_DECIMALS,
                    });
                }
                match c.default {
                    Some(d) if !d.is_finite() || d < c.min || d > c.max => {
                        Err(SchemaError::DefaultOutOfRange {
                            label: label.to_string(),
                            value: d.to_string(),
                            min: c.min.to_string(),
                            max: c.max.to_string(),
                        })
                    }
                    _ => Ok(()),
                }
            }
            FieldKind::Choice(c) => {
                if c.options.is_empty() {
                    return Err(SchemaError::EmptyOptions {
                        label: label.to_string(),
                    });
                }
                let mut seen = HashSet::new();
                for option in &c.options {
                    if !seen.insert(option.as_str()) {
                        return Err(SchemaError::DuplicateOption {
                            label: label.to_string(),
                            option: option.clone(),
                        });
                    }
                }
                match &c.default {
                    Some(d) if !c.options.contains(d) => Err(SchemaError::DefaultNotAnOption {
                        label: label.to_string(),
                        value: d.clone(),
                    }),
                    _ => Ok(()),
                }
            }
        }
    }
}

/// One declared task parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    key: String,
    label: String,
    required: bool,
    kind: FieldKind,
}

impl FieldSpec {
    /// Build a field, checking the kind's constraints.
    ///
    /// An empty `label` falls back to the key; a field with neither is
    /// rejected because violations could not name it.
    pub fn new(
        key: impl Into<String>,
        label: impl Into<String>,
        required: bool,
        kind: FieldKind,
    ) -> Result<Self, SchemaError> {
        let key = key.into().trim().to_string();
        let mut label = label.into().trim().to_string();
        if label.is_empty() {
            label = key.clone();
        }
        if label.is_empty() {
            return Err(SchemaError::MissingLabel);
        }
        kind.check(&label)?;
        Ok(Self {
            key,
            label,
            required,
            kind,
        })
    }

    /// Command-line flag; empty when the field is not passed as a flag.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn required(&self) -> bool {
        self.required
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    /// Whether `name` addresses this field: the exact key, the key without
    /// its leading dashes, or the label.
    pub fn answers_to(&self, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() {
            return false;
        }
        if !self.key.is_empty()
            && (self.key == name || self.key.trim_start_matches('-') == name.trim_start_matches('-'))
        {
            return true;
        }
        self.label == name
    }
}

/// Ordered, immutable list of fields. Order is both display order and
/// argument emission order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FormSchema {
    fields: Vec<FieldSpec>,
}

impl FormSchema {
    /// Build a schema; non-empty keys must be unique.
    pub fn new(fields: Vec<FieldSpec>) -> Result<Self, SchemaError> {
        let mut keys = HashSet::new();
        for field in &fields {
            if !field.key.is_empty() && !keys.insert(field.key.as_str()) {
                return Err(SchemaError::DuplicateKey(field.key.clone()));
            }
        }
        Ok(Self { fields })
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&FieldSpec> {
        self.fields.get(index)
    }

    /// Position of the field `name` answers to, see [`FieldSpec::answers_to`].
    /// Exact key matches win over dash-stripped and label matches.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.fields
            .iter()
            .position(|f| !f.key.is_empty() && f.key == name.trim())
            .or_else(|| self.fields.iter().position(|f| f.answers_to(name)))
    }
}
