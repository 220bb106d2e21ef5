// src/schema/slot.rs

//! Bound values for form fields.
//!
//! Every field kind gets one [`ValueSlot`] implementation that knows how to
//! read, write and emptiness-check its value. The form never inspects a
//! slot's concrete type; parsing raw text (typed edits, pasted selections,
//! dropped paths) always goes through [`ValueSlot::set_raw`].

use std::fmt;

use thiserror::Error;

use super::field::{
    ChoiceConstraints, FieldKind, FieldSpec, IntegerConstraints, PathConstraints,
    RealConstraints, TextConstraints,
};

/// Current value of a field, typed by kind.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Integer(Option<i64>),
    Real(Option<f64>),
    Choice(Option<String>),
    Boolean(bool),
    Path(String),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) | FieldValue::Path(s) => f.write_str(s),
            FieldValue::Integer(Some(v)) => write!(f, "{v}"),
            FieldValue::Real(Some(v)) => write!(f, "{v}"),
            FieldValue::Choice(Some(s)) => f.write_str(s),
            FieldValue::Boolean(b) => write!(f, "{b}"),
            FieldValue::Integer(None) | FieldValue::Real(None) | FieldValue::Choice(None) => Ok(()),
        }
    }
}

/// Reasons an edit is rejected. The bound value is left untouched.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FieldError {
    #[error("no field named '{0}'")]
    UnknownField(String),

    #[error("no field at position {0}")]
    NoSuchPosition(usize),

    #[error("'{label}': '{raw}' is not an integer")]
    InvalidInteger { label: String, raw: String },

    #[error("'{label}': '{raw}' is not a number")]
    InvalidReal { label: String, raw: String },

    #[error("'{label}': {value} is outside [{min}, {max}]")]
    OutOfRange {
        label: String,
        value: String,
        min: String,
        max: String,
    },

    #[error("'{label}': '{value}' is not an available option")]
    UnknownOption { label: String, value: String },

    #[error("'{label}' expects a {expected} value")]
    KindMismatch { label: String, expected: &'static str },

    #[error("the form has no fields")]
    NoTarget,
}

/// Capability set shared by all field kinds.
pub trait ValueSlot: fmt::Debug + Send + Sync {
    /// Current value.
    fn get(&self) -> FieldValue;

    /// Replace the value with an already-typed one.
    fn set(&mut self, value: FieldValue) -> Result<(), FieldError>;

    /// Parse `raw` the way this kind parses user input and store it.
    fn set_raw(&mut self, raw: &str) -> Result<(), FieldError>;

    /// Whether a required field bound to this slot would be missing.
    fn is_empty(&self) -> bool;

    /// Canonical command-line text for the value. Text and path values
    /// always render, even when empty; numbers and choices are `None`
    /// while unset.
    fn render(&self) -> Option<String>;

    /// Restore the declared default.
    fn reset(&mut self);
}

/// Build the slot for a field, initialised to the field's default.
pub fn slot_for(spec: &FieldSpec) -> Box<dyn ValueSlot> {
    let label = spec.label().to_string();
    match spec.kind() {
        FieldKind::Text(c) => Box::new(TextSlot::new(label, c.clone())),
        FieldKind::Integer(c) => Box::new(IntegerSlot::new(label, c.clone())),
        FieldKind::Real(c) => Box::new(RealSlot::new(label, c.clone())),
        FieldKind::Choice(c) => Box::new(ChoiceSlot::new(label, c.clone())),
        FieldKind::Boolean { default } => Box::new(BooleanSlot::new(label, *default)),
        FieldKind::FilePath(c) => Box::new(PathSlot::new(label, c.clone())),
    }
}

fn mismatch(label: &str, expected: &'static str) -> FieldError {
    FieldError::KindMismatch {
        label: label.to_string(),
        expected,
    }
}

#[derive(Debug)]
struct TextSlot {
    label: String,
    constraints: TextConstraints,
    value: String,
}

impl TextSlot {
    fn new(label: String, constraints: TextConstraints) -> Self {
        let value = constraints.default.clone().unwrap_or_default();
        Self {
            label,
            constraints,
            value,
        }
    }
}

impl ValueSlot for TextSlot {
    fn get(&self) -> FieldValue {
        FieldValue::Text(self.value.clone())
    }

    fn set(&mut self, value: FieldValue) -> Result<(), FieldError> {
        match value {
            FieldValue::Text(s) => self.set_raw(&s),
            _ => Err(mismatch(&self.label, "text")),
        }
    }

    fn set_raw(&mut self, raw: &str) -> Result<(), FieldError> {
        self.value = raw.trim().to_string();
        Ok(())
    }

    fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    fn render(&self) -> Option<String> {
        Some(self.value.clone())
    }

    fn reset(&mut self) {
        self.value = self.constraints.default.clone().unwrap_or_default();
    }
}

#[derive(Debug)]
struct IntegerSlot {
    label: String,
    constraints: IntegerConstraints,
    value: Option<i64>,
}

impl IntegerSlot {
    fn new(label: String, constraints: IntegerConstraints) -> Self {
        let value = constraints.default;
        Self {
            label,
            constraints,
            value,
        }
    }

    fn check_range(&self, v: i64) -> Result<i64, FieldError> {
        let c = &self.constraints;
        if v < c.min || v > c.max {
            return Err(FieldError::OutOfRange {
                label: self.label.clone(),
                value: v.to_string(),
                min: c.min.to_string(),
                max: c.max.to_string(),
            });
        }
        Ok(v)
    }
}

impl ValueSlot for IntegerSlot {
    fn get(&self) -> FieldValue {
        FieldValue::Integer(self.value)
    }

    fn set(&mut self, value: FieldValue) -> Result<(), FieldError> {
        match value {
            FieldValue::Integer(None) => {
                self.value = None;
                Ok(())
            }
            FieldValue::Integer(Some(v)) => {
                self.value = Some(self.check_range(v)?);
                Ok(())
            }
            _ => Err(mismatch(&self.label, "integer")),
        }
    }

    fn set_raw(&mut self, raw: &str) -> Result<(), FieldError> {
        let t = raw.trim();
        if t.is_empty() {
            self.value = None;
            return Ok(());
        }
        let invalid = || FieldError::InvalidInteger {
            label: self.label.clone(),
            raw: t.to_string(),
        };
        // Decimal text such as "3.0" or "3.7" is accepted and truncated.
        let parsed = match t.parse::<i64>() {
            Ok(v) => v,
            Err(_) => {
                let f: f64 = t.parse().map_err(|_| invalid())?;
                if !f.is_finite() || f < i64::MIN as f64 || f > i64::MAX as f64 {
                    return Err(invalid());
                }
                f.trunc() as i64
            }
        };
        self.value = Some(self.check_range(parsed)?);
        Ok(())
    }

    fn is_empty(&self) -> bool {
        self.value.is_none()
    }

    fn render(&self) -> Option<String> {
        self.value.map(|v| v.to_string())
    }

    fn reset(&mut self) {
        self.value = self.constraints.default;
    }
}

#[derive(Debug)]
struct RealSlot {
    label: String,
    constraints: RealConstraints,
    value: Option<f64>,
}

impl RealSlot {
    fn new(label: String, constraints: RealConstraints) -> Self {
        let value = constraints.default;
        Self {
            label,
            constraints,
            value,
        }
    }

    fn check_range(&self, v: f64) -> Result<f64, FieldError> {
        let c = &self.constraints;
        if !v.is_finite() {
            return Err(FieldError::InvalidReal {
                label: self.label.clone(),
                raw: v.to_string(),
            });
        }
        if v < c.min || v > c.max {
            return Err(FieldError::OutOfRange {
                label: self.label.clone(),
                value: v.to_string(),
                min: c.min.to_string(),
                max: c.max.to_string(),
            });
        }
        Ok(v)
    }
}

impl ValueSlot for RealSlot {
    fn get(&self) -> FieldValue {
        FieldValue::Real(self.value)
    }

    fn set(&mut self, value: FieldValue) -> Result<(), FieldError> {
        match value {
            FieldValue::Real(None) => {
                self.value = None;
                Ok(())
            }
            FieldValue::Real(Some(v)) => {
                self.value = Some(self.check_range(v)?);
                Ok(())
            }
            _ => Err(mismatch(&self.label, "real")),
        }
    }

    fn set_raw(&mut self, raw: &str) -> Result<(), FieldError> {
        let t = raw.trim();
        if t.is_empty() {
            self.value = None;
            return Ok(());
        }
        let parsed: f64 = t.parse().map_err(|_| FieldError::InvalidReal {
            label: self.label.clone(),
            raw: t.to_string(),
        })?;
        self.value = Some(self.check_range(parsed)?);
        Ok(())
    }

    fn is_empty(&self) -> bool {
        self.value.is_none()
    }

    fn render(&self) -> Option<String> {
        let decimals = usize::from(self.constraints.decimals);
        self.value.map(|v| format!("{v:.decimals$}"))
    }

    fn reset(&mut self) {
        self.value = self.constraints.default;
    }
}

#[derive(Debug)]
struct ChoiceSlot {
    label: String,
    constraints: ChoiceConstraints,
    value: Option<String>,
}

impl ChoiceSlot {
    fn new(label: String, constraints: ChoiceConstraints) -> Self {
        let value = constraints.default.clone();
        Self {
            label,
            constraints,
            value,
        }
    }
}

impl ValueSlot for ChoiceSlot {
    fn get(&self) -> FieldValue {
        FieldValue::Choice(self.value.clone())
    }

    fn set(&mut self, value: FieldValue) -> Result<(), FieldError> {
        match value {
            FieldValue::Choice(None) => {
                self.value = None;
                Ok(())
            }
            FieldValue::Choice(Some(s)) => self.set_raw(&s),
            _ => Err(mismatch(&self.label, "choice")),
        }
    }

    fn set_raw(&mut self, raw: &str) -> Result<(), FieldError> {
        let t = raw.trim();
        if t.is_empty() {
            self.value = None;
            return Ok(());
        }
        match self.constraints.options.iter().find(|o| o.as_str() == t) {
            Some(option) => {
                self.value = Some(option.clone());
                Ok(())
            }
            None => Err(FieldError::UnknownOption {
                label: self.label.clone(),
                value: t.to_string(),
            }),
        }
    }

    fn is_empty(&self) -> bool {
        self.value.as_deref().is_none_or(str::is_empty)
    }

    fn render(&self) -> Option<String> {
        self.value.clone()
    }

    fn reset(&mut self) {
        self.value = self.constraints.default.clone();
    }
}

#[derive(Debug)]
struct BooleanSlot {
    label: String,
    default: bool,
    value: bool,
}

impl BooleanSlot {
    fn new(label: String, default: bool) -> Self {
        Self {
            label,
            default,
            value: default,
        }
    }
}

impl ValueSlot for BooleanSlot {
    fn get(&self) -> FieldValue {
        FieldValue::Boolean(self.value)
    }

    fn set(&mut self, value: FieldValue) -> Result<(), FieldError> {
        match value {
            FieldValue::Boolean(b) => {
                self.value = b;
                Ok(())
            }
            _ => Err(mismatch(&self.label, "boolean")),
        }
    }

    fn set_raw(&mut self, raw: &str) -> Result<(), FieldError> {
        self.value = matches!(
            raw.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        );
        Ok(())
    }

    // A checkbox always holds a value.
    fn is_empty(&self) -> bool {
        false
    }

    fn render(&self) -> Option<String> {
        self.value.then(|| "true".to_string())
    }

    fn reset(&mut self) {
        self.value = self.default;
    }
}

#[derive(Debug)]
struct PathSlot {
    label: String,
    constraints: PathConstraints,
    value: String,
}

impl PathSlot {
    fn new(label: String, constraints: PathConstraints) -> Self {
        let value = constraints.default.clone().unwrap_or_default();
        Self {
            label,
            constraints,
            value,
        }
    }
}

impl ValueSlot for PathSlot {
    fn get(&self) -> FieldValue {
        FieldValue::Path(self.value.clone())
    }

    fn set(&mut self, value: FieldValue) -> Result<(), FieldError> {
        match value {
            FieldValue::Path(s) => self.set_raw(&s),
            _ => Err(mismatch(&self.label, "file path")),
        }
    }

    fn set_raw(&mut self, raw: &str) -> Result<(), FieldError> {
        self.value = raw.trim().to_string();
        Ok(())
    }

    fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    fn render(&self) -> Option<String> {
        Some(self.value.clone())
    }

    fn reset(&mut self) {
        self.value = self.constraints.default.clone().unwrap_or_default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn integer(min: i64, max: i64) -> Box<dyn ValueSlot> {
        let spec = FieldSpec::new(
            "--n",
            "n",
            true,
            FieldKind::Integer(IntegerConstraints {
                min,
                max,
                ..Default::default()
            }),
        )
        .unwrap();
        slot_for(&spec)
    }

    #[test]
    fn integer_parses_and_truncates_decimal_text() {
        let mut slot = integer(-100, 100);
        assert!(slot.is_empty());

        slot.set_raw(" 42 ").unwrap();
        assert_eq!(slot.get(), FieldValue::Integer(Some(42)));

        slot.set_raw("3.7").unwrap();
        assert_eq!(slot.render().as_deref(), Some("3"));

        slot.set_raw("-2.9").unwrap();
        assert_eq!(slot.render().as_deref(), Some("-2"));

        slot.set_raw("").unwrap();
        assert!(slot.is_empty());
    }

    #[test]
    fn integer_rejects_garbage_and_out_of_range_without_changing_value() {
        let mut slot = integer(0, 10);
        slot.set_raw("5").unwrap();

        assert!(matches!(slot.set_raw("five"), Err(FieldError::InvalidInteger { .. })));
        assert!(matches!(slot.set_raw("11"), Err(FieldError::OutOfRange { .. })));
        assert!(matches!(slot.set_raw("inf"), Err(FieldError::InvalidInteger { .. })));
        assert_eq!(slot.get(), FieldValue::Integer(Some(5)));
    }

    #[test]
    fn real_renders_with_fixed_decimals() {
        let spec = FieldSpec::new(
            "--epsilon",
            "Epsilon",
            false,
            FieldKind::Real(RealConstraints {
                min: 0.0,
                max: 1.0,
                step: 0.01,
                decimals: 3,
                default: Some(0.1),
            }),
        )
        .unwrap();
        let mut slot = slot_for(&spec);
        assert_eq!(slot.render().as_deref(), Some("0.100"));

        slot.set_raw("0.25").unwrap();
        assert_eq!(slot.render().as_deref(), Some("0.250"));

        assert!(matches!(slot.set_raw("NaN"), Err(FieldError::InvalidReal { .. })));
        assert!(matches!(slot.set_raw("2"), Err(FieldError::OutOfRange { .. })));
    }

    #[test]
    fn choice_accepts_only_listed_options() {
        let spec = FieldSpec::new(
            "--profile",
            "Profile",
            true,
            FieldKind::Choice(ChoiceConstraints {
                options: vec!["default".into(), "extended".into()],
                default: None,
            }),
        )
        .unwrap();
        let mut slot = slot_for(&spec);
        assert!(slot.is_empty());

        slot.set_raw("extended").unwrap();
        assert_eq!(slot.render().as_deref(), Some("extended"));

        let err = slot.set_raw("Extended").unwrap_err();
        assert!(matches!(err, FieldError::UnknownOption { .. }));
        assert_eq!(slot.get(), FieldValue::Choice(Some("extended".into())));
    }

    #[test]
    fn boolean_raw_text_is_truthy_words_only() {
        let spec = FieldSpec::new("--SN", "SN", false, FieldKind::Boolean { default: false }).unwrap();
        let mut slot = slot_for(&spec);

        for truthy in ["1", "true", "YES", " on "] {
            slot.set_raw(truthy).unwrap();
            assert_eq!(slot.get(), FieldValue::Boolean(true), "{truthy}");
        }
        for falsy in ["0", "no", "", "maybe"] {
            slot.set_raw(falsy).unwrap();
            assert_eq!(slot.get(), FieldValue::Boolean(false), "{falsy}");
        }
        assert!(!slot.is_empty());
    }

    #[test]
    fn typed_set_rejects_other_kinds() {
        let mut slot = integer(0, 10);
        let err = slot.set(FieldValue::Text("3".into())).unwrap_err();
        assert_eq!(
            err,
            FieldError::KindMismatch {
                label: "n".into(),
                expected: "integer"
            }
        );
    }

    #[test]
    fn reset_restores_default() {
        let spec = FieldSpec::new(
            "--user",
            "User",
            true,
            FieldKind::Text(TextConstraints {
                placeholder: Some("e.g. Pavel".into()),
                default: Some("alice".into()),
            }),
        )
        .unwrap();
        let mut slot = slot_for(&spec);
        slot.set_raw("bob").unwrap();
        slot.reset();
        assert_eq!(slot.get(), FieldValue::Text("alice".into()));
    }
}
