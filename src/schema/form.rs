// src/schema/form.rs

use std::sync::Arc;

use super::field::{FieldKind, FormSchema};
use super::slot::{FieldError, FieldValue, ValueSlot, slot_for};

/// Current values for one task's schema.
///
/// A model is always built from a schema and holds exactly one slot per
/// field, so switching tasks means building a new model rather than
/// patching an old one.
#[derive(Debug)]
pub struct FormModel {
    schema: Arc<FormSchema>,
    slots: Vec<Box<dyn ValueSlot>>,
}

impl FormModel {
    pub fn new(schema: Arc<FormSchema>) -> Self {
        let slots = schema.fields().iter().map(slot_for).collect();
        Self { schema, slots }
    }

    pub fn schema(&self) -> &Arc<FormSchema> {
        &self.schema
    }

    /// Whether this model was built from exactly `schema`.
    pub fn is_bound_to(&self, schema: &Arc<FormSchema>) -> bool {
        Arc::ptr_eq(&self.schema, schema)
    }

    pub fn value(&self, name: &str) -> Option<FieldValue> {
        self.schema.position(name).map(|i| self.slots[i].get())
    }

    pub fn value_at(&self, index: usize) -> Option<FieldValue> {
        self.slots.get(index).map(|s| s.get())
    }

    /// Parse `raw` into the field `name` answers to.
    ///
    /// This is the single entry point for text coming from the outside:
    /// typed edits, pasted selections and dropped file paths.
    pub fn set_value(&mut self, name: &str, raw: &str) -> Result<(), FieldError> {
        let index = self
            .schema
            .position(name)
            .ok_or_else(|| FieldError::UnknownField(name.to_string()))?;
        self.slots[index].set_raw(raw)
    }

    pub fn set_value_at(&mut self, index: usize, raw: &str) -> Result<(), FieldError> {
        self.slots
            .get_mut(index)
            .ok_or(FieldError::NoSuchPosition(index))?
            .set_raw(raw)
    }

    /// Store an already-typed value.
    pub fn set(&mut self, name: &str, value: FieldValue) -> Result<(), FieldError> {
        let index = self
            .schema
            .position(name)
            .ok_or_else(|| FieldError::UnknownField(name.to_string()))?;
        self.slots[index].set(value)
    }

    /// One violation per required field that is empty, in schema order.
    pub fn validate(&self) -> Vec<String> {
        self.schema
            .fields()
            .iter()
            .zip(&self.slots)
            .filter(|(spec, slot)| spec.required() && slot.is_empty())
            .map(|(spec, _)| format!("'{}' is required.", spec.label()))
            .collect()
    }

    /// Field arguments in schema order.
    ///
    /// - boolean fields contribute their key alone, and only when checked;
    /// - text and path fields contribute `key value`, the value possibly empty;
    /// - numeric and choice fields contribute `key value` once set;
    /// - fields without a key contribute nothing.
    pub fn build_arguments(&self) -> Vec<String> {
        let mut args = Vec::new();
        for (spec, slot) in self.schema.fields().iter().zip(&self.slots) {
            if spec.key().is_empty() {
                continue;
            }
            match spec.kind() {
                FieldKind::Boolean { .. } => {
                    if slot.get() == FieldValue::Boolean(true) {
                        args.push(spec.key().to_string());
                    }
                }
                _ => {
                    if let Some(value) = slot.render() {
                        args.push(spec.key().to_string());
                        args.push(value);
                    }
                }
            }
        }
        args
    }

    /// Restore every field to its declared default.
    pub fn reset(&mut self) {
        for slot in &mut self.slots {
            slot.reset();
        }
    }

    /// Paste a text selection into a field.
    ///
    /// The target is `focused` when given, else the first required field,
    /// else the first field. Returns the position that received the value.
    pub fn paste(&mut self, focused: Option<usize>, selection: &str) -> Result<usize, FieldError> {
        let target = match focused {
            Some(index) => index,
            None => self
                .schema
                .fields()
                .iter()
                .position(|f| f.required())
                .or((!self.slots.is_empty()).then_some(0))
                .ok_or(FieldError::NoTarget)?,
        };
        self.set_value_at(target, &normalize_selection(selection))?;
        Ok(target)
    }
}

/// Text widgets report line breaks inside a selection as U+2029.
fn normalize_selection(text: &str) -> String {
    text.replace('\u{2029}', "\n").trim().to_string()
}
