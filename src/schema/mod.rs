// src/schema/mod.rs

//! Declarative task parameters and their bound values.
//!
//! - [`field`] holds the static description (`FieldSpec`, `FormSchema`).
//! - [`slot`] implements value storage and parsing once per field kind.
//! - [`form`] ties both together into a `FormModel` that validates and
//!   produces the ordered argument list for a launch.

pub mod field;
pub mod form;
pub mod slot;

pub use field::{
    ChoiceConstraints, FieldKind, FieldSpec, FormSchema, IntegerConstraints, PathConstraints,
    RealConstraints, SchemaError, TextConstraints,
};
pub use form::FormModel;
pub use slot::{FieldError, FieldValue, ValueSlot};
