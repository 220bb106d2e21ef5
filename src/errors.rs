// src/errors.rs

//! Crate-wide error aliases and helpers.

use std::path::PathBuf;

use thiserror::Error;

use crate::schema::{FieldError, SchemaError};

#[derive(Error, Debug)]
pub enum ScriptrunError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Invalid field schema: {0}")]
    Schema(#[from] SchemaError),

    #[error("Invalid field value: {0}")]
    Field(#[from] FieldError),

    /// One human-readable violation per problem, in schema order.
    #[error("Validation failed: {}", .0.join(" "))]
    Validation(Vec<String>),

    #[error("A task is already running; cancel it first")]
    Busy,

    #[error("failed to launch '{}': {source}", program.display())]
    Launch {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Supervisor is no longer running")]
    SupervisorClosed,

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, ScriptrunError>;
