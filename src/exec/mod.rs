// src/exec/mod.rs

//! Process execution layer.
//!
//! This module actually runs the launch requests prepared by [`crate::task`],
//! using `tokio::process::Command`, and reports back to the supervisor via
//! [`ProcessEvent`](crate::engine::ProcessEvent)s.
//!
//! - [`backend`] provides the `ProcessBackend` trait and the concrete
//!   `RealProcessBackend` the supervisor uses in production, which tests can
//!   replace with a scripted fake.
//! - [`process`] supervises one spawned child: it pumps stdout and stderr
//!   into a single event stream and waits for exit or cancellation.

pub mod backend;
pub mod process;

pub use backend::{ProcessBackend, RealProcessBackend};
