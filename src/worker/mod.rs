// src/worker/mod.rs

//! Execution controller.
//!
//! - [`worker`] resolves the nodes of a request, creates the runner for the
//!   chosen mode and drives it node by node.
//! - [`active`] guards the "current runner" slot shared with
//!   `kill_child_processes`.

pub mod active;
pub mod worker;

pub use worker::{ComputeOutcome, Worker, resolve_start_nodes};
