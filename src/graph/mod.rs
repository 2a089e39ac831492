// src/graph/mod.rs

//! Read-only view over the pipeline's node graph.
//!
//! - [`node`] holds the per-node description (command, inputs, params).
//! - [`graph`] holds the adjacency and the `leaves()` query used when a
//!   compute request has no explicit start node.

pub mod graph;
pub mod node;

pub use graph::Graph;
pub use node::Node;
