// src/config/mod.rs

//! Pipeline file loading and validation.
//!
//! - [`model`] holds the serde types mirroring the TOML layout.
//! - [`loader`] reads a file from disk.
//! - [`validate`] turns a `RawPipelineFile` into a `PipelineFile`.

pub mod duration;
pub mod loader;
pub mod model;
pub mod validate;

pub use duration::parse_duration;
pub use loader::{load_and_validate, load_from_path};
pub use model::{
    ConfigSection, EnvironmentSection, NodeConfig, PipelineFile, RawPipelineFile,
    RemoteSection,
};
