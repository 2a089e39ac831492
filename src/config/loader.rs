// src/config/loader.rs

use std::fs;
use std::path::Path;

use crate::config::model::{PipelineFile, RawPipelineFile};
use crate::errors::Result;

/// Load a pipeline file and return the raw, unvalidated `RawPipelineFile`.
///
/// Use [`load_and_validate`] unless you specifically need to inspect an
/// invalid pipeline.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawPipelineFile> {
    let contents = fs::read_to_string(path.as_ref())?;
    let raw: RawPipelineFile = toml::from_str(&contents)?;
    Ok(raw)
}

/// Load a pipeline file and validate it:
///
/// - at least one node, with usable names,
/// - every `after` reference resolves and no node depends on itself,
/// - the node graph is acyclic,
/// - `[remote].poll_interval` parses.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<PipelineFile> {
    let raw = load_from_path(&path)?;
    PipelineFile::try_from(raw)
}
