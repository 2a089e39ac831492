// src/env.rs

//! Ambient execution context shared read-only by every node of a request.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::config::EnvironmentSection;

/// Immutable snapshot of paths and variables handed to runners.
///
/// The worker never inspects it; runners use it to resolve input paths and
/// to build the environment of child processes or remote jobs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    working_dir: Option<PathBuf>,
    vars: BTreeMap<String, String>,
}

impl Environment {
    pub fn new(working_dir: Option<PathBuf>, vars: BTreeMap<String, String>) -> Self {
        Self { working_dir, vars }
    }

    /// Build from `[environment]`, resolving a relative `working_dir`
    /// against `base` (the directory holding the pipeline file).
    pub fn from_config(section: &EnvironmentSection, base: &Path) -> Self {
        let working_dir = match &section.working_dir {
            Some(dir) if dir.is_relative() => Some(base.join(dir)),
            Some(dir) => Some(dir.clone()),
            None => Some(base.to_path_buf()),
        };
        Self::new(working_dir, section.vars.clone())
    }

    pub fn working_dir(&self) -> Option<&Path> {
        self.working_dir.as_deref()
    }

    pub fn vars(&self) -> &BTreeMap<String, String> {
        &self.vars
    }

    /// Resolve a possibly relative path against the working directory.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        match &self.working_dir {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path.to_path_buf(),
        }
    }
}
