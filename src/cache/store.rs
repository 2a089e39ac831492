// src/cache/store.rs

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cache::hash::{KeyHasher, compute_file_hash};
use crate::cache::location::CacheLocation;
use crate::env::Environment;
use crate::errors::CacheError;
use crate::graph::Graph;

/// File name of the authoritative record inside a node's output directory.
pub const ARTIFACT_FILE: &str = "artifact.toml";

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// What produced an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    /// The node's computation ran to completion.
    Computed,
    /// Output locations were prepared by a dry run; nothing was computed.
    Prepared,
}

impl ArtifactKind {
    /// Whether an existing artifact of this kind is a cache hit for a runner
    /// that would produce `wanted`.
    pub fn satisfies(self, wanted: ArtifactKind) -> bool {
        match (self, wanted) {
            (ArtifactKind::Computed, _) => true,
            (ArtifactKind::Prepared, ArtifactKind::Prepared) => true,
            (ArtifactKind::Prepared, ArtifactKind::Computed) => false,
        }
    }
}

/// Record stored at `<root>/<node>/<key>/artifact.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub node: String,
    pub key: String,
    pub kind: ArtifactKind,
}

/// On-disk artifact store keyed by (node name, input-state key).
///
/// Writes go through a uniquely named temp file followed by a rename, so a
/// concurrent reader sees either the previous record or the new one, and two
/// writers of the same key simply leave one identical record behind.
#[derive(Debug, Clone)]
pub struct Cache {
    root: PathBuf,
}

impl Cache {
    pub fn open(location: &CacheLocation) -> Self {
        Self {
            root: location.root().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding everything a node produces for a given key.
    pub fn output_dir(&self, node: &str, key: &str) -> PathBuf {
        self.root.join(node).join(key)
    }

    /// Derive the key for `node` from its own description, the contents of
    /// its input files and, recursively, the keys of its dependencies.
    pub fn key_for(
        &self,
        graph: &Graph,
        env: &Environment,
        node: &str,
    ) -> Result<String, CacheError> {
        let mut memo = HashMap::new();
        node_key(graph, env, node, &mut memo)
    }

    /// Return the stored artifact for `(node, key)`, if any.
    ///
    /// An unreadable or malformed record is logged and treated as absent so
    /// the next successful run overwrites it.
    pub fn lookup(&self, node: &str, key: &str) -> Result<Option<Artifact>, CacheError> {
        let path = self.output_dir(node, key).join(ARTIFACT_FILE);
        if !path.is_file() {
            return Ok(None);
        }

        let contents = fs::read_to_string(&path).map_err(|source| CacheError::Io {
            path: path.clone(),
            source,
        })?;

        match toml::from_str::<Artifact>(&contents) {
            Ok(artifact) if artifact.node == node && artifact.key == key => Ok(Some(artifact)),
            Ok(_) => {
                warn!(node, key, ?path, "artifact record does not match its location; ignoring");
                Ok(None)
            }
            Err(e) => {
                warn!(node, key, ?path, error = %e, "malformed artifact record; ignoring");
                Ok(None)
            }
        }
    }

    /// Whether a stored artifact satisfies `wanted` for `(node, key)`.
    pub fn contains(&self, node: &str, key: &str, wanted: ArtifactKind) -> Result<bool, CacheError> {
        Ok(self
            .lookup(node, key)?
            .is_some_and(|a| a.kind.satisfies(wanted)))
    }

    /// Create the output directory for `(node, key)` and clear out anything
    /// but its artifact record.
    ///
    /// Only called on a miss, so whatever else is there was left behind by a
    /// failed or cancelled computation.
    pub fn prepare_output_dir(&self, node: &str, key: &str) -> Result<PathBuf, CacheError> {
        let dir = self.ensure_dir(node, key)?;
        let io = |path: &Path, source| CacheError::Io {
            path: path.to_path_buf(),
            source,
        };

        for entry in fs::read_dir(&dir).map_err(|e| io(dir.as_path(), e))? {
            let entry = entry.map_err(|e| io(dir.as_path(), e))?;
            if entry.file_name().to_str() == Some(ARTIFACT_FILE) {
                continue;
            }
            let path = entry.path();
            let is_dir = entry.file_type().map_err(|e| io(path.as_path(), e))?.is_dir();
            let removed = if is_dir {
                fs::remove_dir_all(&path)
            } else {
                fs::remove_file(&path)
            };
            removed.map_err(|e| io(path.as_path(), e))?;
            debug!(node, key, ?path, "removed stale output");
        }
        Ok(dir)
    }

    fn ensure_dir(&self, node: &str, key: &str) -> Result<PathBuf, CacheError> {
        let dir = self.output_dir(node, key);
        fs::create_dir_all(&dir).map_err(|source| CacheError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(dir)
    }

    /// Make `artifact` the authoritative record for its `(node, key)`.
    pub fn store(&self, artifact: &Artifact) -> Result<(), CacheError> {
        let dir = self.ensure_dir(&artifact.node, &artifact.key)?;
        let encoded = toml::to_string(artifact).map_err(|e| CacheError::Encode {
            node: artifact.node.clone(),
            reason: e.to_string(),
        })?;

        let tmp = dir.join(format!(
            ".{}.{}.{}.tmp",
            ARTIFACT_FILE,
            std::process::id(),
            TMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        let target = dir.join(ARTIFACT_FILE);

        fs::write(&tmp, encoded).map_err(|source| CacheError::Io {
            path: tmp.clone(),
            source,
        })?;
        if let Err(source) = fs::rename(&tmp, &target) {
            let _ = fs::remove_file(&tmp);
            return Err(CacheError::Io {
                path: target,
                source,
            });
        }

        info!(
            node = %artifact.node,
            key = %artifact.key,
            kind = ?artifact.kind,
            "stored artifact"
        );
        Ok(())
    }
}

fn node_key(
    graph: &Graph,
    env: &Environment,
    name: &str,
    memo: &mut HashMap<String, String>,
) -> Result<String, CacheError> {
    if let Some(key) = memo.get(name) {
        return Ok(key.clone());
    }

    let node = graph
        .node(name)
        .ok_or_else(|| CacheError::UnknownNode(name.to_string()))?;

    let mut hasher = KeyHasher::new();
    hasher.field("node", &node.name).field("cmd", &node.cmd);

    for (param, value) in node.params.iter() {
        hasher.field("param", param).field("value", value);
    }

    let mut inputs: Vec<&PathBuf> = node.inputs.iter().collect();
    inputs.sort();
    for input in inputs {
        let resolved = env.resolve(input);
        if !resolved.is_file() {
            return Err(CacheError::MissingInput {
                node: node.name.clone(),
                path: resolved,
            });
        }
        let file_hash = compute_file_hash(&resolved).map_err(|source| CacheError::Io {
            path: resolved.clone(),
            source,
        })?;
        hasher
            .field("input", &input.to_string_lossy())
            .field("content", &file_hash);
    }

    let mut deps: Vec<&String> = node.deps.iter().collect();
    deps.sort();
    for dep in deps {
        let dep_key = node_key(graph, env, dep, memo)?;
        hasher.field("dep", dep).field("dep_key", &dep_key);
    }

    let key = hasher.finish();
    debug!(node = %name, key = %key, "derived cache key");
    memo.insert(name.to_string(), key.clone());
    Ok(key)
}
