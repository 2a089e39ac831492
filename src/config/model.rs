// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::config::duration::parse_duration;
use crate::types::Mode;

/// Default polling interval for remote jobs when `[remote].poll_interval`
/// is not set.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Pipeline file exactly as read from TOML, before semantic validation.
///
/// ```toml
/// [config]
/// cache = "file:///var/cache/pipeline"
/// mode = "local"
///
/// [environment]
/// working_dir = "."
/// vars = { ALICEVISION_ROOT = "/opt/av" }
///
/// [remote]
/// spool = "/mnt/farm/spool"
/// poll_interval = "500ms"
///
/// [node.CameraInit]
/// cmd = "aliceVision_cameraInit --output \"$DAG_OUTPUT_DIR\""
/// inputs = ["images/a.jpg"]
///
/// [node.FeatureExtraction]
/// cmd = "aliceVision_featureExtraction"
/// after = ["CameraInit"]
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RawPipelineFile {
    #[serde(default)]
    pub config: ConfigSection,

    #[serde(default)]
    pub environment: EnvironmentSection,

    #[serde(default)]
    pub remote: Option<RemoteSection>,

    /// All nodes from `[node.<name>]`, keyed by node name.
    #[serde(default)]
    pub node: BTreeMap<String, NodeConfig>,
}

/// A validated pipeline file.
///
/// Only obtainable through `TryFrom<RawPipelineFile>` (see
/// `config::validate`), so every `PipelineFile` describes an acyclic graph
/// whose `after` references all resolve.
#[derive(Debug, Clone)]
pub struct PipelineFile {
    pub config: ConfigSection,
    pub environment: EnvironmentSection,
    pub remote: Option<RemoteSection>,
    pub node: BTreeMap<String, NodeConfig>,
}

impl PipelineFile {
    pub(crate) fn new_unchecked(raw: RawPipelineFile) -> Self {
        Self {
            config: raw.config,
            environment: raw.environment,
            remote: raw.remote,
            node: raw.node,
        }
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigSection {
    /// Cache root, as a plain path or a `file://` URI.
    ///
    /// Validity is checked per compute request, not at load time, so a bad
    /// value aborts the request rather than the whole process.
    #[serde(default)]
    pub cache: Option<String>,

    /// Default mode when none is given on the command line.
    #[serde(default)]
    pub mode: Mode,
}

/// `[environment]` section: ambient settings passed untouched to runners.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EnvironmentSection {
    /// Directory that relative `inputs` are resolved against and that local
    /// child processes start in.
    #[serde(default)]
    pub working_dir: Option<PathBuf>,

    /// Extra environment variables for every node's computation.
    #[serde(default)]
    pub vars: BTreeMap<String, String>,
}

/// `[remote]` section: where farm jobs are spooled.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteSection {
    pub spool: PathBuf,

    /// Duration string such as `"500ms"` or `"2s"`.
    #[serde(default)]
    pub poll_interval: Option<String>,
}

impl RemoteSection {
    /// Effective poll interval. Validation guarantees the string parses.
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
            .as_deref()
            .and_then(|s| parse_duration(s).ok())
            .unwrap_or(DEFAULT_POLL_INTERVAL)
    }
}

/// `[node.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeConfig {
    /// Shell command performing the node's computation.
    pub cmd: String,

    /// Upstream nodes this node consumes (`after = ["A", "B"]`).
    #[serde(default)]
    pub after: Vec<String>,

    /// Input files whose contents are part of the node's cache key.
    #[serde(default)]
    pub inputs: Vec<PathBuf>,

    /// Free-form parameters; part of the cache key and exported to the
    /// computation as `DAG_PARAM_<NAME>`.
    #[serde(default)]
    pub params: BTreeMap<String, String>,
}
