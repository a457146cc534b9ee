//! Run configuration, persisted as TOML.
//!
//! Every field has a serde default, so a config file only needs the values
//! it changes. Command-line flags are applied on top of a loaded file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::graph::index::StoreOptions;
use crate::graph::ingest::IngestOptions;
use crate::pool::{DispatchLimits, PoolConfig};
use crate::walk::shorten::{COMMON_NAMESPACES, Identity, PrefixShortener, TokenShortener};
use crate::walk::{SamplerConfig, WalkMode};

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Configuration for one walk generation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalkConfig {
    /// Worker threads.
    #[serde(default = "default_threads")]
    pub threads: usize,
    /// Walks requested per entity.
    #[serde(default = "default_walks_per_entity")]
    pub walks_per_entity: usize,
    /// Maximum hops per walk.
    #[serde(default = "default_depth")]
    pub depth: usize,
    #[serde(default)]
    pub mode: WalkMode,
    /// Walk file to write.
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,
    /// Gzip the walk file.
    #[serde(default = "default_compress")]
    pub compress: bool,
    /// Base RNG seed. Unset means a fresh seed per run.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Directory of earlier walk files; entities found there are skipped.
    #[serde(default)]
    pub resume_dir: Option<PathBuf>,
    /// Restrict sampling to the entities listed in this file.
    #[serde(default)]
    pub entity_file: Option<PathBuf>,
    /// Keep a full triple set in the store for faster duplicate checks.
    #[serde(default)]
    pub track_triples: bool,
    /// Keep literal objects when loading RDF.
    #[serde(default)]
    pub include_literals: bool,
    /// Skip malformed RDF statements instead of failing the load.
    #[serde(default)]
    pub lenient: bool,
    /// Bound of the worker → writer queue, in entities.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    /// Stop dispatching after this many entities.
    #[serde(default)]
    pub max_tasks: Option<usize>,
    /// Stop dispatching after this many seconds.
    #[serde(default)]
    pub time_limit_secs: Option<u64>,
    /// Also shorten the well-known vocabularies (rdf, rdfs, owl, dbr, wd, ...).
    #[serde(default)]
    pub common_prefixes: bool,
    /// Prefix → namespace table used to shorten IRIs in the output.
    /// Entries here take precedence over the common prefixes.
    #[serde(default)]
    pub prefixes: BTreeMap<String, String>,
}

fn default_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
fn default_walks_per_entity() -> usize {
    100
}
fn default_depth() -> usize {
    4
}
fn default_output_path() -> PathBuf {
    PathBuf::from("walks/walk_file_0.txt.gz")
}
fn default_compress() -> bool {
    true
}
fn default_channel_capacity() -> usize {
    1024
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self {
            threads: default_threads(),
            walks_per_entity: default_walks_per_entity(),
            depth: default_depth(),
            mode: WalkMode::default(),
            output_path: default_output_path(),
            compress: default_compress(),
            seed: None,
            resume_dir: None,
            entity_file: None,
            track_triples: false,
            include_literals: false,
            lenient: false,
            channel_capacity: default_channel_capacity(),
            max_tasks: None,
            time_limit_secs: None,
            common_prefixes: false,
            prefixes: BTreeMap::new(),
        }
    }
}

impl WalkConfig {
    /// Reject values that cannot produce a run.
    pub fn validate(&self) -> ConfigResult<()> {
        let invalid = |message: &str| {
            Err(ConfigError::Invalid {
                message: message.to_string(),
            })
        };
        if self.threads == 0 {
            return invalid("threads must be >= 1");
        }
        if self.depth == 0 {
            return invalid("depth must be >= 1");
        }
        if self.channel_capacity == 0 {
            return invalid("channel_capacity must be >= 1");
        }
        if self.output_path.as_os_str().is_empty() {
            return invalid("output_path must not be empty");
        }
        if let Some((prefix, _)) = self.prefixes.iter().find(|(_, ns)| ns.is_empty()) {
            return invalid(&format!("prefix \"{prefix}\" maps to an empty namespace"));
        }
        Ok(())
    }

    pub fn sampler_config(&self) -> SamplerConfig {
        SamplerConfig {
            mode: self.mode,
            walks_per_entity: self.walks_per_entity,
            depth: self.depth,
        }
    }

    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig {
            threads: self.threads,
            channel_capacity: self.channel_capacity,
            seed: self.seed,
            limits: DispatchLimits {
                max_tasks: self.max_tasks,
                time_limit: self.time_limit_secs.map(Duration::from_secs),
            },
        }
    }

    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            track_triples: self.track_triples,
        }
    }

    pub fn ingest_options(&self) -> IngestOptions {
        IngestOptions {
            include_literals: self.include_literals,
            lenient: self.lenient,
        }
    }

    /// Output token shortener; identity when no prefixes are configured.
    pub fn shortener(&self) -> Arc<dyn TokenShortener> {
        let configured: Vec<(String, String)> = self
            .prefixes
            .iter()
            .map(|(prefix, namespace)| (namespace.clone(), prefix.clone()))
            .collect();
        let common = COMMON_NAMESPACES
            .iter()
            .filter(|_| self.common_prefixes)
            .filter(|(ns, _)| !configured.iter().any(|(c, _)| c.as_str() == *ns))
            .map(|(ns, prefix)| (ns.to_string(), prefix.to_string()));

        let namespaces: Vec<(String, String)> = configured.iter().cloned().chain(common).collect();
        if namespaces.is_empty() {
            Arc::new(Identity)
        } else {
            Arc::new(PrefixShortener::new(namespaces))
        }
    }

    /// Load from a TOML file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Save to a TOML file.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
        std::fs::write(path, content).map_err(|e| ConfigError::Write {
            path: path.display().to_string(),
            source: e,
        })
    }
}
