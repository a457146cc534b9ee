//! Engine facade: top-level API for triplewalk.
//!
//! A [`WalkEngine`] pairs a validated [`WalkConfig`] with a loaded
//! [`TripleStore`] and wires the selector, sampler, pool and writer together
//! for a run.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::WalkConfig;
use crate::error::WalkResult;
use crate::graph::index::TripleStore;
use crate::graph::ingest;
use crate::pool::writer::entity_log_path;
use crate::pool::{RunSummary, WalkPool, WalkWriter};
use crate::select::{ContinuationSelector, EntitySelector, FullSelector, SubsetSelector};
use crate::walk::WalkSampler;

/// Walk generation over one in-memory graph.
pub struct WalkEngine {
    config: WalkConfig,
    store: Arc<TripleStore>,
}

impl WalkEngine {
    /// Create an engine over an already populated store.
    pub fn new(config: WalkConfig, store: Arc<TripleStore>) -> WalkResult<Self> {
        config.validate()?;
        tracing::info!(
            triples = store.len(),
            mode = %config.mode,
            depth = config.depth,
            walks_per_entity = config.walks_per_entity,
            "initializing walk engine"
        );
        Ok(Self { config, store })
    }

    /// Load one or more RDF files into a fresh store and create an engine.
    pub fn from_rdf<P: AsRef<Path>>(config: WalkConfig, inputs: &[P]) -> WalkResult<Self> {
        config.validate()?;
        let store = TripleStore::with_options(config.store_options());
        for input in inputs {
            let input = input.as_ref();
            let added = ingest::load_rdf_file(&store, input, config.ingest_options())?;
            tracing::info!(path = %input.display(), triples = added, "loaded RDF input");
        }
        Self::new(config, Arc::new(store))
    }

    pub fn store(&self) -> &Arc<TripleStore> {
        &self.store
    }

    pub fn config(&self) -> &WalkConfig {
        &self.config
    }

    /// A sampler over this engine's store.
    pub fn sampler(&self) -> WalkSampler {
        WalkSampler::new(Arc::clone(&self.store), self.config.sampler_config())
    }

    /// Build the configured selector chain.
    ///
    /// An entity file selects a fixed subset, otherwise every entity in the
    /// mode's default scope is selected. A resume directory wraps either in
    /// a [`ContinuationSelector`].
    pub fn selector(&self) -> WalkResult<Box<dyn EntitySelector>> {
        let base: Box<dyn EntitySelector> = match &self.config.entity_file {
            Some(path) => Box::new(SubsetSelector::from_file(path)?),
            None => Box::new(FullSelector::with_scope(
                Arc::clone(&self.store),
                self.config.mode.default_scope(),
            )),
        };
        Ok(match &self.config.resume_dir {
            Some(dir) => Box::new(ContinuationSelector::from_walk_dir(base, dir.clone())),
            None => base,
        })
    }

    /// Select entities, generate their walks and write them to the output file.
    pub fn run(&self) -> WalkResult<RunSummary> {
        let entities = self.selector()?.entities();

        let mut output = self.config.output_path.clone();
        if self.config.resume_dir.is_some() {
            output = fresh_output_path(&output);
        }
        let writer = WalkWriter::create(&output, self.config.compress)?
            .with_shortener(self.config.shortener());
        tracing::info!(
            output = %output.display(),
            entities = entities.len(),
            "writing walks"
        );

        let pool = WalkPool::new(self.config.pool_config());
        pool.run(&self.sampler(), &entities, writer)
    }

    /// Counts describing the loaded graph.
    pub fn info(&self) -> StoreInfo {
        StoreInfo {
            triples: self.store.len(),
            subjects: self.store.unique_subjects().len(),
            objects: self.store.unique_objects().len(),
            predicates: self.store.unique_predicates().len(),
            entities: self.store.unique_subjects_and_objects().len(),
        }
    }
}

/// `path` itself if neither it nor its entity log exists yet, otherwise the
/// first free `<stem>_<n>.<extensions>` sibling.
///
/// Resumed runs must not truncate the walk files they resume from.
pub fn fresh_output_path(path: &Path) -> PathBuf {
    let taken = |p: &Path| p.exists() || entity_log_path(p).exists();
    if !taken(path) {
        return path.to_path_buf();
    }
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let (stem, extensions) = match name.split_once('.') {
        Some((stem, ext)) => (stem.to_string(), format!(".{ext}")),
        None => (name, String::new()),
    };
    (1..)
        .map(|n| path.with_file_name(format!("{stem}_{n}{extensions}")))
        .find(|candidate| !taken(candidate.as_path()))
        .unwrap_or_else(|| path.to_path_buf())
}

/// Summary information about the loaded graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreInfo {
    pub triples: usize,
    pub subjects: usize,
    pub objects: usize,
    pub predicates: usize,
    /// Distinct subjects and objects.
    pub entities: usize,
}

impl std::fmt::Display for StoreInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "triplewalk graph info")?;
        writeln!(f, "  triples:      {}", self.triples)?;
        writeln!(f, "  subjects:     {}", self.subjects)?;
        writeln!(f, "  objects:      {}", self.objects)?;
        writeln!(f, "  predicates:   {}", self.predicates)?;
        writeln!(f, "  entities:     {}", self.entities)?;
        Ok(())
    }
}

impl std::fmt::Debug for WalkEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalkEngine")
            .field("config", &self.config)
            .field("store", &self.store)
            .finish()
    }
}
