//! Resuming interrupted runs.
//!
//! A [`CheckpointManifest`] reports which entities already have walks.
//! [`WalkDirectoryManifest`] derives that from a directory of earlier walk
//! files, preferring the entity log the writer keeps next to each file.
//! [`ContinuationSelector`] subtracts the manifest from a delegate selector.
//!
//! Resuming is best-effort: a manifest failure never blocks a fresh run.

use std::collections::HashSet;
use std::io::BufRead;
use std::path::{Path, PathBuf};

use crate::error::SelectorError;
use crate::pool::writer::{entity_log_path, is_entity_log, open_walk_reader};

use super::{EntitySelector, EntitySet, SelectorResult};

/// Source of already-processed entity identifiers.
pub trait CheckpointManifest: Send + Sync {
    /// Entities that already have walks.
    fn already_processed(&self) -> SelectorResult<HashSet<String>>;
}

/// Manifest backed by a directory of previously written walk files.
///
/// Entity logs (`*.entities`) list finished seeds, one per line. A walk file
/// with an entity log next to it is not read. Any other file is taken to be
/// a walk file without a log, and the first token of each line counts as a
/// seed; that is only right for forward walks written without shortening.
/// Files ending in `.gz` are decompressed.
#[derive(Debug, Clone)]
pub struct WalkDirectoryManifest {
    dir: PathBuf,
}

impl WalkDirectoryManifest {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The scanned directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn scan_file(path: &Path, seen: &mut HashSet<String>) -> SelectorResult<()> {
        let reader = open_walk_reader(path).map_err(|e| SelectorError::Manifest {
            path: path.display().to_string(),
            source: e,
        })?;
        for line in reader.lines() {
            let line = line.map_err(|e| SelectorError::Manifest {
                path: path.display().to_string(),
                source: e,
            })?;
            if let Some(first) = line.split_whitespace().next() {
                if !seen.contains(first) {
                    seen.insert(first.to_string());
                }
            }
        }
        Ok(())
    }
}

impl CheckpointManifest for WalkDirectoryManifest {
    fn already_processed(&self) -> SelectorResult<HashSet<String>> {
        let manifest_err = |e| SelectorError::Manifest {
            path: self.dir.display().to_string(),
            source: e,
        };

        let mut files: Vec<PathBuf> = std::fs::read_dir(&self.dir)
            .map_err(manifest_err)?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().map(|ft| ft.is_file()).unwrap_or(false))
            .map(|entry| entry.path())
            .collect();
        files.sort();

        let mut seen = HashSet::new();
        for file in &files {
            if !is_entity_log(file) {
                if entity_log_path(file).is_file() {
                    continue;
                }
                tracing::debug!(
                    file = %file.display(),
                    "no entity log, reading seeds from walk lines"
                );
            }
            Self::scan_file(file, &mut seen)?;
        }
        tracing::debug!(
            dir = %self.dir.display(),
            files = files.len(),
            entities = seen.len(),
            "scanned walk directory"
        );
        Ok(seen)
    }
}

/// Selects the delegate's entities minus those already processed.
pub struct ContinuationSelector<S, M> {
    delegate: S,
    manifest: M,
}

impl<S: EntitySelector, M: CheckpointManifest> ContinuationSelector<S, M> {
    pub fn new(delegate: S, manifest: M) -> Self {
        Self { delegate, manifest }
    }
}

impl<S: EntitySelector> ContinuationSelector<S, WalkDirectoryManifest> {
    /// Resume against a directory of earlier walk files.
    pub fn from_walk_dir(delegate: S, dir: impl Into<PathBuf>) -> Self {
        Self::new(delegate, WalkDirectoryManifest::new(dir))
    }
}

impl<S: EntitySelector, M: CheckpointManifest> EntitySelector for ContinuationSelector<S, M> {
    fn entities(&self) -> EntitySet {
        let mut entities = self.delegate.entities();
        match self.manifest.already_processed() {
            Ok(processed) => {
                let before = entities.len();
                entities.retain(|entity| !processed.contains(&**entity));
                tracing::info!(
                    resumed = before - entities.len(),
                    remaining = entities.len(),
                    "continuing previous run"
                );
            }
            Err(e) => {
                tracing::warn!(error = %e, "cannot read previous walks, starting from scratch");
            }
        }
        entities
    }
}
