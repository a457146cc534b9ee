//! Entity selection: which entities get walks.
//!
//! Every selector implements [`EntitySelector`]. The set is computed once
//! before the worker pool starts and is deterministic for a fixed store and
//! input.

pub mod resume;

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use crate::error::SelectorError;
use crate::graph::index::TripleStore;

pub use resume::{CheckpointManifest, ContinuationSelector, WalkDirectoryManifest};

/// Result type for selector construction.
pub type SelectorResult<T> = std::result::Result<T, SelectorError>;

/// An ordered set of entity identifiers.
pub type EntitySet = BTreeSet<Arc<str>>;

/// Produces the set of entities to sample walks for.
pub trait EntitySelector: Send + Sync {
    /// Compute the entity set.
    fn entities(&self) -> EntitySet;
}

/// Which index keys the [`FullSelector`] draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionScope {
    /// Only entities that appear as a subject.
    #[default]
    Subjects,
    /// Every entity, including those that only appear as an object.
    SubjectsAndObjects,
}

/// Selects every entity in the store.
#[derive(Debug, Clone)]
pub struct FullSelector {
    store: Arc<TripleStore>,
    scope: SelectionScope,
}

impl FullSelector {
    /// Select every subject of `store`.
    pub fn new(store: Arc<TripleStore>) -> Self {
        Self {
            store,
            scope: SelectionScope::Subjects,
        }
    }

    /// Select with an explicit scope.
    pub fn with_scope(store: Arc<TripleStore>, scope: SelectionScope) -> Self {
        Self { store, scope }
    }
}

impl EntitySelector for FullSelector {
    fn entities(&self) -> EntitySet {
        match self.scope {
            SelectionScope::Subjects => self.store.unique_subjects(),
            SelectionScope::SubjectsAndObjects => self.store.unique_subjects_and_objects(),
        }
    }
}

/// Selects a fixed, caller-supplied set of entities.
#[derive(Debug, Clone, Default)]
pub struct SubsetSelector {
    entities: EntitySet,
}

impl SubsetSelector {
    /// Select exactly the given entities.
    pub fn new<I, S>(entities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Arc<str>>,
    {
        Self {
            entities: entities.into_iter().map(Into::into).collect(),
        }
    }

    /// Load entities from a UTF-8 file with one entity per line.
    ///
    /// Lines are trimmed and blank lines are skipped. A missing or
    /// unreadable file is an error.
    pub fn from_file(path: &Path) -> SelectorResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| SelectorError::SubsetFile {
            path: path.display().to_string(),
            source: e,
        })?;
        let selector = Self::new(
            content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty()),
        );
        tracing::info!(
            path = %path.display(),
            entities = selector.entities.len(),
            "loaded entity subset"
        );
        Ok(selector)
    }

    /// Number of selected entities.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether the subset is empty.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

impl EntitySelector for SubsetSelector {
    fn entities(&self) -> EntitySet {
        self.entities.clone()
    }
}

impl<T: EntitySelector + ?Sized> EntitySelector for Box<T> {
    fn entities(&self) -> EntitySet {
        (**self).entities()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> Arc<TripleStore> {
        let store = TripleStore::new();
        store.add("A", "p", "B");
        store.add("B", "p", "C");
        Arc::new(store)
    }

    fn names(set: &EntitySet) -> Vec<&str> {
        set.iter().map(|e| &**e).collect()
    }

    #[test]
    fn full_selector_returns_subjects() {
        let selector = FullSelector::new(store());
        assert_eq!(names(&selector.entities()), vec!["A", "B"]);
    }

    #[test]
    fn full_selector_with_objects() {
        let selector = FullSelector::with_scope(store(), SelectionScope::SubjectsAndObjects);
        assert_eq!(names(&selector.entities()), vec!["A", "B", "C"]);
    }

    #[test]
    fn subset_from_file_trims_lines() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("entities.txt");
        std::fs::write(&path, "  A \n\nB\r\n  \nA\n").unwrap();

        let selector = SubsetSelector::from_file(&path).unwrap();
        assert_eq!(names(&selector.entities()), vec!["A", "B"]);
        assert_eq!(selector.len(), 2);
    }

    #[test]
    fn missing_subset_file_is_an_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = SubsetSelector::from_file(&dir.path().join("missing.txt"));
        assert!(matches!(err, Err(SelectorError::SubsetFile { .. })));
    }

    #[test]
    fn invalid_utf8_subset_file_is_an_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("entities.txt");
        std::fs::write(&path, [0xff, 0xfe, b'\n']).unwrap();
        assert!(SubsetSelector::from_file(&path).is_err());
    }
}
