//! In-memory triple store with subject, predicate and object indices.
//!
//! Uses `DashMap` for the three indices so lookups never block each other.
//! Every distinct triple is stored once behind an `Arc` and shared by all
//! three indices; terms are interned so equal strings share one allocation.
//!
//! Insertion is serialized through a writer lock. After construction the
//! store is only read, which is what lets sampling workers share it freely.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use dashmap::{DashMap, DashSet};

use super::{Triple, clamp_weight};

/// Construction options for a [`TripleStore`].
#[derive(Debug, Clone, Copy, Default)]
pub struct StoreOptions {
    /// Keep a hash set of every triple for O(1) existence checks.
    ///
    /// Without it, duplicate detection scans the subject's triple list.
    pub track_triples: bool,
}

type Index = DashMap<Arc<str>, Vec<Arc<Triple>>>;

/// Append-only triple store indexed by subject, predicate and object.
pub struct TripleStore {
    by_subject: Index,
    by_predicate: Index,
    by_object: Index,
    /// Interned terms.
    terms: DashMap<Arc<str>, ()>,
    /// Full triple set, present when `track_triples` is enabled.
    triples: Option<DashSet<Arc<Triple>>>,
    write_lock: Mutex<()>,
    triple_count: AtomicUsize,
}

impl TripleStore {
    /// Create a new empty store without full-set tracking.
    pub fn new() -> Self {
        Self::with_options(StoreOptions::default())
    }

    /// Create a new empty store with the given options.
    pub fn with_options(options: StoreOptions) -> Self {
        Self {
            by_subject: DashMap::new(),
            by_predicate: DashMap::new(),
            by_object: DashMap::new(),
            terms: DashMap::new(),
            triples: options.track_triples.then(DashSet::new),
            write_lock: Mutex::new(()),
            triple_count: AtomicUsize::new(0),
        }
    }

    /// Insert `(subject, predicate, object)` with weight 1.0.
    ///
    /// Returns `true` if the triple was new. Re-inserting an existing triple
    /// is a no-op.
    pub fn add(&self, subject: &str, predicate: &str, object: &str) -> bool {
        self.add_triple(Triple::new(subject, predicate, object))
    }

    /// Insert a triple with an explicit sampling weight.
    pub fn add_weighted(&self, subject: &str, predicate: &str, object: &str, weight: f32) -> bool {
        self.add_triple(Triple::new(subject, predicate, object).with_weight(weight))
    }

    /// Insert a triple. The first inserted weight of a triple value wins.
    ///
    /// The weight is clamped like [`Triple::with_weight`], since the fields
    /// are public.
    pub fn add_triple(&self, triple: Triple) -> bool {
        let _guard = self.write_lock.lock().expect("store write lock poisoned");

        if self.contains(&triple.subject, &triple.predicate, &triple.object) {
            return false;
        }

        let triple = Arc::new(Triple {
            subject: self.intern(&triple.subject),
            predicate: self.intern(&triple.predicate),
            object: self.intern(&triple.object),
            weight: clamp_weight(triple.weight),
        });

        self.by_subject
            .entry(Arc::clone(&triple.subject))
            .or_default()
            .push(Arc::clone(&triple));
        self.by_predicate
            .entry(Arc::clone(&triple.predicate))
            .or_default()
            .push(Arc::clone(&triple));
        self.by_object
            .entry(Arc::clone(&triple.object))
            .or_default()
            .push(Arc::clone(&triple));

        if let Some(set) = &self.triples {
            set.insert(triple);
        }

        self.triple_count.fetch_add(1, Ordering::Relaxed);
        true
    }

    /// Merge every triple of `other` into this store.
    ///
    /// Returns the number of triples that were new.
    pub fn add_all(&self, other: &TripleStore) -> usize {
        other
            .all_triples()
            .into_iter()
            .filter(|t| self.add_triple(Triple::clone(t)))
            .count()
    }

    /// Bulk-load `(subject, predicate, object)` tuples. Returns the number of new triples.
    pub fn extend<I, S>(&self, triples: I) -> usize
    where
        I: IntoIterator<Item = (S, S, S)>,
        S: AsRef<str>,
    {
        triples
            .into_iter()
            .filter(|(s, p, o)| self.add(s.as_ref(), p.as_ref(), o.as_ref()))
            .count()
    }

    /// Check whether the triple value is present.
    pub fn contains(&self, subject: &str, predicate: &str, object: &str) -> bool {
        match &self.triples {
            Some(set) => {
                // Every term of a stored triple is interned, so a missing term
                // settles the question without allocating a probe.
                let (Some(s), Some(p), Some(o)) = (
                    self.lookup_term(subject),
                    self.lookup_term(predicate),
                    self.lookup_term(object),
                ) else {
                    return false;
                };
                set.contains(&Triple::new(s, p, o))
            }
            None => self
                .by_subject
                .get(subject)
                .is_some_and(|list| list.iter().any(|t| t.matches(subject, predicate, object))),
        }
    }

    /// All triples with the given subject, in insertion order.
    pub fn triples_by_subject(&self, subject: &str) -> Vec<Arc<Triple>> {
        Self::lookup(&self.by_subject, subject)
    }

    /// All triples with the given predicate, in insertion order.
    pub fn triples_by_predicate(&self, predicate: &str) -> Vec<Arc<Triple>> {
        Self::lookup(&self.by_predicate, predicate)
    }

    /// All triples with the given object, in insertion order.
    pub fn triples_by_object(&self, object: &str) -> Vec<Arc<Triple>> {
        Self::lookup(&self.by_object, object)
    }

    /// Run `f` over the outgoing triples of `entity` without copying the list.
    pub fn with_outgoing<R>(&self, entity: &str, f: impl FnOnce(&[Arc<Triple>]) -> R) -> R {
        match self.by_subject.get(entity) {
            Some(list) => f(list.value()),
            None => f(&[]),
        }
    }

    /// Run `f` over the incoming triples of `entity` without copying the list.
    pub fn with_incoming<R>(&self, entity: &str, f: impl FnOnce(&[Arc<Triple>]) -> R) -> R {
        match self.by_object.get(entity) {
            Some(list) => f(list.value()),
            None => f(&[]),
        }
    }

    /// Number of triples with `entity` as subject.
    pub fn out_degree(&self, entity: &str) -> usize {
        self.by_subject.get(entity).map_or(0, |l| l.len())
    }

    /// Number of triples with `entity` as object.
    pub fn in_degree(&self, entity: &str) -> usize {
        self.by_object.get(entity).map_or(0, |l| l.len())
    }

    /// Distinct subjects.
    pub fn unique_subjects(&self) -> BTreeSet<Arc<str>> {
        Self::keys(&self.by_subject)
    }

    /// Distinct objects.
    pub fn unique_objects(&self) -> BTreeSet<Arc<str>> {
        Self::keys(&self.by_object)
    }

    /// Distinct predicates.
    pub fn unique_predicates(&self) -> BTreeSet<Arc<str>> {
        Self::keys(&self.by_predicate)
    }

    /// Every entity: the union of distinct subjects and objects.
    pub fn unique_subjects_and_objects(&self) -> BTreeSet<Arc<str>> {
        let mut entities = self.unique_subjects();
        entities.extend(Self::keys(&self.by_object));
        entities
    }

    /// Number of distinct triples inserted.
    pub fn len(&self) -> usize {
        self.triple_count.load(Ordering::Relaxed)
    }

    /// Whether the store holds no triples.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every triple, grouped by subject in lexicographic subject order.
    pub fn all_triples(&self) -> Vec<Arc<Triple>> {
        let mut all = Vec::with_capacity(self.len());
        for subject in self.unique_subjects() {
            if let Some(list) = self.by_subject.get(&subject) {
                all.extend(list.iter().cloned());
            }
        }
        all
    }

    fn intern(&self, term: &str) -> Arc<str> {
        if let Some(existing) = self.lookup_term(term) {
            return existing;
        }
        let term: Arc<str> = Arc::from(term);
        self.terms.insert(Arc::clone(&term), ());
        term
    }

    fn lookup_term(&self, term: &str) -> Option<Arc<str>> {
        self.terms.get(term).map(|entry| Arc::clone(entry.key()))
    }

    fn lookup(index: &Index, key: &str) -> Vec<Arc<Triple>> {
        index
            .get(key)
            .map(|list| list.value().clone())
            .unwrap_or_default()
    }

    fn keys(index: &Index) -> BTreeSet<Arc<str>> {
        index.iter().map(|entry| Arc::clone(entry.key())).collect()
    }
}

impl Default for TripleStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TripleStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TripleStore")
            .field("triples", &self.len())
            .field("subjects", &self.by_subject.len())
            .field("predicates", &self.by_predicate.len())
            .field("objects", &self.by_object.len())
            .field("track_triples", &self.triples.is_some())
            .finish()
    }
}
