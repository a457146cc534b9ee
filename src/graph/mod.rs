//! Triple graph: the in-memory multi-indexed store walks are sampled from.
//!
//! - [`Triple`]: the atomic `(subject, predicate, object)` fact
//! - [`index::TripleStore`]: subject/predicate/object hash indices over shared triples
//! - [`ingest`]: loads RDF serializations into a store via `oxigraph`

pub mod index;
pub mod ingest;

use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A triple (subject, predicate, object) in the graph.
///
/// Equality and hashing consider only the three terms. The weight is an
/// attribute used by weighted walk modes and does not affect identity.
#[derive(Debug, Clone)]
pub struct Triple {
    /// The subject of the triple.
    pub subject: Arc<str>,
    /// The predicate (relation) of the triple.
    pub predicate: Arc<str>,
    /// The object of the triple.
    pub object: Arc<str>,
    /// Non-negative sampling weight.
    pub weight: f32,
}

impl Triple {
    /// Create a new triple with weight 1.0.
    pub fn new(
        subject: impl Into<Arc<str>>,
        predicate: impl Into<Arc<str>>,
        object: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
            weight: 1.0,
        }
    }

    /// Set the sampling weight. Negative and non-finite weights become 0.
    pub fn with_weight(mut self, weight: f32) -> Self {
        self.weight = clamp_weight(weight);
        self
    }

    /// Whether this triple has the given terms.
    pub fn matches(&self, subject: &str, predicate: &str, object: &str) -> bool {
        &*self.subject == subject && &*self.predicate == predicate && &*self.object == object
    }
}

/// Map a weight into the valid sampling range: finite and non-negative.
pub(crate) fn clamp_weight(weight: f32) -> f32 {
    if weight.is_finite() { weight.max(0.0) } else { 0.0 }
}

impl PartialEq for Triple {
    fn eq(&self, other: &Self) -> bool {
        self.subject == other.subject
            && self.predicate == other.predicate
            && self.object == other.object
    }
}

impl Eq for Triple {}

impl Hash for Triple {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.subject.hash(state);
        self.predicate.hash(state);
        self.object.hash(state);
    }
}

impl std::fmt::Display for Triple {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", self.subject, self.predicate, self.object)
    }
}
