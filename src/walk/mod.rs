//! Walk sampling: randomized traversal from a seed entity.
//!
//! One [`WalkSampler`] covers every mode. The mode only decides which
//! primitives from [`step`] are used and whether repeated walks are
//! rejected:
//!
//! - [`WalkMode::Random`]: independent forward walks, duplicates allowed
//! - [`WalkMode::RandomDuplicateFree`]: forward walks, repeats rejected
//! - [`WalkMode::Mid`]: the seed sits inside the walk, extended both ways
//! - [`WalkMode::WeightedMid`]: mid walks with weight-proportional choices
//!
//! A walk is at most `depth` hops long, i.e. at most `2 * depth + 1`
//! space-separated tokens alternating entity and predicate.

pub mod shorten;
pub mod step;

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::SamplerError;
use crate::graph::index::TripleStore;
use crate::select::SelectionScope;

use step::{Direction, Pick};

/// Attempts per requested walk before duplicate-free sampling gives up.
pub const DUPLICATE_FREE_ATTEMPT_FACTOR: usize = 100;

/// Walk generation strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WalkMode {
    /// Uniform forward walks; the same walk may be emitted twice.
    Random,
    /// Uniform forward walks without repeats per entity.
    #[default]
    RandomDuplicateFree,
    /// Walks with the seed in the interior.
    Mid,
    /// Mid walks with weight-proportional direction and edge choice.
    WeightedMid,
}

impl WalkMode {
    /// All modes, in declaration order.
    pub const ALL: [WalkMode; 4] = [
        WalkMode::Random,
        WalkMode::RandomDuplicateFree,
        WalkMode::Mid,
        WalkMode::WeightedMid,
    ];

    /// Whether walks extend backwards along incoming edges.
    pub fn is_mid(self) -> bool {
        matches!(self, WalkMode::Mid | WalkMode::WeightedMid)
    }

    /// Edge choice used by this mode.
    pub fn pick(self) -> Pick {
        match self {
            WalkMode::WeightedMid => Pick::Weighted,
            _ => Pick::Uniform,
        }
    }

    /// Entities worth seeding: forward modes need outgoing edges, mid modes
    /// can start from objects too.
    pub fn default_scope(self) -> SelectionScope {
        if self.is_mid() {
            SelectionScope::SubjectsAndObjects
        } else {
            SelectionScope::Subjects
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            WalkMode::Random => "random",
            WalkMode::RandomDuplicateFree => "random_duplicate_free",
            WalkMode::Mid => "mid",
            WalkMode::WeightedMid => "weighted_mid",
        }
    }
}

impl std::fmt::Display for WalkMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for WalkMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        WalkMode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == normalized)
            .ok_or_else(|| {
                format!(
                    "unknown walk mode \"{s}\" (expected one of: random, random_duplicate_free, mid, weighted_mid)"
                )
            })
    }
}

/// Per-entity sampling parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplerConfig {
    pub mode: WalkMode,
    /// Target number of walks per entity.
    pub walks_per_entity: usize,
    /// Maximum hops per walk.
    pub depth: usize,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            mode: WalkMode::default(),
            walks_per_entity: 100,
            depth: 4,
        }
    }
}

/// Produces the walks for one entity. Implemented by [`WalkSampler`]; the
/// worker pool only depends on this trait.
pub trait WalkGenerator: Send + Sync {
    /// Generate walks for `entity` using the task's private RNG.
    fn walks_for(&self, entity: &str, rng: &mut StdRng) -> Result<Vec<String>, SamplerError>;

    /// Walks requested per entity, used to report under-filled entities.
    fn requested_walks(&self) -> usize;
}

/// Build the RNG for one entity's task.
///
/// With a seed, the RNG is seeded from a BLAKE3 digest of `(seed, entity)`,
/// so output does not depend on thread count, scheduling, or the Rust
/// release. `StdRng`'s algorithm is only fixed within one `rand` release.
/// Without a seed the RNG is seeded from the OS.
pub fn entity_rng(seed: Option<u64>, entity: &str) -> StdRng {
    match seed {
        Some(seed) => {
            let mut hasher = blake3::Hasher::new();
            hasher.update(&seed.to_le_bytes());
            hasher.update(entity.as_bytes());
            StdRng::from_seed(*hasher.finalize().as_bytes())
        }
        None => StdRng::from_entropy(),
    }
}

/// Samples walks from a shared, read-only [`TripleStore`].
#[derive(Debug, Clone)]
pub struct WalkSampler {
    store: Arc<TripleStore>,
    config: SamplerConfig,
}

impl WalkSampler {
    pub fn new(store: Arc<TripleStore>, config: SamplerConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<TripleStore> {
        &self.store
    }

    /// Generate up to `number_of_walks` walks of at most `depth` hops from `entity`.
    ///
    /// Returns an empty list when the entity has no usable edges. A walk that
    /// never left its seed is not emitted.
    pub fn generate_walks_for_entity<R: Rng>(
        &self,
        entity: &str,
        number_of_walks: usize,
        depth: usize,
        rng: &mut R,
    ) -> Vec<String> {
        let mode = self.config.mode;
        let reachable = if mode.is_mid() {
            self.store.out_degree(entity) + self.store.in_degree(entity)
        } else {
            self.store.out_degree(entity)
        };
        if reachable == 0 || number_of_walks == 0 || depth == 0 {
            return Vec::new();
        }

        let seed: Arc<str> = Arc::from(entity);
        match mode {
            WalkMode::Random => (0..number_of_walks)
                .filter_map(|_| self.forward_walk(&seed, depth, mode.pick(), rng))
                .collect(),
            WalkMode::RandomDuplicateFree => {
                self.duplicate_free_walks(&seed, number_of_walks, depth, rng)
            }
            WalkMode::Mid | WalkMode::WeightedMid => (0..number_of_walks)
                .filter_map(|_| self.mid_walk(&seed, depth, mode.pick(), rng))
                .collect(),
        }
    }

    fn duplicate_free_walks<R: Rng>(
        &self,
        seed: &Arc<str>,
        number_of_walks: usize,
        depth: usize,
        rng: &mut R,
    ) -> Vec<String> {
        let max_attempts = number_of_walks.saturating_mul(DUPLICATE_FREE_ATTEMPT_FACTOR);
        let mut corpus: HashSet<String> = HashSet::with_capacity(number_of_walks);
        let mut walks = Vec::with_capacity(number_of_walks);
        let mut attempts = 0;

        while walks.len() < number_of_walks && attempts < max_attempts {
            attempts += 1;
            let Some(walk) = self.forward_walk(seed, depth, Pick::Uniform, rng) else {
                break;
            };
            if !corpus.contains(&walk) {
                corpus.insert(walk.clone());
                walks.push(walk);
            }
        }

        if walks.len() < number_of_walks {
            tracing::debug!(
                entity = %seed,
                requested = number_of_walks,
                generated = walks.len(),
                attempts,
                "duplicate-free walks exhausted"
            );
        }
        walks
    }

    /// Follow outgoing edges for up to `depth` hops.
    fn forward_walk<R: Rng>(
        &self,
        seed: &Arc<str>,
        depth: usize,
        pick: Pick,
        rng: &mut R,
    ) -> Option<String> {
        let mut tokens: Vec<Arc<str>> = Vec::with_capacity(2 * depth + 1);
        tokens.push(Arc::clone(seed));
        let mut current = Arc::clone(seed);

        for _ in 0..depth {
            let next = self
                .store
                .with_outgoing(&current, |triples| step::choose(triples, pick, rng).cloned());
            let Some(triple) = next else {
                break;
            };
            tokens.push(Arc::clone(&triple.predicate));
            tokens.push(Arc::clone(&triple.object));
            current = Arc::clone(&triple.object);
        }

        (tokens.len() > 1).then(|| join_tokens(&tokens))
    }

    /// Spend `depth` hops extending either end of the walk.
    fn mid_walk<R: Rng>(
        &self,
        seed: &Arc<str>,
        depth: usize,
        pick: Pick,
        rng: &mut R,
    ) -> Option<String> {
        let mut tokens: VecDeque<Arc<str>> = VecDeque::with_capacity(2 * depth + 1);
        tokens.push_back(Arc::clone(seed));
        let mut head = Arc::clone(seed);
        let mut tail = Arc::clone(seed);

        for _ in 0..depth {
            let next = self.store.with_outgoing(&tail, |outgoing| {
                self.store
                    .with_incoming(&head, |incoming| step::mid_step(outgoing, incoming, pick, rng))
            });
            match next {
                Some((Direction::Forward, triple)) => {
                    tokens.push_back(Arc::clone(&triple.predicate));
                    tokens.push_back(Arc::clone(&triple.object));
                    tail = Arc::clone(&triple.object);
                }
                Some((Direction::Backward, triple)) => {
                    tokens.push_front(Arc::clone(&triple.predicate));
                    tokens.push_front(Arc::clone(&triple.subject));
                    head = Arc::clone(&triple.subject);
                }
                None => break,
            }
        }

        (tokens.len() > 1).then(|| join_tokens(&tokens))
    }
}

impl WalkGenerator for WalkSampler {
    fn walks_for(&self, entity: &str, rng: &mut StdRng) -> Result<Vec<String>, SamplerError> {
        Ok(self.generate_walks_for_entity(
            entity,
            self.config.walks_per_entity,
            self.config.depth,
            rng,
        ))
    }

    fn requested_walks(&self) -> usize {
        self.config.walks_per_entity
    }
}

fn join_tokens<'a>(tokens: impl IntoIterator<Item = &'a Arc<str>> + Clone) -> String {
    let len: usize = tokens.clone().into_iter().map(|t| t.len() + 1).sum();
    let mut walk = String::with_capacity(len);
    for (i, token) in tokens.into_iter().enumerate() {
        if i > 0 {
            walk.push(' ');
        }
        walk.push_str(token);
    }
    walk
}
