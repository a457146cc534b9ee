//! Traversal primitives shared by every walk mode.
//!
//! A step picks one triple out of a candidate list, either uniformly or
//! proportionally to triple weight. Mid-walk steps additionally pick a
//! direction: extend the walk's tail along an outgoing edge, or its head
//! along an incoming edge.

use std::sync::Arc;

use rand::Rng;
use rand::seq::SliceRandom;

use crate::graph::Triple;

/// How a step chooses among candidate triples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pick {
    /// Every candidate is equally likely.
    Uniform,
    /// Probability proportional to [`Triple::weight`].
    Weighted,
}

/// Which end of a mid-walk a step extends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Append predicate and object at the tail.
    Forward,
    /// Prepend subject and predicate at the head.
    Backward,
}

/// Choose one candidate, or `None` if there are none.
pub fn choose<'a, R: Rng>(
    candidates: &'a [Arc<Triple>],
    pick: Pick,
    rng: &mut R,
) -> Option<&'a Arc<Triple>> {
    match pick {
        Pick::Uniform => candidates.choose(rng),
        Pick::Weighted => choose_weighted(candidates, rng),
    }
}

/// Inverse-CDF draw over candidate weights.
///
/// Candidates are scanned in insertion order, so equal weights resolve to
/// the earlier triple for the same draw. Zero-weight candidates are never
/// chosen unless every weight is zero, in which case the draw is uniform.
pub fn choose_weighted<'a, R: Rng>(
    candidates: &'a [Arc<Triple>],
    rng: &mut R,
) -> Option<&'a Arc<Triple>> {
    let total = total_weight(candidates);
    if total <= 0.0 {
        return candidates.choose(rng);
    }

    let target = rng.r#gen::<f64>() * total;
    let mut cumulative = 0.0;
    for triple in candidates {
        cumulative += f64::from(triple.weight);
        if target < cumulative {
            return Some(triple);
        }
    }
    // Rounding can leave `target` at the very top of the range.
    candidates.iter().rev().find(|t| t.weight > 0.0)
}

/// Sum of candidate weights.
pub fn total_weight(candidates: &[Arc<Triple>]) -> f64 {
    candidates.iter().map(|t| f64::from(t.weight)).sum()
}

/// One mid-walk step: pick a direction, then a triple on that side.
///
/// `outgoing` are the tail entity's triples as subject, `incoming` the head
/// entity's triples as object. With [`Pick::Uniform`] both directions are
/// equally likely and an empty side defers to the other. With
/// [`Pick::Weighted`] the direction is proportional to each side's total
/// weight (or to the candidate counts when all weights are zero).
pub fn mid_step<R: Rng>(
    outgoing: &[Arc<Triple>],
    incoming: &[Arc<Triple>],
    pick: Pick,
    rng: &mut R,
) -> Option<(Direction, Arc<Triple>)> {
    let direction = match (outgoing.is_empty(), incoming.is_empty()) {
        (true, true) => return None,
        (false, true) => Direction::Forward,
        (true, false) => Direction::Backward,
        (false, false) => match pick {
            Pick::Uniform => {
                if rng.gen_bool(0.5) {
                    Direction::Forward
                } else {
                    Direction::Backward
                }
            }
            Pick::Weighted => weighted_direction(outgoing, incoming, rng),
        },
    };

    let candidates = match direction {
        Direction::Forward => outgoing,
        Direction::Backward => incoming,
    };
    choose(candidates, pick, rng).map(|t| (direction, Arc::clone(t)))
}

fn weighted_direction<R: Rng>(
    outgoing: &[Arc<Triple>],
    incoming: &[Arc<Triple>],
    rng: &mut R,
) -> Direction {
    let forward = total_weight(outgoing);
    let backward = total_weight(incoming);
    let go_forward = if forward + backward <= 0.0 {
        rng.gen_range(0..outgoing.len() + incoming.len()) < outgoing.len()
    } else {
        rng.r#gen::<f64>() * (forward + backward) < forward
    };
    if go_forward {
        Direction::Forward
    } else {
        Direction::Backward
    }
}
