//! Relational joins with an explicit cardinality policy
//!
//! - [`equi_join_first`]: inner equi-join, keep-first-match. A primary
//!   record without a counterpart is dropped; when several secondary records
//!   share a key only the first one encountered is used. Both situations are
//!   counted in the returned [`EquiJoin`] but never reported as errors.
//! - [`distance_join`]: keep-all distance join of one reference geometry
//!   against a candidate set, recording the measured distance of every match.

use geo::{BoundingRect, Distance, Euclidean, MultiPolygon, Rect};
use std::collections::HashMap;
use std::hash::Hash;

use crate::maybe_rayon::*;
use crate::vector::simplify_multipolygon;

// ---------------------------------------------------------------------------
// Equi-join (keep first)
// ---------------------------------------------------------------------------

/// Output of an inner equi-join
#[derive(Debug, Clone)]
pub struct EquiJoin<L, R> {
    /// Matched pairs, in primary order
    pub pairs: Vec<(L, R)>,
    /// Primary records with no counterpart (dropped)
    pub unmatched: usize,
    /// Secondary records ignored because an earlier record had the same key
    pub shadowed: usize,
}

/// Inner equi-join of `primary` against `secondary`, keeping the first
/// secondary record per key.
pub fn equi_join_first<L, R, K, FL, FR>(
    primary: impl IntoIterator<Item = L>,
    secondary: impl IntoIterator<Item = R>,
    left_key: FL,
    right_key: FR,
) -> EquiJoin<L, R>
where
    R: Clone,
    K: Eq + Hash,
    FL: Fn(&L) -> K,
    FR: Fn(&R) -> K,
{
    let mut lookup: HashMap<K, R> = HashMap::new();
    let mut shadowed = 0;
    for record in secondary {
        let key = right_key(&record);
        if lookup.contains_key(&key) {
            shadowed += 1;
        } else {
            lookup.insert(key, record);
        }
    }

    let mut pairs = Vec::new();
    let mut unmatched = 0;
    for record in primary {
        match lookup.get(&left_key(&record)) {
            Some(counterpart) => pairs.push((record, counterpart.clone())),
            None => unmatched += 1,
        }
    }

    EquiJoin {
        pairs,
        unmatched,
        shadowed,
    }
}

// ---------------------------------------------------------------------------
// Distance join (keep all)
// ---------------------------------------------------------------------------

/// One candidate accepted by a distance join
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceMatch {
    /// Index of the candidate in the input order
    pub index: usize,
    /// Measured distance to the reference (0 when they touch or overlap)
    pub distance: f64,
}

/// Find every candidate within `max_distance` of `reference`.
///
/// Distances are measured between geometries simplified with a tolerance of
/// `max_error / 2`, so the measured distance differs from the exact one by
/// at most `max_error`: a candidate whose exact distance is up to
/// `max_distance + max_error` may be accepted, and one whose exact distance
/// is above `max_distance - max_error` may be rejected. With `max_error = 0`
/// the distances are exact.
///
/// Matches are returned in candidate order.
pub fn distance_join(
    reference: &MultiPolygon<f64>,
    candidates: &[&MultiPolygon<f64>],
    max_distance: f64,
    max_error: f64,
) -> Vec<DistanceMatch> {
    let Some(reference_rect) = reference.bounding_rect() else {
        return Vec::new();
    };
    let tolerance = (max_error / 2.0).max(0.0);
    let reference = simplify_multipolygon(reference, tolerance);

    candidates
        .par_iter()
        .enumerate()
        .filter_map(|(index, candidate)| {
            let rect = candidate.bounding_rect()?;
            // Envelope distance never exceeds the true distance
            if rect_distance(&reference_rect, &rect) > max_distance + max_error {
                return None;
            }
            let simplified = simplify_multipolygon(candidate, tolerance);
            let distance = multipolygon_distance(&reference, &simplified)?;
            (distance <= max_distance).then_some(DistanceMatch { index, distance })
        })
        .collect()
}

/// Minimum Euclidean distance between two multipolygons; `None` if either is empty
fn multipolygon_distance(a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> Option<f64> {
    a.0.iter()
        .flat_map(|pa| b.0.iter().map(move |pb| Euclidean::distance(pa, pb)))
        .min_by(|x, y| x.total_cmp(y))
}

fn rect_distance(a: &Rect<f64>, b: &Rect<f64>) -> f64 {
    let dx = (b.min().x - a.max().x).max(a.min().x - b.max().x).max(0.0);
    let dy = (b.min().y - a.max().y).max(a.min().y - b.max().y).max(0.0);
    (dx * dx + dy * dy).sqrt()
}
