//! Leakage-free training subset split
//!
//! Training tiles are centred on features, so two features closer than
//! `2·√2·tile_size` can land in the same tile. Such features are grouped
//! (transitively) and every group goes whole into one subset, so no tile
//! leaks between train, validation and test.
//!
//! # Assignment
//! - Targets: `round(p·n)` features per subset, the rounding remainder going
//!   to the subsets with the largest fractional parts
//! - Groups are assigned largest first by weighted random choice
//! - Subsets that reached their target leave the draw
//! - A draw that would overshoot its target is redrawn (at most twice),
//!   excluding the overshooting subsets
//!
//! The result is deterministic for a given seed.

use crate::models::Feature;
use arts_common::{Error, Result};
use geo::line_measures::Distance;
use geo::{BoundingRect, Euclidean, MultiPolygon, Rect};
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::BTreeMap;
use std::str::FromStr;
use tracing::{debug, info};

const WEIGHT_TOLERANCE: f64 = 1e-6;
const MAX_REDRAWS: usize = 2;

/// A named subset and its share of the features
#[derive(Debug, Clone, PartialEq)]
pub struct SubsetSpec {
    pub name: String,
    pub weight: f64,
}

impl SubsetSpec {
    pub fn new(name: impl Into<String>, weight: f64) -> Self {
        Self {
            name: name.into(),
            weight,
        }
    }
}

impl FromStr for SubsetSpec {
    type Err = Error;

    /// `name=weight`
    fn from_str(s: &str) -> Result<Self> {
        let (name, weight) = s
            .split_once('=')
            .ok_or_else(|| Error::InvalidInput(format!("'{}' is not name=weight", s)))?;
        let weight = weight
            .trim()
            .parse::<f64>()
            .map_err(|_| Error::InvalidInput(format!("'{}' is not a numeric weight", weight)))?;
        Ok(Self::new(name.trim(), weight))
    }
}

/// Outcome of a split
#[derive(Debug, Clone, PartialEq)]
pub struct SplitResult {
    /// Subset name per input feature, in input order
    pub assignments: Vec<String>,
    /// Number of proximity groups
    pub groups: usize,
    /// Target feature count per subset
    pub targets: BTreeMap<String, usize>,
    /// Assigned feature count per subset
    pub counts: BTreeMap<String, usize>,
}

/// Split `features` into `subsets` without tile leakage
pub fn split_with_buffer(
    features: &[Feature],
    subsets: &[SubsetSpec],
    tile_size: f64,
    seed: u64,
) -> Result<SplitResult> {
    validate(subsets, tile_size)?;

    let threshold = 2.0 * std::f64::consts::SQRT_2 * tile_size;
    let mut groups = proximity_groups(features, threshold);
    // Largest first; ties keep first-appearance order
    groups.sort_by(|a, b| b.len().cmp(&a.len()));

    let targets = target_counts(subsets, features.len());
    let mut counts = vec![0usize; subsets.len()];
    let mut assignments = vec![String::new(); features.len()];
    let mut rng = StdRng::seed_from_u64(seed);

    for group in &groups {
        let choice = choose_subset(subsets, &targets, &counts, group.len(), &mut rng)?;
        counts[choice] += group.len();
        for &index in group {
            assignments[index] = subsets[choice].name.clone();
        }
        debug!(size = group.len(), subset = %subsets[choice].name, "Assigned group");
    }

    let by_name = |values: &[usize]| -> BTreeMap<String, usize> {
        subsets
            .iter()
            .zip(values)
            .map(|(s, v)| (s.name.clone(), *v))
            .collect()
    };
    let result = SplitResult {
        assignments,
        groups: groups.len(),
        targets: by_name(&targets),
        counts: by_name(&counts),
    };

    info!(
        features = features.len(),
        groups = result.groups,
        counts = ?result.counts,
        "Training subset split complete"
    );
    Ok(result)
}

fn validate(subsets: &[SubsetSpec], tile_size: f64) -> Result<()> {
    if subsets.is_empty() {
        return Err(Error::InvalidInput("At least one subset is required".to_string()));
    }
    if let Some(bad) = subsets.iter().find(|s| !(s.weight > 0.0)) {
        return Err(Error::InvalidInput(format!(
            "Subset '{}' has non-positive weight {}",
            bad.name, bad.weight
        )));
    }
    let total: f64 = subsets.iter().map(|s| s.weight).sum();
    if (total - 1.0).abs() > WEIGHT_TOLERANCE {
        return Err(Error::InvalidInput(format!(
            "Subset weights sum to {}, expected 1",
            total
        )));
    }
    if !(tile_size > 0.0) {
        return Err(Error::InvalidInput(format!(
            "Tile size must be positive, got {}",
            tile_size
        )));
    }
    Ok(())
}

/// `round(p·n)` per subset, corrected so the targets sum to `n`
fn target_counts(subsets: &[SubsetSpec], n: usize) -> Vec<usize> {
    let exact: Vec<f64> = subsets.iter().map(|s| s.weight * n as f64).collect();
    let mut targets: Vec<usize> = exact.iter().map(|e| e.round() as usize).collect();

    let mut by_fraction: Vec<usize> = (0..subsets.len()).collect();
    by_fraction.sort_by(|&a, &b| exact[b].fract().total_cmp(&exact[a].fract()));

    let assigned: usize = targets.iter().sum();
    if assigned < n {
        for &i in by_fraction.iter().cycle().take(n - assigned) {
            targets[i] += 1;
        }
    } else if assigned > n {
        let decrement: Vec<usize> = by_fraction
            .iter()
            .rev()
            .copied()
            .filter(|&i| targets[i] > 0)
            .take(assigned - n)
            .collect();
        for i in decrement {
            targets[i] -= 1;
        }
    }
    targets
}

fn choose_subset(
    subsets: &[SubsetSpec],
    targets: &[usize],
    counts: &[usize],
    group_size: usize,
    rng: &mut StdRng,
) -> Result<usize> {
    let mut open: Vec<usize> = (0..subsets.len())
        .filter(|&i| counts[i] < targets[i])
        .collect();
    if open.is_empty() {
        open = (0..subsets.len()).collect();
    }

    let mut choice = draw(subsets, &open, rng)?;
    for _ in 0..MAX_REDRAWS {
        if counts[choice] + group_size <= targets[choice] {
            break;
        }
        open.retain(|&i| i != choice);
        if open.is_empty() {
            break;
        }
        choice = draw(subsets, &open, rng)?;
    }
    Ok(choice)
}

fn draw(subsets: &[SubsetSpec], candidates: &[usize], rng: &mut StdRng) -> Result<usize> {
    let weights = candidates.iter().map(|&i| subsets[i].weight);
    let dist = WeightedIndex::new(weights)
        .map_err(|e| Error::Internal(format!("Invalid subset weights: {}", e)))?;
    Ok(candidates[dist.sample(rng)])
}

/// Transitive groups of features within `threshold` of each other
fn proximity_groups(features: &[Feature], threshold: f64) -> Vec<Vec<usize>> {
    let rects: Vec<Option<Rect<f64>>> = features.iter().map(|f| f.geometry.bounding_rect()).collect();
    let mut parent: Vec<usize> = (0..features.len()).collect();

    for i in 0..features.len() {
        for j in (i + 1)..features.len() {
            let (Some(a), Some(b)) = (rects[i], rects[j]) else {
                continue;
            };
            if rect_gap(&a, &b) > threshold {
                continue;
            }
            if geometry_distance(&features[i].geometry, &features[j].geometry) <= threshold {
                union(&mut parent, i, j);
            }
        }
    }

    let mut groups: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for i in 0..features.len() {
        let root = find(&mut parent, i);
        groups.entry(root).or_default().push(i);
    }
    let mut groups: Vec<Vec<usize>> = groups.into_values().collect();
    groups.sort_by_key(|g| g[0]);
    groups
}

fn rect_gap(a: &Rect<f64>, b: &Rect<f64>) -> f64 {
    let dx = (b.min().x - a.max().x).max(a.min().x - b.max().x).max(0.0);
    let dy = (b.min().y - a.max().y).max(a.min().y - b.max().y).max(0.0);
    dx.hypot(dy)
}

fn geometry_distance(a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> f64 {
    a.0.iter()
        .flat_map(|pa| b.0.iter().map(move |pb| Euclidean.distance(pa, pb)))
        .fold(f64::INFINITY, f64::min)
}

fn find(parent: &mut [usize], mut i: usize) -> usize {
    while parent[i] != i {
        parent[i] = parent[parent[i]];
        i = parent[i];
    }
    i
}

fn union(parent: &mut [usize], a: usize, b: usize) {
    let (ra, rb) = (find(parent, a), find(parent, b));
    if ra != rb {
        parent[ra.max(rb)] = ra.min(rb);
    }
}
