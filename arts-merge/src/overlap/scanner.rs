//! Cross-Batch and Self-Overlap Scanners
//!
//! Both scanners run the relation finder and adjacency filter for every
//! batch feature and write the result to one relation field:
//! - cross-batch: candidates are the main dataset → `Intersections`
//! - self: candidates are the other batch features → `SelfIntersections`
//!
//! Scans read geometries and UIDs only. The self scan computes every result
//! from the batch as submitted before writing any of them, so iteration
//! order cannot influence the outcome.

use super::adjacency::true_overlaps;
use super::relation_finder::scan_relations;
use crate::models::{Batch, Feature, MainDataset, RelationField, UidSet};
use tracing::{debug, info};

/// Counts reported by one scan pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    /// Features scanned
    pub scanned: usize,
    /// Features with at least one true overlap
    pub features_with_overlaps: usize,
    /// Total UIDs recorded across all features
    pub relations: usize,
}

/// True overlaps of `feature` against `candidates`
///
/// The feature's own UID is never listed, even when a candidate shares it.
pub fn overlaps_against<'a, I>(feature: &Feature, candidates: I) -> UidSet
where
    I: IntoIterator<Item = &'a Feature>,
{
    let scan = scan_relations(feature, candidates);
    true_overlaps(&scan.overlaps, &scan.touching).without(&feature.uid)
}

/// Populate `Intersections` of every batch feature against the main dataset
pub fn scan_cross_batch(batch: &mut Batch, main: &MainDataset) -> ScanSummary {
    let results: Vec<UidSet> = batch
        .features
        .iter()
        .map(|feature| overlaps_against(feature, main.iter()))
        .collect();

    let summary = write_results(batch, results, RelationField::Intersections);
    info!(
        scanned = summary.scanned,
        main_features = main.len(),
        overlapping = summary.features_with_overlaps,
        relations = summary.relations,
        "Cross-batch overlap scan complete"
    );
    summary
}

/// Populate `SelfIntersections` of every batch feature against its siblings
pub fn scan_self(batch: &mut Batch) -> ScanSummary {
    let results: Vec<UidSet> = batch
        .features
        .iter()
        .map(|feature| overlaps_against(feature, batch.features.iter()))
        .collect();

    let summary = write_results(batch, results, RelationField::SelfIntersections);
    info!(
        scanned = summary.scanned,
        overlapping = summary.features_with_overlaps,
        relations = summary.relations,
        "Self-overlap scan complete"
    );
    summary
}

fn write_results(batch: &mut Batch, results: Vec<UidSet>, field: RelationField) -> ScanSummary {
    let mut summary = ScanSummary {
        scanned: batch.len(),
        ..Default::default()
    };

    for (feature, result) in batch.features.iter_mut().zip(results) {
        if !result.is_empty() {
            debug!(uid = %feature.uid, field = field.column(), related = %result, "Overlap detected");
            summary.features_with_overlaps += 1;
            summary.relations += result.len();
        }
        feature.relations.set(field, result);
    }

    summary
}
