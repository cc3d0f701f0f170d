//! Geometry Relation Finder
//!
//! Classifies each (feature, candidate) pair with the DE-9IM matrix:
//! - **Overlapping**: interiors intersect (non-zero-area overlap)
//! - **Touching**: boundaries meet, interiors do not
//! - **Disjoint**: no contact
//!
//! `find_overlaps` reports every candidate in contact (the set an overlay
//! intersection would return, shared edges included); `find_touching`
//! reports the boundary-only subset. Results are aggregated per UID: since
//! repeat observations share a UID, a UID counts as touching only when none
//! of its geometries overlap the feature's interior.
//!
//! A feature is never compared against itself (identity, not UID, decides).

use crate::models::{Feature, UidSet};
use geo::{BoundingRect, Intersects, MultiPolygon, Relate};
use std::collections::BTreeSet;

/// Spatial relation between two geometries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairRelation {
    Disjoint,
    Touching,
    Overlapping,
}

/// Relation of `a` to `b`
pub fn classify_pair(a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> PairRelation {
    if a.0.is_empty() || b.0.is_empty() {
        return PairRelation::Disjoint;
    }

    // Cheap rejection before building the intersection matrix
    if let (Some(rect_a), Some(rect_b)) = (a.bounding_rect(), b.bounding_rect()) {
        if !rect_a.intersects(&rect_b) {
            return PairRelation::Disjoint;
        }
    }

    let matrix = a.relate(b);
    if matrix.is_touches() {
        PairRelation::Touching
    } else if matrix.is_intersects() {
        PairRelation::Overlapping
    } else {
        PairRelation::Disjoint
    }
}

/// Raw relation sets of one feature against a candidate set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationScan {
    /// UIDs of candidates in any contact (interior or boundary)
    pub overlaps: UidSet,
    /// UIDs whose only contact is along the boundary
    pub touching: UidSet,
}

/// Scan `feature` against `candidates`, skipping `feature` itself
pub fn scan_relations<'a, I>(feature: &Feature, candidates: I) -> RelationScan
where
    I: IntoIterator<Item = &'a Feature>,
{
    let mut overlaps = UidSet::new();
    let mut touching = BTreeSet::new();
    let mut interior = BTreeSet::new();

    for candidate in candidates {
        if std::ptr::eq(candidate, feature) {
            continue;
        }

        match classify_pair(&feature.geometry, &candidate.geometry) {
            PairRelation::Disjoint => {}
            PairRelation::Touching => {
                overlaps.insert(candidate.uid.clone());
                touching.insert(candidate.uid.as_str());
            }
            PairRelation::Overlapping => {
                overlaps.insert(candidate.uid.clone());
                interior.insert(candidate.uid.as_str());
            }
        }
    }

    let touching = touching.difference(&interior).copied().collect();
    RelationScan { overlaps, touching }
}

/// UIDs of candidates in contact with `feature` (boundary contact included)
pub fn find_overlaps<'a, I>(feature: &Feature, candidates: I) -> UidSet
where
    I: IntoIterator<Item = &'a Feature>,
{
    scan_relations(feature, candidates).overlaps
}

/// UIDs of candidates that only touch `feature`'s boundary
pub fn find_touching<'a, I>(feature: &Feature, candidates: I) -> UidSet
where
    I: IntoIterator<Item = &'a Feature>,
{
    scan_relations(feature, candidates).touching
}
