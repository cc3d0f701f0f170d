//! Adjacency Filter
//!
//! Overlay routines report polygons sharing only an edge as zero-area
//! intersections. Those are adjacency, not overlap, and must not reach
//! human review.

use crate::models::UidSet;

/// `overlap_uids − touching_uids`
pub fn true_overlaps(overlap_uids: &UidSet, touching_uids: &UidSet) -> UidSet {
    overlap_uids.difference(touching_uids)
}
