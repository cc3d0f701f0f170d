//! Classification Completeness Checker
//!
//! Every UID a scan detected must be classified by the reviewer before a
//! batch may merge.
//!
//! # Rule
//! For each feature:
//! - `detected = Intersections ∪ SelfIntersections`
//! - `classified = RepeatRTS ∪ RepeatNegative ∪ StabilizedRTS ∪ NewRTS ∪
//!   MergedRTS ∪ SplitRTS ∪ AccidentalOverlap ∪ UnknownRelationship`
//! - `unclassified = detected − classified`
//!
//! **Self-reference shortcut:** when a feature's own UID appears more than
//! once in the batch, its self-intersections are repeat observations of one
//! slump and need no classification.
//!
//! Rows that came only from the review file (no geometry) can never merge and
//! are always reported.

use crate::models::{Batch, Feature, UidSet};
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{info, warn};

/// Why a feature failed the check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ViolationKind {
    /// Detected overlaps without a classification
    Unclassified,
    /// Review row with no matching batch feature
    MissingGeometry,
}

/// One incomplete feature
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// Position in the batch
    pub index: usize,
    pub uid: String,
    /// Detected UIDs with no classification
    pub unclassified: UidSet,
    pub kind: ViolationKind,
}

/// Outcome of one completeness check
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CompletenessReport {
    /// Features checked
    pub checked: usize,
    pub violations: Vec<Violation>,
}

impl CompletenessReport {
    pub fn is_complete(&self) -> bool {
        self.violations.is_empty()
    }

    /// Batch indices of incomplete features
    pub fn indices(&self) -> Vec<usize> {
        self.violations.iter().map(|v| v.index).collect()
    }
}

/// Detected UIDs of `feature` not covered by a classification
pub fn unclassified(feature: &Feature, duplicated: &BTreeSet<String>) -> UidSet {
    let relations = &feature.relations;
    let detected = if duplicated.contains(&feature.uid) {
        relations.intersections.clone()
    } else {
        relations.detected()
    };
    detected.difference(&relations.classified())
}

/// Check every feature of `batch`
pub fn check_complete(batch: &Batch) -> CompletenessReport {
    let duplicated = batch.duplicated_uids();

    let violations: Vec<Violation> = batch
        .iter()
        .enumerate()
        .filter_map(|(index, feature)| {
            let missing = unclassified(feature, &duplicated);
            let kind = if !feature.has_geometry() {
                ViolationKind::MissingGeometry
            } else if !missing.is_empty() {
                ViolationKind::Unclassified
            } else {
                return None;
            };
            Some(Violation {
                index,
                uid: feature.uid.clone(),
                unclassified: missing,
                kind,
            })
        })
        .collect();

    for violation in &violations {
        warn!(
            index = violation.index,
            uid = %violation.uid,
            kind = ?violation.kind,
            unclassified = %violation.unclassified,
            "Incomplete intersection information"
        );
    }

    let report = CompletenessReport {
        checked: batch.len(),
        violations,
    };

    if report.is_complete() {
        info!(checked = report.checked, "Intersection information is complete");
    } else {
        warn!(
            checked = report.checked,
            incomplete = report.violations.len(),
            "Intersection information is incomplete"
        );
    }

    report
}
