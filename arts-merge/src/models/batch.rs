//! Feature collections: submitted batches and the main dataset

use super::feature::Feature;
use super::relations::UidSet;
use std::collections::{BTreeSet, HashMap};

/// Ordered collection of features submitted together
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    pub features: Vec<Feature>,
}

impl Batch {
    pub fn new(features: Vec<Feature>) -> Self {
        Self { features }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Feature> {
        self.features.iter()
    }

    /// UIDs appearing on more than one feature
    pub fn duplicated_uids(&self) -> BTreeSet<String> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for feature in &self.features {
            *counts.entry(feature.uid.as_str()).or_insert(0) += 1;
        }
        counts
            .into_iter()
            .filter(|(_, count)| *count > 1)
            .map(|(uid, _)| uid.to_string())
            .collect()
    }

    /// Features with at least one detected overlap
    pub fn overlapping(&self) -> Vec<&Feature> {
        self.features
            .iter()
            .filter(|f| f.relations.has_detections())
            .collect()
    }

    /// Union of one relation field over every feature
    pub fn collect_relation(&self, field: super::RelationField) -> UidSet {
        self.features
            .iter()
            .fold(UidSet::new(), |acc, f| acc.union(f.relations.get(field)))
    }
}

impl From<Vec<Feature>> for Batch {
    fn from(features: Vec<Feature>) -> Self {
        Self::new(features)
    }
}

/// Authoritative collection of all accepted features
///
/// Read-only during a run; replaced wholesale when a batch is appended.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MainDataset {
    pub features: Vec<Feature>,
}

impl MainDataset {
    pub fn new(features: Vec<Feature>) -> Self {
        Self { features }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Feature> {
        self.features.iter()
    }

    /// Append a reconciled batch
    pub fn append(&mut self, batch: Batch) {
        self.features.extend(batch.features);
    }
}
