//! Merge Reconciler
//!
//! Folds the reviewer's classification file back into the batch, rewrites
//! UIDs of repeat observations to their canonical value and stamps the
//! contribution date.
//!
//! # Join
//! Outer join on every column shared by the batch and the review file,
//! excluding geometry and relation columns. Matching is one-to-one in file
//! order. Matched features take their classification fields from the review
//! row; detection fields always come from the scan. Review rows with no
//! matching batch feature are kept without geometry so the completeness
//! checker reports them.
//!
//! # UID rewrite
//! For every feature whose `RepeatRTS` is non-empty:
//! 1. `RepeatRTS ∩ Intersections` non-empty: adopt the earliest main-dataset
//!    UID among them
//! 2. otherwise `RepeatRTS ∩ SelfIntersections` non-empty: adopt the UID the
//!    identity resolver picks over the batch and main dataset
//! 3. otherwise leave the UID alone and warn
//!
//! Rewrites are decided from the batch as it stood before any rewrite, then
//! each decided UID is followed through the other decisions until it stops
//! changing, so a feature never adopts a UID that was itself rewritten.

use crate::identity_resolver::{resolve_group, resolve_uid};
use crate::io::schema::{feature_to_properties, value_key};
use crate::io::FeatureFile;
use crate::models::{Batch, Feature, MainDataset, RelationField};
use arts_common::{Error, Result};
use chrono::NaiveDate;
use geo::MultiPolygon;
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::{debug, info, warn};

/// Merge Reconciler
#[derive(Debug, Clone)]
pub struct MergeReconciler {
    /// Stamped on every accepted feature
    contribution_date: NaiveDate,
}

impl MergeReconciler {
    pub fn new(contribution_date: NaiveDate) -> Self {
        Self { contribution_date }
    }

    /// Join + reconcile
    pub fn merge(
        &self,
        batch: Batch,
        batch_columns: &BTreeSet<String>,
        review: Option<&FeatureFile>,
        main: &MainDataset,
    ) -> Result<Batch> {
        let joined = self.join(batch, batch_columns, review)?;
        Ok(self.reconcile(joined, main))
    }

    /// Outer join of the batch with the review file
    pub fn join(
        &self,
        batch: Batch,
        batch_columns: &BTreeSet<String>,
        review: Option<&FeatureFile>,
    ) -> Result<Batch> {
        let Some(review) = review else {
            warn!(
                features = batch.len(),
                "No classification file found; assuming no classifications are needed"
            );
            return Ok(batch);
        };

        let keys = join_keys(batch_columns, &review.columns);
        if keys.is_empty() {
            return Err(Error::InvalidInput(
                "Classification file shares no key columns with the batch".to_string(),
            ));
        }
        debug!(keys = ?keys, review_rows = review.features.len(), "Joining classification file");

        let review_keys: Vec<Vec<String>> = review
            .features
            .iter()
            .map(|f| row_key(f, &keys))
            .collect();
        let mut used = vec![false; review.features.len()];

        let batch_len = batch.len();
        let mut joined = Vec::with_capacity(batch_len + review.features.len());
        let mut matched = 0usize;

        for mut feature in batch.features {
            let key = row_key(&feature, &keys);
            let found = review_keys
                .iter()
                .enumerate()
                .find(|(i, k)| !used[*i] && **k == key)
                .map(|(i, _)| i);

            if let Some(i) = found {
                used[i] = true;
                matched += 1;
                apply_review_row(&mut feature, &review.features[i]);
            }
            joined.push(feature);
        }

        for (i, row) in review.features.iter().enumerate().filter(|(i, _)| !used[*i]) {
            warn!(row = i, uid = %row.uid, "Classification row matches no batch feature");
            let mut orphan = row.clone();
            orphan.geometry = MultiPolygon(vec![]);
            joined.push(orphan);
        }

        info!(
            matched,
            unmatched_batch = batch_len - matched,
            unmatched_review = review.features.len() - matched,
            "Classification file joined"
        );

        Ok(Batch::new(joined))
    }

    /// Rewrite repeat-observation UIDs and stamp the contribution date
    pub fn reconcile(&self, mut batch: Batch, main: &MainDataset) -> Batch {
        let decisions: Vec<Option<String>> = batch
            .features
            .iter()
            .map(|f| canonical_uid(f, &batch.features, main))
            .collect();

        // A UID another feature adopted may itself be rewritten
        let mut renamed: HashMap<&str, &str> = HashMap::new();
        for (feature, decision) in batch.features.iter().zip(&decisions) {
            if let Some(canonical) = decision.as_deref().filter(|c| *c != feature.uid) {
                renamed.entry(feature.uid.as_str()).or_insert(canonical);
            }
        }

        let resolved: Vec<Option<String>> = decisions
            .iter()
            .map(|d| d.as_deref().map(|uid| follow_renames(uid, &renamed)))
            .collect();

        let mut rewritten = 0usize;
        for (feature, canonical) in batch.features.iter_mut().zip(resolved) {
            if let Some(canonical) = canonical {
                if canonical != feature.uid {
                    info!(from = %feature.uid, to = %canonical, "Rewriting UID of repeat observation");
                    feature.uid = canonical;
                    rewritten += 1;
                }
            }
            feature.metadata.contribution_date = Some(self.contribution_date);
        }

        info!(
            features = batch.len(),
            rewritten,
            contribution_date = %self.contribution_date,
            "Batch reconciled"
        );
        batch
    }
}

/// Canonical UID decided for one snapshot feature, if any rule applies
fn canonical_uid(feature: &Feature, snapshot: &[Feature], main: &MainDataset) -> Option<String> {
    let relations = &feature.relations;
    if relations.repeat_rts.is_empty() {
        return None;
    }

    let cross = relations.repeat_rts.intersection(&relations.intersections);
    if !cross.is_empty() {
        return resolve_group(&cross, main.iter()).or_else(|| cross.iter().next().cloned());
    }

    let siblings = relations.repeat_rts.intersection(&relations.self_intersections);
    if !siblings.is_empty() {
        return Some(resolve_uid(feature, snapshot.iter().chain(main.iter())));
    }

    warn!(
        uid = %feature.uid,
        repeat_rts = %relations.repeat_rts,
        "RepeatRTS lists no detected overlap; UID left unchanged"
    );
    None
}

/// Follow rewrites from `uid` until it reaches a UID nothing renames
fn follow_renames(uid: &str, renamed: &HashMap<&str, &str>) -> String {
    let mut current = uid;
    let mut seen = HashSet::from([uid]);
    while let Some(&next) = renamed.get(current) {
        if !seen.insert(next) {
            warn!(uid, "Cyclic UID rewrites; stopping at {}", current);
            break;
        }
        current = next;
    }
    current.to_string()
}

/// Shared non-geometry, non-relation columns
fn join_keys(left: &BTreeSet<String>, right: &BTreeSet<String>) -> Vec<String> {
    left.intersection(right)
        .filter(|c| RelationField::from_column(c).is_none())
        .cloned()
        .collect()
}

fn row_key(feature: &Feature, keys: &[String]) -> Vec<String> {
    let properties = feature_to_properties(feature);
    keys.iter()
        .map(|k| properties.get(k).map(value_key).unwrap_or_default())
        .collect()
}

fn apply_review_row(feature: &mut Feature, row: &Feature) {
    for field in RelationField::CLASSIFICATIONS
        .into_iter()
        .chain(std::iter::once(RelationField::FalseNegative))
    {
        feature.relations.set(field, row.relations.get(field).clone());
    }
    for (key, value) in &row.extra {
        feature
            .extra
            .entry(key.clone())
            .or_insert_with(|| value.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UidSet;
    use arts_common::time::parse_date;
    use geo::polygon;

    fn date(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    fn square(uid: &str, x: f64) -> Feature {
        Feature::new(
            uid,
            MultiPolygon(vec![polygon![
                (x: x, y: 0.0),
                (x: x + 2.0, y: 0.0),
                (x: x + 2.0, y: 2.0),
                (x: x, y: 2.0),
            ]]),
        )
    }

    fn columns(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|c| c.to_string()).collect()
    }

    fn review(features: Vec<Feature>, names: &[&str]) -> FeatureFile {
        FeatureFile {
            columns: columns(names),
            features,
            ..Default::default()
        }
    }

    #[test]
    fn test_no_review_file_keeps_batch() {
        let reconciler = MergeReconciler::new(date("2024-05-01"));
        let batch = Batch::new(vec![square("x", 0.0)]);
        let merged = reconciler
            .merge(batch.clone(), &columns(&["UID"]), None, &MainDataset::default())
            .unwrap();

        assert_eq!(merged.len(), 1);
        assert_eq!(merged.features[0].uid, "x");
        assert_eq!(merged.features[0].metadata.contribution_date, Some(date("2024-05-01")));
    }

    #[test]
    fn test_join_copies_classifications() {
        let mut y = square("y", 0.0);
        y.relations.intersections = UidSet::parse("z");
        let mut row = square("y", 0.0);
        row.relations.intersections = UidSet::parse("stale");
        row.relations.repeat_rts = UidSet::parse("z");
        row.extra.insert("ReviewNote".to_string(), "same slump".into());

        let reconciler = MergeReconciler::new(date("2024-05-01"));
        let joined = reconciler
            .join(
                Batch::new(vec![y]),
                &columns(&["UID", "Intersections"]),
                Some(&review(vec![row], &["UID", "Intersections", "RepeatRTS"])),
            )
            .unwrap();

        let f = &joined.features[0];
        assert_eq!(f.relations.repeat_rts, UidSet::parse("z"));
        assert_eq!(f.relations.intersections, UidSet::parse("z"));
        assert_eq!(f.extra["ReviewNote"], "same slump");
    }

    #[test]
    fn test_outer_join_keeps_both_sides() {
        let reconciler = MergeReconciler::new(date("2024-05-01"));
        let joined = reconciler
            .join(
                Batch::new(vec![square("a", 0.0)]),
                &columns(&["UID"]),
                Some(&review(vec![square("b", 5.0)], &["UID"])),
            )
            .unwrap();

        assert_eq!(joined.len(), 2);
        assert!(joined.features[0].has_geometry());
        assert_eq!(joined.features[1].uid, "b");
        assert!(!joined.features[1].has_geometry());
    }

    #[test]
    fn test_duplicate_keys_match_one_to_one() {
        let mut row1 = square("a", 0.0);
        row1.relations.new_rts = UidSet::parse("p");
        let mut row2 = square("a", 0.0);
        row2.relations.new_rts = UidSet::parse("q");

        let reconciler = MergeReconciler::new(date("2024-05-01"));
        let joined = reconciler
            .join(
                Batch::new(vec![square("a", 0.0), square("a", 4.0)]),
                &columns(&["UID"]),
                Some(&review(vec![row1, row2], &["UID", "NewRTS"])),
            )
            .unwrap();

        assert_eq!(joined.len(), 2);
        assert_eq!(joined.features[0].relations.new_rts, UidSet::parse("p"));
        assert_eq!(joined.features[1].relations.new_rts, UidSet::parse("q"));
    }

    #[test]
    fn test_no_shared_keys_rejected() {
        let reconciler = MergeReconciler::new(date("2024-05-01"));
        let err = reconciler
            .join(
                Batch::new(vec![square("a", 0.0)]),
                &columns(&["UID"]),
                Some(&review(vec![], &["RepeatRTS"])),
            )
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_repeat_of_main_feature_adopts_main_uid() {
        let mut z = square("Z_UID", 0.0);
        z.metadata.contribution_date = Some(date("2022-01-01"));
        let main = MainDataset::new(vec![z]);

        let mut y = square("Y_UID", 1.0);
        y.relations.intersections = UidSet::parse("Z_UID");
        y.relations.repeat_rts = UidSet::parse("Z_UID");

        let reconciler = MergeReconciler::new(date("2024-05-01"));
        let out = reconciler.reconcile(Batch::new(vec![y]), &main);

        assert_eq!(out.features[0].uid, "Z_UID");
        assert_eq!(out.features[0].metadata.contribution_date, Some(date("2024-05-01")));
    }

    #[test]
    fn test_earliest_of_several_main_repeats() {
        let mut old = square("old", 0.0);
        old.metadata.contribution_date = Some(date("2021-01-01"));
        let mut newer = square("newer", 0.5);
        newer.metadata.contribution_date = Some(date("2023-01-01"));
        let main = MainDataset::new(vec![newer, old]);

        let mut y = square("y", 1.0);
        y.relations.intersections = UidSet::parse("newer,old");
        y.relations.repeat_rts = UidSet::parse("newer,old");

        let out = MergeReconciler::new(date("2024-05-01")).reconcile(Batch::new(vec![y]), &main);
        assert_eq!(out.features[0].uid, "old");
    }

    #[test]
    fn test_self_repeat_group_converges() {
        let mut a = square("a", 0.0);
        a.metadata.basemap_date = "2021-07-01".to_string();
        a.relations.self_intersections = UidSet::parse("b");
        a.relations.repeat_rts = UidSet::parse("b");
        let mut b = square("b", 1.0);
        b.metadata.basemap_date = "2018-07-01".to_string();
        b.relations.self_intersections = UidSet::parse("a");
        b.relations.repeat_rts = UidSet::parse("a");

        let out = MergeReconciler::new(date("2024-05-01"))
            .reconcile(Batch::new(vec![a, b]), &MainDataset::default());
        assert_eq!(out.features[0].uid, "b");
        assert_eq!(out.features[1].uid, "b");
    }

    #[test]
    fn test_sibling_follows_rewrite_to_main_uid() {
        let mut z = square("z", 0.0);
        z.metadata.contribution_date = Some(date("2020-01-01"));
        let main = MainDataset::new(vec![z]);

        // a repeats z and b; b only sees a
        let mut a = square("a", 0.5);
        a.relations.intersections = UidSet::parse("z");
        a.relations.self_intersections = UidSet::parse("b");
        a.relations.repeat_rts = UidSet::parse("z,b");
        let mut b = square("b", 1.0);
        b.relations.self_intersections = UidSet::parse("a");
        b.relations.repeat_rts = UidSet::parse("a");

        let out = MergeReconciler::new(date("2024-05-01")).reconcile(Batch::new(vec![a, b]), &main);
        let uids: Vec<&str> = out.features.iter().map(|f| f.uid.as_str()).collect();
        assert_eq!(uids, vec!["z", "z"]);
    }

    #[test]
    fn test_follow_renames_stops_on_cycle() {
        let renamed = HashMap::from([("a", "b"), ("b", "a")]);
        assert_eq!(follow_renames("a", &renamed), "b");
        assert_eq!(follow_renames("c", &renamed), "c");
    }

    #[test]
    fn test_undetected_repeat_leaves_uid() {
        let mut a = square("a", 0.0);
        a.relations.repeat_rts = UidSet::parse("ghost");
        let out = MergeReconciler::new(date("2024-05-01"))
            .reconcile(Batch::new(vec![a]), &MainDataset::default());
        assert_eq!(out.features[0].uid, "a");
    }

    #[test]
    fn test_non_repeat_classifications_keep_uid() {
        let mut a = square("a", 0.0);
        a.relations.intersections = UidSet::parse("z");
        a.relations.merged_rts = UidSet::parse("z");
        let main = MainDataset::new(vec![square("z", 1.0)]);
        let out = MergeReconciler::new(date("2024-05-01")).reconcile(Batch::new(vec![a]), &main);
        assert_eq!(out.features[0].uid, "a");
    }
}
