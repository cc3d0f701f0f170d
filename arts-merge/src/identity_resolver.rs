//! Identity Resolver
//!
//! Chooses the canonical UID for a group of features that describe the same
//! real-world slump.
//!
//! # Precedence
//! 1. Earliest `ContributionDate` (features not yet contributed sort last)
//! 2. Earliest first `BaseMapDate` token (undated sort last)
//! 3. Lexically smallest UID
//!
//! Rule 3 makes the choice a total order, so the result never depends on
//! the order of the candidate pool.

use crate::models::{Feature, UidSet};
use chrono::NaiveDate;
use tracing::debug;

type PrecedenceKey<'a> = (bool, Option<NaiveDate>, bool, Option<NaiveDate>, &'a str);

/// Sort key: smaller wins
pub fn precedence_key(feature: &Feature) -> PrecedenceKey<'_> {
    let contributed = feature.metadata.contribution_date;
    let basemap = feature.first_basemap_date();
    (
        contributed.is_none(),
        contributed,
        basemap.is_none(),
        basemap,
        feature.uid.as_str(),
    )
}

/// Canonical UID among pool features whose UID is in `group`
///
/// Returns `None` when no pool feature carries a group UID.
pub fn resolve_group<'a, I>(group: &UidSet, pool: I) -> Option<String>
where
    I: IntoIterator<Item = &'a Feature>,
{
    pool.into_iter()
        .filter(|f| group.contains(&f.uid))
        .min_by(|a, b| precedence_key(a).cmp(&precedence_key(b)))
        .map(|f| f.uid.clone())
}

/// Canonical UID for `feature` and its overlapping siblings
///
/// The group is `{feature.UID} ∪ SelfIntersections`. A singleton group
/// returns the feature's own UID.
pub fn resolve_uid<'a, I>(feature: &'a Feature, pool: I) -> String
where
    I: IntoIterator<Item = &'a Feature>,
{
    let mut group = feature.relations.self_intersections.clone();
    group.insert(feature.uid.clone());

    if group.len() == 1 {
        return feature.uid.clone();
    }

    let canonical = resolve_group(&group, std::iter::once(feature).chain(pool))
        .unwrap_or_else(|| feature.uid.clone());

    debug!(
        uid = %feature.uid,
        group = %group,
        canonical = %canonical,
        "Resolved canonical UID"
    );
    canonical
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::MultiPolygon;

    fn feature(uid: &str, contributed: Option<&str>, basemap: &str) -> Feature {
        let mut f = Feature::new(uid, MultiPolygon(vec![]));
        f.metadata.contribution_date = contributed.and_then(arts_common::time::parse_date);
        f.metadata.basemap_date = basemap.to_string();
        f
    }

    #[test]
    fn test_singleton_returns_own_uid() {
        let f = feature("solo", None, "2020-07-01");
        let pool = vec![feature("other", Some("2019-01-01"), "2018-07-01")];
        assert_eq!(resolve_uid(&f, &pool), "solo");
    }

    #[test]
    fn test_earliest_contribution_wins() {
        let mut f = feature("new", None, "2015-07-01");
        f.relations.self_intersections = UidSet::parse("old");
        let pool = vec![feature("old", Some("2022-03-01"), "2021-07-01")];
        assert_eq!(resolve_uid(&f, &pool), "old");
    }

    #[test]
    fn test_basemap_breaks_contribution_tie() {
        let mut a = feature("a", None, "2021-08-01");
        a.relations.self_intersections = UidSet::parse("b");
        let mut b = feature("b", None, "2019-08-01,2020-08-01");
        b.relations.self_intersections = UidSet::parse("a");
        let batch = vec![a.clone(), b.clone()];

        assert_eq!(resolve_uid(&batch[0], &batch), "b");
        assert_eq!(resolve_uid(&batch[1], &batch), "b");
    }

    #[test]
    fn test_full_tie_breaks_on_uid() {
        let mut a = feature("m", None, "2020-07-01");
        a.relations.self_intersections = UidSet::parse("k");
        let pool = vec![feature("k", None, "2020-07-01")];
        assert_eq!(resolve_uid(&a, &pool), "k");
    }

    #[test]
    fn test_order_independent() {
        let group = UidSet::parse("a,b,c");
        let mut pool = vec![
            feature("a", Some("2023-01-01"), "2022-07-01"),
            feature("b", Some("2021-01-01"), "2020-07-01"),
            feature("c", Some("2021-01-01"), "2019-07-01"),
        ];
        let forward = resolve_group(&group, &pool);
        pool.reverse();
        let backward = resolve_group(&group, &pool);

        assert_eq!(forward.as_deref(), Some("c"));
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_undated_sorts_last() {
        let group = UidSet::parse("a,b");
        let pool = vec![feature("a", None, ""), feature("b", None, "2022-07-01")];
        assert_eq!(resolve_group(&group, &pool).as_deref(), Some("b"));
    }

    #[test]
    fn test_group_absent_from_pool() {
        let pool = vec![feature("x", None, "2020-01-01")];
        assert_eq!(resolve_group(&UidSet::parse("q"), &pool), None);
    }
}
