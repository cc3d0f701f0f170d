//! Relation fields between features
//!
//! On disk every relation is a comma-joined list of UIDs. In memory it is a
//! [`UidSet`]; the string form exists only at the file boundary.

use serde::{Serialize, Serializer};
use std::collections::btree_set;
use std::collections::BTreeSet;
use std::fmt;

/// Tokens that mean "no value" after spreadsheet/dataframe round-trips
const NULL_SENTINELS: &[&str] = &["nan", "none", "null", "<na>", "na"];

/// True when a raw cell value carries no data
pub fn is_null_sentinel(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty() || NULL_SENTINELS.contains(&trimmed.to_ascii_lowercase().as_str())
}

/// Order-irrelevant set of UIDs
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct UidSet(BTreeSet<String>);

impl UidSet {
    pub fn new() -> Self {
        Self(BTreeSet::new())
    }

    /// Parse a comma-joined list, dropping blanks and null sentinels
    pub fn parse(value: &str) -> Self {
        value
            .split(',')
            .filter(|token| !is_null_sentinel(token))
            .map(|token| token.trim().to_string())
            .collect()
    }

    pub fn insert(&mut self, uid: impl Into<String>) -> bool {
        self.0.insert(uid.into())
    }

    pub fn contains(&self, uid: &str) -> bool {
        self.0.contains(uid)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> btree_set::Iter<'_, String> {
        self.0.iter()
    }

    pub fn union(&self, other: &UidSet) -> UidSet {
        self.0.union(&other.0).cloned().collect()
    }

    pub fn difference(&self, other: &UidSet) -> UidSet {
        self.0.difference(&other.0).cloned().collect()
    }

    pub fn intersection(&self, other: &UidSet) -> UidSet {
        self.0.intersection(&other.0).cloned().collect()
    }

    /// Copy of this set without `uid`
    pub fn without(&self, uid: &str) -> UidSet {
        self.0.iter().filter(|u| u.as_str() != uid).cloned().collect()
    }

    /// Comma-joined storage form; empty string for the empty set
    pub fn to_field_string(&self) -> String {
        self.0.iter().map(String::as_str).collect::<Vec<_>>().join(",")
    }
}

impl fmt::Display for UidSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_field_string())
    }
}

impl Serialize for UidSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_field_string())
    }
}

impl FromIterator<String> for UidSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> FromIterator<&'a str> for UidSet {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        Self(iter.into_iter().map(str::to_string).collect())
    }
}

impl<'a> IntoIterator for &'a UidSet {
    type Item = &'a String;
    type IntoIter = btree_set::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// One relation column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RelationField {
    /// Overlaps with main-dataset features (scan output)
    Intersections,
    /// Overlaps with sibling features in the batch (scan output)
    SelfIntersections,
    RepeatRts,
    RepeatNegative,
    MergedRts,
    SplitRts,
    NewRts,
    StabilizedRts,
    AccidentalOverlap,
    FalseNegative,
    UnknownRelationship,
}

impl RelationField {
    pub const ALL: [RelationField; 11] = [
        RelationField::Intersections,
        RelationField::SelfIntersections,
        RelationField::RepeatRts,
        RelationField::RepeatNegative,
        RelationField::MergedRts,
        RelationField::SplitRts,
        RelationField::NewRts,
        RelationField::StabilizedRts,
        RelationField::AccidentalOverlap,
        RelationField::FalseNegative,
        RelationField::UnknownRelationship,
    ];

    /// Categories a reviewer assigns to a detected overlap
    pub const CLASSIFICATIONS: [RelationField; 8] = [
        RelationField::RepeatRts,
        RelationField::RepeatNegative,
        RelationField::StabilizedRts,
        RelationField::NewRts,
        RelationField::MergedRts,
        RelationField::SplitRts,
        RelationField::AccidentalOverlap,
        RelationField::UnknownRelationship,
    ];

    /// Canonical column name
    pub fn column(&self) -> &'static str {
        match self {
            RelationField::Intersections => "Intersections",
            RelationField::SelfIntersections => "SelfIntersections",
            RelationField::RepeatRts => "RepeatRTS",
            RelationField::RepeatNegative => "RepeatNegative",
            RelationField::MergedRts => "MergedRTS",
            RelationField::SplitRts => "SplitRTS",
            RelationField::NewRts => "NewRTS",
            RelationField::StabilizedRts => "StabilizedRTS",
            RelationField::AccidentalOverlap => "AccidentalOverlap",
            RelationField::FalseNegative => "FalseNegative",
            RelationField::UnknownRelationship => "UnknownRelationship",
        }
    }

    pub fn from_column(column: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|field| field.column() == column)
    }
}

/// All relation fields of one feature
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Relations {
    pub intersections: UidSet,
    pub self_intersections: UidSet,
    pub repeat_rts: UidSet,
    pub repeat_negative: UidSet,
    pub merged_rts: UidSet,
    pub split_rts: UidSet,
    pub new_rts: UidSet,
    pub stabilized_rts: UidSet,
    pub accidental_overlap: UidSet,
    pub false_negative: UidSet,
    pub unknown_relationship: UidSet,
}

impl Relations {
    pub fn get(&self, field: RelationField) -> &UidSet {
        match field {
            RelationField::Intersections => &self.intersections,
            RelationField::SelfIntersections => &self.self_intersections,
            RelationField::RepeatRts => &self.repeat_rts,
            RelationField::RepeatNegative => &self.repeat_negative,
            RelationField::MergedRts => &self.merged_rts,
            RelationField::SplitRts => &self.split_rts,
            RelationField::NewRts => &self.new_rts,
            RelationField::StabilizedRts => &self.stabilized_rts,
            RelationField::AccidentalOverlap => &self.accidental_overlap,
            RelationField::FalseNegative => &self.false_negative,
            RelationField::UnknownRelationship => &self.unknown_relationship,
        }
    }

    pub fn get_mut(&mut self, field: RelationField) -> &mut UidSet {
        match field {
            RelationField::Intersections => &mut self.intersections,
            RelationField::SelfIntersections => &mut self.self_intersections,
            RelationField::RepeatRts => &mut self.repeat_rts,
            RelationField::RepeatNegative => &mut self.repeat_negative,
            RelationField::MergedRts => &mut self.merged_rts,
            RelationField::SplitRts => &mut self.split_rts,
            RelationField::NewRts => &mut self.new_rts,
            RelationField::StabilizedRts => &mut self.stabilized_rts,
            RelationField::AccidentalOverlap => &mut self.accidental_overlap,
            RelationField::FalseNegative => &mut self.false_negative,
            RelationField::UnknownRelationship => &mut self.unknown_relationship,
        }
    }

    pub fn set(&mut self, field: RelationField, value: UidSet) {
        *self.get_mut(field) = value;
    }

    /// `Intersections ∪ SelfIntersections`
    pub fn detected(&self) -> UidSet {
        self.intersections.union(&self.self_intersections)
    }

    /// Union of every classification category
    pub fn classified(&self) -> UidSet {
        RelationField::CLASSIFICATIONS
            .iter()
            .fold(UidSet::new(), |acc, field| acc.union(self.get(*field)))
    }

    /// True when the scanners found any overlap
    pub fn has_detections(&self) -> bool {
        !self.intersections.is_empty() || !self.self_intersections.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_drops_sentinels_and_whitespace() {
        let set = UidSet::parse(" b , a,nan,None,,NaN, null ");
        assert_eq!(set.len(), 2);
        assert!(set.contains("a"));
        assert!(set.contains("b"));
        assert_eq!(set.to_field_string(), "a,b");
    }

    #[test]
    fn test_parse_empty_and_sentinel_only() {
        assert!(UidSet::parse("").is_empty());
        assert!(UidSet::parse("nan").is_empty());
        assert!(UidSet::parse("None").is_empty());
        assert_eq!(UidSet::new().to_field_string(), "");
    }

    #[test]
    fn test_duplicates_collapse() {
        let set = UidSet::parse("a,a,b,a");
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_set_algebra() {
        let a = UidSet::parse("x,y,z");
        let b = UidSet::parse("y");
        assert_eq!(a.difference(&b), UidSet::parse("x,z"));
        assert_eq!(a.intersection(&b), b);
        assert_eq!(b.union(&UidSet::parse("w")), UidSet::parse("w,y"));
        assert_eq!(a.without("z"), UidSet::parse("x,y"));
    }

    #[test]
    fn test_column_names_round_trip() {
        for field in RelationField::ALL {
            assert_eq!(RelationField::from_column(field.column()), Some(field));
        }
        assert_eq!(RelationField::from_column("RegionName"), None);
    }

    #[test]
    fn test_false_negative_is_not_a_classification() {
        assert!(!RelationField::CLASSIFICATIONS.contains(&RelationField::FalseNegative));
        assert!(!RelationField::CLASSIFICATIONS.contains(&RelationField::Intersections));
    }

    #[test]
    fn test_classified_union() {
        let mut relations = Relations::default();
        relations.repeat_rts = UidSet::parse("a");
        relations.unknown_relationship = UidSet::parse("b");
        relations.false_negative = UidSet::parse("c");
        assert_eq!(relations.classified(), UidSet::parse("a,b"));
    }

    #[test]
    fn test_serializes_as_joined_string() {
        let json = serde_json::to_string(&UidSet::parse("b,a")).unwrap();
        assert_eq!(json, "\"a,b\"");
    }
}
