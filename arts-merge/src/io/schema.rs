//! Per-format column schema
//!
//! Each input format has an explicit mapping table from its source column
//! names to the canonical names. Shapefile attribute tables truncate names
//! to 10 characters, so files that passed through a shapefile carry
//! abbreviated columns (`CentroidLa`, `BaseMapRes`, ...).
//!
//! Property values are coerced into typed [`Feature`] fields here; anything
//! that cannot be coerced is a schema error naming the column.

use crate::models::{Feature, FeatureMetadata, RelationField, Relations, UidSet};
use crate::models::relations::is_null_sentinel;
use arts_common::time::{format_date, parse_date};
use arts_common::{Error, Result};
use chrono::NaiveDate;
use geo::MultiPolygon;
use serde_json::{Map, Number, Value};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

pub const UID: &str = "UID";
pub const CENTROID_LAT: &str = "CentroidLat";
pub const CENTROID_LON: &str = "CentroidLon";
pub const REGION_NAME: &str = "RegionName";
pub const CREATOR_LAB: &str = "CreatorLab";
pub const CONTRIBUTION_DATE: &str = "ContributionDate";
pub const BASEMAP_DATE: &str = "BaseMapDate";
pub const BASEMAP_SOURCE: &str = "BaseMapSource";
pub const BASEMAP_RESOLUTION: &str = "BaseMapResolution";
pub const TRAIN_CLASS: &str = "TrainClass";
pub const LABEL_TYPE: &str = "LabelType";

/// Canonical metadata columns, in output order
pub const METADATA_COLUMNS: [&str; 11] = [
    UID,
    CENTROID_LAT,
    CENTROID_LON,
    REGION_NAME,
    CREATOR_LAB,
    CONTRIBUTION_DATE,
    BASEMAP_DATE,
    BASEMAP_SOURCE,
    BASEMAP_RESOLUTION,
    TRAIN_CLASS,
    LABEL_TYPE,
];

/// Metadata columns every submitted batch must carry
pub const REQUIRED_BATCH_COLUMNS: [&str; 9] = [
    CENTROID_LAT,
    CENTROID_LON,
    REGION_NAME,
    CREATOR_LAB,
    BASEMAP_DATE,
    BASEMAP_SOURCE,
    BASEMAP_RESOLUTION,
    TRAIN_CLASS,
    LABEL_TYPE,
];

/// 10-character DBF names produced by shapefile round-trips
const SHAPEFILE_COLUMNS: &[(&str, &str)] = &[
    ("CentroidLa", CENTROID_LAT),
    ("CentroidLo", CENTROID_LON),
    ("Contributi", CONTRIBUTION_DATE),
    ("BaseMapDat", BASEMAP_DATE),
    ("BaseMapSou", BASEMAP_SOURCE),
    ("BaseMapRes", BASEMAP_RESOLUTION),
    ("Intersecti", "Intersections"),
    ("SelfInters", "SelfIntersections"),
    ("RepeatNega", "RepeatNegative"),
    ("Stabilized", "StabilizedRTS"),
    ("Accidental", "AccidentalOverlap"),
    ("FalseNegat", "FalseNegative"),
    ("UnknownRel", "UnknownRelationship"),
];

/// Column naming convention of an input file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputFormat {
    /// Canonical column names
    #[default]
    GeoJson,
    /// Shapefile-truncated column names
    Shapefile,
}

impl InputFormat {
    /// Source column → canonical column table
    pub fn column_map(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            InputFormat::GeoJson => &[],
            InputFormat::Shapefile => SHAPEFILE_COLUMNS,
        }
    }

    /// Check the mapping table: targets are canonical and distinct
    pub fn validate_table(&self) -> Result<()> {
        let mut targets = HashSet::new();
        for (source, target) in self.column_map() {
            if !is_canonical_column(target) {
                return Err(Error::Internal(format!(
                    "{} maps '{}' to unknown column '{}'",
                    self, source, target
                )));
            }
            if !targets.insert(*target) {
                return Err(Error::Internal(format!(
                    "{} maps more than one column to '{}'",
                    self, target
                )));
            }
        }
        Ok(())
    }

    /// Rename source columns to canonical names
    ///
    /// A row carrying both a source column and its canonical target is
    /// ambiguous and rejected.
    pub fn map_columns(&self, properties: Map<String, Value>) -> Result<Map<String, Value>> {
        let table = self.column_map();
        if table.is_empty() {
            return Ok(properties);
        }

        let mut mapped = Map::with_capacity(properties.len());
        for (key, value) in properties {
            let canonical = table
                .iter()
                .find(|(source, _)| *source == key)
                .map(|(_, target)| target.to_string())
                .unwrap_or(key);

            if mapped.contains_key(&canonical) {
                return Err(Error::schema(
                    canonical,
                    "column appears under both its abbreviated and full name",
                ));
            }
            mapped.insert(canonical, value);
        }
        Ok(mapped)
    }
}

impl FromStr for InputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "geojson" | "json" => Ok(InputFormat::GeoJson),
            "shapefile" | "shp" => Ok(InputFormat::Shapefile),
            other => Err(Error::InvalidInput(format!(
                "Unknown input format '{}' (expected geojson or shapefile)",
                other
            ))),
        }
    }
}

impl fmt::Display for InputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputFormat::GeoJson => f.write_str("geojson"),
            InputFormat::Shapefile => f.write_str("shapefile"),
        }
    }
}

/// Known metadata or relation column
pub fn is_canonical_column(column: &str) -> bool {
    METADATA_COLUMNS.contains(&column) || RelationField::from_column(column).is_some()
}

/// Build a feature from canonical-named properties
pub fn feature_from_properties(
    mut properties: Map<String, Value>,
    geometry: MultiPolygon<f64>,
) -> Result<Feature> {
    let uid = take_text(&mut properties, UID)?;

    let contribution_date = match take_text(&mut properties, CONTRIBUTION_DATE)? {
        text if text.is_empty() => None,
        text => Some(parse_date(&text).ok_or_else(|| {
            Error::schema(CONTRIBUTION_DATE, format!("'{}' is not a date", text))
        })?),
    };

    let metadata = FeatureMetadata {
        centroid_lat: take_numeric(&mut properties, CENTROID_LAT)?,
        centroid_lon: take_numeric(&mut properties, CENTROID_LON)?,
        region_name: take_text(&mut properties, REGION_NAME)?,
        creator_lab: take_text(&mut properties, CREATOR_LAB)?,
        contribution_date,
        basemap_date: take_text(&mut properties, BASEMAP_DATE)?,
        basemap_source: take_text(&mut properties, BASEMAP_SOURCE)?,
        basemap_resolution: take_numeric(&mut properties, BASEMAP_RESOLUTION)?,
        train_class: take_text(&mut properties, TRAIN_CLASS)?,
        label_type: take_text(&mut properties, LABEL_TYPE)?,
    };

    let mut relations = Relations::default();
    for field in RelationField::ALL {
        let text = take_text(&mut properties, field.column())?;
        relations.set(field, UidSet::parse(&text));
    }

    Ok(Feature {
        uid,
        geometry,
        metadata,
        relations,
        extra: properties,
    })
}

/// Canonical-named properties for output
pub fn feature_to_properties(feature: &Feature) -> Map<String, Value> {
    let meta = &feature.metadata;
    let mut properties = Map::new();

    properties.insert(UID.to_string(), Value::String(feature.uid.clone()));
    properties.insert(CENTROID_LAT.to_string(), number_value(meta.centroid_lat));
    properties.insert(CENTROID_LON.to_string(), number_value(meta.centroid_lon));
    properties.insert(REGION_NAME.to_string(), Value::String(meta.region_name.clone()));
    properties.insert(CREATOR_LAB.to_string(), Value::String(meta.creator_lab.clone()));
    properties.insert(CONTRIBUTION_DATE.to_string(), date_value(meta.contribution_date));
    properties.insert(BASEMAP_DATE.to_string(), Value::String(meta.basemap_date.clone()));
    properties.insert(BASEMAP_SOURCE.to_string(), Value::String(meta.basemap_source.clone()));
    properties.insert(BASEMAP_RESOLUTION.to_string(), number_value(meta.basemap_resolution));
    properties.insert(TRAIN_CLASS.to_string(), Value::String(meta.train_class.clone()));
    properties.insert(LABEL_TYPE.to_string(), Value::String(meta.label_type.clone()));

    for field in RelationField::ALL {
        properties.insert(
            field.column().to_string(),
            Value::String(feature.relations.get(field).to_field_string()),
        );
    }

    for (key, value) in &feature.extra {
        properties.insert(key.clone(), value.clone());
    }

    properties
}

/// Comparable text form of a property value (null sentinels become empty)
pub fn value_key(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) if is_null_sentinel(s) => String::new(),
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n
            .as_f64()
            .map(|f| f.to_string())
            .unwrap_or_else(|| n.to_string()),
        other => other.to_string(),
    }
}

fn take_text(properties: &mut Map<String, Value>, column: &str) -> Result<String> {
    match properties.remove(column) {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(s)) if is_null_sentinel(&s) => Ok(String::new()),
        Some(Value::String(s)) => Ok(s.trim().to_string()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(Value::Bool(b)) => Ok(b.to_string()),
        Some(_) => Err(Error::schema(column, "expected a text value")),
    }
}

fn take_numeric(properties: &mut Map<String, Value>, column: &str) -> Result<Option<f64>> {
    match properties.remove(column) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => Ok(n.as_f64()),
        Some(Value::String(s)) if is_null_sentinel(&s) => Ok(None),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| Error::schema(column, format!("'{}' is not numeric", s))),
        Some(_) => Err(Error::schema(column, "expected a numeric value")),
    }
}

fn number_value(value: Option<f64>) -> Value {
    value
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

fn date_value(value: Option<NaiveDate>) -> Value {
    value
        .map(|d| Value::String(format_date(d)))
        .unwrap_or(Value::Null)
}
