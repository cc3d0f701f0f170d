//! RTS feature records

use super::relations::Relations;
use arts_common::time::parse_date;
use chrono::NaiveDate;
use geo::MultiPolygon;
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Training class of a delineation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainClass {
    Positive,
    Negative,
}

impl FromStr for TrainClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Positive" => Ok(TrainClass::Positive),
            "Negative" => Ok(TrainClass::Negative),
            other => Err(format!("'{}' is not one of Positive, Negative", other)),
        }
    }
}

impl fmt::Display for TrainClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrainClass::Positive => f.write_str("Positive"),
            TrainClass::Negative => f.write_str("Negative"),
        }
    }
}

/// Provenance metadata carried by every feature
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureMetadata {
    /// WGS84 decimal degrees
    pub centroid_lat: Option<f64>,
    /// WGS84 decimal degrees
    pub centroid_lon: Option<f64>,
    pub region_name: String,
    pub creator_lab: String,
    /// Date the feature entered the main dataset (`None` until merged)
    pub contribution_date: Option<NaiveDate>,
    /// One or two comma-joined ISO dates
    pub basemap_date: String,
    pub basemap_source: String,
    /// Metres per pixel
    pub basemap_resolution: Option<f64>,
    pub train_class: String,
    pub label_type: String,
}

/// One polygon record
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    /// Stable identifier shared by every observation of the same slump
    pub uid: String,
    /// Polygon(s) in the dataset's projected CRS; empty when the source row had no geometry
    pub geometry: MultiPolygon<f64>,
    pub metadata: FeatureMetadata,
    pub relations: Relations,
    /// Columns outside the known schema, passed through unchanged
    pub extra: Map<String, Value>,
}

impl Feature {
    pub fn new(uid: impl Into<String>, geometry: MultiPolygon<f64>) -> Self {
        Self {
            uid: uid.into(),
            geometry,
            metadata: FeatureMetadata::default(),
            relations: Relations::default(),
            extra: Map::new(),
        }
    }

    /// First basemap date token
    pub fn first_basemap_date(&self) -> Option<NaiveDate> {
        self.metadata
            .basemap_date
            .split(',')
            .next()
            .and_then(parse_date)
    }

    pub fn train_class(&self) -> Option<TrainClass> {
        self.metadata.train_class.parse().ok()
    }

    pub fn has_geometry(&self) -> bool {
        !self.geometry.0.is_empty()
    }
}
