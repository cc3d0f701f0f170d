//! Test Helper Utilities
//!
//! Shared fixtures for arts-merge integration tests: a temporary workspace
//! and GeoJSON builders for RTS features.

#![allow(dead_code)]

use arts_merge::io::{read_feature_file, write_feature_file, FeatureFile, InputFormat};
use arts_merge::workflow::PipelineConfig;
use chrono::NaiveDate;
use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const CONTRIBUTION_DATE: &str = "2024-06-01";

/// Temporary directory holding every file of one test run
pub struct TestWorkspace {
    pub dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("create temp dir"),
        }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn out_dir(&self) -> PathBuf {
        self.path("out")
    }

    /// Pipeline config writing into this workspace
    pub fn config(&self) -> PipelineConfig {
        PipelineConfig {
            main_dataset: self.path("main.geojson"),
            output_dir: self.out_dir(),
            contribution_date: contribution_date(),
            ..Default::default()
        }
    }
}

pub fn contribution_date() -> NaiveDate {
    NaiveDate::parse_from_str(CONTRIBUTION_DATE, "%Y-%m-%d").expect("valid date")
}

/// Axis-aligned square polygon geometry
pub fn square(x: f64, y: f64, size: f64) -> Value {
    json!({
        "type": "Polygon",
        "coordinates": [[
            [x, y], [x + size, y], [x + size, y + size], [x, y + size], [x, y]
        ]]
    })
}

/// Complete, valid metadata for a submitted feature
pub fn rts_properties(uid: Option<&str>, basemap_date: &str) -> Map<String, Value> {
    let mut properties = json!({
        "CentroidLat": 68.35,
        "CentroidLon": -133.62,
        "RegionName": "Peel Plateau",
        "CreatorLab": "PermafrostLab",
        "BaseMapDate": basemap_date,
        "BaseMapSource": "Maxar",
        "BaseMapResolution": 0.5,
        "TrainClass": "Positive",
        "LabelType": "Polygon"
    })
    .as_object()
    .cloned()
    .expect("object");
    if let Some(uid) = uid {
        properties.insert("UID".to_string(), json!(uid));
    }
    properties
}

pub fn feature(properties: Map<String, Value>, geometry: Value) -> Value {
    json!({"type": "Feature", "properties": properties, "geometry": geometry})
}

/// Submitted batch feature at (x, y)
pub fn rts_feature(uid: Option<&str>, x: f64, y: f64, size: f64, basemap_date: &str) -> Value {
    feature(rts_properties(uid, basemap_date), square(x, y, size))
}

/// Main-dataset feature already contributed on `contributed`
pub fn main_feature(uid: &str, x: f64, y: f64, size: f64, contributed: &str, class: &str) -> Value {
    let mut properties = rts_properties(Some(uid), "2018-07-01");
    properties.insert("ContributionDate".to_string(), json!(contributed));
    properties.insert("TrainClass".to_string(), json!(class));
    feature(properties, square(x, y, size))
}

pub fn write_collection(path: &Path, features: Vec<Value>) {
    let doc = json!({
        "type": "FeatureCollection",
        "name": "test",
        "features": features
    });
    std::fs::write(path, serde_json::to_string_pretty(&doc).expect("serialize"))
        .expect("write collection");
}

pub fn read(path: &Path) -> FeatureFile {
    read_feature_file(path, InputFormat::GeoJson).expect("read feature file")
}

/// Edit a feature file in place, as a reviewer would
pub fn edit(path: &Path, f: impl FnOnce(&mut FeatureFile)) {
    let mut file = read(path);
    f(&mut file);
    write_feature_file(path, &file).expect("write feature file");
}
