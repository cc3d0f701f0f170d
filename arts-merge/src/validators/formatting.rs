//! Metadata Formatting Validator
//!
//! Checks every submitted feature's metadata before any spatial work runs.
//! The first failure stops the run with a schema error naming the column and
//! the constraint it broke.
//!
//! # Checks
//! - **Columns**: every required metadata column and every declared column is present
//! - **CentroidLat / CentroidLon**: numeric, present, within ±90 / ±180
//! - **RegionName, CreatorLab, BaseMapSource, LabelType**: non-empty
//! - **BaseMapDate**: non-empty, every comma-separated token parses as a date
//! - **BaseMapResolution**: numeric, present
//! - **TrainClass**: `Positive` or `Negative`

use crate::io::schema::{
    BASEMAP_DATE, BASEMAP_RESOLUTION, BASEMAP_SOURCE, CENTROID_LAT, CENTROID_LON, CREATOR_LAB,
    LABEL_TYPE, REGION_NAME, REQUIRED_BATCH_COLUMNS, TRAIN_CLASS,
};
use crate::models::{Batch, Feature, TrainClass};
use arts_common::time::parse_date_list;
use arts_common::{Error, Result};
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Metadata formatting validator
#[derive(Debug, Clone, Default)]
pub struct FormattingValidator {
    /// Extra columns the contributor declared for this batch
    declared_columns: Vec<String>,
}

impl FormattingValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also require the given contributor-declared columns
    pub fn with_declared_columns(declared_columns: Vec<String>) -> Self {
        Self { declared_columns }
    }

    /// Validate `batch`, whose source file carried `columns`
    pub fn validate(&self, batch: &Batch, columns: &BTreeSet<String>) -> Result<()> {
        if batch.is_empty() {
            return Err(Error::InvalidInput("Batch contains no features".to_string()));
        }

        for column in REQUIRED_BATCH_COLUMNS {
            if !columns.contains(column) {
                return Err(Error::schema(column, "required column is missing"));
            }
        }
        for column in &self.declared_columns {
            if !columns.contains(column) {
                return Err(Error::schema(column.clone(), "declared column is missing"));
            }
        }

        for (index, feature) in batch.iter().enumerate() {
            check_feature(feature).map_err(|e| {
                debug!(index, uid = %feature.uid, error = %e, "Formatting check failed");
                e
            })?;
        }

        info!(
            features = batch.len(),
            declared = self.declared_columns.len(),
            "Metadata formatting checks passed"
        );
        Ok(())
    }
}

fn check_feature(feature: &Feature) -> Result<()> {
    let meta = &feature.metadata;

    check_range(CENTROID_LAT, meta.centroid_lat, 90.0)?;
    check_range(CENTROID_LON, meta.centroid_lon, 180.0)?;

    for (column, value) in [
        (REGION_NAME, &meta.region_name),
        (CREATOR_LAB, &meta.creator_lab),
        (BASEMAP_SOURCE, &meta.basemap_source),
        (LABEL_TYPE, &meta.label_type),
    ] {
        if value.trim().is_empty() {
            return Err(Error::schema(column, "must not be empty"));
        }
    }

    if meta.basemap_date.trim().is_empty() {
        return Err(Error::schema(BASEMAP_DATE, "must not be empty"));
    }
    if parse_date_list(&meta.basemap_date).is_none() {
        return Err(Error::schema(
            BASEMAP_DATE,
            format!("'{}' is not a comma-joined list of dates", meta.basemap_date),
        ));
    }

    if meta.basemap_resolution.is_none() {
        return Err(Error::schema(BASEMAP_RESOLUTION, "must be a numeric value"));
    }

    meta.train_class
        .parse::<TrainClass>()
        .map_err(|e| Error::schema(TRAIN_CLASS, e))?;

    Ok(())
}

fn check_range(column: &str, value: Option<f64>, limit: f64) -> Result<()> {
    match value {
        None => Err(Error::schema(column, "must be a numeric value")),
        Some(v) if !v.is_finite() || v < -limit || v > limit => Err(Error::schema(
            column,
            format!("{} is outside [-{}, {}]", v, limit, limit),
        )),
        Some(_) => Ok(()),
    }
}
