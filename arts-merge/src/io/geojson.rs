//! GeoJSON FeatureCollection reading and writing
//!
//! Only Polygon and MultiPolygon geometries are accepted. Coordinates beyond
//! the first two dimensions are ignored. A `null` geometry reads as an empty
//! MultiPolygon so that attribute-only rows (e.g. an edited review table)
//! still load.
//!
//! Writes go to a temporary file in the destination directory and are
//! renamed into place, so a failed run never leaves a truncated dataset.

use super::schema::{feature_from_properties, feature_to_properties, InputFormat};
use crate::models::Feature;
use arts_common::{Error, Result};
use geo::{Coord, LineString, MultiPolygon, Polygon};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tracing::debug;

#[derive(Debug, Deserialize, Serialize)]
struct FeatureCollectionDoc {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    crs: Option<Value>,
    features: Vec<FeatureDoc>,
}

#[derive(Debug, Deserialize, Serialize)]
struct FeatureDoc {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    properties: Option<Map<String, Value>>,
    #[serde(default)]
    geometry: Option<Value>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(tag = "type", content = "coordinates")]
enum GeometryDoc {
    Polygon(Vec<Vec<Vec<f64>>>),
    MultiPolygon(Vec<Vec<Vec<Vec<f64>>>>),
}

/// Contents of one feature file
#[derive(Debug, Clone, Default)]
pub struct FeatureFile {
    /// Collection name, passed through
    pub name: Option<String>,
    /// Coordinate reference system member, passed through
    pub crs: Option<Value>,
    /// Canonical column names present on any feature
    pub columns: BTreeSet<String>,
    pub features: Vec<Feature>,
}

impl FeatureFile {
    /// Wrap features for writing, inheriting CRS and name from `template`
    pub fn with_features(template: &FeatureFile, features: Vec<Feature>) -> Self {
        Self {
            name: template.name.clone(),
            crs: template.crs.clone(),
            columns: template.columns.clone(),
            features,
        }
    }
}

/// Read a feature file from disk
pub fn read_feature_file(path: &Path, format: InputFormat) -> Result<FeatureFile> {
    debug!(path = %path.display(), format = %format, "Reading feature file");

    let file = File::open(path).map_err(|e| {
        Error::Io(std::io::Error::new(
            e.kind(),
            format!("Failed to open {}: {}", path.display(), e),
        ))
    })?;
    let doc: FeatureCollectionDoc = serde_json::from_reader(BufReader::new(file))?;
    from_document(doc, format)
}

/// Parse a feature file from GeoJSON text
pub fn parse_feature_collection(text: &str, format: InputFormat) -> Result<FeatureFile> {
    let doc: FeatureCollectionDoc = serde_json::from_str(text)?;
    from_document(doc, format)
}

fn from_document(doc: FeatureCollectionDoc, format: InputFormat) -> Result<FeatureFile> {
    if doc.kind != "FeatureCollection" {
        return Err(Error::InvalidInput(format!(
            "Expected a FeatureCollection, found '{}'",
            doc.kind
        )));
    }
    format.validate_table()?;

    let mut columns = BTreeSet::new();
    let mut features = Vec::with_capacity(doc.features.len());

    for (index, feature_doc) in doc.features.into_iter().enumerate() {
        let properties = format.map_columns(feature_doc.properties.unwrap_or_default())?;
        columns.extend(properties.keys().cloned());

        let geometry = match feature_doc.geometry {
            None | Some(Value::Null) => MultiPolygon(vec![]),
            Some(value) => decode_geometry(value)
                .map_err(|e| Error::Geometry(format!("feature {}: {}", index, e)))?,
        };

        features.push(feature_from_properties(properties, geometry)?);
    }

    debug!(features = features.len(), columns = columns.len(), "Parsed feature collection");

    Ok(FeatureFile {
        name: doc.name,
        crs: doc.crs,
        columns,
        features,
    })
}

/// Write features with canonical column names, atomically
pub fn write_feature_file(path: &Path, file: &FeatureFile) -> Result<()> {
    let doc = to_document(file);

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)?;

    let temp = tempfile::NamedTempFile::new_in(dir)?;
    {
        let mut writer = BufWriter::new(temp.as_file());
        serde_json::to_writer_pretty(&mut writer, &doc)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
    }
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| Error::Io(e.error))?;

    debug!(path = %path.display(), features = file.features.len(), "Wrote feature file");
    Ok(())
}

fn to_document(file: &FeatureFile) -> FeatureCollectionDoc {
    let features = file
        .features
        .iter()
        .map(|feature| FeatureDoc {
            kind: "Feature".to_string(),
            properties: Some(feature_to_properties(feature)),
            geometry: encode_geometry(&feature.geometry),
        })
        .collect();

    FeatureCollectionDoc {
        kind: "FeatureCollection".to_string(),
        name: file.name.clone(),
        crs: file.crs.clone(),
        features,
    }
}

fn decode_geometry(value: Value) -> Result<MultiPolygon<f64>> {
    let doc: GeometryDoc = serde_json::from_value(value)
        .map_err(|e| Error::Geometry(format!("unsupported geometry: {}", e)))?;

    let polygons = match doc {
        GeometryDoc::Polygon(rings) => vec![decode_polygon(rings)?],
        GeometryDoc::MultiPolygon(parts) => parts
            .into_iter()
            .map(decode_polygon)
            .collect::<Result<Vec<_>>>()?,
    };
    Ok(MultiPolygon(polygons))
}

fn decode_polygon(rings: Vec<Vec<Vec<f64>>>) -> Result<Polygon<f64>> {
    let mut rings = rings.into_iter().map(decode_ring);
    let exterior = rings
        .next()
        .ok_or_else(|| Error::Geometry("polygon has no exterior ring".to_string()))??;
    let interiors = rings.collect::<Result<Vec<_>>>()?;
    Ok(Polygon::new(exterior, interiors))
}

fn decode_ring(positions: Vec<Vec<f64>>) -> Result<LineString<f64>> {
    if positions.len() < 3 {
        return Err(Error::Geometry(format!(
            "ring has {} position(s), need at least 3",
            positions.len()
        )));
    }
    positions
        .into_iter()
        .map(|p| match p.as_slice() {
            [x, y, ..] => Ok(Coord { x: *x, y: *y }),
            _ => Err(Error::Geometry("position has fewer than 2 coordinates".to_string())),
        })
        .collect::<Result<Vec<_>>>()
        .map(LineString::new)
}

fn encode_geometry(geometry: &MultiPolygon<f64>) -> Option<Value> {
    let encode_polygon = |polygon: &Polygon<f64>| -> Vec<Vec<Vec<f64>>> {
        std::iter::once(polygon.exterior())
            .chain(polygon.interiors())
            .map(|ring| ring.coords().map(|c| vec![c.x, c.y]).collect())
            .collect()
    };

    let doc = match geometry.0.as_slice() {
        [] => return None,
        [single] => GeometryDoc::Polygon(encode_polygon(single)),
        many => GeometryDoc::MultiPolygon(many.iter().map(encode_polygon).collect()),
    };
    serde_json::to_value(doc).ok()
}
