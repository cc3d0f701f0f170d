//! File boundary: GeoJSON feature files and per-format column schemas

pub mod geojson;
pub mod schema;

pub use geojson::{parse_feature_collection, read_feature_file, write_feature_file, FeatureFile};
pub use schema::InputFormat;
