//! # ARTS Common Library
//!
//! Shared code for the ARTS contribution tools including:
//! - Error taxonomy (schema, completeness, merge-input)
//! - Configuration loading and path resolution
//! - Date helpers for contribution and basemap dates
//! - UID generation and derivation

pub mod config;
pub mod error;
pub mod time;
pub mod uid;

pub use error::{Error, Result};
