//! arts-merge library interface
//!
//! Merges contributed batches of retrogressive thaw slump (RTS) polygons into
//! the main dataset: overlap scans, human-review completeness checks, identity
//! resolution and merge reconciliation.

pub mod identity_resolver;
pub mod io;
pub mod models;
pub mod overlap;
pub mod split;
pub mod validators;
pub mod workflow;

pub use identity_resolver::{resolve_group, resolve_uid};
pub use models::{Batch, Feature, MainDataset, RelationField, UidSet};
pub use workflow::{OutputMode, Pipeline, PipelineConfig, RunOutcome};
