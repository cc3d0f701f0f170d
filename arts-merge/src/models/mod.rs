//! Data models for RTS features, batches and batch sessions

pub mod batch;
pub mod feature;
pub mod relations;
pub mod session;

pub use batch::{Batch, MainDataset};
pub use feature::{Feature, FeatureMetadata, TrainClass};
pub use relations::{RelationField, Relations, UidSet};
pub use session::{BatchSession, BatchState, StateTransition};
