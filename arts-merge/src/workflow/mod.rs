//! Batch workflow: merge reconciliation, false-negative pruning and the
//! pipeline that drives a batch from ingestion to the main dataset

pub mod false_negative;
pub mod merge;
pub mod pipeline;

pub use false_negative::prune_false_negatives;
pub use merge::MergeReconciler;
pub use pipeline::{
    assign_uids, IngestedBatch, OutputMode, Pipeline, PipelineConfig, RunOutcome, ScanReport,
};
