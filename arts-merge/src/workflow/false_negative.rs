//! False-negative pruning
//!
//! A contributor may mark main-dataset features labelled `Negative` as false
//! negatives (the "non-slump" was a slump after all). When pruning is enabled
//! those features are dropped from the main dataset before the batch is
//! appended. Runs after reconciliation and never affects identity resolution.

use crate::models::{Batch, MainDataset, RelationField, TrainClass};
use tracing::{debug, info};

/// Remove main-dataset negatives the batch marks as false negatives
///
/// Returns the number of features removed.
pub fn prune_false_negatives(main: &mut MainDataset, batch: &Batch) -> usize {
    let flagged = batch.collect_relation(RelationField::FalseNegative);
    if flagged.is_empty() {
        return 0;
    }

    let before = main.len();
    main.features.retain(|feature| {
        let prune = flagged.contains(&feature.uid)
            && feature.train_class() == Some(TrainClass::Negative);
        if prune {
            debug!(uid = %feature.uid, "Pruning false negative");
        }
        !prune
    });

    let removed = before - main.len();
    info!(flagged = flagged.len(), removed, "False-negative pruning complete");
    removed
}
