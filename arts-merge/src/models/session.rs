//! Batch processing state machine
//!
//! A batch progresses through:
//! INGESTED → CROSS_SCANNED → SELF_SCANNED → AWAITING_REVIEW → COMPLETE → MERGED → APPENDED
//!
//! AWAITING_REVIEW may instead end in INCOMPLETE, which is terminal for the
//! run; the next run re-enters AWAITING_REVIEW by re-reading the
//! classification file.

use super::batch::Batch;
use arts_common::{Error, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

/// Batch lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchState {
    /// Loaded, schema-checked, UIDs assigned
    Ingested,
    /// `Intersections` populated against the main dataset
    CrossScanned,
    /// `SelfIntersections` populated against siblings
    SelfScanned,
    /// Waiting on (or re-reading) the human classification file
    AwaitingReview,
    /// Every detected overlap is classified
    Complete,
    /// Some overlap lacks a classification (terminal for this run)
    Incomplete,
    /// Identifiers reconciled, contribution date stamped
    Merged,
    /// Written out (terminal success)
    Appended,
}

impl BatchState {
    /// Whether `next` may follow `self`
    pub fn can_transition_to(self, next: BatchState) -> bool {
        use BatchState::*;
        matches!(
            (self, next),
            (Ingested, CrossScanned)
                | (CrossScanned, SelfScanned)
                | (SelfScanned, AwaitingReview)
                | (AwaitingReview, Complete)
                | (AwaitingReview, Incomplete)
                | (Incomplete, AwaitingReview)
                | (Complete, Merged)
                | (Merged, Appended)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, BatchState::Incomplete | BatchState::Appended)
    }
}

impl fmt::Display for BatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BatchState::Ingested => "INGESTED",
            BatchState::CrossScanned => "CROSS_SCANNED",
            BatchState::SelfScanned => "SELF_SCANNED",
            BatchState::AwaitingReview => "AWAITING_REVIEW",
            BatchState::Complete => "COMPLETE",
            BatchState::Incomplete => "INCOMPLETE",
            BatchState::Merged => "MERGED",
            BatchState::Appended => "APPENDED",
        };
        f.write_str(name)
    }
}

/// State transition record
#[derive(Debug, Clone, Serialize)]
pub struct StateTransition {
    pub session_id: Uuid,
    pub old_state: BatchState,
    pub new_state: BatchState,
    pub transitioned_at: DateTime<Utc>,
}

/// One batch moving through the pipeline
#[derive(Debug, Clone)]
pub struct BatchSession {
    /// Unique session identifier
    pub session_id: Uuid,

    /// Current lifecycle state
    pub state: BatchState,

    /// The batch being processed
    pub batch: Batch,

    /// Columns present in the batch file (canonical names)
    pub columns: BTreeSet<String>,

    /// Transition history
    pub transitions: Vec<StateTransition>,

    /// Session start time
    pub started_at: DateTime<Utc>,

    /// Session end time (set on terminal states)
    pub ended_at: Option<DateTime<Utc>>,
}

impl BatchSession {
    /// Create a session for a freshly ingested batch
    pub fn new(batch: Batch, columns: BTreeSet<String>) -> Self {
        Self {
            session_id: arts_common::uid::generate(),
            state: BatchState::Ingested,
            batch,
            columns,
            transitions: Vec::new(),
            started_at: Utc::now(),
            ended_at: None,
        }
    }

    /// Transition to new state, rejecting moves the lifecycle does not allow
    pub fn transition_to(&mut self, new_state: BatchState) -> Result<StateTransition> {
        if !self.state.can_transition_to(new_state) {
            return Err(Error::InvalidTransition {
                from: self.state.to_string(),
                to: new_state.to_string(),
            });
        }

        tracing::debug!(
            session_id = %self.session_id,
            from = %self.state,
            to = %new_state,
            "Batch state transition"
        );

        let transition = StateTransition {
            session_id: self.session_id,
            old_state: self.state,
            new_state,
            transitioned_at: Utc::now(),
        };
        self.transitions.push(transition.clone());
        self.state = new_state;

        self.ended_at = if new_state.is_terminal() {
            Some(Utc::now())
        } else {
            None
        };

        Ok(transition)
    }
}
