//! Batch validators
//!
//! 1. **formatting** - metadata schema checks, run before any spatial work
//! 2. **completeness** - every detected overlap carries a classification

pub mod completeness;
pub mod formatting;

pub use completeness::{check_complete, CompletenessReport, Violation, ViolationKind};
pub use formatting::FormattingValidator;
