//! Overlap detection: relation finder, adjacency filter and batch scanners

pub mod adjacency;
pub mod relation_finder;
pub mod scanner;

pub use adjacency::true_overlaps;
pub use relation_finder::{classify_pair, find_overlaps, find_touching, PairRelation};
pub use scanner::{scan_cross_batch, scan_self, ScanSummary};
