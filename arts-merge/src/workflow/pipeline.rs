//! Pipeline Orchestrator
//!
//! Drives one batch through its lifecycle:
//! `Ingested → CrossScanned → SelfScanned → AwaitingReview → Complete → Merged → Appended`
//! (or `Incomplete` when the review is not finished).
//!
//! # Phases
//! - **Ingest**: read the batch, map columns, run formatting checks, assign missing UIDs
//! - **Scan**: cross-batch scan against the main dataset, then the self scan;
//!   overlapping features go to the review file
//! - **Run**: join the classification file, check completeness, reconcile
//!   identities, optionally prune false negatives, write the output
//!
//! # Demo mode
//! Nothing is written and an incomplete review stops the run without error.

use crate::io::{read_feature_file, schema, write_feature_file, FeatureFile, InputFormat};
use crate::models::{Batch, BatchSession, BatchState, Feature, MainDataset};
use crate::overlap::{scan_cross_batch, scan_self, ScanSummary};
use crate::validators::{check_complete, CompletenessReport, FormattingValidator};
use crate::workflow::false_negative::prune_false_negatives;
use crate::workflow::merge::MergeReconciler;
use arts_common::{uid, Error, Result};
use chrono::NaiveDate;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Where an accepted batch is written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// The formatted batch alone, in the output directory
    #[default]
    Standalone,
    /// Appended to the main dataset, which is rewritten in place
    Main,
}

impl FromStr for OutputMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standalone" => Ok(OutputMode::Standalone),
            "main" => Ok(OutputMode::Main),
            other => Err(Error::InvalidInput(format!(
                "Unknown output mode '{}' (expected standalone or main)",
                other
            ))),
        }
    }
}

impl fmt::Display for OutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputMode::Standalone => f.write_str("standalone"),
            OutputMode::Main => f.write_str("main"),
        }
    }
}

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Main dataset file (read, and rewritten in `Main` mode)
    pub main_dataset: PathBuf,
    /// Directory for review, side and standalone output files
    pub output_dir: PathBuf,
    pub input_format: InputFormat,
    /// Contributor-declared metadata columns
    pub declared_columns: Vec<String>,
    pub demo: bool,
    pub prune_false_negatives: bool,
    pub output_mode: OutputMode,
    pub review_file: String,
    pub incomplete_file: String,
    pub output_file: String,
    /// Stamped as `ContributionDate` on accepted features
    pub contribution_date: NaiveDate,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            main_dataset: PathBuf::from("rts_dataset.geojson"),
            output_dir: PathBuf::from("."),
            input_format: InputFormat::default(),
            declared_columns: Vec::new(),
            demo: false,
            prune_false_negatives: false,
            output_mode: OutputMode::default(),
            review_file: "overlapping_features.geojson".to_string(),
            incomplete_file: "incomplete_classifications.geojson".to_string(),
            output_file: "formatted_batch.geojson".to_string(),
            contribution_date: arts_common::time::today(),
        }
    }
}

impl PipelineConfig {
    pub fn review_path(&self) -> PathBuf {
        self.output_dir.join(&self.review_file)
    }

    pub fn incomplete_path(&self) -> PathBuf {
        self.output_dir.join(&self.incomplete_file)
    }

    pub fn output_path(&self) -> PathBuf {
        self.output_dir.join(&self.output_file)
    }
}

/// A batch after ingestion, with its source file's collection metadata
#[derive(Debug, Clone)]
pub struct IngestedBatch {
    pub session: BatchSession,
    /// Name and CRS of the source file, for writing outputs
    pub template: FeatureFile,
}

/// Result of the scan phase
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    pub cross: ScanSummary,
    pub self_scan: ScanSummary,
    /// Features with any detected overlap
    pub overlapping: usize,
    /// Review file written, if any
    pub review_file: Option<PathBuf>,
}

/// Result of a full run
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub session_id: uuid::Uuid,
    pub state: BatchState,
    pub scan: ScanReport,
    pub completeness: CompletenessReport,
    /// Features accepted
    pub accepted: usize,
    /// Main-dataset features removed as false negatives
    pub pruned: usize,
    /// Output file written, if any
    pub output: Option<PathBuf>,
}

/// Pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Load the main dataset; a missing file is an empty dataset
    pub fn load_main(&self) -> Result<(MainDataset, Option<FeatureFile>)> {
        let path = &self.config.main_dataset;
        if !path.exists() {
            warn!(path = %path.display(), "Main dataset not found; treating as empty");
            return Ok((MainDataset::default(), None));
        }

        let mut file = read_feature_file(path, InputFormat::GeoJson)?;
        let main = MainDataset::new(std::mem::take(&mut file.features));
        info!(path = %path.display(), features = main.len(), "Loaded main dataset");
        Ok((main, Some(file)))
    }

    /// Read, validate and assign UIDs to a batch file
    pub fn ingest(&self, batch_path: &Path) -> Result<IngestedBatch> {
        let mut file = read_feature_file(batch_path, self.config.input_format)?;
        let batch = Batch::new(std::mem::take(&mut file.features));

        FormattingValidator::with_declared_columns(self.config.declared_columns.clone())
            .validate(&batch, &file.columns)?;

        let batch = assign_uids(batch);
        // Every feature now carries a UID, so it joins like any other column
        file.columns.insert(schema::UID.to_string());
        let session = BatchSession::new(batch, file.columns.clone());

        info!(
            session_id = %session.session_id,
            path = %batch_path.display(),
            features = session.batch.len(),
            "Batch ingested"
        );
        Ok(IngestedBatch {
            session,
            template: file,
        })
    }

    /// Cross-batch then self scan; writes the review file unless in demo mode
    pub fn scan(&self, ingested: &mut IngestedBatch, main: &MainDataset) -> Result<ScanReport> {
        self.scan_batch(ingested, main, !self.config.demo)
    }

    fn scan_batch(
        &self,
        ingested: &mut IngestedBatch,
        main: &MainDataset,
        write_review: bool,
    ) -> Result<ScanReport> {
        let session = &mut ingested.session;

        let cross = scan_cross_batch(&mut session.batch, main);
        session.transition_to(BatchState::CrossScanned)?;

        let self_scan = scan_self(&mut session.batch);
        session.transition_to(BatchState::SelfScanned)?;

        let overlapping: Vec<Feature> = session.batch.overlapping().into_iter().cloned().collect();
        let mut report = ScanReport {
            cross,
            self_scan,
            overlapping: overlapping.len(),
            review_file: None,
        };

        if overlapping.is_empty() {
            info!("No overlapping features; review not required");
        } else if !write_review {
            info!(overlapping = report.overlapping, "Review file not written");
        } else {
            let path = self.config.review_path();
            write_feature_file(&path, &FeatureFile::with_features(&ingested.template, overlapping))?;
            info!(
                path = %path.display(),
                overlapping = report.overlapping,
                "Wrote overlapping features for review"
            );
            report.review_file = Some(path);
        }

        session.transition_to(BatchState::AwaitingReview)?;
        Ok(report)
    }

    /// Scan only
    pub fn scan_file(&self, batch_path: &Path) -> Result<ScanReport> {
        let (main, _) = self.load_main()?;
        let mut ingested = self.ingest(batch_path)?;
        self.scan(&mut ingested, &main)
    }

    /// Full run: scan, join review, check, reconcile, write
    pub fn run(&self, batch_path: &Path, classification: Option<&Path>) -> Result<RunOutcome> {
        let (mut main, main_template) = self.load_main()?;
        let mut ingested = self.ingest(batch_path)?;
        // The review file may hold the reviewer's edits; never overwrite it here
        let scan = self.scan_batch(&mut ingested, &main, false)?;

        let review = self.load_review(classification)?;
        let reconciler = MergeReconciler::new(self.config.contribution_date);

        let session = &mut ingested.session;
        let batch = std::mem::take(&mut session.batch);
        session.batch = reconciler.join(batch, &session.columns, review.as_ref())?;

        let completeness = check_complete(&session.batch);
        if !completeness.is_complete() {
            session.transition_to(BatchState::Incomplete)?;
            return self.stop_incomplete(&ingested, scan, completeness);
        }
        session.transition_to(BatchState::Complete)?;

        let batch = std::mem::take(&mut session.batch);
        session.batch = reconciler.reconcile(batch, &main);
        session.transition_to(BatchState::Merged)?;

        let pruned = if self.config.prune_false_negatives {
            prune_false_negatives(&mut main, &session.batch)
        } else {
            0
        };

        let accepted = session.batch.len();
        let output = self.write_output(&ingested, main, main_template)?;
        let session = &mut ingested.session;
        session.transition_to(BatchState::Appended)?;

        info!(
            session_id = %session.session_id,
            accepted,
            pruned,
            mode = %self.config.output_mode,
            "Batch merge complete"
        );

        Ok(RunOutcome {
            session_id: session.session_id,
            state: session.state,
            scan,
            completeness,
            accepted,
            pruned,
            output,
        })
    }

    /// Explicit classification file, or the default review file if present
    fn load_review(&self, classification: Option<&Path>) -> Result<Option<FeatureFile>> {
        let path = match classification {
            Some(path) => path.to_path_buf(),
            None => {
                let path = self.config.review_path();
                if !path.exists() {
                    debug!(path = %path.display(), "No default classification file");
                    return Ok(None);
                }
                path
            }
        };
        read_feature_file(&path, self.config.input_format).map(Some)
    }

    fn stop_incomplete(
        &self,
        ingested: &IngestedBatch,
        scan: ScanReport,
        completeness: CompletenessReport,
    ) -> Result<RunOutcome> {
        let session = &ingested.session;
        let count = completeness.violations.len();

        if self.config.demo {
            warn!(incomplete = count, "Demo mode: continuing past incomplete classifications");
            return Ok(RunOutcome {
                session_id: session.session_id,
                state: session.state,
                scan,
                completeness,
                accepted: 0,
                pruned: 0,
                output: None,
            });
        }

        let incomplete: Vec<Feature> = completeness
            .indices()
            .into_iter()
            .filter_map(|i| session.batch.features.get(i).cloned())
            .collect();
        let path = self.config.incomplete_path();
        write_feature_file(&path, &FeatureFile::with_features(&ingested.template, incomplete))?;
        warn!(path = %path.display(), incomplete = count, "Wrote incomplete features for correction");

        Err(Error::Incomplete {
            count,
            side_file: Some(path),
        })
    }

    fn write_output(
        &self,
        ingested: &IngestedBatch,
        mut main: MainDataset,
        main_template: Option<FeatureFile>,
    ) -> Result<Option<PathBuf>> {
        if self.config.demo {
            info!("Demo mode: output not written");
            return Ok(None);
        }

        let batch = ingested.session.batch.clone();
        let (path, file) = match self.config.output_mode {
            OutputMode::Standalone => (
                self.config.output_path(),
                FeatureFile::with_features(&ingested.template, batch.features),
            ),
            OutputMode::Main => {
                main.append(batch);
                let template = main_template.as_ref().unwrap_or(&ingested.template);
                (
                    self.config.main_dataset.clone(),
                    FeatureFile::with_features(template, main.features),
                )
            }
        };

        write_feature_file(&path, &file)?;
        info!(path = %path.display(), features = file.features.len(), "Wrote output");
        Ok(Some(path))
    }
}

/// Give every feature without a UID a deterministic one
///
/// The UUIDv5 is derived from the geometry and key metadata, so rerunning
/// over the same batch file yields the same UIDs.
pub fn assign_uids(mut batch: Batch) -> Batch {
    let mut assigned = 0usize;
    for feature in batch.features.iter_mut().filter(|f| f.uid.is_empty()) {
        feature.uid = uid::derive(&uid_seed(feature)).to_string();
        assigned += 1;
    }
    if assigned > 0 {
        info!(assigned, "Assigned UIDs to new features");
    }
    batch
}

fn uid_seed(feature: &Feature) -> String {
    let meta = &feature.metadata;
    let mut seed = format!(
        "{}|{}|{}|{}|",
        meta.region_name, meta.creator_lab, meta.basemap_date, meta.basemap_source
    );
    for polygon in &feature.geometry.0 {
        for coord in polygon.exterior().coords() {
            seed.push_str(&format!("{:.6},{:.6};", coord.x, coord.y));
        }
        seed.push('|');
    }
    seed
}
