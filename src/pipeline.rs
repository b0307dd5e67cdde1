//! End-to-end churn pipeline: load → assemble → summarise → classify

use std::path::PathBuf;
use std::time::Instant;

use chrono::NaiveDate;
use tracing::info;

use crate::churn::{high_risk, ChurnClassifier, LabelPolicy, RiskBands, ScoredCustomer};
use crate::data::{assemble_transactions, load_tables, RawTables};
use crate::error::ChurnResult;
use crate::model::{AliveModel, BetaGeoFitter};
use crate::report::HighRiskRow;
use crate::summary::{repeat_customers, summarize};

/// Everything a pipeline run needs to know
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Directory holding the three Olist CSV files
    pub data_dir: PathBuf,
    /// Observation cutoff; defaults to the latest purchase date
    pub cutoff: Option<NaiveDate>,
    pub label_policy: LabelPolicy,
    pub bands: RiskBands,
    pub fitter: BetaGeoFitter,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            cutoff: None,
            label_policy: LabelPolicy::default(),
            bands: RiskBands::default(),
            fitter: BetaGeoFitter::default(),
        }
    }
}

/// Result of one pipeline run
#[derive(Debug, Clone, PartialEq)]
pub struct ChurnReport {
    /// Observation cutoff actually used
    pub cutoff: Option<NaiveDate>,
    pub label_policy: LabelPolicy,
    /// Distinct customers with at least one purchase before the cutoff
    pub customers: usize,
    /// Every repeat customer, scored and labelled
    pub scored: Vec<ScoredCustomer>,
}

impl ChurnReport {
    /// Size of the repeat-purchase cohort that was scored
    pub fn cohort_size(&self) -> usize {
        self.scored.len()
    }

    /// The high-risk customers, projected for rendering
    pub fn high_risk_rows(&self) -> Vec<HighRiskRow> {
        high_risk(&self.scored).iter().map(HighRiskRow::from).collect()
    }
}

/// A configured pipeline; each `run` recomputes from the files on disk
pub struct ChurnPipeline<M = BetaGeoFitter> {
    config: PipelineConfig,
    classifier: ChurnClassifier<M>,
}

impl ChurnPipeline<BetaGeoFitter> {
    pub fn new(config: PipelineConfig) -> ChurnResult<Self> {
        let fitter = config.fitter;
        fitter.validate()?;
        Self::with_model(config, fitter)
    }
}

impl<M: AliveModel> ChurnPipeline<M> {
    /// Build a pipeline around any cohort model
    pub fn with_model(config: PipelineConfig, model: M) -> ChurnResult<Self> {
        let classifier = ChurnClassifier::new(model, config.label_policy).with_bands(config.bands)?;
        Ok(Self { config, classifier })
    }

    /// Load the tables from the configured directory and run every stage
    pub fn run(&self) -> ChurnResult<ChurnReport> {
        let start = Instant::now();
        let tables = load_tables(&self.config.data_dir)?;
        let report = self.run_on(&tables)?;

        info!(
            customers = report.customers,
            cohort = report.cohort_size(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "churn pipeline complete"
        );
        Ok(report)
    }

    /// Run every stage after loading on already-loaded tables
    pub fn run_on(&self, tables: &RawTables) -> ChurnResult<ChurnReport> {
        let transactions = assemble_transactions(tables)?;
        let summaries = summarize(&transactions, self.config.cutoff)?;
        let cohort = repeat_customers(&summaries.customers);

        info!(
            transactions = transactions.len(),
            customers = summaries.customers.len(),
            repeat_customers = cohort.len(),
            cutoff = ?summaries.cutoff,
            "summarised purchase histories"
        );

        let scored = self.classifier.classify(&cohort)?;

        Ok(ChurnReport {
            cutoff: summaries.cutoff,
            label_policy: self.classifier.policy(),
            customers: summaries.customers.len(),
            scored,
        })
    }
}
