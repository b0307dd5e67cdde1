//! churnwatch: customer churn-risk reporting for e-commerce order data
//!
//! Loads Olist order, order item and customer tables, summarises purchase
//! histories into frequency / recency / T, fits a BG/NBD model over repeat
//! customers and labels each one by its probability of still being active.

pub mod churn;
pub mod cli;
pub mod data;
pub mod error;
pub mod model;
pub mod optimize;
pub mod pipeline;
pub mod report;
pub mod server;
pub mod summary;

// Re-export public items for easier access
pub use churn::{high_risk, ChurnClassifier, ChurnLabel, LabelPolicy, RiskBands, ScoredCustomer};
pub use cli::Args;
pub use data::{assemble_transactions, load_tables, RawTables, Transaction};
pub use error::{ChurnError, ChurnResult};
pub use model::{AliveEstimate, AliveModel, BetaGeoFitter, BetaGeoParams};
pub use pipeline::{ChurnPipeline, ChurnReport, PipelineConfig};
pub use report::{render_html, HighRiskRow};
pub use summary::{repeat_customers, summarize, CustomerSummary, Summaries};

/// Result type used by the binary
pub type Result<T> = anyhow::Result<T>;
