//! Command-line interface definitions and argument parsing

use std::net::SocketAddr;
use std::path::PathBuf;

use chrono::NaiveDate;
use clap::Parser;

use crate::churn::{LabelPolicy, RiskBands};
use crate::model::BetaGeoFitter;
use crate::pipeline::PipelineConfig;

/// Customer churn-risk report over Olist order data using a BG/NBD model
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Directory containing the orders, order items and customers CSV files
    #[arg(short, long, env = "CHURNWATCH_DATA_DIR", default_value = "data")]
    pub data_dir: PathBuf,

    /// Address the web server listens on
    #[arg(short, long, env = "CHURNWATCH_BIND", default_value = "127.0.0.1:5000")]
    pub bind: SocketAddr,

    /// Observation cutoff (YYYY-MM-DD); defaults to the latest purchase date
    #[arg(long)]
    pub cutoff: Option<NaiveDate>,

    /// How alive probabilities are turned into churn labels
    #[arg(long, value_enum, default_value_t = LabelPolicy::Banded)]
    pub label_policy: LabelPolicy,

    /// L2 penalty applied to the model parameters while fitting
    #[arg(long, default_value = "0.0")]
    pub penalizer: f64,

    /// Convergence tolerance for the model fit
    #[arg(long, default_value = "1e-7")]
    pub tolerance: f64,

    /// Maximum optimiser iterations for the model fit
    #[arg(long, default_value = "2000")]
    pub max_iters: usize,

    /// Run the pipeline once, print the high-risk table and exit
    #[arg(long)]
    pub report: bool,

    /// Enable verbose (debug) logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Pipeline settings described by these arguments
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            data_dir: self.data_dir.clone(),
            cutoff: self.cutoff,
            label_policy: self.label_policy,
            bands: RiskBands::default(),
            fitter: BetaGeoFitter {
                penalizer_coef: self.penalizer,
                tolerance: self.tolerance,
                max_iterations: self.max_iters,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["churnwatch"]).unwrap();
        let config = args.pipeline_config();

        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.cutoff, None);
        assert_eq!(config.label_policy, LabelPolicy::Banded);
        assert_eq!(config.fitter.penalizer_coef, 0.0);
        assert_eq!(config.fitter.max_iterations, 2000);
        assert!(!args.report);
    }

    #[test]
    fn test_parse_overrides() {
        let args = Args::try_parse_from([
            "churnwatch",
            "--data-dir",
            "/tmp/olist",
            "--cutoff",
            "2018-09-01",
            "--label-policy",
            "legacy",
            "--penalizer",
            "0.01",
            "--bind",
            "0.0.0.0:8080",
            "--report",
        ])
        .unwrap();
        let config = args.pipeline_config();

        assert_eq!(config.data_dir, PathBuf::from("/tmp/olist"));
        assert_eq!(config.cutoff, NaiveDate::from_ymd_opt(2018, 9, 1));
        assert_eq!(config.label_policy, LabelPolicy::Legacy);
        assert_eq!(config.fitter.penalizer_coef, 0.01);
        assert_eq!(args.bind.port(), 8080);
        assert!(args.report);
    }

    #[test]
    fn test_invalid_cutoff() {
        assert!(Args::try_parse_from(["churnwatch", "--cutoff", "01/09/2018"]).is_err());
        assert!(Args::try_parse_from(["churnwatch", "--label-policy", "strict"]).is_err());
    }
}
