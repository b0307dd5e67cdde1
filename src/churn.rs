//! Churn scoring and risk labelling

use std::fmt;

use clap::ValueEnum;
use tracing::{debug, info};

use crate::error::{ChurnError, ChurnResult};
use crate::model::{AliveEstimate, AliveModel};
use crate::summary::CustomerSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChurnLabel {
    NotChurned,
    HighRisk,
    Churned,
}

impl ChurnLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            ChurnLabel::NotChurned => "not churned",
            ChurnLabel::HighRisk => "high risk",
            ChurnLabel::Churned => "churned",
        }
    }
}

impl fmt::Display for ChurnLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How `prob_alive` is mapped to a label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LabelPolicy {
    /// Three tiers: churned below the lower band edge, high risk inside the band,
    /// not churned above it
    #[default]
    Banded,
    /// The historical two-pass labelling: first mark churned below the lower
    /// edge, then overwrite everything outside the band with high risk.
    /// Nothing ends up labelled churned, and in-band customers end up not churned.
    Legacy,
}

/// Probability thresholds for labelling
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskBands {
    /// Below this a customer is considered churned
    pub churned_below: f64,
    /// Between `churned_below` and this a customer is high risk
    pub high_risk_below: f64,
}

impl Default for RiskBands {
    fn default() -> Self {
        Self {
            churned_below: 0.10,
            high_risk_below: 0.20,
        }
    }
}

impl RiskBands {
    pub fn validate(&self) -> ChurnResult<()> {
        let ordered = 0.0 <= self.churned_below
            && self.churned_below < self.high_risk_below
            && self.high_risk_below <= 1.0;
        if ordered {
            Ok(())
        } else {
            Err(ChurnError::InvalidConfig(format!(
                "risk bands must satisfy 0 <= {} < {} <= 1",
                self.churned_below, self.high_risk_below
            )))
        }
    }

    fn in_band(&self, prob_alive: f64) -> bool {
        prob_alive >= self.churned_below && prob_alive < self.high_risk_below
    }
}

impl LabelPolicy {
    pub fn label(self, prob_alive: f64, bands: &RiskBands) -> ChurnLabel {
        match self {
            LabelPolicy::Banded => {
                if prob_alive < bands.churned_below {
                    ChurnLabel::Churned
                } else if prob_alive < bands.high_risk_below {
                    ChurnLabel::HighRisk
                } else {
                    ChurnLabel::NotChurned
                }
            }
            LabelPolicy::Legacy => {
                let first_pass = if prob_alive < bands.churned_below {
                    ChurnLabel::Churned
                } else {
                    ChurnLabel::NotChurned
                };
                if bands.in_band(prob_alive) {
                    first_pass
                } else {
                    ChurnLabel::HighRisk
                }
            }
        }
    }
}

/// A summary with its model score and label
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCustomer {
    pub summary: CustomerSummary,
    pub prob_alive: f64,
    pub churn: ChurnLabel,
}

/// Fits a model over a repeat-purchase cohort and labels every customer
#[derive(Debug, Clone)]
pub struct ChurnClassifier<M> {
    model: M,
    policy: LabelPolicy,
    bands: RiskBands,
}

impl<M: AliveModel> ChurnClassifier<M> {
    pub fn new(model: M, policy: LabelPolicy) -> Self {
        Self {
            model,
            policy,
            bands: RiskBands::default(),
        }
    }

    pub fn with_bands(mut self, bands: RiskBands) -> ChurnResult<Self> {
        bands.validate()?;
        self.bands = bands;
        Ok(self)
    }

    pub fn policy(&self) -> LabelPolicy {
        self.policy
    }

    /// Score and label every customer in `cohort`
    ///
    /// `cohort` should only hold customers with `frequency > 0`. An empty
    /// cohort returns an empty result without fitting the model.
    pub fn classify(&self, cohort: &[CustomerSummary]) -> ChurnResult<Vec<ScoredCustomer>> {
        if cohort.is_empty() {
            debug!("empty cohort, skipping model fit");
            return Ok(Vec::new());
        }

        let fitted = self.model.fit(cohort)?;

        let scored = cohort
            .iter()
            .map(|customer| {
                let prob_alive = fitted.prob_alive(customer);
                if !prob_alive.is_finite() {
                    return Err(ChurnError::model_fit(format!(
                        "non-finite alive probability for customer {}",
                        customer.customer_unique_id
                    )));
                }
                let prob_alive = prob_alive.clamp(0.0, 1.0);
                Ok(ScoredCustomer {
                    summary: customer.clone(),
                    prob_alive,
                    churn: self.policy.label(prob_alive, &self.bands),
                })
            })
            .collect::<ChurnResult<Vec<_>>>()?;

        info!(
            cohort = scored.len(),
            high_risk = scored.iter().filter(|s| s.churn == ChurnLabel::HighRisk).count(),
            policy = ?self.policy,
            "classified cohort"
        );

        Ok(scored)
    }
}

/// The high-risk subset, in input order
pub fn high_risk(scored: &[ScoredCustomer]) -> Vec<ScoredCustomer> {
    scored
        .iter()
        .filter(|s| s.churn == ChurnLabel::HighRisk)
        .cloned()
        .collect()
}
