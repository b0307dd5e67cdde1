//! Error taxonomy for the churn pipeline

use std::fmt::Display;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChurnError {
    /// An input table is missing, unreadable or malformed.
    #[error("data unavailable ({location}): {reason}")]
    DataUnavailable { location: String, reason: String },

    /// The frequency/recency model could not be fitted.
    #[error("model fit failed: {0}")]
    ModelFit(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ChurnError {
    pub fn data_unavailable(location: impl Display, reason: impl Display) -> Self {
        ChurnError::DataUnavailable {
            location: location.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn model_fit(reason: impl Display) -> Self {
        ChurnError::ModelFit(reason.to_string())
    }
}

pub type ChurnResult<T> = Result<T, ChurnError>;
