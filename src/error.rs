use thiserror::Error;

use crate::record::Feature;

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Every failure the pipeline can surface. None of them are retried; the
/// caller is expected to show the message and stop the run.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Source missing, unreadable, lacking a required column or holding a
    /// value that is not a number.
    #[error("failed to load data: {0}")]
    DataLoad(String),

    #[error("test fraction must be strictly between 0 and 1, got {0}")]
    InvalidFraction(f64),

    /// Too few rows to fit or evaluate, or a rank-deficient feature matrix.
    #[error("insufficient data: {0}")]
    InsufficientData(String),

    #[error("expected {expected} feature values, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("invalid feature selection: {0}")]
    InvalidFeatures(String),

    #[error("feature vector has no value for {0}")]
    MissingFeature(Feature),

    /// NaN or infinite value where a finite number is required.
    #[error("non-finite value: {0}")]
    NonFinite(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl PipelineError {
    pub(crate) fn data_load(source: impl std::fmt::Display, reason: impl std::fmt::Display) -> Self {
        PipelineError::DataLoad(format!("{source}: {reason}"))
    }
}
