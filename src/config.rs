use std::path::{Path, PathBuf};

use crate::advisor::Thresholds;
use crate::error::{PipelineError, Result};
use crate::linear_model::RankPolicy;
use crate::record::Feature;

/// File the ETL stage hands over to the dashboard.
pub const DEFAULT_SOURCE: &str = "dados_limpos.csv";
pub const DEFAULT_TEST_FRACTION: f64 = 0.2;
pub const DEFAULT_SEED: u64 = 42;
pub const DEFAULT_HISTOGRAM_BINS: usize = 15;

/// Settings for one run of the pipeline.
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineConfig {
    pub source: PathBuf,
    pub features: Vec<Feature>,
    pub test_fraction: f64,
    pub seed: u64,
    pub rank_policy: RankPolicy,
    pub thresholds: Thresholds,
    pub histogram_bins: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source: PathBuf::from(DEFAULT_SOURCE),
            features: Feature::ALL.to_vec(),
            test_fraction: DEFAULT_TEST_FRACTION,
            seed: DEFAULT_SEED,
            rank_policy: RankPolicy::default(),
            thresholds: Thresholds::default(),
            histogram_bins: DEFAULT_HISTOGRAM_BINS,
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn source<P: AsRef<Path>>(mut self, source: P) -> Self {
        self.source = source.as_ref().to_path_buf();
        self
    }

    pub fn features(mut self, features: &[Feature]) -> Self {
        self.features = features.to_vec();
        self
    }

    pub fn test_fraction(mut self, test_fraction: f64) -> Self {
        self.test_fraction = test_fraction;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn rank_policy(mut self, rank_policy: RankPolicy) -> Self {
        self.rank_policy = rank_policy;
        self
    }

    pub fn thresholds(mut self, thresholds: Thresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn histogram_bins(mut self, bins: usize) -> Self {
        self.histogram_bins = bins;
        self
    }

    /// Checks the settings that can be checked without data.
    pub fn validate(&self) -> Result<()> {
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(PipelineError::InvalidFraction(self.test_fraction));
        }
        if self.features.is_empty() {
            return Err(PipelineError::InvalidFeatures("no features selected".to_string()));
        }
        if self.histogram_bins == 0 {
            return Err(PipelineError::InvalidConfig("histogram_bins must be positive".to_string()));
        }
        Ok(())
    }
}
