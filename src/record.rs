//! Sensor observations and the feature columns they expose.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::error::PipelineError;

/// Header of the target column.
pub const TARGET_COLUMN: &str = "SOIL_PCT";

/// One of the sensor readings a model can be trained on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Feature {
    Ph,
    NpkN,
    NpkP,
    NpkK,
    LdrMv,
}

impl Feature {
    /// All features in the order the dashboard trains on them.
    pub const ALL: [Feature; 5] = [
        Feature::Ph,
        Feature::NpkN,
        Feature::NpkP,
        Feature::NpkK,
        Feature::LdrMv,
    ];

    pub fn column(self) -> &'static str {
        match self {
            Feature::Ph => "PH",
            Feature::NpkN => "NPK_N",
            Feature::NpkP => "NPK_P",
            Feature::NpkK => "NPK_K",
            Feature::LdrMv => "LDR_MV",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

impl FromStr for Feature {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Feature::ALL
            .iter()
            .copied()
            .find(|feature| feature.column() == s)
            .ok_or_else(|| PipelineError::InvalidFeatures(format!("unknown feature column '{s}'")))
    }
}

/// A single row of sensor data. The target is optional until the dataset is
/// cleaned.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Record {
    #[serde(rename = "PH")]
    pub ph: f64,
    #[serde(rename = "NPK_N")]
    pub npk_n: f64,
    #[serde(rename = "NPK_P")]
    pub npk_p: f64,
    #[serde(rename = "NPK_K")]
    pub npk_k: f64,
    #[serde(rename = "LDR_MV")]
    pub ldr_mv: f64,
    #[serde(rename = "SOIL_PCT")]
    pub soil_pct: Option<f64>,
}

impl Record {
    pub fn new(ph: f64, npk_n: f64, npk_p: f64, npk_k: f64, ldr_mv: f64, soil_pct: Option<f64>) -> Self {
        Self {
            ph,
            npk_n,
            npk_p,
            npk_k,
            ldr_mv,
            soil_pct,
        }
    }

    pub fn value(&self, feature: Feature) -> f64 {
        match feature {
            Feature::Ph => self.ph,
            Feature::NpkN => self.npk_n,
            Feature::NpkP => self.npk_p,
            Feature::NpkK => self.npk_k,
            Feature::LdrMv => self.ldr_mv,
        }
    }

    pub fn features(&self, selection: &[Feature]) -> FeatureVector {
        FeatureVector {
            features: selection.to_vec(),
            values: selection.iter().map(|&f| self.value(f)).collect(),
        }
    }
}

/// Feature values tagged with the feature each one belongs to. Models look
/// values up by feature, so the order here need not match training order.
#[derive(Clone, Debug, PartialEq)]
pub struct FeatureVector {
    features: Vec<Feature>,
    values: Vec<f64>,
}

impl FeatureVector {
    /// Vector over all five sensors in canonical order.
    pub fn new(ph: f64, npk_n: f64, npk_p: f64, npk_k: f64, ldr_mv: f64) -> Self {
        Self {
            features: Feature::ALL.to_vec(),
            values: vec![ph, npk_n, npk_p, npk_k, ldr_mv],
        }
    }

    /// Pairs `values[j]` with `features[j]`.
    pub fn from_values(features: &[Feature], values: Vec<f64>) -> Result<Self, PipelineError> {
        if features.len() != values.len() {
            return Err(PipelineError::DimensionMismatch {
                expected: features.len(),
                actual: values.len(),
            });
        }
        Ok(Self {
            features: features.to_vec(),
            values,
        })
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn get(&self, feature: Feature) -> Option<f64> {
        self.features
            .iter()
            .position(|&f| f == feature)
            .map(|j| self.values[j])
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<[f64; 5]> for FeatureVector {
    fn from(values: [f64; 5]) -> Self {
        Self {
            features: Feature::ALL.to_vec(),
            values: values.to_vec(),
        }
    }
}
