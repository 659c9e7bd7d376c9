//! Irrigation recommendations derived from predicted soil moisture.

use std::fmt;

use crate::error::{PipelineError, Result};

/// What to do with irrigation given a predicted moisture percentage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IrrigationAdvice {
    Irrigate,
    Withhold,
    Adequate,
}

impl IrrigationAdvice {
    /// Wording for the advice drawn from the mean over the evaluation set.
    pub fn field_message(self) -> &'static str {
        match self {
            IrrigationAdvice::Irrigate => {
                "Low predicted moisture. Irrigate in the next window (precision agriculture practice)."
            }
            IrrigationAdvice::Withhold => {
                "Very high predicted moisture. Avoid irrigating for now and keep monitoring."
            }
            IrrigationAdvice::Adequate => "Adequate moisture predicted. Keep monitoring before irrigating.",
        }
    }

    /// Wording for the advice on a single simulated scenario.
    pub fn scenario_message(self) -> &'static str {
        match self {
            IrrigationAdvice::Irrigate => "Irrigation recommended for this scenario.",
            IrrigationAdvice::Withhold => "Avoid irrigation: predicted moisture is already very high.",
            IrrigationAdvice::Adequate => "Adequate moisture predicted. Keep monitoring.",
        }
    }
}

impl fmt::Display for IrrigationAdvice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            IrrigationAdvice::Irrigate => "irrigate",
            IrrigationAdvice::Withhold => "withhold irrigation",
            IrrigationAdvice::Adequate => "adequate",
        };
        f.write_str(label)
    }
}

/// Moisture bounds, in percent. Both comparisons are strict: a value equal
/// to a bound is adequate.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Thresholds {
    pub irrigate_below: f64,
    pub withhold_above: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            irrigate_below: 60.0,
            withhold_above: 90.0,
        }
    }
}

impl Thresholds {
    pub fn new(irrigate_below: f64, withhold_above: f64) -> Result<Self> {
        if !(irrigate_below <= withhold_above) {
            return Err(PipelineError::InvalidConfig(format!(
                "irrigation threshold {irrigate_below} must not exceed withhold threshold {withhold_above}"
            )));
        }
        Ok(Self {
            irrigate_below,
            withhold_above,
        })
    }

    pub fn advise(&self, moisture: f64) -> IrrigationAdvice {
        if moisture < self.irrigate_below {
            IrrigationAdvice::Irrigate
        } else if moisture > self.withhold_above {
            IrrigationAdvice::Withhold
        } else {
            IrrigationAdvice::Adequate
        }
    }

    /// Advice for the mean of `predictions`; `None` when there are none.
    pub fn advise_mean(&self, predictions: &[f64]) -> Option<(f64, IrrigationAdvice)> {
        if predictions.is_empty() {
            return None;
        }
        let mean = predictions.iter().sum::<f64>() / predictions.len() as f64;
        Some((mean, self.advise(mean)))
    }
}
