//! Exploratory statistics shown next to the model: per-column summary,
//! feature/target correlations and the target histogram.

use std::cmp::Ordering;

use crate::dataset::{CleanDataset, Dataset};
use crate::error::{PipelineError, Result};
use crate::record::{Feature, TARGET_COLUMN};

/// Describe-style summary of one column. Statistics are over the present
/// values only; they are `None` when the column has none.
#[derive(Clone, Debug, PartialEq)]
pub struct ColumnSummary {
    pub column: &'static str,
    pub count: usize,
    pub missing: usize,
    pub mean: Option<f64>,
    /// Sample standard deviation (n - 1 denominator).
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub q25: Option<f64>,
    pub median: Option<f64>,
    pub q75: Option<f64>,
    pub max: Option<f64>,
}

impl ColumnSummary {
    fn from_values(column: &'static str, values: impl IntoIterator<Item = Option<f64>>) -> Self {
        let mut present = Vec::new();
        let mut missing = 0;
        for value in values {
            match value {
                Some(v) => present.push(v),
                None => missing += 1,
            }
        }
        present.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

        let count = present.len();
        let mean = (count > 0).then(|| present.iter().sum::<f64>() / count as f64);
        let std = mean.filter(|_| count > 1).map(|m| {
            let ss = present.iter().map(|v| (v - m) * (v - m)).sum::<f64>();
            (ss / (count - 1) as f64).sqrt()
        });

        Self {
            column,
            count,
            missing,
            mean,
            std,
            min: present.first().copied(),
            q25: quantile(&present, 0.25),
            median: quantile(&present, 0.5),
            q75: quantile(&present, 0.75),
            max: present.last().copied(),
        }
    }
}

/// Linear-interpolated quantile of sorted values.
fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let weight = position - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * weight)
}

/// Summary of every feature column followed by the target column.
pub fn describe(dataset: &Dataset) -> Vec<ColumnSummary> {
    let records = dataset.records();
    let mut summaries: Vec<ColumnSummary> = Feature::ALL
        .iter()
        .map(|&f| ColumnSummary::from_values(f.column(), records.iter().map(|r| Some(r.value(f)))))
        .collect();
    summaries.push(ColumnSummary::from_values(
        TARGET_COLUMN,
        records.iter().map(|r| r.soil_pct),
    ));
    summaries
}

/// Pearson correlation; `None` when either side has no variance or there
/// are fewer than two pairs.
pub fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() || x.len() < 2 {
        return None;
    }
    let n = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (a, b) in x.iter().zip(y) {
        let dx = a - mean_x;
        let dy = b - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    Some(cov / (var_x * var_y).sqrt())
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FeatureCorrelation {
    pub feature: Feature,
    pub coefficient: Option<f64>,
}

/// Correlation of each feature with the target, highest first. Undefined
/// correlations sort last.
pub fn target_correlations(dataset: &CleanDataset) -> Vec<FeatureCorrelation> {
    let targets = dataset.targets().to_vec();
    let mut correlations: Vec<FeatureCorrelation> = Feature::ALL
        .iter()
        .map(|&feature| {
            let column: Vec<f64> = dataset.records().iter().map(|r| r.value(feature)).collect();
            FeatureCorrelation {
                feature,
                coefficient: pearson(&column, &targets),
            }
        })
        .collect();

    correlations.sort_by(|a, b| match (a.coefficient, b.coefficient) {
        (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    correlations
}

/// Equal-width histogram. The last bin includes its right edge.
#[derive(Clone, Debug, PartialEq)]
pub struct Histogram {
    pub edges: Vec<f64>,
    pub counts: Vec<usize>,
}

impl Histogram {
    pub fn new(values: &[f64], bins: usize) -> Result<Self> {
        if bins == 0 {
            return Err(PipelineError::InvalidConfig("histogram needs at least one bin".to_string()));
        }
        if values.is_empty() {
            return Err(PipelineError::InsufficientData("no values to bin".to_string()));
        }

        let mut lo = values.iter().copied().fold(f64::INFINITY, f64::min);
        let mut hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if lo == hi {
            lo -= 0.5;
            hi += 0.5;
        }

        let width = (hi - lo) / bins as f64;
        let edges: Vec<f64> = (0..=bins).map(|i| lo + width * i as f64).collect();
        let mut counts = vec![0; bins];
        for &v in values {
            let bin = (((v - lo) / width) as usize).min(bins - 1);
            counts[bin] += 1;
        }

        Ok(Self { edges, counts })
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }
}
