use log::warn;
use std::fmt;

use crate::Vector;
use crate::error::{PipelineError, Result};

fn check_lengths(y_true: &Vector, y_pred: &Vector) -> Result<()> {
    if y_true.len() != y_pred.len() {
        return Err(PipelineError::DimensionMismatch {
            expected: y_true.len(),
            actual: y_pred.len(),
        });
    }
    if y_true.is_empty() {
        return Err(PipelineError::InsufficientData(
            "cannot score an empty set of predictions".to_string(),
        ));
    }
    Ok(())
}

pub fn mean_squared_error(y_true: &Vector, y_pred: &Vector) -> Result<f64> {
    check_lengths(y_true, y_pred)?;

    let diff = y_true - y_pred;
    Ok(diff.mapv(|x| x * x).sum() / diff.len() as f64)
}

pub fn root_mean_squared_error(y_true: &Vector, y_pred: &Vector) -> Result<f64> {
    mean_squared_error(y_true, y_pred).map(f64::sqrt)
}

pub fn mean_absolute_error(y_true: &Vector, y_pred: &Vector) -> Result<f64> {
    check_lengths(y_true, y_pred)?;

    let diff = y_true - y_pred;
    Ok(diff.mapv(f64::abs).sum() / diff.len() as f64)
}

/// Coefficient of determination. When `y_true` has no variance the ratio is
/// undefined: exact predictions score 1.0 and anything else scores 0.0.
pub fn r2_score(y_true: &Vector, y_pred: &Vector) -> Result<f64> {
    check_lengths(y_true, y_pred)?;

    let y_mean = y_true.sum() / y_true.len() as f64;
    let ss_res = (y_true - y_pred).mapv(|x| x * x).sum();
    let ss_tot = y_true.mapv(|x| (x - y_mean) * (x - y_mean)).sum();

    if ss_tot == 0.0 {
        if ss_res == 0.0 {
            return Ok(1.0);
        }
        warn!("R² undefined for a target with zero variance, reporting 0.0");
        return Ok(0.0);
    }

    Ok(1.0 - ss_res / ss_tot)
}

/// Regression quality of one model on one evaluation set.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EvaluationReport {
    pub mae: f64,
    pub mse: f64,
    pub rmse: f64,
    pub r2: f64,
    pub n_samples: usize,
}

impl EvaluationReport {
    pub fn from_predictions(y_true: &Vector, y_pred: &Vector) -> Result<Self> {
        let mse = mean_squared_error(y_true, y_pred)?;
        Ok(Self {
            mae: mean_absolute_error(y_true, y_pred)?,
            mse,
            rmse: mse.sqrt(),
            r2: r2_score(y_true, y_pred)?,
            n_samples: y_true.len(),
        })
    }
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "MAE:  {:.2}", self.mae)?;
        writeln!(f, "MSE:  {:.2}", self.mse)?;
        writeln!(f, "RMSE: {:.2}", self.rmse)?;
        write!(f, "R²:   {:.2}", self.r2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_mean_squared_error() {
        let y_true = array![1.0, 2.0, 3.0];
        let y_pred = array![1.0, 2.0, 3.0];

        let mse = mean_squared_error(&y_true, &y_pred).unwrap();
        assert!((mse - 0.0).abs() < 1e-10);

        let y_pred = array![2.0, 2.0, 5.0];
        let mse = mean_squared_error(&y_true, &y_pred).unwrap();
        assert!((mse - 5.0 / 3.0).abs() < 1e-10);
        let rmse = root_mean_squared_error(&y_true, &y_pred).unwrap();
        assert!((rmse - (5.0_f64 / 3.0).sqrt()).abs() < 1e-10);
    }

    #[test]
    fn test_r2_score() {
        let y_true = array![1.0, 2.0, 3.0, 4.0];
        let y_pred = array![1.0, 2.0, 3.0, 4.0];

        let r2 = r2_score(&y_true, &y_pred).unwrap();
        assert!((r2 - 1.0).abs() < 1e-10);

        let mean_only = array![2.5, 2.5, 2.5, 2.5];
        assert!(r2_score(&y_true, &mean_only).unwrap().abs() < 1e-10);
    }

    #[test]
    fn test_r2_score_zero_variance() {
        let y_true = array![50.0, 50.0];
        assert_eq!(r2_score(&y_true, &array![50.0, 50.0]).unwrap(), 1.0);
        assert_eq!(r2_score(&y_true, &array![49.0, 51.0]).unwrap(), 0.0);
    }

    #[test]
    fn test_perfect_predictions_report() {
        let y = array![55.2, 48.9, 62.0, 47.1];
        let report = EvaluationReport::from_predictions(&y, &y).unwrap();

        assert_eq!(report.mae, 0.0);
        assert_eq!(report.mse, 0.0);
        assert_eq!(report.rmse, 0.0);
        assert_eq!(report.r2, 1.0);
        assert_eq!(report.n_samples, 4);
    }

    #[test]
    fn test_symmetric_constant_error_gives_that_mae() {
        let y_true = array![50.0, 60.0, 70.0, 80.0];
        let y_pred = array![52.5, 57.5, 72.5, 77.5];

        let report = EvaluationReport::from_predictions(&y_true, &y_pred).unwrap();
        assert!((report.mae - 2.5).abs() < 1e-12);
        assert!((report.mse - 6.25).abs() < 1e-12);
        assert!((report.rmse - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_metric_input_errors() {
        let y_true = array![1.0, 2.0];
        assert!(matches!(
            mean_absolute_error(&y_true, &array![1.0]),
            Err(PipelineError::DimensionMismatch { .. })
        ));
        assert!(matches!(
            mean_squared_error(&Vector::zeros(0), &Vector::zeros(0)),
            Err(PipelineError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_report_formats_two_decimals() {
        let report = EvaluationReport {
            mae: 1.234,
            mse: 2.0,
            rmse: 1.41421,
            r2: 0.8765,
            n_samples: 3,
        };
        assert_eq!(report.to_string(), "MAE:  1.23\nMSE:  2.00\nRMSE: 1.41\nR²:   0.88");
    }
}
