use log::debug;
use ndarray::Axis;
use std::collections::HashSet;

use crate::error::{PipelineError, Result};
use crate::record::{Feature, FeatureVector};
use crate::{Matrix, Vector};

const PIVOT_TOLERANCE: f64 = 1e-10;
const EIGEN_TOLERANCE: f64 = 1e-10;
const MAX_JACOBI_SWEEPS: usize = 100;

/// What `fit` does when the normal equations have no unique solution.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RankPolicy {
    /// Refuse to fit with fewer than `features + 1` rows or with collinear
    /// or constant features.
    #[default]
    FailFast,
    /// Return the minimum-norm least-squares solution instead.
    MinimumNorm,
}

/// Ordinary least squares estimator. Holds only settings; fitting produces a
/// separate, immutable [`TrainedModel`].
#[derive(Clone, Debug)]
pub struct LinearRegression {
    fit_intercept: bool,
    rank_policy: RankPolicy,
}

impl LinearRegression {
    pub fn new() -> Self {
        Self {
            fit_intercept: true,
            rank_policy: RankPolicy::FailFast,
        }
    }

    pub fn fit_intercept(mut self, fit_intercept: bool) -> Self {
        self.fit_intercept = fit_intercept;
        self
    }

    pub fn rank_policy(mut self, rank_policy: RankPolicy) -> Self {
        self.rank_policy = rank_policy;
        self
    }

    /// Fits `y ≈ intercept + x · w`. Column `j` of `x` holds `features[j]`.
    pub fn fit(&self, features: &[Feature], x: &Matrix, y: &Vector) -> Result<TrainedModel> {
        validate_features(features)?;

        if x.ncols() != features.len() {
            return Err(PipelineError::DimensionMismatch {
                expected: features.len(),
                actual: x.ncols(),
            });
        }
        if x.nrows() != y.len() {
            return Err(PipelineError::DimensionMismatch {
                expected: x.nrows(),
                actual: y.len(),
            });
        }

        if let Some(j) = x.axis_iter(Axis(1)).position(|col| col.iter().any(|v| !v.is_finite())) {
            return Err(PipelineError::NonFinite(format!("training column {}", features[j])));
        }
        if y.iter().any(|v| !v.is_finite()) {
            return Err(PipelineError::NonFinite("training target".to_string()));
        }

        let n_samples = x.nrows();
        let required = if self.fit_intercept { features.len() + 1 } else { features.len() };
        if n_samples == 0 || (self.rank_policy == RankPolicy::FailFast && n_samples < required) {
            return Err(PipelineError::InsufficientData(format!(
                "{n_samples} training rows for {} features, need at least {required}",
                features.len()
            )));
        }

        let (coefficients, intercept) = if self.fit_intercept {
            self.fit_with_intercept(features, x, y)?
        } else {
            (self.solve_least_squares(features, x, y)?, 0.0)
        };

        debug!("fitted {} coefficients, intercept {intercept:.4}", coefficients.len());

        Ok(TrainedModel {
            features: features.to_vec(),
            coefficients,
            intercept,
        })
    }

    fn fit_with_intercept(&self, features: &[Feature], x: &Matrix, y: &Vector) -> Result<(Vector, f64)> {
        let y_mean = y.mean().unwrap_or(0.0);
        let x_means = x
            .mean_axis(Axis(0))
            .unwrap_or_else(|| Vector::zeros(x.ncols()));

        let mut x_centered = x.clone();
        for mut row in x_centered.axis_iter_mut(Axis(0)) {
            row -= &x_means;
        }
        let y_centered = y - y_mean;

        let coefficients = self.solve_least_squares(features, &x_centered, &y_centered)?;
        let intercept = y_mean - coefficients.dot(&x_means);

        Ok((coefficients, intercept))
    }

    fn solve_least_squares(&self, features: &[Feature], x: &Matrix, y: &Vector) -> Result<Vector> {
        match self.rank_policy {
            RankPolicy::FailFast => solve_normal_equation(features, x, y),
            RankPolicy::MinimumNorm => {
                let xt = x.t();
                Ok(pseudo_inverse_solve(&xt.dot(x), &xt.dot(y)))
            }
        }
    }
}

impl Default for LinearRegression {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_features(features: &[Feature]) -> Result<()> {
    if features.is_empty() {
        return Err(PipelineError::InvalidFeatures("no features selected".to_string()));
    }
    let mut seen = HashSet::new();
    for feature in features {
        if !seen.insert(feature) {
            return Err(PipelineError::InvalidFeatures(format!("{feature} selected twice")));
        }
    }
    Ok(())
}

/// Solves `XᵀX w = Xᵀy` after scaling every column to unit norm, which keeps
/// the pivot tolerance meaningful whatever the sensor units are.
fn solve_normal_equation(features: &[Feature], x: &Matrix, y: &Vector) -> Result<Vector> {
    let norms = x.map_axis(Axis(0), |col| col.dot(&col).sqrt());

    if let Some(j) = norms.iter().position(|&norm| norm < PIVOT_TOLERANCE) {
        return Err(PipelineError::InsufficientData(format!(
            "feature {} has no variance in the training rows",
            features[j]
        )));
    }

    let x_scaled = x / &norms;
    let xt = x_scaled.t();
    let scaled = solve_linear_system(&xt.dot(&x_scaled), &xt.dot(y)).ok_or_else(|| {
        PipelineError::InsufficientData("feature matrix is rank deficient (collinear features)".to_string())
    })?;

    Ok(scaled / &norms)
}

/// Gaussian elimination with partial pivoting. `None` when the system is
/// singular or nearly so.
fn solve_linear_system(a: &Matrix, b: &Vector) -> Option<Vector> {
    let n = a.nrows();
    let mut aug = Matrix::zeros((n, n + 1));

    for i in 0..n {
        for j in 0..n {
            aug[(i, j)] = a[(i, j)];
        }
        aug[(i, n)] = b[i];
    }

    for i in 0..n {
        let mut max_row = i;
        for k in (i + 1)..n {
            if aug[(k, i)].abs() > aug[(max_row, i)].abs() {
                max_row = k;
            }
        }

        if aug[(max_row, i)].abs() < PIVOT_TOLERANCE {
            return None;
        }

        if max_row != i {
            for j in 0..=n {
                aug.swap((i, j), (max_row, j));
            }
        }

        for k in (i + 1)..n {
            let factor = aug[(k, i)] / aug[(i, i)];
            for j in i..=n {
                aug[(k, j)] -= factor * aug[(i, j)];
            }
        }
    }

    let mut x = Vector::zeros(n);
    for i in (0..n).rev() {
        x[i] = aug[(i, n)];
        for j in (i + 1)..n {
            x[i] -= aug[(i, j)] * x[j];
        }
        x[i] /= aug[(i, i)];
    }

    Some(x)
}

/// Minimum-norm solution of the symmetric system `a w = b` through the
/// eigen decomposition of `a`, dropping eigenvalues that are numerically
/// zero.
fn pseudo_inverse_solve(a: &Matrix, b: &Vector) -> Vector {
    let (eigenvalues, eigenvectors) = symmetric_eigen(a);
    let largest = eigenvalues.iter().fold(0.0_f64, |acc, &l| acc.max(l.abs()));
    let cutoff = largest * EIGEN_TOLERANCE;

    let mut w = Vector::zeros(b.len());
    for (i, &lambda) in eigenvalues.iter().enumerate() {
        if lambda.abs() <= cutoff {
            continue;
        }
        let v = eigenvectors.column(i);
        w.scaled_add(v.dot(b) / lambda, &v);
    }
    w
}

/// Cyclic Jacobi eigen decomposition of a symmetric matrix. Eigenvectors are
/// the columns of the returned matrix.
fn symmetric_eigen(matrix: &Matrix) -> (Vector, Matrix) {
    let n = matrix.nrows();
    let mut a = matrix.clone();
    let mut v = Matrix::eye(n);
    let total = a.iter().map(|x| x * x).sum::<f64>();

    for _ in 0..MAX_JACOBI_SWEEPS {
        let mut off_diagonal = 0.0;
        for p in 0..n {
            for q in (p + 1)..n {
                off_diagonal += 2.0 * a[(p, q)] * a[(p, q)];
            }
        }
        if off_diagonal <= f64::EPSILON * f64::EPSILON * total {
            break;
        }

        for p in 0..n {
            for q in (p + 1)..n {
                let apq = a[(p, q)];
                if apq == 0.0 {
                    continue;
                }

                let theta = (a[(q, q)] - a[(p, p)]) / (2.0 * apq);
                let t = theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt());
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;

                for k in 0..n {
                    let (akp, akq) = (a[(k, p)], a[(k, q)]);
                    a[(k, p)] = c * akp - s * akq;
                    a[(k, q)] = s * akp + c * akq;
                }
                for k in 0..n {
                    let (apk, aqk) = (a[(p, k)], a[(q, k)]);
                    a[(p, k)] = c * apk - s * aqk;
                    a[(q, k)] = s * apk + c * aqk;
                }
                for k in 0..n {
                    let (vkp, vkq) = (v[(k, p)], v[(k, q)]);
                    v[(k, p)] = c * vkp - s * vkq;
                    v[(k, q)] = s * vkp + c * vkq;
                }
            }
        }
    }

    (a.diag().to_owned(), v)
}

/// Coefficients and intercept learned by [`LinearRegression::fit`], tied to
/// the feature order they were trained with.
#[derive(Clone, Debug, PartialEq)]
pub struct TrainedModel {
    features: Vec<Feature>,
    coefficients: Vector,
    intercept: f64,
}

impl TrainedModel {
    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn coefficients(&self) -> &Vector {
        &self.coefficients
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    pub fn n_features(&self) -> usize {
        self.features.len()
    }

    pub fn coefficient(&self, feature: Feature) -> Option<f64> {
        self.features
            .iter()
            .position(|&f| f == feature)
            .map(|j| self.coefficients[j])
    }

    pub fn predict(&self, x: &Matrix) -> Result<Vector> {
        if x.ncols() != self.coefficients.len() {
            return Err(PipelineError::DimensionMismatch {
                expected: self.coefficients.len(),
                actual: x.ncols(),
            });
        }

        if let Some(j) = x.axis_iter(Axis(1)).position(|col| col.iter().any(|v| !v.is_finite())) {
            return Err(PipelineError::NonFinite(format!("input column {}", self.features[j])));
        }

        Ok(x.dot(&self.coefficients) + self.intercept)
    }

    /// Looks each trained feature up in `vector`, whatever order it holds
    /// them in. Extra features in `vector` are ignored.
    pub fn predict_one(&self, vector: &FeatureVector) -> Result<f64> {
        let mut prediction = self.intercept;
        for (&feature, &weight) in self.features.iter().zip(self.coefficients.iter()) {
            let value = vector
                .get(feature)
                .ok_or(PipelineError::MissingFeature(feature))?;
            if !value.is_finite() {
                return Err(PipelineError::NonFinite(format!("input value for {feature}")));
            }
            prediction += weight * value;
        }
        Ok(prediction)
    }

    pub fn score(&self, x: &Matrix, y: &Vector) -> Result<f64> {
        let y_pred = self.predict(x)?;
        crate::metrics::r2_score(y, &y_pred)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use ndarray_rand::RandomExt;
    use ndarray_rand::rand::SeedableRng;
    use ndarray_rand::rand::rngs::StdRng;
    use ndarray_rand::rand_distr::Uniform;

    const ONE: [Feature; 1] = [Feature::Ph];
    const TWO: [Feature; 2] = [Feature::Ph, Feature::NpkN];

    #[test]
    fn test_linear_regression_simple() {
        let x = array![[1.0], [2.0], [3.0], [4.0]];
        let y = array![2.0, 4.0, 6.0, 8.0];

        let model = LinearRegression::new().fit(&ONE, &x, &y).unwrap();
        let predictions = model.predict(&x).unwrap();

        for (pred, actual) in predictions.iter().zip(y.iter()) {
            assert!((pred - actual).abs() < 1e-10);
        }
    }

    #[test]
    fn test_linear_regression_without_intercept() {
        let x = array![[1.0], [2.0], [3.0], [4.0]];
        let y = array![2.0, 4.0, 6.0, 8.0];

        let model = LinearRegression::new()
            .fit_intercept(false)
            .fit(&ONE, &x, &y)
            .unwrap();

        assert!((model.coefficients()[0] - 2.0).abs() < 1e-10);
        assert_eq!(model.intercept(), 0.0);
    }

    #[test]
    fn test_linear_regression_multivariate() {
        let x = array![[1.0, 2.0], [2.0, 1.0], [3.0, 5.0], [4.0, 3.0], [5.0, 4.0]];
        // y = 1 + 2 * x1 + 3 * x2
        let y = x.map_axis(Axis(1), |row| 1.0 + 2.0 * row[0] + 3.0 * row[1]);

        let model = LinearRegression::new().fit(&TWO, &x, &y).unwrap();

        assert!((model.intercept() - 1.0).abs() < 1e-8);
        assert!((model.coefficient(Feature::Ph).unwrap() - 2.0).abs() < 1e-8);
        assert!((model.coefficient(Feature::NpkN).unwrap() - 3.0).abs() < 1e-8);
        assert!(model.coefficient(Feature::LdrMv).is_none());
        assert!((model.score(&x, &y).unwrap() - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_recovers_coefficients_on_sensor_scaled_data() {
        let mut rng = StdRng::seed_from_u64(7);
        let ph = Vector::random_using(60, Uniform::new(5.0, 8.0), &mut rng);
        let npk = Matrix::random_using((60, 3), Uniform::new(150.0, 350.0), &mut rng);
        let ldr = Vector::random_using(60, Uniform::new(550.0, 650.0), &mut rng);

        let mut x = Matrix::zeros((60, 5));
        x.column_mut(0).assign(&ph);
        x.slice_mut(ndarray::s![.., 1..4]).assign(&npk);
        x.column_mut(4).assign(&ldr);

        let weights = array![4.0, 0.05, -0.02, 0.1, -0.08];
        let y = x.dot(&weights) + 12.5;

        let model = LinearRegression::new().fit(&Feature::ALL, &x, &y).unwrap();
        for (learned, expected) in model.coefficients().iter().zip(weights.iter()) {
            assert!((learned - expected).abs() < 1e-6);
        }
        assert!((model.intercept() - 12.5).abs() < 1e-4);
    }

    #[test]
    fn test_fail_fast_on_too_few_rows() {
        let x = array![[1.0, 2.0], [2.0, 3.0]];
        let y = array![1.0, 2.0];

        let result = LinearRegression::new().fit(&TWO, &x, &y);
        assert!(matches!(result, Err(PipelineError::InsufficientData(_))));
    }

    #[test]
    fn test_fail_fast_on_collinear_features() {
        let x = array![[1.0, 2.0], [2.0, 4.0], [3.0, 6.0], [4.0, 8.0]];
        let y = array![1.0, 2.0, 3.0, 4.0];

        let result = LinearRegression::new().fit(&TWO, &x, &y);
        assert!(matches!(result, Err(PipelineError::InsufficientData(_))));
    }

    #[test]
    fn test_fail_fast_on_constant_feature() {
        let x = array![[1.0, 5.0], [2.0, 5.0], [3.0, 5.0], [4.0, 5.0]];
        let y = array![1.0, 2.0, 3.0, 4.0];

        let err = LinearRegression::new().fit(&TWO, &x, &y).unwrap_err();
        assert!(err.to_string().contains("NPK_N"));
    }

    #[test]
    fn test_minimum_norm_handles_collinear_features() {
        let x = array![[1.0, 2.0], [2.0, 4.0], [3.0, 6.0], [4.0, 8.0]];
        let y = array![3.0, 5.0, 7.0, 9.0];

        let model = LinearRegression::new()
            .rank_policy(RankPolicy::MinimumNorm)
            .fit(&TWO, &x, &y)
            .unwrap();

        // y = 1 + 2 * x1 = 1 + 0.4 * x1 + 0.8 * x2 is the minimum-norm split
        assert!((model.coefficients()[0] - 0.4).abs() < 1e-8);
        assert!((model.coefficients()[1] - 0.8).abs() < 1e-8);
        assert!((model.intercept() - 1.0).abs() < 1e-8);
    }

    #[test]
    fn test_invalid_feature_selection() {
        let x = array![[1.0, 2.0], [2.0, 3.0], [3.0, 5.0]];
        let y = array![1.0, 2.0, 3.0];

        let duplicated = [Feature::Ph, Feature::Ph];
        assert!(matches!(
            LinearRegression::new().fit(&duplicated, &x, &y),
            Err(PipelineError::InvalidFeatures(_))
        ));
        assert!(matches!(
            LinearRegression::new().fit(&[], &Matrix::zeros((3, 0)), &y),
            Err(PipelineError::InvalidFeatures(_))
        ));
    }

    #[test]
    fn test_dimension_mismatch() {
        let x = array![[1.0], [2.0]];
        let y = array![1.0, 2.0, 3.0];

        let result = LinearRegression::new().fit(&ONE, &x, &y);
        assert!(matches!(result, Err(PipelineError::DimensionMismatch { .. })));

        let x = array![[1.0], [2.0], [3.0]];
        let model = LinearRegression::new().fit(&ONE, &x, &y).unwrap();
        assert!(model.predict(&array![[1.0, 2.0]]).is_err());
        let other = FeatureVector::from_values(&[Feature::NpkN], vec![2.0]).unwrap();
        assert!(matches!(
            model.predict_one(&other),
            Err(PipelineError::MissingFeature(Feature::Ph))
        ));
    }

    #[test]
    fn test_predict_one_matches_matrix_predict() {
        let x = array![[1.0, 2.0], [2.0, 1.0], [3.0, 5.0], [4.0, 3.0]];
        let y = array![3.0, 2.5, 8.0, 6.0];
        let model = LinearRegression::new().fit(&TWO, &x, &y).unwrap();

        let batch = model.predict(&x).unwrap();
        for (i, row) in x.axis_iter(Axis(0)).enumerate() {
            let single = model
                .predict_one(&FeatureVector::from_values(&TWO, row.to_vec()).unwrap())
                .unwrap();
            assert!((single - batch[i]).abs() < 1e-12);
        }
    }

    #[test]
    fn test_predict_one_reads_values_by_feature() {
        let x = array![[1.0, 2.0], [2.0, 1.0], [3.0, 5.0], [4.0, 3.0]];
        let y = x.map_axis(Axis(1), |row| 1.0 + 2.0 * row[0] + 3.0 * row[1]);
        let model = LinearRegression::new().fit(&TWO, &x, &y).unwrap();

        let in_order = FeatureVector::from_values(&TWO, vec![2.0, 10.0]).unwrap();
        let swapped = FeatureVector::from_values(&[Feature::NpkN, Feature::Ph], vec![10.0, 2.0]).unwrap();
        let canonical = FeatureVector::new(2.0, 10.0, 0.0, 0.0, 0.0);

        let expected = model.predict_one(&in_order).unwrap();
        assert!((expected - 35.0).abs() < 1e-8);
        assert_eq!(model.predict_one(&swapped).unwrap(), expected);
        assert_eq!(model.predict_one(&canonical).unwrap(), expected);
    }

    #[test]
    fn test_non_finite_values_are_rejected() {
        let x = array![[1.0], [2.0], [f64::NAN], [4.0]];
        let y = array![2.0, 4.0, 6.0, 8.0];
        assert!(matches!(
            LinearRegression::new().fit(&ONE, &x, &y),
            Err(PipelineError::NonFinite(_))
        ));

        let x = array![[1.0], [2.0], [3.0], [4.0]];
        let y = array![2.0, f64::INFINITY, 6.0, 8.0];
        assert!(matches!(
            LinearRegression::new().fit(&ONE, &x, &y),
            Err(PipelineError::NonFinite(_))
        ));

        let y = array![2.0, 4.0, 6.0, 8.0];
        let model = LinearRegression::new().fit(&ONE, &x, &y).unwrap();
        let nan_input = FeatureVector::from_values(&ONE, vec![f64::NAN]).unwrap();
        assert!(matches!(model.predict_one(&nan_input), Err(PipelineError::NonFinite(_))));
        assert!(matches!(
            model.predict(&array![[1.0], [f64::NEG_INFINITY]]),
            Err(PipelineError::NonFinite(_))
        ));
    }

    #[test]
    fn test_symmetric_eigen_reconstructs_matrix() {
        let a = array![[4.0, 1.0, 2.0], [1.0, 3.0, 0.5], [2.0, 0.5, 5.0]];
        let (values, vectors) = symmetric_eigen(&a);

        let rebuilt = vectors.dot(&Matrix::from_diag(&values)).dot(&vectors.t());
        for (r, e) in rebuilt.iter().zip(a.iter()) {
            assert!((r - e).abs() < 1e-10);
        }
    }
}
