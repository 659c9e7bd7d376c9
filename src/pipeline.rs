//! Training, evaluation and point prediction, plus the per-run session that
//! owns their results.

use log::{debug, info};

use crate::advisor::IrrigationAdvice;
use crate::config::PipelineConfig;
use crate::dataset::{CleanDataset, Dataset, Split};
use crate::error::Result;
use crate::io;
use crate::linear_model::{LinearRegression, RankPolicy, TrainedModel};
use crate::metrics::EvaluationReport;
use crate::record::{Feature, FeatureVector};
use crate::stats::{self, FeatureCorrelation, Histogram};
use crate::{Matrix, Vector};

/// Fits and applies a linear model over a fixed, ordered feature selection.
#[derive(Clone, Debug)]
pub struct RegressionPipeline {
    features: Vec<Feature>,
    estimator: LinearRegression,
}

impl RegressionPipeline {
    pub fn new(features: &[Feature]) -> Self {
        Self {
            features: features.to_vec(),
            estimator: LinearRegression::new(),
        }
    }

    pub fn rank_policy(mut self, rank_policy: RankPolicy) -> Self {
        self.estimator = self.estimator.rank_policy(rank_policy);
        self
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn fit(&self, train: &CleanDataset) -> Result<TrainedModel> {
        let x = train.feature_matrix(&self.features);
        let model = self.estimator.fit(&self.features, &x, train.targets())?;
        info!(
            "trained on {} rows over [{}]",
            train.n_samples(),
            self.features
                .iter()
                .map(|f| f.column())
                .collect::<Vec<_>>()
                .join(", ")
        );
        Ok(model)
    }

    /// One prediction per vector, in input order.
    pub fn predict(&self, model: &TrainedModel, vectors: &[FeatureVector]) -> Result<Vec<f64>> {
        vectors.iter().map(|v| model.predict_one(v)).collect()
    }

    pub fn predict_dataset(&self, model: &TrainedModel, dataset: &CleanDataset) -> Result<Vector> {
        let x: Matrix = dataset.feature_matrix(model.features());
        model.predict(&x)
    }

    pub fn evaluate(&self, model: &TrainedModel, test: &CleanDataset) -> Result<EvaluationReport> {
        let predictions = self.predict_dataset(model, test)?;
        let report = EvaluationReport::from_predictions(test.targets(), &predictions)?;
        debug!("evaluated {} rows: {report:?}", report.n_samples);
        Ok(report)
    }
}

/// Prediction and advice for one what-if scenario.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Scenario {
    pub moisture: f64,
    pub advice: IrrigationAdvice,
}

/// Everything one run produces. Built once; simulations reuse the trained
/// model and never refit.
#[derive(Clone, Debug)]
pub struct Session {
    config: PipelineConfig,
    pipeline: RegressionPipeline,
    data: CleanDataset,
    split: Split,
    model: TrainedModel,
    test_predictions: Vector,
    report: EvaluationReport,
}

impl Session {
    /// Loads `config.source` and runs the whole flow.
    pub fn run(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let dataset = io::load(&config.source)?;
        Self::from_dataset(config, dataset)
    }

    /// Runs the flow over records that are already in memory.
    pub fn from_dataset(config: PipelineConfig, dataset: Dataset) -> Result<Self> {
        config.validate()?;

        let data = dataset.clean();
        let split = data.split(config.test_fraction, config.seed)?;
        info!(
            "{} clean rows: {} train, {} test",
            data.n_samples(),
            split.train.n_samples(),
            split.test.n_samples()
        );

        let pipeline = RegressionPipeline::new(&config.features).rank_policy(config.rank_policy);
        let model = pipeline.fit(&split.train)?;
        let test_predictions = pipeline.predict_dataset(&model, &split.test)?;
        let report = EvaluationReport::from_predictions(split.test.targets(), &test_predictions)?;
        info!("evaluation: MAE {:.2}, RMSE {:.2}, R² {:.2}", report.mae, report.rmse, report.r2);

        Ok(Self {
            config,
            pipeline,
            data,
            split,
            model,
            test_predictions,
            report,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn data(&self) -> &CleanDataset {
        &self.data
    }

    pub fn split(&self) -> &Split {
        &self.split
    }

    pub fn model(&self) -> &TrainedModel {
        &self.model
    }

    pub fn report(&self) -> &EvaluationReport {
        &self.report
    }

    pub fn test_predictions(&self) -> &Vector {
        &self.test_predictions
    }

    /// Mean predicted moisture over the test rows and the advice for it.
    pub fn recommendation(&self) -> Option<(f64, IrrigationAdvice)> {
        self.config
            .thresholds
            .advise_mean(self.test_predictions.as_slice()?)
    }

    pub fn correlations(&self) -> Vec<FeatureCorrelation> {
        stats::target_correlations(&self.data)
    }

    pub fn histogram(&self) -> Result<Histogram> {
        Histogram::new(self.data.targets().as_slice().unwrap_or_default(), self.config.histogram_bins)
    }

    pub fn predict(&self, vectors: &[FeatureVector]) -> Result<Vec<f64>> {
        self.pipeline.predict(&self.model, vectors)
    }

    pub fn simulate(&self, vector: &FeatureVector) -> Result<Scenario> {
        let moisture = self.model.predict_one(vector)?;
        Ok(Scenario {
            moisture,
            advice: self.config.thresholds.advise(moisture),
        })
    }
}
