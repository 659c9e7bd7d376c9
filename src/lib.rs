pub use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

pub mod advisor;
pub mod config;
pub mod dataset;
pub mod error;
pub mod io;
pub mod linear_model;
pub mod metrics;
pub mod pipeline;
pub mod record;
pub mod report;
pub mod stats;

pub use advisor::{IrrigationAdvice, Thresholds};
pub use config::PipelineConfig;
pub use dataset::{CleanDataset, Dataset, Split};
pub use error::{PipelineError, Result};
pub use io::DatasetCache;
pub use linear_model::{LinearRegression, RankPolicy, TrainedModel};
pub use metrics::EvaluationReport;
pub use pipeline::{RegressionPipeline, Session};
pub use record::{Feature, FeatureVector, Record};

pub type Vector = Array1<f64>;
pub type Matrix = Array2<f64>;
