//! Housing AutoML - config-driven regression training pipeline
//!
//! Raw train/test tables move through three stages, each consuming the
//! previous stage's artifact:
//! - data validation against a declared schema
//! - feature transformation (imputation, scaling, one-hot encoding)
//! - model selection: per-family grid search, held-out evaluation and an
//!   acceptance policy, ending in a persisted combined estimator
//!
//! # Modules
//!
//! ## Core
//! - [`validation`] - Record-level schema checks and the validation stage
//! - [`preprocessing`] - Feature transformer and the transformation stage
//! - [`training`] - Model registry, grid search, evaluation, trainer stage
//! - [`pipeline`] - Sequential stage orchestration
//!
//! ## Supporting
//! - [`config`] - Schema, model search and pipeline configuration
//! - [`artifact`] - Stage output descriptors
//! - [`context`] - Per-run id, tracing span and cancellation
//! - [`export`] - Versioned JSON persistence of fitted objects
//! - [`cli`] - Command-line interface

pub mod error;

pub mod artifact;
pub mod config;
pub mod context;

pub mod pipeline;
pub mod preprocessing;
pub mod training;
pub mod validation;

pub mod export;
pub mod utils;

pub mod cli;

pub use error::{HousingError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::{HousingError, Result, Stage, StageResultExt};

    pub use crate::artifact::{
        DataIngestionArtifact, DataTransformationArtifact, DataValidationArtifact,
        ModelTrainerArtifact,
    };
    pub use crate::config::{
        ConfigStore, ModelSearchConfig, ModelSpec, ParamValue, Params, PipelineConfig, Schema,
    };
    pub use crate::context::{CancellationToken, RunContext};

    pub use crate::validation::{DataValidation, SchemaValidator, Value};
    pub use crate::preprocessing::{DataTransformation, FeatureTransformer, PreprocessingBuilder};
    pub use crate::training::{
        GridSearchedBestModel, MetricInfoArtifact, ModelEvaluator, ModelSelector, ModelTrainer,
        Regressor, TrainedModel,
    };
    pub use crate::pipeline::{Pipeline, PipelineState};

    pub use crate::export::{CombinedEstimator, TransformerDocument};
}
