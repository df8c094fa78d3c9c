//! Error types for the housing training pipeline

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, HousingError>;

/// Pipeline stage an error originated in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    /// Run setup before the first stage
    Setup,
    Validation,
    Transformation,
    Training,
    Inference,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Setup => "pipeline_setup",
            Stage::Validation => "data_validation",
            Stage::Transformation => "data_transformation",
            Stage::Training => "model_trainer",
            Stage::Inference => "inference",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Main error type for the pipeline
#[derive(Error, Debug)]
pub enum HousingError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Unknown model identifier: {0}")]
    UnknownModel(String),

    #[error("Fitting {model} failed: {reason}")]
    FitError { model: String, reason: String },

    #[error("Computation error: {0}")]
    ComputationError(String),

    #[error("Model search config declares no candidate models")]
    EmptyCandidates,

    #[error(
        "No model meets acceptance policy (base_accuracy = {base_accuracy}, \
         acceptable_variance = {acceptable_variance}, evaluated = {evaluated})"
    )]
    NoAcceptableModel {
        base_accuracy: f64,
        acceptable_variance: f64,
        evaluated: usize,
    },

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Incompatible bundle: found {found}, expected {expected}")]
    IncompatibleBundle { found: String, expected: String },

    #[error("Run cancelled")]
    Cancelled,

    #[error("[{stage}] {context}: {source}")]
    Stage {
        stage: Stage,
        context: String,
        #[source]
        source: Box<HousingError>,
    },
}

impl HousingError {
    /// Stage the error was raised in, if it was wrapped by one
    pub fn stage(&self) -> Option<Stage> {
        match self {
            HousingError::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Innermost error, skipping stage wrappers
    pub fn root_cause(&self) -> &HousingError {
        match self {
            HousingError::Stage { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// Attaches stage name and operation context to a failing result
pub trait StageResultExt<T> {
    fn in_stage(self, stage: Stage, context: impl Into<String>) -> Result<T>;
}

impl<T> StageResultExt<T> for Result<T> {
    fn in_stage(self, stage: Stage, context: impl Into<String>) -> Result<T> {
        self.map_err(|err| match err {
            // Keep the first (innermost) stage label.
            wrapped @ HousingError::Stage { .. } => wrapped,
            other => HousingError::Stage {
                stage,
                context: context.into(),
                source: Box::new(other),
            },
        })
    }
}

impl From<polars::error::PolarsError> for HousingError {
    fn from(err: polars::error::PolarsError) -> Self {
        HousingError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for HousingError {
    fn from(err: serde_json::Error) -> Self {
        HousingError::SerializationError(err.to_string())
    }
}

impl From<serde_yaml::Error> for HousingError {
    fn from(err: serde_yaml::Error) -> Self {
        HousingError::ConfigError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for HousingError {
    fn from(err: ndarray::ShapeError) -> Self {
        HousingError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = HousingError::DataError("test error".to_string());
        assert_eq!(err.to_string(), "Data error: test error");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: HousingError = io_err.into();
        assert!(matches!(err, HousingError::IoError(_)));
    }

    #[test]
    fn test_in_stage_wraps_once() {
        let res: Result<()> = Err(HousingError::EmptyCandidates);
        let err = res
            .in_stage(Stage::Training, "searching")
            .in_stage(Stage::Validation, "outer")
            .unwrap_err();

        assert_eq!(err.stage(), Some(Stage::Training));
        assert!(matches!(err.root_cause(), HousingError::EmptyCandidates));
        assert!(err.to_string().starts_with("[model_trainer] searching"));
    }
}
