//! Stage output descriptors
//!
//! Each stage returns one of these records; later stages only ever borrow
//! them. Fields are private and exposed through accessors so an artifact
//! cannot be changed after it was produced.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Location of the raw train/test split, produced outside this crate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataIngestionArtifact {
    train_file_path: PathBuf,
    test_file_path: PathBuf,
}

impl DataIngestionArtifact {
    pub fn new(train_file_path: impl Into<PathBuf>, test_file_path: impl Into<PathBuf>) -> Self {
        Self {
            train_file_path: train_file_path.into(),
            test_file_path: test_file_path.into(),
        }
    }

    pub fn train_file_path(&self) -> &Path {
        &self.train_file_path
    }

    pub fn test_file_path(&self) -> &Path {
        &self.test_file_path
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataValidationArtifact {
    is_validated: bool,
    schema_file_path: PathBuf,
    report_file_path: PathBuf,
    report_page_file_path: PathBuf,
    message: String,
}

impl DataValidationArtifact {
    pub fn new(
        is_validated: bool,
        schema_file_path: impl Into<PathBuf>,
        report_file_path: impl Into<PathBuf>,
        report_page_file_path: impl Into<PathBuf>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            is_validated,
            schema_file_path: schema_file_path.into(),
            report_file_path: report_file_path.into(),
            report_page_file_path: report_page_file_path.into(),
            message: message.into(),
        }
    }

    pub fn is_validated(&self) -> bool {
        self.is_validated
    }

    pub fn schema_file_path(&self) -> &Path {
        &self.schema_file_path
    }

    pub fn report_file_path(&self) -> &Path {
        &self.report_file_path
    }

    pub fn report_page_file_path(&self) -> &Path {
        &self.report_page_file_path
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataTransformationArtifact {
    is_transformed: bool,
    transformed_train_file_path: PathBuf,
    transformed_test_file_path: PathBuf,
    preprocessed_object_file_path: PathBuf,
    message: String,
}

impl DataTransformationArtifact {
    pub fn new(
        is_transformed: bool,
        transformed_train_file_path: impl Into<PathBuf>,
        transformed_test_file_path: impl Into<PathBuf>,
        preprocessed_object_file_path: impl Into<PathBuf>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            is_transformed,
            transformed_train_file_path: transformed_train_file_path.into(),
            transformed_test_file_path: transformed_test_file_path.into(),
            preprocessed_object_file_path: preprocessed_object_file_path.into(),
            message: message.into(),
        }
    }

    pub fn is_transformed(&self) -> bool {
        self.is_transformed
    }

    pub fn transformed_train_file_path(&self) -> &Path {
        &self.transformed_train_file_path
    }

    pub fn transformed_test_file_path(&self) -> &Path {
        &self.transformed_test_file_path
    }

    pub fn preprocessed_object_file_path(&self) -> &Path {
        &self.preprocessed_object_file_path
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Final output of a pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelTrainerArtifact {
    is_trained: bool,
    trained_model_file_path: PathBuf,
    train_rmse: f64,
    test_rmse: f64,
    train_accuracy: f64,
    test_accuracy: f64,
    model_accuracy: f64,
    message: String,
}

impl ModelTrainerArtifact {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        is_trained: bool,
        trained_model_file_path: impl Into<PathBuf>,
        train_rmse: f64,
        test_rmse: f64,
        train_accuracy: f64,
        test_accuracy: f64,
        model_accuracy: f64,
        message: impl Into<String>,
    ) -> Self {
        Self {
            is_trained,
            trained_model_file_path: trained_model_file_path.into(),
            train_rmse,
            test_rmse,
            train_accuracy,
            test_accuracy,
            model_accuracy,
            message: message.into(),
        }
    }

    pub fn is_trained(&self) -> bool {
        self.is_trained
    }

    pub fn trained_model_file_path(&self) -> &Path {
        &self.trained_model_file_path
    }

    pub fn train_rmse(&self) -> f64 {
        self.train_rmse
    }

    pub fn test_rmse(&self) -> f64 {
        self.test_rmse
    }

    pub fn train_accuracy(&self) -> f64 {
        self.train_accuracy
    }

    pub fn test_accuracy(&self) -> f64 {
        self.test_accuracy
    }

    pub fn model_accuracy(&self) -> f64 {
        self.model_accuracy
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}
