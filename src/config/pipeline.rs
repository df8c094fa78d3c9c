//! Pipeline layout configuration

use crate::error::{HousingError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Validation stage settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationSettings {
    pub dir: String,
    pub report_file_name: String,
    pub report_page_file_name: String,
    /// Accept booleans in numerical slots
    pub allow_bool_as_numeric: bool,
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self {
            dir: "data_validation".to_string(),
            report_file_name: "report.json".to_string(),
            report_page_file_name: "report.html".to_string(),
            allow_bool_as_numeric: false,
        }
    }
}

/// Transformation stage settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformationSettings {
    pub dir: String,
    pub transformed_train_dir: String,
    pub transformed_test_dir: String,
    pub preprocessed_dir: String,
    pub preprocessed_object_file_name: String,
}

impl Default for TransformationSettings {
    fn default() -> Self {
        Self {
            dir: "data_transformation".to_string(),
            transformed_train_dir: "train".to_string(),
            transformed_test_dir: "test".to_string(),
            preprocessed_dir: "preprocessed".to_string(),
            preprocessed_object_file_name: "preprocessed.json".to_string(),
        }
    }
}

/// Trainer stage settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerSettings {
    pub dir: String,
    pub trained_model_dir: String,
    pub model_file_name: String,
}

impl Default for TrainerSettings {
    fn default() -> Self {
        Self {
            dir: "model_trainer".to_string(),
            trained_model_dir: "trained_model".to_string(),
            model_file_name: "model.json".to_string(),
        }
    }
}

/// Where a run reads its configs and writes its artifacts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Root under which each run gets its own directory
    pub artifact_dir: PathBuf,
    /// Fixed run id; generated when absent
    pub run_id: Option<String>,
    pub schema_file_path: PathBuf,
    pub model_config_file_path: PathBuf,
    pub validation: ValidationSettings,
    pub transformation: TransformationSettings,
    pub trainer: TrainerSettings,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            artifact_dir: PathBuf::from("artifact"),
            run_id: None,
            schema_file_path: PathBuf::from("config/schema.yaml"),
            model_config_file_path: PathBuf::from("config/model.yaml"),
            validation: ValidationSettings::default(),
            transformation: TransformationSettings::default(),
            trainer: TrainerSettings::default(),
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_artifact_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifact_dir = dir.into();
        self
    }

    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = Some(run_id.into());
        self
    }

    pub fn with_schema_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.schema_file_path = path.into();
        self
    }

    pub fn with_model_config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.model_config_file_path = path.into();
        self
    }

    pub fn with_bool_as_numeric(mut self, allow: bool) -> Self {
        self.validation.allow_bool_as_numeric = allow;
        self
    }

    /// Root directory of one run
    pub fn run_dir(&self, run_id: &str) -> PathBuf {
        self.artifact_dir.join(run_id)
    }

    /// Resolved artifact locations for one run
    pub fn layout(&self, run_id: &str) -> RunLayout {
        let root = self.run_dir(run_id);
        let validation = root.join(&self.validation.dir);
        let transformation = root.join(&self.transformation.dir);
        let trainer = root.join(&self.trainer.dir);

        RunLayout {
            report_file_path: validation.join(&self.validation.report_file_name),
            report_page_file_path: validation.join(&self.validation.report_page_file_name),
            transformed_train_dir: transformation.join(&self.transformation.transformed_train_dir),
            transformed_test_dir: transformation.join(&self.transformation.transformed_test_dir),
            preprocessed_object_file_path: transformation
                .join(&self.transformation.preprocessed_dir)
                .join(&self.transformation.preprocessed_object_file_name),
            trained_model_file_path: trainer
                .join(&self.trainer.trained_model_dir)
                .join(&self.trainer.model_file_name),
            root,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(run_id) = &self.run_id {
            let valid = !run_id.is_empty()
                && run_id
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
                && run_id != "."
                && run_id != "..";
            if !valid {
                return Err(HousingError::ConfigError(format!(
                    "run_id '{}' must be a plain directory name",
                    run_id
                )));
            }
        }
        Ok(())
    }
}

/// Absolute artifact paths of a run
#[derive(Debug, Clone, PartialEq)]
pub struct RunLayout {
    pub root: PathBuf,
    pub report_file_path: PathBuf,
    pub report_page_file_path: PathBuf,
    pub transformed_train_dir: PathBuf,
    pub transformed_test_dir: PathBuf,
    pub preprocessed_object_file_path: PathBuf,
    pub trained_model_file_path: PathBuf,
}

impl RunLayout {
    pub fn root(&self) -> &Path {
        &self.root
    }
}
