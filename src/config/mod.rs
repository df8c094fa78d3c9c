//! Configuration loading
//!
//! `ConfigStore` reads the schema, model search and pipeline YAML documents and
//! hands out parsed, validated structures. It holds no other state.

mod model_search;
mod pipeline;
mod schema;

pub use model_search::{GridSearchSettings, ModelSearchConfig, ModelSpec, ParamGrid, ParamValue, Params};
pub use pipeline::{PipelineConfig, RunLayout, TrainerSettings, TransformationSettings, ValidationSettings};
pub use schema::{ColumnDtype, Schema};

#[cfg(test)]
pub(crate) use schema::fixtures;

use crate::error::{HousingError, Result};
use serde::de::DeserializeOwned;
use std::path::Path;

/// Read-only access to the YAML configuration documents
pub struct ConfigStore;

impl ConfigStore {
    /// Parse any YAML document
    pub fn read_yaml<T: DeserializeOwned>(path: &Path) -> Result<T> {
        tracing::debug!(path = %path.display(), "Reading yaml file");
        let text = std::fs::read_to_string(path).map_err(|e| {
            HousingError::ConfigError(format!("cannot read {}: {}", path.display(), e))
        })?;
        serde_yaml::from_str(&text).map_err(|e| {
            HousingError::ConfigError(format!("cannot parse {}: {}", path.display(), e))
        })
    }

    /// Load and check the dataset schema
    pub fn load_schema(path: &Path) -> Result<Schema> {
        let schema: Schema = Self::read_yaml(path)?;
        schema.validate()?;
        Ok(schema)
    }

    /// Load and check the model search config
    pub fn load_model_search(path: &Path) -> Result<ModelSearchConfig> {
        let config: ModelSearchConfig = Self::read_yaml(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Load the pipeline config
    pub fn load_pipeline(path: &Path) -> Result<PipelineConfig> {
        let config: PipelineConfig = Self::read_yaml(path)?;
        config.validate()?;
        Ok(config)
    }
}
