//! Model search configuration
//!
//! Candidate model families, their fixed constructor parameters and the
//! hyperparameter grids to search are all data:
//!
//! ```yaml
//! grid_search:
//!   cv: 5
//!   random_state: 42
//! base_accuracy: 0.6
//! acceptable_variance: 0.05
//! model_selection:
//!   - id: random_forest_0
//!     model: random_forest
//!     params:
//!       n_estimators: 50
//!     search_param_grid:
//!       min_samples_leaf: [2, 4, 6]
//! ```

use crate::error::{HousingError, Result};
use crate::training::registry;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// A single hyperparameter value as written in the config
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl ParamValue {
    /// Get as float
    pub fn as_float(&self) -> Option<f64> {
        match self {
            ParamValue::Float(v) => Some(*v),
            ParamValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Get as non-negative integer
    pub fn as_usize(&self) -> Option<usize> {
        match self {
            ParamValue::Int(v) if *v >= 0 => Some(*v as usize),
            ParamValue::Float(v) if *v >= 0.0 && v.fract() == 0.0 => Some(*v as usize),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ParamValue::Null)
    }
}

impl std::fmt::Display for ParamValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParamValue::Null => f.write_str("null"),
            ParamValue::Bool(v) => write!(f, "{}", v),
            ParamValue::Int(v) => write!(f, "{}", v),
            ParamValue::Float(v) => write!(f, "{}", v),
            ParamValue::Text(v) => write!(f, "{}", v),
        }
    }
}

/// Parameter name to value, iterated in lexicographic name order
pub type Params = BTreeMap<String, ParamValue>;

/// Parameter name to the list of candidate values
pub type ParamGrid = BTreeMap<String, Vec<ParamValue>>;

/// Cross-validation settings shared by every grid search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSearchSettings {
    /// Number of folds
    pub cv: usize,
    /// Shuffle rows before splitting into folds
    pub shuffle: bool,
    /// Seed for fold shuffling and randomised models
    pub random_state: Option<u64>,
    /// Worker threads (None = available cores)
    pub n_jobs: Option<usize>,
}

impl Default for GridSearchSettings {
    fn default() -> Self {
        Self {
            cv: 5,
            shuffle: true,
            random_state: Some(42),
            n_jobs: None,
        }
    }
}

/// One candidate model family
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Unique name of this entry
    pub id: String,
    /// Registry key of the model family
    #[serde(rename = "model")]
    pub constructor_ref: String,
    #[serde(rename = "params", default)]
    pub fixed_params: Params,
    #[serde(rename = "search_param_grid", default)]
    pub search_grid: ParamGrid,
}

impl ModelSpec {
    pub fn new(id: impl Into<String>, constructor_ref: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            constructor_ref: constructor_ref.into(),
            fixed_params: Params::new(),
            search_grid: ParamGrid::new(),
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, value: ParamValue) -> Self {
        self.fixed_params.insert(name.into(), value);
        self
    }

    pub fn with_grid(mut self, name: impl Into<String>, values: Vec<ParamValue>) -> Self {
        self.search_grid.insert(name.into(), values);
        self
    }

    /// Number of parameter combinations in the grid
    pub fn n_combinations(&self) -> usize {
        self.search_grid.values().map(Vec::len).product()
    }
}

/// Declarative search over model families with the acceptance policy floors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSearchConfig {
    #[serde(default)]
    pub grid_search: GridSearchSettings,
    pub model_selection: Vec<ModelSpec>,
    /// Minimum test R² a candidate must reach
    pub base_accuracy: f64,
    /// Maximum tolerated |train R² - test R²|
    pub acceptable_variance: f64,
}

impl ModelSearchConfig {
    pub fn new(base_accuracy: f64, acceptable_variance: f64) -> Self {
        Self {
            grid_search: GridSearchSettings::default(),
            model_selection: Vec::new(),
            base_accuracy,
            acceptable_variance,
        }
    }

    pub fn with_model(mut self, spec: ModelSpec) -> Self {
        self.model_selection.push(spec);
        self
    }

    pub fn with_cv(mut self, folds: usize) -> Self {
        self.grid_search.cv = folds;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.grid_search.random_state = Some(seed);
        self
    }

    pub fn with_n_jobs(mut self, n_jobs: usize) -> Self {
        self.grid_search.n_jobs = Some(n_jobs);
        self
    }

    /// Check the document against the model registry and numeric bounds
    pub fn validate(&self) -> Result<()> {
        if self.model_selection.is_empty() {
            return Err(HousingError::EmptyCandidates);
        }
        if self.grid_search.cv < 2 {
            return Err(HousingError::ConfigError(format!(
                "grid_search.cv must be at least 2, got {}",
                self.grid_search.cv
            )));
        }
        if !self.base_accuracy.is_finite() {
            return Err(HousingError::ConfigError(
                "base_accuracy must be a finite number".to_string(),
            ));
        }
        if !(self.acceptable_variance >= 0.0) {
            return Err(HousingError::ConfigError(format!(
                "acceptable_variance must be non-negative, got {}",
                self.acceptable_variance
            )));
        }

        let mut ids = HashSet::new();
        for spec in &self.model_selection {
            if !ids.insert(spec.id.as_str()) {
                return Err(HousingError::ConfigError(format!(
                    "duplicate model id '{}'",
                    spec.id
                )));
            }
            if !registry::is_registered(&spec.constructor_ref) {
                return Err(HousingError::UnknownModel(spec.constructor_ref.clone()));
            }
            for (name, values) in &spec.search_grid {
                if values.is_empty() {
                    return Err(HousingError::ConfigError(format!(
                        "grid for '{}.{}' has no values",
                        spec.id, name
                    )));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODEL_YAML: &str = r#"
grid_search:
  cv: 3
  random_state: 7
base_accuracy: 0.6
acceptable_variance: 0.05
model_selection:
  - id: linear
    model: linear_regression
    params:
      fit_intercept: true
    search_param_grid:
      fit_intercept: [true, false]
  - id: forest
    model: random_forest
    params:
      n_estimators: 10
      max_depth: null
    search_param_grid:
      min_samples_leaf: [2, 4]
      max_features: [sqrt, 0.5]
"#;

    #[test]
    fn test_parse_model_config() {
        let config: ModelSearchConfig = serde_yaml::from_str(MODEL_YAML).unwrap();
        assert_eq!(config.grid_search.cv, 3);
        assert!(config.grid_search.shuffle);
        assert_eq!(config.model_selection.len(), 2);
        assert_eq!(config.model_selection[0].id, "linear");
        assert_eq!(config.model_selection[1].n_combinations(), 4);
        assert_eq!(
            config.model_selection[1].fixed_params.get("max_depth"),
            Some(&ParamValue::Null)
        );
        assert_eq!(
            config.model_selection[1].search_grid["max_features"],
            vec![ParamValue::Text("sqrt".into()), ParamValue::Float(0.5)]
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_model_rejected() {
        let config = ModelSearchConfig::new(0.5, 0.1).with_model(ModelSpec::new("x", "svm"));
        assert!(matches!(config.validate(), Err(HousingError::UnknownModel(_))));
    }

    #[test]
    fn test_empty_model_list_rejected() {
        let config = ModelSearchConfig::new(0.5, 0.1);
        assert!(matches!(config.validate(), Err(HousingError::EmptyCandidates)));
    }

    #[test]
    fn test_param_value_accessors() {
        assert_eq!(ParamValue::Int(3).as_usize(), Some(3));
        assert_eq!(ParamValue::Int(-3).as_usize(), None);
        assert_eq!(ParamValue::Int(3).as_float(), Some(3.0));
        assert_eq!(ParamValue::Text("a".into()).as_float(), None);
    }
}
