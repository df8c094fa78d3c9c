//! Dataset schema

use crate::error::{HousingError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Declared storage type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnDtype {
    #[serde(alias = "float64", alias = "float32", alias = "double")]
    Float,
    #[serde(alias = "int64", alias = "int32", alias = "integer")]
    Int,
    #[serde(alias = "object", alias = "str", alias = "string", alias = "categorical")]
    Category,
    #[serde(alias = "boolean")]
    Bool,
}

impl ColumnDtype {
    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnDtype::Float | ColumnDtype::Int)
    }
}

/// Declarative description of the expected columns
///
/// ```yaml
/// columns:
///   longitude: float
///   ocean_proximity: category
///   median_house_value: float
/// numerical_columns: [longitude]
/// categorical_columns: [ocean_proximity]
/// target_column: median_house_value
/// domain_value:
///   ocean_proximity: [NEAR BAY, INLAND]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// Column name to dtype, used for type coercion on load
    #[serde(rename = "columns")]
    pub column_dtypes: BTreeMap<String, ColumnDtype>,
    /// Ordered numerical feature names
    pub numerical_columns: Vec<String>,
    /// Ordered categorical feature names
    pub categorical_columns: Vec<String>,
    pub target_column: String,
    /// Allowed values per domain-checked categorical column
    #[serde(rename = "domain_value", default)]
    pub domain_values: BTreeMap<String, Vec<String>>,
}

impl Schema {
    /// Number of values in a validated feature record
    pub fn expected_column_count(&self) -> usize {
        self.numerical_columns.len() + self.categorical_columns.len()
    }

    /// Feature names in record order: numerical first, then categorical
    pub fn feature_columns(&self) -> Vec<&str> {
        self.numerical_columns
            .iter()
            .chain(self.categorical_columns.iter())
            .map(String::as_str)
            .collect()
    }

    pub fn is_numerical(&self, name: &str) -> bool {
        self.numerical_columns.iter().any(|c| c == name)
    }

    pub fn is_categorical(&self, name: &str) -> bool {
        self.categorical_columns.iter().any(|c| c == name)
    }

    pub fn dtype(&self, name: &str) -> Option<ColumnDtype> {
        self.column_dtypes.get(name).copied()
    }

    /// Check internal consistency of the schema document
    pub fn validate(&self) -> Result<()> {
        if self.numerical_columns.is_empty() && self.categorical_columns.is_empty() {
            return Err(HousingError::ConfigError(
                "schema declares no feature columns".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for name in self.feature_columns() {
            if !seen.insert(name) {
                return Err(HousingError::ConfigError(format!(
                    "column '{}' is declared more than once",
                    name
                )));
            }
            if !self.column_dtypes.contains_key(name) {
                return Err(HousingError::ConfigError(format!(
                    "feature column '{}' has no dtype in 'columns'",
                    name
                )));
            }
        }

        if seen.contains(self.target_column.as_str()) {
            return Err(HousingError::ConfigError(format!(
                "target column '{}' is also declared as a feature",
                self.target_column
            )));
        }
        match self.dtype(&self.target_column) {
            Some(dtype) if dtype.is_numeric() => {}
            Some(dtype) => {
                return Err(HousingError::ConfigError(format!(
                    "target column '{}' must be numeric, found {:?}",
                    self.target_column, dtype
                )))
            }
            None => {
                return Err(HousingError::ConfigError(format!(
                    "target column '{}' has no dtype in 'columns'",
                    self.target_column
                )))
            }
        }

        for name in &self.numerical_columns {
            if let Some(dtype) = self.dtype(name) {
                if !dtype.is_numeric() {
                    return Err(HousingError::ConfigError(format!(
                        "numerical column '{}' declared as {:?}",
                        name, dtype
                    )));
                }
            }
        }

        for (name, allowed) in &self.domain_values {
            if !self.is_categorical(name) {
                return Err(HousingError::ConfigError(format!(
                    "domain values given for '{}', which is not a categorical column",
                    name
                )));
            }
            if allowed.is_empty() {
                return Err(HousingError::ConfigError(format!(
                    "domain values for '{}' are empty",
                    name
                )));
            }
        }

        Ok(())
    }
}
