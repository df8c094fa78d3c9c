//! Feature transformer with a numeric and a categorical branch

use super::{Encoder, ImputeStrategy, Imputer, Scaler};
use crate::config::Schema;
use crate::error::{HousingError, Result};
use crate::utils::{self, column_names};
use crate::validation::Value;
use ndarray::{concatenate, Array2, Axis};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Builds an unfitted [`FeatureTransformer`] from a schema
pub struct PreprocessingBuilder;

impl PreprocessingBuilder {
    pub fn build(schema: &Schema) -> FeatureTransformer {
        FeatureTransformer::new(
            schema.numerical_columns.clone(),
            schema.categorical_columns.clone(),
        )
    }
}

/// Fit-once, reuse-many feature transformer
///
/// Numeric branch: median imputation, then standard scaling.
/// Categorical branch: most-frequent imputation, one-hot encoding, then
/// scaling without centering. Output columns are the numeric features followed
/// by the indicator columns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureTransformer {
    numeric_columns: Vec<String>,
    categorical_columns: Vec<String>,
    numeric_imputer: Imputer,
    numeric_scaler: Scaler,
    categorical_imputer: Imputer,
    encoder: Encoder,
    categorical_scaler: Scaler,
    feature_names: Vec<String>,
    is_fitted: bool,
}

impl FeatureTransformer {
    pub fn new(numeric_columns: Vec<String>, categorical_columns: Vec<String>) -> Self {
        Self {
            numeric_columns,
            categorical_columns,
            numeric_imputer: Imputer::new(ImputeStrategy::Median),
            numeric_scaler: Scaler::standard(),
            categorical_imputer: Imputer::new(ImputeStrategy::MostFrequent),
            encoder: Encoder::new(),
            categorical_scaler: Scaler::without_mean(),
            feature_names: Vec::new(),
            is_fitted: false,
        }
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    /// Output column names; empty until fitted
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn n_features_in(&self) -> usize {
        self.numeric_columns.len() + self.categorical_columns.len()
    }

    /// Input columns in record order: numeric then categorical
    pub fn input_columns(&self) -> Vec<&str> {
        self.numeric_columns
            .iter()
            .chain(self.categorical_columns.iter())
            .map(String::as_str)
            .collect()
    }

    /// Fit on the training features and return them transformed
    ///
    /// Refitting a fitted transformer is an error.
    pub fn fit_transform(&mut self, df: &DataFrame) -> Result<Array2<f64>> {
        if self.is_fitted {
            return Err(HousingError::ValidationError(
                "transformer is already fitted; use transform".to_string(),
            ));
        }
        let start = Instant::now();
        let df = self.select_inputs(df)?;

        let numeric: Vec<&str> = self.numeric_columns.iter().map(String::as_str).collect();
        let categorical: Vec<&str> = self.categorical_columns.iter().map(String::as_str).collect();

        let imputed = self.numeric_imputer.fit_transform(&df, &numeric)?;
        self.numeric_scaler.fit(&imputed, &numeric)?;

        let imputed = self.categorical_imputer.fit_transform(&df, &categorical)?;
        let encoded = self.encoder.fit_transform(&imputed, &categorical)?;
        let indicator_names = self.encoder.feature_names();
        let indicators: Vec<&str> = indicator_names.iter().map(String::as_str).collect();
        self.categorical_scaler.fit(&encoded, &indicators)?;

        self.feature_names = self
            .numeric_columns
            .iter()
            .cloned()
            .chain(indicator_names.iter().cloned())
            .collect();
        self.is_fitted = true;

        tracing::debug!(
            rows = df.height(),
            features_out = self.feature_names.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Fitted feature transformer"
        );
        self.transform(&df)
    }

    /// Apply the fitted branches; never changes fitted state
    pub fn transform(&self, df: &DataFrame) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(HousingError::ModelNotFitted);
        }
        let df = self.select_inputs(df)?;

        let numeric = self
            .numeric_scaler
            .transform(&self.numeric_imputer.transform(&df)?)?;
        let numeric = utils::to_matrix(&numeric, &self.numeric_columns)?;

        let encoded = if self.encoder.n_output_features() == 0 {
            Array2::zeros((df.height(), 0))
        } else {
            let encoded = self
                .encoder
                .transform(&self.categorical_imputer.transform(&df)?)?;
            let encoded = self.categorical_scaler.transform(&encoded)?;
            utils::to_matrix(&encoded, &self.encoder.feature_names())?
        };

        Ok(concatenate(Axis(1), &[numeric.view(), encoded.view()])?)
    }

    /// Transform to a frame with named columns
    pub fn transform_frame(&self, df: &DataFrame) -> Result<DataFrame> {
        let x = self.transform(df)?;
        utils::matrix_to_frame(&x, &self.feature_names, None)
    }

    /// Transform raw records laid out in [`input_columns`](Self::input_columns) order
    pub fn transform_records(&self, records: &[Vec<Value>]) -> Result<Array2<f64>> {
        let n_in = self.n_features_in();
        if let Some((row, record)) = records.iter().enumerate().find(|(_, r)| r.len() != n_in) {
            return Err(HousingError::ShapeError {
                expected: format!("{} values per record", n_in),
                actual: format!("{} values at row {}", record.len(), row),
            });
        }

        let n_num = self.numeric_columns.len();
        let mut columns: Vec<Column> = Vec::with_capacity(n_in);
        for (idx, name) in self.numeric_columns.iter().enumerate() {
            let values: Vec<Option<f64>> = records.iter().map(|r| r[idx].as_f64()).collect();
            columns.push(Column::new(name.as_str().into(), values));
        }
        for (idx, name) in self.categorical_columns.iter().enumerate() {
            let values: Vec<Option<String>> = records
                .iter()
                .map(|r| r[n_num + idx].as_str().map(str::to_string))
                .collect();
            columns.push(Column::new(name.as_str().into(), values));
        }

        self.transform(&DataFrame::new(columns)?)
    }

    /// Keep the input columns, numeric ones as Float64 and categorical ones as String
    fn select_inputs(&self, df: &DataFrame) -> Result<DataFrame> {
        let available = column_names(df);
        let missing: Vec<&str> = self
            .input_columns()
            .into_iter()
            .filter(|c| !available.iter().any(|a| a == c))
            .collect();
        if !missing.is_empty() {
            return Err(HousingError::SchemaMismatch(format!(
                "input is missing feature columns: {}",
                missing.join(", ")
            )));
        }

        let columns = self
            .numeric_columns
            .iter()
            .map(|name| (name, DataType::Float64))
            .chain(
                self.categorical_columns
                    .iter()
                    .map(|name| (name, DataType::String)),
            )
            .map(|(name, dtype)| {
                let series = df.column(name)?.as_materialized_series().cast(&dtype)?;
                Ok(Column::from(series))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(DataFrame::new(columns)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> DataFrame {
        df!(
            "x" => &[Some(1.0), None, Some(3.0), Some(5.0)],
            "n" => &[10i64, 20, 30, 40],
            "c" => &[Some("a"), Some("b"), None, Some("b")],
            "ignored" => &["p", "q", "r", "s"]
        )
        .unwrap()
    }

    fn transformer() -> FeatureTransformer {
        FeatureTransformer::new(
            vec!["x".to_string(), "n".to_string()],
            vec!["c".to_string()],
        )
    }

    #[test]
    fn test_fit_transform_layout() {
        let mut t = transformer();
        let x = t.fit_transform(&frame()).unwrap();

        assert_eq!(x.dim(), (4, 4));
        assert_eq!(t.feature_names(), &["x", "n", "c_a", "c_b"]);
        assert!(x.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_refit_rejected() {
        let mut t = transformer();
        t.fit_transform(&frame()).unwrap();
        assert!(t.fit_transform(&frame()).is_err());
    }

    #[test]
    fn test_records_match_frame() {
        let mut t = transformer();
        t.fit_transform(&frame()).unwrap();

        let from_frame = t.transform(&frame()).unwrap();
        let records = vec![
            vec![Value::Float(1.0), Value::Int(10), Value::text("a")],
            vec![Value::Float(f64::NAN), Value::Int(20), Value::text("b")],
        ];
        let from_records = t.transform_records(&records).unwrap();

        assert_eq!(from_records.row(0), from_frame.row(0));
        assert_eq!(from_records.row(1), from_frame.row(1));
    }

    #[test]
    fn test_missing_input_column() {
        let mut t = transformer();
        t.fit_transform(&frame()).unwrap();

        let df = df!("x" => &[1.0]).unwrap();
        assert!(matches!(t.transform(&df), Err(HousingError::SchemaMismatch(_))));
    }

    #[test]
    fn test_serde_roundtrip_keeps_output() {
        let mut t = transformer();
        let expected = t.fit_transform(&frame()).unwrap();

        let json = serde_json::to_string(&t).unwrap();
        let restored: FeatureTransformer = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.transform(&frame()).unwrap(), expected);
    }
}
