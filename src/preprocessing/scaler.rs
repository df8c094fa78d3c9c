//! Variance scaling

use crate::error::{HousingError, Result};
use crate::utils::numeric_column;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Parameters for a fitted column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ScalerParams {
    center: f64,
    scale: f64,
}

/// Standard scaler: `(x - mean) / std`, or `x / std` without centering
///
/// Uses the population standard deviation; constant columns keep scale 1.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scaler {
    with_mean: bool,
    params: HashMap<String, ScalerParams>,
    is_fitted: bool,
}

impl Scaler {
    /// Centering and scaling
    pub fn standard() -> Self {
        Self::new(true)
    }

    /// Scaling only; keeps zeros at zero
    pub fn without_mean() -> Self {
        Self::new(false)
    }

    fn new(with_mean: bool) -> Self {
        Self {
            with_mean,
            params: HashMap::new(),
            is_fitted: false,
        }
    }

    pub fn fit(&mut self, df: &DataFrame, columns: &[&str]) -> Result<&mut Self> {
        for col_name in columns {
            let values: Vec<f64> = numeric_column(df, col_name)?.into_iter().flatten().collect();
            let params = self.compute_params(&values);
            self.params.insert(col_name.to_string(), params);
        }

        self.is_fitted = true;
        Ok(self)
    }

    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        if !self.is_fitted {
            return Err(HousingError::ModelNotFitted);
        }

        let mut result = df.clone();
        for (col_name, params) in &self.params {
            let scaled: Float64Chunked = numeric_column(df, col_name)?
                .into_iter()
                .map(|opt| opt.map(|v| (v - params.center) / params.scale))
                .collect();
            result.with_column(scaled.with_name(col_name.as_str().into()).into_series())?;
        }

        Ok(result)
    }

    pub fn fit_transform(&mut self, df: &DataFrame, columns: &[&str]) -> Result<DataFrame> {
        self.fit(df, columns)?;
        self.transform(df)
    }

    fn compute_params(&self, values: &[f64]) -> ScalerParams {
        if values.is_empty() {
            return ScalerParams {
                center: 0.0,
                scale: 1.0,
            };
        }

        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let std = var.sqrt();

        ScalerParams {
            center: if self.with_mean { mean } else { 0.0 },
            scale: if std > f64::EPSILON { std } else { 1.0 },
        }
    }
}
