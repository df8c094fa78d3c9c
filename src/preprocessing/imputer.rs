//! Missing value imputation strategies

use crate::error::{HousingError, Result};
use crate::utils::{numeric_column, text_column};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Strategy for imputing missing values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ImputeStrategy {
    /// Replace with the column median (numeric only)
    Median,
    /// Replace with the most frequent value (text only)
    MostFrequent,
}

/// Imputer for handling missing values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Imputer {
    strategy: ImputeStrategy,
    fill_values: HashMap<String, ImputeValue>,
    is_fitted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum ImputeValue {
    Numeric(f64),
    String(String),
}

impl Imputer {
    pub fn new(strategy: ImputeStrategy) -> Self {
        Self {
            strategy,
            fill_values: HashMap::new(),
            is_fitted: false,
        }
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    /// Learn one fill value per column
    pub fn fit(&mut self, df: &DataFrame, columns: &[&str]) -> Result<&mut Self> {
        for col_name in columns {
            let fill_value = match self.strategy {
                ImputeStrategy::Median => ImputeValue::Numeric(median(df, col_name)?),
                ImputeStrategy::MostFrequent => ImputeValue::String(most_frequent(df, col_name)?),
            };
            self.fill_values.insert(col_name.to_string(), fill_value);
        }

        self.is_fitted = true;
        Ok(self)
    }

    /// Replace nulls (and NaNs) in every fitted column
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        if !self.is_fitted {
            return Err(HousingError::ModelNotFitted);
        }

        let mut result = df.clone();
        for (col_name, fill_value) in &self.fill_values {
            let filled = match fill_value {
                ImputeValue::Numeric(val) => {
                    let ca: Float64Chunked = numeric_column(df, col_name)?
                        .into_iter()
                        .map(|opt| Some(opt.unwrap_or(*val)))
                        .collect();
                    ca.with_name(col_name.as_str().into()).into_series()
                }
                ImputeValue::String(val) => {
                    let ca: StringChunked = text_column(df, col_name)?
                        .into_iter()
                        .map(|opt| Some(opt.unwrap_or_else(|| val.clone())))
                        .collect();
                    ca.with_name(col_name.as_str().into()).into_series()
                }
            };
            result.with_column(filled)?;
        }

        Ok(result)
    }

    pub fn fit_transform(&mut self, df: &DataFrame, columns: &[&str]) -> Result<DataFrame> {
        self.fit(df, columns)?;
        self.transform(df)
    }
}

fn median(df: &DataFrame, col_name: &str) -> Result<f64> {
    let mut values: Vec<f64> = numeric_column(df, col_name)?.into_iter().flatten().collect();
    if values.is_empty() {
        return Err(HousingError::DataError(format!(
            "column '{}' has no observed values to impute from",
            col_name
        )));
    }
    values.sort_by(|a, b| a.total_cmp(b));

    let mid = values.len() / 2;
    Ok(if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    })
}

/// Most frequent value; ties go to the lexicographically smallest
fn most_frequent(df: &DataFrame, col_name: &str) -> Result<String> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for val in text_column(df, col_name)?.into_iter().flatten() {
        *counts.entry(val).or_insert(0) += 1;
    }

    counts
        .into_iter()
        .fold(None, |best: Option<(String, usize)>, (val, count)| match best {
            Some((_, best_count)) if best_count >= count => best,
            _ => Some((val, count)),
        })
        .map(|(val, _)| val)
        .ok_or_else(|| {
            HousingError::DataError(format!(
                "column '{}' has no observed values to impute from",
                col_name
            ))
        })
}
