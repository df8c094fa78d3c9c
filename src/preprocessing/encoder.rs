//! One-hot categorical encoding

use crate::error::{HousingError, Result};
use crate::utils::text_column;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One-hot encoder
///
/// Categories are learned per column and kept in sorted order, so the output
/// layout only depends on the set of values seen during fit. A value that was
/// not seen during fit is rejected at transform time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Encoder {
    /// (column, sorted categories), in fit order
    categories: Vec<(String, Vec<String>)>,
    is_fitted: bool,
}

impl Encoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fit(&mut self, df: &DataFrame, columns: &[&str]) -> Result<&mut Self> {
        self.categories = columns
            .iter()
            .map(|col_name| {
                let seen: BTreeSet<String> =
                    text_column(df, col_name)?.into_iter().flatten().collect();
                Ok((col_name.to_string(), seen.into_iter().collect()))
            })
            .collect::<Result<Vec<_>>>()?;

        self.is_fitted = true;
        Ok(self)
    }

    /// Replace each fitted column with its indicator columns
    ///
    /// The output holds only the indicator columns, in fit order.
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        if !self.is_fitted {
            return Err(HousingError::ModelNotFitted);
        }

        let mut columns = Vec::with_capacity(self.n_output_features());
        for (col_name, categories) in &self.categories {
            let values = text_column(df, col_name)?;

            let mut indicators = vec![vec![0.0f64; values.len()]; categories.len()];
            for (row, value) in values.iter().enumerate() {
                let value = value.as_deref().ok_or_else(|| {
                    HousingError::DataError(format!(
                        "missing value in column '{}' at row {}",
                        col_name, row
                    ))
                })?;
                let idx = categories
                    .binary_search_by(|c| c.as_str().cmp(value))
                    .map_err(|_| {
                        HousingError::DataError(format!(
                            "unknown category '{}' in column '{}' at row {}",
                            value, col_name, row
                        ))
                    })?;
                indicators[idx][row] = 1.0;
            }

            for (category, data) in categories.iter().zip(indicators) {
                let name = format!("{}_{}", col_name, category);
                columns.push(Column::new(name.into(), data));
            }
        }

        Ok(DataFrame::new(columns)?)
    }

    pub fn fit_transform(&mut self, df: &DataFrame, columns: &[&str]) -> Result<DataFrame> {
        self.fit(df, columns)?;
        self.transform(df)
    }

    /// Names of the indicator columns, `<column>_<category>`
    pub fn feature_names(&self) -> Vec<String> {
        self.categories
            .iter()
            .flat_map(|(col_name, categories)| {
                categories
                    .iter()
                    .map(move |category| format!("{}_{}", col_name, category))
            })
            .collect()
    }

    pub fn n_output_features(&self) -> usize {
        self.categories.iter().map(|(_, c)| c.len()).sum()
    }

    pub fn categories(&self, column: &str) -> Option<&[String]> {
        self.categories
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, c)| c.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_onehot_sorted_categories() {
        let df = df!("c" => &["INLAND", "NEAR BAY", "INLAND", "<1H OCEAN"]).unwrap();

        let mut encoder = Encoder::new();
        let result = encoder.fit_transform(&df, &["c"]).unwrap();

        assert_eq!(
            encoder.feature_names(),
            vec!["c_<1H OCEAN", "c_INLAND", "c_NEAR BAY"]
        );
        assert_eq!(result.width(), 3);

        let inland: Vec<f64> = result
            .column("c_INLAND")
            .unwrap()
            .f64()
            .unwrap()
            .into_no_null_iter()
            .collect();
        assert_eq!(inland, vec![1.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_unknown_category_rejected() {
        let train = df!("c" => &["a", "b"]).unwrap();
        let test = df!("c" => &["a", "z"]).unwrap();

        let mut encoder = Encoder::new();
        encoder.fit(&train, &["c"]).unwrap();

        let err = encoder.transform(&test).unwrap_err();
        assert!(err.to_string().contains("unknown category 'z'"));
    }
}
