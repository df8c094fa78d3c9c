//! K-nearest neighbors regressor

use super::models::{check_fit_input, check_predict_input, Regressor};
use crate::error::{HousingError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Distance metric for KNN
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum DistanceMetric {
    /// Euclidean distance (L2)
    #[default]
    Euclidean,
    /// Manhattan distance (L1)
    Manhattan,
    /// Minkowski distance with parameter p
    Minkowski(f64),
}

impl DistanceMetric {
    fn distance(&self, a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
        match *self {
            DistanceMetric::Euclidean => a
                .iter()
                .zip(b.iter())
                .map(|(x, y)| (x - y).powi(2))
                .sum::<f64>()
                .sqrt(),
            DistanceMetric::Manhattan => a.iter().zip(b.iter()).map(|(x, y)| (x - y).abs()).sum(),
            DistanceMetric::Minkowski(p) => a
                .iter()
                .zip(b.iter())
                .map(|(x, y)| (x - y).abs().powf(p))
                .sum::<f64>()
                .powf(1.0 / p),
        }
    }
}

/// Weighting scheme for neighbors
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum WeightScheme {
    /// All neighbors have equal weight
    #[default]
    Uniform,
    /// Inverse distance; exact matches take all the weight
    Distance,
}

/// KNN configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KNNConfig {
    pub n_neighbors: usize,
    pub metric: DistanceMetric,
    pub weights: WeightScheme,
}

impl Default for KNNConfig {
    fn default() -> Self {
        Self {
            n_neighbors: 5,
            metric: DistanceMetric::Euclidean,
            weights: WeightScheme::Uniform,
        }
    }
}

/// K-nearest neighbors regressor
///
/// Stores the training table; prediction averages the targets of the `k`
/// closest rows. Equal distances are ordered by training row index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KNNRegressor {
    config: KNNConfig,
    x_train: Option<Array2<f64>>,
    y_train: Option<Array1<f64>>,
}

impl KNNRegressor {
    pub fn new(config: KNNConfig) -> Self {
        Self {
            config,
            x_train: None,
            y_train: None,
        }
    }

    pub fn config(&self) -> &KNNConfig {
        &self.config
    }

    fn predict_row(&self, row: ArrayView1<f64>, x_train: &Array2<f64>, y_train: &Array1<f64>) -> f64 {
        let k = self.config.n_neighbors.min(x_train.nrows());
        let mut neighbors: Vec<(f64, usize)> = x_train
            .rows()
            .into_iter()
            .enumerate()
            .map(|(idx, train_row)| (self.config.metric.distance(row, train_row), idx))
            .collect();
        neighbors.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        neighbors.truncate(k);

        match self.config.weights {
            WeightScheme::Uniform => {
                neighbors.iter().map(|&(_, i)| y_train[i]).sum::<f64>() / k as f64
            }
            WeightScheme::Distance => {
                let exact: Vec<usize> = neighbors
                    .iter()
                    .filter(|(d, _)| *d == 0.0)
                    .map(|&(_, i)| i)
                    .collect();
                if !exact.is_empty() {
                    return exact.iter().map(|&i| y_train[i]).sum::<f64>() / exact.len() as f64;
                }
                let (num, den) = neighbors
                    .iter()
                    .fold((0.0, 0.0), |(num, den), &(d, i)| (num + y_train[i] / d, den + 1.0 / d));
                num / den
            }
        }
    }
}

impl Regressor for KNNRegressor {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_fit_input(x, y)?;
        if self.config.n_neighbors == 0 {
            return Err(HousingError::InvalidParameter {
                name: "n_neighbors".to_string(),
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.config.n_neighbors > x.nrows() {
            return Err(HousingError::InvalidParameter {
                name: "n_neighbors".to_string(),
                value: self.config.n_neighbors.to_string(),
                reason: format!("exceeds the {} training rows", x.nrows()),
            });
        }
        self.x_train = Some(x.clone());
        self.y_train = Some(y.clone());
        Ok(())
    }

    /// Parallelized over query rows
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let (x_train, y_train) = match (&self.x_train, &self.y_train) {
            (Some(x_train), Some(y_train)) => (x_train, y_train),
            _ => return Err(HousingError::ModelNotFitted),
        };
        check_predict_input(x, x_train.ncols())?;

        let predictions: Vec<f64> = (0..x.nrows())
            .into_par_iter()
            .map(|i| self.predict_row(x.row(i), x_train, y_train))
            .collect();
        Ok(Array1::from_vec(predictions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_uniform_average() {
        let x = array![[0.0], [1.0], [2.0], [10.0]];
        let y = array![0.0, 1.0, 2.0, 10.0];
        let mut knn = KNNRegressor::new(KNNConfig {
            n_neighbors: 3,
            ..Default::default()
        });
        knn.fit(&x, &y).unwrap();

        let pred = knn.predict(&array![[1.0]]).unwrap();
        assert!((pred[0] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_distance_weights_exact_match() {
        let x = array![[0.0], [1.0], [2.0]];
        let y = array![5.0, 7.0, 9.0];
        let mut knn = KNNRegressor::new(KNNConfig {
            n_neighbors: 3,
            weights: WeightScheme::Distance,
            ..Default::default()
        });
        knn.fit(&x, &y).unwrap();
        assert_eq!(knn.predict(&array![[1.0]]).unwrap()[0], 7.0);
    }

    #[test]
    fn test_manhattan_distance() {
        let d = DistanceMetric::Manhattan.distance(array![0.0, 0.0].view(), array![3.0, 4.0].view());
        assert_eq!(d, 7.0);
        let d = DistanceMetric::Euclidean.distance(array![0.0, 0.0].view(), array![3.0, 4.0].view());
        assert_eq!(d, 5.0);
    }

    #[test]
    fn test_too_many_neighbors() {
        let mut knn = KNNRegressor::new(KNNConfig {
            n_neighbors: 5,
            ..Default::default()
        });
        assert!(knn.fit(&array![[0.0], [1.0]], &array![0.0, 1.0]).is_err());
    }
}
