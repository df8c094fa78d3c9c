//! Linear model implementations

use super::models::{check_fit_input, check_predict_input, Regressor};
use crate::error::{HousingError, Result};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Solve the symmetric positive-definite system `A x = b` by Cholesky decomposition
///
/// A non-positive pivot triggers one retry with a tiny diagonal ridge.
fn cholesky_solve(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    cholesky_factor_solve(a, b).or_else(|| {
        let n = a.nrows().max(1);
        let ridge = 1e-8 * a.diag().iter().map(|v| v.abs()).sum::<f64>() / n as f64;
        let mut a_reg = a.clone();
        for k in 0..a.nrows() {
            a_reg[[k, k]] += ridge.max(1e-12);
        }
        cholesky_factor_solve(&a_reg, b)
    })
}

fn cholesky_factor_solve(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    if n != a.ncols() || n != b.len() {
        return None;
    }

    // A = L * L^T
    let mut l = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for j in 0..=i {
            let sum: f64 = (0..j).map(|k| l[[i, k]] * l[[j, k]]).sum();
            if i == j {
                let diag = a[[i, i]] - sum;
                // relative pivot floor: collinear columns leave rounding noise here
                if diag <= 1e-12 * a[[i, i]].abs() || diag <= 0.0 {
                    return None;
                }
                l[[i, j]] = diag.sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
            }
        }
    }

    // L * y = b
    let mut y = Array1::<f64>::zeros(n);
    for i in 0..n {
        let sum: f64 = (0..i).map(|j| l[[i, j]] * y[j]).sum();
        y[i] = (b[i] - sum) / l[[i, i]];
    }

    // L^T * x = y
    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let sum: f64 = ((i + 1)..n).map(|j| l[[j, i]] * x[j]).sum();
        x[i] = (y[i] - sum) / l[[i, i]];
    }

    Some(x)
}

/// Gauss-Jordan inverse, used when Cholesky fails
fn matrix_inverse(m: &Array2<f64>) -> Option<Array2<f64>> {
    let n = m.nrows();
    if n != m.ncols() {
        return None;
    }

    // [M | I]
    let mut aug = Array2::<f64>::zeros((n, 2 * n));
    for i in 0..n {
        for j in 0..n {
            aug[[i, j]] = m[[i, j]];
        }
        aug[[i, n + i]] = 1.0;
    }

    for col in 0..n {
        let max_row = (col..n)
            .max_by(|&a, &b| aug[[a, col]].abs().total_cmp(&aug[[b, col]].abs()))
            .unwrap_or(col);
        if max_row != col {
            for j in 0..2 * n {
                aug.swap([col, j], [max_row, j]);
            }
        }

        if aug[[col, col]].abs() < 1e-10 {
            return None;
        }

        let pivot = aug[[col, col]];
        for j in 0..2 * n {
            aug[[col, j]] /= pivot;
        }

        for row in 0..n {
            if row != col {
                let factor = aug[[row, col]];
                for j in 0..2 * n {
                    aug[[row, j]] -= factor * aug[[col, j]];
                }
            }
        }
    }

    Some(aug.slice(ndarray::s![.., n..]).to_owned())
}

/// Solve `(X^T X + alpha I) w = X^T y`
fn solve_normal_equations(x: &Array2<f64>, y: &Array1<f64>, alpha: f64) -> Result<Array1<f64>> {
    let mut xtx = x.t().dot(x);
    if alpha > 0.0 {
        for i in 0..x.ncols() {
            xtx[[i, i]] += alpha;
        }
    }
    let xty = x.t().dot(y);

    if let Some(w) = cholesky_solve(&xtx, &xty) {
        return Ok(w);
    }
    matrix_inverse(&xtx)
        .map(|inv| inv.dot(&xty))
        .ok_or_else(|| HousingError::ComputationError("Matrix is singular".to_string()))
}

/// Centered copies of `x`/`y` plus the means needed to recover the intercept
struct Centered {
    x: Array2<f64>,
    y: Array1<f64>,
    x_mean: Option<Array1<f64>>,
    y_mean: f64,
}

fn center(x: &Array2<f64>, y: &Array1<f64>, fit_intercept: bool) -> Centered {
    if !fit_intercept {
        return Centered {
            x: x.clone(),
            y: y.clone(),
            x_mean: None,
            y_mean: 0.0,
        };
    }
    let x_mean = x
        .mean_axis(Axis(0))
        .unwrap_or_else(|| Array1::zeros(x.ncols()));
    let y_mean = y.mean().unwrap_or(0.0);
    Centered {
        x: x - &x_mean.view().insert_axis(Axis(0)),
        y: y - y_mean,
        x_mean: Some(x_mean),
        y_mean,
    }
}

/// Fitted weights shared by the linear families
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearWeights {
    pub coefficients: Array1<f64>,
    pub intercept: f64,
}

impl LinearWeights {
    fn from_centered(coefficients: Array1<f64>, centered: &Centered) -> Self {
        let intercept = match &centered.x_mean {
            Some(x_mean) => centered.y_mean - coefficients.dot(x_mean),
            None => 0.0,
        };
        Self {
            coefficients,
            intercept,
        }
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        check_predict_input(x, self.coefficients.len())?;
        Ok(x.dot(&self.coefficients) + self.intercept)
    }
}

/// Ordinary least squares
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearRegression {
    pub fit_intercept: bool,
    weights: Option<LinearWeights>,
}

impl Default for LinearRegression {
    fn default() -> Self {
        Self::new()
    }
}

impl LinearRegression {
    pub fn new() -> Self {
        Self {
            fit_intercept: true,
            weights: None,
        }
    }

    pub fn with_fit_intercept(mut self, fit_intercept: bool) -> Self {
        self.fit_intercept = fit_intercept;
        self
    }

    pub fn weights(&self) -> Option<&LinearWeights> {
        self.weights.as_ref()
    }
}

impl Regressor for LinearRegression {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_fit_input(x, y)?;
        let centered = center(x, y, self.fit_intercept);
        let w = solve_normal_equations(&centered.x, &centered.y, 0.0)?;
        self.weights = Some(LinearWeights::from_centered(w, &centered));
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.weights
            .as_ref()
            .ok_or(HousingError::ModelNotFitted)?
            .predict(x)
    }
}

/// Ridge regression (L2-regularized least squares)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RidgeRegression {
    /// L2 regularization strength
    pub alpha: f64,
    pub fit_intercept: bool,
    weights: Option<LinearWeights>,
}

impl Default for RidgeRegression {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl RidgeRegression {
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha,
            fit_intercept: true,
            weights: None,
        }
    }

    pub fn with_fit_intercept(mut self, fit_intercept: bool) -> Self {
        self.fit_intercept = fit_intercept;
        self
    }
}

impl Regressor for RidgeRegression {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_fit_input(x, y)?;
        let centered = center(x, y, self.fit_intercept);
        let w = solve_normal_equations(&centered.x, &centered.y, self.alpha)?;
        self.weights = Some(LinearWeights::from_centered(w, &centered));
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.weights
            .as_ref()
            .ok_or(HousingError::ModelNotFitted)?
            .predict(x)
    }
}

/// Lasso regression (L1-regularized, coordinate descent)
///
/// Minimizes `1/(2n) ||y - Xw||² + alpha ||w||₁`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LassoRegression {
    /// L1 regularization strength
    pub alpha: f64,
    pub max_iter: usize,
    pub tol: f64,
    pub fit_intercept: bool,
    weights: Option<LinearWeights>,
}

impl Default for LassoRegression {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl LassoRegression {
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha,
            max_iter: 1000,
            tol: 1e-4,
            fit_intercept: true,
            weights: None,
        }
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    pub fn with_fit_intercept(mut self, fit_intercept: bool) -> Self {
        self.fit_intercept = fit_intercept;
        self
    }

    /// Soft-threshold operator for the L1 proximal step
    fn soft_threshold(val: f64, threshold: f64) -> f64 {
        if val > threshold {
            val - threshold
        } else if val < -threshold {
            val + threshold
        } else {
            0.0
        }
    }
}

impl Regressor for LassoRegression {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_fit_input(x, y)?;
        let centered = center(x, y, self.fit_intercept);
        let (x_c, y_c) = (&centered.x, &centered.y);
        let n_features = x_c.ncols();

        let col_norms: Vec<f64> = (0..n_features)
            .map(|j| x_c.column(j).mapv(|v| v * v).sum())
            .collect();

        let lambda = self.alpha * x_c.nrows() as f64;
        let mut w = Array1::<f64>::zeros(n_features);
        let mut r = y_c.clone();

        for _ in 0..self.max_iter {
            let mut max_delta = 0.0f64;
            let mut max_w = 0.0f64;

            for j in 0..n_features {
                if col_norms[j] < 1e-15 {
                    continue;
                }
                let old = w[j];
                let rho = x_c.column(j).dot(&r) + col_norms[j] * old;
                w[j] = Self::soft_threshold(rho, lambda) / col_norms[j];

                let delta = w[j] - old;
                if delta != 0.0 {
                    r.scaled_add(-delta, &x_c.column(j));
                }
                max_delta = max_delta.max(delta.abs());
                max_w = max_w.max(w[j].abs());
            }

            if max_w == 0.0 || max_delta / max_w < self.tol {
                break;
            }
        }

        self.weights = Some(LinearWeights::from_centered(w, &centered));
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.weights
            .as_ref()
            .ok_or(HousingError::ModelNotFitted)?
            .predict(x)
    }
}
