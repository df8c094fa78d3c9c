//! Static model registry
//!
//! Maps a model family identifier from the search config to a constructor.
//! Constructors only read hyperparameters; fitting happens later through
//! [`TrainedModel`].

use super::decision_tree::DecisionTree;
use super::knn::{DistanceMetric, KNNConfig, KNNRegressor, WeightScheme};
use super::linear_models::{LassoRegression, LinearRegression, RidgeRegression};
use super::models::Regressor;
use super::random_forest::{MaxFeatures, RandomForest};
use crate::config::{ParamValue, Params};
use crate::error::{HousingError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Enum to hold model variants
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "family", content = "state", rename_all = "snake_case")]
pub enum TrainedModel {
    LinearRegression(LinearRegression),
    Ridge(RidgeRegression),
    Lasso(LassoRegression),
    DecisionTree(DecisionTree),
    RandomForest(RandomForest),
    Knn(KNNRegressor),
}

impl TrainedModel {
    /// Registry identifier of the family
    pub fn family(&self) -> &'static str {
        match self {
            TrainedModel::LinearRegression(_) => "linear_regression",
            TrainedModel::Ridge(_) => "ridge",
            TrainedModel::Lasso(_) => "lasso",
            TrainedModel::DecisionTree(_) => "decision_tree",
            TrainedModel::RandomForest(_) => "random_forest",
            TrainedModel::Knn(_) => "knn",
        }
    }

    fn as_regressor(&self) -> &dyn Regressor {
        match self {
            TrainedModel::LinearRegression(m) => m,
            TrainedModel::Ridge(m) => m,
            TrainedModel::Lasso(m) => m,
            TrainedModel::DecisionTree(m) => m,
            TrainedModel::RandomForest(m) => m,
            TrainedModel::Knn(m) => m,
        }
    }

    fn as_regressor_mut(&mut self) -> &mut dyn Regressor {
        match self {
            TrainedModel::LinearRegression(m) => m,
            TrainedModel::Ridge(m) => m,
            TrainedModel::Lasso(m) => m,
            TrainedModel::DecisionTree(m) => m,
            TrainedModel::RandomForest(m) => m,
            TrainedModel::Knn(m) => m,
        }
    }
}

impl Regressor for TrainedModel {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        self.as_regressor_mut().fit(x, y)
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.as_regressor().predict(x)
    }
}

/// Builds an unfitted model from hyperparameters
pub type Constructor = fn(&Params) -> Result<TrainedModel>;

/// One registered model family
#[derive(Debug, Clone, Copy)]
pub struct RegistryEntry {
    pub name: &'static str,
    /// Accepted hyperparameter names
    pub params: &'static [&'static str],
    /// Whether the family takes a `random_state`
    pub seeded: bool,
    constructor: Constructor,
}

static REGISTRY: &[RegistryEntry] = &[
    RegistryEntry {
        name: "linear_regression",
        params: &["fit_intercept"],
        seeded: false,
        constructor: build_linear_regression,
    },
    RegistryEntry {
        name: "ridge",
        params: &["alpha", "fit_intercept"],
        seeded: false,
        constructor: build_ridge,
    },
    RegistryEntry {
        name: "lasso",
        params: &["alpha", "max_iter", "tol", "fit_intercept"],
        seeded: false,
        constructor: build_lasso,
    },
    RegistryEntry {
        name: "decision_tree",
        params: &["max_depth", "min_samples_split", "min_samples_leaf"],
        seeded: false,
        constructor: build_decision_tree,
    },
    RegistryEntry {
        name: "random_forest",
        params: &[
            "n_estimators",
            "max_depth",
            "min_samples_split",
            "min_samples_leaf",
            "max_features",
            "bootstrap",
            "random_state",
        ],
        seeded: true,
        constructor: build_random_forest,
    },
    RegistryEntry {
        name: "knn",
        params: &["n_neighbors", "weights", "metric", "p"],
        seeded: false,
        constructor: build_knn,
    },
];

/// Every registered identifier, in registration order
pub fn registered_models() -> impl Iterator<Item = &'static str> {
    REGISTRY.iter().map(|entry| entry.name)
}

pub fn is_registered(name: &str) -> bool {
    REGISTRY.iter().any(|entry| entry.name == name)
}

pub fn lookup(name: &str) -> Result<&'static RegistryEntry> {
    REGISTRY
        .iter()
        .find(|entry| entry.name == name)
        .ok_or_else(|| HousingError::UnknownModel(name.to_string()))
}

/// Construct an unfitted model, rejecting unknown parameter names
pub fn build(name: &str, params: &Params) -> Result<TrainedModel> {
    let entry = lookup(name)?;
    if let Some(unknown) = params.keys().find(|k| !entry.params.contains(&k.as_str())) {
        return Err(HousingError::InvalidParameter {
            name: unknown.clone(),
            value: params[unknown].to_string(),
            reason: format!(
                "not a parameter of '{}' (expected one of: {})",
                name,
                entry.params.join(", ")
            ),
        });
    }
    (entry.constructor)(params)
}

fn invalid(name: &str, value: &ParamValue, reason: &str) -> HousingError {
    HousingError::InvalidParameter {
        name: name.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn get_bool(params: &Params, name: &str, default: bool) -> Result<bool> {
    match params.get(name) {
        None => Ok(default),
        Some(v) => v.as_bool().ok_or_else(|| invalid(name, v, "expected a boolean")),
    }
}

fn get_usize(params: &Params, name: &str, default: usize, min: usize) -> Result<usize> {
    match params.get(name) {
        None => Ok(default),
        Some(v) => match v.as_usize() {
            Some(n) if n >= min => Ok(n),
            _ => Err(invalid(name, v, &format!("expected an integer >= {}", min))),
        },
    }
}

/// `null` and absence both mean "unbounded"
fn get_opt_usize(params: &Params, name: &str, min: usize) -> Result<Option<usize>> {
    match params.get(name) {
        None | Some(ParamValue::Null) => Ok(None),
        Some(v) => match v.as_usize() {
            Some(n) if n >= min => Ok(Some(n)),
            _ => Err(invalid(name, v, &format!("expected null or an integer >= {}", min))),
        },
    }
}

fn get_non_negative(params: &Params, name: &str, default: f64) -> Result<f64> {
    match params.get(name) {
        None => Ok(default),
        Some(v) => match v.as_float() {
            Some(f) if f.is_finite() && f >= 0.0 => Ok(f),
            _ => Err(invalid(name, v, "expected a non-negative number")),
        },
    }
}

fn get_seed(params: &Params) -> Result<Option<u64>> {
    match params.get("random_state") {
        None | Some(ParamValue::Null) => Ok(None),
        Some(v) => v
            .as_usize()
            .map(|n| Some(n as u64))
            .ok_or_else(|| invalid("random_state", v, "expected null or a non-negative integer")),
    }
}

fn build_linear_regression(params: &Params) -> Result<TrainedModel> {
    Ok(TrainedModel::LinearRegression(
        LinearRegression::new().with_fit_intercept(get_bool(params, "fit_intercept", true)?),
    ))
}

fn build_ridge(params: &Params) -> Result<TrainedModel> {
    Ok(TrainedModel::Ridge(
        RidgeRegression::new(get_non_negative(params, "alpha", 1.0)?)
            .with_fit_intercept(get_bool(params, "fit_intercept", true)?),
    ))
}

fn build_lasso(params: &Params) -> Result<TrainedModel> {
    Ok(TrainedModel::Lasso(
        LassoRegression::new(get_non_negative(params, "alpha", 1.0)?)
            .with_max_iter(get_usize(params, "max_iter", 1000, 1)?)
            .with_tol(get_non_negative(params, "tol", 1e-4)?)
            .with_fit_intercept(get_bool(params, "fit_intercept", true)?),
    ))
}

fn build_decision_tree(params: &Params) -> Result<TrainedModel> {
    Ok(TrainedModel::DecisionTree(
        DecisionTree::new()
            .with_max_depth(get_opt_usize(params, "max_depth", 1)?)
            .with_min_samples_split(get_usize(params, "min_samples_split", 2, 2)?)
            .with_min_samples_leaf(get_usize(params, "min_samples_leaf", 1, 1)?),
    ))
}

fn parse_max_features(value: Option<&ParamValue>) -> Result<MaxFeatures> {
    let name = "max_features";
    match value {
        None | Some(ParamValue::Null) => Ok(MaxFeatures::All),
        Some(v @ ParamValue::Text(s)) => match s.as_str() {
            "sqrt" => Ok(MaxFeatures::Sqrt),
            "log2" => Ok(MaxFeatures::Log2),
            "all" => Ok(MaxFeatures::All),
            _ => Err(invalid(name, v, "expected sqrt, log2 or all")),
        },
        Some(ParamValue::Int(n)) if *n >= 1 => Ok(MaxFeatures::Fixed(*n as usize)),
        Some(ParamValue::Float(f)) if *f > 0.0 && *f <= 1.0 => Ok(MaxFeatures::Fraction(*f)),
        Some(v) => Err(invalid(name, v, "expected a name, a count >= 1 or a fraction in (0, 1]")),
    }
}

fn build_random_forest(params: &Params) -> Result<TrainedModel> {
    Ok(TrainedModel::RandomForest(
        RandomForest::new(get_usize(params, "n_estimators", 100, 1)?)
            .with_max_depth(get_opt_usize(params, "max_depth", 1)?)
            .with_min_samples_split(get_usize(params, "min_samples_split", 2, 2)?)
            .with_min_samples_leaf(get_usize(params, "min_samples_leaf", 1, 1)?)
            .with_max_features(parse_max_features(params.get("max_features"))?)
            .with_bootstrap(get_bool(params, "bootstrap", true)?)
            .with_random_state(get_seed(params)?),
    ))
}

fn build_knn(params: &Params) -> Result<TrainedModel> {
    let weights = match params.get("weights") {
        None => WeightScheme::Uniform,
        Some(v) => match v.as_str() {
            Some("uniform") => WeightScheme::Uniform,
            Some("distance") => WeightScheme::Distance,
            _ => return Err(invalid("weights", v, "expected uniform or distance")),
        },
    };

    let p = match params.get("p") {
        None => 2.0,
        Some(v) => match v.as_float() {
            Some(p) if p >= 1.0 => p,
            _ => return Err(invalid("p", v, "expected a number >= 1")),
        },
    };

    let metric = match params.get("metric") {
        None => DistanceMetric::Euclidean,
        Some(v) => match v.as_str() {
            Some("euclidean") => DistanceMetric::Euclidean,
            Some("manhattan") => DistanceMetric::Manhattan,
            Some("minkowski") if p == 1.0 => DistanceMetric::Manhattan,
            Some("minkowski") if p == 2.0 => DistanceMetric::Euclidean,
            Some("minkowski") => DistanceMetric::Minkowski(p),
            _ => return Err(invalid("metric", v, "expected euclidean, manhattan or minkowski")),
        },
    };

    Ok(TrainedModel::Knn(KNNRegressor::new(KNNConfig {
        n_neighbors: get_usize(params, "n_neighbors", 5, 1)?,
        metric,
        weights,
    })))
}
