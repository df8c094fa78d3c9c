//! Model training module
//!
//! Regression families behind a static registry, k-fold grid search per
//! family, held-out evaluation under the acceptance policy and the trainer
//! stage that ties them together:
//! - Linear models (OLS, Ridge, Lasso)
//! - Decision trees and Random Forests
//! - K-Nearest Neighbors

mod models;
mod stage;
pub mod cross_validation;
pub mod decision_tree;
pub mod evaluation;
pub mod knn;
pub mod linear_models;
pub mod random_forest;
pub mod registry;
pub mod selection;

pub use cross_validation::{CVSplit, CrossValidator};
pub use decision_tree::{DecisionTree, TreeNode};
pub use evaluation::{AcceptancePolicy, CandidateScores, MetricInfoArtifact, ModelEvaluator, Rejection};
pub use knn::{DistanceMetric, KNNConfig, KNNRegressor, WeightScheme};
pub use linear_models::{LassoRegression, LinearRegression, RidgeRegression};
pub use models::{r2_score, rmse, ModelMetrics, Regressor};
pub use random_forest::{MaxFeatures, RandomForest};
pub use registry::{RegistryEntry, TrainedModel};
pub use selection::{expand_grid, GridSearchedBestModel, ModelSelector};
pub use stage::ModelTrainer;
