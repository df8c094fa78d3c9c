//! Integration test: grid search, evaluation and the acceptance policy

mod common;

use housing_automl::config::{ModelSearchConfig, ModelSpec, ParamValue};
use housing_automl::context::RunContext;
use housing_automl::error::HousingError;
use housing_automl::training::{
    AcceptancePolicy, CandidateScores, ModelEvaluator, ModelSelector, Regressor,
};
use ndarray::{Array1, Array2};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

fn regression_data(n: usize, seed: u64) -> (Array2<f64>, Array1<f64>) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let x = Array2::from_shape_fn((n, 3), |_| rng.gen_range(-1.0..1.0));
    let y = x.column(0).mapv(|v| 3.0 * v)
        + x.column(1).mapv(|v| v * v)
        + x.column(2).mapv(|v| -2.0 * v)
        + Array1::from_shape_fn(n, |_| rng.gen_range(-0.05..0.05));
    (x, y)
}

fn scores(train: f64, test: f64) -> CandidateScores {
    CandidateScores {
        train_rmse: 1.0 - train,
        test_rmse: 1.0 - test,
        train_accuracy: train,
        test_accuracy: test,
    }
}

#[test]
fn test_config_from_yaml_searches_every_family() {
    let config: ModelSearchConfig = serde_yaml::from_str(common::MODEL_YAML).unwrap();
    config.validate().unwrap();
    let (x, y) = regression_data(90, 1);

    let results = ModelSelector::new(config.grid_search.clone())
        .search(&config, &x, &y, &RunContext::with_run_id("t"))
        .unwrap();

    let ids: Vec<&str> = results.iter().map(|r| r.model_identifier.as_str()).collect();
    assert_eq!(ids, vec!["linear", "ridge", "forest"]);
    assert_eq!(results[2].best_parameters["n_estimators"], ParamValue::Int(8));
    assert_eq!(results[2].best_parameters["random_state"], ParamValue::Int(11));
    assert!(results.iter().all(|r| r.best_score.is_finite()));
}

#[test]
fn test_search_is_reproducible_with_seed() {
    let config: ModelSearchConfig = serde_yaml::from_str(common::MODEL_YAML).unwrap();
    let (x, y) = regression_data(60, 2);
    let ctx = RunContext::with_run_id("t");

    let first = ModelSelector::new(config.grid_search.clone())
        .search(&config, &x, &y, &ctx)
        .unwrap();
    let mut single_thread = config.grid_search.clone();
    single_thread.n_jobs = Some(1);
    let second = ModelSelector::new(single_thread)
        .search(&config, &x, &y, &ctx)
        .unwrap();

    for (a, b) in first.iter().zip(&second) {
        assert_eq!(a.best_parameters, b.best_parameters);
        assert_eq!(a.best_score, b.best_score);
    }
}

#[test]
fn test_grid_ties_keep_first_combination() {
    // one feature: coordinate descent converges long before either cap
    let x = Array2::from_shape_fn((24, 1), |(i, _)| i as f64);
    let y = x.column(0).mapv(|v| 2.0 * v + 1.0);
    let config = ModelSearchConfig::new(0.0, 1.0).with_cv(4).with_model(
        ModelSpec::new("lasso", "lasso")
            .with_param("alpha", ParamValue::Float(0.01))
            .with_grid("max_iter", vec![ParamValue::Int(2000), ParamValue::Int(1000)]),
    );

    let results = ModelSelector::new(config.grid_search.clone())
        .search(&config, &x, &y, &RunContext::with_run_id("t"))
        .unwrap();
    assert_eq!(results[0].best_parameters["max_iter"], ParamValue::Int(2000));
}

#[test]
fn test_policy_prefers_higher_test_accuracy() {
    let policy = AcceptancePolicy::new(0.5, 0.3);
    assert_eq!(policy.select(&[scores(0.85, 0.80), scores(0.65, 0.60)]), Some(0));
    assert_eq!(policy.select(&[scores(0.65, 0.60), scores(0.85, 0.80)]), Some(1));
}

#[test]
fn test_policy_rejects_all_below_base() {
    let policy = AcceptancePolicy::new(0.7, 1.0);
    assert_eq!(policy.select(&[scores(0.9, 0.6), scores(0.5, 0.5)]), None);
}

#[test]
fn test_policy_variance_rule_dominates() {
    let policy = AcceptancePolicy::new(0.4, 0.2);
    assert!(policy.check(&scores(0.95, 0.50)).is_err());
    assert!(policy.check(&scores(0.65, 0.50)).is_ok());
}

#[test]
fn test_select_then_evaluate() {
    let (x_train, y_train) = regression_data(120, 3);
    let (x_test, y_test) = regression_data(40, 4);
    let config = ModelSearchConfig::new(0.8, 0.2)
        .with_cv(3)
        .with_model(ModelSpec::new("linear", "linear_regression"))
        .with_model(
            ModelSpec::new("knn", "knn")
                .with_grid("n_neighbors", vec![ParamValue::Int(3), ParamValue::Int(7)])
                .with_param("weights", ParamValue::Text("distance".into())),
        );
    let ctx = RunContext::with_run_id("t");

    let candidates = ModelSelector::new(config.grid_search.clone())
        .search(&config, &x_train, &y_train, &ctx)
        .unwrap();
    let info = ModelEvaluator::new(config.base_accuracy, config.acceptable_variance)
        .evaluate(candidates, &x_train, &y_train, &x_test, &y_test, &ctx)
        .unwrap();

    assert!(info.test_accuracy() >= 0.8);
    assert!((info.train_accuracy() - info.test_accuracy()).abs() <= 0.2);
    let predictions = info.model_object().predict(&x_test).unwrap();
    assert_eq!(predictions.len(), 40);
}

#[test]
fn test_no_acceptable_model_is_an_error() {
    let (x_train, y_train) = regression_data(60, 5);
    let (x_test, y_test) = regression_data(20, 6);
    let config = ModelSearchConfig::new(0.999, 0.0001)
        .with_cv(3)
        .with_model(ModelSpec::new("linear", "linear_regression"));
    let ctx = RunContext::with_run_id("t");

    let candidates = ModelSelector::new(config.grid_search.clone())
        .search(&config, &x_train, &y_train, &ctx)
        .unwrap();
    let err = ModelEvaluator::new(config.base_accuracy, config.acceptable_variance)
        .evaluate(candidates, &x_train, &y_train, &x_test, &y_test, &ctx)
        .unwrap_err();
    assert!(matches!(err, HousingError::NoAcceptableModel { evaluated: 1, .. }));
}
