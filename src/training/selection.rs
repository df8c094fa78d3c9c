//! Per-family grid search
//!
//! Every [`ModelSpec`] is searched over the cartesian product of its grid
//! with k-fold cross-validation scored by R². The best parameter set is refit
//! on the full training table.

use super::cross_validation::{CVSplit, CrossValidator};
use super::models::{r2_score, Regressor};
use super::registry::{self, TrainedModel};
use crate::config::{GridSearchSettings, ModelSearchConfig, ModelSpec, ParamGrid, ParamValue, Params};
use crate::context::RunContext;
use crate::error::{HousingError, Result};
use crate::utils::{try_parallel_map, ParallelConfig, Timer};
use ndarray::{Array1, Array2};

/// Best configuration found for one model spec
#[derive(Debug, Clone)]
pub struct GridSearchedBestModel {
    pub model_identifier: String,
    /// Refit on the full training table with `best_parameters`
    pub fitted_model: TrainedModel,
    pub best_parameters: Params,
    /// Mean cross-validated R² of `best_parameters`
    pub best_score: f64,
}

/// Grid search driver
#[derive(Debug, Clone)]
pub struct ModelSelector {
    settings: GridSearchSettings,
    parallel: ParallelConfig,
}

impl ModelSelector {
    pub fn new(settings: GridSearchSettings) -> Self {
        let parallel = match settings.n_jobs {
            Some(n) => ParallelConfig::new().with_threads(n),
            None => ParallelConfig::new(),
        };
        Self { settings, parallel }
    }

    pub fn settings(&self) -> &GridSearchSettings {
        &self.settings
    }

    /// Search every spec in declaration order
    ///
    /// A spec whose model fails to fit aborts the whole search.
    pub fn search(
        &self,
        config: &ModelSearchConfig,
        x: &Array2<f64>,
        y: &Array1<f64>,
        ctx: &RunContext,
    ) -> Result<Vec<GridSearchedBestModel>> {
        if config.model_selection.is_empty() {
            return Err(HousingError::EmptyCandidates);
        }
        if x.nrows() != y.len() {
            return Err(HousingError::ShapeError {
                expected: format!("{} targets", x.nrows()),
                actual: format!("{} targets", y.len()),
            });
        }

        let folds = CrossValidator::k_fold(self.settings.cv, self.settings.shuffle)
            .with_random_state(self.settings.random_state)
            .split(x.nrows())?;

        let mut results = Vec::with_capacity(config.model_selection.len());
        for spec in &config.model_selection {
            ctx.checkpoint()?;
            results.push(self.search_spec(spec, x, y, &folds)?);
        }
        Ok(results)
    }

    fn search_spec(
        &self,
        spec: &ModelSpec,
        x: &Array2<f64>,
        y: &Array1<f64>,
        folds: &[CVSplit],
    ) -> Result<GridSearchedBestModel> {
        let timer = Timer::start();
        let candidates = self.candidate_params(spec)?;
        tracing::info!(
            model = %spec.id,
            family = %spec.constructor_ref,
            combinations = candidates.len(),
            folds = folds.len(),
            "Grid search started"
        );

        // Build every candidate up front so a bad parameter fails before any fit
        for params in &candidates {
            registry::build(&spec.constructor_ref, params)?;
        }

        let tasks: Vec<(usize, &CVSplit)> = (0..candidates.len())
            .flat_map(|c| folds.iter().map(move |fold| (c, fold)))
            .collect();

        let fold_scores = try_parallel_map(tasks, &self.parallel, |(c, fold)| {
            let (x_train, y_train, x_test, y_test) = fold.select(x, y);
            let mut model = registry::build(&spec.constructor_ref, &candidates[c])?;
            model
                .fit(&x_train, &y_train)
                .map_err(|e| fit_error(spec, e))?;
            r2_score(&y_test, &model.predict(&x_test)?)
        })?;

        let mean_scores: Vec<f64> = fold_scores
            .chunks(folds.len())
            .map(|scores| scores.iter().sum::<f64>() / scores.len() as f64)
            .collect();

        let (best_idx, best_score) = pick_best(&mean_scores).ok_or_else(|| {
            HousingError::ComputationError(format!("no scores for '{}'", spec.id))
        })?;
        let best_parameters = candidates[best_idx].clone();

        let mut fitted_model = registry::build(&spec.constructor_ref, &best_parameters)?;
        fitted_model.fit(x, y).map_err(|e| fit_error(spec, e))?;

        tracing::info!(
            model = %spec.id,
            best_score,
            best_parameters = ?best_parameters,
            elapsed_ms = timer.elapsed_ms() as u64,
            "Grid search completed"
        );

        Ok(GridSearchedBestModel {
            model_identifier: spec.id.clone(),
            fitted_model,
            best_parameters,
            best_score,
        })
    }

    /// Full parameter sets of a spec in grid iteration order
    ///
    /// Grid values override fixed parameters of the same name. Seeded
    /// families get the search seed unless `random_state` is set explicitly.
    pub fn candidate_params(&self, spec: &ModelSpec) -> Result<Vec<Params>> {
        let entry = registry::lookup(&spec.constructor_ref)?;
        let combos = expand_grid(&spec.search_grid);
        if combos.is_empty() {
            return Err(HousingError::ConfigError(format!(
                "grid of '{}' has no combinations",
                spec.id
            )));
        }

        Ok(combos
            .into_iter()
            .map(|combo| {
                let mut params = spec.fixed_params.clone();
                params.extend(combo);
                if entry.seeded && !params.contains_key("random_state") {
                    if let Some(seed) = self.settings.random_state {
                        params.insert("random_state".to_string(), ParamValue::Int(seed as i64));
                    }
                }
                params
            })
            .collect())
    }

    /// Highest-scoring result that clears `base_accuracy`
    pub fn best_cv_model(
        results: &[GridSearchedBestModel],
        base_accuracy: f64,
    ) -> Option<&GridSearchedBestModel> {
        let scores: Vec<f64> = results.iter().map(|r| r.best_score).collect();
        pick_best(&scores)
            .filter(|(_, score)| *score >= base_accuracy)
            .map(|(idx, _)| &results[idx])
    }
}

/// Cartesian product of a grid, last parameter name varying fastest
///
/// An empty grid yields a single empty parameter set.
pub fn expand_grid(grid: &ParamGrid) -> Vec<Params> {
    let mut combos = vec![Params::new()];
    for (name, values) in grid {
        combos = combos
            .into_iter()
            .flat_map(|base| {
                values.iter().map(move |value| {
                    let mut params = base.clone();
                    params.insert(name.clone(), value.clone());
                    params
                })
            })
            .collect();
    }
    combos
}

/// Index and value of the strictly highest score; NaN never wins
fn pick_best(scores: &[f64]) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;
    for (idx, &score) in scores.iter().enumerate() {
        let score = if score.is_nan() { f64::NEG_INFINITY } else { score };
        if best.map_or(true, |(_, b)| score > b) {
            best = Some((idx, score));
        }
    }
    best
}

fn fit_error(spec: &ModelSpec, err: HousingError) -> HousingError {
    HousingError::FitError {
        model: spec.id.clone(),
        reason: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array;

    fn linear_data(n: usize) -> (Array2<f64>, Array1<f64>) {
        let x = Array::from_shape_fn((n, 2), |(i, j)| ((i * (j + 3)) % 17) as f64);
        let y = x.column(0).mapv(|v| 2.0 * v) + x.column(1).mapv(|v| -0.5 * v) + 1.0;
        (x, y)
    }

    #[test]
    fn test_expand_grid_order() {
        let mut grid = ParamGrid::new();
        grid.insert("b".into(), vec![ParamValue::Int(1), ParamValue::Int(2)]);
        grid.insert("a".into(), vec![ParamValue::Text("x".into()), ParamValue::Text("y".into())]);

        let combos = expand_grid(&grid);
        assert_eq!(combos.len(), 4);
        // "a" sorts first so "b" varies fastest
        assert_eq!(combos[0]["a"], ParamValue::Text("x".into()));
        assert_eq!(combos[0]["b"], ParamValue::Int(1));
        assert_eq!(combos[1]["b"], ParamValue::Int(2));
        assert_eq!(combos[2]["a"], ParamValue::Text("y".into()));
    }

    #[test]
    fn test_empty_grid_is_single_candidate() {
        assert_eq!(expand_grid(&ParamGrid::new()), vec![Params::new()]);
    }

    #[test]
    fn test_seed_injected_for_seeded_families() {
        let selector = ModelSelector::new(GridSearchSettings::default());
        let forest = ModelSpec::new("f", "random_forest");
        let params = selector.candidate_params(&forest).unwrap();
        assert_eq!(params[0]["random_state"], ParamValue::Int(42));

        let ridge = ModelSpec::new("r", "ridge");
        let params = selector.candidate_params(&ridge).unwrap();
        assert!(!params[0].contains_key("random_state"));
    }

    #[test]
    fn test_pick_best_keeps_first_tie() {
        assert_eq!(pick_best(&[0.5, 0.9, 0.9, 0.1]), Some((1, 0.9)));
        assert_eq!(pick_best(&[f64::NAN, 0.2]), Some((1, 0.2)));
        assert_eq!(pick_best(&[]), None);
    }

    #[test]
    fn test_search_finds_linear_fit() {
        let (x, y) = linear_data(40);
        let config = ModelSearchConfig::new(0.5, 0.1)
            .with_cv(4)
            .with_model(
                ModelSpec::new("ridge", "ridge").with_grid(
                    "alpha",
                    vec![ParamValue::Float(100.0), ParamValue::Float(0.0)],
                ),
            )
            .with_model(ModelSpec::new("knn", "knn").with_param("n_neighbors", ParamValue::Int(3)));

        let selector = ModelSelector::new(config.grid_search.clone());
        let results = selector
            .search(&config, &x, &y, &RunContext::with_run_id("t"))
            .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].model_identifier, "ridge");
        assert_eq!(results[0].best_parameters["alpha"], ParamValue::Float(0.0));
        assert!(results[0].best_score > 0.999);
        assert_eq!(results[1].fitted_model.family(), "knn");
    }

    #[test]
    fn test_search_is_deterministic() {
        let (x, y) = linear_data(30);
        let config = ModelSearchConfig::new(0.0, 1.0)
            .with_cv(3)
            .with_random_state(7)
            .with_model(
                ModelSpec::new("forest", "random_forest")
                    .with_param("n_estimators", ParamValue::Int(5))
                    .with_grid("max_features", vec![ParamValue::Text("sqrt".into()), ParamValue::Float(1.0)]),
            );
        let ctx = RunContext::with_run_id("t");

        let a = ModelSelector::new(config.grid_search.clone())
            .search(&config, &x, &y, &ctx)
            .unwrap();
        let b = ModelSelector::new(config.grid_search.clone())
            .search(&config, &x, &y, &ctx)
            .unwrap();
        assert_eq!(a[0].best_parameters, b[0].best_parameters);
        assert_eq!(a[0].best_score, b[0].best_score);
    }

    #[test]
    fn test_cancelled_search_stops() {
        let (x, y) = linear_data(20);
        let config = ModelSearchConfig::new(0.0, 1.0)
            .with_cv(2)
            .with_model(ModelSpec::new("lin", "linear_regression"));
        let ctx = RunContext::with_run_id("t");
        ctx.cancellation().cancel();

        let err = ModelSelector::new(config.grid_search.clone())
            .search(&config, &x, &y, &ctx)
            .unwrap_err();
        assert!(matches!(err, HousingError::Cancelled));
    }

    #[test]
    fn test_fit_failure_aborts_batch() {
        let (x, y) = linear_data(10);
        // 8 training rows per fold cannot supply 9 neighbours
        let config = ModelSearchConfig::new(0.0, 1.0)
            .with_cv(5)
            .with_model(ModelSpec::new("lin", "linear_regression"))
            .with_model(ModelSpec::new("knn", "knn").with_param("n_neighbors", ParamValue::Int(9)));

        let err = ModelSelector::new(config.grid_search.clone())
            .search(&config, &x, &y, &RunContext::with_run_id("t"))
            .unwrap_err();
        assert!(matches!(err, HousingError::FitError { ref model, .. } if model == "knn"));
    }

    #[test]
    fn test_best_cv_model_respects_floor() {
        let model = registry::build("linear_regression", &Params::new()).unwrap();
        let result = |id: &str, score: f64| GridSearchedBestModel {
            model_identifier: id.to_string(),
            fitted_model: model.clone(),
            best_parameters: Params::new(),
            best_score: score,
        };
        let results = vec![result("a", 0.4), result("b", 0.7)];

        let best = ModelSelector::best_cv_model(&results, 0.5).unwrap();
        assert_eq!(best.model_identifier, "b");
        assert!(ModelSelector::best_cv_model(&results, 0.8).is_none());
    }
}
