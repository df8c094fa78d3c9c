//! Held-out evaluation and the acceptance policy

use super::models::{Regressor, ModelMetrics};
use super::registry::TrainedModel;
use super::selection::GridSearchedBestModel;
use crate::context::RunContext;
use crate::error::{HousingError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Train and test scores of one candidate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CandidateScores {
    pub train_rmse: f64,
    pub test_rmse: f64,
    /// Train R²
    pub train_accuracy: f64,
    /// Test R²
    pub test_accuracy: f64,
}

impl CandidateScores {
    /// Harmonic mean of train and test accuracy, 0 when they sum to 0
    pub fn model_accuracy(&self) -> f64 {
        harmonic_mean(self.train_accuracy, self.test_accuracy)
    }
}

pub fn harmonic_mean(a: f64, b: f64) -> f64 {
    let sum = a + b;
    if sum == 0.0 {
        0.0
    } else {
        2.0 * a * b / sum
    }
}

/// Why a candidate was turned down
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rejection {
    BelowBaseAccuracy,
    ExceedsVariance { gap: f64 },
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rejection::BelowBaseAccuracy => f.write_str("test accuracy below base accuracy"),
            Rejection::ExceedsVariance { gap } => {
                write!(f, "train/test gap {:.4} exceeds acceptable variance", gap)
            }
        }
    }
}

/// Global floors applied to every candidate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AcceptancePolicy {
    pub base_accuracy: f64,
    pub acceptable_variance: f64,
}

impl AcceptancePolicy {
    pub fn new(base_accuracy: f64, acceptable_variance: f64) -> Self {
        Self {
            base_accuracy,
            acceptable_variance,
        }
    }

    /// Accept iff test ≥ base and |train − test| ≤ variance
    pub fn check(&self, scores: &CandidateScores) -> std::result::Result<(), Rejection> {
        if !(scores.test_accuracy >= self.base_accuracy) {
            return Err(Rejection::BelowBaseAccuracy);
        }
        let gap = (scores.train_accuracy - scores.test_accuracy).abs();
        if !(gap <= self.acceptable_variance) {
            return Err(Rejection::ExceedsVariance { gap });
        }
        Ok(())
    }

    /// Index of the accepted candidate with the highest test accuracy
    ///
    /// Ties go to the earliest index.
    pub fn select(&self, scores: &[CandidateScores]) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (idx, s) in scores.iter().enumerate() {
            if self.check(s).is_ok() && best.map_or(true, |(_, b)| s.test_accuracy > b) {
                best = Some((idx, s.test_accuracy));
            }
        }
        best.map(|(idx, _)| idx)
    }
}

/// The chosen model plus its scores
#[derive(Debug, Clone)]
pub struct MetricInfoArtifact {
    model_identifier: String,
    model_object: TrainedModel,
    scores: CandidateScores,
    model_accuracy: f64,
    source_index: usize,
}

impl MetricInfoArtifact {
    pub fn model_identifier(&self) -> &str {
        &self.model_identifier
    }

    pub fn model_object(&self) -> &TrainedModel {
        &self.model_object
    }

    pub fn into_model(self) -> TrainedModel {
        self.model_object
    }

    pub fn train_rmse(&self) -> f64 {
        self.scores.train_rmse
    }

    pub fn test_rmse(&self) -> f64 {
        self.scores.test_rmse
    }

    pub fn train_accuracy(&self) -> f64 {
        self.scores.train_accuracy
    }

    pub fn test_accuracy(&self) -> f64 {
        self.scores.test_accuracy
    }

    pub fn model_accuracy(&self) -> f64 {
        self.model_accuracy
    }

    /// Position of the winner in the evaluated candidate list
    pub fn source_index(&self) -> usize {
        self.source_index
    }
}

/// Scores fitted candidates on both splits and picks one under the policy
#[derive(Debug, Clone)]
pub struct ModelEvaluator {
    policy: AcceptancePolicy,
}

impl ModelEvaluator {
    pub fn new(base_accuracy: f64, acceptable_variance: f64) -> Self {
        Self {
            policy: AcceptancePolicy::new(base_accuracy, acceptable_variance),
        }
    }

    pub fn policy(&self) -> &AcceptancePolicy {
        &self.policy
    }

    pub fn score(
        model: &TrainedModel,
        x_train: &Array2<f64>,
        y_train: &Array1<f64>,
        x_test: &Array2<f64>,
        y_test: &Array1<f64>,
    ) -> Result<CandidateScores> {
        let train = ModelMetrics::compute_regression(y_train, &model.predict(x_train)?)?;
        let test = ModelMetrics::compute_regression(y_test, &model.predict(x_test)?)?;
        Ok(CandidateScores {
            train_rmse: train.rmse,
            test_rmse: test.rmse,
            train_accuracy: train.r2,
            test_accuracy: test.r2,
        })
    }

    /// Evaluate candidates in order; fails when none is accepted
    pub fn evaluate(
        &self,
        candidates: Vec<GridSearchedBestModel>,
        x_train: &Array2<f64>,
        y_train: &Array1<f64>,
        x_test: &Array2<f64>,
        y_test: &Array1<f64>,
        ctx: &RunContext,
    ) -> Result<MetricInfoArtifact> {
        if candidates.is_empty() {
            return Err(HousingError::EmptyCandidates);
        }

        let mut scores = Vec::with_capacity(candidates.len());
        for candidate in &candidates {
            ctx.checkpoint()?;
            let s = Self::score(&candidate.fitted_model, x_train, y_train, x_test, y_test)?;
            match self.policy.check(&s) {
                Ok(()) => tracing::info!(
                    model = %candidate.model_identifier,
                    train_accuracy = s.train_accuracy,
                    test_accuracy = s.test_accuracy,
                    train_rmse = s.train_rmse,
                    test_rmse = s.test_rmse,
                    "Candidate accepted"
                ),
                Err(reason) => tracing::info!(
                    model = %candidate.model_identifier,
                    train_accuracy = s.train_accuracy,
                    test_accuracy = s.test_accuracy,
                    %reason,
                    "Candidate rejected"
                ),
            }
            scores.push(s);
        }

        let winner = self
            .policy
            .select(&scores)
            .ok_or(HousingError::NoAcceptableModel {
                base_accuracy: self.policy.base_accuracy,
                acceptable_variance: self.policy.acceptable_variance,
                evaluated: candidates.len(),
            })?;

        let s = scores[winner];
        let chosen = candidates.into_iter().nth(winner).ok_or_else(|| {
            HousingError::ComputationError(format!("candidate {} disappeared", winner))
        })?;
        tracing::info!(
            model = %chosen.model_identifier,
            index = winner,
            model_accuracy = s.model_accuracy(),
            "Acceptable model found"
        );

        Ok(MetricInfoArtifact {
            model_identifier: chosen.model_identifier,
            model_object: chosen.fitted_model,
            model_accuracy: s.model_accuracy(),
            scores: s,
            source_index: winner,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ParamValue, Params};
    use crate::training::registry;
    use ndarray::array;

    fn scores(train: f64, test: f64) -> CandidateScores {
        CandidateScores {
            train_rmse: 0.0,
            test_rmse: 0.0,
            train_accuracy: train,
            test_accuracy: test,
        }
    }

    #[test]
    fn test_highest_test_accuracy_wins() {
        let policy = AcceptancePolicy::new(0.5, 0.3);
        let all = [scores(0.6, 0.6), scores(0.85, 0.8)];
        assert_eq!(policy.select(&all), Some(1));
    }

    #[test]
    fn test_ties_go_to_earliest() {
        let policy = AcceptancePolicy::new(0.5, 0.3);
        let all = [scores(0.7, 0.7), scores(0.72, 0.7), scores(0.6, 0.55)];
        assert_eq!(policy.select(&all), Some(0));
    }

    #[test]
    fn test_all_below_base_selects_nothing() {
        let policy = AcceptancePolicy::new(0.9, 0.3);
        assert_eq!(policy.select(&[scores(0.8, 0.8), scores(0.5, 0.4)]), None);
    }

    #[test]
    fn test_variance_rule_dominates() {
        let policy = AcceptancePolicy::new(0.4, 0.2);
        assert!(matches!(
            policy.check(&scores(0.95, 0.5)),
            Err(Rejection::ExceedsVariance { .. })
        ));
        assert_eq!(policy.select(&[scores(0.95, 0.5)]), None);
    }

    #[test]
    fn test_nan_accuracy_rejected() {
        let policy = AcceptancePolicy::new(0.0, 1.0);
        assert_eq!(policy.check(&scores(0.5, f64::NAN)), Err(Rejection::BelowBaseAccuracy));
    }

    #[test]
    fn test_harmonic_mean() {
        assert!((harmonic_mean(0.8, 0.6) - 0.685_714_285_7).abs() < 1e-9);
        assert_eq!(harmonic_mean(0.0, 0.0), 0.0);
    }

    fn fitted(name: &str, params: Params, x: &Array2<f64>, y: &Array1<f64>) -> GridSearchedBestModel {
        let mut model = registry::build(name, &params).unwrap();
        model.fit(x, y).unwrap();
        GridSearchedBestModel {
            model_identifier: name.to_string(),
            fitted_model: model,
            best_parameters: params,
            best_score: 0.0,
        }
    }

    #[test]
    fn test_evaluate_picks_exact_linear_model() {
        let x = array![[0.0], [1.0], [2.0], [3.0], [4.0], [5.0]];
        let y = array![1.0, 3.0, 5.0, 7.0, 9.0, 11.0];
        let x_test = array![[6.0], [7.0]];
        let y_test = array![13.0, 15.0];

        let mut strong_ridge = Params::new();
        strong_ridge.insert("alpha".to_string(), ParamValue::Float(1000.0));
        let candidates = vec![
            fitted("ridge", strong_ridge, &x, &y),
            fitted("linear_regression", Params::new(), &x, &y),
        ];

        let info = ModelEvaluator::new(0.9, 0.05)
            .evaluate(candidates, &x, &y, &x_test, &y_test, &RunContext::with_run_id("t"))
            .unwrap();

        assert_eq!(info.model_identifier(), "linear_regression");
        assert_eq!(info.source_index(), 1);
        assert!(info.test_rmse() < 1e-6);
        assert!((info.model_accuracy() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_evaluate_without_acceptable_model_fails() {
        let x = array![[0.0], [1.0], [2.0], [3.0]];
        let y = array![0.0, 1.0, 2.0, 3.0];
        let candidates = vec![fitted("linear_regression", Params::new(), &x, &y)];

        // inverted target on the test split
        let y_test = array![3.0, 2.0, 1.0, 0.0];
        let err = ModelEvaluator::new(0.5, 0.1)
            .evaluate(candidates, &x, &y, &x, &y_test, &RunContext::with_run_id("t"))
            .unwrap_err();
        assert!(matches!(err, HousingError::NoAcceptableModel { evaluated: 1, .. }));
    }

    #[test]
    fn test_evaluate_empty_list() {
        let x = array![[0.0]];
        let y = array![0.0];
        let err = ModelEvaluator::new(0.5, 0.1)
            .evaluate(Vec::new(), &x, &y, &x, &y, &RunContext::with_run_id("t"))
            .unwrap_err();
        assert!(matches!(err, HousingError::EmptyCandidates));
    }
}
