//! Model trainer stage

use super::{ModelEvaluator, ModelSelector};
use crate::artifact::{DataTransformationArtifact, ModelTrainerArtifact};
use crate::config::{ModelSearchConfig, RunLayout};
use crate::context::RunContext;
use crate::error::{HousingError, Result, Stage, StageResultExt};
use crate::export::{CombinedEstimator, TransformerDocument};
use crate::utils::{self, Timer};
use std::path::PathBuf;

/// Searches, evaluates and persists the final combined estimator
pub struct ModelTrainer<'a> {
    transformation: &'a DataTransformationArtifact,
    model_config: &'a ModelSearchConfig,
    trained_model_file_path: PathBuf,
}

impl<'a> ModelTrainer<'a> {
    pub fn new(
        transformation: &'a DataTransformationArtifact,
        model_config: &'a ModelSearchConfig,
        layout: &RunLayout,
    ) -> Self {
        Self {
            transformation,
            model_config,
            trained_model_file_path: layout.trained_model_file_path.clone(),
        }
    }

    pub fn initiate(&self, ctx: &RunContext) -> Result<ModelTrainerArtifact> {
        let _enter = ctx.span().enter();
        let timer = Timer::start();
        tracing::info!("Model training started");

        let artifact = self
            .run(ctx)
            .in_stage(Stage::Training, "initiate_model_trainer")?;

        tracing::info!(
            model_accuracy = artifact.model_accuracy(),
            elapsed_ms = timer.elapsed_ms() as u64,
            "Model training completed"
        );
        Ok(artifact)
    }

    fn run(&self, ctx: &RunContext) -> Result<ModelTrainerArtifact> {
        if !self.transformation.is_transformed() {
            return Err(HousingError::DataError(format!(
                "data is not transformed: {}",
                self.transformation.message()
            )));
        }

        let train_df = utils::load_csv(self.transformation.transformed_train_file_path())?;
        let test_df = utils::load_csv(self.transformation.transformed_test_file_path())?;
        let (x_train, y_train) = utils::split_features_target(&train_df)?;
        let (x_test, y_test) = utils::split_features_target(&test_df)?;
        tracing::info!(
            train_rows = x_train.nrows(),
            test_rows = x_test.nrows(),
            features = x_train.ncols(),
            "Loaded transformed train and test data"
        );

        let config = self.model_config;
        let selector = ModelSelector::new(config.grid_search.clone());
        let candidates = selector.search(config, &x_train, &y_train, ctx)?;
        if let Some(best) = ModelSelector::best_cv_model(&candidates, config.base_accuracy) {
            tracing::info!(
                model = %best.model_identifier,
                best_score = best.best_score,
                "Best cross-validated model"
            );
        }

        ctx.checkpoint()?;
        let evaluator = ModelEvaluator::new(config.base_accuracy, config.acceptable_variance);
        let metric_info =
            evaluator.evaluate(candidates, &x_train, &y_train, &x_test, &y_test, ctx)?;

        let transformer = TransformerDocument::load(
            self.transformation.preprocessed_object_file_path(),
        )?
        .into_transformer();

        let (train_rmse, test_rmse) = (metric_info.train_rmse(), metric_info.test_rmse());
        let (train_accuracy, test_accuracy) =
            (metric_info.train_accuracy(), metric_info.test_accuracy());
        let model_accuracy = metric_info.model_accuracy();
        let model_identifier = metric_info.model_identifier().to_string();

        let estimator = CombinedEstimator::new(
            transformer,
            model_identifier.as_str(),
            metric_info.into_model(),
            ctx.run_id(),
        )?;
        estimator.save(&self.trained_model_file_path)?;

        Ok(ModelTrainerArtifact::new(
            true,
            &self.trained_model_file_path,
            train_rmse,
            test_rmse,
            train_accuracy,
            test_accuracy,
            model_accuracy,
            format!("trained model '{}'", model_identifier),
        ))
    }
}
