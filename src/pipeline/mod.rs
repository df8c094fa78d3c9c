//! Training pipeline orchestration
//!
//! Runs validation, transformation and training strictly in sequence. Each
//! stage receives only the artifact of the stage before it. The first failing
//! stage moves the pipeline to [`PipelineState::Failed`] and its error is
//! returned unchanged; files already written stay on disk.

use crate::artifact::{DataIngestionArtifact, ModelTrainerArtifact};
use crate::config::{ConfigStore, ModelSearchConfig, PipelineConfig, RunLayout, Schema};
use crate::context::RunContext;
use crate::error::{HousingError, Result, Stage, StageResultExt};
use crate::preprocessing::DataTransformation;
use crate::training::ModelTrainer;
use crate::utils::Timer;
use crate::validation::{DataValidation, SchemaValidator};
use serde::{Deserialize, Serialize};

/// Pipeline state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineState {
    Validating,
    Transforming,
    Training,
    Done,
    Failed,
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Failed)
    }
}

/// Sequential training pipeline
pub struct Pipeline {
    config: PipelineConfig,
    schema: Schema,
    model_config: ModelSearchConfig,
    state: PipelineState,
}

impl Pipeline {
    pub fn new(config: PipelineConfig, schema: Schema, model_config: ModelSearchConfig) -> Self {
        Self {
            config,
            schema,
            model_config,
            state: PipelineState::Validating,
        }
    }

    /// Load the schema and model search config named by `config`
    pub fn from_config(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let schema = ConfigStore::load_schema(&config.schema_file_path)?;
        let model_config = ConfigStore::load_model_search(&config.model_config_file_path)?;
        Ok(Self::new(config, schema, model_config))
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn model_config(&self) -> &ModelSearchConfig {
        &self.model_config
    }

    /// Context for the configured run id, or a generated one
    pub fn context(&self) -> RunContext {
        match &self.config.run_id {
            Some(run_id) => RunContext::with_run_id(run_id.as_str()),
            None => RunContext::new(),
        }
    }

    pub fn layout(&self, ctx: &RunContext) -> RunLayout {
        self.config.layout(ctx.run_id())
    }

    /// Run every stage once
    pub fn run(
        &mut self,
        ingestion: &DataIngestionArtifact,
        ctx: &RunContext,
    ) -> Result<ModelTrainerArtifact> {
        if self.state != PipelineState::Validating {
            let rerun: Result<ModelTrainerArtifact> = Err(HousingError::ConfigError(format!(
                "pipeline already ran (state {:?})",
                self.state
            )));
            return rerun.in_stage(Stage::Setup, "run");
        }

        let timer = Timer::start();
        let result = self.run_stages(ingestion, ctx);
        self.state = match &result {
            Ok(_) => PipelineState::Done,
            Err(err) => {
                tracing::error!(parent: ctx.span(), error = %err, "Pipeline failed");
                PipelineState::Failed
            }
        };
        if result.is_ok() {
            tracing::info!(
                parent: ctx.span(),
                elapsed_ms = timer.elapsed_ms() as u64,
                "Pipeline completed"
            );
        }
        result
    }

    fn run_stages(
        &mut self,
        ingestion: &DataIngestionArtifact,
        ctx: &RunContext,
    ) -> Result<ModelTrainerArtifact> {
        let layout = self.layout(ctx);
        create_run_dir(&layout).in_stage(Stage::Setup, "create_run_dir")?;
        tracing::info!(parent: ctx.span(), root = %layout.root.display(), "Pipeline started");

        self.enter(PipelineState::Validating, Stage::Validation, ctx)?;
        let validator = SchemaValidator::new()
            .with_bool_as_numeric(self.config.validation.allow_bool_as_numeric);
        let validation = DataValidation::new(
            ingestion,
            &self.schema,
            &self.config.schema_file_path,
            &layout,
        )
        .with_validator(validator)
        .initiate(ctx)?;

        self.enter(PipelineState::Transforming, Stage::Transformation, ctx)?;
        let transformation =
            DataTransformation::new(ingestion, &validation, &self.schema, &layout).initiate(ctx)?;

        self.enter(PipelineState::Training, Stage::Training, ctx)?;
        ModelTrainer::new(&transformation, &self.model_config, &layout).initiate(ctx)
    }

    fn enter(&mut self, next: PipelineState, stage: Stage, ctx: &RunContext) -> Result<()> {
        ctx.checkpoint().in_stage(stage, format!("enter_{}", stage))?;
        tracing::debug!(parent: ctx.span(), from = ?self.state, to = ?next, "Stage transition");
        self.state = next;
        Ok(())
    }
}

/// Create the run directory; an existing one belongs to another run
fn create_run_dir(layout: &RunLayout) -> Result<()> {
    if let Some(parent) = layout.root.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::create_dir(&layout.root).map_err(|e| match e.kind() {
        std::io::ErrorKind::AlreadyExists => HousingError::ConfigError(format!(
            "run directory {} already exists",
            layout.root.display()
        )),
        _ => HousingError::IoError(e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::fixtures::housing_schema;
    use crate::config::ModelSpec;

    fn pipeline(dir: &std::path::Path) -> Pipeline {
        Pipeline::new(
            PipelineConfig::new().with_artifact_dir(dir).with_run_id("r1"),
            housing_schema(),
            ModelSearchConfig::new(0.5, 0.1).with_model(ModelSpec::new("lin", "linear_regression")),
        )
    }

    #[test]
    fn test_missing_input_fails_in_validation() {
        let dir = tempfile::tempdir().unwrap();
        let mut pipeline = pipeline(dir.path());
        let ctx = pipeline.context();
        let ingestion = DataIngestionArtifact::new(dir.path().join("no.csv"), dir.path().join("no2.csv"));

        let err = pipeline.run(&ingestion, &ctx).unwrap_err();
        assert_eq!(pipeline.state(), PipelineState::Failed);
        assert_eq!(err.stage(), Some(Stage::Validation));
        assert!(dir.path().join("r1").is_dir());
    }

    #[test]
    fn test_existing_run_dir_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("r1")).unwrap();
        let mut pipeline = pipeline(dir.path());
        let ctx = pipeline.context();
        let ingestion = DataIngestionArtifact::new("a.csv", "b.csv");

        let err = pipeline.run(&ingestion, &ctx).unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Setup));
        assert!(err.to_string().contains("create_run_dir"));
        assert!(matches!(
            err.root_cause(),
            HousingError::ConfigError(msg) if msg.contains("already exists")
        ));
        assert_eq!(pipeline.state(), PipelineState::Failed);
    }

    #[test]
    fn test_cancelled_before_first_stage() {
        let dir = tempfile::tempdir().unwrap();
        let mut pipeline = pipeline(dir.path());
        let ctx = pipeline.context();
        ctx.cancellation().cancel();

        let err = pipeline
            .run(&DataIngestionArtifact::new("a.csv", "b.csv"), &ctx)
            .unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Validation));
        assert!(err.to_string().contains("enter_data_validation"));
        assert!(matches!(err.root_cause(), HousingError::Cancelled));
    }

    #[test]
    fn test_second_run_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut pipeline = pipeline(dir.path());
        let ctx = pipeline.context();
        let ingestion = DataIngestionArtifact::new("a.csv", "b.csv");
        let _ = pipeline.run(&ingestion, &ctx);
        let err = pipeline.run(&ingestion, &ctx).unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Setup));
    }
}
