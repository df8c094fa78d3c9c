//! Data transformation stage

use super::PreprocessingBuilder;
use crate::artifact::{DataIngestionArtifact, DataTransformationArtifact, DataValidationArtifact};
use crate::config::{RunLayout, Schema};
use crate::context::RunContext;
use crate::error::{HousingError, Result, Stage, StageResultExt};
use crate::export::TransformerDocument;
use crate::utils::{self, Timer};
use polars::prelude::*;
use std::path::PathBuf;

pub const TRAIN_FILE_NAME: &str = "train.csv";
pub const TEST_FILE_NAME: &str = "test.csv";

/// Fits the feature transformer on the training split and writes both
/// transformed splits
pub struct DataTransformation<'a> {
    ingestion: &'a DataIngestionArtifact,
    validation: &'a DataValidationArtifact,
    schema: &'a Schema,
    transformed_train_file_path: PathBuf,
    transformed_test_file_path: PathBuf,
    preprocessed_object_file_path: PathBuf,
}

impl<'a> DataTransformation<'a> {
    pub fn new(
        ingestion: &'a DataIngestionArtifact,
        validation: &'a DataValidationArtifact,
        schema: &'a Schema,
        layout: &RunLayout,
    ) -> Self {
        Self {
            ingestion,
            validation,
            schema,
            transformed_train_file_path: layout.transformed_train_dir.join(TRAIN_FILE_NAME),
            transformed_test_file_path: layout.transformed_test_dir.join(TEST_FILE_NAME),
            preprocessed_object_file_path: layout.preprocessed_object_file_path.clone(),
        }
    }

    pub fn initiate(&self, ctx: &RunContext) -> Result<DataTransformationArtifact> {
        let _enter = ctx.span().enter();
        let timer = Timer::start();
        tracing::info!("Data transformation started");

        self.run(ctx)
            .in_stage(Stage::Transformation, "initiate_data_transformation")?;

        tracing::info!(
            elapsed_ms = timer.elapsed_ms() as u64,
            "Data transformation completed"
        );
        Ok(DataTransformationArtifact::new(
            true,
            &self.transformed_train_file_path,
            &self.transformed_test_file_path,
            &self.preprocessed_object_file_path,
            "train and test features transformed",
        ))
    }

    fn run(&self, ctx: &RunContext) -> Result<()> {
        if !self.validation.is_validated() {
            return Err(HousingError::ValidationError(format!(
                "data is not validated: {}",
                self.validation.message()
            )));
        }

        let train_df = utils::load_data(self.ingestion.train_file_path(), self.schema)?;
        let test_df = utils::load_data(self.ingestion.test_file_path(), self.schema)?;

        let target = self.schema.target_column.as_str();
        let y_train = target_vector(&train_df, target)?;
        let y_test = target_vector(&test_df, target)?;

        let mut transformer = PreprocessingBuilder::build(self.schema);
        let x_train = transformer.fit_transform(&train_df)?;
        let x_test = transformer.transform(&test_df)?;
        tracing::info!(
            train_rows = x_train.nrows(),
            test_rows = x_test.nrows(),
            features = transformer.feature_names().len(),
            "Applied preprocessing object on training and testing data"
        );

        let names = transformer.feature_names().to_vec();
        let mut train_out = utils::matrix_to_frame(&x_train, &names, Some((target, &y_train)))?;
        let mut test_out = utils::matrix_to_frame(&x_test, &names, Some((target, &y_test)))?;
        utils::save_csv(&mut train_out, &self.transformed_train_file_path)?;
        utils::save_csv(&mut test_out, &self.transformed_test_file_path)?;

        TransformerDocument::new(transformer, ctx.run_id())
            .save(&self.preprocessed_object_file_path)?;
        Ok(())
    }
}

/// Target values; a missing target is an error
fn target_vector(df: &DataFrame, target: &str) -> Result<ndarray::Array1<f64>> {
    let values = utils::numeric_column(df, target)?;
    values
        .into_iter()
        .enumerate()
        .map(|(row, v)| {
            v.ok_or_else(|| {
                HousingError::DataError(format!("missing target '{}' at row {}", target, row))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::fixtures::housing_schema;
    use crate::config::PipelineConfig;

    #[test]
    fn test_rejects_unvalidated_input() {
        let dir = tempfile::tempdir().unwrap();
        let ingestion = DataIngestionArtifact::new(dir.path().join("a"), dir.path().join("b"));
        let validation = DataValidationArtifact::new(false, "s", "r", "p", "failed");
        let schema = housing_schema();
        let layout = PipelineConfig::new()
            .with_artifact_dir(dir.path())
            .layout("r1");

        let err = DataTransformation::new(&ingestion, &validation, &schema, &layout)
            .initiate(&RunContext::with_run_id("r1"))
            .unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Transformation));
        assert!(matches!(err.root_cause(), HousingError::ValidationError(_)));
    }

    #[test]
    fn test_missing_target_rejected() {
        let df = df!("y" => &[Some(1.0), None]).unwrap();
        assert!(target_vector(&df, "y").is_err());
    }
}
