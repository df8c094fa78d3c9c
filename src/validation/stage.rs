//! Data validation stage

use super::SchemaValidator;
use crate::artifact::{DataIngestionArtifact, DataValidationArtifact};
use crate::config::{RunLayout, Schema};
use crate::context::RunContext;
use crate::error::{HousingError, Result, Stage, StageResultExt};
use crate::utils::{self, Timer};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Summary written to the report file of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub train_rows: usize,
    pub test_rows: usize,
    pub invalid_test_rows: usize,
    pub first_invalid_row: Option<usize>,
}

/// Checks the ingested train/test files against the schema
pub struct DataValidation<'a> {
    ingestion: &'a DataIngestionArtifact,
    schema: &'a Schema,
    schema_file_path: PathBuf,
    report_file_path: PathBuf,
    report_page_file_path: PathBuf,
    validator: SchemaValidator,
}

impl<'a> DataValidation<'a> {
    pub fn new(
        ingestion: &'a DataIngestionArtifact,
        schema: &'a Schema,
        schema_file_path: impl Into<PathBuf>,
        layout: &RunLayout,
    ) -> Self {
        Self {
            ingestion,
            schema,
            schema_file_path: schema_file_path.into(),
            report_file_path: layout.report_file_path.clone(),
            report_page_file_path: layout.report_page_file_path.clone(),
            validator: SchemaValidator::new(),
        }
    }

    pub fn with_validator(mut self, validator: SchemaValidator) -> Self {
        self.validator = validator;
        self
    }

    pub fn initiate(&self, ctx: &RunContext) -> Result<DataValidationArtifact> {
        let _enter = ctx.span().enter();
        let timer = Timer::start();
        tracing::info!("Data validation started");

        self.run()
            .in_stage(Stage::Validation, "initiate_data_validation")
            .map(|report| {
                tracing::info!(
                    train_rows = report.train_rows,
                    test_rows = report.test_rows,
                    elapsed_ms = timer.elapsed_ms() as u64,
                    "Data validation completed"
                );
                DataValidationArtifact::new(
                    true,
                    &self.schema_file_path,
                    &self.report_file_path,
                    &self.report_page_file_path,
                    format!(
                        "{} train and {} test rows match the schema",
                        report.train_rows, report.test_rows
                    ),
                )
            })
    }

    fn run(&self) -> Result<ValidationReport> {
        let train_path = self.ingestion.train_file_path();
        let test_path = self.ingestion.test_file_path();
        check_files_exist(train_path, test_path)?;

        let train_df = utils::load_uncast(train_path, self.schema)?;
        let test_df = utils::load_uncast(test_path, self.schema)?;

        // records come from the uncast frame so unparsable cells stay text
        let records = utils::schema_records(&test_df, self.schema)?;
        let invalid: Vec<usize> = records
            .iter()
            .enumerate()
            .filter(|(_, record)| !self.validator.validate(record, self.schema))
            .map(|(row, _)| row)
            .collect();

        let report = ValidationReport {
            train_rows: train_df.height(),
            test_rows: test_df.height(),
            invalid_test_rows: invalid.len(),
            first_invalid_row: invalid.first().copied(),
        };
        self.write_report(&report)?;

        if let Some(first) = report.first_invalid_row {
            return Err(HousingError::ValidationError(format!(
                "{} of {} test records do not match the schema (first invalid row: {})",
                report.invalid_test_rows, report.test_rows, first
            )));
        }

        utils::coerce_to_schema(&train_df, self.schema)?;
        utils::coerce_to_schema(&test_df, self.schema)?;
        Ok(report)
    }

    fn write_report(&self, report: &ValidationReport) -> Result<()> {
        if let Some(parent) = self.report_file_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.report_file_path, serde_json::to_vec_pretty(report)?)?;
        Ok(())
    }
}

fn check_files_exist(train: &Path, test: &Path) -> Result<()> {
    let missing: Vec<String> = [train, test]
        .iter()
        .filter(|p| !p.is_file())
        .map(|p| p.display().to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(HousingError::DataError(format!(
            "ingested files not found: {}",
            missing.join(", ")
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::fixtures::housing_schema;
    use crate::config::PipelineConfig;

    const HEADER: &str = "longitude,latitude,housing_median_age,total_rooms,total_bedrooms,\
population,households,median_income,ocean_proximity,median_house_value";

    fn write(dir: &Path, name: &str, rows: &[&str]) -> PathBuf {
        let path = dir.join(name);
        let body = std::iter::once(HEADER)
            .chain(rows.iter().copied())
            .collect::<Vec<_>>()
            .join("\n");
        std::fs::write(&path, body + "\n").unwrap();
        path
    }

    #[test]
    fn test_valid_files_pass() {
        let dir = tempfile::tempdir().unwrap();
        let row = "-122.23,37.88,41,880,129,322,126,8.3252,NEAR BAY,452600";
        let train = write(dir.path(), "train.csv", &[row, row]);
        let test = write(dir.path(), "test.csv", &[row]);

        let ingestion = DataIngestionArtifact::new(train, test);
        let schema = housing_schema();
        let layout = PipelineConfig::new()
            .with_artifact_dir(dir.path())
            .layout("r1");

        let artifact = DataValidation::new(&ingestion, &schema, "schema.yaml", &layout)
            .initiate(&RunContext::with_run_id("r1"))
            .unwrap();

        assert!(artifact.is_validated());
        assert!(layout.report_file_path.is_file());
    }

    #[test]
    fn test_invalid_row_fails_with_stage() {
        let dir = tempfile::tempdir().unwrap();
        let good = "-122.23,37.88,41,880,129,322,126,8.3252,NEAR BAY,452600";
        let bad = "-122.23,37.88,41,880,129,322,126,8.3252,MOON BASE,452600";
        let train = write(dir.path(), "train.csv", &[good]);
        let test = write(dir.path(), "test.csv", &[good, bad]);

        let ingestion = DataIngestionArtifact::new(train, test);
        let schema = housing_schema();
        let layout = PipelineConfig::new()
            .with_artifact_dir(dir.path())
            .layout("r1");

        let err = DataValidation::new(&ingestion, &schema, "schema.yaml", &layout)
            .initiate(&RunContext::with_run_id("r1"))
            .unwrap_err();

        assert_eq!(err.stage(), Some(Stage::Validation));
        match err.root_cause() {
            HousingError::ValidationError(msg) => assert!(msg.contains("first invalid row: 1")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_text_in_numeric_column_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let good = "-122.23,37.88,41,880,129,322,126,8.3252,NEAR BAY,452600";
        let bad = "-122.23,37.88,41,lots,129,322,126,8.3252,NEAR BAY,452600";
        let train = write(dir.path(), "train.csv", &[good]);
        let test = write(dir.path(), "test.csv", &[good, bad]);

        let ingestion = DataIngestionArtifact::new(train, test);
        let schema = housing_schema();
        let layout = PipelineConfig::new()
            .with_artifact_dir(dir.path())
            .layout("r1");

        let err = DataValidation::new(&ingestion, &schema, "schema.yaml", &layout)
            .initiate(&RunContext::with_run_id("r1"))
            .unwrap_err();
        assert!(matches!(err.root_cause(), HousingError::ValidationError(_)));
    }

    #[test]
    fn test_missing_files_are_named() {
        let err = check_files_exist(Path::new("/nope/train.csv"), Path::new("/nope/test.csv"))
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("train.csv") && msg.contains("test.csv"));
    }
}
