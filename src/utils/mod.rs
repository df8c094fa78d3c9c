//! Utility functions and types

mod parallel;
pub mod data_loader;

pub use data_loader::{
    check_columns, coerce_to_schema, column_names, column_values, matrix_to_frame, numeric_column,
    records, schema_records, split_features_target, text_column, to_matrix, DataLoader, DataSaver,
};
pub use parallel::{try_parallel_map, ParallelConfig};

use crate::config::Schema;
use crate::error::Result;
use polars::prelude::DataFrame;
use std::path::Path;
use std::time::{Duration, Instant};

/// Read a CSV file with a header row
pub fn load_csv(path: &Path) -> Result<DataFrame> {
    DataLoader::new().load_csv(path)
}

/// Read a CSV file, reject undeclared columns and cast to the schema dtypes
pub fn load_data(path: &Path, schema: &Schema) -> Result<DataFrame> {
    DataLoader::new().load_with_schema(path, schema)
}

/// Read a CSV file and reject undeclared columns, without casting
pub fn load_uncast(path: &Path, schema: &Schema) -> Result<DataFrame> {
    DataLoader::new().load_uncast(path, schema)
}

/// Write a CSV file with a header row
pub fn save_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    DataSaver::save_csv(df, path)
}

/// Wall-clock timer for stage logging
#[derive(Debug, Clone, Copy)]
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn elapsed_ms(&self) -> u128 {
        self.elapsed().as_millis()
    }
}
