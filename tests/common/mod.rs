//! Shared fixtures for the integration tests
#![allow(dead_code)]

use housing_automl::config::Schema;
use std::path::{Path, PathBuf};

pub const SCHEMA_YAML: &str = r#"
columns:
  longitude: float
  latitude: float
  housing_median_age: int
  total_rooms: float
  total_bedrooms: float
  population: float
  households: float
  median_income: float
  median_house_value: float
  ocean_proximity: category
numerical_columns:
  - longitude
  - latitude
  - housing_median_age
  - total_rooms
  - total_bedrooms
  - population
  - households
  - median_income
categorical_columns:
  - ocean_proximity
target_column: median_house_value
domain_value:
  ocean_proximity:
    - "<1H OCEAN"
    - INLAND
    - ISLAND
    - NEAR BAY
    - NEAR OCEAN
"#;

pub const MODEL_YAML: &str = r#"
grid_search:
  cv: 3
  random_state: 11
  n_jobs: 2
base_accuracy: 0.6
acceptable_variance: 0.1
model_selection:
  - id: linear
    model: linear_regression
  - id: ridge
    model: ridge
    search_param_grid:
      alpha: [0.01, 1.0, 10.0]
  - id: forest
    model: random_forest
    params:
      n_estimators: 8
      max_depth: 6
    search_param_grid:
      min_samples_leaf: [1, 3]
"#;

pub const HEADER: &str = "longitude,latitude,housing_median_age,total_rooms,total_bedrooms,\
population,households,median_income,ocean_proximity,median_house_value";

pub const PROXIMITY: [&str; 5] = ["<1H OCEAN", "INLAND", "ISLAND", "NEAR BAY", "NEAR OCEAN"];

pub fn housing_schema() -> Schema {
    let schema: Schema = serde_yaml::from_str(SCHEMA_YAML).unwrap();
    schema.validate().unwrap();
    schema
}

/// One deterministic CSV row; the target is close to linear in the features
pub fn housing_row(i: usize) -> String {
    let longitude = -122.0 + (i % 10) as f64 * 0.1;
    let latitude = 37.0 + (i % 7) as f64 * 0.1;
    let age = 5 + i % 45;
    let rooms = 500.0 + ((i * 37) % 300) as f64;
    // every 13th row has no bedroom count
    let bedrooms = if i % 13 == 5 {
        String::new()
    } else {
        format!("{:.1}", rooms / 5.0 + (i % 4) as f64)
    };
    let population = 800.0 + ((i * 53) % 400) as f64;
    let households = population / 3.0 + (i % 5) as f64;
    let income = 1.0 + (i % 9) as f64 * 0.7;
    let category = i % PROXIMITY.len();
    let noise = ((i * 31) % 11) as f64 * 100.0;
    let value = 40_000.0 * income + 15_000.0 * category as f64 + 1_000.0 * age as f64 + noise;

    format!(
        "{:.2},{:.2},{},{:.1},{},{:.1},{:.3},{:.4},{},{:.1}",
        longitude, latitude, age, rooms, bedrooms, population, households, income,
        PROXIMITY[category], value
    )
}

/// Write rows `start..start + n` with a header
pub fn write_housing_csv(path: &Path, start: usize, n: usize) -> PathBuf {
    let mut body = String::from(HEADER);
    body.push('\n');
    for i in start..start + n {
        body.push_str(&housing_row(i));
        body.push('\n');
    }
    std::fs::write(path, body).unwrap();
    path.to_path_buf()
}

/// Train (120 rows) and test (40 rows) splits in `dir`
pub fn write_splits(dir: &Path) -> (PathBuf, PathBuf) {
    (
        write_housing_csv(&dir.join("train.csv"), 0, 120),
        write_housing_csv(&dir.join("test.csv"), 120, 40),
    )
}

pub fn write_text(path: &Path, text: &str) -> PathBuf {
    std::fs::write(path, text).unwrap();
    path.to_path_buf()
}
