//! Data preprocessing module
//!
//! Provides the schema-driven feature transformer:
//! - Missing value imputation (median, most frequent)
//! - Standard scaling, with or without centering
//! - One-hot categorical encoding
//! - The data transformation stage that persists the fitted transformer

mod encoder;
mod imputer;
mod pipeline;
mod scaler;
mod stage;

pub use encoder::Encoder;
pub use imputer::{ImputeStrategy, Imputer};
pub use pipeline::{FeatureTransformer, PreprocessingBuilder};
pub use scaler::Scaler;
pub use stage::{DataTransformation, TRAIN_FILE_NAME, TEST_FILE_NAME};
