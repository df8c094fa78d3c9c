//! Combined preprocessing + model bundle used at inference time

use super::serializer::{read_document, read_header, write_document, DocumentHeader};
use crate::error::{HousingError, Result};
use crate::preprocessing::FeatureTransformer;
use crate::training::{Regressor, TrainedModel};
use crate::validation::Value;
use ndarray::Array1;
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const BUNDLE_FORMAT: &str = "housing-automl/estimator";

/// Fitted transformer and fitted model, persisted and loaded together
///
/// `predict` always runs raw input through the transformer first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombinedEstimator {
    #[serde(flatten)]
    header: DocumentHeader,
    model_identifier: String,
    transformer: FeatureTransformer,
    model: TrainedModel,
}

impl CombinedEstimator {
    /// Pair a fitted transformer with a model trained on its output
    pub fn new(
        transformer: FeatureTransformer,
        model_identifier: impl Into<String>,
        model: TrainedModel,
        run_id: &str,
    ) -> Result<Self> {
        if !transformer.is_fitted() {
            return Err(HousingError::ModelNotFitted);
        }
        Ok(Self {
            header: DocumentHeader::new(BUNDLE_FORMAT, run_id),
            model_identifier: model_identifier.into(),
            transformer,
            model,
        })
    }

    pub fn header(&self) -> &DocumentHeader {
        &self.header
    }

    pub fn model_identifier(&self) -> &str {
        &self.model_identifier
    }

    pub fn transformer(&self) -> &FeatureTransformer {
        &self.transformer
    }

    pub fn model(&self) -> &TrainedModel {
        &self.model
    }

    /// Predict from a raw feature frame; extra columns are ignored
    pub fn predict(&self, df: &DataFrame) -> Result<Array1<f64>> {
        let x = self.transformer.transform(df)?;
        self.model.predict(&x)
    }

    /// Predict one raw record laid out as numerical then categorical features
    pub fn predict_record(&self, record: &[Value]) -> Result<f64> {
        let x = self.transformer.transform_records(&[record.to_vec()])?;
        let y = self.model.predict(&x)?;
        y.first().copied().ok_or_else(|| {
            HousingError::ComputationError("model returned no prediction".to_string())
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        write_document(self, path)?;
        tracing::info!(
            path = %path.display(),
            model = %self.model_identifier,
            "Saved combined estimator"
        );
        Ok(())
    }

    /// Load a bundle; any other format or version is `IncompatibleBundle`
    pub fn load(path: &Path) -> Result<Self> {
        read_document(path, BUNDLE_FORMAT)
    }

    /// Header of a bundle file without decoding the model
    pub fn peek(path: &Path) -> Result<DocumentHeader> {
        read_header(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Params;
    use crate::training::registry;
    use polars::prelude::*;

    fn bundle() -> (CombinedEstimator, DataFrame) {
        let train = df!(
            "rooms" => &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
            "kind" => &["a", "b", "a", "b", "a", "b"]
        )
        .unwrap();
        let y = ndarray::array![10.0, 25.0, 30.0, 45.0, 50.0, 65.0];

        let mut transformer = FeatureTransformer::new(vec!["rooms".into()], vec!["kind".into()]);
        let x = transformer.fit_transform(&train).unwrap();
        let mut model = registry::build("linear_regression", &Params::new()).unwrap();
        model.fit(&x, &y).unwrap();

        let estimator = CombinedEstimator::new(transformer, "lin", model, "r1").unwrap();
        (estimator, train)
    }

    #[test]
    fn test_predict_matches_manual_pipeline() {
        let (estimator, train) = bundle();
        let manual = estimator
            .model()
            .predict(&estimator.transformer().transform(&train).unwrap())
            .unwrap();
        assert_eq!(estimator.predict(&train).unwrap(), manual);

        let single = estimator
            .predict_record(&[Value::Float(3.0), Value::text("a")])
            .unwrap();
        assert!((single - manual[2]).abs() < 1e-12);
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        let (estimator, train) = bundle();
        estimator.save(&path).unwrap();

        let loaded = CombinedEstimator::load(&path).unwrap();
        assert_eq!(loaded.model_identifier(), "lin");
        assert_eq!(loaded.header().run_id, "r1");
        assert_eq!(loaded.predict(&train).unwrap(), estimator.predict(&train).unwrap());
        assert_eq!(CombinedEstimator::peek(&path).unwrap().format, BUNDLE_FORMAT);
    }

    #[test]
    fn test_transformer_document_is_not_a_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preprocessed.json");
        let (estimator, _) = bundle();
        crate::export::TransformerDocument::new(estimator.transformer().clone(), "r1")
            .save(&path)
            .unwrap();

        let err = CombinedEstimator::load(&path).unwrap_err();
        assert!(matches!(err, HousingError::IncompatibleBundle { .. }));
    }

    #[test]
    fn test_unfitted_transformer_rejected() {
        let model = registry::build("linear_regression", &Params::new()).unwrap();
        let transformer = FeatureTransformer::new(vec!["rooms".into()], vec![]);
        assert!(matches!(
            CombinedEstimator::new(transformer, "lin", model, "r1"),
            Err(HousingError::ModelNotFitted)
        ));
    }
}
