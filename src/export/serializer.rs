//! Versioned JSON documents
//!
//! Every persisted object is wrapped in an envelope whose `format` and
//! `version` are checked before the payload is deserialized.

use crate::error::{HousingError, Result};
use crate::preprocessing::FeatureTransformer;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Current envelope version
pub const FORMAT_VERSION: u32 = 1;

pub const TRANSFORMER_FORMAT: &str = "housing-automl/transformer";

/// Envelope fields read ahead of the payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentHeader {
    pub format: String,
    pub version: u32,
    /// RFC 3339 timestamp
    pub created_at: String,
    pub run_id: String,
}

impl DocumentHeader {
    pub fn new(format: &str, run_id: &str) -> Self {
        Self {
            format: format.to_string(),
            version: FORMAT_VERSION,
            created_at: Utc::now().to_rfc3339(),
            run_id: run_id.to_string(),
        }
    }

    fn check(&self, expected_format: &str) -> Result<()> {
        if self.format != expected_format || self.version != FORMAT_VERSION {
            return Err(HousingError::IncompatibleBundle {
                found: format!("{} v{}", self.format, self.version),
                expected: format!("{} v{}", expected_format, FORMAT_VERSION),
            });
        }
        Ok(())
    }
}

/// Serialize a document as pretty JSON, creating parent directories
pub fn write_document<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, value).map_err(|e| {
        HousingError::SerializationError(format!("cannot write {}: {}", path.display(), e))
    })?;
    writer.flush()?;
    Ok(())
}

/// Read the header of a document without decoding its payload
pub fn read_header(path: &Path) -> Result<DocumentHeader> {
    let text = read_text(path)?;
    serde_json::from_str(&text).map_err(|e| {
        HousingError::SerializationError(format!("{} has no document header: {}", path.display(), e))
    })
}

/// Read a document after checking its format tag and version
pub fn read_document<T: DeserializeOwned>(path: &Path, expected_format: &str) -> Result<T> {
    let text = read_text(path)?;
    let header: DocumentHeader = serde_json::from_str(&text).map_err(|e| {
        HousingError::SerializationError(format!("{} has no document header: {}", path.display(), e))
    })?;
    header.check(expected_format)?;

    serde_json::from_str(&text).map_err(|e| {
        HousingError::SerializationError(format!("cannot read {}: {}", path.display(), e))
    })
}

fn read_text(path: &Path) -> Result<String> {
    let file = File::open(path).map_err(|e| {
        HousingError::SerializationError(format!("cannot open {}: {}", path.display(), e))
    })?;
    let mut text = String::new();
    BufReader::new(file).read_to_string(&mut text)?;
    Ok(text)
}

/// Persisted fitted feature transformer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformerDocument {
    #[serde(flatten)]
    header: DocumentHeader,
    transformer: FeatureTransformer,
}

impl TransformerDocument {
    pub fn new(transformer: FeatureTransformer, run_id: &str) -> Self {
        Self {
            header: DocumentHeader::new(TRANSFORMER_FORMAT, run_id),
            transformer,
        }
    }

    pub fn header(&self) -> &DocumentHeader {
        &self.header
    }

    pub fn transformer(&self) -> &FeatureTransformer {
        &self.transformer
    }

    pub fn into_transformer(self) -> FeatureTransformer {
        self.transformer
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if !self.transformer.is_fitted() {
            return Err(HousingError::ModelNotFitted);
        }
        write_document(self, path)?;
        tracing::debug!(path = %path.display(), "Saved preprocessing object");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        read_document(path, TRANSFORMER_FORMAT)
    }
}
