//! Persistence of fitted objects
//!
//! Both the standalone transformer and the combined estimator are written as
//! JSON documents carrying a format tag and version.

mod bundle;
mod serializer;

pub use bundle::{CombinedEstimator, BUNDLE_FORMAT};
pub use serializer::{
    read_document, read_header, write_document, DocumentHeader, TransformerDocument,
    FORMAT_VERSION, TRANSFORMER_FORMAT,
};
