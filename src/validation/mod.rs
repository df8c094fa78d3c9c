//! Record-level schema validation and the data validation stage

mod stage;

pub use stage::{DataValidation, ValidationReport};

use crate::config::Schema;
use serde::{Deserialize, Serialize};

/// A single scalar cell of a raw record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Missing,
}

impl Value {
    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric view, `None` for text and missing cells
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            Value::Bool(v) => Some(if *v { 1.0 } else { 0.0 }),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

/// Checks one feature record against the schema
///
/// A record holds the numerical features followed by the categorical ones, in
/// schema order. The answer is a single boolean; which check failed is not
/// reported.
#[derive(Debug, Clone, Default)]
pub struct SchemaValidator {
    allow_bool_as_numeric: bool,
}

impl SchemaValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Treat booleans as numbers in numerical slots
    pub fn with_bool_as_numeric(mut self, allow: bool) -> Self {
        self.allow_bool_as_numeric = allow;
        self
    }

    pub fn validate(&self, record: &[Value], schema: &Schema) -> bool {
        let mut valid = true;

        // 1. column count
        if record.len() != schema.expected_column_count() {
            valid = false;
        }

        let fields: Vec<(&str, &Value)> = schema.feature_columns().into_iter().zip(record).collect();

        // 2. domain values
        for (column, allowed) in &schema.domain_values {
            let in_domain = fields
                .iter()
                .find(|(name, _)| *name == column.as_str())
                .and_then(|(_, value)| value.as_str())
                .map_or(false, |v| allowed.iter().any(|a| a == v));
            if !in_domain {
                valid = false;
            }
        }

        // 3. runtime types
        for (name, value) in &fields {
            if schema.is_categorical(name) {
                if !matches!(value, Value::Text(_)) {
                    valid = false;
                }
            } else if schema.is_numerical(name) {
                let numeric = match value {
                    Value::Int(_) | Value::Float(_) => true,
                    Value::Bool(_) => self.allow_bool_as_numeric,
                    _ => false,
                };
                if !numeric {
                    valid = false;
                }
            }
        }

        tracing::trace!(valid, "Is the record valid?");
        valid
    }
}
