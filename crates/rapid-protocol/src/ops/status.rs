//! Status query types.
//!
//! Both `rawmodel/{id}` and `rapidmodel/{id}` answer with a `data` object
//! carrying a status field whose name depends on the resource.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::fields;

/// Status response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusEnvelope {
    pub data: Map<String, Value>,
}

impl StatusEnvelope {
    /// Value of the named status field, if present and a string.
    pub fn status(&self, field: &str) -> Option<&str> {
        self.data.get(field).and_then(Value::as_str)
    }

    /// Reported progress, clamped to 0..=100.
    ///
    /// Accepts integers and floats; floats are truncated.
    pub fn progress(&self) -> Option<u8> {
        let value = self.data.get(fields::PROGRESS)?;
        let raw = value
            .as_i64()
            .or_else(|| value.as_f64().map(|f| f as i64))?;
        Some(raw.clamp(0, 100) as u8)
    }

    /// Current processing step label. Empty strings count as absent.
    pub fn processing_step(&self) -> Option<&str> {
        self.data
            .get(fields::PROCESSING_STEP)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// The `data` object as a JSON value.
    pub fn into_data(self) -> Value {
        Value::Object(self.data)
    }
}
