use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::payload;

/// One configured endpoint to load-test
///
/// Immutable for the duration of a run. Block-indexed runs derive a rewritten copy
/// through [`EndpointDefinition::for_block`] and never touch the original.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct EndpointDefinition {
    /// Path appended to the base URL, e.g. `/block`
    pub path: String,
    /// HTTP method, case-insensitive
    pub method: String,
    /// JSON body sent with every request
    #[serde(default)]
    pub payload: Option<Value>,
    /// Whether the payload carries `block_identifier.index` fields to sweep
    #[serde(default)]
    pub uses_block_index: bool,
}

impl EndpointDefinition {
    pub fn new(path: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method: method.into(),
            payload: None,
            uses_block_index: false,
        }
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn block_indexed(mut self) -> Self {
        self.uses_block_index = true;
        self
    }

    /// Parse the configured method into an HTTP method token
    pub fn http_method(&self) -> Option<Method> {
        Method::from_bytes(self.method.trim().to_ascii_uppercase().as_bytes()).ok()
    }

    /// Copy of this endpoint whose payload targets `block_index`
    pub fn for_block(&self, block_index: i64) -> Self {
        Self {
            payload: self
                .payload
                .as_ref()
                .map(|p| payload::with_block_index(p, block_index)),
            ..self.clone()
        }
    }
}
