//! Media (music / video) prediction types

use serde::Serialize;
use serde_json::Value;

/// Request to run a hosted media model
#[derive(Debug, Clone, Serialize)]
pub struct MediaRequest {
    /// Model version identifier
    pub version: String,
    /// Model-specific input object
    pub input: Value,
}

impl MediaRequest {
    /// Create a new request for the given model version
    #[must_use]
    pub fn new(version: impl Into<String>, input: Value) -> Self {
        Self {
            version: version.into(),
            input,
        }
    }
}
