//! HTTP error response shape
//!
//! The IntoResponse implementation for AppError lives in vitrine-api; the
//! orphan rule keeps it out of library crates that do not own either type.

use serde::{Deserialize, Serialize};

/// Standard error response format for HTTP APIs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    /// Error kind, e.g. `NotFound` or `Conflict`
    pub code: String,
    /// Whether retrying the same request may succeed
    pub recoverable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Suggested action for the client (e.g., "Retry after a short delay")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: impl Into<String>, recoverable: bool) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
            recoverable,
            details: None,
            suggested_action: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_suggested_action(mut self, action: Option<&str>) -> Self {
        self.suggested_action = action.map(String::from);
        self
    }
}
