pub mod http;
pub mod mock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::consts::{ERROR_PREFIX, REQUEST_FAILED, UNKNOWN_ERROR};
use crate::form::FormData;

/// What the summarizer answers with. Either field may be missing; unknown
/// keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SummaryResult {
    pub fn with_summary(summary: &str) -> Self {
        Self {
            summary: Some(summary.to_string()),
            error: None,
        }
    }

    pub fn with_error(error: &str) -> Self {
        Self {
            summary: None,
            error: Some(error.to_string()),
        }
    }

    /// The text this result puts in the display. A summary wins verbatim;
    /// otherwise the error (or a fallback) is shown behind the error prefix.
    /// Empty strings count as missing.
    pub fn render(&self) -> String {
        if let Some(summary) = non_empty(&self.summary) {
            return summary.to_string();
        }
        let reason = non_empty(&self.error).unwrap_or(UNKNOWN_ERROR);
        format!("{ERROR_PREFIX}{reason}")
    }
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}

/// Why a submission produced no result at all.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EndpointError {
    /// The request never completed: connection refused, reset, body cut short.
    #[error("transport failure: {0}")]
    Transport(String),
    /// A response arrived but its body is not a summary result.
    #[error("undecodable response: {0}")]
    Decode(String),
}

impl EndpointError {
    /// Failures all render the same generic message; the detail goes to
    /// the log.
    pub fn render(&self) -> String {
        format!("{ERROR_PREFIX}{REQUEST_FAILED}")
    }
}

/// The remote summarizer. Could be HTTP or a test script.
#[async_trait]
pub trait Endpoint: Send + Sync {
    async fn submit(&self, payload: FormData) -> Result<SummaryResult, EndpointError>;
}

/// Decode a response body the way every endpoint should.
pub fn decode(body: &[u8]) -> Result<SummaryResult, EndpointError> {
    serde_json::from_slice(body).map_err(|e| EndpointError::Decode(e.to_string()))
}
