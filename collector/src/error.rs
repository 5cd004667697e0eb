use serde::{
    Deserialize,
    Serialize,
};
use std::time::Duration;

/// Why a single collection did not produce metrics.
///
/// These are recorded inside the report and never abort a run.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CollectError {
    #[error("timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    #[error("{message}")]
    Execution { message: String },
    #[error("canceled before completion")]
    Canceled,
}

impl CollectError {
    pub fn timeout(after: Duration) -> Self {
        Self::Timeout {
            timeout_ms: after.as_millis() as u64,
        }
    }

    pub fn execution(message: impl ToString) -> Self {
        Self::Execution {
            message: message.to_string(),
        }
    }

    /// Only execution failures are worth another attempt; the other variants mean the time
    /// budget is gone.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Execution { .. })
    }
}

/// Failures that reject a run as a whole.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("invalid collection configuration: {0}")]
    Configuration(String),
    #[error("aggregation invariant violated: expected {expected} results, received {received} ({detail})")]
    AggregationInvariant {
        expected: usize,
        received: usize,
        detail: String,
    },
}

impl EngineError {
    pub fn configuration(message: impl ToString) -> Self {
        Self::Configuration(message.to_string())
    }
}
