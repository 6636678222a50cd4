//! Error types for the TaskForge domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all TaskForge operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Gateway errors ---
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    // --- Memory errors ---
    #[error("Memory error: {0}")]
    Memory(#[from] MemoryError),

    // --- Report errors ---
    #[error("Report error: {0}")]
    Report(#[from] ReportError),

    // --- Caller input errors ---
    #[error("Missing input: {0}")]
    MissingInput(String),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Errors from the model invocation gateway.
///
/// Exhausting the retry budget surfaces here as a value the orchestrator can
/// report as a failed run — the gateway never terminates the process.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("Delivery failed after {attempts} attempts (last status: {last_status:?})")]
    RetriesExhausted {
        attempts: u32,
        last_status: Option<u16>,
    },

    #[error("Reply missing response content: {0}")]
    MalformedReply(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Gateway not configured: {0}")]
    NotConfigured(String),
}

#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to write report to {path}: {reason}")]
    WriteFailed { path: String, reason: String },

    #[error("Synthesis produced no content")]
    EmptySynthesis,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_error_displays_correctly() {
        let err = Error::Gateway(GatewayError::RetriesExhausted {
            attempts: 5,
            last_status: Some(502),
        });
        assert!(err.to_string().contains("5 attempts"));
        assert!(err.to_string().contains("502"));
    }

    #[test]
    fn memory_error_displays_correctly() {
        let err = Error::Memory(MemoryError::InvalidState(
            "another task is already active".into(),
        ));
        assert!(err.to_string().contains("already active"));
    }

    #[test]
    fn report_error_displays_correctly() {
        let err = Error::Report(ReportError::WriteFailed {
            path: "reports/report_abc.md".into(),
            reason: "permission denied".into(),
        });
        assert!(err.to_string().contains("reports/report_abc.md"));
        assert!(err.to_string().contains("permission denied"));
    }
}
