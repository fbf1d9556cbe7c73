//! Console client error types.

use thiserror::Error;

/// Errors surfaced by the console client.
///
/// None of these are retried automatically; the poll loop retries the
/// status check, never the submission.
#[derive(Debug, Error)]
pub enum ConsoleError {
    /// Submission was rejected or could not be sent.
    #[error("{0}")]
    Submission(String),

    /// A status check failed; the job was moved to the error state.
    #[error("{0}")]
    Poll(String),

    /// The backend reported that the execution failed.
    #[error("{0}")]
    Terminal(String),

    /// The job never reached a terminal status within the poll budget.
    #[error("Execution did not finish after {attempts} status checks")]
    PollTimeout { attempts: u32 },

    /// Resource not known to the client or the backend.
    #[error("{0}")]
    NotFound(String),

    /// Caller input failed validation; no request was sent.
    #[error("{0}")]
    Validation(String),

    /// Any other endpoint answered with a non-success status.
    #[error("{0}")]
    Request(String),

    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] envy::Error),
}

impl ConsoleError {
    /// Returns true if the error represents a failed job rather than
    /// caller input or configuration.
    pub fn is_job_failure(&self) -> bool {
        matches!(
            self,
            ConsoleError::Submission(_)
                | ConsoleError::Poll(_)
                | ConsoleError::Terminal(_)
                | ConsoleError::PollTimeout { .. }
        )
    }
}

/// Result type alias using ConsoleError.
pub type ConsoleResult<T> = Result<T, ConsoleError>;
