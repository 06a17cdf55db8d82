//! Error types for the platform client.

use thiserror::Error;

/// Result type alias for platform operations.
pub type Result<T> = std::result::Result<T, PlatformError>;

/// Error type for all Job Platform API operations.
///
/// One variant per failure class, each carrying the HTTP status and the URL
/// that produced it. None of these are retried locally; the caller decides.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// Non-200 from the token endpoint.
    #[error("authentication failed with HTTP {status} from {url}")]
    Auth { status: u16, url: String },

    /// Non-200 from a workspace endpoint (other than 404 on lookup,
    /// which is a valid not-found result).
    #[error("workspace request failed with HTTP {status} from {url}")]
    Workspace { status: u16, url: String },

    /// Non-200 from job creation.
    #[error("job submission failed with HTTP {status} from {url}")]
    JobSubmission { status: u16, url: String },

    /// Non-200 from a job status lookup. Aborts an in-progress wait.
    #[error("job status query failed with HTTP {status} from {url}")]
    StatusQuery { status: u16, url: String },

    /// Non-200 from the workspace file listing endpoint.
    #[error("file listing failed with HTTP {status} from {url}")]
    FileListing { status: u16, url: String },

    /// The endpoint answered 200 but the body did not match the expected
    /// shape for that endpoint.
    #[error("malformed response from {url}: {detail}")]
    MalformedResponse { url: String, detail: String },

    /// A bounded wait exhausted its attempt budget before the job reached
    /// a terminal state.
    #[error("job {job_id} did not reach a terminal state after {attempts} status queries")]
    PollTimeout { job_id: String, attempts: u64 },

    /// A job spec failed validation before submission.
    #[error("invalid job spec: {0}")]
    InvalidSpec(String),

    /// Configuration errors.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O errors (configuration file access).
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Transport-level failure before any HTTP status was received.
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl PlatformError {
    /// Builds a [`PlatformError::MalformedResponse`] for a body that could
    /// not be decoded into the endpoint's expected shape.
    pub(crate) fn malformed(url: String, detail: impl std::fmt::Display) -> Self {
        Self::MalformedResponse { url, detail: detail.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_error_display_carries_status_and_url() {
        let err = PlatformError::Auth { status: 401, url: "https://auth.example/token".to_string() };
        let msg = format!("{}", err);
        assert!(msg.contains("401"));
        assert!(msg.contains("https://auth.example/token"));
    }

    #[test]
    fn test_poll_timeout_display() {
        let err = PlatformError::PollTimeout { job_id: "job-7".to_string(), attempts: 40 };
        let msg = format!("{}", err);
        assert!(msg.contains("job-7"));
        assert!(msg.contains("40"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing config");
        let err: PlatformError = io_err.into();
        match err {
            PlatformError::Io(_) => {}
            _ => panic!("Expected Io error variant"),
        }
    }
}
