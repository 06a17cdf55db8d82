//! Error types for pipeline execution.

use thiserror::Error;

use tarmac_platform::{JobStatus, PlatformError};

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// A platform call failed; the stage that made it halts its branch.
    #[error(transparent)]
    Platform(#[from] PlatformError),

    /// A stage asked the context for a result no prior task recorded.
    #[error("no result recorded for task '{0}'")]
    MissingResult(String),

    /// A recorded result could not be decoded as the requested type.
    #[error("result for task '{task_id}' has the wrong shape: {source}")]
    ResultType {
        task_id: String,
        #[source]
        source: serde_json::Error,
    },

    /// A tuning method string outside the closed set.
    #[error("unknown tuning method '{0}' (expected p_tuning, lora, or sft)")]
    UnknownTuningMethod(String),

    /// The pipeline plan is internally inconsistent.
    #[error("invalid pipeline plan: {0}")]
    InvalidPlan(String),

    /// A submitted stage job reached a terminal state other than success.
    #[error("stage '{task_id}' ended with status {status}")]
    StageFailed { task_id: String, status: JobStatus },
}
