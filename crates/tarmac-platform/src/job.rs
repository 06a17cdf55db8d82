//! Job specifications and observed job state.

use serde::{Deserialize, Serialize};

use crate::error::{PlatformError, Result};

/// Binds a workspace into a job's filesystem.
///
/// Mounts are always read-write on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceMount {
    /// Platform-assigned workspace ID.
    pub workspace_id: String,
    /// Absolute path inside the container.
    pub mount_point: String,
}

impl WorkspaceMount {
    #[must_use]
    pub fn new(workspace_id: impl Into<String>, mount_point: impl Into<String>) -> Self {
        Self { workspace_id: workspace_id.into(), mount_point: mount_point.into() }
    }
}

/// A container port exposed by a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortMapping {
    pub container_port: u16,
    pub protocol: String,
}

/// A unit of work to submit to the platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSpec {
    pub name: String,
    /// Compute instance class (e.g. "dgxa100.80g.8.norm").
    pub ace_instance: String,
    /// ACE to run in; defaults to the client's configured ACE.
    #[serde(default)]
    pub ace_name: Option<String>,
    pub docker_image: String,
    #[serde(default = "default_replica_count")]
    pub replica_count: u32,
    #[serde(default)]
    pub workspace_mounts: Vec<WorkspaceMount>,
    pub command: String,
    #[serde(default)]
    pub ports: Option<Vec<PortMapping>>,
    /// Multi-node launcher type (e.g. "PYTORCH"). Only sent when
    /// `replica_count > 1`.
    #[serde(default)]
    pub array_type: Option<String>,
    /// Total runtime bound for multi-node jobs. Only sent when
    /// `replica_count > 1`.
    #[serde(default)]
    pub total_runtime: Option<String>,
}

fn default_replica_count() -> u32 {
    1
}

impl JobSpec {
    /// Creates a single-replica spec with no ports and no multi-node fields.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        ace_instance: impl Into<String>,
        docker_image: impl Into<String>,
        command: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            ace_instance: ace_instance.into(),
            ace_name: None,
            docker_image: docker_image.into(),
            replica_count: 1,
            workspace_mounts: Vec::new(),
            command: command.into(),
            ports: None,
            array_type: None,
            total_runtime: None,
        }
    }

    #[must_use]
    pub fn with_mount(mut self, mount: WorkspaceMount) -> Self {
        self.workspace_mounts.push(mount);
        self
    }

    #[must_use]
    pub fn with_replicas(mut self, replica_count: u32, array_type: impl Into<String>) -> Self {
        self.replica_count = replica_count;
        self.array_type = Some(array_type.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(PlatformError::InvalidSpec("name is required".to_string()));
        }
        if self.ace_instance.trim().is_empty() {
            return Err(PlatformError::InvalidSpec("ace_instance is required".to_string()));
        }
        if self.docker_image.trim().is_empty() {
            return Err(PlatformError::InvalidSpec("docker_image is required".to_string()));
        }
        if self.command.trim().is_empty() {
            return Err(PlatformError::InvalidSpec("command is required".to_string()));
        }
        if self.replica_count == 0 {
            return Err(PlatformError::InvalidSpec("replica_count must be >= 1".to_string()));
        }
        if self.replica_count > 1 && self.array_type.is_none() {
            return Err(PlatformError::InvalidSpec(
                "array_type is required when replica_count > 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether this spec spans more than one node.
    #[must_use]
    pub fn is_multinode(&self) -> bool {
        self.replica_count > 1
    }
}

/// Observed status of a platform job.
///
/// Transitions are owned entirely by the remote platform; this client only
/// observes them. Non-terminal states are opaque: only the terminal /
/// non-terminal distinction matters here, so states this client does not
/// enumerate land in `Unknown` rather than failing to parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobStatus {
    Created,
    Queued,
    Starting,
    Running,
    Preempted,
    FinishedSuccess,
    Failed,
    KilledByUser,
    Unknown(String),
}

impl JobStatus {
    /// True for exactly the three states that stop a wait loop.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::FinishedSuccess | Self::Failed | Self::KilledByUser)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Created => "CREATED",
            Self::Queued => "QUEUED",
            Self::Starting => "STARTING",
            Self::Running => "RUNNING",
            Self::Preempted => "PREEMPTED",
            Self::FinishedSuccess => "FINISHED_SUCCESS",
            Self::Failed => "FAILED",
            Self::KilledByUser => "KILLED_BY_USER",
            Self::Unknown(raw) => raw,
        }
    }
}

impl From<String> for JobStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "CREATED" => Self::Created,
            "QUEUED" => Self::Queued,
            "STARTING" => Self::Starting,
            "RUNNING" => Self::Running,
            "PREEMPTED" => Self::Preempted,
            "FINISHED_SUCCESS" => Self::FinishedSuccess,
            "FAILED" => Self::Failed,
            "KILLED_BY_USER" => Self::KilledByUser,
            _ => Self::Unknown(raw),
        }
    }
}

impl From<JobStatus> for String {
    fn from(status: JobStatus) -> Self {
        status.as_str().to_string()
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A submitted job, as returned by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    #[serde(default)]
    pub status: Option<JobStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_spec() -> JobSpec {
        JobSpec::new(
            "download_checkpoint",
            "dgxa100.80g.1.norm",
            "acme/trainer:24.01",
            "echo hello",
        )
    }

    #[test]
    fn test_validate_rejects_empty_command() {
        let mut spec = sample_spec();
        spec.command = String::new();
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_replicas() {
        let mut spec = sample_spec();
        spec.replica_count = 0;
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_validate_multinode_requires_array_type() {
        let mut spec = sample_spec();
        spec.replica_count = 8;
        assert!(spec.validate().is_err());
        let spec = sample_spec().with_replicas(8, "PYTORCH");
        assert!(spec.validate().is_ok());
        assert!(spec.is_multinode());
    }

    #[test]
    fn test_status_terminal_set() {
        assert!(JobStatus::FinishedSuccess.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(JobStatus::KilledByUser.is_terminal());
        assert!(!JobStatus::Created.is_terminal());
        assert!(!JobStatus::Queued.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
        assert!(!JobStatus::Unknown("RESIZING".to_string()).is_terminal());
    }

    #[test]
    fn test_status_parses_unlisted_state_as_unknown() {
        let status = JobStatus::from("IMAGE_PULLING".to_string());
        assert_eq!(status, JobStatus::Unknown("IMAGE_PULLING".to_string()));
        assert_eq!(status.as_str(), "IMAGE_PULLING");
    }

    #[test]
    fn test_status_serde_round_trip() {
        let status: JobStatus = serde_json::from_str(r#""FINISHED_SUCCESS""#).unwrap();
        assert_eq!(status, JobStatus::FinishedSuccess);
        assert_eq!(serde_json::to_string(&status).unwrap(), r#""FINISHED_SUCCESS""#);
    }
}
