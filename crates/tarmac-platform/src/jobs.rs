//! Job submission and status queries.

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::client::PlatformClient;
use crate::error::{PlatformError, Result};
use crate::job::{Job, JobSpec, JobStatus, PortMapping};

impl PlatformClient {
    /// Submits a job to the platform.
    ///
    /// Uses the team-scoped endpoint (and a team-scoped token) when a team
    /// is configured, the org-scoped endpoint otherwise. Every referenced
    /// workspace must already exist.
    pub async fn submit_job(&self, spec: &JobSpec) -> Result<Job> {
        spec.validate()?;

        let team = self.config.team.as_deref();
        let token = self.fetch_token_scoped(team).await?;
        let url = match team {
            Some(team) => format!(
                "{}/v2/org/{}/team/{}/jobs/",
                self.config.api_url, self.config.org, team
            ),
            None => format!("{}/v2/org/{}/jobs/", self.config.api_url, self.config.org),
        };

        let body = JobRequest::from_spec(spec, self.config.ace.as_str());
        debug!(name = %spec.name, replicas = spec.replica_count, url = %url, "submitting job");

        let response = self
            .http
            .post(&url)
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .header(CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            error!(status = %status, url = %url, name = %spec.name, "job submission rejected");
            return Err(PlatformError::JobSubmission { status: status.as_u16(), url });
        }

        let body: JobEnvelope = response
            .json()
            .await
            .map_err(|e| PlatformError::malformed(url, e))?;
        let job = body.into_job();
        info!(job_id = %job.id, name = %spec.name, "job submitted");
        Ok(job)
    }

    /// Queries the current status of a job.
    ///
    /// Fetches a fresh token on every call so that repeated polling of a
    /// long-running job never hits token expiry.
    pub async fn job_status(&self, job_id: &str) -> Result<JobStatus> {
        let token = self.fetch_token().await?;
        let url = format!("{}/v2/org/{}/jobs/{}", self.config.api_url, self.config.org, job_id);

        let response = self
            .http
            .get(&url)
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            error!(status = %status, url = %url, job_id, "status query failed");
            return Err(PlatformError::StatusQuery { status: status.as_u16(), url });
        }

        let body: JobEnvelope = match response.json().await {
            Ok(body) => body,
            Err(e) => return Err(PlatformError::malformed(url, e)),
        };
        match body.job.job_status {
            Some(wire) => Ok(wire.status),
            None => Err(PlatformError::malformed(url, "missing job.jobStatus")),
        }
    }
}

// Wire types. Label/secret collections and the run policy are fixed: jobs
// run once with normal priority and never restart on preemption.

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct JobRequest<'a> {
    name: &'a str,
    ace_instance: &'a str,
    ace_name: &'a str,
    docker_image_name: &'a str,
    job_order: u32,
    job_priority: &'a str,
    replica_count: u32,
    reserved_labels: Vec<String>,
    result_container_mount_point: &'a str,
    run_policy: RunPolicy<'a>,
    system_labels: Vec<String>,
    user_labels: Vec<String>,
    user_secrets_spec: Vec<String>,
    workspace_mounts: Vec<WireMount<'a>>,
    command: &'a str,
    port_mappings: Option<&'a [PortMapping]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    array_type: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    total_runtime: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RunPolicy<'a> {
    preempt_class: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireMount<'a> {
    container_mount_point: &'a str,
    id: &'a str,
    mount_mode: &'a str,
}

impl<'a> JobRequest<'a> {
    fn from_spec(spec: &'a JobSpec, default_ace: &'a str) -> Self {
        let workspace_mounts = spec
            .workspace_mounts
            .iter()
            .map(|mount| WireMount {
                container_mount_point: &mount.mount_point,
                id: &mount.workspace_id,
                mount_mode: "RW",
            })
            .collect();

        // Multi-node fields only go on the wire for multi-replica jobs.
        let (array_type, total_runtime) = if spec.is_multinode() {
            (spec.array_type.as_deref(), spec.total_runtime.as_deref())
        } else {
            (None, None)
        };

        Self {
            name: &spec.name,
            ace_instance: &spec.ace_instance,
            ace_name: spec.ace_name.as_deref().unwrap_or(default_ace),
            docker_image_name: &spec.docker_image,
            job_order: 50,
            job_priority: "NORMAL",
            replica_count: spec.replica_count,
            reserved_labels: Vec::new(),
            result_container_mount_point: "/results",
            run_policy: RunPolicy { preempt_class: "RUNONCE" },
            system_labels: Vec::new(),
            user_labels: Vec::new(),
            user_secrets_spec: Vec::new(),
            workspace_mounts,
            command: &spec.command,
            port_mappings: spec.ports.as_deref(),
            array_type,
            total_runtime,
        }
    }
}

#[derive(Debug, Deserialize)]
struct JobEnvelope {
    job: JobDetail,
}

#[derive(Debug, Deserialize)]
struct JobDetail {
    id: String,
    #[serde(rename = "jobStatus", default)]
    job_status: Option<JobStatusWire>,
}

#[derive(Debug, Deserialize)]
struct JobStatusWire {
    status: JobStatus,
}

impl JobEnvelope {
    fn into_job(self) -> Job {
        Job { id: self.job.id, status: self.job.job_status.map(|wire| wire.status) }
    }
}
