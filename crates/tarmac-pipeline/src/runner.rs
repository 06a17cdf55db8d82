//! Sequential pipeline execution.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use tarmac_platform::{PlatformClient, PollPolicy};

use crate::branching::{
    base_model_stage, inference_stage, tuning_stage, BaseModelSource, InferenceMode, Stage,
    TuningMethod,
};
use crate::command::TuningHyperParams;
use crate::context::TaskContext;
use crate::error::{PipelineError, Result};
use crate::stages;

fn default_replica_count() -> u32 {
    1
}

fn default_poll_interval_secs() -> u64 {
    15
}

/// A declarative description of one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelinePlan {
    pub base_model: BaseModelSource,
    pub method: TuningMethod,
    pub inference: InferenceMode,
    /// Name of the workspace holding the base model.
    pub base_workspace: String,
    /// Name of the workspace holding tuning data and results.
    pub tuning_workspace: String,
    pub docker_image: String,
    /// Instance class for download/data-prep jobs.
    pub download_instance: String,
    /// Instance class for training and inference jobs.
    pub train_instance: String,
    #[serde(default = "default_replica_count")]
    pub replica_count: u32,
    #[serde(default)]
    pub array_type: Option<String>,
    #[serde(default)]
    pub total_runtime: Option<String>,
    pub checkpoint_url: String,
    /// Pretraining dataset; required when `base_model` is `pretrain`.
    #[serde(default)]
    pub dataset_url: Option<String>,
    /// Checkpoint filename, also the download stage's idempotency artifact.
    pub checkpoint_file: String,
    /// Tuned model filename, also the training stage's idempotency artifact.
    pub tuned_model_file: String,
    #[serde(default)]
    pub hyperparams: TuningHyperParams,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Bound on status queries per job; `None` waits indefinitely.
    #[serde(default)]
    pub max_attempts: Option<u64>,
}

impl PipelinePlan {
    pub fn validate(&self) -> Result<()> {
        if self.base_workspace.trim().is_empty() || self.tuning_workspace.trim().is_empty() {
            return Err(PipelineError::InvalidPlan("workspace names are required".to_string()));
        }
        if self.base_workspace == self.tuning_workspace {
            return Err(PipelineError::InvalidPlan(
                "base and tuning workspaces must be distinct".to_string(),
            ));
        }
        if self.replica_count == 0 {
            return Err(PipelineError::InvalidPlan("replica_count must be >= 1".to_string()));
        }
        if self.base_model == BaseModelSource::Pretrain && self.dataset_url.is_none() {
            return Err(PipelineError::InvalidPlan(
                "dataset_url is required when pretraining".to_string(),
            ));
        }
        if self.poll_interval_secs == 0 {
            return Err(PipelineError::InvalidPlan("poll_interval_secs must be >= 1".to_string()));
        }
        Ok(())
    }

    /// Poll policy applied to every job this plan submits.
    #[must_use]
    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_secs(self.poll_interval_secs),
            max_attempts: self.max_attempts,
        }
    }

    /// The stages this plan will run, in order.
    #[must_use]
    pub fn stage_sequence(&self) -> Vec<Stage> {
        vec![
            base_model_stage(self.base_model),
            Stage::PrepareTuningData,
            tuning_stage(self.method),
            inference_stage(self.method, self.inference),
        ]
    }
}

/// Runs the plan start to finish, one stage at a time.
///
/// Workspaces are ensured first; a failed stage halts the run and the
/// remaining stages do not execute. Returns the task context with every
/// completed stage's outcome.
pub async fn run_pipeline(client: &PlatformClient, plan: &PipelinePlan) -> Result<TaskContext> {
    plan.validate()?;
    let mut ctx = TaskContext::new();

    stages::ensure_workspaces(client, &mut ctx, plan).await?;

    for stage in plan.stage_sequence() {
        info!(stage = %stage, "starting stage");
        let outcome = stages::run_stage(client, &mut ctx, stage, plan).await?;
        if outcome.skipped {
            info!(stage = %stage, "stage skipped");
        } else {
            info!(stage = %stage, job_id = ?outcome.job_id, "stage finished");
        }
    }

    Ok(ctx)
}
