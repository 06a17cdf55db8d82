//! Pipeline stage execution.
//!
//! Workspace creation is always its own explicit step: both workspaces
//! exist (and their IDs sit in the context) before any job is submitted.
//! Job stages check for their output artifact first and skip resubmission
//! when it is already in the workspace, then submit and block until the
//! job reaches a terminal state.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use tarmac_platform::{JobSpec, JobStatus, PlatformClient, WorkspaceMount};

use crate::branching::Stage;
use crate::command::{
    batch_inference_command, build_serving_repo_command, download_checkpoint_command,
    download_dataset_command, merge_adapter_command, prepare_tuning_data_command,
    tuning_train_command,
};
use crate::context::TaskContext;
use crate::error::{PipelineError, Result};
use crate::runner::PipelinePlan;

/// Task IDs for the workspace-creation steps.
pub const CREATE_BASE_WORKSPACE: &str = "create_base_workspace";
pub const CREATE_TUNING_WORKSPACE: &str = "create_tuning_workspace";

/// Container mount points for the two pipeline workspaces.
pub const BASE_MOUNT: &str = "/mount/base_workspace";
pub const TUNING_MOUNT: &str = "/mount/tuning_workspace";

/// What a job stage did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageOutcome {
    pub task_id: String,
    /// None when the stage was skipped.
    pub job_id: Option<String>,
    pub status: Option<JobStatus>,
    pub skipped: bool,
}

/// Creates (or finds) both pipeline workspaces and records their IDs in
/// the context. Must run before any job stage.
pub async fn ensure_workspaces(
    client: &PlatformClient,
    ctx: &mut TaskContext,
    plan: &PipelinePlan,
) -> Result<()> {
    for (task_id, name) in [
        (CREATE_BASE_WORKSPACE, plan.base_workspace.as_str()),
        (CREATE_TUNING_WORKSPACE, plan.tuning_workspace.as_str()),
    ] {
        let workspace = client.ensure_workspace(name).await?;
        info!(task_id, workspace_id = %workspace.id, name, "workspace ready");
        ctx.put(task_id, &workspace.id)?;
    }
    Ok(())
}

/// Runs one job stage to completion.
///
/// Skips submission when the stage's output artifact is already present.
/// A terminal status other than success fails the stage, halting the
/// branch.
pub async fn run_stage(
    client: &PlatformClient,
    ctx: &mut TaskContext,
    stage: Stage,
    plan: &PipelinePlan,
) -> Result<StageOutcome> {
    let base_workspace_id: String = ctx.get(CREATE_BASE_WORKSPACE)?;
    let tuning_workspace_id: String = ctx.get(CREATE_TUNING_WORKSPACE)?;

    if let Some((workspace_id, artifact)) =
        output_artifact(stage, plan, &base_workspace_id, &tuning_workspace_id)
    {
        if client.file_exists(workspace_id, &artifact).await? {
            info!(stage = %stage, artifact, "output already present, skipping stage");
            let outcome = StageOutcome {
                task_id: stage.task_id().to_string(),
                job_id: None,
                status: None,
                skipped: true,
            };
            ctx.put(stage.task_id(), &outcome)?;
            return Ok(outcome);
        }
    }

    let spec = job_spec_for(stage, plan, &base_workspace_id, &tuning_workspace_id)?;
    let job = client.submit_job(&spec).await?;
    let status = client.wait_for_job(&job.id, &plan.poll_policy()).await?;

    if status != JobStatus::FinishedSuccess {
        warn!(stage = %stage, job_id = %job.id, status = %status, "stage job did not succeed");
        return Err(PipelineError::StageFailed { task_id: stage.task_id().to_string(), status });
    }

    let outcome = StageOutcome {
        task_id: stage.task_id().to_string(),
        job_id: Some(job.id),
        status: Some(status),
        skipped: false,
    };
    ctx.put(stage.task_id(), &outcome)?;
    Ok(outcome)
}

/// The artifact whose presence makes a stage redundant, if the stage has
/// one. Subject to the flat listing cap: a very large workspace can hide
/// the artifact and cause a redundant (harmless) re-run.
fn output_artifact<'a>(
    stage: Stage,
    plan: &PipelinePlan,
    base_workspace_id: &'a str,
    tuning_workspace_id: &'a str,
) -> Option<(&'a str, String)> {
    match stage {
        Stage::DownloadBaseCheckpoint => {
            Some((base_workspace_id, plan.checkpoint_file.clone()))
        }
        Stage::PTuningTrain | Stage::LoraTrain | Stage::SftTrain => {
            Some((tuning_workspace_id, plan.tuned_model_file.clone()))
        }
        _ => None,
    }
}

fn job_spec_for(
    stage: Stage,
    plan: &PipelinePlan,
    base_workspace_id: &str,
    tuning_workspace_id: &str,
) -> Result<JobSpec> {
    let base_mount = WorkspaceMount::new(base_workspace_id, BASE_MOUNT);
    let tuning_mount = WorkspaceMount::new(tuning_workspace_id, TUNING_MOUNT);
    let base_model_path = format!("{BASE_MOUNT}/base_models/{}", plan.checkpoint_file);
    let tuned_model_path = format!("{TUNING_MOUNT}/results/{}", plan.tuned_model_file);

    let spec = match stage {
        Stage::DownloadBaseCheckpoint => JobSpec::new(
            stage.task_id(),
            &plan.download_instance,
            &plan.docker_image,
            download_checkpoint_command(BASE_MOUNT, &plan.checkpoint_url),
        )
        .with_mount(base_mount),

        Stage::DownloadPretrainDataset => {
            let dataset_url = plan.dataset_url.as_deref().ok_or_else(|| {
                PipelineError::InvalidPlan(
                    "dataset_url is required when pretraining".to_string(),
                )
            })?;
            JobSpec::new(
                stage.task_id(),
                &plan.download_instance,
                &plan.docker_image,
                download_dataset_command(BASE_MOUNT, dataset_url),
            )
            .with_mount(base_mount)
        }

        Stage::PrepareTuningData => JobSpec::new(
            stage.task_id(),
            &plan.download_instance,
            &plan.docker_image,
            prepare_tuning_data_command(TUNING_MOUNT),
        )
        .with_mount(tuning_mount),

        Stage::PTuningTrain | Stage::LoraTrain | Stage::SftTrain => {
            let script = match stage {
                Stage::PTuningTrain => "/opt/trainer/scripts/p_tuning_train.py",
                Stage::LoraTrain => "/opt/trainer/scripts/lora_train.py",
                _ => "/opt/trainer/scripts/sft_train.py",
            };
            let mut spec = JobSpec::new(
                stage.task_id(),
                &plan.train_instance,
                &plan.docker_image,
                tuning_train_command(
                    script,
                    &base_model_path,
                    TUNING_MOUNT,
                    &format!("{TUNING_MOUNT}/results"),
                    &plan.hyperparams,
                ),
            )
            .with_mount(base_mount)
            .with_mount(tuning_mount);
            if plan.replica_count > 1 {
                let array_type = plan.array_type.as_deref().unwrap_or("PYTORCH");
                spec = spec.with_replicas(plan.replica_count, array_type);
                spec.total_runtime = plan.total_runtime.clone();
            }
            spec
        }

        Stage::MergeLoraAdapter => JobSpec::new(
            stage.task_id(),
            &plan.train_instance,
            &plan.docker_image,
            merge_adapter_command(
                &base_model_path,
                &tuned_model_path,
                &format!("{TUNING_MOUNT}/results/merged_{}", plan.tuned_model_file),
            ),
        )
        .with_mount(base_mount)
        .with_mount(tuning_mount),

        Stage::BuildServingRepo => JobSpec::new(
            stage.task_id(),
            &plan.train_instance,
            &plan.docker_image,
            build_serving_repo_command(
                &tuned_model_path,
                &format!("{TUNING_MOUNT}/model_repository"),
            ),
        )
        .with_mount(base_mount)
        .with_mount(tuning_mount),

        Stage::PTuningInference | Stage::LoraInference | Stage::SftInference => JobSpec::new(
            stage.task_id(),
            &plan.train_instance,
            &plan.docker_image,
            batch_inference_command(
                &tuned_model_path,
                TUNING_MOUNT,
                &format!("{TUNING_MOUNT}/inference_results.jsonl"),
                &plan.hyperparams,
            ),
        )
        .with_mount(base_mount)
        .with_mount(tuning_mount),
    };

    Ok(spec)
}
