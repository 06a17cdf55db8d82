//! Container command construction per stage.
//!
//! Plain string templating. The commands run inside the training container
//! with workspaces mounted at the paths the caller chose, so every path
//! here is relative to those mount points.

use serde::{Deserialize, Serialize};

/// Training knobs shared by the tuning stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TuningHyperParams {
    pub devices: u32,
    pub precision: String,
    pub max_steps: u32,
    pub val_check_interval: u32,
    pub micro_batch_size: u32,
    pub global_batch_size: u32,
    pub learning_rate: f64,
}

impl Default for TuningHyperParams {
    fn default() -> Self {
        Self {
            devices: 8,
            precision: "bf16".to_string(),
            max_steps: 1000,
            val_check_interval: 200,
            micro_batch_size: 1,
            global_batch_size: 128,
            learning_rate: 5e-6,
        }
    }
}

/// Fetch a published checkpoint into a workspace-mounted directory.
#[must_use]
pub fn download_checkpoint_command(mount_point: &str, checkpoint_url: &str) -> String {
    format!(
        "cd {mount_point}; mkdir -p base_models; cd base_models; wget {checkpoint_url}"
    )
}

/// Fetch and unpack the pretraining dataset into a workspace.
#[must_use]
pub fn download_dataset_command(mount_point: &str, dataset_url: &str) -> String {
    format!("cd {mount_point}; mkdir -p datasets; cd datasets; wget {dataset_url}")
}

/// Download and split the tuning dataset.
#[must_use]
pub fn prepare_tuning_data_command(data_mount: &str) -> String {
    format!(
        "python3 /opt/trainer/scripts/prepare_squad.py --output-dir {data_mount}/SQuAD/v1.1"
    )
}

/// Fine-tune with the given method's training script.
#[must_use]
pub fn tuning_train_command(
    script: &str,
    base_model_path: &str,
    data_mount: &str,
    results_dir: &str,
    params: &TuningHyperParams,
) -> String {
    format!(
        "python3 {script} \
         trainer.devices={devices} \
         trainer.precision={precision} \
         trainer.max_steps={max_steps} \
         trainer.val_check_interval={val_check_interval} \
         model.restore_from_path={base_model_path} \
         model.optim.lr={lr} \
         model.data.train_ds.micro_batch_size={micro} \
         model.data.train_ds.global_batch_size={global} \
         model.data.train_ds.file_names=[{data_mount}/SQuAD/v1.1/squad_train.jsonl] \
         model.data.validation_ds.file_names=[{data_mount}/SQuAD/v1.1/squad_val.jsonl] \
         exp_manager.explicit_log_dir={results_dir} \
         exp_manager.resume_if_exists=True",
        devices = params.devices,
        precision = params.precision,
        max_steps = params.max_steps,
        val_check_interval = params.val_check_interval,
        lr = params.learning_rate,
        micro = params.micro_batch_size,
        global = params.global_batch_size,
    )
}

/// One-shot batch inference over the tuned model.
#[must_use]
pub fn batch_inference_command(
    model_path: &str,
    data_mount: &str,
    outfile: &str,
    params: &TuningHyperParams,
) -> String {
    format!(
        "python3 /opt/trainer/scripts/peft_eval.py \
         model.restore_from_path={model_path} \
         trainer.devices={devices} \
         model.data.test_ds.file_names=[{data_mount}/SQuAD/v1.1/squad_test.jsonl] \
         model.data.test_ds.global_batch_size={global} \
         model.data.test_ds.micro_batch_size={micro} \
         inference.greedy=True \
         inference.outfile_path={outfile}",
        devices = params.devices,
        global = params.global_batch_size,
        micro = params.micro_batch_size,
    )
}

/// Merge trained LoRA adapter weights back into the base model.
#[must_use]
pub fn merge_adapter_command(base_model_path: &str, adapter_path: &str, merged_path: &str) -> String {
    format!(
        "python3 /opt/trainer/scripts/merge_lora_weights.py \
         gpt_model_file={base_model_path} \
         lora_model_path={adapter_path} \
         merged_model_path={merged_path}"
    )
}

/// Lay out a serving repository for the tuned model.
#[must_use]
pub fn build_serving_repo_command(model_path: &str, repo_dir: &str) -> String {
    format!(
        "python3 /opt/trainer/scripts/build_model_repository.py \
         --model {model_path} --repository {repo_dir}"
    )
}
