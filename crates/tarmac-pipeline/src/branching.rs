//! Branch decisions as closed enums.
//!
//! The mappings from a decision to the next stage are total matches: an
//! unhandled method or mode cannot compile, and unknown method strings are
//! rejected at parse time rather than silently routed nowhere.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Where the base model comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaseModelSource {
    /// Fetch a published pretrained checkpoint.
    DownloadCheckpoint,
    /// Pretrain from scratch, starting with the pretraining dataset.
    Pretrain,
}

/// Parameter-efficient or full fine-tuning method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TuningMethod {
    PTuning,
    Lora,
    Sft,
}

impl FromStr for TuningMethod {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "p_tuning" => Ok(Self::PTuning),
            "lora" => Ok(Self::Lora),
            "sft" => Ok(Self::Sft),
            other => Err(PipelineError::UnknownTuningMethod(other.to_string())),
        }
    }
}

/// How the tuned model is served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InferenceMode {
    /// Stand up an interactive serving endpoint.
    Interactive,
    /// Run a one-shot batch inference script.
    Batch,
}

/// A pipeline stage, named by what it does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    DownloadBaseCheckpoint,
    DownloadPretrainDataset,
    PrepareTuningData,
    PTuningTrain,
    LoraTrain,
    SftTrain,
    MergeLoraAdapter,
    BuildServingRepo,
    PTuningInference,
    LoraInference,
    SftInference,
}

impl Stage {
    /// Task identifier this stage records its result under.
    #[must_use]
    pub fn task_id(&self) -> &'static str {
        match self {
            Self::DownloadBaseCheckpoint => "download_base_checkpoint",
            Self::DownloadPretrainDataset => "download_pretrain_dataset",
            Self::PrepareTuningData => "prepare_tuning_data",
            Self::PTuningTrain => "p_tuning_train",
            Self::LoraTrain => "lora_train",
            Self::SftTrain => "sft_train",
            Self::MergeLoraAdapter => "merge_lora_adapter",
            Self::BuildServingRepo => "build_serving_repo",
            Self::PTuningInference => "p_tuning_inference",
            Self::LoraInference => "lora_inference",
            Self::SftInference => "sft_inference",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.task_id())
    }
}

/// Which stage acquires the base model.
#[must_use]
pub fn base_model_stage(source: BaseModelSource) -> Stage {
    match source {
        BaseModelSource::DownloadCheckpoint => Stage::DownloadBaseCheckpoint,
        BaseModelSource::Pretrain => Stage::DownloadPretrainDataset,
    }
}

/// Which stage trains for the chosen method.
#[must_use]
pub fn tuning_stage(method: TuningMethod) -> Stage {
    match method {
        TuningMethod::PTuning => Stage::PTuningTrain,
        TuningMethod::Lora => Stage::LoraTrain,
        TuningMethod::Sft => Stage::SftTrain,
    }
}

/// Which stage follows training for the chosen method and serving mode.
///
/// Interactive LoRA serving needs the adapter weights merged back into the
/// base model first; the other methods go straight to building the serving
/// repository. Batch mode runs the per-method inference script.
#[must_use]
pub fn inference_stage(method: TuningMethod, mode: InferenceMode) -> Stage {
    match (method, mode) {
        (TuningMethod::Lora, InferenceMode::Interactive) => Stage::MergeLoraAdapter,
        (TuningMethod::PTuning | TuningMethod::Sft, InferenceMode::Interactive) => {
            Stage::BuildServingRepo
        }
        (TuningMethod::PTuning, InferenceMode::Batch) => Stage::PTuningInference,
        (TuningMethod::Lora, InferenceMode::Batch) => Stage::LoraInference,
        (TuningMethod::Sft, InferenceMode::Batch) => Stage::SftInference,
    }
}
