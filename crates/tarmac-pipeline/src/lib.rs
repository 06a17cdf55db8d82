//! Tarmac Pipeline
//!
//! Glue for multi-stage training workflows on the Job Platform:
//! - A task result context for passing values between stages
//! - Closed branching enums (base model source, tuning method, inference mode)
//! - Container command templating per stage
//! - A sequential runner that executes one stage at a time
//!
//! Stages run strictly in order; a failed stage halts the branch and
//! downstream stages do not run. Idempotency is artifact-based: a stage
//! whose output file already exists in its workspace is skipped.

pub mod branching;
pub mod command;
pub mod context;
pub mod error;
pub mod runner;
pub mod stages;

pub use branching::{
    base_model_stage, inference_stage, tuning_stage, BaseModelSource, InferenceMode, Stage,
    TuningMethod,
};
pub use command::TuningHyperParams;
pub use context::TaskContext;
pub use error::{PipelineError, Result};
pub use runner::{run_pipeline, PipelinePlan};
pub use stages::StageOutcome;
