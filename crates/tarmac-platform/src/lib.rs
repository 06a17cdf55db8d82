//! Tarmac Platform
//!
//! Typed client for the batch Job Platform REST API:
//! - Exchanging a long-lived API key for a short-lived bearer token
//! - Looking up / creating persistent storage workspaces
//! - Listing workspace contents for idempotency checks
//! - Submitting container jobs with workspace mounts
//! - Waiting for a submitted job to reach a terminal state
//!
//! Every authenticated call fetches a fresh token; nothing is cached
//! client-side. All failures surface immediately as [`PlatformError`];
//! retry policy belongs to the calling workflow engine.

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod job;
pub mod jobs;
pub mod poll;
pub mod workspace;

pub use client::PlatformClient;
pub use config::PlatformConfig;
pub use error::{PlatformError, Result};
pub use job::{Job, JobSpec, JobStatus, PortMapping, WorkspaceMount};
pub use poll::{wait_for_completion, JobStatusSource, PollPolicy, Sleeper, TokioSleeper};
pub use workspace::{FileEntry, Workspace};
