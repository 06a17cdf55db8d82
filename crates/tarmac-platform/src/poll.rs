//! Blocking wait for a job to reach a terminal state.
//!
//! The loop queries status, returns the instant the status is terminal,
//! and otherwise sleeps for the policy interval and re-queries. Both the
//! status source and the sleep are injected traits so the loop is
//! deterministic under test. The default policy is unbounded, matching
//! the platform's one-task-at-a-time workflow model: a job that never
//! terminates blocks its caller until the process or the platform
//! intervenes.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::client::PlatformClient;
use crate::error::{PlatformError, Result};
use crate::job::JobStatus;

/// Injected sleep dependency for the wait loop.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Real sleeper backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Source of job status observations.
#[async_trait]
pub trait JobStatusSource: Send + Sync {
    async fn status(&self, job_id: &str) -> Result<JobStatus>;
}

#[async_trait]
impl JobStatusSource for PlatformClient {
    /// Re-authenticates on every query; see [`PlatformClient::job_status`].
    async fn status(&self, job_id: &str) -> Result<JobStatus> {
        self.job_status(job_id).await
    }
}

/// How often to poll, and whether to give up.
#[derive(Debug, Clone)]
pub struct PollPolicy {
    /// Sleep between consecutive status queries.
    pub interval: Duration,
    /// Abort with [`PlatformError::PollTimeout`] after this many status
    /// queries. `None` waits forever.
    pub max_attempts: Option<u64>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self { interval: Duration::from_secs(15), max_attempts: None }
    }
}

impl PollPolicy {
    #[must_use]
    pub fn with_interval(interval: Duration) -> Self {
        Self { interval, max_attempts: None }
    }

    #[must_use]
    pub fn bounded(interval: Duration, max_attempts: u64) -> Self {
        Self { interval, max_attempts: Some(max_attempts) }
    }
}

/// Polls `source` until `job_id` reaches a terminal state.
///
/// Returns the terminal status without sleeping after the terminal
/// observation. A non-200 during any query aborts the wait immediately.
pub async fn wait_for_completion(
    source: &dyn JobStatusSource,
    sleeper: &dyn Sleeper,
    job_id: &str,
    policy: &PollPolicy,
) -> Result<JobStatus> {
    let mut attempts: u64 = 0;
    loop {
        let status = source.status(job_id).await?;
        attempts += 1;
        if status.is_terminal() {
            info!(job_id, status = %status, attempts, "job reached terminal state");
            return Ok(status);
        }
        debug!(job_id, status = %status, attempts, "job still running");
        if let Some(max) = policy.max_attempts {
            if attempts >= max {
                warn!(job_id, attempts, "giving up on job wait");
                return Err(PlatformError::PollTimeout { job_id: job_id.to_string(), attempts });
            }
        }
        sleeper.sleep(policy.interval).await;
    }
}

impl PlatformClient {
    /// Blocks until the job reaches a terminal state, sleeping for the
    /// policy interval between queries.
    pub async fn wait_for_job(&self, job_id: &str, policy: &PollPolicy) -> Result<JobStatus> {
        wait_for_completion(self, &TokioSleeper, job_id, policy).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Serves a scripted sequence of statuses and counts queries.
    struct ScriptedSource {
        statuses: Mutex<std::vec::IntoIter<JobStatus>>,
        queries: Mutex<u64>,
    }

    impl ScriptedSource {
        fn new(statuses: Vec<JobStatus>) -> Self {
            Self { statuses: Mutex::new(statuses.into_iter()), queries: Mutex::new(0) }
        }

        fn query_count(&self) -> u64 {
            *self.queries.lock().unwrap()
        }
    }

    #[async_trait]
    impl JobStatusSource for ScriptedSource {
        async fn status(&self, _job_id: &str) -> Result<JobStatus> {
            *self.queries.lock().unwrap() += 1;
            self.statuses
                .lock()
                .unwrap()
                .next()
                .ok_or_else(|| PlatformError::StatusQuery { status: 500, url: "script exhausted".to_string() })
        }
    }

    /// Records every sleep instead of sleeping.
    #[derive(Default)]
    struct RecordingSleeper {
        sleeps: Mutex<Vec<Duration>>,
    }

    impl RecordingSleeper {
        fn sleep_count(&self) -> usize {
            self.sleeps.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.sleeps.lock().unwrap().push(duration);
        }
    }

    #[tokio::test]
    async fn test_polls_until_success_sleeping_between_queries() {
        let source = ScriptedSource::new(vec![
            JobStatus::Queued,
            JobStatus::Running,
            JobStatus::Running,
            JobStatus::FinishedSuccess,
        ]);
        let sleeper = RecordingSleeper::default();
        let policy = PollPolicy::with_interval(Duration::from_secs(15));

        let status = wait_for_completion(&source, &sleeper, "job-1", &policy).await.unwrap();

        assert_eq!(status, JobStatus::FinishedSuccess);
        assert_eq!(source.query_count(), 4);
        assert_eq!(sleeper.sleep_count(), 3);
        assert!(sleeper.sleeps.lock().unwrap().iter().all(|d| *d == Duration::from_secs(15)));
    }

    #[tokio::test]
    async fn test_returns_failed_without_further_queries() {
        let source = ScriptedSource::new(vec![
            JobStatus::Running,
            JobStatus::Failed,
            // Would error if queried again: the script is exhausted after this.
        ]);
        let sleeper = RecordingSleeper::default();

        let status =
            wait_for_completion(&source, &sleeper, "job-2", &PollPolicy::default()).await.unwrap();

        assert_eq!(status, JobStatus::Failed);
        assert_eq!(source.query_count(), 2);
        assert_eq!(sleeper.sleep_count(), 1);
    }

    #[tokio::test]
    async fn test_killed_by_user_is_terminal_on_first_query() {
        let source = ScriptedSource::new(vec![JobStatus::KilledByUser]);
        let sleeper = RecordingSleeper::default();

        let status =
            wait_for_completion(&source, &sleeper, "job-3", &PollPolicy::default()).await.unwrap();

        assert_eq!(status, JobStatus::KilledByUser);
        assert_eq!(source.query_count(), 1);
        assert_eq!(sleeper.sleep_count(), 0);
    }

    #[tokio::test]
    async fn test_status_query_error_aborts_wait() {
        let source = ScriptedSource::new(vec![]);
        let sleeper = RecordingSleeper::default();

        let err = wait_for_completion(&source, &sleeper, "job-4", &PollPolicy::default())
            .await
            .unwrap_err();

        assert!(matches!(err, PlatformError::StatusQuery { .. }));
        assert_eq!(sleeper.sleep_count(), 0);
    }

    #[tokio::test]
    async fn test_bounded_policy_times_out() {
        let source = ScriptedSource::new(vec![JobStatus::Queued, JobStatus::Running, JobStatus::Running]);
        let sleeper = RecordingSleeper::default();
        let policy = PollPolicy::bounded(Duration::from_secs(1), 3);

        let err = wait_for_completion(&source, &sleeper, "job-5", &policy).await.unwrap_err();

        match err {
            PlatformError::PollTimeout { job_id, attempts } => {
                assert_eq!(job_id, "job-5");
                assert_eq!(attempts, 3);
            }
            other => panic!("expected PollTimeout, got {other:?}"),
        }
        assert_eq!(source.query_count(), 3);
        // No sleep after the query that exhausts the budget.
        assert_eq!(sleeper.sleep_count(), 2);
    }

    #[tokio::test]
    async fn test_unknown_status_is_treated_as_non_terminal() {
        let source = ScriptedSource::new(vec![
            JobStatus::Unknown("RESIZING".to_string()),
            JobStatus::FinishedSuccess,
        ]);
        let sleeper = RecordingSleeper::default();

        let status =
            wait_for_completion(&source, &sleeper, "job-6", &PollPolicy::default()).await.unwrap();

        assert_eq!(status, JobStatus::FinishedSuccess);
        assert_eq!(source.query_count(), 2);
    }
}
