use tracing::{info, instrument, warn};

use crate::error::{CallbackError, PipelineError};
use crate::state_machine::{Job, JobStatus};
use crate::store::JobStore;

/// The external fork-and-trigger pipeline a job is handed to.
///
/// Implementations talk to the code host and the automation runner; the
/// store only sees the steps they report. Both futures are `Send` so a
/// launch can be handed to `tokio::spawn` right after submission.
pub trait Pipeline {
    /// Forks the job's upstream repository, returning the fork as `owner/repo`.
    fn fork(&self, job: &Job) -> impl Future<Output = Result<String, PipelineError>> + Send;

    /// Starts the automation run against `fork` with the job's prompt.
    fn trigger(
        &self,
        job: &Job,
        fork: &str,
    ) -> impl Future<Output = Result<(), PipelineError>> + Send;
}

/// Pipeline that reports success without contacting anything.
#[derive(Debug, Clone)]
pub struct DryRunPipeline {
    fork_owner: String,
}

impl DryRunPipeline {
    pub fn new(fork_owner: impl Into<String>) -> Self {
        Self {
            fork_owner: fork_owner.into(),
        }
    }
}

impl Pipeline for DryRunPipeline {
    async fn fork(&self, job: &Job) -> Result<String, PipelineError> {
        let repo = job
            .upstream_repo
            .split_once('/')
            .map(|(_, repo)| repo)
            .unwrap_or(job.upstream_repo.as_str());
        Ok(format!("{}/{repo}", self.fork_owner))
    }

    async fn trigger(&self, _job: &Job, _fork: &str) -> Result<(), PipelineError> {
        Ok(())
    }
}

/// Drives a submitted job through the fork and trigger steps.
pub struct Orchestrator<P> {
    store: JobStore,
    pipeline: P,
}

impl<P: Pipeline> Orchestrator<P> {
    pub fn new(store: JobStore, pipeline: P) -> Self {
        Self { store, pipeline }
    }

    pub fn store(&self) -> &JobStore {
        &self.store
    }

    /// Runs fork and trigger for `job_id`, recording each step in the store.
    ///
    /// Returns the job as last recorded, or `None` if the id is unknown or
    /// the job disappeared. A pipeline failure is recorded as `failed`, not
    /// returned as an error.
    #[instrument(skip(self))]
    pub async fn launch(&self, job_id: &str) -> Result<Option<Job>, CallbackError> {
        let Some(job) = self.store.advance(job_id, JobStatus::Forking)? else {
            return Ok(None);
        };

        // No store lock is held across pipeline calls.
        let fork = match self.pipeline.fork(&job).await {
            Ok(fork) => fork,
            Err(err) => return self.record_failure(job_id, &err),
        };
        info!(job_id, fork = %fork, "fork ready");
        let Some(job) = self.store.advance(job_id, JobStatus::ForkReady)? else {
            return Ok(None);
        };

        if let Err(err) = self.pipeline.trigger(&job, &fork).await {
            return self.record_failure(job_id, &err);
        }
        self.store.advance(job_id, JobStatus::Triggered)
    }

    fn record_failure(
        &self,
        job_id: &str,
        err: &PipelineError,
    ) -> Result<Option<Job>, CallbackError> {
        warn!(job_id, error = %err, "pipeline step failed");
        self.store.fail(job_id, &err.to_string())
    }
}
