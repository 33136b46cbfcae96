//! In-memory job store and lifecycle manager.
//!
//! [`JobStore`] owns every [`Job`] for the lifetime of the process. Callers
//! only ever receive clones; all mutation goes through the store so each
//! read-modify-write runs under a single write lock and a late `running`
//! notification can never overwrite a `completed` callback it raced with.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, info, warn};

use crate::error::{CallbackError, SubmitError};
use crate::state_machine::{Job, JobStatus, TransitionPolicy, new_job_id};
use crate::validation::validate_submission;

/// Thread-safe registry of agent jobs, keyed by `job_id`.
///
/// Cloning the store clones the handle, not the jobs.
#[derive(Debug, Clone, Default)]
pub struct JobStore {
    jobs: Arc<RwLock<HashMap<String, Job>>>,
    policy: TransitionPolicy,
}

impl JobStore {
    /// Creates an empty store that accepts any callback status overwrite.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store applying `policy` to callback updates.
    pub fn with_policy(policy: TransitionPolicy) -> Self {
        Self {
            jobs: Arc::default(),
            policy,
        }
    }

    pub fn policy(&self) -> TransitionPolicy {
        self.policy
    }

    /// Validates and records a new job in `pending`.
    pub fn submit(
        &self,
        upstream_repo: &str,
        prompt: &str,
        callback_url: Option<&str>,
    ) -> Result<Job, SubmitError> {
        validate_submission(upstream_repo, prompt, callback_url)?;

        let mut job = Job::new(
            upstream_repo.to_string(),
            prompt.to_string(),
            callback_url.map(str::to_string),
        );
        let mut jobs = self.write();
        // Ids are never reused, even across finished jobs.
        while jobs.contains_key(&job.job_id) {
            job.job_id = new_job_id();
        }
        jobs.insert(job.job_id.clone(), job.clone());
        info!(job_id = %job.job_id, upstream_repo, "job submitted");
        Ok(job)
    }

    /// Looks up a job. Unknown ids yield `None`.
    pub fn get(&self, job_id: &str) -> Option<Job> {
        self.read().get(job_id).cloned()
    }

    /// Applies a status update delivered by the automation pipeline.
    ///
    /// `completed` records `pr_url`, `failed` records `error`. Unknown ids
    /// yield `Ok(None)`. Edges are checked against the store's
    /// [`TransitionPolicy`].
    pub fn apply_callback(
        &self,
        job_id: &str,
        status: &str,
        pr_url: Option<&str>,
        error: Option<&str>,
    ) -> Result<Option<Job>, CallbackError> {
        let status: JobStatus = status.parse()?;
        let updated = self.transition(job_id, status, pr_url, error, self.policy)?;
        if let Some(job) = &updated
            && job.status == JobStatus::Completed
            && job.pr_url.is_none()
        {
            warn!(job_id, "job completed without a pr_url");
        }
        Ok(updated)
    }

    /// Records a step reported by the orchestration collaborator.
    ///
    /// Always enforces the lifecycle edges, whatever the callback policy.
    pub fn advance(&self, job_id: &str, to: JobStatus) -> Result<Option<Job>, CallbackError> {
        self.transition(job_id, to, None, None, TransitionPolicy::Strict)
    }

    /// Marks a live job as `failed` with `error`.
    pub fn fail(&self, job_id: &str, error: &str) -> Result<Option<Job>, CallbackError> {
        self.transition(job_id, JobStatus::Failed, None, Some(error), TransitionPolicy::Strict)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn transition(
        &self,
        job_id: &str,
        to: JobStatus,
        pr_url: Option<&str>,
        error: Option<&str>,
        policy: TransitionPolicy,
    ) -> Result<Option<Job>, CallbackError> {
        let mut jobs = self.write();
        let Some(job) = jobs.get_mut(job_id) else {
            warn!(job_id, status = %to, "status update for unknown job");
            return Ok(None);
        };

        let from = job.status;
        policy.check(job_id, from, to)?;
        if from.is_terminal() {
            warn!(job_id, %from, %to, "overwriting terminal job status");
        }

        job.record(to, pr_url, error);
        if to.is_terminal() {
            info!(job_id, %from, %to, "job finished");
        } else {
            debug!(job_id, %from, %to, "job advanced");
        }
        Ok(Some(job.clone()))
    }

    // The map only holds plain records and every mutation completes under
    // the guard, so a poisoned lock still guards consistent data.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Job>> {
        self.jobs.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Job>> {
        self.jobs.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;
    use std::thread;

    const PR_URL: &str = "https://github.com/owner/repo/pull/1";

    fn store_with_job() -> (JobStore, Job) {
        let store = JobStore::new();
        let job = store
            .submit("owner/repo", "Test", Some("https://example.com/webhook"))
            .unwrap();
        (store, job)
    }

    fn drive_to_running(store: &JobStore, job_id: &str) {
        for step in [
            JobStatus::Forking,
            JobStatus::ForkReady,
            JobStatus::Triggered,
            JobStatus::Running,
        ] {
            store.advance(job_id, step).unwrap().unwrap();
        }
    }

    #[test]
    fn submit_creates_pending_job() {
        let store = JobStore::new();
        let job = store
            .submit("owner/repo", "fix bug", Some("https://cb.example/x"))
            .unwrap();

        assert_eq!(job.status, JobStatus::Pending);
        assert!(!job.job_id.is_empty());
        assert_eq!(job.created_at, job.updated_at);
        assert_eq!(job.callback_url.as_deref(), Some("https://cb.example/x"));
        assert_eq!(store.get(&job.job_id), Some(job));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn submit_rejects_invalid_input_without_storing() {
        let store = JobStore::new();
        assert_eq!(
            store.submit("invalid", "Test prompt", None).unwrap_err(),
            SubmitError::InvalidRepository("invalid".into())
        );
        assert_eq!(
            store.submit("owner/repo", "", None).unwrap_err(),
            SubmitError::EmptyPrompt
        );
        assert_eq!(
            store
                .submit("owner/repo", "Test prompt", Some("not-a-url"))
                .unwrap_err(),
            SubmitError::InvalidCallbackUrl("not-a-url".into())
        );
        assert!(store.is_empty());
    }

    #[test]
    fn get_unknown_job_is_none() {
        assert!(JobStore::new().get("nonexistent").is_none());
    }

    #[test]
    fn get_is_idempotent() {
        let (store, job) = store_with_job();
        let first = store.get(&job.job_id);
        let second = store.get(&job.job_id);
        assert_eq!(first, second);
    }

    #[test]
    fn callback_for_unknown_job_is_none() {
        let store = JobStore::new();
        let result = store
            .apply_callback("nonexistent", "completed", None, None)
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn callback_completed_records_pr_url() {
        let (store, job) = store_with_job();
        drive_to_running(&store, &job.job_id);

        let updated = store
            .apply_callback(&job.job_id, "completed", Some(PR_URL), None)
            .unwrap()
            .unwrap();

        assert_eq!(updated.status, JobStatus::Completed);
        assert_eq!(updated.pr_url.as_deref(), Some(PR_URL));
        assert!(updated.error.is_none());
        assert!(updated.updated_at >= job.updated_at);
        assert_eq!(store.get(&job.job_id), Some(updated));
    }

    #[test]
    fn callback_failed_records_error() {
        let (store, job) = store_with_job();

        let updated = store
            .apply_callback(&job.job_id, "failed", None, Some("Something went wrong"))
            .unwrap()
            .unwrap();

        assert_eq!(updated.status, JobStatus::Failed);
        assert_eq!(updated.error.as_deref(), Some("Something went wrong"));
        assert!(updated.pr_url.is_none());
    }

    #[test]
    fn callback_completed_without_pr_url_is_accepted() {
        let (store, job) = store_with_job();
        let updated = store
            .apply_callback(&job.job_id, "completed", None, None)
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, JobStatus::Completed);
        assert!(updated.pr_url.is_none());
    }

    #[test]
    fn callback_rejects_unknown_status_token() {
        let (store, job) = store_with_job();
        let err = store
            .apply_callback(&job.job_id, "exploded", None, None)
            .unwrap_err();
        assert_eq!(err, CallbackError::UnknownStatus("exploded".into()));
        assert_eq!(store.get(&job.job_id).unwrap().status, JobStatus::Pending);
    }

    // The default policy reproduces the reference behavior: callbacks may
    // skip steps and even overwrite terminal states.
    #[test]
    fn permissive_policy_overwrites_terminal_state() {
        let (store, job) = store_with_job();
        assert_eq!(store.policy(), TransitionPolicy::Permissive);

        store
            .apply_callback(&job.job_id, "completed", Some(PR_URL), None)
            .unwrap();
        let reopened = store
            .apply_callback(&job.job_id, "running", None, None)
            .unwrap()
            .unwrap();

        assert_eq!(reopened.status, JobStatus::Running);
        assert!(reopened.pr_url.is_none());
    }

    #[test]
    fn strict_policy_rejects_post_terminal_update() {
        let store = JobStore::with_policy(TransitionPolicy::Strict);
        let job = store.submit("owner/repo", "Test", None).unwrap();
        drive_to_running(&store, &job.job_id);
        store
            .apply_callback(&job.job_id, "completed", Some(PR_URL), None)
            .unwrap();

        let err = store
            .apply_callback(&job.job_id, "failed", None, Some("late"))
            .unwrap_err();

        assert_eq!(
            err,
            CallbackError::IllegalTransition {
                job_id: job.job_id.clone(),
                from: JobStatus::Completed,
                to: JobStatus::Failed,
            }
        );
        let stored = store.get(&job.job_id).unwrap();
        assert_eq!(stored.status, JobStatus::Completed);
        assert_eq!(stored.pr_url.as_deref(), Some(PR_URL));
    }

    #[test]
    fn strict_policy_rejects_skipped_steps() {
        let store = JobStore::with_policy(TransitionPolicy::Strict);
        let job = store.submit("owner/repo", "Test", None).unwrap();
        let err = store
            .apply_callback(&job.job_id, "running", None, None)
            .unwrap_err();
        assert!(matches!(err, CallbackError::IllegalTransition { .. }));
    }

    #[test]
    fn strict_policy_allows_completion_before_running() {
        let store = JobStore::with_policy(TransitionPolicy::Strict);
        let job = store.submit("owner/repo", "Test", None).unwrap();
        store.advance(&job.job_id, JobStatus::Forking).unwrap();
        store.advance(&job.job_id, JobStatus::ForkReady).unwrap();
        store.advance(&job.job_id, JobStatus::Triggered).unwrap();

        let done = store
            .apply_callback(&job.job_id, "completed", Some(PR_URL), None)
            .unwrap()
            .unwrap();
        assert_eq!(done.status, JobStatus::Completed);
    }

    #[test]
    fn advance_enforces_edges_even_when_permissive() {
        let (store, job) = store_with_job();
        let err = store.advance(&job.job_id, JobStatus::Running).unwrap_err();
        assert!(matches!(err, CallbackError::IllegalTransition { .. }));
        assert!(store.advance("nonexistent", JobStatus::Forking).unwrap().is_none());
    }

    #[test]
    fn fail_records_error_from_any_live_state() {
        let (store, job) = store_with_job();
        store.advance(&job.job_id, JobStatus::Forking).unwrap();
        let failed = store.fail(&job.job_id, "fork refused").unwrap().unwrap();
        assert_eq!(failed.status, JobStatus::Failed);
        assert_eq!(failed.error.as_deref(), Some("fork refused"));
        assert!(store.fail(&job.job_id, "again").is_err());
    }

    #[test]
    fn clones_share_the_same_jobs() {
        let (store, job) = store_with_job();
        let handle = store.clone();
        handle.apply_callback(&job.job_id, "cancelled", None, None).unwrap();
        assert_eq!(store.get(&job.job_id).unwrap().status, JobStatus::Cancelled);
    }

    #[test]
    fn concurrent_callbacks_do_not_lose_updates() {
        let store = JobStore::new();
        let ids: Vec<String> = (0..16)
            .map(|i| {
                store
                    .submit("owner/repo", &format!("task {i}"), None)
                    .unwrap()
                    .job_id
            })
            .collect();

        let handles: Vec<_> = ids
            .iter()
            .cloned()
            .map(|id| {
                let store = store.clone();
                thread::spawn(move || {
                    store.apply_callback(&id, "running", None, None).unwrap();
                    store
                        .apply_callback(&id, "completed", Some(PR_URL), None)
                        .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.len(), 16);
        for id in &ids {
            let job = store.get(id).unwrap();
            assert_eq!(job.status, JobStatus::Completed);
            assert_eq!(job.pr_url.as_deref(), Some(PR_URL));
        }
    }

    #[test]
    fn late_running_never_overwrites_completed_under_strict_policy() {
        let store = JobStore::with_policy(TransitionPolicy::Strict);
        for _ in 0..32 {
            let job = store.submit("owner/repo", "Test", None).unwrap();
            for step in [JobStatus::Forking, JobStatus::ForkReady, JobStatus::Triggered] {
                store.advance(&job.job_id, step).unwrap().unwrap();
            }

            let barrier = Arc::new(Barrier::new(2));
            let running = {
                let (store, barrier, id) = (store.clone(), barrier.clone(), job.job_id.clone());
                thread::spawn(move || {
                    barrier.wait();
                    store.apply_callback(&id, "running", None, None)
                })
            };
            let completed = {
                let (store, barrier, id) = (store.clone(), barrier.clone(), job.job_id.clone());
                thread::spawn(move || {
                    barrier.wait();
                    store.apply_callback(&id, "completed", Some(PR_URL), None)
                })
            };

            // Whichever lands second sees the other's state: running then
            // completed is legal, completed then running is rejected.
            let running = running.join().unwrap();
            completed.join().unwrap().unwrap().unwrap();
            if let Err(err) = running {
                assert!(matches!(
                    err,
                    CallbackError::IllegalTransition {
                        from: JobStatus::Completed,
                        to: JobStatus::Running,
                        ..
                    }
                ));
            }

            let job = store.get(&job.job_id).unwrap();
            assert_eq!(job.status, JobStatus::Completed);
            assert_eq!(job.pr_url.as_deref(), Some(PR_URL));
        }
    }
}
