use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::state::JobStatus;

/// One submitted "fork + prompt + automate" unit of work.
///
/// The serialized form is the job's external representation: every key is
/// always present, absent optionals are `null`, timestamps are RFC 3339.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub job_id: String,
    pub upstream_repo: String,
    pub prompt: String,
    pub callback_url: Option<String>,
    pub status: JobStatus,
    pub pr_url: Option<String>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Builds a `pending` job with a fresh id. Inputs are assumed validated.
    pub fn new(upstream_repo: String, prompt: String, callback_url: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            job_id: new_job_id(),
            upstream_repo,
            prompt,
            callback_url,
            status: JobStatus::Pending,
            pr_url: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Moves the job to `status`, recording the outcome fields that belong
    /// to it. `pr_url` only survives on `completed`, `error` only on `failed`.
    pub(crate) fn record(&mut self, status: JobStatus, pr_url: Option<&str>, error: Option<&str>) {
        self.status = status;
        match status {
            JobStatus::Completed => {
                self.pr_url = pr_url.map(str::to_string);
                self.error = None;
            }
            JobStatus::Failed => {
                self.pr_url = None;
                self.error = error.map(str::to_string);
            }
            _ => {
                self.pr_url = None;
                self.error = None;
            }
        }
        self.updated_at = Utc::now();
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Allocates an opaque `job-<hex>` identifier.
pub(crate) fn new_job_id() -> String {
    format!("job-{}", Uuid::new_v4().simple())
}
