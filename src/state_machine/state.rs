use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CallbackError;

/// The lifecycle states of an agent job.
///
/// Each job flows through: PENDING → FORKING → FORK_READY → TRIGGERED →
/// RUNNING → {COMPLETED | FAILED | CANCELLED}
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Forking,
    ForkReady,
    Triggered,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [JobStatus; 8] = [
        JobStatus::Pending,
        JobStatus::Forking,
        JobStatus::ForkReady,
        JobStatus::Triggered,
        JobStatus::Running,
        JobStatus::Completed,
        JobStatus::Failed,
        JobStatus::Cancelled,
    ];

    /// The lower-case token used on the wire and in callbacks.
    pub const fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Forking => "forking",
            JobStatus::ForkReady => "fork_ready",
            JobStatus::Triggered => "triggered",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }

    /// States reachable from `self` in one step.
    ///
    /// Every non-terminal state may fail or be cancelled. A job that was
    /// triggered may complete directly, since the completion callback can
    /// overtake the `running` notification.
    pub const fn successors(self) -> &'static [JobStatus] {
        match self {
            JobStatus::Pending => &[JobStatus::Forking, JobStatus::Failed, JobStatus::Cancelled],
            JobStatus::Forking => &[JobStatus::ForkReady, JobStatus::Failed, JobStatus::Cancelled],
            JobStatus::ForkReady => &[
                JobStatus::Triggered,
                JobStatus::Failed,
                JobStatus::Cancelled,
            ],
            JobStatus::Triggered => &[
                JobStatus::Running,
                JobStatus::Completed,
                JobStatus::Failed,
                JobStatus::Cancelled,
            ],
            JobStatus::Running => &[JobStatus::Completed, JobStatus::Failed, JobStatus::Cancelled],
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled => &[],
        }
    }

    pub fn can_transition_to(self, next: JobStatus) -> bool {
        self.successors().contains(&next)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = CallbackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        JobStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| CallbackError::UnknownStatus(s.to_string()))
    }
}

/// How the store treats callback updates that do not follow the
/// lifecycle's allowed edges.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TransitionPolicy {
    /// Any status may overwrite any other, terminal ones included.
    #[default]
    Permissive,
    /// Only edges listed by [`JobStatus::successors`] are accepted.
    Strict,
}

impl TransitionPolicy {
    /// Checks the `from → to` edge under this policy.
    pub fn check(self, job_id: &str, from: JobStatus, to: JobStatus) -> Result<(), CallbackError> {
        match self {
            TransitionPolicy::Permissive => Ok(()),
            TransitionPolicy::Strict if from.can_transition_to(to) => Ok(()),
            TransitionPolicy::Strict => Err(CallbackError::IllegalTransition {
                job_id: job_id.to_string(),
                from,
                to,
            }),
        }
    }
}
