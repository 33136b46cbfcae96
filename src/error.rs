use thiserror::Error;

use crate::state_machine::JobStatus;

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Submission rejected: {0}")]
    Submit(#[from] SubmitError),

    #[error("Callback rejected: {0}")]
    Callback(#[from] CallbackError),

    #[error("Webhook rejected: {0}")]
    Webhook(#[from] WebhookError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Callback notification failed: {0}")]
    Notify(#[from] NotifyError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Input errors raised while validating a job submission.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("Invalid repository path '{0}', expected owner/repo")]
    InvalidRepository(String),

    #[error("Prompt cannot be empty")]
    EmptyPrompt,

    #[error("Invalid callback_url '{0}', expected an http(s) URL")]
    InvalidCallbackUrl(String),
}

/// Errors raised while applying a status update to a stored job.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallbackError {
    #[error("unknown job status '{0}'")]
    UnknownStatus(String),

    #[error("job {job_id} cannot move from {from} to {to}")]
    IllegalTransition {
        job_id: String,
        from: JobStatus,
        to: JobStatus,
    },
}

/// Errors raised by the webhook trust gate when accepting a callback body.
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("webhook signature verification failed")]
    InvalidSignature,

    #[error("malformed callback payload: {0}")]
    MalformedPayload(#[source] serde_json::Error),
}

/// Failures reported by the external fork/trigger pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    #[error("fork failed: {0}")]
    Fork(String),

    #[error("trigger failed: {0}")]
    Trigger(String),
}

/// Errors raised while posting a job to its callback URL.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("callback endpoint returned status {status}")]
    Rejected { status: u16 },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("failed to encode job: {0}")]
    Encode(#[from] serde_json::Error),
}
