//! In-process walk through a job's full lifecycle.
//!
//! Submits a job, launches it with the dry-run pipeline, then plays the
//! automation runner's part: signed `running` and `completed` callbacks that
//! go through the trust gate before they reach the store.

use tracing::info;
use uuid::Uuid;

use crate::config::RunnerConfig;
use crate::error::RunnerError;
use crate::orchestrator::{DryRunPipeline, Orchestrator};
use crate::state_machine::Job;
use crate::store::JobStore;
use crate::webhook::{CallbackPayload, WebhookGate};

/// Runs a job to completion, calling `on_step` after every recorded change.
pub async fn run(
    config: &RunnerConfig,
    upstream_repo: &str,
    prompt: &str,
    callback_url: Option<&str>,
    on_step: impl Fn(&Job),
) -> Result<Job, RunnerError> {
    let store = JobStore::with_policy(config.transition_policy());
    let job = store.submit(upstream_repo, prompt, callback_url)?;
    on_step(&job);

    let orchestrator = Orchestrator::new(store.clone(), DryRunPipeline::new(&config.fork_owner));
    let job = orchestrator
        .launch(&job.job_id)
        .await?
        .ok_or_else(|| RunnerError::JobNotFound(job.job_id.clone()))?;
    on_step(&job);

    let gate = demo_gate(config);
    let pr_url = format!("https://github.com/{}/pull/1", job.upstream_repo);
    let mut job = job;
    for (status, pr_url) in [("running", None), ("completed", Some(pr_url))] {
        let payload = CallbackPayload {
            job_id: job.job_id.clone(),
            status: status.to_string(),
            pr_url,
            error: None,
        };
        let body = serde_json::to_vec(&payload)?;
        let signature = gate.sign(&body).unwrap_or_default();

        let accepted = gate.accept(&body, &signature)?;
        job = store
            .apply_callback(
                &accepted.job_id,
                &accepted.status,
                accepted.pr_url.as_deref(),
                accepted.error.as_deref(),
            )?
            .ok_or_else(|| RunnerError::JobNotFound(accepted.job_id.clone()))?;
        on_step(&job);
    }

    Ok(job)
}

// A gate that can sign: the configured one when it can, otherwise a
// throwaway secret so the demo never needs insecure mode.
fn demo_gate(config: &RunnerConfig) -> WebhookGate {
    let gate = config.webhook_gate();
    if gate.has_secret() {
        return gate;
    }
    info!("no webhook secret configured, signing demo callbacks with a throwaway secret");
    WebhookGate::new(Some(Uuid::new_v4().to_string()), false)
}
