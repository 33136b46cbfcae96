//! Outbound notification of finished jobs.
//!
//! [`CallbackNotifier`] posts a job's serialized form to the `callback_url`
//! the submitter supplied. Bodies are signed with the webhook secret when one
//! is configured, using the same `sha256=<hex>` scheme the trust gate checks.

use std::time::Duration;

use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, info};

use crate::error::NotifyError;
use crate::state_machine::Job;
use crate::webhook::{SIGNATURE_HEADER, WebhookGate};

pub struct CallbackNotifier {
    client: Client,
    gate: WebhookGate,
}

impl CallbackNotifier {
    pub fn new(gate: WebhookGate, timeout: Duration) -> Result<Self, NotifyError> {
        let client = Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()?;
        Ok(Self { client, gate })
    }

    /// Posts `job` to its callback URL.
    ///
    /// Returns `Ok(false)` without sending anything when the job has no
    /// callback URL or has not finished yet.
    pub async fn notify(&self, job: &Job) -> Result<bool, NotifyError> {
        let Some(url) = job.callback_url.as_deref() else {
            return Ok(false);
        };
        if !job.is_terminal() {
            debug!(job_id = %job.job_id, status = %job.status, "job still running, not notifying");
            return Ok(false);
        }

        let body = serde_json::to_vec(job)?;
        let mut request = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json");
        if let Some(signature) = self.gate.sign(&body) {
            request = request.header(SIGNATURE_HEADER, signature);
        }

        let response = request.body(body).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
            });
        }

        info!(job_id = %job.job_id, status = %job.status, "callback delivered");
        Ok(true)
    }
}
