//! Runner configuration loaded from `agent-runner.toml`.
//!
//! [`RunnerConfig`] holds every tunable setting. Keys missing from the file
//! fall back to defaults. `AGENT_RUNNER_WEBHOOK_SECRET` and
//! `AGENT_RUNNER_ALLOW_INSECURE_WEBHOOKS` take precedence over the file.

use serde::Deserialize;
use std::path::Path;

use crate::error::RunnerError;
use crate::state_machine::TransitionPolicy;
use crate::webhook::WebhookGate;

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "agent-runner.toml";

const SECRET_ENV: &str = "AGENT_RUNNER_WEBHOOK_SECRET";
const INSECURE_ENV: &str = "AGENT_RUNNER_ALLOW_INSECURE_WEBHOOKS";

#[derive(Clone, Deserialize)]
pub struct RunnerConfig {
    /// Shared secret the automation pipeline signs callbacks with.
    #[serde(default)]
    pub webhook_secret: Option<String>,

    /// Accept unsigned callbacks when no secret is set. Local development only.
    #[serde(default)]
    pub allow_insecure_webhooks: bool,

    /// Reject callback updates that skip lifecycle steps or reopen finished jobs.
    #[serde(default)]
    pub strict_transitions: bool,

    /// Timeout for posting a finished job to its callback URL.
    #[serde(default = "default_notify_timeout_secs")]
    pub notify_timeout_secs: u64,

    /// Owner the dry-run pipeline pretends to fork into.
    #[serde(default = "default_fork_owner")]
    pub fork_owner: String,
}

fn default_notify_timeout_secs() -> u64 {
    10
}

fn default_fork_owner() -> String {
    "agent-runner-bot".to_string()
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            webhook_secret: None,
            allow_insecure_webhooks: false,
            strict_transitions: false,
            notify_timeout_secs: default_notify_timeout_secs(),
            fork_owner: default_fork_owner(),
        }
    }
}

impl std::fmt::Debug for RunnerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunnerConfig")
            .field("webhook_secret", &self.webhook_secret.as_ref().map(|_| "<redacted>"))
            .field("allow_insecure_webhooks", &self.allow_insecure_webhooks)
            .field("strict_transitions", &self.strict_transitions)
            .field("notify_timeout_secs", &self.notify_timeout_secs)
            .field("fork_owner", &self.fork_owner)
            .finish()
    }
}

impl RunnerConfig {
    /// Loads `agent-runner.toml` from the working directory.
    pub fn load() -> Result<Self, RunnerError> {
        Self::load_from(Path::new(DEFAULT_CONFIG_PATH))
    }

    /// Loads the file at `path`, using defaults when it does not exist,
    /// then applies environment overrides.
    pub fn load_from(path: &Path) -> Result<Self, RunnerError> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str::<RunnerConfig>(&contents)?
        } else {
            Self::default()
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Applies overrides from `lookup`, normally the process environment.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(secret) = lookup(SECRET_ENV)
            && !secret.is_empty()
        {
            self.webhook_secret = Some(secret);
        }
        if let Some(flag) = lookup(INSECURE_ENV) {
            self.allow_insecure_webhooks = matches!(
                flag.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes"
            );
        }
        if self.webhook_secret.as_deref() == Some("") {
            self.webhook_secret = None;
        }
    }

    fn validate(&self) -> Result<(), RunnerError> {
        if self.notify_timeout_secs == 0 {
            return Err(RunnerError::Config(
                "notify_timeout_secs must be greater than zero".into(),
            ));
        }
        if self.fork_owner.trim().is_empty() {
            return Err(RunnerError::Config("fork_owner must not be empty".into()));
        }
        Ok(())
    }

    pub fn webhook_gate(&self) -> WebhookGate {
        WebhookGate::new(self.webhook_secret.clone(), self.allow_insecure_webhooks)
    }

    pub fn transition_policy(&self) -> TransitionPolicy {
        if self.strict_transitions {
            TransitionPolicy::Strict
        } else {
            TransitionPolicy::Permissive
        }
    }
}
