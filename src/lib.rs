//! Lifecycle tracking for fork-and-automate agent jobs.
//!
//! A job forks an upstream repository, triggers an external automation run
//! against the fork with a prompt, and finishes when the run reports back
//! through a signed callback. [`store::JobStore`] owns the jobs and their
//! state machine; [`webhook::WebhookGate`] decides which callbacks to trust.

pub mod cli;
pub mod config;
pub mod demo;
pub mod error;
pub mod logging;
pub mod notify;
pub mod orchestrator;
pub mod state_machine;
pub mod store;
pub mod ui;
pub mod validation;
pub mod webhook;

pub use error::{CallbackError, RunnerError, SubmitError};
pub use state_machine::{Job, JobStatus, TransitionPolicy};
pub use store::JobStore;
pub use webhook::WebhookGate;
