//! Command-line interface for agent-runner, built on clap.
//!
//! Defines [`Cli`] with the [`Command`] subcommands (demo, sign, verify,
//! validate) and the global `--config` and `--verbose` flags.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::DEFAULT_CONFIG_PATH;

/// agent-runner: track fork-and-automate agent jobs and their signed callbacks.
#[derive(Debug, Parser)]
#[command(name = "agent-runner", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Path to the TOML configuration file.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Enable debug logging for agent-runner.
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a job through its whole lifecycle in-process with a dry-run pipeline.
    Demo {
        /// Upstream repository as owner/repo.
        upstream_repo: String,

        /// Instructions for the automation.
        prompt: String,

        /// URL notified once the job finishes.
        #[arg(long)]
        callback_url: Option<String>,
    },

    /// Print the signature header for a payload.
    Sign(PayloadArgs),

    /// Check a signature header against a payload.
    Verify {
        #[command(flatten)]
        payload: PayloadArgs,

        /// Signature header value, e.g. sha256=<hex>.
        #[arg(long)]
        signature: String,
    },

    /// Validate submission inputs without creating a job.
    Validate {
        /// Upstream repository as owner/repo.
        upstream_repo: String,

        /// Callback URL to check.
        #[arg(long)]
        callback_url: Option<String>,
    },
}

/// Where the raw payload bytes come from.
#[derive(Debug, Args)]
#[group(required = true, multiple = false)]
pub struct PayloadArgs {
    /// Payload given inline. Signed exactly as typed.
    #[arg(long)]
    pub payload: Option<String>,

    /// File holding the payload. Signed byte for byte.
    #[arg(long)]
    pub file: Option<PathBuf>,
}

impl PayloadArgs {
    pub fn read(&self) -> std::io::Result<Vec<u8>> {
        match (&self.payload, &self.file) {
            (Some(text), _) => Ok(text.as_bytes().to_vec()),
            (None, Some(path)) => std::fs::read(path),
            (None, None) => Ok(Vec::new()),
        }
    }
}
