use std::cell::RefCell;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;

use agent_runner::cli::{Cli, Command};
use agent_runner::config::RunnerConfig;
use agent_runner::demo;
use agent_runner::notify::CallbackNotifier;
use agent_runner::ui::{StepProgress, print_job, print_verdict};
use agent_runner::validation::{is_valid_callback_url, is_valid_repo_path};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    agent_runner::logging::init(cli.verbose);

    let config = RunnerConfig::load_from(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;

    match cli.command {
        Command::Demo {
            upstream_repo,
            prompt,
            callback_url,
        } => run_demo(&config, &upstream_repo, &prompt, callback_url.as_deref()).await,
        Command::Sign(payload) => {
            let body = payload.read().context("failed to read payload")?;
            let Some(signature) = config.webhook_gate().sign(&body) else {
                bail!("no webhook secret configured; set webhook_secret or AGENT_RUNNER_WEBHOOK_SECRET");
            };
            println!("{signature}");
            Ok(())
        }
        Command::Verify { payload, signature } => {
            let body = payload.read().context("failed to read payload")?;
            if config.webhook_gate().verify(&body, &signature) {
                print_verdict(true, "signature accepted");
                Ok(())
            } else {
                print_verdict(false, "signature rejected");
                bail!("webhook signature verification failed");
            }
        }
        Command::Validate {
            upstream_repo,
            callback_url,
        } => {
            let repo_ok = is_valid_repo_path(&upstream_repo);
            print_verdict(repo_ok, &format!("repository '{upstream_repo}'"));
            let url_ok = callback_url.as_deref().is_none_or(|url| {
                let ok = is_valid_callback_url(url);
                print_verdict(ok, &format!("callback_url '{url}'"));
                ok
            });
            if !(repo_ok && url_ok) {
                bail!("validation failed");
            }
            Ok(())
        }
    }
}

async fn run_demo(
    config: &RunnerConfig,
    upstream_repo: &str,
    prompt: &str,
    callback_url: Option<&str>,
) -> Result<()> {
    let progress: RefCell<Option<StepProgress>> = RefCell::new(None);
    let result = demo::run(config, upstream_repo, prompt, callback_url, |job| {
        let mut slot = progress.borrow_mut();
        if let Some(p) = slot.as_ref() {
            p.step(job);
        } else {
            *slot = Some(StepProgress::start(job));
        }
    })
    .await;
    if let Some(p) = progress.into_inner() {
        p.finish();
    }
    let job = result?;
    print_job(&job);

    if job.callback_url.is_some() {
        let notifier = CallbackNotifier::new(
            config.webhook_gate(),
            Duration::from_secs(config.notify_timeout_secs),
        )?;
        notifier
            .notify(&job)
            .await
            .context("failed to notify callback_url")?;
        print_verdict(true, "callback delivered");
    }
    Ok(())
}
