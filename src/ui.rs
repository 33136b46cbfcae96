//! Terminal output for the agent-runner CLI: spinners and colored status.
//!
//! Uses `indicatif` for the per-step spinner and `console` for styling.
//! [`StepProgress`] follows a job through its lifecycle in the terminal.

use std::time::Duration;

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::state_machine::{Job, JobStatus};

/// Spinner that tracks a job as it moves through its lifecycle.
pub struct StepProgress {
    pb: ProgressBar,
    green: Style,
    dim: Style,
}

impl StepProgress {
    pub fn start(job: &Job) -> Self {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            pb.set_style(style);
        }
        pb.set_message(format!("{}: {}", job.status, job.upstream_repo));
        pb.enable_steady_tick(Duration::from_millis(100));

        Self {
            pb,
            green: Style::new().green(),
            dim: Style::new().dim(),
        }
    }

    /// Prints a finished step above the spinner and shows the new status.
    pub fn step(&self, job: &Job) {
        self.pb.println(format!(
            "  {} {} {}",
            self.green.apply_to("✓"),
            job.status,
            self.dim.apply_to(job.updated_at.to_rfc3339())
        ));
        self.pb.set_message(format!("{}: {}", job.status, job.upstream_repo));
    }

    pub fn finish(&self) {
        self.pb.finish_and_clear();
    }
}

/// Style used for a status: green for success, red for failure, yellow
/// for cancellation, cyan while live.
pub fn status_style(status: JobStatus) -> Style {
    match status {
        JobStatus::Completed => Style::new().green().bold(),
        JobStatus::Failed => Style::new().red().bold(),
        JobStatus::Cancelled => Style::new().yellow().bold(),
        _ => Style::new().cyan(),
    }
}

/// Prints a job summary line followed by its serialized form.
pub fn print_job(job: &Job) {
    let style = status_style(job.status);
    println!();
    println!(
        "{} {}",
        style.apply_to(format!("─── {} ───", job.status)),
        job.job_id
    );
    println!("{}", serde_json::to_string_pretty(job).unwrap_or_default());
}

/// Prints a verdict line: green check or red cross.
pub fn print_verdict(ok: bool, message: &str) {
    if ok {
        println!("  {} {message}", Style::new().green().bold().apply_to("✓"));
    } else {
        println!("  {} {message}", Style::new().red().bold().apply_to("✗"));
    }
}
