//! CLI output formatting

use crate::core::{Execution, ExecutionEvent, FinalStatus, Step};
use console::Emoji;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static SPINNER: Emoji<'_, '_> = Emoji("⏳ ", "~ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "!");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");

/// Create a spinner shown while an execution is in flight
pub fn create_spinner(message: String) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    let template = ProgressStyle::default_spinner()
        .template("{spinner:.green} [{elapsed_precise}] {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    spinner.set_style(template);
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Format a final status for display
pub fn format_final_status(status: FinalStatus) -> String {
    match status {
        FinalStatus::Success => style("SUCCESS").green().to_string(),
        FinalStatus::Failure => style("FAILURE").red().to_string(),
        FinalStatus::Cancelled => style("CANCELLED").yellow().to_string(),
        FinalStatus::TimedOut => style("TIMED_OUT").red().to_string(),
    }
}

/// Format a step for display
pub fn format_step(step: &Step) -> String {
    match step {
        Step::Intermediary(step) => format!(
            "{} {} {}",
            SPINNER,
            style(step.status).cyan(),
            style(&step.message).dim()
        ),
        Step::Final(step) => {
            let icon = if step.status.is_success() { CHECK } else { CROSS };
            format!(
                "{} {} {}",
                icon,
                format_final_status(step.status),
                style(&step.message).dim()
            )
        }
    }
}

/// Format an execution event for display
pub fn format_execution_event(event: &ExecutionEvent) -> String {
    let mut lines = Vec::new();
    if let Some(step) = event.step() {
        lines.push(format_step(&step));
    }
    for output in event.output_files() {
        lines.push(format!(
            "  {} {} ({} bytes) ← [{}]",
            INFO,
            style(&output.name).bold(),
            output.size_bytes,
            output.input_correlation_ids.join(", ")
        ));
    }
    lines.join("\n")
}

/// Format an execution for history listings
pub fn format_execution_summary(exec: &Execution) -> String {
    let status = match exec.final_step() {
        Some(step) => format_final_status(step.status),
        None => exec
            .current_step()
            .map(|s| style(s.status_label()).yellow().to_string())
            .unwrap_or_else(|| style("PENDING").dim().to_string()),
    };

    format!(
        "{} - {} - {} - {} steps, {} outputs - {}",
        style(short_id(exec)).dim(),
        style(&exec.engine).bold(),
        status,
        exec.steps.len(),
        exec.output_files.len(),
        style(exec.created.to_rfc3339()).dim()
    )
}

/// First eight characters of the execution id
pub fn short_id(exec: &Execution) -> String {
    exec.id.to_string().chars().take(8).collect()
}
