//! CLI output formatting

use crate::core::ExecutionStatus;
use crate::execution::ExecutionEvent;
use crate::model::{find_model, model_capabilities};
use crate::persistence::ExecutionSummary;
use crate::stations::{SevenStationsExecution, Station};
use console::Emoji;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

pub use console::style;

pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static SPINNER: Emoji<'_, '_> = Emoji("⏳ ", "~ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static CACHE: Emoji<'_, '_> = Emoji("📦 ", "* ");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");

/// Create a progress bar
pub fn create_progress_bar(total: usize) -> ProgressBar {
    let progress = ProgressBar::new(total as u64);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    progress.set_style(style);
    progress.enable_steady_tick(Duration::from_millis(100));
    progress
}

/// Format an execution status for display
pub fn format_status(status: ExecutionStatus) -> String {
    match status {
        ExecutionStatus::Pending => style("PENDING").dim().to_string(),
        ExecutionStatus::Running => style("RUNNING").yellow().to_string(),
        ExecutionStatus::Completed => style("COMPLETED").green().to_string(),
        ExecutionStatus::Failed => style("FAILED").red().to_string(),
    }
}

fn short_id(id: &str) -> &str {
    // Generated ids end in an 8-char uuid fragment
    id.rsplit('-').next().filter(|s| s.len() == 8).unwrap_or(id)
}

/// Format execution summary for display
pub fn format_execution_summary(summary: &ExecutionSummary) -> String {
    let status_icon = match summary.status {
        ExecutionStatus::Completed => CHECK,
        ExecutionStatus::Failed => CROSS,
        ExecutionStatus::Running => SPINNER,
        ExecutionStatus::Pending => INFO,
    };

    format!(
        "{} {} - {} - {} - {} ({} ok, {} failed of {}) - {}",
        status_icon,
        style(short_id(&summary.execution_id)).dim(),
        style(&summary.pipeline_name).bold(),
        summary.started_at.format("%Y-%m-%d %H:%M:%S"),
        format_status(summary.status),
        summary.completed_steps,
        summary.failed_steps,
        summary.total_steps,
        style(format!("{:.0}%", summary.progress)).cyan()
    )
}

/// Format an execution event for display
pub fn format_execution_event(event: &ExecutionEvent) -> String {
    match event {
        ExecutionEvent::PipelineStarted {
            execution_id,
            total_steps,
        } => format!(
            "{} Starting {} ({} stations)",
            ROCKET,
            style(execution_id).bold(),
            total_steps
        ),
        ExecutionEvent::StepStarted { step_id, .. } => {
            format!("{} {}", SPINNER, style(step_id).cyan())
        }
        ExecutionEvent::StepCompleted {
            step_id,
            success,
            served_from_cache,
            duration_ms,
            progress,
            ..
        } => {
            let icon = if *success { CHECK } else { CROSS };
            let name = if *success {
                style(step_id).green()
            } else {
                style(step_id).red()
            };
            let cached = if *served_from_cache {
                format!(" {}cached", CACHE)
            } else {
                String::new()
            };
            format!(
                "{} {} {}{} [{:.0}%]",
                icon,
                name,
                style(format!("{}ms", duration_ms)).dim(),
                cached,
                progress
            )
        }
        ExecutionEvent::StepDiscarded { step_id, .. } => format!(
            "{} {} finished after cancellation; result dropped",
            INFO,
            style(step_id).dim()
        ),
        ExecutionEvent::PipelineFinished {
            execution_id,
            status,
            progress,
        } => format!(
            "{} {} {} ({:.0}%)",
            INFO,
            style(execution_id).dim(),
            format_status(*status),
            progress
        ),
    }
}

/// Format a station catalogue entry
pub fn format_station(index: usize, station: &Station) -> String {
    format!(
        "{:>2}. {} {} - {}\n    {} ~{}s [{}]",
        index + 1,
        style(&station.name).bold(),
        style(format!("({})", station.id)).dim(),
        station.kind,
        station.description,
        station.estimated_duration_ms / 1000,
        station.capabilities.join(", ")
    )
}

/// Describe a catalogue model: display name, token limit and capabilities
pub fn format_model(key: &str) -> String {
    match find_model(key) {
        Some(model) => format!(
            "{} ({}, {} max tokens) [{}]",
            style(model.key).bold(),
            model.name,
            model.max_tokens,
            model_capabilities(key).join(", ")
        ),
        None => format!("{} (unknown)", style(key).bold()),
    }
}

/// Format the station results of a finished run
pub fn format_seven_stations_report(execution: &SevenStationsExecution, max_lines: usize) -> String {
    let mut report = String::new();

    for station in &execution.stations {
        let icon = if station.success { CHECK } else { CROSS };
        report.push_str(&format!(
            "\n{} {} {}\n",
            icon,
            style(&station.station_name).bold(),
            style(format!("{}ms", station.duration_ms)).dim()
        ));
        match (&station.result, &station.error) {
            (Some(text), _) => report.push_str(&format_output(text, max_lines)),
            (None, Some(error)) => report.push_str(&style(error).red().to_string()),
            (None, None) => {}
        }
        report.push('\n');
    }

    let verdict = if execution.overall_success {
        style("completed").green().to_string()
    } else {
        style("failed").red().to_string()
    };
    report.push_str(&format!(
        "\n{} {} in {:.1}s ({} of {} stations failed)",
        INFO,
        verdict,
        execution.total_duration_ms as f64 / 1000.0,
        execution.failed_stations().len(),
        execution.stations.len()
    ));
    if let Some(failure) = &execution.failure {
        report.push_str(&format!("\n{} {}", CROSS, style(failure).red()));
    }

    report
}

/// Format step output with truncation
pub fn format_output(output: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = output.lines().collect();

    if lines.len() <= max_lines {
        output.to_string()
    } else {
        let truncated = lines[..max_lines].join("\n");
        format!(
            "{}\n{}... ({} more lines)",
            truncated,
            style("[truncated]").dim(),
            lines.len() - max_lines
        )
    }
}
