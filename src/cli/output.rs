//! CLI output formatting and the interactive tool confirmation prompt

use crate::core::RunStatus;
use crate::engine::RunEvent;
use crate::gate::Confirmer;
use crate::history::RunRecord;
use async_trait::async_trait;
use console::{Emoji, Term};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tracing::warn;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static SPINNER: Emoji<'_, '_> = Emoji("⏳ ", "~ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "! ");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");
pub static BLEND: Emoji<'_, '_> = Emoji("🧪 ", "+ ");

/// Spinner shown while models are generating
pub fn create_spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(spinner_style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}")
    {
        spinner.set_style(spinner_style);
    }
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Format a run status for display
pub fn format_status(status: RunStatus) -> String {
    match status {
        RunStatus::Ok => style("OK").green().to_string(),
        RunStatus::Partial => style("PARTIAL").yellow().to_string(),
        RunStatus::Failed => style("FAILED").red().to_string(),
    }
}

/// Status string as stored in history ("ok"/"partial"/"failed")
pub fn format_status_str(status: &str) -> String {
    match status {
        "ok" => style("OK").green().to_string(),
        "partial" => style("PARTIAL").yellow().to_string(),
        "failed" => style("FAILED").red().to_string(),
        other => style(other.to_uppercase()).dim().to_string(),
    }
}

/// One-line summary of a historical run
pub fn format_run_summary(record: &RunRecord) -> String {
    let status_icon = match record.status.as_str() {
        "ok" => CHECK,
        "failed" => CROSS,
        _ => WARN,
    };
    let ok_steps = record.steps.iter().filter(|s| s.error.is_none()).count();

    format!(
        "{} {} - {} - {} ({}/{} steps) - {}",
        status_icon,
        style(&record.run_id.to_string()[..8]).dim(),
        style(&record.pipeline).bold(),
        format_status_str(&record.status),
        ok_steps,
        record.steps.len(),
        style(record.started_at.format("%Y-%m-%d %H:%M:%S").to_string()).dim()
    )
}

/// Format a run event for display
pub fn format_run_event(event: &RunEvent) -> String {
    match event {
        RunEvent::RunStarted {
            run_id,
            pipeline,
            kind,
            total_steps,
        } => format!(
            "{} Starting {} pipeline {} with {} steps ({})",
            ROCKET,
            kind,
            style(pipeline).bold(),
            style(total_steps).cyan(),
            style(&run_id.to_string()[..8]).dim()
        ),
        RunEvent::StepStarted {
            index,
            label,
            model_id,
        } => format!(
            "{} [{}] {} ({})",
            SPINNER,
            index + 1,
            style(label).cyan(),
            style(model_id).dim()
        ),
        RunEvent::StepCompleted { index, label, .. } => {
            format!("{} [{}] {} done", CHECK, index + 1, style(label).cyan())
        }
        RunEvent::StepFailed {
            index,
            label,
            error,
        } => format!(
            "{} [{}] {} failed: {}",
            CROSS,
            index + 1,
            style(label).cyan(),
            style(error).red()
        ),
        RunEvent::SynthesisStarted { model_id } => format!(
            "{} Synthesizing with {}",
            BLEND,
            style(model_id).bold()
        ),
        RunEvent::RunCompleted { status, .. } => {
            format!("{} Run finished: {}", INFO, format_status(*status))
        }
    }
}

/// Interactive y/N prompt for gate ASK decisions
pub struct ConsoleConfirmer;

#[async_trait]
impl Confirmer for ConsoleConfirmer {
    async fn confirm(&self, action: &str, args: &str) -> bool {
        let prompt = if args.is_empty() {
            format!("{} Allow tool '{}'? [y/N] ", WARN, style(action).bold())
        } else {
            format!(
                "{} Allow tool '{}' with args '{}'? [y/N] ",
                WARN,
                style(action).bold(),
                style(args).dim()
            )
        };

        // Terminal reads block; keep them off the runtime workers
        let answer = tokio::task::spawn_blocking(move || {
            let term = Term::stderr();
            if term.write_str(&prompt).is_err() {
                return None;
            }
            term.read_line().ok()
        })
        .await;

        match answer {
            Ok(Some(line)) => {
                let line = line.trim().to_lowercase();
                line == "y" || line == "yes"
            }
            Ok(None) => false,
            Err(e) => {
                warn!("Confirmation prompt failed: {e}");
                false
            }
        }
    }
}
