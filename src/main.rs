mod cli;
mod core;
mod engine;
mod gate;
mod history;
mod media;
mod model;
mod store;
mod templates;

use anyhow::{Context, Result};
use cli::commands::{HistoryCommand, ListCommand, RunCommand, ShowCommand, ValidateCommand};
use cli::output::*;
use cli::{Cli, Command};
use crate::core::{PipelineSpec, RunStatus, UserInput};
use engine::Engine;
use gate::ToolMode;
use history::{HistoryStore, RunRecord};
use model::{InvokerConfig, OllamaInvoker};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use store::{FilePipelineStore, PipelineStore};
use templates::TemplateStore;
use tracing::{warn, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")?;

    match &cli.command {
        Command::Run(cmd) => run_pipeline(cmd, &cli).await?,
        Command::List(cmd) => list_pipelines(cmd)?,
        Command::Show(cmd) => show_pipeline(cmd)?,
        Command::Validate(cmd) => validate_pipeline(cmd)?,
        Command::History(cmd) => show_history(cmd).await?,
    }

    Ok(())
}

async fn run_pipeline(cmd: &RunCommand, cli: &Cli) -> Result<()> {
    let input = build_input(cmd)?;
    let tool_mode = if cmd.no_tools {
        ToolMode::Forbidden
    } else if cmd.yolo {
        ToolMode::Yolo
    } else {
        ToolMode::Confirm
    };

    let mut config = InvokerConfig::new();
    if let Some(endpoint) = &cli.endpoint {
        config = config.with_endpoint(endpoint.clone());
    }
    let invoker = Arc::new(OllamaInvoker::new(config).context("Failed to set up Ollama client")?);
    let store = Arc::new(FilePipelineStore::new());

    let mut engine = Engine::new(invoker, store).with_confirmer(Arc::new(ConsoleConfirmer));
    if let Some(max_parallel) = cmd.max_parallel {
        engine = engine.with_max_parallel(max_parallel);
    }
    // One spinner at a time; parallel branches share it via the message
    let spinner = Arc::new(std::sync::Mutex::new(None::<indicatif::ProgressBar>));
    engine.add_event_handler(move |event| {
        let Ok(mut active) = spinner.lock() else {
            return;
        };
        match &event {
            engine::RunEvent::StepStarted { .. } | engine::RunEvent::SynthesisStarted { .. } => {
                if let Some(bar) = active.take() {
                    bar.finish_and_clear();
                }
                *active = Some(create_spinner(&format_run_event(&event)));
            }
            _ => {
                if let Some(bar) = active.take() {
                    bar.finish_and_clear();
                }
                println!("{}", format_run_event(&event));
            }
        }
    });

    // First Ctrl-C cancels cooperatively, a second one kills the process
    let cancel = engine.cancel_flag();
    tokio::spawn(async move {
        loop {
            if tokio::signal::ctrl_c().await.is_err() {
                return;
            }
            if cancel.swap(true, Ordering::SeqCst) {
                std::process::exit(130);
            }
            eprintln!("\n{} Cancelling after the current step...", WARN);
        }
    });

    println!();
    let result = engine
        .run_pipeline(&cmd.pipeline, input, tool_mode)
        .await?;

    if !result.final_text.is_empty() {
        println!("\n{}", result.final_text);
    }

    if !cmd.no_history {
        if let Err(e) = save_history(&RunRecord::from_result(&result)).await {
            warn!("Failed to save run to history: {e}");
        }
    }

    match result.status {
        RunStatus::Ok => {
            println!(
                "\n{} {} completed {}",
                CHECK,
                style(&result.pipeline).bold(),
                style("successfully").green()
            );
        }
        RunStatus::Partial => {
            println!(
                "\n{} {} completed {} ({} of {} steps failed)",
                WARN,
                style(&result.pipeline).bold(),
                style("partially").yellow(),
                result.failed_steps().count(),
                result.steps.len()
            );
        }
        RunStatus::Failed => {
            println!(
                "\n{} {} {}",
                CROSS,
                style(&result.pipeline).bold(),
                style("failed").red()
            );
            for step in result.failed_steps() {
                if let Some(error) = &step.error {
                    eprintln!("  [{}] {}: {}", step.index + 1, step.role, error);
                }
            }
            std::process::exit(1);
        }
    }

    Ok(())
}

fn build_input(cmd: &RunCommand) -> Result<UserInput> {
    let prompt = match &cmd.template {
        Some(name) => TemplateStore::new()
            .apply(name, &cmd.prompt)
            .with_context(|| format!("Unknown template '{name}'"))?,
        None => cmd.prompt.clone(),
    };

    let mut attachments = cmd.attach.clone();
    if cmd.latest_screenshot {
        match media::latest_screenshot() {
            Some(path) => {
                println!("{} Attaching screenshot: {}", INFO, style(path.display()).dim());
                attachments.push(path);
            }
            None => anyhow::bail!("No screenshot found in the Pictures folder"),
        }
    }

    let mut input = UserInput::new(prompt).with_attachments(attachments);
    if let Some(system) = &cmd.system {
        input = input.with_system_prompt(system.clone());
    }
    Ok(input)
}

fn list_pipelines(cmd: &ListCommand) -> Result<()> {
    let store = FilePipelineStore::new();
    let pipelines = store.list();

    if cmd.json {
        let data: Vec<_> = pipelines
            .iter()
            .map(|p| {
                serde_json::json!({
                    "name": p.name,
                    "description": p.description,
                    "kind": p.kind.to_string(),
                    "source": p.source.to_string(),
                })
            })
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({ "pipelines": data }))?
        );
        return Ok(());
    }

    println!("{} Available pipelines:", INFO);
    for pipeline in &pipelines {
        println!(
            "  {} [{}] ({}) {}",
            style(&pipeline.name).bold(),
            pipeline.kind,
            style(pipeline.source).dim(),
            pipeline.description.as_deref().unwrap_or("")
        );
    }

    Ok(())
}

fn show_pipeline(cmd: &ShowCommand) -> Result<()> {
    let store = FilePipelineStore::new();
    let spec = store
        .resolve(&cmd.pipeline)
        .with_context(|| format!("Pipeline '{}' not found", cmd.pipeline))?;

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&spec)?);
        return Ok(());
    }

    print_spec(&spec);
    Ok(())
}

fn validate_pipeline(cmd: &ValidateCommand) -> Result<()> {
    println!("{} Validating {}...", INFO, cmd.file.display());

    let spec = match PipelineSpec::from_file(&cmd.file).and_then(|spec| {
        spec.validate()?;
        Ok(spec)
    }) {
        Ok(spec) => spec,
        Err(e) => {
            println!("{} Validation failed:", CROSS);
            println!("  {}", style(e).red());
            std::process::exit(1);
        }
    };

    println!("{} Pipeline definition is valid!", CHECK);
    print_spec(&spec);

    if cmd.json {
        println!("\n{}", serde_json::to_string_pretty(&spec)?);
    }
    Ok(())
}

fn print_spec(spec: &PipelineSpec) {
    println!("  Name: {}", style(&spec.name).bold());
    if let Some(description) = &spec.description {
        println!("  Description: {}", description);
    }
    println!("  Kind: {}", style(spec.kind).cyan());
    println!("  Steps:");
    for (i, step) in spec.steps.iter().enumerate() {
        let tools = if step.wants_tools() {
            format!(" tools: {}", step.tools.join(", "))
        } else {
            String::new()
        };
        println!(
            "    {}. {} ({}){}",
            i + 1,
            style(step.label()).cyan(),
            style(&step.model_id).dim(),
            tools
        );
    }
    if spec.kind == crate::core::PipelineKind::Sequential {
        println!("  Pass strategy: {:?}", spec.pass_strategy());
    } else {
        println!("  Aggregation: {:?}", spec.aggregation().method);
    }
}

#[cfg(feature = "sqlite")]
async fn save_history(record: &RunRecord) -> Result<()> {
    let store = history::SqliteHistoryStore::with_default_path().await?;
    store.save_run(record).await?;
    println!(
        "\n{} Run saved to history (ID: {})",
        INFO,
        style(&record.run_id.to_string()[..8]).dim()
    );
    Ok(())
}

#[cfg(not(feature = "sqlite"))]
async fn save_history(_record: &RunRecord) -> Result<()> {
    Ok(())
}

#[cfg(feature = "sqlite")]
async fn show_history(cmd: &HistoryCommand) -> Result<()> {
    let store = history::SqliteHistoryStore::with_default_path().await?;

    if let Some(run_id_str) = &cmd.run_id {
        let run_id = uuid::Uuid::parse_str(run_id_str).context("Invalid run ID format")?;
        match store.load_run(run_id).await? {
            Some(record) => print_run_details(&record, cmd.json)?,
            None => println!("{} Run not found", WARN),
        }
        return Ok(());
    }

    let runs = store.list_runs(cmd.pipeline.as_deref(), cmd.limit).await?;
    if runs.is_empty() {
        println!("{} No runs recorded", INFO);
        return Ok(());
    }

    if cmd.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({ "runs": runs }))?
        );
        return Ok(());
    }

    println!("{} Run history (latest {}):", INFO, cmd.limit);
    for record in &runs {
        println!("  {}", format_run_summary(record));
    }

    Ok(())
}

#[cfg(not(feature = "sqlite"))]
async fn show_history(_cmd: &HistoryCommand) -> Result<()> {
    anyhow::bail!("History requires the 'sqlite' feature")
}

#[cfg(feature = "sqlite")]
fn print_run_details(record: &RunRecord, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(record)?);
        return Ok(());
    }

    println!("{} Run details", INFO);
    println!("  ID: {}", style(record.run_id).cyan());
    println!("  Pipeline: {}", style(&record.pipeline).bold());
    println!("  Status: {}", format_status_str(&record.status));
    println!("  Started: {}", style(record.started_at.to_rfc3339()).dim());
    println!(
        "  Finished: {}",
        style(record.finished_at.to_rfc3339()).dim()
    );
    println!("  Steps:");
    for step in &record.steps {
        match &step.error {
            Some(error) => println!(
                "    {} {} ({}): {}",
                CROSS,
                style(&step.role).cyan(),
                style(&step.model_id).dim(),
                style(error).red()
            ),
            None => println!(
                "    {} {} ({})",
                CHECK,
                style(&step.role).cyan(),
                style(&step.model_id).dim()
            ),
        }
    }
    if !record.final_text.is_empty() {
        println!("\n{}", record.final_text);
    }

    Ok(())
}
