//! CLI command definitions

use clap::Args;
use std::path::PathBuf;

/// Run a pipeline against a prompt
#[derive(Debug, Args, Clone)]
pub struct RunCommand {
    /// Pipeline name (built-in or from ~/.chorus/pipelines/)
    pub pipeline: String,

    /// The prompt to send through the pipeline
    pub prompt: String,

    /// Run-level system prompt for steps that do not declare their own
    #[arg(short, long)]
    pub system: Option<String>,

    /// Prompt template to prepend (built-in or from ~/.chorus/templates/)
    #[arg(short, long)]
    pub template: Option<String>,

    /// Image file to attach (repeatable)
    #[arg(short, long)]
    pub attach: Vec<PathBuf>,

    /// Attach the newest screenshot from the Pictures folder
    #[arg(long)]
    pub latest_screenshot: bool,

    /// Auto-approve tool use (forbidden patterns still apply)
    #[arg(long, conflicts_with = "no_tools")]
    pub yolo: bool,

    /// Refuse all tool use for this run
    #[arg(long)]
    pub no_tools: bool,

    /// Cap on concurrent branches for parallel pipelines
    #[arg(long)]
    pub max_parallel: Option<usize>,

    /// Don't save this run to history
    #[arg(long)]
    pub no_history: bool,
}

/// List available pipelines
#[derive(Debug, Args, Clone)]
pub struct ListCommand {
    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Show a pipeline's resolved definition
#[derive(Debug, Args, Clone)]
pub struct ShowCommand {
    /// Pipeline name
    pub pipeline: String,

    /// Output the full definition in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Validate a pipeline definition file
#[derive(Debug, Args, Clone)]
pub struct ValidateCommand {
    /// Path to a pipeline JSON or YAML file
    #[arg(short, long)]
    pub file: PathBuf,

    /// Output the parsed definition in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Show run history
#[derive(Debug, Args, Clone)]
pub struct HistoryCommand {
    /// Pipeline name to filter by
    #[arg(short, long)]
    pub pipeline: Option<String>,

    /// Number of recent runs to show
    #[arg(short, long, default_value_t = 10)]
    pub limit: usize,

    /// Show a specific run in full
    #[arg(long)]
    pub run_id: Option<String>,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}
