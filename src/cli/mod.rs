//! Command-line interface

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use commands::{HistoryCommand, ListCommand, RunCommand, ShowCommand, ValidateCommand};

/// Consensus pipelines for local Ollama models
#[derive(Debug, Parser, Clone)]
#[command(name = "chorus")]
#[command(version = "0.1.0")]
#[command(about = "Drive local models through sequential and parallel consensus pipelines", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Ollama endpoint (default http://localhost:11434)
    #[arg(long, global = true)]
    pub endpoint: Option<String>,
}

/// Available commands
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run a pipeline against a prompt
    Run(RunCommand),

    /// List available pipelines
    List(ListCommand),

    /// Show a pipeline's resolved definition
    Show(ShowCommand),

    /// Validate a pipeline definition file
    Validate(ValidateCommand),

    /// Show run history
    History(HistoryCommand),
}

impl Cli {
    /// Parse CLI arguments from environment
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Parse CLI arguments from a slice
    pub fn try_parse_from<I, T>(itr: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(itr)
    }
}

use std::ffi::OsString;
