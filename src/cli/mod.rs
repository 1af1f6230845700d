//! Command-line interface

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use commands::{EnginesCommand, HistoryCommand, RunCommand, ValidateCommand};
use std::ffi::OsString;

/// Workload execution engine
#[derive(Debug, Parser, Clone)]
#[command(name = "workload")]
#[command(author = "Workload Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Run processing workloads through pluggable engines", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the engines configuration file
    #[arg(short, long, global = true, default_value = "workload.yaml")]
    pub config: String,
}

/// Available commands
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run an execution on a configured engine
    Run(RunCommand),

    /// Validate the engines configuration
    Validate(ValidateCommand),

    /// List configured engines
    Engines(EnginesCommand),

    /// Show execution history
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
