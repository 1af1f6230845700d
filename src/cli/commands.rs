//! CLI command definitions

use crate::core::InputFile;
use clap::Args;
use std::path::{Path, PathBuf};

/// Run an execution
#[derive(Debug, Args, Clone)]
pub struct RunCommand {
    /// Name of the engine to run
    #[arg(short, long)]
    pub engine: String,

    /// Input files, as `path` or `correlation-id=path`
    #[arg(short, long, value_parser = parse_input)]
    pub input: Vec<InputArg>,

    /// Don't save execution to history
    #[arg(long)]
    pub no_history: bool,

    /// Print the resulting execution as JSON
    #[arg(long)]
    pub json: bool,
}

/// Validate the engines configuration
#[derive(Debug, Args, Clone)]
pub struct ValidateCommand {
    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// List configured engines
#[derive(Debug, Args, Clone)]
pub struct EnginesCommand {
    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Show execution history
#[derive(Debug, Args, Clone)]
pub struct HistoryCommand {
    /// Engine name to filter by
    #[arg(short, long)]
    pub engine: Option<String>,

    /// Number of recent executions to show
    #[arg(short, long, default_value_t = 10)]
    pub limit: usize,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,

    /// Show a specific execution
    #[arg(long)]
    pub execution_id: Option<String>,
}

/// An input file given on the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputArg {
    pub correlation_id: String,
    pub path: PathBuf,
}

impl InputArg {
    /// Input file staged under its file name
    pub fn to_input_file(&self) -> InputFile {
        let name = self
            .path
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| self.path.clone());
        InputFile::new(self.correlation_id.clone(), name, self.path.clone())
    }
}

/// Parse `path` or `correlation-id=path`
pub fn parse_input(s: &str) -> Result<InputArg, String> {
    let (correlation_id, path) = match s.split_once('=') {
        Some((cid, path)) if !cid.is_empty() && !path.is_empty() => (cid.to_string(), path),
        Some(_) => return Err(format!("Invalid input: {}", s)),
        None => (s.to_string(), s),
    };

    if Path::new(path).file_name().is_none() {
        return Err(format!("Input is not a file path: {}", path));
    }

    Ok(InputArg {
        correlation_id,
        path: PathBuf::from(path),
    })
}
