//! Engine configuration from YAML

use crate::execution::MapperKind;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Top-level configuration loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkloadConfig {
    /// Directory under which each execution gets its own workdir
    #[serde(default = "default_workdir_root")]
    pub workdir_root: PathBuf,

    /// Default timeout for scripts (in seconds)
    #[serde(default)]
    pub default_timeout_secs: Option<u64>,

    /// Engines to register at startup
    #[serde(default)]
    pub engines: Vec<EngineConfig>,
}

/// One shell-script engine as defined in YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Unique engine name
    pub name: String,

    /// Optional description
    #[serde(default)]
    pub description: Option<String>,

    /// Script name or path, run from the execution workdir
    pub script: String,

    /// Extra arguments given to the script
    #[serde(default)]
    pub args: Vec<String>,

    /// Environment variables given to the script
    #[serde(default)]
    pub env: HashMap<String, String>,

    /// How outputs are correlated to inputs
    #[serde(default)]
    pub mapper: MapperKind,

    /// Timeout for this engine (overrides global)
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    /// Keep the workdir after the run (for debugging)
    #[serde(default)]
    pub keep_workdir: bool,
}

/// Fallback when neither the engine nor the config sets a timeout
pub const DEFAULT_TIMEOUT_SECS: u64 = 3600;

fn default_workdir_root() -> PathBuf {
    std::env::temp_dir().join("workload")
}

impl WorkloadConfig {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: WorkloadConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for engine in &self.engines {
            if engine.name.trim().is_empty() {
                anyhow::bail!("Engine name cannot be empty");
            }
            if !seen.insert(&engine.name) {
                anyhow::bail!("Duplicate engine name: {}", engine.name);
            }
            if engine.script.trim().is_empty() {
                anyhow::bail!("Engine '{}' has no script", engine.name);
            }
            if engine.timeout_secs == Some(0) {
                anyhow::bail!("Engine '{}' timeout must be positive", engine.name);
            }
        }
        Ok(())
    }

    /// Effective timeout of an engine
    pub fn timeout_for(&self, engine: &EngineConfig) -> u64 {
        engine
            .timeout_secs
            .or(self.default_timeout_secs)
            .unwrap_or(DEFAULT_TIMEOUT_SECS)
    }

    pub fn engine(&self, name: &str) -> Option<&EngineConfig> {
        self.engines.iter().find(|e| e.name == name)
    }
}
