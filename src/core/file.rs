//! Input and output file models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// A file made available to the algorithm
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputFile {
    /// Stable identifier linking outputs back to this input
    pub correlation_id: String,

    /// Path relative to the execution workdir input directory
    pub local_path: PathBuf,

    /// Where the staging layer reads the file from
    pub source: PathBuf,
}

impl InputFile {
    pub fn new(
        correlation_id: impl Into<String>,
        local_path: impl Into<PathBuf>,
        source: impl Into<PathBuf>,
    ) -> Self {
        Self {
            correlation_id: correlation_id.into(),
            local_path: local_path.into(),
            source: source.into(),
        }
    }

    /// File name of the local path
    pub fn name(&self) -> &str {
        file_name(&self.local_path)
    }
}

/// A file produced during an execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputFile {
    pub id: Uuid,
    pub name: String,

    /// Path relative to the execution workdir output directory
    pub local_path: PathBuf,

    pub size_bytes: u64,

    /// Correlation ids of the inputs this output was derived from, in order
    #[serde(default)]
    pub input_correlation_ids: Vec<String>,

    pub created: DateTime<Utc>,
}

impl OutputFile {
    /// Create an output file named after the last component of its path
    pub fn new(local_path: impl Into<PathBuf>, size_bytes: u64) -> Self {
        let local_path = local_path.into();
        Self {
            id: Uuid::new_v4(),
            name: file_name(&local_path).to_string(),
            local_path,
            size_bytes,
            input_correlation_ids: Vec::new(),
            created: Utc::now(),
        }
    }

    /// Append correlation ids, skipping any already present
    pub fn with_input_correlation_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for id in ids {
            let id = id.into();
            if !self.input_correlation_ids.contains(&id) {
                self.input_correlation_ids.push(id);
            }
        }
        self
    }
}

fn file_name(path: &Path) -> &str {
    path.file_name().and_then(|n| n.to_str()).unwrap_or("")
}
