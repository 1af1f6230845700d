//! Input staging - makes input files available in an execution workdir

use crate::core::{InputFile, ProcessingError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

/// Local working directory of one execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workdir {
    base: PathBuf,
}

impl Workdir {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// Workdir of an execution under `root`
    pub fn for_execution(root: &Path, execution_id: Uuid) -> Self {
        Self::new(root.join(execution_id.to_string()))
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn input_dir(&self) -> PathBuf {
        self.base.join("input")
    }

    pub fn output_dir(&self) -> PathBuf {
        self.base.join("output")
    }

    /// Create the input and output directories
    pub async fn create(&self) -> Result<(), ProcessingError> {
        tokio::fs::create_dir_all(self.input_dir()).await?;
        tokio::fs::create_dir_all(self.output_dir()).await?;
        Ok(())
    }

    /// Remove the whole workdir
    pub async fn clean(&self) -> Result<(), ProcessingError> {
        match tokio::fs::remove_dir_all(&self.base).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Resolves input files into local paths
#[async_trait]
pub trait InputStager: Send + Sync {
    /// Place `input` in the workdir and return its local path
    async fn stage(&self, input: &InputFile, workdir: &Workdir) -> Result<PathBuf, ProcessingError>;
}

/// Stager copying inputs from the local filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalCopyStager;

#[async_trait]
impl InputStager for LocalCopyStager {
    async fn stage(&self, input: &InputFile, workdir: &Workdir) -> Result<PathBuf, ProcessingError> {
        if input.local_path.is_absolute()
            || input
                .local_path
                .components()
                .any(|c| matches!(c, std::path::Component::ParentDir))
        {
            return Err(ProcessingError::failed(format!(
                "Input {} has a local path outside the workdir: {}",
                input.correlation_id,
                input.local_path.display()
            )));
        }

        let dest = workdir.input_dir().join(&input.local_path);
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::copy(&input.source, &dest).await?;

        debug!("Staged input {} at {}", input.correlation_id, dest.display());
        Ok(dest)
    }
}
