//! Error types for workload execution

use thiserror::Error;
use uuid::Uuid;

/// Errors raised by event notifiers
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NotifierError {
    #[error("Unknown execution: {0}")]
    UnknownExecution(Uuid),

    #[error("Execution {0} already reached a final step")]
    AlreadyTerminated(Uuid),

    #[error("Execution {0} is already registered")]
    DuplicateExecution(Uuid),

    #[error("Storage error: {0}")]
    Storage(String),
}

/// Errors raised by executables while processing a workload
#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("{0}")]
    Failed(String),

    #[error("Timeout after {0} seconds")]
    Timeout(u64),

    #[error("Missing execution parameter: {0}")]
    MissingParam(&'static str),

    #[error("Script {script} exited with status code {code}: {stderr}")]
    Script {
        script: String,
        code: i32,
        stderr: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Notifier(#[from] NotifierError),
}

impl ProcessingError {
    /// Convenience constructor for a plain step failure
    pub fn failed(message: impl Into<String>) -> Self {
        ProcessingError::Failed(message.into())
    }

    /// True when the failure comes from writing to an already terminated execution
    pub fn is_already_terminated(&self) -> bool {
        matches!(self, ProcessingError::Notifier(NotifierError::AlreadyTerminated(_)))
    }
}

/// Errors raised by engines and the engine registry
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("No engine registered under name '{0}'")]
    UnknownEngine(String),

    #[error("An engine is already registered under name '{0}'")]
    DuplicateEngine(String),

    #[error(transparent)]
    Notifier(#[from] NotifierError),

    #[error(transparent)]
    Processing(#[from] ProcessingError),
}
