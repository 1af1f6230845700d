//! workload - composable asynchronous execution engine for processing workloads

pub mod cli;
pub mod core;
pub mod engines;
pub mod execution;
pub mod persistence;
pub mod staging;

// Re-export commonly used types
pub use crate::core::{Execution, ExecutionContext, ExecutionEvent, InputFile, OutputFile, Step};
pub use crate::core::{EngineError, NotifierError, ProcessingError};
pub use crate::execution::{Executable, ExecutableEngine, ExecutableExt, EngineRegistry, WorkloadEngine};
pub use crate::execution::{MapperKind, OutputToInputMapper};
pub use crate::persistence::{EventNotifier, InMemoryNotifier, PublishingNotifier};
pub use crate::staging::{InputStager, LocalCopyStager, Workdir};
