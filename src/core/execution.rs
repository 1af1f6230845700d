//! Execution aggregate

use crate::core::{ExecutionEvent, FinalStep, NotifierError, OutputFile, Step};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Record of one run of a workload engine
///
/// Only [`Execution::apply`] mutates it, and nothing can be applied once a
/// final step is recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Execution {
    /// Unique execution ID
    pub id: Uuid,

    /// Name of the engine driving this execution
    pub engine: String,

    /// Steps in the order they were observed
    pub steps: Vec<Step>,

    /// Files produced so far
    pub output_files: Vec<OutputFile>,

    pub created: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl Execution {
    /// Create a new execution for the given engine
    pub fn new(engine: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4(), engine)
    }

    pub fn with_id(id: Uuid, engine: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            engine: engine.into(),
            steps: Vec::new(),
            output_files: Vec::new(),
            created: now,
            last_updated: now,
        }
    }

    /// Record one event
    pub fn apply(&mut self, event: ExecutionEvent) -> Result<(), NotifierError> {
        if self.is_terminated() {
            return Err(NotifierError::AlreadyTerminated(self.id));
        }

        match event {
            ExecutionEvent::Final { step, outputs } => {
                self.output_files.extend(outputs);
                self.steps.push(Step::Final(step));
            }
            ExecutionEvent::Intermediary { step } => {
                self.steps.push(Step::Intermediary(step));
            }
            ExecutionEvent::Output { outputs } => {
                self.output_files.extend(outputs);
            }
        }
        self.last_updated = Utc::now();
        Ok(())
    }

    pub fn current_step(&self) -> Option<&Step> {
        self.steps.last()
    }

    pub fn final_step(&self) -> Option<&FinalStep> {
        self.steps.iter().find_map(|step| match step {
            Step::Final(step) => Some(step),
            Step::Intermediary(_) => None,
        })
    }

    pub fn is_terminated(&self) -> bool {
        self.final_step().is_some()
    }

    /// Number of final steps recorded; conformant executions never exceed one
    pub fn final_step_count(&self) -> usize {
        self.steps.iter().filter(|s| s.is_final()).count()
    }
}
