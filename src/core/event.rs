//! Execution events

use crate::core::{FinalStep, IntermediaryStep, OutputFile, Step};
use serde::{Deserialize, Serialize};

/// Something observable that happened during an execution
///
/// Events are write-once and ordered per execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ExecutionEvent {
    /// The terminal step, optionally carrying the produced files
    Final {
        step: FinalStep,
        #[serde(default)]
        outputs: Vec<OutputFile>,
    },
    /// A progress step
    Intermediary { step: IntermediaryStep },
    /// Produced files without a step change
    Output { outputs: Vec<OutputFile> },
}

impl ExecutionEvent {
    /// Wrap a step into the matching event variant
    pub fn from_step(step: Step) -> Self {
        match step {
            Step::Intermediary(step) => ExecutionEvent::Intermediary { step },
            Step::Final(step) => ExecutionEvent::Final {
                step,
                outputs: Vec::new(),
            },
        }
    }

    /// Final event carrying output files
    pub fn final_with_outputs(step: FinalStep, outputs: Vec<OutputFile>) -> Self {
        ExecutionEvent::Final { step, outputs }
    }

    pub fn outputs(outputs: Vec<OutputFile>) -> Self {
        ExecutionEvent::Output { outputs }
    }

    pub fn step(&self) -> Option<Step> {
        match self {
            ExecutionEvent::Final { step, .. } => Some(Step::Final(step.clone())),
            ExecutionEvent::Intermediary { step } => Some(Step::Intermediary(step.clone())),
            ExecutionEvent::Output { .. } => None,
        }
    }

    pub fn output_files(&self) -> &[OutputFile] {
        match self {
            ExecutionEvent::Final { outputs, .. } | ExecutionEvent::Output { outputs } => outputs,
            ExecutionEvent::Intermediary { .. } => &[],
        }
    }

    pub fn is_final(&self) -> bool {
        matches!(self, ExecutionEvent::Final { .. })
    }
}

impl From<Step> for ExecutionEvent {
    fn from(step: Step) -> Self {
        ExecutionEvent::from_step(step)
    }
}
