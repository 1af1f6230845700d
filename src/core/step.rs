//! Step domain model
//!
//! A step marks where an execution currently is. Intermediary steps can occur
//! any number of times; exactly one final step closes an execution.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Status of a non-terminal step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntermediaryStatus {
    /// Execution is known but nothing ran yet
    Registered,
    /// Inputs are being staged
    Prepare,
    /// The algorithm is running
    Running,
    /// Working resources are being released
    Cleanup,
}

/// Status of the terminal step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FinalStatus {
    Success,
    Failure,
    Cancelled,
    TimedOut,
}

impl FinalStatus {
    /// Partition of final statuses into success and non-success
    pub fn is_success(&self) -> bool {
        matches!(self, FinalStatus::Success)
    }
}

impl fmt::Display for IntermediaryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            IntermediaryStatus::Registered => "REGISTERED",
            IntermediaryStatus::Prepare => "PREPARE",
            IntermediaryStatus::Running => "RUNNING",
            IntermediaryStatus::Cleanup => "CLEANUP",
        };
        f.write_str(label)
    }
}

impl fmt::Display for FinalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FinalStatus::Success => "SUCCESS",
            FinalStatus::Failure => "FAILURE",
            FinalStatus::Cancelled => "CANCELLED",
            FinalStatus::TimedOut => "TIMED_OUT",
        };
        f.write_str(label)
    }
}

/// A non-terminal step, carrying step-specific metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntermediaryStep {
    pub status: IntermediaryStatus,
    pub message: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    pub time: DateTime<Utc>,
}

impl IntermediaryStep {
    pub fn new(status: IntermediaryStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            metadata: HashMap::new(),
            time: Utc::now(),
        }
    }

    /// Attach a metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// The terminal step of an execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalStep {
    pub status: FinalStatus,
    pub message: String,
    pub time: DateTime<Utc>,
}

impl FinalStep {
    pub fn new(status: FinalStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            time: Utc::now(),
        }
    }
}

/// Where an execution currently is
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Step {
    Intermediary(IntermediaryStep),
    Final(FinalStep),
}

impl Step {
    pub fn registered(message: impl Into<String>) -> Self {
        Step::Intermediary(IntermediaryStep::new(IntermediaryStatus::Registered, message))
    }

    pub fn prepare(message: impl Into<String>) -> Self {
        Step::Intermediary(IntermediaryStep::new(IntermediaryStatus::Prepare, message))
    }

    pub fn running(message: impl Into<String>) -> Self {
        Step::Intermediary(IntermediaryStep::new(IntermediaryStatus::Running, message))
    }

    pub fn cleanup(message: impl Into<String>) -> Self {
        Step::Intermediary(IntermediaryStep::new(IntermediaryStatus::Cleanup, message))
    }

    pub fn success(message: impl Into<String>) -> Self {
        Step::Final(FinalStep::new(FinalStatus::Success, message))
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Step::Final(FinalStep::new(FinalStatus::Failure, message))
    }

    pub fn cancelled(message: impl Into<String>) -> Self {
        Step::Final(FinalStep::new(FinalStatus::Cancelled, message))
    }

    pub fn timed_out(message: impl Into<String>) -> Self {
        Step::Final(FinalStep::new(FinalStatus::TimedOut, message))
    }

    pub fn is_final(&self) -> bool {
        matches!(self, Step::Final(_))
    }

    pub fn message(&self) -> &str {
        match self {
            Step::Intermediary(step) => &step.message,
            Step::Final(step) => &step.message,
        }
    }

    pub fn time(&self) -> DateTime<Utc> {
        match self {
            Step::Intermediary(step) => step.time,
            Step::Final(step) => step.time,
        }
    }

    /// Status label, e.g. `RUNNING` or `SUCCESS`
    pub fn status_label(&self) -> String {
        match self {
            Step::Intermediary(step) => step.status.to_string(),
            Step::Final(step) => step.status.to_string(),
        }
    }
}
