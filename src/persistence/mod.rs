//! Event notifiers - where execution events are recorded and observed

#[cfg(feature = "sqlite")]
pub mod store;

#[cfg(feature = "sqlite")]
pub use store::SqliteExecutionStore;

use crate::core::{Execution, ExecutionEvent, FinalStatus, NotifierError, OutputFile};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Sink receiving ordered execution events
///
/// Implementations must be safe for concurrent use by many executions, and
/// must reject events for unknown or already terminated executions.
#[async_trait::async_trait]
pub trait EventNotifier: Send + Sync {
    /// Create the record of a new execution
    async fn register(&self, execution: Execution) -> Result<Execution, NotifierError>;

    /// Record one event and return the updated aggregate
    async fn notify_event(
        &self,
        execution_id: Uuid,
        event: ExecutionEvent,
    ) -> Result<Execution, NotifierError>;

    /// Load an execution by ID
    async fn find(&self, execution_id: Uuid) -> Result<Option<Execution>, NotifierError>;
}

/// In-memory notifier (for testing or ephemeral use)
///
/// Executions stay in memory until [`InMemoryNotifier::evict_terminated`]
/// drops the finished ones; long-lived processes should call it periodically.
pub struct InMemoryNotifier {
    executions: tokio::sync::RwLock<HashMap<Uuid, Execution>>,
}

impl InMemoryNotifier {
    pub fn new() -> Self {
        Self {
            executions: tokio::sync::RwLock::new(HashMap::new()),
        }
    }

    /// All known executions
    pub async fn executions(&self) -> Vec<Execution> {
        self.executions.read().await.values().cloned().collect()
    }

    /// Forget every execution that reached its final step
    ///
    /// Returns how many executions were removed. Late events for an evicted
    /// execution are then rejected as unknown.
    pub async fn evict_terminated(&self) -> usize {
        let mut execs = self.executions.write().await;
        let before = execs.len();
        execs.retain(|_, exec| !exec.is_terminated());
        let evicted = before - execs.len();
        if evicted > 0 {
            debug!("Evicted {} terminated executions", evicted);
        }
        evicted
    }
}

impl Default for InMemoryNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl EventNotifier for InMemoryNotifier {
    async fn register(&self, execution: Execution) -> Result<Execution, NotifierError> {
        let mut execs = self.executions.write().await;
        if execs.contains_key(&execution.id) {
            return Err(NotifierError::DuplicateExecution(execution.id));
        }
        execs.insert(execution.id, execution.clone());
        Ok(execution)
    }

    async fn notify_event(
        &self,
        execution_id: Uuid,
        event: ExecutionEvent,
    ) -> Result<Execution, NotifierError> {
        let mut execs = self.executions.write().await;
        let exec = execs
            .get_mut(&execution_id)
            .ok_or(NotifierError::UnknownExecution(execution_id))?;
        exec.apply(event)?;
        Ok(exec.clone())
    }

    async fn find(&self, execution_id: Uuid) -> Result<Option<Execution>, NotifierError> {
        let execs = self.executions.read().await;
        Ok(execs.get(&execution_id).cloned())
    }
}

/// Outcome summary published when an execution reaches its final step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub execution_id: Uuid,
    pub engine: String,
    pub final_status: FinalStatus,
    pub message: String,
    pub outputs: Vec<OutputFile>,
}

impl ExecutionResult {
    /// Summary of a terminated execution
    pub fn from_execution(exec: &Execution) -> Option<Self> {
        exec.final_step().map(|step| Self {
            execution_id: exec.id,
            engine: exec.engine.clone(),
            final_status: step.status,
            message: step.message.clone(),
            outputs: exec.output_files.clone(),
        })
    }
}

/// Type for event handlers
pub type EventHandler = Arc<dyn Fn(&Execution, &ExecutionEvent) + Send + Sync>;

/// Type for result handlers
pub type ResultHandler = Arc<dyn Fn(&ExecutionResult) + Send + Sync>;

/// Notifier publishing every accepted event to handlers
///
/// Events are first written to the inner notifier; handlers only see events
/// that were accepted.
pub struct PublishingNotifier<N> {
    inner: N,
    event_handlers: Vec<EventHandler>,
    result_handlers: Vec<ResultHandler>,
}

impl<N: EventNotifier> PublishingNotifier<N> {
    pub fn new(inner: N) -> Self {
        Self {
            inner,
            event_handlers: Vec::new(),
            result_handlers: Vec::new(),
        }
    }

    /// Add an event handler
    pub fn with_event_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&Execution, &ExecutionEvent) + Send + Sync + 'static,
    {
        self.event_handlers.push(Arc::new(handler));
        self
    }

    /// Add a handler for final execution results
    pub fn with_result_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&ExecutionResult) + Send + Sync + 'static,
    {
        self.result_handlers.push(Arc::new(handler));
        self
    }

    pub fn inner(&self) -> &N {
        &self.inner
    }
}

#[async_trait::async_trait]
impl<N: EventNotifier> EventNotifier for PublishingNotifier<N> {
    async fn register(&self, execution: Execution) -> Result<Execution, NotifierError> {
        self.inner.register(execution).await
    }

    async fn notify_event(
        &self,
        execution_id: Uuid,
        event: ExecutionEvent,
    ) -> Result<Execution, NotifierError> {
        let exec = self.inner.notify_event(execution_id, event.clone()).await?;

        debug!("Publishing event for execution {}", execution_id);
        for handler in &self.event_handlers {
            handler(&exec, &event);
        }

        if event.is_final() {
            if let Some(result) = ExecutionResult::from_execution(&exec) {
                info!(
                    "Execution {} terminated with status {}",
                    execution_id, result.final_status
                );
                for handler in &self.result_handlers {
                    handler(&result);
                }
            }
        }

        Ok(exec)
    }

    async fn find(&self, execution_id: Uuid) -> Result<Option<Execution>, NotifierError> {
        self.inner.find(execution_id).await
    }
}
