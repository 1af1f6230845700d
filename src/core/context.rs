//! Execution context - the value threaded through a pipeline

use crate::core::{Execution, ExecutionEvent, InputFile, ProcessingError, Step};
use crate::persistence::EventNotifier;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;
use tracing::debug;

/// Context for one execution
///
/// Contexts are immutable and cheap to clone. Every step returns a new
/// context instead of mutating the one it received.
#[derive(Clone)]
pub struct ExecutionContext {
    /// Latest known snapshot of the execution aggregate
    exec: Arc<Execution>,

    /// Files available to the algorithm
    inputs: Arc<Vec<InputFile>>,

    /// Engine-specific parameters, keyed by type
    params: Arc<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>,

    notifier: Arc<dyn EventNotifier>,
}

impl ExecutionContext {
    /// Create a new context
    pub fn new(exec: Execution, inputs: Vec<InputFile>, notifier: Arc<dyn EventNotifier>) -> Self {
        Self {
            exec: Arc::new(exec),
            inputs: Arc::new(inputs),
            params: Arc::new(HashMap::new()),
            notifier,
        }
    }

    pub fn execution(&self) -> &Execution {
        &self.exec
    }

    pub fn execution_id(&self) -> Uuid {
        self.exec.id
    }

    pub fn inputs(&self) -> &[InputFile] {
        &self.inputs
    }

    pub fn notifier(&self) -> &Arc<dyn EventNotifier> {
        &self.notifier
    }

    pub fn current_step(&self) -> Option<&Step> {
        self.exec.current_step()
    }

    /// New context with a refreshed aggregate snapshot
    pub fn with_execution(&self, exec: Execution) -> Self {
        Self {
            exec: Arc::new(exec),
            ..self.clone()
        }
    }

    /// New context carrying an engine-specific parameter
    ///
    /// A parameter of the same type replaces the previous one.
    pub fn with_param<T: Any + Send + Sync>(&self, value: T) -> Self {
        let mut params = (*self.params).clone();
        params.insert(TypeId::of::<T>(), Arc::new(value));
        Self {
            params: Arc::new(params),
            ..self.clone()
        }
    }

    /// Read an engine-specific parameter
    pub fn param<T: Any + Send + Sync>(&self) -> Result<Arc<T>, ProcessingError> {
        self.params
            .get(&TypeId::of::<T>())
            .cloned()
            .and_then(|value| value.downcast::<T>().ok())
            .ok_or(ProcessingError::MissingParam(std::any::type_name::<T>()))
    }

    /// Build an event from this context and hand it to the notifier
    ///
    /// Resolves once the notifier accepted the event, with a context holding
    /// the updated aggregate.
    pub async fn send_event<F>(&self, factory: F) -> Result<Self, ProcessingError>
    where
        F: FnOnce(&ExecutionContext) -> ExecutionEvent,
    {
        let event = factory(self);
        debug!(
            "exec={} sending {} event",
            self.exec.id,
            match &event {
                ExecutionEvent::Final { .. } => "final",
                ExecutionEvent::Intermediary { .. } => "intermediary",
                ExecutionEvent::Output { .. } => "output",
            }
        );
        let exec = self.notifier.notify_event(self.exec.id, event).await?;
        Ok(self.with_execution(exec))
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("exec", &self.exec.id)
            .field("engine", &self.exec.engine)
            .field("inputs", &self.inputs.len())
            .field("params", &self.params.len())
            .finish()
    }
}
