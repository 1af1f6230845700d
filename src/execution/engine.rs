//! Workload engines - drive a context through a pipeline to a final step

use crate::{
    core::{EngineError, Execution, ExecutionContext, ExecutionEvent, ProcessingError, Step},
    execution::{send_event, BoxedExecutable, Executable, ExecutableExt},
};
use async_trait::async_trait;
use tracing::{debug, error, info, warn};

/// A named, pluggable driver for executions
#[async_trait]
pub trait WorkloadEngine: Send + Sync {
    /// Stable identifier used for lookup in the registry
    fn name(&self) -> &str;

    /// Run the execution to its final step and return the resulting aggregate
    async fn run(&self, ctx: ExecutionContext) -> Result<Execution, EngineError>;
}

/// Build the final step reported for an uncaught failure
pub fn failure_step(err: &ProcessingError) -> Step {
    match err {
        ProcessingError::Timeout(_) => Step::timed_out(err.to_string()),
        _ => Step::failure(err.to_string()),
    }
}

/// Recovery that reports an uncaught failure as the final step
pub fn send_failure_event(err: ProcessingError) -> BoxedExecutable {
    let step = failure_step(&err);
    send_event(move |_| ExecutionEvent::from_step(step.clone())).boxed()
}

/// Engine running a composed executable
///
/// The whole pipeline is guarded by a top-level recovery emitting a failure
/// final step, and the engine closes the execution itself when the pipeline
/// ends without one. Every run therefore records exactly one final step.
pub struct ExecutableEngine {
    name: String,
    pipeline: BoxedExecutable,
}

impl ExecutableEngine {
    pub fn new(name: impl Into<String>, pipeline: impl Executable + 'static) -> Self {
        Self {
            name: name.into(),
            pipeline: pipeline.boxed(),
        }
    }

    /// Reload the aggregate and close it if the pipeline did not
    async fn ensure_final(&self, ctx: &ExecutionContext, fallback: Step) -> Result<Execution, EngineError> {
        let exec_id = ctx.execution_id();
        let exec = ctx
            .notifier()
            .find(exec_id)
            .await?
            .ok_or(crate::core::NotifierError::UnknownExecution(exec_id))?;

        if exec.is_terminated() {
            return Ok(exec);
        }

        warn!(
            "exec={} engine={} pipeline ended without a final step, closing as {}",
            exec_id,
            self.name,
            fallback.status_label()
        );
        Ok(ctx.notifier().notify_event(exec_id, fallback.into()).await?)
    }
}

#[async_trait]
impl WorkloadEngine for ExecutableEngine {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, ctx: ExecutionContext) -> Result<Execution, EngineError> {
        let exec_id = ctx.execution_id();
        info!("Starting execution {} on engine {}", exec_id, self.name);

        // The record always names the engine actually running it
        let exec = ctx.execution();
        if exec.engine != self.name {
            debug!(
                "exec={} created for engine '{}', recorded as '{}'",
                exec_id, exec.engine, self.name
            );
        }
        let exec = Execution {
            engine: self.name.clone(),
            ..exec.clone()
        };
        let registered = ctx.notifier().register(exec).await?;
        let ctx = ctx.with_execution(registered);

        let guarded = self.pipeline.clone().on_error(send_failure_event);

        let exec = match guarded.execute(ctx.clone()).await {
            Ok(Some(_)) => {
                self.ensure_final(&ctx, Step::failure("pipeline ended without a final step"))
                    .await?
            }
            Ok(None) => {
                self.ensure_final(&ctx, Step::cancelled("execution interrupted"))
                    .await?
            }
            Err(e) if e.is_already_terminated() => {
                warn!("exec={} failed after its final step: {}", exec_id, e);
                self.ensure_final(&ctx, Step::failure(e.to_string())).await?
            }
            Err(e) => {
                error!("exec={} could not report its failure: {}", exec_id, e);
                return Err(e.into());
            }
        };

        info!(
            "Execution {} finished: {}",
            exec_id,
            exec.final_step()
                .map(|s| s.status.to_string())
                .unwrap_or_default()
        );
        Ok(exec)
    }
}
