//! Executable - composable unit of asynchronous work over a context
//!
//! An executable turns a context into an eventual next context. Executables
//! are chained with [`ExecutableExt::and_then`], guarded with
//! [`ExecutableExt::on_error`] and truncated with [`ExecutableExt::interrupt`].

use crate::core::{ExecutionContext, ExecutionEvent, ProcessingError};
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

/// Result of running an executable
///
/// `Ok(None)` is the empty completion produced by [`ExecutableExt::interrupt`].
pub type Outcome = Result<Option<ExecutionContext>, ProcessingError>;

/// Shared, type-erased executable
pub type BoxedExecutable = Arc<dyn Executable>;

/// A step of work over an execution context
#[async_trait]
pub trait Executable: Send + Sync {
    async fn execute(&self, ctx: ExecutionContext) -> Outcome;
}

#[async_trait]
impl Executable for Arc<dyn Executable> {
    async fn execute(&self, ctx: ExecutionContext) -> Outcome {
        self.as_ref().execute(ctx).await
    }
}

/// Combinators available on every executable
pub trait ExecutableExt: Executable + Sized + 'static {
    /// Run `next` with the produced context, only if `self` produced one
    fn and_then<N: Executable + 'static>(self, next: N) -> AndThen<Self, N> {
        AndThen { first: self, next }
    }

    /// Recover from a failure of `self` only
    ///
    /// `recover` picks the executable to run, which receives the context
    /// `self` was given.
    fn on_error<F>(self, recover: F) -> OnError<Self, F>
    where
        F: Fn(ProcessingError) -> BoxedExecutable + Send + Sync + 'static,
    {
        OnError { inner: self, recover }
    }

    /// Run `self`, then discard its context so nothing chained after runs
    fn interrupt(self) -> Interrupt<Self> {
        Interrupt { inner: self }
    }

    /// Label this executable in logs
    fn named(self, label: impl Into<String>) -> Named<Self> {
        Named {
            label: label.into(),
            inner: self,
        }
    }

    /// Run `self` again on the same context after a failure, up to
    /// `max_attempts` attempts in total
    fn retry(self, max_attempts: usize) -> Retry<Self> {
        Retry {
            inner: self,
            max_attempts: max_attempts.max(1),
        }
    }

    fn boxed(self) -> BoxedExecutable {
        Arc::new(self)
    }
}

impl<E: Executable + 'static> ExecutableExt for E {}

/// Sequential composition, see [`ExecutableExt::and_then`]
pub struct AndThen<A, B> {
    first: A,
    next: B,
}

#[async_trait]
impl<A: Executable, B: Executable> Executable for AndThen<A, B> {
    async fn execute(&self, ctx: ExecutionContext) -> Outcome {
        match self.first.execute(ctx).await? {
            Some(ctx) => self.next.execute(ctx).await,
            None => Ok(None),
        }
    }
}

/// Error recovery, see [`ExecutableExt::on_error`]
pub struct OnError<A, F> {
    inner: A,
    recover: F,
}

#[async_trait]
impl<A, F> Executable for OnError<A, F>
where
    A: Executable,
    F: Fn(ProcessingError) -> BoxedExecutable + Send + Sync,
{
    async fn execute(&self, ctx: ExecutionContext) -> Outcome {
        match self.inner.execute(ctx.clone()).await {
            Err(err) => {
                debug!("exec={} recovering from: {}", ctx.execution_id(), err);
                (self.recover)(err).execute(ctx).await
            }
            outcome => outcome,
        }
    }
}

/// Chain truncation, see [`ExecutableExt::interrupt`]
pub struct Interrupt<A> {
    inner: A,
}

#[async_trait]
impl<A: Executable> Executable for Interrupt<A> {
    async fn execute(&self, ctx: ExecutionContext) -> Outcome {
        self.inner.execute(ctx).await.map(|_| None)
    }
}

/// Labelled executable, see [`ExecutableExt::named`]
pub struct Named<A> {
    label: String,
    inner: A,
}

#[async_trait]
impl<A: Executable> Executable for Named<A> {
    async fn execute(&self, ctx: ExecutionContext) -> Outcome {
        let exec_id = ctx.execution_id();
        debug!("exec={} step '{}' started", exec_id, self.label);
        let outcome = self.inner.execute(ctx).await;
        match &outcome {
            Ok(Some(_)) => debug!("exec={} step '{}' done", exec_id, self.label),
            Ok(None) => debug!("exec={} step '{}' interrupted the chain", exec_id, self.label),
            Err(e) => warn!("exec={} step '{}' failed: {}", exec_id, self.label, e),
        }
        outcome
    }
}

/// Bounded retry, see [`ExecutableExt::retry`]
pub struct Retry<A> {
    inner: A,
    max_attempts: usize,
}

#[async_trait]
impl<A: Executable> Executable for Retry<A> {
    async fn execute(&self, ctx: ExecutionContext) -> Outcome {
        let mut attempt = 1;
        loop {
            match self.inner.execute(ctx.clone()).await {
                Err(e) if attempt < self.max_attempts && !e.is_already_terminated() => {
                    warn!(
                        "exec={} attempt {}/{} failed, retrying: {}",
                        ctx.execution_id(),
                        attempt,
                        self.max_attempts,
                        e
                    );
                    attempt += 1;
                }
                outcome => return outcome,
            }
        }
    }
}

/// Executable backed by an async closure
pub struct FnExecutable<F> {
    f: F,
}

#[async_trait]
impl<F> Executable for FnExecutable<F>
where
    F: Fn(ExecutionContext) -> BoxFuture<'static, Result<ExecutionContext, ProcessingError>>
        + Send
        + Sync,
{
    async fn execute(&self, ctx: ExecutionContext) -> Outcome {
        (self.f)(ctx).await.map(Some)
    }
}

/// Build an executable from an async closure producing the next context
pub fn from_fn<F, Fut>(
    f: F,
) -> FnExecutable<impl Fn(ExecutionContext) -> BoxFuture<'static, Result<ExecutionContext, ProcessingError>> + Send + Sync>
where
    F: Fn(ExecutionContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<ExecutionContext, ProcessingError>> + Send + 'static,
{
    FnExecutable {
        f: move |ctx| -> BoxFuture<'static, Result<ExecutionContext, ProcessingError>> {
            Box::pin(f(ctx))
        },
    }
}

/// Executable that emits the event built by `factory`
pub struct SendEvent<F> {
    factory: F,
}

#[async_trait]
impl<F> Executable for SendEvent<F>
where
    F: Fn(&ExecutionContext) -> ExecutionEvent + Send + Sync,
{
    async fn execute(&self, ctx: ExecutionContext) -> Outcome {
        ctx.send_event(|c| (self.factory)(c)).await.map(Some)
    }
}

/// Splice event emission into a chain
pub fn send_event<F>(factory: F) -> SendEvent<F>
where
    F: Fn(&ExecutionContext) -> ExecutionEvent + Send + Sync + 'static,
{
    SendEvent { factory }
}

/// Passes its context through unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

#[async_trait]
impl Executable for Identity {
    async fn execute(&self, ctx: ExecutionContext) -> Outcome {
        Ok(Some(ctx))
    }
}

pub fn identity() -> Identity {
    Identity
}
