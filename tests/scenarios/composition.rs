//! Test: Composition - and_then, on_error and interrupt semantics

use crate::helpers::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use workload::core::ProcessingError;
use workload::execution::{from_fn, Executable, ExecutableExt};

/// Test that grouping of chained executables does not change what is observed
#[tokio::test]
async fn test_and_then_is_associative() {
    let (left_ctx, left) = registered_context(vec![input("cid", "a.txt")]).await;
    let (right_ctx, right) = registered_context(vec![input("cid", "a.txt")]).await;

    let left_chain = emit("a").and_then(emit("b")).and_then(emit("c"));
    let right_chain = emit("a").and_then(emit("b").and_then(emit("c")));

    let left_out = left_chain.execute(left_ctx).await.unwrap().unwrap();
    let right_out = right_chain.execute(right_ctx).await.unwrap().unwrap();

    assert_eq!(left.step_messages(), vec!["a", "b", "c"]);
    assert_eq!(left.step_messages(), right.step_messages());
    assert_eq!(left_out.inputs(), right_out.inputs());
    assert_eq!(
        left_out.execution().steps.len(),
        right_out.execution().steps.len()
    );
}

/// Test that a failing executable stops the chain with its own error
#[tokio::test]
async fn test_failure_short_circuits_chain() {
    let (ctx, recorder) = registered_context(Vec::new()).await;
    let ran = Arc::new(AtomicUsize::new(0));

    let chain = fail_with("validation failed")
        .and_then(counting(ran.clone()))
        .and_then(emit("never"));

    let err = chain.execute(ctx).await.unwrap_err();

    assert!(matches!(err, ProcessingError::Failed(ref m) if m == "validation failed"));
    assert_eq!(ran.load(Ordering::SeqCst), 0);
    assert!(recorder.events().is_empty());
}

/// Test that a recovery guards only the executable it is attached to
#[tokio::test]
async fn test_on_error_is_scoped_to_its_executable() {
    let (ctx, _recorder) = registered_context(Vec::new()).await;
    let recovered = Arc::new(AtomicUsize::new(0));
    let count = recovered.clone();

    let chain = emit("ok")
        .on_error(move |_| {
            count.fetch_add(1, Ordering::SeqCst);
            emit("recovered").boxed()
        })
        .and_then(fail_with("later failure"));

    let err = chain.execute(ctx).await.unwrap_err();
    assert_eq!(err.to_string(), "later failure");
    assert_eq!(recovered.load(Ordering::SeqCst), 0);
}

/// Test that a recovery result becomes the completion and the chain goes on
#[tokio::test]
async fn test_recovery_continues_chain() {
    let (ctx, recorder) = registered_context(Vec::new()).await;
    let log = Arc::new(Mutex::new(Vec::new()));

    let chain = fail_with("flaky")
        .on_error(|err| {
            assert_eq!(err.to_string(), "flaky");
            emit("recovered").boxed()
        })
        .and_then(trace(log.clone(), "after"));

    let out = chain.execute(ctx).await.unwrap();

    assert!(out.is_some());
    assert_eq!(recorder.step_messages(), vec!["recovered"]);
    assert_eq!(*log.lock().unwrap(), vec!["after"]);
}

/// Test that interrupt runs the wrapped executable and stops the chain
#[tokio::test]
async fn test_interrupt_truncates_chain() {
    let (ctx, recorder) = registered_context(Vec::new()).await;
    let ran = Arc::new(AtomicUsize::new(0));

    let chain = emit("cancelling")
        .interrupt()
        .and_then(counting(ran.clone()));

    let out = chain.execute(ctx).await.unwrap();

    assert!(out.is_none());
    assert_eq!(ran.load(Ordering::SeqCst), 0);
    assert_eq!(recorder.step_messages(), vec!["cancelling"]);
}

/// Test that explicit retry reruns only the wrapped executable
#[tokio::test]
async fn test_explicit_retry() {
    let (ctx, recorder) = registered_context(Vec::new()).await;
    let attempts = Arc::new(AtomicUsize::new(0));
    let seen = attempts.clone();

    let flaky = from_fn(move |ctx| {
        let seen = seen.clone();
        async move {
            if seen.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(ProcessingError::failed("not yet"))
            } else {
                Ok(ctx)
            }
        }
    });

    let chain = emit("start").and_then(flaky.retry(3)).and_then(emit("end"));
    chain.execute(ctx).await.unwrap();

    assert_eq!(attempts.load(Ordering::SeqCst), 3);
    assert_eq!(recorder.step_messages(), vec!["start", "end"]);
}

/// Test that nothing is retried without the retry combinator
#[tokio::test]
async fn test_no_implicit_retry() {
    let (ctx, _recorder) = registered_context(Vec::new()).await;
    let attempts = Arc::new(AtomicUsize::new(0));

    let chain = counting(attempts.clone()).and_then(fail_with("boom"));
    assert!(chain.execute(ctx).await.is_err());
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
}
