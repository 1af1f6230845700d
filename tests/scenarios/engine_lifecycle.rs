//! Test: Engine lifecycle - every run ends with exactly one final step

use crate::helpers::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use workload::core::{Execution, ExecutionContext, ExecutionEvent, FinalStatus, Step};
use workload::execution::{
    send_event, EngineRegistry, ExecutableEngine, ExecutableExt, WorkloadEngine,
};
use workload::EngineError;

/// Test the validate / execute / collect chain failing at its first step
#[tokio::test]
async fn test_validation_failure_reaches_single_final_step() {
    let (ctx, recorder) = context_with("pipeline", vec![input("cid", "a.txt")]);
    let executed = Arc::new(AtomicUsize::new(0));
    let collected = Arc::new(AtomicUsize::new(0));

    let validate = fail_with("input a.txt is not a valid image");
    let execute = emit("execute").and_then(counting(executed.clone()));
    let collect = counting(collected.clone())
        .and_then(send_event(|_| ExecutionEvent::outputs(Vec::new())))
        .and_then(send_event(|_| Step::success("collected").into()));

    let engine = ExecutableEngine::new("pipeline", validate.and_then(execute).and_then(collect));
    let exec = engine.run(ctx).await.unwrap();

    assert_eq!(executed.load(Ordering::SeqCst), 0);
    assert_eq!(collected.load(Ordering::SeqCst), 0);
    assert_eq!(recorder.output_event_count(), 0);
    assert!(exec
        .steps
        .iter()
        .all(|s| s.is_final()), "Unexpected intermediary steps: {:?}", exec.steps);
    assert_single_final(&exec);
    assert_final(&exec, FinalStatus::Failure, "input a.txt is not a valid image");
    assert_eq!(recorder.final_count(), 1);
}

/// Test that a successful pipeline keeps its own final step
#[tokio::test]
async fn test_success_final_step_is_kept() {
    let (ctx, recorder) = context_with("pipeline", Vec::new());

    let pipeline = emit("working").and_then(send_event(|_| Step::success("all good").into()));
    let exec = ExecutableEngine::new("pipeline", pipeline).run(ctx).await.unwrap();

    assert_single_final(&exec);
    assert_final(&exec, FinalStatus::Success, "all good");
    assert_eq!(recorder.step_messages(), vec!["working", "all good"]);

    let results = recorder.results();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].execution_id, exec.id);
    assert_eq!(results[0].final_status, FinalStatus::Success);
}

/// Test that results name the engine that ran, not the one the caller guessed
#[tokio::test]
async fn test_result_names_running_engine() {
    let (ctx, recorder) = context_with("archive", Vec::new());

    let pipeline = send_event(|_| Step::success("done").into());
    let exec = ExecutableEngine::new("thumbnails", pipeline).run(ctx).await.unwrap();

    assert_eq!(exec.engine, "thumbnails");
    assert_eq!(recorder.results()[0].engine, "thumbnails");
}

/// Test that a pipeline forgetting its final step is closed by the engine
#[tokio::test]
async fn test_pipeline_without_final_step_is_closed() {
    let (ctx, _recorder) = context_with("pipeline", Vec::new());

    let exec = ExecutableEngine::new("pipeline", emit("only progress"))
        .run(ctx)
        .await
        .unwrap();

    assert_single_final(&exec);
    assert_eq!(exec.final_step().map(|s| s.status), Some(FinalStatus::Failure));
}

/// Test that an interrupted pipeline ends cancelled unless it reported otherwise
#[tokio::test]
async fn test_interrupted_pipeline() {
    let (ctx, _recorder) = context_with("pipeline", Vec::new());
    let ran = Arc::new(AtomicUsize::new(0));

    let pipeline = emit("checking").interrupt().and_then(counting(ran.clone()));
    let exec = ExecutableEngine::new("pipeline", pipeline).run(ctx).await.unwrap();

    assert_eq!(ran.load(Ordering::SeqCst), 0);
    assert_single_final(&exec);
    assert_eq!(exec.final_step().map(|s| s.status), Some(FinalStatus::Cancelled));

    let (ctx, _recorder) = context_with("pipeline", Vec::new());
    let pipeline = send_event(|_| Step::cancelled("nothing to do").into()).interrupt();
    let exec = ExecutableEngine::new("pipeline", pipeline).run(ctx).await.unwrap();
    assert_single_final(&exec);
    assert_final(&exec, FinalStatus::Cancelled, "nothing to do");
}

/// Test that failing after the final step does not add a second one
#[tokio::test]
async fn test_failure_after_final_step() {
    let (ctx, recorder) = context_with("pipeline", Vec::new());

    let pipeline = send_event(|_| Step::success("done").into())
        .and_then(emit("too late"))
        .and_then(fail_with("unreachable"));
    let exec = ExecutableEngine::new("pipeline", pipeline).run(ctx).await.unwrap();

    assert_single_final(&exec);
    assert_final(&exec, FinalStatus::Success, "done");
    assert_eq!(recorder.final_count(), 1);
}

/// Test exactly one final step over a range of failure positions
#[tokio::test]
async fn test_exactly_one_terminal_for_any_failure_position() {
    for fail_at in 0..4 {
        let (ctx, recorder) = context_with("pipeline", Vec::new());

        let mut pipeline = emit("start").boxed();
        for position in 0..4 {
            pipeline = if position == fail_at {
                pipeline.and_then(fail_with("boom")).boxed()
            } else {
                pipeline.and_then(emit("step")).boxed()
            };
        }
        let pipeline = pipeline.and_then(send_event(|_| Step::success("done").into()));

        let exec = ExecutableEngine::new("pipeline", pipeline).run(ctx).await.unwrap();

        assert_single_final(&exec);
        assert_final(&exec, FinalStatus::Failure, "boom");
        assert_eq!(recorder.final_count(), 1);
        assert_eq!(exec.steps.len(), fail_at + 2);
    }
}

/// Test that many executions run concurrently without interfering
#[tokio::test]
async fn test_concurrent_executions() {
    let (notifier, recorder) = recording_notifier();
    let engine: Arc<dyn WorkloadEngine> = Arc::new(ExecutableEngine::new(
        "pipeline",
        emit("a")
            .and_then(emit("b"))
            .and_then(send_event(|_| Step::success("done").into())),
    ));

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let engine = engine.clone();
            let ctx = ExecutionContext::new(Execution::new("pipeline"), Vec::new(), notifier.clone());
            tokio::spawn(async move { engine.run(ctx).await })
        })
        .collect();

    for handle in handles {
        let exec = handle.await.unwrap().unwrap();
        assert_single_final(&exec);
        assert_eq!(exec.steps.len(), 3);
    }

    assert_eq!(recorder.final_count(), 16);
    assert_eq!(recorder.results().len(), 16);
}

/// Test concurrent executions recorded in one SQLite database
#[cfg(feature = "sqlite")]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_executions_with_sqlite_history() {
    use workload::persistence::{PublishingNotifier, SqliteExecutionStore};

    let tmp = tempfile::tempdir().unwrap();
    let db_path = tmp.path().join("executions.db");
    let store = SqliteExecutionStore::new(db_path.to_str().unwrap()).await.unwrap();
    let notifier = Arc::new(PublishingNotifier::new(store));

    let engine: Arc<dyn WorkloadEngine> = Arc::new(ExecutableEngine::new(
        "pipeline",
        emit("a")
            .and_then(emit("b"))
            .and_then(send_event(|_| Step::success("done").into())),
    ));

    let handles: Vec<_> = (0..32)
        .map(|_| {
            let engine = engine.clone();
            let ctx = ExecutionContext::new(Execution::new("pipeline"), Vec::new(), notifier.clone());
            tokio::spawn(async move { engine.run(ctx).await })
        })
        .collect();

    for handle in handles {
        let exec = handle.await.unwrap().unwrap();
        assert_single_final(&exec);
        assert_final(&exec, FinalStatus::Success, "done");
    }

    let history = notifier
        .inner()
        .list_executions(Some("pipeline"), 100)
        .await
        .unwrap();
    assert_eq!(history.len(), 32);
    assert!(history.iter().all(|e| e.final_step().map(|s| s.status) == Some(FinalStatus::Success)));
}

/// Test registry lookup and duplicate rejection
#[tokio::test]
async fn test_registry_lookup() {
    let mut registry = EngineRegistry::new();
    registry
        .register(Arc::new(ExecutableEngine::new("first", emit("x"))))
        .unwrap();

    let duplicate = registry.register(Arc::new(ExecutableEngine::new("first", emit("y"))));
    assert!(matches!(duplicate, Err(EngineError::DuplicateEngine(ref n)) if n == "first"));

    assert!(matches!(registry.get("missing"), Err(EngineError::UnknownEngine(_))));

    let (ctx, recorder) = context_with("first", Vec::new());
    let exec = registry.get("first").unwrap().run(ctx).await.unwrap();
    assert_single_final(&exec);
    assert_eq!(recorder.step_messages()[0], "x");
}
