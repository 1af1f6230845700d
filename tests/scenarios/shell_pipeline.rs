//! Test: Shell pipeline - engines bootstrapped from YAML running real scripts

#![cfg(unix)]

use crate::helpers::*;
use std::sync::Arc;
use workload::core::config::WorkloadConfig;
use workload::core::{Execution, ExecutionContext, FinalStatus, InputFile, Step};
use workload::engines::bootstrap;
use workload::staging::LocalCopyStager;

fn config(root: &std::path::Path) -> WorkloadConfig {
    let yaml = format!(
        r#"
workdir_root: "{}"
default_timeout_secs: 30
engines:
  - name: "upper"
    description: "Uppercase every input"
    script: "/bin/sh"
    args:
      - "-c"
      - "for f in input/*; do n=$(basename \"$f\"); tr a-z A-Z < \"$f\" > \"output/${{n%.*}}.up\"; done"
    mapper: same-name-without-ext
  - name: "bundle"
    script: "/bin/sh"
    args: ["-c", "cat input/* > output/bundle.txt"]
    mapper: all
  - name: "broken"
    script: "/bin/sh"
    args: ["-c", "echo 'no licence' >&2; exit 7"]
"#,
        root.display()
    );
    WorkloadConfig::from_yaml(&yaml).unwrap()
}

async fn inputs(dir: &std::path::Path) -> Vec<InputFile> {
    tokio::fs::write(dir.join("alpha.txt"), b"alpha").await.unwrap();
    tokio::fs::write(dir.join("beta.txt"), b"beta").await.unwrap();
    vec![
        InputFile::new("cid-alpha", "alpha.txt", dir.join("alpha.txt")),
        InputFile::new("cid-beta", "beta.txt", dir.join("beta.txt")),
    ]
}

fn labels(exec: &Execution) -> Vec<String> {
    exec.steps.iter().map(Step::status_label).collect()
}

/// Test a per-input engine producing one correlated output per input
#[tokio::test]
async fn test_per_input_outputs_are_correlated() {
    let tmp = tempfile::tempdir().unwrap();
    let registry = bootstrap(&config(&tmp.path().join("work")), Arc::new(LocalCopyStager)).unwrap();
    let (notifier, recorder) = recording_notifier();

    let ctx = ExecutionContext::new(Execution::new("upper"), inputs(tmp.path()).await, notifier);
    let exec = registry.get("upper").unwrap().run(ctx).await.unwrap();

    assert_eq!(labels(&exec), vec!["PREPARE", "RUNNING", "CLEANUP", "SUCCESS"]);
    assert_single_final(&exec);

    let outputs: Vec<_> = exec
        .output_files
        .iter()
        .map(|o| (o.name.as_str(), o.input_correlation_ids.clone()))
        .collect();
    assert_eq!(
        outputs,
        vec![
            ("alpha.up", vec!["cid-alpha".to_string()]),
            ("beta.up", vec!["cid-beta".to_string()]),
        ]
    );

    let results = recorder.results();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].outputs.len(), 2);
    assert!(!tmp.path().join("work").join(exec.id.to_string()).exists());
}

/// Test an engine producing a single output from every input
#[tokio::test]
async fn test_bundle_output_maps_to_all_inputs() {
    let tmp = tempfile::tempdir().unwrap();
    let registry = bootstrap(&config(&tmp.path().join("work")), Arc::new(LocalCopyStager)).unwrap();
    let (notifier, _recorder) = recording_notifier();

    let ctx = ExecutionContext::new(Execution::new("bundle"), inputs(tmp.path()).await, notifier);
    let exec = registry.get("bundle").unwrap().run(ctx).await.unwrap();

    assert_final(&exec, FinalStatus::Success, "Produced 1 output files");
    assert_eq!(exec.output_files.len(), 1);
    assert_eq!(exec.output_files[0].size_bytes, 9);
    assert_eq!(
        exec.output_files[0].input_correlation_ids,
        vec!["cid-alpha", "cid-beta"]
    );
}

/// Test that a failing script ends in a single failure step with its stderr
#[tokio::test]
async fn test_failing_script_reports_stderr() {
    let tmp = tempfile::tempdir().unwrap();
    let registry = bootstrap(&config(&tmp.path().join("work")), Arc::new(LocalCopyStager)).unwrap();
    let (notifier, recorder) = recording_notifier();

    let ctx = ExecutionContext::new(Execution::new("broken"), inputs(tmp.path()).await, notifier);
    let exec = registry.get("broken").unwrap().run(ctx).await.unwrap();

    assert_eq!(labels(&exec), vec!["PREPARE", "RUNNING", "FAILURE"]);
    assert_single_final(&exec);
    let message = &exec.final_step().unwrap().message;
    assert!(message.contains("status code 7"), "Unexpected message: {}", message);
    assert!(message.contains("no licence"));
    assert_eq!(recorder.output_event_count(), 0);
    assert!(exec.output_files.is_empty());
}
