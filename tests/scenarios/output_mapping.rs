//! Test: Output mapping - correlating produced files with their inputs

use crate::helpers::*;
use workload::core::OutputFile;
use workload::execution::{MapperKind, OutputToInputMapper};

fn correlation_ids(kind: MapperKind, inputs: Vec<workload::core::InputFile>, output: &str) -> Vec<String> {
    let (ctx, _recorder) = context_with("mapping", inputs);
    kind.mapper()
        .map_inputs(&ctx, &OutputFile::new(output, 0))
        .into_iter()
        .map(|i| i.correlation_id)
        .collect()
}

/// Test that no-mapping never correlates, even with identical names
#[test]
fn test_no_mapping_purity() {
    let inputs = vec![input("cid-foo", "foo.txt"), input("cid-bar", "bar.txt")];

    for output in ["foo.txt", "foo.png", "bar", "unrelated.bin", ""] {
        assert!(
            correlation_ids(MapperKind::None, inputs.clone(), output).is_empty(),
            "No-mapping correlated {}",
            output
        );
    }
}

/// Test that a multi-suffix output matches on its last extension only
#[test]
fn test_same_name_matching() {
    let inputs = vec![input("cid-foo", "foo.txt"), input("cid-bar", "bar.txt")];

    assert_eq!(
        correlation_ids(MapperKind::SameNameWithoutExt, inputs.clone(), "foo.png"),
        vec!["cid-foo"]
    );
    assert_eq!(
        correlation_ids(MapperKind::SameNameWithoutExt, inputs.clone(), "foo.tar.gz"),
        vec!["cid-foo"]
    );
    assert!(correlation_ids(MapperKind::SameNameWithoutExt, inputs, "baz.png").is_empty());

    // The longest stem with a match wins
    let inputs = vec![input("cid-foo", "foo.txt"), input("cid-tar", "foo.tar.txt")];
    assert_eq!(
        correlation_ids(MapperKind::SameNameWithoutExt, inputs, "foo.tar.gz"),
        vec!["cid-tar"]
    );
}

/// Test that the correlation helper appends ids without duplicating them
#[test]
fn test_map_input_correlation_ids_appends_once() {
    let (ctx, _recorder) = context_with(
        "mapping",
        vec![input("cid-a", "a.txt"), input("cid-b", "b.txt")],
    );
    let mapper = MapperKind::All.mapper();

    let output = OutputFile::new("archive.zip", 10).with_input_correlation_ids(["upstream"]);
    let once = mapper.map_input_correlation_ids(&ctx, output);
    let twice = mapper.map_input_correlation_ids(&ctx, once.clone());

    assert_eq!(once.input_correlation_ids, vec!["upstream", "cid-a", "cid-b"]);
    assert_eq!(twice.input_correlation_ids, once.input_correlation_ids);
}
