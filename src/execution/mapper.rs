//! Output-to-input correlation strategies

use crate::core::{ExecutionContext, InputFile, OutputFile};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Correlates a produced output with the inputs judged to have caused it
pub trait OutputToInputMapper: Send + Sync {
    /// Inputs the output was derived from
    fn map_inputs(&self, ctx: &ExecutionContext, output: &OutputFile) -> Vec<InputFile>;

    /// Append the correlation ids of the mapped inputs to the output
    ///
    /// Ids already carried by the output are not added again, so calling this
    /// twice on the same output is harmless.
    fn map_input_correlation_ids(&self, ctx: &ExecutionContext, output: OutputFile) -> OutputFile {
        let ids: Vec<String> = self
            .map_inputs(ctx, &output)
            .into_iter()
            .map(|input| input.correlation_id)
            .collect();
        output.with_input_correlation_ids(ids)
    }
}

/// Built-in strategies, selectable by configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum MapperKind {
    /// No input/output lineage
    #[default]
    None,
    /// `foo.txt` produces `foo.png`
    SameNameWithoutExt,
    /// Outputs are grouped in the same directory as their inputs
    SameParent,
    /// Every output derives from every input
    All,
}

impl MapperKind {
    pub fn mapper(&self) -> &'static dyn OutputToInputMapper {
        match self {
            MapperKind::None => &NoMapping,
            MapperKind::SameNameWithoutExt => &SameNameWithoutExt,
            MapperKind::SameParent => &SameParent,
            MapperKind::All => &AllInputs,
        }
    }
}

/// Always maps to nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMapping;

impl OutputToInputMapper for NoMapping {
    fn map_inputs(&self, _ctx: &ExecutionContext, _output: &OutputFile) -> Vec<InputFile> {
        Vec::new()
    }
}

/// Matches inputs whose name equals the output name once the last extension
/// is stripped from both
///
/// A multi-suffix output such as `foo.tar.gz` first looks for `foo.tar`, then
/// falls back to `foo`. The longest stem with a match wins, and all inputs
/// matching it are returned in context input order.
#[derive(Debug, Clone, Copy, Default)]
pub struct SameNameWithoutExt;

impl OutputToInputMapper for SameNameWithoutExt {
    fn map_inputs(&self, ctx: &ExecutionContext, output: &OutputFile) -> Vec<InputFile> {
        let mut output_stem = strip_extension(&output.name);
        loop {
            let matches: Vec<InputFile> = ctx
                .inputs()
                .iter()
                .filter(|input| strip_extension(input.name()) == output_stem)
                .cloned()
                .collect();
            if !matches.is_empty() {
                return matches;
            }

            let shorter = strip_extension(output_stem);
            if shorter == output_stem {
                return Vec::new();
            }
            output_stem = shorter;
        }
    }
}

/// Matches inputs living in the same relative directory as the output
#[derive(Debug, Clone, Copy, Default)]
pub struct SameParent;

impl OutputToInputMapper for SameParent {
    fn map_inputs(&self, ctx: &ExecutionContext, output: &OutputFile) -> Vec<InputFile> {
        let output_parent = parent_of(&output.local_path);
        ctx.inputs()
            .iter()
            .filter(|input| parent_of(&input.local_path) == output_parent)
            .cloned()
            .collect()
    }
}

/// Maps every output to every input
#[derive(Debug, Clone, Copy, Default)]
pub struct AllInputs;

impl OutputToInputMapper for AllInputs {
    fn map_inputs(&self, ctx: &ExecutionContext, _output: &OutputFile) -> Vec<InputFile> {
        ctx.inputs().to_vec()
    }
}

/// Strip the last extension only: `foo.tar.gz` becomes `foo.tar`
fn strip_extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(0) | None => name,
        Some(idx) => &name[..idx],
    }
}

fn parent_of(path: &Path) -> &Path {
    path.parent().unwrap_or_else(|| Path::new(""))
}
