//! Shell engine - runs a script against the staged inputs of an execution
//!
//! The script runs with the execution workdir as current directory. Inputs
//! are staged under `input/`, and every file the script writes under
//! `output/` becomes an output file of the execution.

use crate::{
    core::{
        config::{EngineConfig, WorkloadConfig},
        ExecutionContext, ExecutionEvent, FinalStatus, FinalStep, IntermediaryStatus,
        IntermediaryStep, OutputFile, ProcessingError,
    },
    execution::{
        from_fn, send_event, send_failure_event, ExecutableEngine, Executable, ExecutableExt,
        MapperKind,
    },
    staging::{InputStager, Workdir},
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

/// Files collected from the output directory
#[derive(Debug, Clone, Default)]
pub struct CollectedOutputs(pub Vec<OutputFile>);

/// Definition of a script run
#[derive(Debug, Clone)]
pub struct ShellProcess {
    /// Script name or path
    pub script: String,

    /// Extra arguments given to the script
    pub args: Vec<String>,

    /// Environment variables given to the script
    pub env: HashMap<String, String>,

    /// How outputs are correlated to inputs
    pub mapper: MapperKind,

    /// Timeout for the script in seconds
    pub timeout_secs: u64,

    /// Directory under which execution workdirs are created
    pub workdir_root: PathBuf,

    /// Keep the workdir after the run
    pub keep_workdir: bool,
}

impl ShellProcess {
    pub fn new(script: impl Into<String>, workdir_root: impl Into<PathBuf>) -> Self {
        Self {
            script: resolve_script(script.into()),
            args: Vec::new(),
            env: HashMap::new(),
            mapper: MapperKind::None,
            timeout_secs: crate::core::config::DEFAULT_TIMEOUT_SECS,
            workdir_root: workdir_root.into(),
            keep_workdir: false,
        }
    }

    /// Build a process from an engine configuration
    pub fn from_config(config: &WorkloadConfig, engine: &EngineConfig) -> Self {
        Self {
            script: resolve_script(engine.script.clone()),
            args: engine.args.clone(),
            env: engine.env.clone(),
            mapper: engine.mapper,
            timeout_secs: config.timeout_for(engine),
            workdir_root: config.workdir_root.clone(),
            keep_workdir: engine.keep_workdir,
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn with_mapper(mut self, mapper: MapperKind) -> Self {
        self.mapper = mapper;
        self
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn keep_workdir(mut self, keep: bool) -> Self {
        self.keep_workdir = keep;
        self
    }

    /// Engine running this process under the given name
    pub fn into_engine(self, name: impl Into<String>, stager: Arc<dyn InputStager>) -> ExecutableEngine {
        let process = Arc::new(self);
        ExecutableEngine::new(name, process.executable(stager))
    }

    /// The full pipeline of a script run
    pub fn executable(self: &Arc<Self>, stager: Arc<dyn InputStager>) -> impl Executable {
        let root = self.workdir_root.clone();

        send_event(prepare_event)
            .named("send prepare")
            .and_then(self.prepare_workdir(stager).named("prepare workdir"))
            .and_then(send_event(self.running_event()).named("send running"))
            .and_then(self.run_script().named("run script"))
            .and_then(self.collect_outputs().named("collect outputs"))
            .and_then(send_event(cleanup_event).named("send cleanup"))
            .and_then(self.clean_workdir().named("clean workdir"))
            .and_then(send_event(success_event).named("send success"))
            .on_error(move |err| {
                send_failure_event(err)
                    .and_then(clean_workdir_quietly(root.clone()))
                    .boxed()
            })
    }

    fn workdir(&self, ctx: &ExecutionContext) -> Workdir {
        Workdir::for_execution(&self.workdir_root, ctx.execution_id())
    }

    fn prepare_workdir(self: &Arc<Self>, stager: Arc<dyn InputStager>) -> impl Executable {
        let process = self.clone();
        from_fn(move |ctx| {
            let process = process.clone();
            let stager = stager.clone();
            async move {
                let workdir = process.workdir(&ctx);
                workdir.create().await?;
                for input in ctx.inputs() {
                    stager.stage(input, &workdir).await?;
                }
                debug!(
                    "exec={} staged {} inputs in {}",
                    ctx.execution_id(),
                    ctx.inputs().len(),
                    workdir.base().display()
                );
                Ok(ctx.with_param(workdir))
            }
        })
    }

    fn running_event(self: &Arc<Self>) -> impl Fn(&ExecutionContext) -> ExecutionEvent + Send + Sync + 'static {
        let script = self.script.clone();
        move |ctx| {
            let step = IntermediaryStep::new(
                IntermediaryStatus::Running,
                format!("Launch script {} | execId={}", script, ctx.execution_id()),
            )
            .with_metadata("script", script.clone());
            ExecutionEvent::Intermediary { step }
        }
    }

    fn run_script(self: &Arc<Self>) -> impl Executable {
        let process = self.clone();
        from_fn(move |ctx| {
            let process = process.clone();
            async move {
                let workdir = ctx.param::<Workdir>()?;
                process.launch(&ctx, &workdir).await?;
                Ok(ctx)
            }
        })
    }

    async fn launch(&self, ctx: &ExecutionContext, workdir: &Workdir) -> Result<(), ProcessingError> {
        let exec_id = ctx.execution_id();
        info!("exec={} launching script {}", exec_id, self.script);

        let mut command = Command::new(&self.script);
        command
            .args(&self.args)
            .current_dir(workdir.base())
            .envs(&self.env)
            .env("WORKLOAD_EXECUTION_ID", exec_id.to_string())
            .env("WORKLOAD_INPUT_DIR", workdir.input_dir())
            .env("WORKLOAD_OUTPUT_DIR", workdir.output_dir())
            .kill_on_drop(true);

        let output = timeout(Duration::from_secs(self.timeout_secs), command.output())
            .await
            .map_err(|_| ProcessingError::Timeout(self.timeout_secs))??;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !stdout.trim().is_empty() {
            debug!("exec={} script={} stdout: {}", exec_id, self.script, stdout.trim());
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let code = output.status.code().unwrap_or(-1);
            error!(
                "exec={} script={} exited with status code {}: {}",
                exec_id, self.script, code, stderr
            );
            return Err(ProcessingError::Script {
                script: self.script.clone(),
                code,
                stderr,
            });
        }

        info!("exec={} script={} exited with status code 0", exec_id, self.script);
        Ok(())
    }

    fn collect_outputs(self: &Arc<Self>) -> impl Executable {
        let process = self.clone();
        from_fn(move |ctx| {
            let process = process.clone();
            async move {
                let workdir = ctx.param::<Workdir>()?;
                let mapper = process.mapper.mapper();

                let outputs: Vec<OutputFile> = list_files(&workdir.output_dir())
                    .await?
                    .into_iter()
                    .map(|(path, size)| mapper.map_input_correlation_ids(&ctx, OutputFile::new(path, size)))
                    .collect();

                debug!("exec={} collected {} outputs", ctx.execution_id(), outputs.len());
                Ok(ctx.with_param(CollectedOutputs(outputs)))
            }
        })
    }

    fn clean_workdir(self: &Arc<Self>) -> impl Executable {
        let keep = self.keep_workdir;
        from_fn(move |ctx| async move {
            if keep {
                return Ok(ctx);
            }
            ctx.param::<Workdir>()?.clean().await?;
            Ok(ctx)
        })
    }
}

fn prepare_event(ctx: &ExecutionContext) -> ExecutionEvent {
    ExecutionEvent::Intermediary {
        step: IntermediaryStep::new(
            IntermediaryStatus::Prepare,
            format!("Load input files into workdir | execId={}", ctx.execution_id()),
        ),
    }
}

fn cleanup_event(ctx: &ExecutionContext) -> ExecutionEvent {
    ExecutionEvent::Intermediary {
        step: IntermediaryStep::new(
            IntermediaryStatus::Cleanup,
            format!("Clean workdir | execId={}", ctx.execution_id()),
        ),
    }
}

fn success_event(ctx: &ExecutionContext) -> ExecutionEvent {
    let outputs = ctx
        .param::<CollectedOutputs>()
        .map(|collected| collected.0.clone())
        .unwrap_or_default();
    let message = format!("Produced {} output files", outputs.len());
    ExecutionEvent::final_with_outputs(FinalStep::new(FinalStatus::Success, message), outputs)
}

/// Workdir removal on the failure path; errors are only logged
fn clean_workdir_quietly(root: PathBuf) -> impl Executable {
    from_fn(move |ctx| {
        let workdir = Workdir::for_execution(&root, ctx.execution_id());
        async move {
            if let Err(e) = workdir.clean().await {
                warn!("exec={} could not clean workdir: {}", ctx.execution_id(), e);
            }
            Ok(ctx)
        }
    })
}

/// Files under `dir` as (relative path, size), sorted by path
async fn list_files(dir: &Path) -> Result<Vec<(PathBuf, u64)>, ProcessingError> {
    let mut files = Vec::new();
    let mut pending = vec![dir.to_path_buf()];

    while let Some(current) = pending.pop() {
        let mut entries = tokio::fs::read_dir(&current).await?;
        while let Some(entry) = entries.next_entry().await? {
            let metadata = entry.metadata().await?;
            let path = entry.path();
            if metadata.is_dir() {
                pending.push(path);
            } else if metadata.is_file() {
                let relative = path
                    .strip_prefix(dir)
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|_| path.clone());
                files.push((relative, metadata.len()));
            }
        }
    }

    files.sort();
    Ok(files)
}

/// Relative script paths are resolved against the process working directory,
/// since the script runs from the execution workdir
fn resolve_script(script: String) -> String {
    let path = Path::new(&script);
    if path.is_relative() && path.components().count() > 1 {
        if let Ok(cwd) = std::env::current_dir() {
            return cwd.join(path).to_string_lossy().into_owned();
        }
    }
    script
}
