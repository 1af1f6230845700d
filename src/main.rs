use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{error, Level};
use tracing_subscriber::FmtSubscriber;
use workload::cli::commands::{EnginesCommand, HistoryCommand, RunCommand, ValidateCommand};
use workload::cli::output::*;
use workload::cli::{Cli, Command};
use workload::core::config::WorkloadConfig;
use workload::engines;
use workload::persistence::{EventNotifier, InMemoryNotifier, PublishingNotifier};
use workload::staging::LocalCopyStager;
use workload::{Execution, ExecutionContext, ExecutionEvent};

#[cfg(feature = "sqlite")]
use workload::persistence::SqliteExecutionStore;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")?;

    // Execute command
    match &cli.command {
        Command::Run(cmd) => run_execution(cmd, &cli.config).await?,
        Command::Validate(cmd) => validate_config(cmd, &cli.config)?,
        Command::Engines(cmd) => list_engines(cmd, &cli.config)?,
        Command::History(cmd) => show_history(cmd).await?,
    }

    Ok(())
}

fn load_config(path: &str) -> Result<WorkloadConfig> {
    WorkloadConfig::from_file(path)
        .with_context(|| format!("Failed to load engines config from {}", path))
}

async fn run_execution(cmd: &RunCommand, config_path: &str) -> Result<()> {
    let config = load_config(config_path)?;
    let registry = engines::bootstrap(&config, Arc::new(LocalCopyStager))?;
    let engine = registry.get(&cmd.engine)?;

    let spinner = create_spinner(format!("Running {}", cmd.engine));
    let progress = spinner.clone();
    let on_event = move |_: &Execution, event: &ExecutionEvent| {
        progress.println(format_execution_event(event));
    };

    // Pick the store the events are recorded in
    let notifier: Arc<dyn EventNotifier> = if cmd.no_history {
        Arc::new(PublishingNotifier::new(InMemoryNotifier::new()).with_event_handler(on_event))
    } else {
        history_notifier(on_event).await?
    };

    let inputs = cmd.input.iter().map(|i| i.to_input_file()).collect();
    let ctx = ExecutionContext::new(Execution::new(engine.name()), inputs, notifier);

    println!(
        "{} Starting {} ({})",
        ROCKET,
        style(engine.name()).bold(),
        style(ctx.execution_id()).dim()
    );

    let exec = engine.run(ctx).await;
    spinner.finish_and_clear();
    let exec = exec.context("Execution did not complete")?;

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&exec)?);
    }

    match exec.final_step() {
        Some(step) if step.status.is_success() => {
            println!(
                "\n{} {} completed {} with {} output files",
                CHECK,
                style(short_id(&exec)).bold(),
                style("successfully").green(),
                exec.output_files.len()
            );
        }
        Some(step) => {
            println!(
                "\n{} {} {}",
                CROSS,
                style(short_id(&exec)).bold(),
                format_final_status(step.status)
            );
            error!("{}", step.message);
            std::process::exit(1);
        }
        None => {
            println!("\n{} {} has no final step", WARN, style(short_id(&exec)).bold());
            std::process::exit(1);
        }
    }

    Ok(())
}

#[cfg(feature = "sqlite")]
async fn history_notifier<F>(on_event: F) -> Result<Arc<dyn EventNotifier>>
where
    F: Fn(&Execution, &ExecutionEvent) + Send + Sync + 'static,
{
    let store = SqliteExecutionStore::with_default_path().await?;
    Ok(Arc::new(PublishingNotifier::new(store).with_event_handler(on_event)))
}

#[cfg(not(feature = "sqlite"))]
async fn history_notifier<F>(on_event: F) -> Result<Arc<dyn EventNotifier>>
where
    F: Fn(&Execution, &ExecutionEvent) + Send + Sync + 'static,
{
    println!("{} History is disabled in this build", WARN);
    Ok(Arc::new(PublishingNotifier::new(InMemoryNotifier::new()).with_event_handler(on_event)))
}

fn validate_config(cmd: &ValidateCommand, config_path: &str) -> Result<()> {
    println!("{} Validating configuration...", INFO);

    match WorkloadConfig::from_file(config_path) {
        Ok(config) => {
            println!("{} Configuration is valid!", CHECK);
            println!("  Workdir root: {}", style(config.workdir_root.display()).bold());
            println!("  Engines: {}", style(config.engines.len()).cyan());

            if cmd.json {
                let json = serde_json::to_string_pretty(&config)?;
                println!("\n{}", json);
            }
            Ok(())
        }
        Err(e) => {
            println!("{} Validation failed:", CROSS);
            println!("  {}", style(e).red());
            std::process::exit(1);
        }
    }
}

fn list_engines(cmd: &EnginesCommand, config_path: &str) -> Result<()> {
    let config = load_config(config_path)?;

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&config.engines)?);
        return Ok(());
    }

    if config.engines.is_empty() {
        println!("{} No engines configured", INFO);
        return Ok(());
    }

    println!("{} Configured engines:", INFO);
    for engine in &config.engines {
        println!(
            "  {} - {} (mapper: {}, timeout: {}s)",
            style(&engine.name).bold(),
            style(&engine.script).cyan(),
            serde_json::to_string(&engine.mapper)?.trim_matches('"'),
            config.timeout_for(engine)
        );
        if let Some(description) = &engine.description {
            println!("    {}", style(description).dim());
        }
    }

    Ok(())
}

#[cfg(feature = "sqlite")]
async fn show_history(cmd: &HistoryCommand) -> Result<()> {
    let store = SqliteExecutionStore::with_default_path().await?;

    // If specific execution ID is requested
    if let Some(exec_id_str) = &cmd.execution_id {
        let exec_id = uuid::Uuid::parse_str(exec_id_str).context("Invalid execution ID format")?;
        match store.find(exec_id).await? {
            Some(exec) => print_execution_details(&exec, cmd.json)?,
            None => println!("{} Execution not found", WARN),
        }
        return Ok(());
    }

    let executions = store
        .list_executions(cmd.engine.as_deref(), cmd.limit)
        .await?;

    if executions.is_empty() {
        println!("{} No executions found", INFO);
        return Ok(());
    }

    if cmd.json {
        let data = serde_json::json!({ "executions": executions });
        println!("{}", serde_json::to_string_pretty(&data)?);
    } else {
        println!("{} Execution history (showing latest {}):", INFO, cmd.limit);
        for exec in &executions {
            println!("  {}", format_execution_summary(exec));
        }
    }

    Ok(())
}

#[cfg(not(feature = "sqlite"))]
async fn show_history(_cmd: &HistoryCommand) -> Result<()> {
    println!("{} History is disabled in this build", WARN);
    Ok(())
}

#[cfg_attr(not(feature = "sqlite"), allow(dead_code))]
fn print_execution_details(exec: &Execution, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(exec)?);
        return Ok(());
    }

    println!("{} Execution Details", INFO);
    println!("  ID: {}", style(exec.id).cyan());
    println!("  Engine: {}", style(&exec.engine).bold());
    println!("  Created: {}", style(exec.created.to_rfc3339()).dim());
    println!("  Updated: {}", style(exec.last_updated.to_rfc3339()).dim());

    println!("\n  {}", style("Steps:").bold());
    for step in &exec.steps {
        println!("    {}", format_step(step));
    }

    if !exec.output_files.is_empty() {
        println!("\n  {}", style("Outputs:").bold());
        for output in &exec.output_files {
            println!(
                "    {} ({} bytes) ← [{}]",
                style(&output.name).bold(),
                output.size_bytes,
                output.input_correlation_ids.join(", ")
            );
        }
    }

    Ok(())
}
