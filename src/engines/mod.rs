//! Concrete workload engines and registry bootstrap

pub mod shell;

pub use shell::{CollectedOutputs, ShellProcess};

use crate::core::{config::WorkloadConfig, EngineError};
use crate::execution::EngineRegistry;
use crate::staging::InputStager;
use std::sync::Arc;
use tracing::info;

/// Build the registry of every engine defined in the configuration
pub fn bootstrap(config: &WorkloadConfig, stager: Arc<dyn InputStager>) -> Result<EngineRegistry, EngineError> {
    let mut registry = EngineRegistry::new();
    for engine in &config.engines {
        let process = ShellProcess::from_config(config, engine);
        registry.register(Arc::new(process.into_engine(engine.name.clone(), stager.clone())))?;
    }
    info!("Bootstrapped {} workload engines", registry.len());
    Ok(registry)
}
