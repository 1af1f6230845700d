//! Engine registry - lookup of workload engines by name

use crate::core::EngineError;
use crate::execution::WorkloadEngine;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

/// Named engines available to the process
///
/// Populated once at startup through [`EngineRegistry::register`], then
/// shared as `Arc<EngineRegistry>`. Lookups need no locking since a shared
/// registry cannot be mutated.
#[derive(Default)]
pub struct EngineRegistry {
    engines: BTreeMap<String, Arc<dyn WorkloadEngine>>,
}

impl EngineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an engine under its own name
    ///
    /// Registering a second engine under an existing name is an error.
    pub fn register(&mut self, engine: Arc<dyn WorkloadEngine>) -> Result<(), EngineError> {
        let name = engine.name().to_string();
        if self.engines.contains_key(&name) {
            return Err(EngineError::DuplicateEngine(name));
        }
        info!("Registered workload engine: {}", name);
        self.engines.insert(name, engine);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn WorkloadEngine>, EngineError> {
        self.engines
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::UnknownEngine(name.to_string()))
    }

    /// Registered engine names, sorted
    pub fn names(&self) -> Vec<&str> {
        self.engines.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.engines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.engines.is_empty()
    }
}
