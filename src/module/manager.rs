//! Module manager orchestrating the startup sequence
//!
//! The manager owns the registered module list and the process-lifetime
//! communication repository, and drives the four startup steps in order:
//!
//! 1. resolve the dependency graph into a dependency-ordered sequence;
//! 2. run the provide pass over every resolved module (system-wide
//!    barrier - no collect runs before every provide has);
//! 3. bind every collect slot from the aggregated repository state;
//! 4. invoke each module's asynchronous configure step, in resolved order.

use tracing::{debug, error, info};
use uuid::Uuid;

use crate::config::{FrameworkConfig, FrameworkConfigSource};
use crate::module::communication::ModuleAnchor;
use crate::module::dependency::DependencyResolver;
use crate::module::traits::{Module, ModuleContext, ModuleError, ModuleRef, ModuleState};
use crate::repository::SharedRepository;
use std::sync::Arc;

/// Module manager coordinating resolution, communication phases, and the
/// per-module configure step.
pub struct ModuleManager {
    config: FrameworkConfig,
    registered: Vec<ModuleRef>,
    /// Resolved modules in dependency order, filled by `start`
    modules: Vec<ModuleRef>,
    /// Lifecycle state per resolved module, parallel to `modules`
    states: Vec<ModuleState>,
    repository: SharedRepository<ModuleAnchor>,
    started: bool,
}

impl ModuleManager {
    /// Create a manager with default configuration.
    pub fn new() -> Self {
        Self::with_config(FrameworkConfig::default())
    }

    /// Create a manager with explicit configuration.
    pub fn with_config(config: FrameworkConfig) -> Self {
        Self {
            config,
            registered: Vec::new(),
            modules: Vec::new(),
            states: Vec::new(),
            repository: SharedRepository::new(),
            started: false,
        }
    }

    /// Register a module instance. Registration order is the resolution
    /// input order.
    pub fn register(&mut self, module: ModuleRef) -> &mut Self {
        debug!(module = module.type_name(), "registering module");
        self.registered.push(module);
        self
    }

    /// Register several modules at once.
    pub fn register_all(&mut self, modules: impl IntoIterator<Item = ModuleRef>) -> &mut Self {
        for module in modules {
            self.register(module);
        }
        self
    }

    /// Run the full startup sequence.
    ///
    /// Returns an error if the manager was already started, if the
    /// configuration names an unknown module, or if a module's configure
    /// step fails. Wiring bugs (cycles, unsatisfied dependencies) panic;
    /// see [`DependencyResolver::resolve`].
    pub async fn start(&mut self) -> Result<(), ModuleError> {
        if self.started {
            return Err(ModuleError::Operation(
                "module manager already started".to_string(),
            ));
        }

        let initial = self.enabled_modules()?;
        info!(module_count = initial.len(), "starting module manager");

        let resolved = DependencyResolver::resolve(initial);
        if self.config.trace_resolution {
            for (index, module) in resolved.iter().enumerate() {
                info!(index, module = module.type_name(), "resolved order");
            }
        }

        // Make the framework configuration readable by every module.
        self.repository
            .set::<FrameworkConfigSource>(self.config.clone());

        // Provide phase: a full pass over all resolved modules before any
        // collect is bound.
        for module in &resolved {
            for provide in module.provides() {
                debug!(
                    module = module.type_name(),
                    value_type = provide.value_type(),
                    "provide phase"
                );
                provide.collect_into(&self.repository);
            }
        }

        // Collect phase: bind every slot from the aggregated state.
        for module in &resolved {
            for collect in module.collects() {
                debug!(
                    module = module.type_name(),
                    value_type = collect.value_type(),
                    "collect phase"
                );
                collect.bind_from(&self.repository);
            }
        }

        self.states = vec![ModuleState::Pending; resolved.len()];
        self.modules = resolved;
        self.started = true;

        // Configure phase, in dependency order.
        for index in 0..self.modules.len() {
            let module = self.modules[index].clone();
            let context = ModuleContext::new(
                format!("{}_{}", module.name(), Uuid::new_v4()),
                self.config.module_config(module.name()),
                self.repository.clone(),
            );
            match module.configure(context).await {
                Ok(()) => {
                    debug!(module = module.type_name(), "module configured");
                    self.states[index] = ModuleState::Configured;
                }
                Err(e) => {
                    error!(module = module.type_name(), error = %e, "module configure failed");
                    self.states[index] = ModuleState::Failed(e.to_string());
                    return Err(ModuleError::Configure(format!(
                        "module '{}' failed to configure: {e}",
                        module.name()
                    )));
                }
            }
        }

        info!(module_count = self.modules.len(), "module manager started");
        Ok(())
    }

    /// Resolved modules in dependency order. Empty before `start`.
    pub fn modules(&self) -> &[ModuleRef] {
        &self.modules
    }

    /// Lifecycle states parallel to [`ModuleManager::modules`].
    pub fn module_states(&self) -> &[ModuleState] {
        &self.states
    }

    /// The process-lifetime communication repository.
    pub fn repository(&self) -> &SharedRepository<ModuleAnchor> {
        &self.repository
    }

    /// Look up a resolved module by concrete type.
    pub fn get<M: Module>(&self) -> Option<Arc<M>> {
        self.modules.iter().find_map(|module| module.downcast::<M>())
    }

    /// Apply the `enabled_modules` filter from the configuration.
    fn enabled_modules(&self) -> Result<Vec<ModuleRef>, ModuleError> {
        if self.config.enabled_modules.is_empty() {
            return Ok(self.registered.clone());
        }

        for name in &self.config.enabled_modules {
            if !self.registered.iter().any(|m| m.name() == name) {
                return Err(ModuleError::Config(format!(
                    "enabled module '{name}' is not registered"
                )));
            }
        }

        Ok(self
            .registered
            .iter()
            .filter(|m| self.config.enabled_modules.iter().any(|n| n == m.name()))
            .cloned()
            .collect())
    }
}

impl Default for ModuleManager {
    fn default() -> Self {
        Self::new()
    }
}
