//! Module system traits and interfaces
//!
//! Defines the core trait that modules implement and the erased handle the
//! framework uses to move module instances around without knowing their
//! concrete types.

use async_trait::async_trait;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::module::communication::{CollectDeclaration, ModuleAnchor, ProvideDeclaration};
use crate::module::dependency::DependencyList;
use crate::repository::SharedRepository;

/// Module lifecycle state tracked by the manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleState {
    /// Resolved but not yet configured
    Pending,
    /// Configure step completed successfully
    Configured,
    /// Configure step failed
    Failed(String),
}

/// Module trait that all modules implement
///
/// A module is constructed by application configuration before resolution
/// begins and lives for the process lifetime. It has reference identity:
/// the framework deduplicates and orders instances by pointer and concrete
/// type, never by value.
///
/// All declaration methods are evaluated exactly once per resolution pass;
/// the returned declarations must be derived from fields of the module so
/// that the typed accessors ([`crate::Dependency::get`],
/// [`crate::Collect::get`]) observe the bound results afterwards.
#[async_trait]
pub trait Module: Send + Sync + 'static {
    /// Dependency declarations, in the order they should be resolved.
    fn dependencies(&self) -> DependencyList {
        DependencyList::new()
    }

    /// Values this module contributes during the provide phase.
    fn provides(&self) -> Vec<ProvideDeclaration> {
        Vec::new()
    }

    /// Collection slots populated once the provide phase has run for all
    /// modules.
    fn collects(&self) -> Vec<CollectDeclaration> {
        Vec::new()
    }

    /// Per-module setup, invoked by the manager in resolved order after the
    /// provide/collect phases.
    async fn configure(&self, _context: ModuleContext) -> Result<(), ModuleError> {
        Ok(())
    }
}

/// Object-safe erasure of [`Module`], implemented for every module type.
///
/// Kept crate-private; [`ModuleRef`] is the public handle.
#[async_trait]
pub(crate) trait ErasedModule: Send + Sync {
    fn concrete_type_id(&self) -> TypeId;
    fn concrete_type_name(&self) -> &'static str;
    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
    fn dependencies(&self) -> DependencyList;
    fn provides(&self) -> Vec<ProvideDeclaration>;
    fn collects(&self) -> Vec<CollectDeclaration>;
    async fn configure(&self, context: ModuleContext) -> Result<(), ModuleError>;
}

#[async_trait]
impl<M: Module> ErasedModule for M {
    fn concrete_type_id(&self) -> TypeId {
        TypeId::of::<M>()
    }

    fn concrete_type_name(&self) -> &'static str {
        std::any::type_name::<M>()
    }

    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }

    fn dependencies(&self) -> DependencyList {
        Module::dependencies(self)
    }

    fn provides(&self) -> Vec<ProvideDeclaration> {
        Module::provides(self)
    }

    fn collects(&self) -> Vec<CollectDeclaration> {
        Module::collects(self)
    }

    async fn configure(&self, context: ModuleContext) -> Result<(), ModuleError> {
        Module::configure(self, context).await
    }
}

/// Shared, type-erased handle to a module instance
///
/// Cloning is cheap and preserves identity: two clones refer to the same
/// instance and compare equal under [`ModuleRef::same_instance`].
#[derive(Clone)]
pub struct ModuleRef {
    inner: Arc<dyn ErasedModule>,
}

impl ModuleRef {
    /// Wrap a freshly constructed module.
    pub fn new<M: Module>(module: M) -> Self {
        Self {
            inner: Arc::new(module),
        }
    }

    /// Wrap an already shared module, preserving its identity.
    pub fn from_arc<M: Module>(module: Arc<M>) -> Self {
        Self { inner: module }
    }

    /// Recover the concrete module type, if it matches.
    pub fn downcast<M: Module>(&self) -> Option<Arc<M>> {
        Arc::clone(&self.inner).as_any().downcast::<M>().ok()
    }

    /// Whether this instance is of concrete type `M`.
    pub fn is<M: Module>(&self) -> bool {
        self.concrete_type_id() == TypeId::of::<M>()
    }

    /// Whether two handles refer to the same instance.
    pub fn same_instance(&self, other: &Self) -> bool {
        self.instance_id() == other.instance_id()
    }

    /// Concrete type identity of the wrapped instance.
    pub fn concrete_type_id(&self) -> TypeId {
        self.inner.concrete_type_id()
    }

    /// Fully qualified type name, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        self.inner.concrete_type_name()
    }

    /// Short module name: the last path segment of the type name. Used for
    /// module ids and per-module configuration lookup.
    pub fn name(&self) -> &'static str {
        short_type_name(self.type_name())
    }

    /// Run the module's asynchronous configure step.
    pub async fn configure(&self, context: ModuleContext) -> Result<(), ModuleError> {
        self.inner.configure(context).await
    }

    pub(crate) fn instance_id(&self) -> usize {
        Arc::as_ptr(&self.inner) as *const () as usize
    }

    pub(crate) fn dependencies(&self) -> DependencyList {
        self.inner.dependencies()
    }

    /// The module's provide declarations. Normally driven by the
    /// [`crate::ModuleManager`]; exposed for custom hosts.
    pub fn provides(&self) -> Vec<ProvideDeclaration> {
        self.inner.provides()
    }

    /// The module's collect declarations. Normally driven by the
    /// [`crate::ModuleManager`]; exposed for custom hosts.
    pub fn collects(&self) -> Vec<CollectDeclaration> {
        self.inner.collects()
    }
}

impl fmt::Debug for ModuleRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleRef")
            .field("type", &self.type_name())
            .finish()
    }
}

/// Strip module path segments from a fully qualified type name.
pub(crate) fn short_type_name(full: &'static str) -> &'static str {
    full.rsplit("::").next().unwrap_or(full)
}

/// Context provided to modules during their configure step
///
/// Carries the per-instance id, the module's string configuration from
/// [`crate::FrameworkConfig`], and a handle to the shared communication
/// repository.
#[derive(Debug, Clone)]
pub struct ModuleContext {
    /// Unique identifier for this module instance
    pub module_id: String,
    /// Module configuration (key-value pairs from the framework config)
    pub config: HashMap<String, String>,
    /// Shared repository used for provide/collect communication
    pub repository: SharedRepository<ModuleAnchor>,
}

impl ModuleContext {
    /// Create a new module context
    pub fn new(
        module_id: String,
        config: HashMap<String, String>,
        repository: SharedRepository<ModuleAnchor>,
    ) -> Self {
        Self {
            module_id,
            config,
            repository,
        }
    }

    /// Get a configuration value
    pub fn get_config(&self, key: &str) -> Option<&String> {
        self.config.get(key)
    }

    /// Get a configuration value with default
    pub fn get_config_or(&self, key: &str, default: &str) -> String {
        self.config
            .get(key)
            .map(|s| s.as_str())
            .unwrap_or(default)
            .to_string()
    }
}

/// Recoverable module system errors
///
/// These cover the lifecycle rim only: configuration loading and the
/// per-module configure step. Wiring errors (unsatisfied dependencies,
/// cycles, premature accessor reads, post-collection mutation) are
/// programmer errors and abort instead; see the resolver and mediator
/// documentation.
#[derive(Debug, Error)]
pub enum ModuleError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("module setup failed: {0}")]
    Configure(String),

    #[error("module operation failed: {0}")]
    Operation(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<toml::de::Error> for ModuleError {
    fn from(e: toml::de::Error) -> Self {
        ModuleError::Config(e.to_string())
    }
}

impl From<anyhow::Error> for ModuleError {
    fn from(e: anyhow::Error) -> Self {
        ModuleError::Operation(e.to_string())
    }
}
