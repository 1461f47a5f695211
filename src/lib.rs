//! modkit - Composable module framework
//!
//! This crate lets independently authored modules be composed into a running
//! program without each module knowing about the others' concrete types. It
//! provides three tightly coupled subsystems:
//!
//! 1. **Dependency graph resolver**: turns a flat, possibly incomplete list of
//!    module instances into a fully materialized, cycle-free,
//!    dependency-ordered list, auto-instantiating missing dependencies from
//!    declared default factories.
//! 2. **Typed shared knowledge repository**: an anchor-partitioned,
//!    type-keyed heterogeneous store with pluggable read semantics (plain,
//!    defaulted, computed-and-cached, reduced-collection).
//! 3. **Provide/Collect mediator**: publish/subscribe-by-type communication
//!    built on the repository's collection-reducing keys.
//!
//! ## Design Principles
//!
//! 1. **Types are the wire contract**: modules exchange instances and values
//!    by type identity, never by name or string protocol.
//! 2. **Deterministic startup**: resolution and the provide/collect phases are
//!    single-threaded, synchronous, and run once; the resolved order is fully
//!    determined by the input order and declaration order.
//! 3. **Wiring bugs fail loudly**: unsatisfied dependencies, dependency
//!    cycles, premature accessor reads, and post-collection mutation are
//!    programmer errors that abort early, never recoverable results.
//!
//! ## Startup sequence
//!
//! [`ModuleManager::start`] resolves the module graph, runs a full provide
//! pass over every resolved module (a system-wide barrier), binds all collect
//! slots, then invokes each module's asynchronous `configure` step in
//! dependency order.

pub mod config;
pub mod module;
pub mod repository;

// Re-export config types
pub use config::{FrameworkConfig, FrameworkConfigSource};

// Re-export the module system surface
pub use module::communication::{
    Collect, CollectDeclaration, ModuleAnchor, Provide, ProvideDeclaration,
};
pub use module::dependency::{
    Dependency, DependencyDeclaration, DependencyGroup, DependencyGroupBuilder, DependencyList,
    DependencyResolver,
};
pub use module::manager::ModuleManager;
pub use module::traits::{Module, ModuleContext, ModuleError, ModuleRef, ModuleState};

// Re-export the knowledge repository
pub use repository::{
    CollectionKnowledgeSource, ComputedKnowledgeSource, DefaultProvidingKnowledgeSource,
    KnowledgeSource, RepositoryAnchor, SharedRepository,
};
