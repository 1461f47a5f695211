//! Module system for modkit
//!
//! A module is an opaque unit with reference identity that declares the other
//! modules it depends on and the values it exchanges with the rest of the
//! application. The submodules here cover the whole lifecycle:
//!
//! - **Declaration**: [`traits::Module`] plus the [`dependency`] and
//!   [`communication`] declaration types.
//! - **Resolution**: [`dependency::resolver`] expands the flat module list
//!   into a dependency-ordered sequence.
//! - **Orchestration**: [`manager::ModuleManager`] drives the provide
//!   barrier, collect binding, and the per-module configure step.

pub mod communication;
pub mod dependency;
pub mod manager;
pub mod traits;

pub use communication::{Collect, ModuleAnchor, Provide};
pub use dependency::{Dependency, DependencyGroup, DependencyList, DependencyResolver};
pub use manager::ModuleManager;
pub use traits::{Module, ModuleContext, ModuleError, ModuleRef, ModuleState};
