//! Dynamic dependency groups
//!
//! A dependency group is a dependency declaration whose subject is not one
//! fixed type but an ordered collection of independently typed
//! sub-declarations, assembled at construction time with an append-only
//! builder. Each sub-declaration resolves exactly like a static one; after
//! resolution the owning module retrieves the instances as an ordered list.

use std::any::TypeId;
use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::module::dependency::DependencyDeclaration;
use crate::module::traits::{Module, ModuleRef};

struct GroupEntry {
    target: TypeId,
    target_name: &'static str,
    factory: Option<Arc<dyn Fn() -> ModuleRef + Send + Sync>>,
    slot: Arc<OnceLock<ModuleRef>>,
}

impl Clone for GroupEntry {
    fn clone(&self) -> Self {
        Self {
            target: self.target,
            target_name: self.target_name,
            factory: self.factory.clone(),
            slot: Arc::clone(&self.slot),
        }
    }
}

/// Append-only builder for a [`DependencyGroup`].
///
/// Supports conditional assembly through [`DependencyGroupBuilder::when`];
/// loops are expressed by rebinding the builder:
///
/// ```
/// # use modkit::{DependencyGroupBuilder, Module};
/// # #[derive(Default)] struct Worker;
/// # impl Module for Worker {}
/// let mut builder = DependencyGroupBuilder::new();
/// for _ in 0..3 {
///     builder = builder.add_with(Worker::default);
/// }
/// let group = builder.build();
/// assert_eq!(group.len(), 3);
/// ```
#[derive(Default)]
pub struct DependencyGroupBuilder {
    entries: Vec<GroupEntry>,
}

impl DependencyGroupBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a default-constructible dependency.
    pub fn add<M: Module + Default>(self) -> Self {
        self.add_with(M::default)
    }

    /// Append a dependency with an explicit default factory.
    pub fn add_with<M, F>(mut self, factory: F) -> Self
    where
        M: Module,
        F: Fn() -> M + Send + Sync + 'static,
    {
        self.entries.push(GroupEntry {
            target: TypeId::of::<M>(),
            target_name: std::any::type_name::<M>(),
            factory: Some(Arc::new(move || ModuleRef::new(factory()))),
            slot: Arc::new(OnceLock::new()),
        });
        self
    }

    /// Append a mandatory dependency with no default factory.
    pub fn add_required<M: Module>(mut self) -> Self {
        self.entries.push(GroupEntry {
            target: TypeId::of::<M>(),
            target_name: std::any::type_name::<M>(),
            factory: None,
            slot: Arc::new(OnceLock::new()),
        });
        self
    }

    /// Conditional combinator: apply `build` only when `condition` holds.
    pub fn when(self, condition: bool, build: impl FnOnce(Self) -> Self) -> Self {
        if condition {
            build(self)
        } else {
            self
        }
    }

    /// Freeze the assembled entries into a group.
    pub fn build(self) -> DependencyGroup {
        DependencyGroup {
            entries: self.entries,
        }
    }
}

/// Ordered collection of independently typed dependency declarations.
///
/// Stored as a field on the owning module; [`DependencyGroup::get`] returns
/// the resolved instances once resolution completes. An empty group is
/// always readable and resolves to an empty list.
#[derive(Clone, Default)]
pub struct DependencyGroup {
    entries: Vec<GroupEntry>,
}

impl DependencyGroup {
    /// Start building a group.
    pub fn builder() -> DependencyGroupBuilder {
        DependencyGroupBuilder::new()
    }

    /// An empty group.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether every entry has been bound by the resolver.
    pub fn is_bound(&self) -> bool {
        self.entries.iter().all(|e| e.slot.get().is_some())
    }

    /// The resolved instances, in the order the group was assembled.
    ///
    /// # Panics
    ///
    /// Panics if called before the resolver has bound every entry.
    pub fn get(&self) -> Vec<ModuleRef> {
        self.entries
            .iter()
            .map(|entry| {
                entry.slot.get().cloned().unwrap_or_else(|| {
                    panic!(
                        "dependency group entry '{}' accessed before resolution",
                        entry.target_name
                    )
                })
            })
            .collect()
    }

    /// Erase each entry into a declaration, preserving assembly order.
    pub fn declarations(&self) -> Vec<DependencyDeclaration> {
        self.entries
            .iter()
            .map(|entry| {
                let slot = Arc::clone(&entry.slot);
                let target_name = entry.target_name;
                let binder = Box::new(move |module: &ModuleRef| {
                    if slot.set(module.clone()).is_err() {
                        panic!("dependency group entry '{target_name}' bound twice");
                    }
                });
                let default_factory = entry.factory.clone().map(|factory| {
                    Box::new(move || factory()) as Box<dyn Fn() -> ModuleRef + Send + Sync>
                });
                DependencyDeclaration::from_parts(
                    entry.target,
                    entry.target_name,
                    default_factory,
                    binder,
                )
            })
            .collect()
    }
}

impl fmt::Debug for DependencyGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DependencyGroup")
            .field("targets", &self.entries.iter().map(|e| e.target_name).collect::<Vec<_>>())
            .field("bound", &self.is_bound())
            .finish()
    }
}
