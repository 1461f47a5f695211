//! Dependency declarations
//!
//! A dependency declaration is a value object produced by a module that says
//! "I need an instance of type `M`; if none exists, construct it with this
//! factory". Declarations follow a two-phase contract: they are evaluated
//! before the dependency graph is known, and the resolver later calls
//! [`DependencyDeclaration::bind`] exactly once so the owning module can
//! reach the concrete instance through its typed accessor.
//!
//! The accessor side is an explicit two-state holder (`Unbound | Bound`)
//! with a single allowed transition; reading it while unbound is a wiring
//! bug and panics.

pub mod group;
pub mod resolver;

pub use group::{DependencyGroup, DependencyGroupBuilder};
pub use resolver::DependencyResolver;

use std::any::TypeId;
use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::module::traits::{Module, ModuleRef};

/// Typed dependency holder, stored as a field on the owning module.
///
/// Starts unbound; the resolver binds it to the concrete instance during
/// resolution. [`Dependency::get`] panics if read before that.
pub struct Dependency<M: Module> {
    slot: Arc<OnceLock<Arc<M>>>,
    factory: Option<Arc<dyn Fn() -> M + Send + Sync>>,
}

impl<M: Module> Dependency<M> {
    /// A mandatory dependency: resolution fails fatally unless an instance
    /// of `M` is supplied in the initial module list or created earlier in
    /// the same pass.
    pub fn required() -> Self {
        Self {
            slot: Arc::new(OnceLock::new()),
            factory: None,
        }
    }

    /// A dependency with an explicit default factory, used when no instance
    /// of `M` exists anywhere in scope.
    pub fn auto_with<F>(factory: F) -> Self
    where
        F: Fn() -> M + Send + Sync + 'static,
    {
        Self {
            slot: Arc::new(OnceLock::new()),
            factory: Some(Arc::new(factory)),
        }
    }

    /// Whether the resolver has bound this dependency yet.
    pub fn is_bound(&self) -> bool {
        self.slot.get().is_some()
    }

    /// The bound instance, if resolution has run.
    pub fn try_get(&self) -> Option<&M> {
        self.slot.get().map(|a| a.as_ref())
    }

    /// The bound instance.
    ///
    /// # Panics
    ///
    /// Panics if called before the resolver has bound this dependency.
    pub fn get(&self) -> &M {
        self.try_get().unwrap_or_else(|| {
            panic!(
                "dependency on '{}' accessed before resolution",
                std::any::type_name::<M>()
            )
        })
    }

    /// A shared handle to the bound instance.
    ///
    /// # Panics
    ///
    /// Panics if called before the resolver has bound this dependency.
    pub fn get_arc(&self) -> Arc<M> {
        self.slot
            .get()
            .cloned()
            .unwrap_or_else(|| {
                panic!(
                    "dependency on '{}' accessed before resolution",
                    std::any::type_name::<M>()
                )
            })
    }

    /// Erase this dependency into a declaration the resolver understands.
    ///
    /// The declaration shares the holder's slot: binding the declaration
    /// makes the instance visible through [`Dependency::get`].
    pub fn declaration(&self) -> DependencyDeclaration {
        let slot = Arc::clone(&self.slot);
        let binder = Box::new(move |module: &ModuleRef| {
            let instance = module.downcast::<M>().unwrap_or_else(|| {
                unreachable!(
                    "resolver bound '{}' to a dependency on '{}'",
                    module.type_name(),
                    std::any::type_name::<M>()
                )
            });
            if slot.set(instance).is_err() {
                panic!(
                    "dependency on '{}' bound twice",
                    std::any::type_name::<M>()
                );
            }
        });
        let default_factory = self.factory.clone().map(|factory| {
            Box::new(move || ModuleRef::new(factory())) as Box<dyn Fn() -> ModuleRef + Send + Sync>
        });
        DependencyDeclaration {
            target: TypeId::of::<M>(),
            target_name: std::any::type_name::<M>(),
            default_factory,
            binder,
        }
    }
}

impl<M: Module + Default> Default for Dependency<M> {
    /// Equivalent to `Dependency::auto_with(M::default)`.
    fn default() -> Self {
        Self::auto_with(M::default)
    }
}

impl<M: Module> Clone for Dependency<M> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
            factory: self.factory.clone(),
        }
    }
}

impl<M: Module> fmt::Debug for Dependency<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dependency")
            .field("target", &std::any::type_name::<M>())
            .field("bound", &self.is_bound())
            .finish()
    }
}

/// Erased dependency declaration consumed by the resolver.
///
/// `(target type, optional default factory, binder)`. Immutable once
/// evaluated for a resolution pass.
pub struct DependencyDeclaration {
    target: TypeId,
    target_name: &'static str,
    default_factory: Option<Box<dyn Fn() -> ModuleRef + Send + Sync>>,
    binder: Box<dyn Fn(&ModuleRef) + Send + Sync>,
}

impl DependencyDeclaration {
    /// Target type identity.
    pub fn target(&self) -> TypeId {
        self.target
    }

    /// Target type name, for diagnostics.
    pub fn target_name(&self) -> &'static str {
        self.target_name
    }

    /// Whether a default factory was declared.
    pub fn has_default(&self) -> bool {
        self.default_factory.is_some()
    }

    /// Bind the resolved instance into the owning module's holder.
    pub(crate) fn bind(&self, instance: &ModuleRef) {
        (self.binder)(instance);
    }

    /// Instantiate the default factory, if one was declared.
    pub(crate) fn instantiate_default(&self) -> Option<ModuleRef> {
        self.default_factory.as_ref().map(|factory| factory())
    }

    pub(crate) fn from_parts(
        target: TypeId,
        target_name: &'static str,
        default_factory: Option<Box<dyn Fn() -> ModuleRef + Send + Sync>>,
        binder: Box<dyn Fn(&ModuleRef) + Send + Sync>,
    ) -> Self {
        Self {
            target,
            target_name,
            default_factory,
            binder,
        }
    }
}

impl fmt::Debug for DependencyDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DependencyDeclaration")
            .field("target", &self.target_name)
            .field("has_default", &self.has_default())
            .finish()
    }
}

/// Ordered, append-only list of dependency declarations.
///
/// Built once per resolution pass by [`Module::dependencies`]. The builder
/// combinators allow conditional construction; once returned, the list is
/// immutable for that pass.
#[derive(Debug, Default)]
pub struct DependencyList {
    entries: Vec<DependencyDeclaration>,
}

impl DependencyList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a declaration.
    pub fn with(mut self, declaration: DependencyDeclaration) -> Self {
        self.entries.push(declaration);
        self
    }

    /// Append every sub-declaration of a dynamic dependency group, in the
    /// order the group was assembled.
    pub fn with_group(mut self, group: &DependencyGroup) -> Self {
        self.entries.extend(group.declarations());
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

    /// Append a declaration in place.
    pub fn push(&mut self, declaration: DependencyDeclaration) {
        self.entries.push(declaration);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn into_entries(self) -> Vec<DependencyDeclaration> {
        self.entries
    }
}
