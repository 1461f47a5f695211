//! Provide/Collect communication mediators
//!
//! Modules exchange values by type through the shared repository: a
//! [`Provide`] declaration contributes one or more values of type `V`
//! during the global provide phase, and a [`Collect`] declaration later
//! reads the aggregated list. The accumulation happens under a
//! collection-reducing repository key whose reduce rule concatenates in
//! provide order.
//!
//! Phase ordering is a system-wide barrier: the manager runs the provide
//! pass over *all* resolved modules before binding any collect slot.
//! Reading a collect slot before that, or mutating a provide value after
//! it has been collected, is a wiring bug and panics.

use std::fmt;
use std::marker::PhantomData;
use std::mem;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use tracing::debug;

use crate::repository::{
    CollectionKnowledgeSource, KnowledgeSource, RepositoryAnchor, SharedRepository,
};

/// Anchor of the process-lifetime repository used for module communication.
pub struct ModuleAnchor;

impl RepositoryAnchor for ModuleAnchor {}

/// Collection-reducing key aggregating every provided `V`.
///
/// The reduce rule appends to the end, preserving provide order.
struct CollectedValues<V>(PhantomData<fn() -> V>);

impl<V: Clone + Send + Sync + 'static> KnowledgeSource<ModuleAnchor> for CollectedValues<V> {
    type Value = Vec<V>;
}

impl<V: Clone + Send + Sync + 'static> CollectionKnowledgeSource<ModuleAnchor>
    for CollectedValues<V>
{
    fn reduce(current: &mut Vec<V>, mut new: Vec<V>) {
        current.append(&mut new);
    }
}

enum ProvideState<V> {
    /// Contributions accumulated so far, in declaration/mutation order
    Pending(Vec<V>),
    /// The collection phase has consumed this declaration
    Collected,
}

/// Value contribution published to the repository during the provide phase.
///
/// Holds a plain value, an optional value, or a batch; stored as a field on
/// the providing module. Once collected, the value is frozen: further
/// mutation panics.
pub struct Provide<V> {
    state: Arc<Mutex<ProvideState<V>>>,
}

impl<V: Clone + Send + Sync + 'static> Provide<V> {
    /// Contribute exactly one value.
    pub fn new(value: V) -> Self {
        Self::many(vec![value])
    }

    /// Contribute one value if present, nothing otherwise.
    pub fn optional(value: Option<V>) -> Self {
        Self::many(value.into_iter().collect())
    }

    /// Contribute each element individually.
    pub fn many(values: Vec<V>) -> Self {
        Self {
            state: Arc::new(Mutex::new(ProvideState::Pending(values))),
        }
    }

    /// Append another contribution before the provide phase runs.
    ///
    /// # Panics
    ///
    /// Panics if the value has already been collected.
    pub fn push(&self, value: V) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match &mut *state {
            ProvideState::Pending(values) => values.push(value),
            ProvideState::Collected => panic!(
                "provide value for '{}' mutated after collection",
                std::any::type_name::<V>()
            ),
        }
    }

    /// Whether the provide phase has consumed this declaration.
    pub fn is_collected(&self) -> bool {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        matches!(*state, ProvideState::Collected)
    }

    /// Erase into a declaration the manager can run during the provide
    /// phase. The declaration shares this holder's state.
    pub fn declaration(&self) -> ProvideDeclaration {
        let state = Arc::clone(&self.state);
        ProvideDeclaration {
            value_type: std::any::type_name::<V>(),
            run: Box::new(move |repository| {
                let mut guard = state.lock().unwrap_or_else(PoisonError::into_inner);
                match mem::replace(&mut *guard, ProvideState::Collected) {
                    ProvideState::Pending(values) => {
                        if !values.is_empty() {
                            repository.reduce::<CollectedValues<V>>(values);
                        }
                    }
                    ProvideState::Collected => panic!(
                        "provide value for '{}' collected twice",
                        std::any::type_name::<V>()
                    ),
                }
            }),
        }
    }
}

impl<V: fmt::Debug> fmt::Debug for Provide<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match &*state {
            ProvideState::Pending(values) => {
                f.debug_tuple("Provide::Pending").field(values).finish()
            }
            ProvideState::Collected => f.write_str("Provide::Collected"),
        }
    }
}

/// Erased provide declaration, run once during the provide phase.
pub struct ProvideDeclaration {
    value_type: &'static str,
    run: Box<dyn Fn(&SharedRepository<ModuleAnchor>) + Send + Sync>,
}

impl ProvideDeclaration {
    /// Name of the provided value type, for diagnostics.
    pub fn value_type(&self) -> &'static str {
        self.value_type
    }

    /// Write the pending contributions into the repository and freeze the
    /// backing [`Provide`]. Normally driven by the
    /// [`crate::ModuleManager`]; exposed for custom hosts.
    pub fn collect_into(&self, repository: &SharedRepository<ModuleAnchor>) {
        debug!(value_type = self.value_type, "collecting provided value");
        (self.run)(repository);
    }
}

impl fmt::Debug for ProvideDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProvideDeclaration")
            .field("value_type", &self.value_type)
            .finish()
    }
}

/// Aggregated view of every value of type `V` provided across all modules.
///
/// A two-state holder mirroring [`crate::Dependency`]: unavailable until
/// the global provide phase has run, then bound exactly once.
pub struct Collect<V> {
    slot: Arc<OnceLock<Vec<V>>>,
}

impl<V: Clone + Send + Sync + 'static> Collect<V> {
    pub fn new() -> Self {
        Self {
            slot: Arc::new(OnceLock::new()),
        }
    }

    /// Whether the collect phase has populated this slot.
    pub fn is_bound(&self) -> bool {
        self.slot.get().is_some()
    }

    /// The collected values, in provide order. Empty if no module provided
    /// `V` - never an error.
    ///
    /// # Panics
    ///
    /// Panics if read before the provide phase has completed.
    pub fn get(&self) -> &[V] {
        self.slot
            .get()
            .map(Vec::as_slice)
            .unwrap_or_else(|| {
                panic!(
                    "collected values for '{}' read before the provide phase completed",
                    std::any::type_name::<V>()
                )
            })
    }

    /// Erase into a declaration the manager runs after the provide phase.
    pub fn declaration(&self) -> CollectDeclaration {
        let slot = Arc::clone(&self.slot);
        CollectDeclaration {
            value_type: std::any::type_name::<V>(),
            run: Box::new(move |repository| {
                let values = repository.get::<CollectedValues<V>>().unwrap_or_default();
                if slot.set(values).is_err() {
                    panic!(
                        "collect slot for '{}' bound twice",
                        std::any::type_name::<V>()
                    );
                }
            }),
        }
    }
}

impl<V: Clone + Send + Sync + 'static> Default for Collect<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone + Send + Sync + 'static> Clone for Collect<V> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<V: fmt::Debug> fmt::Debug for Collect<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collect")
            .field("bound", &self.slot.get().is_some())
            .finish()
    }
}

/// Erased collect declaration, run once after the provide phase barrier.
pub struct CollectDeclaration {
    value_type: &'static str,
    run: Box<dyn Fn(&SharedRepository<ModuleAnchor>) + Send + Sync>,
}

impl CollectDeclaration {
    /// Name of the collected value type, for diagnostics.
    pub fn value_type(&self) -> &'static str {
        self.value_type
    }

    /// Bind the aggregated values from the repository into the backing
    /// [`Collect`] slot. Normally driven by the [`crate::ModuleManager`];
    /// exposed for custom hosts.
    pub fn bind_from(&self, repository: &SharedRepository<ModuleAnchor>) {
        debug!(value_type = self.value_type, "binding collected values");
        (self.run)(repository);
    }
}

impl fmt::Debug for CollectDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectDeclaration")
            .field("value_type", &self.value_type)
            .finish()
    }
}
