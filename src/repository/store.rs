//! Shared repository storage
//!
//! Reference-type storage strategy: a `SharedRepository` clone shares the
//! same underlying map, so every holder observes every write. Writes are
//! single-threaded during the startup phases; concurrent reads afterwards
//! go through the `RwLock` read path.

use indexmap::IndexMap;
use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, error};

use crate::repository::{
    CollectionKnowledgeSource, ComputedKnowledgeSource, DefaultProvidingKnowledgeSource,
    KnowledgeSource, RepositoryAnchor,
};

thread_local! {
    /// Computed sources currently being evaluated on this thread, for
    /// same-key re-entrancy detection.
    static COMPUTING: RefCell<HashSet<TypeId>> = RefCell::new(HashSet::new());
}

struct StoredValue {
    value: Box<dyn Any + Send + Sync>,
    source_name: &'static str,
}

/// Anchor-partitioned, type-keyed heterogeneous value store.
///
/// Entries keep insertion order, which makes [`SharedRepository::collect_matching`]
/// scans deterministic.
pub struct SharedRepository<A: RepositoryAnchor> {
    entries: Arc<RwLock<IndexMap<TypeId, StoredValue>>>,
    _anchor: PhantomData<fn() -> A>,
}

impl<A: RepositoryAnchor> SharedRepository<A> {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(IndexMap::new())),
            _anchor: PhantomData,
        }
    }

    /// Plain read. Absent keys yield `None`; the stored value is cloned out.
    pub fn get<S: KnowledgeSource<A>>(&self) -> Option<S::Value> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(&TypeId::of::<S>())
            .and_then(|stored| stored.value.downcast_ref::<S::Value>())
            .cloned()
    }

    /// Plain write, overwriting any previous value under this key.
    pub fn set<S: KnowledgeSource<A>>(&self, value: S::Value) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(
            TypeId::of::<S>(),
            StoredValue {
                value: Box::new(value),
                source_name: std::any::type_name::<S>(),
            },
        );
    }

    /// Whether a value is stored under this key.
    pub fn contains<S: KnowledgeSource<A>>(&self) -> bool {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.contains_key(&TypeId::of::<S>())
    }

    /// Remove the value under this key, returning it. Also the explicit
    /// cache invalidation path for computed sources.
    pub fn clear<S: KnowledgeSource<A>>(&self) -> Option<S::Value> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries
            .shift_remove(&TypeId::of::<S>())
            .and_then(|stored| stored.value.downcast::<S::Value>().ok())
            .map(|boxed| *boxed)
    }

    /// Defaulted read: never absent. The default is recomputed on every
    /// absent lookup, never cached.
    pub fn get_or_default<S: DefaultProvidingKnowledgeSource<A>>(&self) -> S::Value {
        self.get::<S>().unwrap_or_else(S::default_value)
    }

    /// Computed read: computes on first access, caches permanently until
    /// [`SharedRepository::clear`] is called for the key.
    ///
    /// # Panics
    ///
    /// Panics if the computation re-enters its own key (a cycle among
    /// computed sources).
    pub fn get_computed<S: ComputedKnowledgeSource<A>>(&self) -> S::Value {
        if let Some(value) = self.get::<S>() {
            return value;
        }

        let key = TypeId::of::<S>();
        COMPUTING.with(|computing| {
            if !computing.borrow_mut().insert(key) {
                error!(
                    source = std::any::type_name::<S>(),
                    "computed knowledge source re-entered its own computation"
                );
                panic!(
                    "computed knowledge source cycle detected at '{}'",
                    std::any::type_name::<S>()
                );
            }
        });

        debug!(source = std::any::type_name::<S>(), "computing knowledge source");
        let value = S::compute(self);

        COMPUTING.with(|computing| {
            computing.borrow_mut().remove(&key);
        });

        // First writer wins; a concurrent computation of the same pure
        // function yields the same value anyway.
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let stored = entries.entry(key).or_insert_with(|| StoredValue {
            value: Box::new(value),
            source_name: std::any::type_name::<S>(),
        });
        match stored.value.downcast_ref::<S::Value>() {
            Some(cached) => cached.clone(),
            None => unreachable!("stored value type mismatch for '{}'", stored.source_name),
        }
    }

    /// Reducing write: combines with the stored value through the key's
    /// reduce rule instead of overwriting.
    pub fn reduce<S: CollectionKnowledgeSource<A>>(&self, value: S::Value) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        match entries.entry(TypeId::of::<S>()) {
            indexmap::map::Entry::Occupied(mut occupied) => {
                match occupied.get_mut().value.downcast_mut::<S::Value>() {
                    Some(current) => S::reduce(current, value),
                    None => unreachable!(
                        "stored value type mismatch for '{}'",
                        std::any::type_name::<S>()
                    ),
                }
            }
            indexmap::map::Entry::Vacant(vacant) => {
                vacant.insert(StoredValue {
                    value: Box::new(value),
                    source_name: std::any::type_name::<S>(),
                });
            }
        }
    }

    /// Linear scan over every stored entry in insertion order, filtering
    /// through a caller-supplied conformance cast. This is the
    /// collect-all-matching operation: matches are returned regardless of
    /// which key stored them.
    pub fn collect_matching<T>(
        &self,
        cast: impl Fn(&(dyn Any + Send + Sync)) -> Option<T>,
    ) -> Vec<T> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .values()
            .filter_map(|stored| cast(stored.value.as_ref()))
            .collect()
    }

    /// Collect every stored value of exact type `T`, regardless of key.
    pub fn collect_of<T: Clone + 'static>(&self) -> Vec<T> {
        self.collect_matching(|value| value.downcast_ref::<T>().cloned())
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<A: RepositoryAnchor> Default for SharedRepository<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: RepositoryAnchor> Clone for SharedRepository<A> {
    /// Clones share storage: this is the reference-type strategy, a single
    /// copy visible to all holders.
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
            _anchor: PhantomData,
        }
    }
}

impl<A: RepositoryAnchor> fmt::Debug for SharedRepository<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("SharedRepository")
            .field("anchor", &std::any::type_name::<A>())
            .field(
                "sources",
                &entries.values().map(|s| s.source_name).collect::<Vec<_>>(),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestAnchor;
    impl RepositoryAnchor for TestAnchor {}

    struct Counter;
    impl KnowledgeSource<TestAnchor> for Counter {
        type Value = u64;
    }

    #[test]
    fn plain_get_set_roundtrip() {
        let repo = SharedRepository::<TestAnchor>::new();
        assert!(repo.get::<Counter>().is_none());
        assert!(!repo.contains::<Counter>());

        repo.set::<Counter>(7);
        assert_eq!(repo.get::<Counter>(), Some(7));
        assert!(repo.contains::<Counter>());

        assert_eq!(repo.clear::<Counter>(), Some(7));
        assert!(repo.get::<Counter>().is_none());
    }

    #[test]
    fn clones_share_storage() {
        let repo = SharedRepository::<TestAnchor>::new();
        let alias = repo.clone();
        alias.set::<Counter>(3);
        assert_eq!(repo.get::<Counter>(), Some(3));
    }
}
