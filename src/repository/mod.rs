//! Typed shared knowledge repository
//!
//! A heterogeneous, type-keyed store partitioned by an *anchor*: a marker
//! type that namespaces otherwise unrelated subsystems so they cannot
//! collide on the same key type. The key type itself carries the value type
//! and the retrieval semantics, so there is no string-based protocol
//! anywhere - the key *is* the contract between writer and reader.
//!
//! Four key flavors exist, expressed as traits over a base
//! [`KnowledgeSource`]:
//!
//! - plain: value may be absent, get/set directly;
//! - [`DefaultProvidingKnowledgeSource`]: absent lookup yields a declared
//!   default instead of nothing;
//! - [`ComputedKnowledgeSource`]: absent lookup computes the value from the
//!   rest of the store, caching it permanently unless explicitly cleared;
//! - [`CollectionKnowledgeSource`]: repeated writes combine through a
//!   declared reduce rule instead of overwriting.

pub mod store;

pub use store::SharedRepository;

/// Namespace tag partitioning separate stores.
///
/// Anchors are never instantiated; they exist purely as type-level
/// partitions so unrelated subsystems cannot collide on the same key type.
pub trait RepositoryAnchor: Send + Sync + 'static {}

/// Base knowledge source: a type acting as lookup key for a `Value` inside
/// stores anchored at `A`.
///
/// Values are cloned out on read; wrap large payloads in `Arc` if sharing
/// matters.
pub trait KnowledgeSource<A: RepositoryAnchor>: 'static {
    type Value: Clone + Send + Sync + 'static;
}

/// Knowledge source with a statically declared fallback value.
pub trait DefaultProvidingKnowledgeSource<A: RepositoryAnchor>: KnowledgeSource<A> {
    /// The value returned when nothing has been stored under this key.
    /// Not cached: a later [`SharedRepository::set`] still wins.
    fn default_value() -> Self::Value;
}

/// Knowledge source whose value is computed on first access.
///
/// The computation is a pure function of the rest of the store and may read
/// other keys (including triggering their own computed resolution), but it
/// must not re-enter its own key: same-key re-entrancy is a programmer
/// error and panics.
pub trait ComputedKnowledgeSource<A: RepositoryAnchor>: KnowledgeSource<A> {
    fn compute(repository: &SharedRepository<A>) -> Self::Value;
}

/// Knowledge source whose writes combine instead of overwrite.
pub trait CollectionKnowledgeSource<A: RepositoryAnchor>: KnowledgeSource<A> {
    /// Combine an incoming value into the stored one. Reduce rules should
    /// preserve call order; the framework's own communication key appends
    /// to the end.
    fn reduce(current: &mut Self::Value, new: Self::Value);
}
