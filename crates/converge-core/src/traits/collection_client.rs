// # Collection Client Trait
//
// Defines the interface to a remote collection-valued resource: a scoped set
// of entries that can only be read whole and mutated one entry at a time.
// There is no atomic replace and no filtered read; the reconciler compensates
// by re-reading the whole collection at the start of every attempt.
//
// ## Implementations
//
// - In-memory simulated remote: `converge-client-memory` crate
// - Future: HTTP clients for real hosting APIs
//
// ## Responsibility Boundary
//
// Clients are single-shot adapters around the remote API. They must NOT:
//
// - implement retry or backoff (owned by `Reconciler`)
// - cache collection state between calls (every fetch must be fresh)
// - serialize concurrent callers (owned by `KeyedMutex`)
//
// A client that retries internally would hide transient failures from the
// retry classifier and break the executor's deadline accounting. Return the
// remote's error text verbatim; classification happens by message content.

use async_trait::async_trait;
use std::fmt::Debug;

use crate::error::Result;

/// One element of a remote collection-valued resource.
///
/// Equality defines whether two entries are "the same" for diffing purposes;
/// anything comparable, cloneable and printable qualifies.
pub trait Entry: Clone + PartialEq + Debug + Send + Sync {}

impl<T> Entry for T where T: Clone + PartialEq + Debug + Send + Sync {}

/// Predicate distinguishing entries owned by one logical operation from
/// entries belonging to other operations within the same remote collection.
///
/// Each resource kind defines its own selector type (name+type partition,
/// attached-VPS name, whole collection); keeping selectors as named types
/// keeps the ownership rule of each resource kind in one inspectable place.
pub trait Selector<E>: Send + Sync {
    /// Whether this operation owns `entry`
    fn matches(&self, entry: &E) -> bool;
}

/// Selector matching every entry: the operation owns the whole collection
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchAll;

impl<E> Selector<E> for MatchAll {
    fn matches(&self, _entry: &E) -> bool {
        true
    }
}

/// Trait for remote collection clients
///
/// `scope` is the coarse remote object identity the collection hangs off
/// (a domain name, a VPS name, a private network id). It doubles as the
/// serialization key used by the executor.
///
/// # Thread Safety
///
/// Implementations must be thread-safe and usable across async tasks.
#[async_trait]
pub trait CollectionClient: Send + Sync {
    /// Entry type this client's collections hold
    type Entry: Entry;

    /// Read the full collection for `scope`.
    ///
    /// The remote has no partial or filtered read; this always returns every
    /// entry in the scope. A scope the remote does not know yields an empty
    /// collection, not an error.
    async fn fetch(&self, scope: &str) -> Result<Vec<Self::Entry>>;

    /// Add a single entry to the collection for `scope`
    async fn add(&self, scope: &str, entry: &Self::Entry) -> Result<()>;

    /// Remove a single entry from the collection for `scope`
    async fn remove(&self, scope: &str, entry: &Self::Entry) -> Result<()>;

    /// Client name for logging/debugging (e.g. "memory", "rest")
    fn client_name(&self) -> &'static str;
}
