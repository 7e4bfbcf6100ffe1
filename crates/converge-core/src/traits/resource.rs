// # Resource Lifecycle Trait
//
// The host-facing callback model: a declarative orchestrator drives each
// managed resource through Create/Read/Update/Delete, and the implementation
// marshals between the host's desired-state description and remote API calls.
//
// Implementations in `crate::resources` are thin typed facades over a
// `Reconciler`; none of them carries its own retry or locking logic.

use async_trait::async_trait;

use crate::error::Result;

/// Lifecycle callbacks for one kind of managed resource
#[async_trait]
pub trait Resource: Send + Sync {
    /// Stable identifier assigned at creation, parseable for import
    type Id: Send + Sync;
    /// Desired final state supplied by the caller
    type Desired: Send + Sync;
    /// Observed remote state projected back to the caller
    type State: Send + Sync;

    /// Bring the resource into existence remotely and return its id.
    ///
    /// Fails if the resource already exists where creation is not idempotent
    /// for the resource kind.
    async fn create(&self, desired: &Self::Desired) -> Result<Self::Id>;

    /// Read the current remote state, `None` if the resource is absent.
    ///
    /// Absence is defined as zero matching entries in the remote collection.
    async fn read(&self, id: &Self::Id) -> Result<Option<Self::State>>;

    /// Converge the remote state to `desired`
    async fn update(&self, id: &Self::Id, desired: &Self::Desired) -> Result<()>;

    /// Remove the resource remotely.
    ///
    /// Implemented uniformly as reconciliation to an empty desired set.
    async fn delete(&self, id: &Self::Id) -> Result<()>;
}
