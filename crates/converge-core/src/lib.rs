// # converge-core
//
// Core library for the converge reconciliation executor.
//
// ## Architecture Overview
//
// This library drives remote collection-valued resources (DNS record sets,
// firewall rulesets, private network attachments) to a desired final state
// against an eventually-consistent, lock-prone hosting API:
//
// - **CollectionClient**: trait for remote collection read/add/remove calls
// - **Reconciler**: diff-and-apply sequencer with per-key serialization
// - **RetryClassifier / retry_until**: transient-failure detection and the
//   deadline-bounded backoff loop
// - **KeyedMutex**: injectable per-key lock registry
// - **Resource**: host-facing Create/Read/Update/Delete lifecycle adapters
//
// ## Design Principles
//
// 1. **Fresh reads**: remote state is re-fetched at the top of every attempt,
//    never cached across retries
// 2. **Partition isolation**: an operation only removes/adds entries its
//    selector owns; everything else in the collection is left untouched
// 3. **Idempotency**: reconciling an already-converged collection issues zero
//    remote writes
// 4. **Executor-owned retry**: clients are single-shot; all retry, backoff
//    and serialization live here

pub mod config;
pub mod error;
pub mod executor;
pub mod resources;
pub mod retry;
pub mod sync;
pub mod traits;

// Re-export core types for convenience
pub use config::{ApiMode, AuthConfig, ClientConfig, ReconcilerConfig, RetryConfig};
pub use error::{Error, Result};
pub use executor::{ReconcileEvent, ReconcileOutcome, ReconcileStatus, Reconciler};
pub use retry::{retry_until, Classification, RetryClassifier, RetryPolicy};
pub use sync::KeyedMutex;
pub use traits::{CollectionClient, Entry, MatchAll, Resource, Selector};
