// # Memory Collection Client
//
// In-memory implementation of CollectionClient.
//
// ## Purpose
//
// Simulates the remote hosting API: scoped collections with whole-collection
// reads and per-entry writes. Used as the backend for local runs and as the
// instrumented fake in contract tests.
//
// ## Instrumentation
//
// - Every call is appended to a journal (operation, scope, entry) so tests
//   can assert exactly which calls were issued and in which order.
// - Faults can be scripted: each injected fault is consumed by the next call
//   of the matching kind and returned as the remote's error text, which lets
//   tests exercise transient-failure and permanent-failure paths.
// - Read-only mode rejects write calls the way the real API does when the
//   client is constructed with writes disabled.
//
// Like any CollectionClient, this one is single-shot per call: no retry, no
// backoff, no caching. All coordination is owned by the Reconciler.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::Mutex as StdMutex;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use converge_core::traits::{CollectionClient, Entry};
use converge_core::{ApiMode, Error, Result};

/// Kind of remote call, for journal assertions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Fetch,
    Add,
    Remove,
}

/// One recorded remote call
#[derive(Debug, Clone, PartialEq)]
pub struct ClientCall<E> {
    pub kind: CallKind,
    pub scope: String,
    /// The entry passed to add/remove; `None` for fetch
    pub entry: Option<E>,
}

/// A scripted fault, consumed by the next call of the matching kind
#[derive(Debug, Clone)]
struct Fault {
    /// Restrict to one call kind, or `None` to match any call
    kind: Option<CallKind>,
    message: String,
}

/// In-memory collection client
///
/// Collections are keyed by scope; a scope the client has never seen reads as
/// an empty collection, matching the remote's behavior for objects without
/// entries. Cloning shares the underlying store, journal and fault queue, so
/// a test can hold one handle while the executor owns another.
#[derive(Debug, Clone)]
pub struct MemoryCollectionClient<E: Entry> {
    collections: Arc<RwLock<HashMap<String, Vec<E>>>>,
    journal: Arc<StdMutex<Vec<ClientCall<E>>>>,
    faults: Arc<StdMutex<VecDeque<Fault>>>,
    mode: ApiMode,
}

impl<E: Entry> MemoryCollectionClient<E> {
    /// Create an empty read-write client
    pub fn new() -> Self {
        Self::with_mode(ApiMode::ReadWrite)
    }

    /// Create an empty client in the given mode
    pub fn with_mode(mode: ApiMode) -> Self {
        Self {
            collections: Arc::new(RwLock::new(HashMap::new())),
            journal: Arc::new(StdMutex::new(Vec::new())),
            faults: Arc::new(StdMutex::new(VecDeque::new())),
            mode,
        }
    }

    /// Replace the collection for `scope` without touching the journal
    pub async fn seed(&self, scope: &str, entries: Vec<E>) {
        self.collections
            .write()
            .await
            .insert(scope.to_string(), entries);
    }

    /// Current collection for `scope` (empty if unknown), bypassing the
    /// journal and fault queue
    pub async fn entries(&self, scope: &str) -> Vec<E> {
        self.collections
            .read()
            .await
            .get(scope)
            .cloned()
            .unwrap_or_default()
    }

    /// All recorded calls, in issue order
    pub fn calls(&self) -> Vec<ClientCall<E>> {
        self.journal.lock().unwrap().clone()
    }

    /// Recorded calls of one kind
    pub fn calls_of(&self, kind: CallKind) -> Vec<ClientCall<E>> {
        self.calls().into_iter().filter(|c| c.kind == kind).collect()
    }

    /// Number of recorded write calls (add + remove)
    pub fn write_call_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.kind != CallKind::Fetch)
            .count()
    }

    /// Forget all recorded calls
    pub fn clear_journal(&self) {
        self.journal.lock().unwrap().clear();
    }

    /// Script a fault for the next call of any kind
    pub fn inject_fault(&self, message: impl Into<String>) {
        self.faults.lock().unwrap().push_back(Fault {
            kind: None,
            message: message.into(),
        });
    }

    /// Script a fault for the next call of `kind`
    pub fn inject_fault_on(&self, kind: CallKind, message: impl Into<String>) {
        self.faults.lock().unwrap().push_back(Fault {
            kind: Some(kind),
            message: message.into(),
        });
    }

    fn record(&self, kind: CallKind, scope: &str, entry: Option<&E>) {
        self.journal.lock().unwrap().push(ClientCall {
            kind,
            scope: scope.to_string(),
            entry: entry.cloned(),
        });
    }

    /// Consume the front fault if it applies to this call kind
    fn take_fault(&self, kind: CallKind) -> Option<String> {
        let mut faults = self.faults.lock().unwrap();
        let applies = faults
            .front()
            .map(|fault| fault.kind.is_none() || fault.kind == Some(kind))
            .unwrap_or(false);
        if applies {
            faults.pop_front().map(|f| f.message)
        } else {
            None
        }
    }

    fn check_writable(&self, scope: &str) -> Result<()> {
        if self.mode == ApiMode::ReadOnly {
            return Err(Error::read_only(format!(
                "client is in read-only mode, refusing to modify {}",
                scope
            )));
        }
        Ok(())
    }
}

impl<E: Entry> Default for MemoryCollectionClient<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<E: Entry> CollectionClient for MemoryCollectionClient<E> {
    type Entry = E;

    async fn fetch(&self, scope: &str) -> Result<Vec<E>> {
        self.record(CallKind::Fetch, scope, None);
        if let Some(message) = self.take_fault(CallKind::Fetch) {
            debug!("scripted fetch fault for {}: {}", scope, message);
            return Err(Error::api(message));
        }
        Ok(self.entries(scope).await)
    }

    async fn add(&self, scope: &str, entry: &E) -> Result<()> {
        self.record(CallKind::Add, scope, Some(entry));
        if let Some(message) = self.take_fault(CallKind::Add) {
            debug!("scripted add fault for {}: {}", scope, message);
            return Err(Error::api(message));
        }
        self.check_writable(scope)?;

        self.collections
            .write()
            .await
            .entry(scope.to_string())
            .or_default()
            .push(entry.clone());
        Ok(())
    }

    async fn remove(&self, scope: &str, entry: &E) -> Result<()> {
        self.record(CallKind::Remove, scope, Some(entry));
        if let Some(message) = self.take_fault(CallKind::Remove) {
            debug!("scripted remove fault for {}: {}", scope, message);
            return Err(Error::api(message));
        }
        self.check_writable(scope)?;

        let mut collections = self.collections.write().await;
        let entries = collections
            .get_mut(scope)
            .ok_or_else(|| Error::not_found(format!("no entries for {}", scope)))?;
        let position = entries
            .iter()
            .position(|e| e == entry)
            .ok_or_else(|| Error::not_found(format!("entry {:?} not found in {}", entry, scope)))?;
        entries.remove(position);
        Ok(())
    }

    fn client_name(&self) -> &'static str {
        "memory"
    }
}
