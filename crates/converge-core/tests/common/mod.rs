#![allow(dead_code)]
//! Test doubles and common utilities for executor contract tests
//!
//! The memory client provides the instrumented fake remote (call journal,
//! scripted faults); this module adds entry constructors, a fast retry
//! policy, and a concurrency-observing client wrapper.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use converge_client_memory::MemoryCollectionClient;
use converge_core::resources::{DnsEntry, DnsRecordSelector, RecordType};
use converge_core::traits::{CollectionClient, Entry};
use converge_core::{KeyedMutex, Reconciler, Result, RetryPolicy};

/// An A entry with the default TTL
pub fn a_entry(name: &str, content: &str) -> DnsEntry {
    DnsEntry {
        name: name.to_string(),
        expire: 86400,
        record_type: RecordType::A,
        content: content.to_string(),
    }
}

/// Selector for the A partition of `name`
pub fn a_selector(name: &str) -> DnsRecordSelector {
    DnsRecordSelector {
        name: name.to_string(),
        record_type: RecordType::A,
    }
}

/// Retry policy small enough for tests, large enough to allow several attempts
pub fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        timeout: Duration::from_secs(5),
        initial_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(100),
        multiplier: 2.0,
    }
}

/// Reconciler over a shared handle to `client`, with its own lock registry
pub fn reconciler_for(
    client: &MemoryCollectionClient<DnsEntry>,
) -> Reconciler<MemoryCollectionClient<DnsEntry>> {
    Reconciler::new(Arc::new(client.clone()), Arc::new(KeyedMutex::new()))
        .with_policy(fast_policy())
}

/// Guard decrementing the in-flight gauge on drop
pub struct InFlightGuard {
    in_flight: Arc<AtomicUsize>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Client wrapper observing how many remote calls run concurrently.
///
/// Each call holds the gauge for a short simulated network delay, so
/// overlapping callers are reliably visible under paused time.
pub struct GaugeClient<C: CollectionClient> {
    inner: C,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl<C: CollectionClient> GaugeClient<C> {
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Highest number of calls observed in flight at once
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn enter(&self) -> InFlightGuard {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        InFlightGuard {
            in_flight: Arc::clone(&self.in_flight),
        }
    }
}

#[async_trait]
impl<C: CollectionClient> CollectionClient for GaugeClient<C> {
    type Entry = C::Entry;

    async fn fetch(&self, scope: &str) -> Result<Vec<C::Entry>> {
        let _guard = self.enter();
        tokio::time::sleep(Duration::from_millis(5)).await;
        self.inner.fetch(scope).await
    }

    async fn add(&self, scope: &str, entry: &C::Entry) -> Result<()> {
        let _guard = self.enter();
        tokio::time::sleep(Duration::from_millis(5)).await;
        self.inner.add(scope, entry).await
    }

    async fn remove(&self, scope: &str, entry: &C::Entry) -> Result<()> {
        let _guard = self.enter();
        tokio::time::sleep(Duration::from_millis(5)).await;
        self.inner.remove(scope, entry).await
    }

    fn client_name(&self) -> &'static str {
        "gauge"
    }
}

/// A client that fails every call with a fixed message (for timeout tests)
pub struct AlwaysFailingClient<E: Entry> {
    message: String,
    call_count: Arc<AtomicUsize>,
    _marker: std::marker::PhantomData<E>,
}

impl<E: Entry> AlwaysFailingClient<E> {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            call_count: Arc::new(AtomicUsize::new(0)),
            _marker: std::marker::PhantomData,
        }
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    fn fail<T>(&self) -> Result<T> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        Err(converge_core::Error::api(self.message.clone()))
    }
}

#[async_trait]
impl<E: Entry> CollectionClient for AlwaysFailingClient<E> {
    type Entry = E;

    async fn fetch(&self, _scope: &str) -> Result<Vec<E>> {
        self.fail()
    }

    async fn add(&self, _scope: &str, _entry: &E) -> Result<()> {
        self.fail()
    }

    async fn remove(&self, _scope: &str, _entry: &E) -> Result<()> {
        self.fail()
    }

    fn client_name(&self) -> &'static str {
        "always-failing"
    }
}
