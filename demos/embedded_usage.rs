//! Minimal embedding example for converge-core
//!
//! This example demonstrates using converge-core as a library in a custom
//! application: a hand-written collection client backed by the memory store,
//! flaky on its first write the way a lock-prone remote is, reconciled
//! through the executor.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use converge_client_memory::MemoryCollectionClient;
use converge_core::resources::{DnsEntry, DnsRecordSelector, RecordType};
use converge_core::traits::CollectionClient;
use converge_core::{KeyedMutex, ReconcileStatus, Reconciler, Result, RetryPolicy};

/// A remote that rejects its first write with an advisory-lock error
struct FlakyRemote {
    store: MemoryCollectionClient<DnsEntry>,
    rejected_once: AtomicBool,
}

impl FlakyRemote {
    fn new() -> Self {
        Self {
            store: MemoryCollectionClient::new(),
            rejected_once: AtomicBool::new(false),
        }
    }
}

#[async_trait::async_trait]
impl CollectionClient for FlakyRemote {
    type Entry = DnsEntry;

    async fn fetch(&self, scope: &str) -> Result<Vec<DnsEntry>> {
        self.store.fetch(scope).await
    }

    async fn add(&self, scope: &str, entry: &DnsEntry) -> Result<()> {
        if !self.rejected_once.swap(true, Ordering::SeqCst) {
            println!("[remote] rejecting first write, entries are being saved");
            return Err(converge_core::Error::api(
                "DNS Entries are currently being saved",
            ));
        }
        self.store.add(scope, entry).await
    }

    async fn remove(&self, scope: &str, entry: &DnsEntry) -> Result<()> {
        self.store.remove(scope, entry).await
    }

    fn client_name(&self) -> &'static str {
        "flaky-demo"
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let remote = Arc::new(FlakyRemote::new());
    let reconciler = Reconciler::new(Arc::clone(&remote), Arc::new(KeyedMutex::new()))
        .with_policy(RetryPolicy {
            timeout: Duration::from_secs(10),
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(1),
            multiplier: 2.0,
        });

    let selector = DnsRecordSelector {
        name: "www".to_string(),
        record_type: RecordType::A,
    };
    let desired = vec![DnsEntry {
        name: "www".to_string(),
        expire: 300,
        record_type: RecordType::A,
        content: "192.0.2.10".to_string(),
    }];

    println!("[demo] reconciling example.com www/A -> 192.0.2.10");
    let outcome = reconciler
        .reconcile("example.com", &selector, &desired)
        .await?;

    match outcome.status {
        ReconcileStatus::Converged { removed, added } => {
            println!("[demo] converged: removed {}, added {}", removed, added);
        }
        ReconcileStatus::Unchanged => println!("[demo] nothing to do"),
    }
    for entry in &outcome.entries {
        println!("[demo] remote now holds {} -> {}", entry.name, entry.content);
    }

    // Second run proves idempotency: zero writes, unchanged
    let outcome = reconciler
        .reconcile("example.com", &selector, &desired)
        .await?;
    assert_eq!(outcome.status, ReconcileStatus::Unchanged);
    println!("[demo] second run was a read-only no-op");

    Ok(())
}
