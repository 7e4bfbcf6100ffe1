//! Executor Contract Test: Idempotency
//!
//! Reconciling a collection that already matches the desired state must
//! issue zero remote writes, and re-running a successful reconciliation
//! must be a read-only no-op.
//!
//! If this test fails, the diff is no longer minimal and every host apply
//! would rewrite converged resources.

mod common;

use common::*;
use converge_client_memory::MemoryCollectionClient;
use converge_core::resources::DnsEntry;
use converge_core::ReconcileStatus;

#[tokio::test]
async fn converged_collection_issues_no_writes() {
    let client: MemoryCollectionClient<DnsEntry> = MemoryCollectionClient::new();
    client
        .seed("example.com", vec![a_entry("www", "1.2.3.4")])
        .await;

    let reconciler = reconciler_for(&client);
    let desired = vec![a_entry("www", "1.2.3.4")];

    let outcome = reconciler
        .reconcile("example.com", &a_selector("www"), &desired)
        .await
        .expect("reconcile succeeds");

    assert_eq!(outcome.status, ReconcileStatus::Unchanged);
    assert_eq!(outcome.entries, desired);
    assert_eq!(
        client.write_call_count(),
        0,
        "expected zero writes for an already-converged collection"
    );
}

#[tokio::test]
async fn second_reconcile_is_read_only() {
    let client: MemoryCollectionClient<DnsEntry> = MemoryCollectionClient::new();
    let reconciler = reconciler_for(&client);
    let desired = vec![a_entry("www", "1.2.3.4"), a_entry("www", "5.6.7.8")];

    let outcome = reconciler
        .reconcile("example.com", &a_selector("www"), &desired)
        .await
        .expect("first reconcile succeeds");
    assert_eq!(
        outcome.status,
        ReconcileStatus::Converged {
            removed: 0,
            added: 2
        }
    );

    client.clear_journal();

    let outcome = reconciler
        .reconcile("example.com", &a_selector("www"), &desired)
        .await
        .expect("second reconcile succeeds");

    assert_eq!(outcome.status, ReconcileStatus::Unchanged);
    assert_eq!(client.write_call_count(), 0);
    // A single fresh read is all the second invocation needs
    assert_eq!(client.calls().len(), 1);
}
