//! Reconciling mutation executor
//!
//! The Reconciler drives a remote collection to match a desired final state
//! under three constraints: the remote only exposes whole-collection reads
//! and per-entry add/remove (no atomic replace), other callers may mutate the
//! same object concurrently, and some remote failures are transient while
//! others are final.
//!
//! ## Architecture
//!
//! ```text
//!                 ┌──────────────┐
//!  desired state ─▶  Reconciler  │── events ──▶ monitoring/logging
//!                 └──────────────┘
//!                        │
//!        ┌───────────────┼────────────────────┐
//!        ▼               ▼                    ▼
//! ┌────────────┐ ┌────────────────┐ ┌──────────────────┐
//! │ KeyedMutex │ │ retry_until    │ │ CollectionClient │
//! │ (per key)  │ │ (+ classifier) │ │ (fetch/add/rm)   │
//! └────────────┘ └────────────────┘ └──────────────────┘
//! ```
//!
//! ## Attempt Flow
//!
//! 1. Acquire the per-key guard (one change at a time per remote object)
//! 2. Fetch the full remote collection, always fresh
//! 3. Partition into matching (selector) and untouched entries
//! 4. Diff: removals = matching − desired, additions = desired − matching
//! 5. Issue removals, then additions; stop at the first failure
//! 6. Re-read and project the achieved state back to the caller
//!
//! A failed attempt may leave the remote partially converged; that is safe
//! because the next attempt starts from a fresh read and the diff is computed
//! from scratch. Entries outside the selector are never touched.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::retry::{retry_until, RetryClassifier, RetryPolicy};
use crate::sync::KeyedMutex;
use crate::traits::{CollectionClient, Selector};

/// Events emitted by the Reconciler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileEvent {
    /// A reconciliation attempt started
    AttemptStarted {
        key: String,
        attempt: usize,
    },

    /// An attempt failed; `retryable` reflects the classifier's verdict
    AttemptFailed {
        key: String,
        error: String,
        retryable: bool,
    },

    /// The collection was converged to the desired state
    Converged {
        key: String,
        removed: usize,
        added: usize,
    },

    /// The collection already matched; zero writes were issued
    Unchanged {
        key: String,
    },

    /// The retry deadline elapsed with only transient failures
    TimedOut {
        key: String,
        last_error: String,
    },
}

/// How a successful reconciliation converged
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileStatus {
    /// Remote already matched the desired state; no writes issued
    Unchanged,
    /// Writes were issued to converge the collection
    Converged { removed: usize, added: usize },
}

/// Result of a successful reconciliation
#[derive(Debug, Clone, PartialEq)]
pub struct ReconcileOutcome<E> {
    /// Whether and how the remote was changed
    pub status: ReconcileStatus,
    /// The matching entries as re-read after the final attempt, for
    /// projection back into the caller's state model
    pub entries: Vec<E>,
}

/// Reconciling mutation executor over one [`CollectionClient`]
///
/// Safe under concurrent invocation: calls with equal keys serialize on the
/// injected [`KeyedMutex`], calls with different keys proceed in parallel.
/// The executor holds no collection state between invocations; the remote is
/// re-read at the top of every attempt.
pub struct Reconciler<C: CollectionClient> {
    /// Remote collection client (single-shot calls, no internal retry)
    client: Arc<C>,

    /// Per-key serialization guard, shared with other executors that target
    /// the same remote account
    locks: Arc<KeyedMutex>,

    /// Transient-failure classification
    classifier: RetryClassifier,

    /// Deadline and backoff for the retry driver
    policy: RetryPolicy,

    /// Event sender for external monitoring
    event_tx: Option<mpsc::Sender<ReconcileEvent>>,
}

impl<C: CollectionClient> Reconciler<C> {
    /// Create a reconciler with default classification and retry policy
    pub fn new(client: Arc<C>, locks: Arc<KeyedMutex>) -> Self {
        Self {
            client,
            locks,
            classifier: RetryClassifier::new(),
            policy: RetryPolicy::default(),
            event_tx: None,
        }
    }

    /// Replace the retry policy
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replace the retry classifier
    pub fn with_classifier(mut self, classifier: RetryClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// Attach a bounded event channel and return its receiver.
    ///
    /// When the channel is full new events are dropped with a warning, so a
    /// slow consumer cannot stall reconciliation.
    pub fn with_event_channel(
        mut self,
        capacity: usize,
    ) -> (Self, mpsc::Receiver<ReconcileEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        self.event_tx = Some(tx);
        (self, rx)
    }

    /// Drive the remote collection partition selected by `selector` to equal
    /// `desired`, retrying transient failures until the policy deadline.
    ///
    /// An empty `desired` removes every matching entry; deletion has no
    /// separate code path. Entries not matching `selector` are never touched.
    ///
    /// On success the outcome carries the freshly re-read matching entries.
    /// On permanent failure the remote error surfaces immediately; on
    /// deadline exhaustion [`Error::Timeout`] wraps the last transient error.
    pub async fn reconcile<S>(
        &self,
        key: &str,
        selector: &S,
        desired: &[C::Entry],
    ) -> Result<ReconcileOutcome<C::Entry>>
    where
        S: Selector<C::Entry>,
    {
        let attempts = AtomicUsize::new(0);
        let result = retry_until(&self.policy, &self.classifier, || {
            let attempt = attempts.fetch_add(1, Ordering::Relaxed) + 1;
            self.attempt(key, selector, desired, attempt)
        })
        .await;

        match &result {
            Ok(outcome) => match outcome.status {
                ReconcileStatus::Unchanged => {
                    debug!("{} already converged, no writes issued", key);
                    self.emit(ReconcileEvent::Unchanged {
                        key: key.to_string(),
                    });
                }
                ReconcileStatus::Converged { removed, added } => {
                    info!("converged {}: removed {}, added {}", key, removed, added);
                    self.emit(ReconcileEvent::Converged {
                        key: key.to_string(),
                        removed,
                        added,
                    });
                }
            },
            Err(Error::Timeout { source, .. }) => {
                self.emit(ReconcileEvent::TimedOut {
                    key: key.to_string(),
                    last_error: source.to_string(),
                });
            }
            Err(_) => {}
        }

        result
    }

    /// Read the matching entries for `key`, retrying transient fetch errors.
    ///
    /// Used by resource Read callbacks; zero matching entries means the
    /// logical resource is absent.
    pub async fn read<S>(&self, key: &str, selector: &S) -> Result<Vec<C::Entry>>
    where
        S: Selector<C::Entry>,
    {
        retry_until(&self.policy, &self.classifier, || async move {
            let remote = self
                .client
                .fetch(key)
                .await
                .map_err(|e| self.note_failure(key, e))?;
            Ok(remote
                .into_iter()
                .filter(|entry| selector.matches(entry))
                .collect())
        })
        .await
    }

    /// One reconciliation pass: lock, fresh read, diff, apply, re-read
    async fn attempt<S>(
        &self,
        key: &str,
        selector: &S,
        desired: &[C::Entry],
        attempt: usize,
    ) -> Result<ReconcileOutcome<C::Entry>>
    where
        S: Selector<C::Entry>,
    {
        self.emit(ReconcileEvent::AttemptStarted {
            key: key.to_string(),
            attempt,
        });

        // The remote allows one change at a time per object; hold the guard
        // for the whole attempt, including the final projection read.
        let _guard = self.locks.lock(key).await;

        let remote = self
            .client
            .fetch(key)
            .await
            .map_err(|e| self.note_failure(key, e))?;

        let (matching, _untouched): (Vec<_>, Vec<_>) =
            remote.into_iter().partition(|entry| selector.matches(entry));

        // Set-semantics diff: duplicates collapse to one call each way
        let mut to_remove: Vec<&C::Entry> = Vec::new();
        for entry in &matching {
            if !desired.contains(entry) && !to_remove.iter().any(|e| *e == entry) {
                to_remove.push(entry);
            }
        }
        let mut to_add: Vec<&C::Entry> = Vec::new();
        for entry in desired {
            if !matching.contains(entry) && !to_add.iter().any(|e| *e == entry) {
                to_add.push(entry);
            }
        }

        if to_remove.is_empty() && to_add.is_empty() {
            debug!("{} matches desired state ({} entries)", key, matching.len());
            return Ok(ReconcileOutcome {
                status: ReconcileStatus::Unchanged,
                entries: matching,
            });
        }

        let removed = to_remove.len();
        let added = to_add.len();

        // Removals precede additions so a rename or type change never leaves
        // old and new entries overlapping remotely.
        for entry in to_remove {
            debug!("{} removing {:?}", key, entry);
            self.client
                .remove(key, entry)
                .await
                .map_err(|e| self.note_failure(key, e))?;
        }
        for entry in to_add {
            debug!("{} adding {:?}", key, entry);
            self.client
                .add(key, entry)
                .await
                .map_err(|e| self.note_failure(key, e))?;
        }

        // Project the achieved state back while still holding the guard
        let fresh = self
            .client
            .fetch(key)
            .await
            .map_err(|e| self.note_failure(key, e))?;
        let entries = fresh
            .into_iter()
            .filter(|entry| selector.matches(entry))
            .collect();

        Ok(ReconcileOutcome {
            status: ReconcileStatus::Converged { removed, added },
            entries,
        })
    }

    /// Log and report a failed remote call, passing the error through
    fn note_failure(&self, key: &str, err: Error) -> Error {
        let retryable = self.classifier.is_retryable(&err);
        if retryable {
            debug!("{} transient failure via {}: {}", key, self.client.client_name(), err);
        } else {
            warn!("{} failed via {}: {}", key, self.client.client_name(), err);
        }
        self.emit(ReconcileEvent::AttemptFailed {
            key: key.to_string(),
            error: err.to_string(),
            retryable,
        });
        err
    }

    /// Emit an event, dropping it if the channel is full
    fn emit(&self, event: ReconcileEvent) {
        if let Some(tx) = &self.event_tx {
            if tx.try_send(event).is_err() {
                warn!("event channel full, dropping reconciliation event");
            }
        }
    }
}
