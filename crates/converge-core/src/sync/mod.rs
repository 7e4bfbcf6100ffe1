//! Keyed serialization guard
//!
//! The remote API allows only one change at a time per coarse-grained object
//! (one domain, one VPS). [`KeyedMutex`] serializes intra-process mutations on
//! the same key; races with other processes are left to the remote's own
//! advisory locking, which surfaces as retryable rejections.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;

use tokio::sync::{Mutex, OwnedMutexGuard};

/// Per-key asynchronous mutual exclusion.
///
/// One lock exists per distinct key, created lazily on first use and never
/// removed; the map is bounded by the number of distinct keys seen in a
/// process lifetime, which is small for this workload.
///
/// This is an explicit, injectable object rather than a process global so
/// tests can substitute an isolated instance per case. Holders of the same
/// `Arc<KeyedMutex>` contend on the same locks; independent instances do not.
#[derive(Debug, Default)]
pub struct KeyedMutex {
    locks: StdMutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl KeyedMutex {
    /// Create an empty lock registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for `key`, waiting if another holder has it.
    ///
    /// Two calls with equal keys never hold their guards concurrently; calls
    /// with different keys proceed fully in parallel.
    pub async fn lock(&self, key: &str) -> OwnedMutexGuard<()> {
        let entry = {
            let mut locks = self.locks.lock().unwrap();
            Arc::clone(locks.entry(key.to_string()).or_default())
        };
        entry.lock_owned().await
    }

    /// Number of distinct keys seen so far
    pub fn key_count(&self) -> usize {
        self.locks.lock().unwrap().len()
    }
}
