// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Containarium Contributors

//! Per-owner mutex registry. Spec.md §4.3 doesn't literally require
//! serializing by owner, but the state-machine contract ("a concurrent
//! `Get` sees either the old or new triple, never a split") only holds if
//! mutating calls against the same container can't interleave.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Mutex as AsyncMutex;

/// Holds one `tokio::sync::Mutex<()>` per key, created on first use and
/// kept for the registry's lifetime (a handful of owners per host; no
/// eviction needed).
pub struct KeyedMutexRegistry {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl Default for KeyedMutexRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyedMutexRegistry {
    pub fn new() -> Self {
        Self { locks: Mutex::new(HashMap::new()) }
    }

    fn lock_for(&self, key: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock();
        locks.entry(key.to_string()).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
    }

    /// Runs `f` while holding the named key's lock; callers elsewhere
    /// never observe interleaved mutations against the same owner.
    pub async fn with_lock<T, F, Fut>(&self, key: &str, f: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = T>,
    {
        let lock = self.lock_for(key);
        let _guard = lock.lock().await;
        f().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn same_key_serializes_access() {
        let registry = Arc::new(KeyedMutexRegistry::new());
        let counter = Arc::new(AtomicU32::new(0));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let registry = registry.clone();
            let counter = counter.clone();
            handles.push(tokio::spawn(async move {
                registry
                    .with_lock("alice", || async {
                        let before = counter.fetch_add(1, Ordering::SeqCst);
                        tokio::task::yield_now().await;
                        assert_eq!(counter.load(Ordering::SeqCst), before + 1);
                    })
                    .await
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(counter.load(Ordering::SeqCst), 8);
    }
}
