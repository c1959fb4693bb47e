//! Opaque key-value storage boundary.
//!
//! DESIGN
//! ======
//! The gateway treats storage as a flat get/put namespace with per-key
//! atomicity only: no compare-and-swap, no multi-key transactions. Every
//! caller owns its own retry policy. `MemoryKv` backs tests and single-node
//! deployments; a real edge KV slots in behind the same trait.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

/// Storage failure. Transient-retryable at the caller.
#[derive(Debug, thiserror::Error)]
pub enum KvError {
    #[error("kv backend error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait Kv: Send + Sync {
    /// Look up a key. Absence is `Ok(None)`, not an error.
    async fn get(&self, key: &str) -> Result<Option<String>, KvError>;

    /// Write a key. Keys are independent; re-putting overwrites.
    async fn put(&self, key: &str, value: String) -> Result<(), KvError>;
}

/// In-process map-backed store.
#[derive(Default)]
pub struct MemoryKv {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryKv {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Kv for MemoryKv {
    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: String) -> Result<(), KvError> {
        self.entries.write().await.insert(key.to_owned(), value);
        Ok(())
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================

#[cfg(test)]
pub mod test_helpers {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    /// Wrapper that fails the next N gets/puts before delegating to an
    /// in-memory store. Exercises the retry paths.
    #[derive(Default)]
    pub struct FlakyKv {
        inner: MemoryKv,
        failing_gets: AtomicUsize,
        failing_puts: AtomicUsize,
    }

    impl FlakyKv {
        #[must_use]
        pub fn failing(gets: usize, puts: usize) -> Self {
            Self {
                inner: MemoryKv::new(),
                failing_gets: AtomicUsize::new(gets),
                failing_puts: AtomicUsize::new(puts),
            }
        }

        fn take_failure(counter: &AtomicUsize) -> bool {
            counter
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
        }
    }

    #[async_trait]
    impl Kv for FlakyKv {
        async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
            if Self::take_failure(&self.failing_gets) {
                return Err(KvError::Backend("injected get failure".into()));
            }
            self.inner.get(key).await
        }

        async fn put(&self, key: &str, value: String) -> Result<(), KvError> {
            if Self::take_failure(&self.failing_puts) {
                return Err(KvError::Backend("injected put failure".into()));
            }
            self.inner.put(key, value).await
        }
    }
}

#[cfg(test)]
#[path = "kv_test.rs"]
mod tests;
