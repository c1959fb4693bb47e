//! Shared application state.
//!
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! The gateway itself is stateless; the only shared resource is the
//! key-value store behind the [`Kv`] trait.

use std::sync::Arc;

use crate::kv::Kv;

/// Shared application state. Clone is required by Axum.
#[derive(Clone)]
pub struct AppState {
    pub kv: Arc<dyn Kv>,
}

impl AppState {
    #[must_use]
    pub fn new(kv: Arc<dyn Kv>) -> Self {
        Self { kv }
    }
}

#[cfg(test)]
pub mod test_helpers {
    use super::*;
    use crate::kv::MemoryKv;

    /// App state over a fresh in-memory store.
    #[must_use]
    pub fn memory_state() -> AppState {
        AppState::new(Arc::new(MemoryKv::new()))
    }
}
