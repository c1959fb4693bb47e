//! Action store — durable map from stroke id to immutable action JSON.
//!
//! ERROR HANDLING
//! ==============
//! Writes are the source of truth and retry up to 3 attempts with linear
//! backoff before the request fails with 500. Reads retry once after a short
//! pause; an id that still cannot be read is reported as absent, because
//! NotFound is represented by omission on the fetch path.

use std::time::Duration;

use protocol::Action;
use tracing::warn;

use crate::kv::{Kv, KvError};

const WRITE_ATTEMPTS: u64 = 3;
const WRITE_BACKOFF_MS: u64 = 50;
const READ_ATTEMPTS: u64 = 2;
const READ_RETRY_MS: u64 = 30;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("action serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("action write exhausted retries: {0}")]
    WriteExhausted(KvError),
}

/// Persist an action under its stroke id, retrying transient failures.
///
/// # Errors
///
/// Returns [`StoreError::WriteExhausted`] once all attempts fail.
pub async fn put_action(kv: &dyn Kv, action: &Action) -> Result<(), StoreError> {
    let payload = serde_json::to_string(action)?;

    let mut attempt = 1;
    loop {
        match kv.put(action.stroke_id(), payload.clone()).await {
            Ok(()) => return Ok(()),
            Err(e) if attempt < WRITE_ATTEMPTS => {
                warn!(error = %e, attempt, id = action.stroke_id(), "action write failed; retrying");
                tokio::time::sleep(Duration::from_millis(WRITE_BACKOFF_MS * attempt)).await;
                attempt += 1;
            }
            Err(e) => return Err(StoreError::WriteExhausted(e)),
        }
    }
}

/// Look up one action by id. Read failures retry once; anything still
/// unreadable (absent, backend error, malformed payload) comes back `None`.
pub async fn get_action(kv: &dyn Kv, id: &str) -> Option<Action> {
    for attempt in 1..=READ_ATTEMPTS {
        match kv.get(id).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(action) => return Some(action),
                Err(e) => {
                    warn!(error = %e, id, "stored action failed to parse; treating as absent");
                    return None;
                }
            },
            Ok(None) => return None,
            Err(e) if attempt < READ_ATTEMPTS => {
                warn!(error = %e, id, "action read failed; retrying");
                tokio::time::sleep(Duration::from_millis(READ_RETRY_MS)).await;
            }
            Err(e) => {
                warn!(error = %e, id, "action read exhausted retries; treating as absent");
            }
        }
    }

    None
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
