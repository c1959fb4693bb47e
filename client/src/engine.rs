//! The three cooperative sync loops.
//!
//! DESIGN
//! ======
//! One tokio task per loop, so each loop has at most one request in flight:
//! the task *is* the capacity-1 slot, and missed interval ticks are skipped
//! rather than queued. Shared state sits behind a mutex that is never held
//! across a network await; each tick locks to plan, releases, calls the
//! gateway, then locks again to apply.
//!
//! ERROR HANDLING
//! ==============
//! A timed-out discovery poll is a no-op. Every other failure collapses
//! into the offline flag: fetch puts its batch back at the front, send
//! restores the unsent tail and aborts the cycle so a later action never
//! overtakes a failed earlier one.

use std::sync::Arc;
use std::time::Duration;

use protocol::now_ms;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::api::{ApiClient, ApiError};
use crate::state::{Identity, SyncState};
use crate::surface::Surface;

pub const DISCOVER_INTERVAL: Duration = Duration::from_millis(150);
pub const FETCH_INTERVAL: Duration = Duration::from_millis(100);
pub const SEND_INTERVAL: Duration = Duration::from_millis(100);

/// Pause between sequential uploads within one send cycle.
const SEND_PAUSE: Duration = Duration::from_millis(50);

/// Delay before re-queueing ids the store has not caught up on yet.
const MISSING_REQUEUE_DELAY: Duration = Duration::from_millis(500);

pub type SharedState = Arc<Mutex<SyncState>>;
pub type SharedSurface = Arc<Mutex<Box<dyn Surface>>>;

/// Owns the session state and drives the three loops against one gateway.
pub struct SyncEngine {
    api: ApiClient,
    state: SharedState,
    surface: SharedSurface,
}

impl SyncEngine {
    #[must_use]
    pub fn new(api: ApiClient, identity: Identity, surface: Box<dyn Surface>) -> Self {
        Self {
            api,
            state: Arc::new(Mutex::new(SyncState::new(identity))),
            surface: Arc::new(Mutex::new(surface)),
        }
    }

    #[must_use]
    pub fn state(&self) -> &SharedState {
        &self.state
    }

    /// Spawn the discovery, fetch, and send loops. Dropping the handles
    /// leaves the loops running; abort them to stop.
    pub fn spawn_loops(&self) -> Vec<JoinHandle<()>> {
        let discovery = {
            let api = self.api.clone();
            let state = self.state.clone();
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(DISCOVER_INTERVAL);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
                loop {
                    ticker.tick().await;
                    discover_tick(&api, &state).await;
                }
            })
        };

        let fetch = {
            let api = self.api.clone();
            let state = self.state.clone();
            let surface = self.surface.clone();
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(FETCH_INTERVAL);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
                loop {
                    ticker.tick().await;
                    fetch_tick(&api, &state, &surface).await;
                }
            })
        };

        let send = {
            let api = self.api.clone();
            let state = self.state.clone();
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(SEND_INTERVAL);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
                loop {
                    ticker.tick().await;
                    send_tick(&api, &state).await;
                }
            })
        };

        vec![discovery, fetch, send]
    }

    /// Run a single cycle of each loop. Used by the drain path and tests.
    pub async fn discover_once(&self) {
        discover_tick(&self.api, &self.state).await;
    }

    pub async fn fetch_once(&self) {
        fetch_tick(&self.api, &self.state, &self.surface).await;
    }

    pub async fn send_once(&self) {
        send_tick(&self.api, &self.state).await;
    }

    /// Commit a locally drawn stroke for upload. Returns its id, or `None`
    /// for a degenerate (sub-two-point) stroke.
    pub async fn commit_stroke(
        &self,
        points: Vec<protocol::Point>,
        color: &str,
        line_width: f64,
    ) -> Option<String> {
        self.state
            .lock()
            .await
            .commit_stroke(points, color, line_width)
            .map(|action| action.stroke_id().to_owned())
    }

    /// Global clear: wipe local state and the surface immediately, then
    /// fire the clear action at the gateway without queue tracking or retry.
    pub async fn clear_all(&self) {
        let action = self.state.lock().await.begin_clear(now_ms());
        self.surface.lock().await.clear();

        let api = self.api.clone();
        tokio::spawn(async move {
            if let Err(e) = api.post_action(&action).await {
                warn!(error = %e, "clear upload failed");
            }
        });
    }
}

// =============================================================================
// TICKS
// =============================================================================

async fn discover_tick(api: &ApiClient, state: &SharedState) {
    let since = state.lock().await.last_sync;

    match api.discover(since).await {
        Ok(res) => {
            let mut st = state.lock().await;
            st.set_online(true);
            let fresh = st.note_discovered(&res.stroke_ids, res.server_time);
            if fresh > 0 {
                debug!(fresh, total = res.total, "discovered new strokes");
            }
        }
        // A timed-out poll is transient; the next tick simply asks again.
        Err(ApiError::Timeout) => {}
        Err(e) => {
            warn!(error = %e, "discovery failed");
            state.lock().await.set_online(false);
        }
    }
}

async fn fetch_tick(api: &ApiClient, state: &SharedState, surface: &SharedSurface) {
    let batch = state.lock().await.take_fetch_batch();
    if batch.is_empty() {
        return;
    }

    match api.fetch_actions(&batch).await {
        Ok(res) => {
            let mut st = state.lock().await;
            st.set_online(true);
            let mut surf = surface.lock().await;
            let missing = st.apply_fetched(&batch, res.actions, surf.as_mut());
            drop(surf);
            drop(st);

            if !missing.is_empty() {
                debug!(count = missing.len(), "ids not yet visible; re-queueing after delay");
                let state = state.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(MISSING_REQUEUE_DELAY).await;
                    state.lock().await.requeue_fetch_back(missing);
                });
            }
        }
        Err(e) => {
            warn!(error = %e, count = batch.len(), "fetch failed; batch returned to queue");
            let mut st = state.lock().await;
            st.requeue_fetch_front(batch);
            st.set_online(false);
        }
    }
}

async fn send_tick(api: &ApiClient, state: &SharedState) {
    let batch = state.lock().await.take_send_batch();
    if batch.is_empty() {
        return;
    }

    for (index, action) in batch.iter().enumerate() {
        match api.post_action(action).await {
            Ok(_) => {
                let mut st = state.lock().await;
                st.stats.sent += 1;
                st.set_online(true);
                debug!(id = action.stroke_id(), "action sent");
            }
            Err(e) => {
                warn!(error = %e, id = action.stroke_id(), "send failed; aborting cycle");
                let mut st = state.lock().await;
                st.restore_send_front(batch[index..].to_vec());
                st.stats.failed += 1;
                st.set_online(false);
                return;
            }
        }

        tokio::time::sleep(SEND_PAUSE).await;
    }
}

#[cfg(test)]
#[path = "engine_test.rs"]
mod tests;
