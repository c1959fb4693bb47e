//! Client-side sync state: cursor, dedup sets, and queues.
//!
//! DESIGN
//! ======
//! Everything the three loops share lives here, and every transition is a
//! synchronous method. The loop drivers in `engine` only decide *when* to
//! call them, which keeps the protocol's ordering and dedup guarantees
//! unit-testable without a network.
//!
//! Membership invariants: `own ⊆ known`; an id enters `received` at most
//! once, and only a `received` insertion may touch the surface. The sets
//! are unbounded for the process lifetime.

use std::collections::{HashSet, VecDeque};

use protocol::{Action, Point, new_clear_id, new_stroke_id, new_user_id, new_user_name, now_ms};

use crate::surface::Surface;

/// Ids resolved per fetch cycle.
pub const FETCH_BATCH: usize = 10;

/// Actions uploaded per send cycle.
pub const SEND_BATCH: usize = 3;

const LOG_CAPACITY: usize = 10;

/// Random per-session identity. No authentication; this is the whole label.
#[derive(Clone, Debug)]
pub struct Identity {
    pub user_id: String,
    pub user_name: String,
}

impl Identity {
    #[must_use]
    pub fn random() -> Self {
        Self { user_id: new_user_id(), user_name: new_user_name() }
    }
}

/// Rolling counters surfaced next to the online/offline flag.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub sent: u64,
    pub received: u64,
    pub failed: u64,
}

/// All mutable sync state for one client session.
pub struct SyncState {
    pub identity: Identity,
    /// Discovery cursor: server time of the last successful poll. Never
    /// moves backward.
    pub last_sync: i64,
    /// Ids ever discovered or produced locally.
    pub known: HashSet<String>,
    /// Ids whose payload has been applied.
    pub received: HashSet<String>,
    /// Ids produced by this client.
    pub own: HashSet<String>,
    /// Ids pending payload retrieval.
    pub fetch_queue: VecDeque<String>,
    /// Locally produced actions pending upload.
    pub send_queue: VecDeque<Action>,
    /// Collapsed connectivity state; the only error surface the UI gets.
    pub online: bool,
    pub stats: SyncStats,
    log: VecDeque<String>,
}

impl SyncState {
    #[must_use]
    pub fn new(identity: Identity) -> Self {
        Self {
            identity,
            last_sync: 0,
            known: HashSet::new(),
            received: HashSet::new(),
            own: HashSet::new(),
            fetch_queue: VecDeque::new(),
            send_queue: VecDeque::new(),
            online: true,
            stats: SyncStats::default(),
            log: VecDeque::new(),
        }
    }

    pub fn set_online(&mut self, online: bool) {
        self.online = online;
    }

    /// Append to the rolling activity log, evicting the oldest line.
    pub fn push_log(&mut self, line: impl Into<String>) {
        if self.log.len() == LOG_CAPACITY {
            self.log.pop_front();
        }
        self.log.push_back(line.into());
    }

    #[must_use]
    pub fn log_lines(&self) -> impl Iterator<Item = &str> {
        self.log.iter().map(String::as_str)
    }

    // =========================================================================
    // DISCOVERY
    // =========================================================================

    /// Ingest a discovery response: queue every id not already known, owned,
    /// or queued, then advance the cursor (forward only). Returns how many
    /// ids were new.
    pub fn note_discovered(&mut self, ids: &[String], server_time: i64) -> usize {
        let mut fresh = 0;
        for id in ids {
            if self.known.contains(id) || self.own.contains(id) || self.fetch_queue.contains(id) {
                continue;
            }
            self.known.insert(id.clone());
            self.fetch_queue.push_back(id.clone());
            fresh += 1;
        }

        self.last_sync = self.last_sync.max(server_time);
        if fresh > 0 {
            self.push_log(format!("discovered {fresh} new strokes"));
        }
        fresh
    }

    // =========================================================================
    // FETCH
    // =========================================================================

    /// Pop up to [`FETCH_BATCH`] ids off the front of the fetch queue.
    pub fn take_fetch_batch(&mut self) -> Vec<String> {
        let take = self.fetch_queue.len().min(FETCH_BATCH);
        self.fetch_queue.drain(..take).collect()
    }

    /// Put a failed batch back at the front, preserving order.
    pub fn requeue_fetch_front(&mut self, batch: Vec<String>) {
        for id in batch.into_iter().rev() {
            self.fetch_queue.push_front(id);
        }
    }

    /// Re-queue ids that were not yet visible in the store.
    pub fn requeue_fetch_back(&mut self, ids: Vec<String>) {
        self.fetch_queue.extend(ids);
    }

    /// Apply fetched actions in timestamp order (stable; ties keep response
    /// order), gated on `received`. Strokes are drawn; clears wipe the
    /// surface. Returns the batch ids still missing from the response so
    /// the caller can schedule a delayed re-queue.
    pub fn apply_fetched(
        &mut self,
        batch: &[String],
        mut actions: Vec<Action>,
        surface: &mut dyn Surface,
    ) -> Vec<String> {
        actions.sort_by_key(Action::timestamp);

        let mut drawn = 0;
        for action in actions {
            let id = action.stroke_id().to_owned();
            if self.received.contains(&id) {
                continue;
            }
            self.received.insert(id);

            match action {
                Action::Stroke { points, color, line_width, .. } => {
                    surface.draw_stroke(&points, &color, line_width);
                    drawn += 1;
                }
                Action::Clear { .. } => {
                    // A remote clear really does clear this canvas. Dedup
                    // sets stay intact so pre-clear strokes are never
                    // re-fetched and re-drawn over the wiped surface.
                    surface.clear();
                    self.push_log("canvas cleared remotely");
                }
            }
        }

        if drawn > 0 {
            self.stats.received += drawn;
            self.push_log(format!("applied {drawn} strokes"));
        }

        batch
            .iter()
            .filter(|id| !self.received.contains(*id))
            .cloned()
            .collect()
    }

    // =========================================================================
    // SEND
    // =========================================================================

    /// Pop up to [`SEND_BATCH`] actions off the front of the send queue.
    pub fn take_send_batch(&mut self) -> Vec<Action> {
        let take = self.send_queue.len().min(SEND_BATCH);
        self.send_queue.drain(..take).collect()
    }

    /// Put the unsent remainder of a failed batch back at the front in its
    /// original order, ahead of anything produced meanwhile.
    pub fn restore_send_front(&mut self, rest: Vec<Action>) {
        for action in rest.into_iter().rev() {
            self.send_queue.push_front(action);
        }
    }

    // =========================================================================
    // LOCAL PRODUCTION
    // =========================================================================

    /// Commit a finished stroke: mint an id, pre-seed the dedup sets so the
    /// producer never re-fetches or re-draws its own stroke, and enqueue the
    /// action for upload. Strokes need at least two points.
    pub fn commit_stroke(
        &mut self,
        points: Vec<Point>,
        color: &str,
        line_width: f64,
    ) -> Option<Action> {
        if points.len() < 2 {
            return None;
        }

        let stroke_id = new_stroke_id(&self.identity.user_id);
        self.own.insert(stroke_id.clone());
        self.known.insert(stroke_id.clone());
        self.received.insert(stroke_id.clone());

        let action = Action::Stroke {
            user_id: self.identity.user_id.clone(),
            user_name: self.identity.user_name.clone(),
            stroke_id,
            points,
            color: color.to_owned(),
            line_width,
            timestamp: now_ms(),
            received_at: None,
        };
        self.send_queue.push_back(action.clone());
        self.push_log(format!("stroke committed ({} in queue)", self.send_queue.len()));

        Some(action)
    }

    /// Optimistic producer-side global clear: drop all local sync state,
    /// jump the cursor to now, and return the clear action to fire at the
    /// gateway outside the send queue. The clear's own id is pre-seeded so
    /// discovery never loops it back.
    pub fn begin_clear(&mut self, now: i64) -> Action {
        self.known.clear();
        self.received.clear();
        self.own.clear();
        self.fetch_queue.clear();
        self.send_queue.clear();
        self.last_sync = self.last_sync.max(now);

        let stroke_id = new_clear_id();
        self.own.insert(stroke_id.clone());
        self.known.insert(stroke_id.clone());
        self.received.insert(stroke_id.clone());
        self.push_log("canvas cleared locally");

        Action::Clear {
            user_id: self.identity.user_id.clone(),
            stroke_id,
            timestamp: now,
            received_at: None,
        }
    }
}

#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
