//! Shared wire model for the EdgeBoard sync protocol.
//!
//! This crate owns the JSON representation used by both `server` and
//! `client`: immutable drawing actions keyed by stroke id, plus the response
//! body of every gateway endpoint. Field names stay camelCase on the wire so
//! stored payloads and HTTP responses read the same.

use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;
use serde::{Deserialize, Serialize};

// =============================================================================
// ACTIONS
// =============================================================================

/// A single coordinate sample on a stroke path.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// An immutable drawing action, uniquely identified by its stroke id.
///
/// Actions are write-once: once stored under an id, the payload never
/// changes. `received_at` is the only server-assigned field, stamped when
/// the gateway accepts the action.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Action {
    /// A committed stroke. `points` holds at least two samples.
    Stroke {
        #[serde(rename = "userId")]
        user_id: String,
        #[serde(rename = "userName")]
        user_name: String,
        #[serde(rename = "strokeId")]
        stroke_id: String,
        points: Vec<Point>,
        color: String,
        #[serde(rename = "lineWidth")]
        line_width: f64,
        timestamp: i64,
        #[serde(rename = "receivedAt", skip_serializing_if = "Option::is_none")]
        received_at: Option<i64>,
    },
    /// A whole-canvas clear.
    Clear {
        #[serde(rename = "userId")]
        user_id: String,
        #[serde(rename = "strokeId")]
        stroke_id: String,
        timestamp: i64,
        #[serde(rename = "receivedAt", skip_serializing_if = "Option::is_none")]
        received_at: Option<i64>,
    },
}

impl Action {
    /// Globally unique id this action is stored under.
    #[must_use]
    pub fn stroke_id(&self) -> &str {
        match self {
            Self::Stroke { stroke_id, .. } | Self::Clear { stroke_id, .. } => stroke_id,
        }
    }

    /// Producer wall-clock timestamp, milliseconds since the Unix epoch.
    #[must_use]
    pub fn timestamp(&self) -> i64 {
        match self {
            Self::Stroke { timestamp, .. } | Self::Clear { timestamp, .. } => *timestamp,
        }
    }

    /// Stamp the server-assigned arrival time.
    pub fn set_received_at(&mut self, ts: i64) {
        match self {
            Self::Stroke { received_at, .. } | Self::Clear { received_at, .. } => {
                *received_at = Some(ts);
            }
        }
    }
}

// =============================================================================
// RESPONSE BODIES
// =============================================================================

/// `POST /` result. `key` and `server_time` are present on success,
/// `error` on failure.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PostResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(rename = "serverTime", skip_serializing_if = "Option::is_none")]
    pub server_time: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// `GET /?since=ts` result: ids newer than the cursor plus the ledger size.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DiscoverResponse {
    #[serde(rename = "strokeIds")]
    pub stroke_ids: Vec<String>,
    #[serde(rename = "serverTime")]
    pub server_time: i64,
    pub total: usize,
}

/// `GET /?ids=a,b,c` result. Missing ids are silently omitted, so
/// `found <= requested`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FetchResponse {
    pub actions: Vec<Action>,
    #[serde(rename = "serverTime")]
    pub server_time: i64,
    pub requested: usize,
    pub found: usize,
}

/// Help text returned when a `GET` carries neither query parameter.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UsageResponse {
    pub error: String,
    pub usage: Usage,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Usage {
    pub discover: String,
    pub fetch: String,
}

// =============================================================================
// CLOCK AND IDS
// =============================================================================

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Current time as milliseconds since the Unix epoch.
#[must_use]
pub fn now_ms() -> i64 {
    let Ok(dur) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(dur.as_millis()).unwrap_or(0)
}

fn base36_suffix(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| ID_ALPHABET[rng.random_range(0..ID_ALPHABET.len())] as char)
        .collect()
}

/// Synthesize a stroke id from producer identity, wall-clock time, and a
/// random suffix. Collisions are not expected across sessions.
#[must_use]
pub fn new_stroke_id(user_id: &str) -> String {
    format!("{user_id}_{}_{}", now_ms(), base36_suffix(7))
}

/// Synthesize an id for a global clear action.
#[must_use]
pub fn new_clear_id() -> String {
    format!("clear_{}", now_ms())
}

/// Random per-session user label. There is no authentication; this is the
/// whole identity.
#[must_use]
pub fn new_user_id() -> String {
    format!("user_{}", base36_suffix(11))
}

/// Human-facing name shown next to remote strokes.
#[must_use]
pub fn new_user_name() -> String {
    format!("guest{}", rand::rng().random_range(0..1000))
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod tests;
