//! Broadcast ledger — the bounded discovery feed over the action store.
//!
//! DESIGN
//! ======
//! A single record under a reserved key, manipulated read-modify-write. The
//! KV gives no compare-and-swap, so concurrent appends may race and one may
//! be lost. That is accepted: the action store write has already succeeded,
//! so a lost append only delays discovery by other clients. Ledger writes
//! are therefore never retried.
//!
//! The record keeps only the most recent entries (FIFO by insertion), which
//! trades a sliding discovery window for never scanning the whole store.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::kv::Kv;

/// Reserved key holding the ledger record.
pub const BROADCAST_KEY: &str = "broadcast";

/// Entry cap; oldest entries are evicted first when exceeded.
pub const MAX_ITEMS: usize = 200;

/// One discovery feed entry. Ordered by insertion, not by `ts`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastEntry {
    pub id: String,
    pub ts: i64,
}

/// The stored ledger record. `version` is the timestamp of the last write.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BroadcastRecord {
    pub items: Vec<BroadcastEntry>,
    pub version: i64,
}

/// Discovery result: ids newer than a cursor plus the record's total size.
#[derive(Clone, Debug, Default)]
pub struct LedgerView {
    pub stroke_ids: Vec<String>,
    pub total: usize,
}

async fn read_record(kv: &dyn Kv) -> BroadcastRecord {
    match kv.get(BROADCAST_KEY).await {
        Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!(error = %e, "broadcast record failed to parse; using empty record");
            BroadcastRecord::default()
        }),
        Ok(None) => BroadcastRecord::default(),
        Err(e) => {
            warn!(error = %e, "broadcast read failed; using empty record");
            BroadcastRecord::default()
        }
    }
}

async fn write_record(kv: &dyn Kv, record: &BroadcastRecord) {
    let payload = match serde_json::to_string(record) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(error = %e, "broadcast record failed to serialize");
            return;
        }
    };
    if let Err(e) = kv.put(BROADCAST_KEY, payload).await {
        warn!(error = %e, "broadcast write failed; discovery will lag");
    }
}

/// Best-effort append. Duplicate ids are dropped silently; failures are
/// logged and swallowed, never retried.
pub async fn append(kv: &dyn Kv, id: &str, ts: i64) {
    let mut record = read_record(kv).await;

    if record.items.iter().any(|item| item.id == id) {
        return;
    }

    record.items.push(BroadcastEntry { id: id.to_owned(), ts });
    if record.items.len() > MAX_ITEMS {
        let excess = record.items.len() - MAX_ITEMS;
        record.items.drain(..excess);
    }
    record.version = ts;

    write_record(kv, &record).await;
}

/// Ids with `ts` newer than `since`, in insertion order. Empty on any
/// storage failure.
pub async fn read_since(kv: &dyn Kv, since: i64) -> LedgerView {
    let record = read_record(kv).await;
    let total = record.items.len();
    let stroke_ids = record
        .items
        .into_iter()
        .filter(|item| item.ts > since)
        .map(|item| item.id)
        .collect();

    LedgerView { stroke_ids, total }
}

/// Replace the record with an empty list and a fresh version.
pub async fn reset(kv: &dyn Kv, now: i64) {
    write_record(kv, &BroadcastRecord { items: Vec::new(), version: now }).await;
}

#[cfg(test)]
#[path = "ledger_test.rs"]
mod tests;
