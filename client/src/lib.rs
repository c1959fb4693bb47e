//! EdgeBoard sync client.
//!
//! ARCHITECTURE
//! ============
//! Three cooperative loops converge a local canvas with the shared one over
//! nothing but periodic HTTP polling:
//!
//! - Discovery polls the broadcast feed for stroke ids newer than a cursor.
//! - Fetch resolves queued ids into full actions and applies them in
//!   timestamp order.
//! - Send drains locally produced actions to the gateway with bounded retry.
//!
//! All dedup/ordering state lives in [`state::SyncState`]; the loops in
//! [`engine`] are thin drivers around it. Rendering stays behind the
//! [`surface::Surface`] trait.

pub mod api;
pub mod engine;
pub mod state;
pub mod surface;
