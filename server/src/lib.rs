//! EdgeBoard sync gateway.
//!
//! SYSTEM CONTEXT
//! ==============
//! Stateless HTTP façade over a flat key-value namespace. Actions are stored
//! once under their stroke id; a single bounded broadcast record doubles as
//! the discovery feed so polling clients never scan the whole store.

pub mod kv;
pub mod routes;
pub mod services;
pub mod state;
