//! Router assembly.
//!
//! One path, verb-dispatched: POST stores an action, GET discovers or
//! fetches depending on the query, DELETE resets the broadcast ledger.
//! Every response carries the permissive CORS header set so any origin can
//! poll the gateway.

pub mod sync;

use axum::Router;
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};

use crate::state::AppState;

#[must_use]
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(
            "/",
            get(sync::discover_or_fetch)
                .post(sync::submit_action)
                .delete(sync::reset_broadcast)
                .options(sync::preflight)
                .fallback(sync::method_not_allowed),
        )
        .layer(cors)
        .with_state(state)
}
