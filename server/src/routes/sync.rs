//! Sync gateway handlers.

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use futures::future::join_all;
use protocol::{
    Action, DiscoverResponse, FetchResponse, PostResponse, Usage, UsageResponse, now_ms,
};
use serde::Deserialize;
use tracing::{error, info};

use crate::services::{ledger, store};
use crate::state::AppState;

/// Ids answered per fetch request, after trimming.
const MAX_FETCH_IDS: usize = 100;

#[derive(Debug, Default, Deserialize)]
pub struct SyncQuery {
    pub since: Option<i64>,
    pub ids: Option<String>,
}

/// `OPTIONS /` — preflight. The CORS layer attaches the headers.
pub async fn preflight() -> StatusCode {
    StatusCode::NO_CONTENT
}

/// `POST /` — store an action, then advertise it on the broadcast ledger.
///
/// The store write is retried and is the source of truth; the ledger append
/// is best-effort and runs only after the write succeeded.
pub async fn submit_action(
    State(state): State<AppState>,
    Json(mut action): Json<Action>,
) -> Response {
    let now = now_ms();
    action.set_received_at(now);

    if let Err(e) = store::put_action(state.kv.as_ref(), &action).await {
        error!(error = %e, id = action.stroke_id(), "action write failed");
        let body = PostResponse {
            ok: false,
            key: None,
            server_time: None,
            error: Some("Write failed".into()),
        };
        return (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response();
    }

    ledger::append(state.kv.as_ref(), action.stroke_id(), action.timestamp()).await;
    info!(id = action.stroke_id(), "action stored");

    let body = PostResponse {
        ok: true,
        key: Some(action.stroke_id().to_owned()),
        server_time: Some(now),
        error: None,
    };
    Json(body).into_response()
}

/// `GET /` — `?since=` discovers new ids, `?ids=` fetches payloads, neither
/// returns usage help. `ids` wins when both are present.
pub async fn discover_or_fetch(
    State(state): State<AppState>,
    Query(query): Query<SyncQuery>,
) -> Response {
    if let Some(ids) = query.ids {
        return Json(fetch_actions(&state, &ids).await).into_response();
    }
    if let Some(since) = query.since {
        return Json(discover(&state, since).await).into_response();
    }

    Json(UsageResponse {
        error: "Invalid request".into(),
        usage: Usage {
            discover: "?since=timestamp - list stroke ids newer than the cursor".into(),
            fetch: "?ids=id1,id2,id3 - fetch action payloads by id".into(),
        },
    })
    .into_response()
}

async fn discover(state: &AppState, since: i64) -> DiscoverResponse {
    let view = ledger::read_since(state.kv.as_ref(), since).await;
    DiscoverResponse {
        stroke_ids: view.stroke_ids,
        server_time: now_ms(),
        total: view.total,
    }
}

async fn fetch_actions(state: &AppState, raw_ids: &str) -> FetchResponse {
    let ids: Vec<&str> = raw_ids
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .take(MAX_FETCH_IDS)
        .collect();

    let lookups = ids.iter().map(|id| store::get_action(state.kv.as_ref(), id));
    let actions: Vec<Action> = join_all(lookups).await.into_iter().flatten().collect();
    let found = actions.len();

    FetchResponse { actions, server_time: now_ms(), requested: ids.len(), found }
}

/// `DELETE /` — reset the broadcast ledger. Stored actions stay fetchable
/// by id; their ledger entries are simply gone (orphaned but harmless).
pub async fn reset_broadcast(State(state): State<AppState>) -> Json<serde_json::Value> {
    ledger::reset(state.kv.as_ref(), now_ms()).await;
    info!("broadcast ledger reset");
    Json(serde_json::json!({ "ok": true }))
}

/// Any other verb.
pub async fn method_not_allowed() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(serde_json::json!({ "error": "Method not allowed" })),
    )
}

#[cfg(test)]
#[path = "sync_test.rs"]
mod tests;
