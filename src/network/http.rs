//! HTTP Query Surface
//!
//! Polling-style reads and command forwarding for clients that are not
//! holding a WebSocket open, plus the static web assets. Both handlers
//! read or forward through the same shared store and sink as the push
//! path; neither holds the state lock across I/O.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/api/status` | Reduced status projection |
//! | `POST` | `/api/command` | Forward arbitrary JSON to the simulation |
//! | `GET` | `/*` | Static web assets from the configured directory |

use std::path::Path;
use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::Value;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::network::protocol::CommandResult;
use crate::network::udp::CommandSink;
use crate::state::{StateStore, StatusSummary};

/// Shared handles for the HTTP handlers.
pub struct ApiState {
    /// Shared simulation state.
    pub store: Arc<StateStore>,
    /// Outbound command socket.
    pub sink: Arc<CommandSink>,
}

/// Build the complete router for the HTTP surface.
///
/// Anything outside `/api` falls through to the static file service, so
/// the browser UI and the API share one port.
pub fn build_router(store: Arc<StateStore>, sink: Arc<CommandSink>, static_dir: &Path) -> Router {
    let state = Arc::new(ApiState { store, sink });

    Router::new()
        .route("/api/status", get(get_status))
        .route("/api/command", post(post_command))
        .fallback_service(ServeDir::new(static_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// `GET /api/status` — the reduced projection.
///
/// Intentionally cheaper than a full snapshot: site records collapse to
/// their identifiers.
async fn get_status(State(state): State<Arc<ApiState>>) -> Json<StatusSummary> {
    Json(state.store.summary().await)
}

/// `POST /api/command` — forward an opaque JSON command.
///
/// The reply only says whether the datagram left the bridge; it is not a
/// confirmation of any simulation-side effect. A body that is not JSON is
/// reported back as a failure without contacting the sink.
async fn post_command(
    State(state): State<Arc<ApiState>>,
    body: String,
) -> Json<CommandResult> {
    let command: Value = match serde_json::from_str(&body) {
        Ok(v) => v,
        Err(e) => return Json(CommandResult::failed(format!("invalid JSON: {e}"))),
    };

    match state.sink.send(&command).await {
        Ok(()) => Json(CommandResult::ok()),
        Err(e) => {
            warn!("Failed to forward command from HTTP client: {}", e);
            Json(CommandResult::failed(e.to_string()))
        }
    }
}
