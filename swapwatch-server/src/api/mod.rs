//! HTTP API surface.
//!
//! - `POST /webhook/{provider}` — authenticated swap event ingress.
//! - `/rooms/...` — room management and the per-room WebSocket stream.

pub mod extractors;
pub mod rooms;
pub mod webhook;

use axum::{Router, routing::post};

use crate::state::AppState;

/// Build the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/webhook/{provider}", post(webhook::receive_webhook))
        .nest("/rooms", rooms::router())
}
