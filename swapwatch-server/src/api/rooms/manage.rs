//! Room lifecycle and configuration handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use swapwatch_sdk::objects::room::{
    CreateRoomRequest, CreateRoomResponse, ExtendRequest, RoomConfig, RoomConfigPatch,
};

use super::RoomApiError;
use crate::state::AppState;

/// `POST /rooms` — create a room and spawn its actor.
pub(super) async fn create_room(
    State(state): State<AppState>,
    Json(req): Json<CreateRoomRequest>,
) -> Result<(StatusCode, Json<CreateRoomResponse>), RoomApiError> {
    let default_ttl = state.config.rooms.read().await.default_ttl_hours;
    let ttl = req.ttl_hours.unwrap_or(default_ttl);

    let room = state
        .registry
        .create(Some(ttl), req.notify_threshold, req.notify_target)
        .await?;
    let config = room.config().await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateRoomResponse {
            code: room.code().to_owned(),
            config,
        }),
    ))
}

/// `DELETE /rooms/{code}` — immediate teardown.
pub(super) async fn delete_room(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<StatusCode, RoomApiError> {
    state.registry.delete(&code).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /rooms/{code}/extend`
pub(super) async fn extend_room(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Json(req): Json<ExtendRequest>,
) -> Result<Json<RoomConfig>, RoomApiError> {
    let room = state.registry.get(&code).await?;
    let config = room.extend(req.hours).await?;
    Ok(Json(config))
}

/// `GET /rooms/{code}/config`
pub(super) async fn get_config(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<RoomConfig>, RoomApiError> {
    let room = state.registry.get(&code).await?;
    Ok(Json(room.config().await?))
}

/// `PATCH /rooms/{code}/config` — partial update; absent fields are left
/// unchanged, explicit `null` clears a field.
pub(super) async fn patch_config(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Json(patch): Json<RoomConfigPatch>,
) -> Result<Json<RoomConfig>, RoomApiError> {
    let room = state.registry.get(&code).await?;
    Ok(Json(room.update_config(patch).await?))
}
