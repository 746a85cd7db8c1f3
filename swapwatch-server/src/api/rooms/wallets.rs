//! Wallet membership and presence handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use swapwatch_sdk::objects::room::{
    AddWalletRequest, PresenceResponse, UpdateLabelRequest, WalletsResponse,
};

use super::RoomApiError;
use crate::state::AppState;

/// `GET /rooms/{code}/wallets`
pub(super) async fn list_wallets(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<WalletsResponse>, RoomApiError> {
    let room = state.registry.get(&code).await?;
    let wallets = room.wallets().await?;
    Ok(Json(WalletsResponse { wallets }))
}

/// `POST /rooms/{code}/wallets` — start tracking a wallet.
pub(super) async fn add_wallet(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Json(req): Json<AddWalletRequest>,
) -> Result<StatusCode, RoomApiError> {
    let room = state.registry.get(&code).await?;
    room.add_wallet(req.address, req.label).await?;
    Ok(StatusCode::CREATED)
}

/// `DELETE /rooms/{code}/wallets/{address}`
pub(super) async fn remove_wallet(
    State(state): State<AppState>,
    Path((code, address)): Path<(String, String)>,
) -> Result<StatusCode, RoomApiError> {
    let room = state.registry.get(&code).await?;
    room.remove_wallet(address).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `PATCH /rooms/{code}/wallets/{address}` — update the display label.
pub(super) async fn update_label(
    State(state): State<AppState>,
    Path((code, address)): Path<(String, String)>,
    Json(req): Json<UpdateLabelRequest>,
) -> Result<StatusCode, RoomApiError> {
    let room = state.registry.get(&code).await?;
    room.update_label(address, req.label).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /rooms/{code}/presence`
pub(super) async fn get_presence(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<PresenceResponse>, RoomApiError> {
    let room = state.registry.get(&code).await?;
    let count = room.presence().await?;
    Ok(Json(PresenceResponse { count }))
}
