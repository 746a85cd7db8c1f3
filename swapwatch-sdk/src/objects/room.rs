//! Room management API request/response objects.

use super::address::Address;
use serde::{Deserialize, Serialize};

/// A room's notification configuration and lifetime, as exposed by the API.
///
/// Timestamps are unix seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomConfig {
    /// Minimum `amountInUsd` for which the external notification
    /// collaborator is triggered.  `None` disables notifications.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notify_threshold: Option<f64>,
    /// Opaque delivery target handed to the notification collaborator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notify_target: Option<String>,
    pub created_at: i64,
    pub expires_at: i64,
}

/// Partial config update; absent fields are left unchanged, an explicit
/// `null` clears the field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomConfigPatch {
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub notify_threshold: Option<Option<f64>>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub notify_target: Option<Option<String>>,
}

/// Distinguishes an absent field (outer `None`, via the `default`) from an
/// explicit `null` (`Some(None)`); this only runs when the field is present.
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

/// One tracked wallet with its optional display label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletEntry {
    pub address: Address,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// `POST /rooms`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomRequest {
    /// Room lifetime in hours; server default applies when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl_hours: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notify_threshold: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notify_target: Option<String>,
}

/// Response to `POST /rooms`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomResponse {
    pub code: String,
    pub config: RoomConfig,
}

/// `POST /rooms/{code}/wallets`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddWalletRequest {
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// `PATCH /rooms/{code}/wallets/{address}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateLabelRequest {
    pub label: String,
}

/// `POST /rooms/{code}/extend`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtendRequest {
    pub hours: u32,
}

/// `GET /rooms/{code}/presence`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceResponse {
    pub count: usize,
}

/// `GET /rooms/{code}/wallets`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletsResponse {
    pub wallets: Vec<WalletEntry>,
}
