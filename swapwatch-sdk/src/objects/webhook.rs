//! Webhook ingress acknowledgement objects.

use serde::{Deserialize, Serialize};

/// Outcome of dispatching one event to one room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    /// The room actor accepted and broadcast the event.
    Delivered,
    /// The room actor returned an error or was gone.
    Failed,
    /// The room actor did not respond within the dispatch timeout.
    TimedOut,
}

/// Per-room detail line in a [`WebhookAck`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomDelivery {
    pub room_code: String,
    pub status: DeliveryStatus,
}

/// Response body for `POST /webhook/{provider}`.
///
/// `status` is `"processed"` when at least one room was interested and
/// `"ignored"` when no room tracks the wallet (acknowledged and dropped,
/// not an error).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookAck {
    pub status: String,
    pub wallet_address: String,
    pub rooms_notified: usize,
    pub total_rooms: usize,
    pub details: Vec<RoomDelivery>,
}
