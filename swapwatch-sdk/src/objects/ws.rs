//! WebSocket message types for the live room stream.
//!
//! The `GET /rooms/{code}/ws` endpoint upgrades to a WebSocket connection
//! and pushes [`WsServerMessage`] JSON frames.
//!
//! # Protocol
//!
//! 1. The server sends a `presence` frame immediately after the upgrade
//!    (the connecting client is included in the count).
//! 2. Every membership or config mutation in the room is broadcast to all
//!    live sessions as its corresponding frame.
//! 3. Routed swap events arrive as `swap` frames.
//! 4. When the room expires or is deleted the server sends `room_closed`
//!    followed by a close frame; clients should not reconnect.

use serde::{Deserialize, Serialize};

use super::address::Address;
use super::room::RoomConfig;
use super::swap::SwapEvent;

/// Server-to-client WebSocket message.
///
/// Serialized as an internally-tagged JSON object so the client can
/// dispatch on the `"type"` field:
///
/// ```json
/// {"type":"swap","data":{ ... }}
/// {"type":"presence","count":3}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsServerMessage {
    /// A routed swap event for one of the room's tracked wallets.
    Swap { data: SwapEvent },

    /// A wallet was added to the room.
    WalletAdded {
        address: Address,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        label: Option<String>,
    },

    /// A wallet was removed from the room.
    WalletRemoved { address: Address },

    /// A wallet's label changed.
    LabelUpdated { address: Address, label: String },

    /// The room configuration changed.
    ConfigUpdated { config: RoomConfig },

    /// The live-session count changed.
    Presence { count: usize },

    /// The room expired or was deleted; the connection closes next.
    RoomClosed { reason: String },

    /// A server-side error that does **not** close the connection by
    /// itself.
    Error { code: u16, reason: String },
}

/// Well-known WebSocket close codes used by the room stream.
///
/// Codes in the 4000–4999 range are reserved for application use by
/// [RFC 6455 §7.4.2](https://www.rfc-editor.org/rfc/rfc6455#section-7.4.2).
pub struct WsCloseCode;

impl WsCloseCode {
    /// Normal closure (room expired or was deleted).
    pub const NORMAL: u16 = 1000;

    /// An unexpected server-side error prevented the connection from
    /// continuing.
    pub const INTERNAL_ERROR: u16 = 1011;

    /// The requested room does not exist (or has already terminated).
    pub const ROOM_NOT_FOUND: u16 = 4004;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_internally_tagged() {
        let msg = WsServerMessage::Presence { count: 2 };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "presence");
        assert_eq!(json["count"], 2);

        let msg = WsServerMessage::WalletAdded {
            address: Address::parse("0xAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA1").unwrap(),
            label: Some("Whale".into()),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "wallet_added");
        assert_eq!(json["label"], "Whale");
    }
}
