//! The room actor's command protocol.
//!
//! Every command that produces a result carries a oneshot reply channel.
//! Senders that find the channel closed treat the room as gone
//! (`NotFound`), since an actor only stops after terminating.

use crate::error::RoomError;
use swapwatch_sdk::objects::room::{RoomConfig, RoomConfigPatch, WalletEntry};
use swapwatch_sdk::objects::ws::WsServerMessage;
use swapwatch_sdk::objects::{Address, SwapEvent};
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

/// A live subscriber connection, registered with its owning room actor.
///
/// The actor fans out via `sender`; the connection's own read/write loop
/// runs elsewhere and never touches room state directly.
#[derive(Debug)]
pub struct SessionHandle {
    pub id: Uuid,
    pub sender: mpsc::Sender<WsServerMessage>,
}

/// Result of a `NotifySwap` dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotifyOutcome {
    /// Live sessions the `swap` frame was handed to.
    pub delivered: usize,
    /// Whether the external notification collaborator was triggered.
    pub notification_sent: bool,
}

/// Commands processed sequentially by a [`RoomActor`](super::RoomActor).
pub enum RoomCommand {
    AddWallet {
        address: String,
        label: Option<String>,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },
    RemoveWallet {
        address: String,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },
    UpdateLabel {
        address: String,
        label: String,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },
    UpdateConfig {
        patch: RoomConfigPatch,
        reply: oneshot::Sender<Result<RoomConfig, RoomError>>,
    },
    Extend {
        hours: u32,
        reply: oneshot::Sender<Result<RoomConfig, RoomError>>,
    },
    GetWallets {
        reply: oneshot::Sender<Vec<WalletEntry>>,
    },
    GetConfig {
        reply: oneshot::Sender<RoomConfig>,
    },
    GetPresence {
        reply: oneshot::Sender<usize>,
    },
    HasWallet {
        address: Address,
        reply: oneshot::Sender<bool>,
    },
    NotifySwap {
        event: Box<SwapEvent>,
        reply: oneshot::Sender<NotifyOutcome>,
    },
    Connect {
        session: SessionHandle,
        reply: oneshot::Sender<usize>,
    },
    Disconnect {
        session_id: Uuid,
    },
    Close {
        reply: oneshot::Sender<()>,
    },
}
