//! Room state management.
//!
//! Each room is owned by a single [`RoomActor`] running in its own tokio
//! task.  All interactions go through [`RoomCommand`] messages sent to the
//! actor's inbox; commands against one room are processed strictly one at a
//! time, in arrival order.  That single-writer ordering is what enforces
//! the membership cap under concurrency and keeps the state machine
//! (`Uninitialized → Active → Terminated`) free of locks on the hot path.
//!
//! The [`RoomRegistry`] is the per-key single-owner mechanism: exactly one
//! actor per room code is live at a time.  Durable state (membership,
//! config) lives in [`RoomStore`] and survives actor restarts; sessions and
//! presence are in-memory only and rebuild as clients reconnect.

mod actor;
mod command;
mod registry;
mod store;

pub use actor::RoomActor;
pub use command::{NotifyOutcome, RoomCommand, SessionHandle};
pub use registry::{RoomHandle, RoomRegistry};
pub use store::{MemberRecord, RoomRecord, RoomStore};

use crate::index::WalletIndex;
use crate::notify::SwapNotifier;
use crate::sync::FilterSyncHandle;
use std::sync::Arc;

/// Shared collaborators handed to every room actor.
#[derive(Clone)]
pub struct RoomDeps {
    pub store: RoomStore,
    pub index: WalletIndex,
    pub sync: FilterSyncHandle,
    pub notifier: Arc<dyn SwapNotifier>,
}
