//! Error taxonomy for the routing core.
//!
//! Validation, conflict, not-found, and limit errors surface as typed
//! failures directly to the caller.  Storage errors on idempotent index
//! operations are retried before surfacing.  [`SyncError`] never propagates
//! to any caller — the filter synchronizer logs it and the next membership
//! change retries implicitly.

use swapwatch_sdk::objects::{Address, AddressError};
use thiserror::Error;

/// Number of wallets a room may track.
pub const MAX_WALLETS: usize = 20;

/// Maximum label length in characters.
pub const MAX_LABEL_LEN: usize = 64;

/// Maximum single extension, in hours (one week).
pub const MAX_EXTENSION_HOURS: u32 = 168;

/// Maximum notify threshold in USD.
pub const MAX_NOTIFY_THRESHOLD: f64 = 1e12;

/// Failures of room commands.
#[derive(Debug, Error)]
pub enum RoomError {
    #[error("invalid wallet address: {0}")]
    InvalidAddress(#[from] AddressError),

    #[error("label exceeds {MAX_LABEL_LEN} characters")]
    InvalidLabel,

    #[error("notify threshold out of range: {0}")]
    InvalidThreshold(f64),

    #[error("hour value out of range: {0}")]
    InvalidHours(u32),

    #[error("wallet {0} is already tracked by this room")]
    AlreadyExists(Address),

    #[error("wallet {0} is not tracked by this room")]
    WalletNotFound(Address),

    #[error("room wallet limit of {MAX_WALLETS} reached")]
    LimitExceeded,

    #[error("room {0} not found")]
    NotFound(String),

    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error(transparent)]
    Index(#[from] IndexError),
}

/// Failures of wallet-index operations (after retries are exhausted).
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("index storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("corrupt index entry for key {key}: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Failures of the upstream filter push.  Best-effort: logged, never
/// returned to room or webhook callers.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("filter sync request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("filter sync timed out")]
    Timeout,

    #[error("upstream rejected filter update with status {0}")]
    Rejected(u16),
}

/// Failures of the external notification collaborator.  Fire-and-forget:
/// logged by the spawning task, never blocks a broadcast.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification delivery failed: {0}")]
    Delivery(String),
}

/// Failures of webhook event routing.
#[derive(Debug, Error)]
pub enum RouteError {
    #[error("event wallet address is missing or malformed: {0}")]
    InvalidWallet(#[from] AddressError),

    #[error(transparent)]
    Index(#[from] IndexError),
}
