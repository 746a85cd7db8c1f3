//! Per-code ownership of room actors.
//!
//! The registry guarantees at most one live actor per room code.  Lookups
//! for a code with durable state but no live actor restore the actor from
//! [`RoomStore`](super::RoomStore) on the spot, so rooms survive process
//! restarts transparently.

use super::actor::{validate_threshold, RoomActor};
use super::command::{NotifyOutcome, RoomCommand, SessionHandle};
use super::store::RoomRecord;
use super::RoomDeps;
use crate::error::RoomError;
use fast32::base32::CROCKFORD;
use rand::RngCore;
use std::collections::HashMap;
use std::sync::Arc;
use swapwatch_sdk::objects::room::{RoomConfig, RoomConfigPatch, WalletEntry};
use swapwatch_sdk::objects::{Address, SwapEvent};
use time::OffsetDateTime;
use tokio::sync::{mpsc, oneshot, RwLock};
use tracing::{info, warn};
use uuid::Uuid;

/// Upper bound for both the initial TTL and any single extension target.
pub const MAX_TTL_HOURS: u32 = 720;

/// Random bytes per room code; Crockford base32 turns 5 bytes into 8 chars.
const CODE_BYTES: usize = 5;

pub(crate) struct RegistryInner {
    pub(crate) rooms: RwLock<HashMap<String, RoomHandle>>,
    deps: RoomDeps,
    default_ttl_hours: u32,
}

/// Creates, restores, and looks up room actors.
#[derive(Clone)]
pub struct RoomRegistry {
    inner: Arc<RegistryInner>,
}

impl RoomRegistry {
    pub fn new(deps: RoomDeps, default_ttl_hours: u32) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                rooms: RwLock::new(HashMap::new()),
                deps,
                default_ttl_hours,
            }),
        }
    }

    /// Create a fresh room with a unique code and spawn its actor.
    pub async fn create(
        &self,
        ttl_hours: Option<u32>,
        notify_threshold: Option<f64>,
        notify_target: Option<String>,
    ) -> Result<RoomHandle, RoomError> {
        let ttl = ttl_hours.unwrap_or(self.inner.default_ttl_hours);
        if ttl == 0 || ttl > MAX_TTL_HOURS {
            return Err(RoomError::InvalidHours(ttl));
        }
        if let Some(threshold) = notify_threshold {
            validate_threshold(threshold)?;
        }

        let now = OffsetDateTime::now_utc().unix_timestamp();
        let mut rooms = self.inner.rooms.write().await;

        let code = loop {
            let candidate = generate_code();
            if rooms.contains_key(&candidate) {
                continue;
            }
            if self.inner.deps.store.load_room(&candidate).await?.is_none() {
                break candidate;
            }
        };

        let record = RoomRecord {
            code: code.clone(),
            notify_threshold,
            notify_target,
            created_at: now,
            expires_at: now + i64::from(ttl) * 3600,
        };
        self.inner.deps.store.insert_room(&record).await?;

        let handle = self.spawn_handle(record, Vec::new());
        rooms.insert(code.clone(), handle.clone());
        info!(room = %code, ttl_hours = ttl, "room created");
        Ok(handle)
    }

    /// Look up a room by code, restoring its actor from durable state if
    /// none is live.  Expired durable state is purged on the way.
    pub async fn get(&self, code: &str) -> Result<RoomHandle, RoomError> {
        if let Some(handle) = self.inner.rooms.read().await.get(code) {
            return Ok(handle.clone());
        }

        let mut rooms = self.inner.rooms.write().await;
        // Re-check: another task may have restored it between locks.
        if let Some(handle) = rooms.get(code) {
            return Ok(handle.clone());
        }

        let record = self
            .inner
            .deps
            .store
            .load_room(code)
            .await?
            .ok_or_else(|| RoomError::NotFound(code.to_owned()))?;

        if record.expires_at <= OffsetDateTime::now_utc().unix_timestamp() {
            self.purge_expired(code).await;
            return Err(RoomError::NotFound(code.to_owned()));
        }

        let members = self.inner.deps.store.load_members(code).await?;
        let handle = self.spawn_handle(record, members);
        rooms.insert(code.to_owned(), handle.clone());
        info!(room = %code, "room restored from storage");
        Ok(handle)
    }

    /// Tear a room down immediately: sessions are closed, durable state and
    /// index entries are cleared, and the code becomes free.
    pub async fn delete(&self, code: &str) -> Result<(), RoomError> {
        let handle = self.get(code).await?;
        handle.close().await
    }

    fn spawn_handle(
        &self,
        record: RoomRecord,
        members: Vec<super::store::MemberRecord>,
    ) -> RoomHandle {
        let code = record.code.clone();
        let tx = RoomActor::spawn(
            record,
            members,
            self.inner.deps.clone(),
            Arc::downgrade(&self.inner),
        );
        RoomHandle { code, tx }
    }

    async fn purge_expired(&self, code: &str) {
        if let Err(e) = self.inner.deps.store.delete_room(code).await {
            warn!(room = %code, error = %e, "failed to purge expired room");
        }
        if let Err(e) = self.inner.deps.index.cleanup_room(code).await {
            warn!(room = %code, error = %e, "failed to clean index for expired room");
        }
        self.inner.deps.sync.notify_membership_changed();
        info!(room = %code, "expired room purged on lookup");
    }
}

fn generate_code() -> String {
    let mut bytes = [0u8; CODE_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    CROCKFORD.encode(&bytes)
}

/// Cheap, cloneable sender side of a room actor.
///
/// Every method maps a dead actor (closed inbox or dropped reply) to
/// [`RoomError::NotFound`]: an actor only stops after terminating, so a
/// dead inbox means the room is gone.
#[derive(Clone)]
pub struct RoomHandle {
    code: String,
    tx: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    pub fn code(&self) -> &str {
        &self.code
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> RoomCommand,
    ) -> Result<T, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(build(reply_tx))
            .await
            .map_err(|_| RoomError::NotFound(self.code.clone()))?;
        reply_rx
            .await
            .map_err(|_| RoomError::NotFound(self.code.clone()))
    }

    pub async fn add_wallet(
        &self,
        address: String,
        label: Option<String>,
    ) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::AddWallet {
            address,
            label,
            reply,
        })
        .await?
    }

    pub async fn remove_wallet(&self, address: String) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::RemoveWallet { address, reply })
            .await?
    }

    pub async fn update_label(&self, address: String, label: String) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::UpdateLabel {
            address,
            label,
            reply,
        })
        .await?
    }

    pub async fn update_config(&self, patch: RoomConfigPatch) -> Result<RoomConfig, RoomError> {
        self.request(|reply| RoomCommand::UpdateConfig { patch, reply })
            .await?
    }

    pub async fn extend(&self, hours: u32) -> Result<RoomConfig, RoomError> {
        self.request(|reply| RoomCommand::Extend { hours, reply })
            .await?
    }

    pub async fn wallets(&self) -> Result<Vec<WalletEntry>, RoomError> {
        self.request(|reply| RoomCommand::GetWallets { reply }).await
    }

    pub async fn config(&self) -> Result<RoomConfig, RoomError> {
        self.request(|reply| RoomCommand::GetConfig { reply }).await
    }

    pub async fn presence(&self) -> Result<usize, RoomError> {
        self.request(|reply| RoomCommand::GetPresence { reply }).await
    }

    pub async fn has_wallet(&self, address: Address) -> Result<bool, RoomError> {
        self.request(|reply| RoomCommand::HasWallet { address, reply })
            .await
    }

    pub async fn notify_swap(&self, event: SwapEvent) -> Result<NotifyOutcome, RoomError> {
        self.request(|reply| RoomCommand::NotifySwap {
            event: Box::new(event),
            reply,
        })
        .await
    }

    pub async fn connect(&self, session: SessionHandle) -> Result<usize, RoomError> {
        self.request(|reply| RoomCommand::Connect { session, reply })
            .await
    }

    /// Fire-and-forget: a dead actor already dropped the session.
    pub async fn disconnect(&self, session_id: Uuid) {
        let _ = self.tx.send(RoomCommand::Disconnect { session_id }).await;
    }

    pub async fn close(&self) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Close { reply }).await
    }
}
