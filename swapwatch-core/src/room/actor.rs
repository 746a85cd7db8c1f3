//! The room actor.
//!
//! Owns the full state of a single room and processes commands
//! sequentially from an mpsc inbox.  The run loop races the inbox against
//! the room's expiration deadline; the deadline is only observed between
//! commands, so an in-flight command always completes before the room
//! transitions to Terminated.

use super::command::{NotifyOutcome, RoomCommand, SessionHandle};
use super::registry::RegistryInner;
use super::store::{MemberRecord, RoomRecord};
use super::RoomDeps;
use crate::error::{
    RoomError, MAX_EXTENSION_HOURS, MAX_LABEL_LEN, MAX_NOTIFY_THRESHOLD, MAX_WALLETS,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Weak};
use std::time::Duration;
use swapwatch_sdk::objects::room::{RoomConfig, RoomConfigPatch, WalletEntry};
use swapwatch_sdk::objects::ws::WsServerMessage;
use swapwatch_sdk::objects::{Address, SwapEvent};
use time::OffsetDateTime;
use tokio::sync::mpsc;
use uuid::Uuid;
use tracing::{debug, info, warn};

/// Inbox depth per room.
const COMMAND_BUFFER: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

/// Single writer of one room's state.
pub struct RoomActor {
    code: String,
    wallets: BTreeMap<Address, Option<String>>,
    notify_threshold: Option<f64>,
    notify_target: Option<String>,
    created_at: i64,
    expires_at: OffsetDateTime,
    sessions: HashMap<Uuid, mpsc::Sender<WsServerMessage>>,
    deps: RoomDeps,
    registry: Weak<RegistryInner>,
}

impl RoomActor {
    /// Spawn an actor for `record`, pre-populated with persisted members.
    ///
    /// Returns the command sender; the registry wraps it into a
    /// [`RoomHandle`](super::RoomHandle).
    pub(crate) fn spawn(
        record: RoomRecord,
        members: Vec<MemberRecord>,
        deps: RoomDeps,
        registry: Weak<RegistryInner>,
    ) -> mpsc::Sender<RoomCommand> {
        let (tx, rx) = mpsc::channel(COMMAND_BUFFER);

        let mut wallets = BTreeMap::new();
        for member in members {
            match Address::parse(&member.address) {
                Ok(addr) => {
                    wallets.insert(addr, member.label);
                }
                Err(e) => warn!(
                    room = %record.code,
                    address = %member.address,
                    error = %e,
                    "skipping malformed persisted member"
                ),
            }
        }

        let actor = Self {
            expires_at: OffsetDateTime::from_unix_timestamp(record.expires_at)
                .unwrap_or(OffsetDateTime::UNIX_EPOCH),
            code: record.code,
            wallets,
            notify_threshold: record.notify_threshold,
            notify_target: record.notify_target,
            created_at: record.created_at,
            sessions: HashMap::new(),
            deps,
            registry,
        };

        tokio::spawn(actor.run(rx));
        tx
    }

    async fn run(mut self, mut rx: mpsc::Receiver<RoomCommand>) {
        debug!(room = %self.code, wallets = self.wallets.len(), "room actor started");
        loop {
            tokio::select! {
                cmd = rx.recv() => match cmd {
                    Some(cmd) => {
                        if self.handle_command(cmd).await == Flow::Stop {
                            break;
                        }
                    }
                    None => {
                        // Registry gone; nothing can reach this room anymore.
                        self.terminate("orphaned").await;
                        break;
                    }
                },
                _ = tokio::time::sleep(self.time_to_expiry()) => {
                    self.terminate("expired").await;
                    break;
                }
            }
        }
    }

    async fn handle_command(&mut self, cmd: RoomCommand) -> Flow {
        match cmd {
            RoomCommand::AddWallet {
                address,
                label,
                reply,
            } => {
                let _ = reply.send(self.add_wallet(&address, label).await);
            }
            RoomCommand::RemoveWallet { address, reply } => {
                let _ = reply.send(self.remove_wallet(&address).await);
            }
            RoomCommand::UpdateLabel {
                address,
                label,
                reply,
            } => {
                let _ = reply.send(self.update_label(&address, label).await);
            }
            RoomCommand::UpdateConfig { patch, reply } => {
                let _ = reply.send(self.update_config(patch).await);
            }
            RoomCommand::Extend { hours, reply } => {
                let _ = reply.send(self.extend(hours).await);
            }
            RoomCommand::GetWallets { reply } => {
                let wallets = self
                    .wallets
                    .iter()
                    .map(|(address, label)| WalletEntry {
                        address: address.clone(),
                        label: label.clone(),
                    })
                    .collect();
                let _ = reply.send(wallets);
            }
            RoomCommand::GetConfig { reply } => {
                let _ = reply.send(self.config());
            }
            RoomCommand::GetPresence { reply } => {
                let _ = reply.send(self.sessions.len());
            }
            RoomCommand::HasWallet { address, reply } => {
                let _ = reply.send(self.wallets.contains_key(&address));
            }
            RoomCommand::NotifySwap { event, reply } => {
                let _ = reply.send(self.notify_swap(*event));
            }
            RoomCommand::Connect { session, reply } => {
                self.sessions.insert(session.id, session.sender);
                let count = self.sessions.len();
                self.broadcast(&WsServerMessage::Presence { count });
                debug!(room = %self.code, count, "session connected");
                let _ = reply.send(count);
            }
            RoomCommand::Disconnect { session_id } => {
                if self.sessions.remove(&session_id).is_some() {
                    let count = self.sessions.len();
                    self.broadcast(&WsServerMessage::Presence { count });
                    debug!(room = %self.code, count, "session disconnected");
                }
            }
            RoomCommand::Close { reply } => {
                self.terminate("deleted").await;
                let _ = reply.send(());
                return Flow::Stop;
            }
        }
        Flow::Continue
    }

    // -- Membership ---------------------------------------------------------

    async fn add_wallet(&mut self, raw: &str, label: Option<String>) -> Result<(), RoomError> {
        let address = Address::parse(raw)?;
        validate_label(label.as_deref())?;
        if self.wallets.contains_key(&address) {
            return Err(RoomError::AlreadyExists(address));
        }
        if self.wallets.len() >= MAX_WALLETS {
            return Err(RoomError::LimitExceeded);
        }

        self.deps
            .store
            .insert_member(&self.code, &address, label.as_deref())
            .await?;
        self.deps.index.add_wallet_to_room(&address, &self.code).await?;
        self.wallets.insert(address.clone(), label.clone());
        self.deps.sync.notify_membership_changed();
        self.broadcast(&WsServerMessage::WalletAdded { address, label });
        Ok(())
    }

    async fn remove_wallet(&mut self, raw: &str) -> Result<(), RoomError> {
        let address = Address::parse(raw)?;
        if !self.wallets.contains_key(&address) {
            return Err(RoomError::WalletNotFound(address));
        }

        self.deps.store.delete_member(&self.code, &address).await?;
        self.deps
            .index
            .remove_wallet_from_room(&address, &self.code)
            .await?;
        self.wallets.remove(&address);
        self.deps.sync.notify_membership_changed();
        self.broadcast(&WsServerMessage::WalletRemoved { address });
        Ok(())
    }

    async fn update_label(&mut self, raw: &str, label: String) -> Result<(), RoomError> {
        let address = Address::parse(raw)?;
        validate_label(Some(&label))?;
        if !self.wallets.contains_key(&address) {
            return Err(RoomError::WalletNotFound(address));
        }

        self.deps
            .store
            .update_member_label(&self.code, &address, &label)
            .await?;
        self.wallets.insert(address.clone(), Some(label.clone()));
        self.broadcast(&WsServerMessage::LabelUpdated { address, label });
        Ok(())
    }

    // -- Config & lifetime --------------------------------------------------

    async fn update_config(&mut self, patch: RoomConfigPatch) -> Result<RoomConfig, RoomError> {
        if let Some(Some(threshold)) = patch.notify_threshold {
            validate_threshold(threshold)?;
        }

        // Outer `None` leaves a field unchanged; `Some(None)` clears it.
        let threshold = patch.notify_threshold.unwrap_or(self.notify_threshold);
        let target = patch
            .notify_target
            .unwrap_or_else(|| self.notify_target.clone());
        self.deps
            .store
            .update_config(&self.code, threshold, target.as_deref())
            .await?;

        self.notify_threshold = threshold;
        self.notify_target = target;
        let config = self.config();
        self.broadcast(&WsServerMessage::ConfigUpdated {
            config: config.clone(),
        });
        Ok(config)
    }

    async fn extend(&mut self, hours: u32) -> Result<RoomConfig, RoomError> {
        if hours == 0 || hours > MAX_EXTENSION_HOURS {
            return Err(RoomError::InvalidHours(hours));
        }

        let new_expiry = self.expires_at + time::Duration::hours(i64::from(hours));
        self.deps
            .store
            .update_expiry(&self.code, new_expiry.unix_timestamp())
            .await?;
        self.expires_at = new_expiry;

        let config = self.config();
        self.broadcast(&WsServerMessage::ConfigUpdated {
            config: config.clone(),
        });
        info!(room = %self.code, hours, "room extended");
        Ok(config)
    }

    // -- Event delivery -----------------------------------------------------

    fn notify_swap(&mut self, event: SwapEvent) -> NotifyOutcome {
        let delivered = self.broadcast(&WsServerMessage::Swap {
            data: event.clone(),
        });

        let mut notification_sent = false;
        if let (Some(threshold), Some(target)) = (self.notify_threshold, self.notify_target.clone())
        {
            if event.amount_in_usd.unwrap_or(0.0) >= threshold {
                let notifier = Arc::clone(&self.deps.notifier);
                let room = self.code.clone();
                // Fire-and-forget: delivery failures never block the broadcast.
                tokio::spawn(async move {
                    if let Err(e) = notifier.format_and_deliver(&event, &target).await {
                        warn!(room = %room, error = %e, "notification delivery failed");
                    }
                });
                notification_sent = true;
            }
        }

        NotifyOutcome {
            delivered,
            notification_sent,
        }
    }

    /// Hand `msg` to every live session.  Non-blocking: a session with a
    /// full outbox drops this frame; a closed session is pruned.
    fn broadcast(&mut self, msg: &WsServerMessage) -> usize {
        let mut delivered = 0;
        let mut dead = Vec::new();
        for (id, sender) in &self.sessions {
            match sender.try_send(msg.clone()) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(room = %self.code, session = %id, "session outbox full, dropping frame");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => dead.push(*id),
            }
        }
        for id in dead {
            self.sessions.remove(&id);
        }
        delivered
    }

    // -- Termination --------------------------------------------------------

    /// Active → Terminated: close every session, clear durable state, scrub
    /// the wallet index, and deregister.  Storage failures here are logged
    /// rather than surfaced — there is no caller left to care.
    async fn terminate(&mut self, reason: &str) {
        self.broadcast(&WsServerMessage::RoomClosed {
            reason: reason.to_owned(),
        });
        self.sessions.clear();

        if let Err(e) = self.deps.store.delete_room(&self.code).await {
            warn!(room = %self.code, error = %e, "failed to clear persisted room state");
        }
        if let Err(e) = self.deps.index.cleanup_room(&self.code).await {
            warn!(room = %self.code, error = %e, "failed to clean wallet index");
        }
        self.deps.sync.notify_membership_changed();

        if let Some(registry) = self.registry.upgrade() {
            registry.rooms.write().await.remove(&self.code);
        }
        info!(room = %self.code, reason, "room terminated");
    }

    // -- Helpers ------------------------------------------------------------

    fn config(&self) -> RoomConfig {
        RoomConfig {
            notify_threshold: self.notify_threshold,
            notify_target: self.notify_target.clone(),
            created_at: self.created_at,
            expires_at: self.expires_at.unix_timestamp(),
        }
    }

    fn time_to_expiry(&self) -> Duration {
        let remaining = self.expires_at - OffsetDateTime::now_utc();
        if remaining.is_positive() {
            Duration::from_millis(remaining.whole_milliseconds().min(i64::MAX as i128) as u64)
        } else {
            Duration::ZERO
        }
    }
}

fn validate_label(label: Option<&str>) -> Result<(), RoomError> {
    match label {
        Some(l) if l.chars().count() > MAX_LABEL_LEN => Err(RoomError::InvalidLabel),
        _ => Ok(()),
    }
}

pub(crate) fn validate_threshold(threshold: f64) -> Result<(), RoomError> {
    if !threshold.is_finite() || threshold <= 0.0 || threshold > MAX_NOTIFY_THRESHOLD {
        return Err(RoomError::InvalidThreshold(threshold));
    }
    Ok(())
}
