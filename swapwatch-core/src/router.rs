//! Webhook event routing.
//!
//! One inbound swap event fans out to every room tracking its wallet.
//! Room lookups go through the registry, so a room with durable state but
//! no live actor is restored on the way.  Dispatches run concurrently and
//! independently; one slow or dead room never blocks the others, and the
//! caller gets a per-room outcome either way.

use crate::error::RouteError;
use crate::index::WalletIndex;
use crate::room::RoomRegistry;
use futures_util::future::join_all;
use std::time::Duration;
use swapwatch_sdk::objects::webhook::{DeliveryStatus, RoomDelivery, WebhookAck};
use swapwatch_sdk::objects::{Address, SwapEvent};
use tracing::{debug, info, warn};

/// Per-room dispatch timeout.  A room that cannot accept the command in
/// this window is reported as timed out and skipped.
const DISPATCH_TIMEOUT: Duration = Duration::from_secs(2);

/// Fans inbound swap events out to interested rooms.
#[derive(Clone)]
pub struct EventRouter {
    index: WalletIndex,
    registry: RoomRegistry,
}

impl EventRouter {
    pub fn new(index: WalletIndex, registry: RoomRegistry) -> Self {
        Self { index, registry }
    }

    /// Route one verified event.  Events for untracked wallets are
    /// acknowledged and dropped, not errors.
    pub async fn route(&self, event: SwapEvent) -> Result<WebhookAck, RouteError> {
        let wallet = Address::parse(&event.wallet_address)?;
        let rooms = self.index.rooms_for_wallet(&wallet).await?;

        if rooms.is_empty() {
            debug!(wallet = %wallet, "event for untracked wallet, dropping");
            return Ok(WebhookAck {
                status: "ignored".to_owned(),
                wallet_address: wallet.to_string(),
                rooms_notified: 0,
                total_rooms: 0,
                details: Vec::new(),
            });
        }

        let total_rooms = rooms.len();
        let dispatches = rooms
            .into_iter()
            .map(|code| self.dispatch_to_room(code, event.clone()));
        let details = join_all(dispatches).await;

        let rooms_notified = details
            .iter()
            .filter(|d| d.status == DeliveryStatus::Delivered)
            .count();
        info!(
            wallet = %wallet,
            rooms_notified,
            total_rooms,
            "event routed"
        );
        Ok(WebhookAck {
            status: "processed".to_owned(),
            wallet_address: wallet.to_string(),
            rooms_notified,
            total_rooms,
            details,
        })
    }

    async fn dispatch_to_room(&self, code: String, event: SwapEvent) -> RoomDelivery {
        let attempt = async {
            let room = self.registry.get(&code).await?;
            room.notify_swap(event).await
        };
        let status = match tokio::time::timeout(DISPATCH_TIMEOUT, attempt).await {
            Ok(Ok(outcome)) => {
                debug!(room = %code, delivered = outcome.delivered, "event delivered");
                DeliveryStatus::Delivered
            }
            Ok(Err(e)) => {
                // Typically an index entry outliving the room for a moment.
                warn!(room = %code, error = %e, "event dispatch failed");
                DeliveryStatus::Failed
            }
            Err(_) => {
                warn!(room = %code, "event dispatch timed out");
                DeliveryStatus::TimedOut
            }
        };
        RoomDelivery {
            room_code: code,
            status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::LogNotifier;
    use crate::room::{RoomDeps, RoomStore, SessionHandle};
    use crate::sync::FilterSyncHandle;
    use sqlx::sqlite::SqlitePoolOptions;
    use std::sync::Arc;
    use swapwatch_sdk::objects::ws::WsServerMessage;
    use tokio::sync::mpsc;
    use uuid::Uuid;

    fn build(pool: sqlx::SqlitePool) -> (EventRouter, RoomRegistry, WalletIndex) {
        let index = WalletIndex::new(pool.clone());
        let deps = RoomDeps {
            store: RoomStore::new(pool),
            index: index.clone(),
            sync: FilterSyncHandle::disconnected(),
            notifier: Arc::new(LogNotifier),
        };
        let registry = RoomRegistry::new(deps, 48);
        let router = EventRouter::new(index.clone(), registry.clone());
        (router, registry, index)
    }

    async fn setup() -> (EventRouter, RoomRegistry, WalletIndex) {
        build(test_pool().await)
    }

    async fn test_pool() -> sqlx::SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        crate::run_migrations(&pool).await.unwrap();
        pool
    }

    fn addr(n: u8) -> Address {
        Address::parse(&format!("0x{:040x}", n)).unwrap()
    }

    fn swap(wallet: &Address) -> SwapEvent {
        SwapEvent {
            wallet_address: wallet.as_str().to_owned(),
            tx_hash: None,
            amount_in_usd: Some(250.0),
            token_in: None,
            token_out: None,
            timestamp: None,
            extra: serde_json::Map::new(),
        }
    }

    #[tokio::test]
    async fn untracked_wallet_is_ignored() {
        let (router, _registry, _index) = setup().await;
        let ack = router.route(swap(&addr(1))).await.unwrap();
        assert_eq!(ack.status, "ignored");
        assert_eq!(ack.total_rooms, 0);
        assert!(ack.details.is_empty());
    }

    #[tokio::test]
    async fn malformed_wallet_is_an_error() {
        let (router, _registry, _index) = setup().await;
        let event = SwapEvent {
            wallet_address: "garbage".to_owned(),
            tx_hash: None,
            amount_in_usd: None,
            token_in: None,
            token_out: None,
            timestamp: None,
            extra: serde_json::Map::new(),
        };
        assert!(matches!(
            router.route(event).await,
            Err(RouteError::InvalidWallet(_))
        ));
    }

    #[tokio::test]
    async fn event_reaches_every_tracking_room() {
        let (router, registry, _index) = setup().await;
        let room_a = registry.create(None, None, None).await.unwrap();
        let room_b = registry.create(None, None, None).await.unwrap();
        let room_c = registry.create(None, None, None).await.unwrap();
        room_a.add_wallet(addr(1).to_string(), None).await.unwrap();
        room_b.add_wallet(addr(1).to_string(), None).await.unwrap();
        room_c.add_wallet(addr(2).to_string(), None).await.unwrap();

        let ack = router.route(swap(&addr(1))).await.unwrap();
        assert_eq!(ack.status, "processed");
        assert_eq!(ack.total_rooms, 2);
        assert_eq!(ack.rooms_notified, 2);
        let codes: Vec<&str> = ack.details.iter().map(|d| d.room_code.as_str()).collect();
        assert!(codes.contains(&room_a.code()));
        assert!(codes.contains(&room_b.code()));
        assert!(!codes.contains(&room_c.code()));
    }

    #[tokio::test]
    async fn routed_event_is_broadcast_to_sessions() {
        let (router, registry, _index) = setup().await;
        let room = registry.create(None, None, None).await.unwrap();
        room.add_wallet(addr(1).to_string(), None).await.unwrap();

        let (tx, mut rx) = mpsc::channel(8);
        room.connect(SessionHandle {
            id: Uuid::new_v4(),
            sender: tx,
        })
        .await
        .unwrap();

        router.route(swap(&addr(1))).await.unwrap();

        loop {
            let msg = tokio::time::timeout(Duration::from_secs(5), rx.recv())
                .await
                .unwrap()
                .unwrap();
            if let WsServerMessage::Swap { data } = msg {
                assert_eq!(data.wallet_address, addr(1).as_str());
                break;
            }
        }
    }

    #[tokio::test]
    async fn stale_index_entry_reports_failure_without_blocking_others() {
        let (router, registry, index) = setup().await;
        let live = registry.create(None, None, None).await.unwrap();
        live.add_wallet(addr(1).to_string(), None).await.unwrap();
        // An index entry pointing at a room that no longer exists.
        index.add_wallet_to_room(&addr(1), "GHOST000").await.unwrap();

        let ack = router.route(swap(&addr(1))).await.unwrap();
        assert_eq!(ack.total_rooms, 2);
        assert_eq!(ack.rooms_notified, 1);
        let ghost = ack
            .details
            .iter()
            .find(|d| d.room_code == "GHOST000")
            .unwrap();
        assert_eq!(ghost.status, DeliveryStatus::Failed);
    }

    #[tokio::test]
    async fn routing_restores_dormant_rooms() {
        let pool = test_pool().await;
        let (_, registry, _) = build(pool.clone());
        let room = registry.create(None, None, None).await.unwrap();
        let code = room.code().to_owned();
        room.add_wallet(addr(1).to_string(), None).await.unwrap();

        // Fresh registry and router over the same storage: the room has
        // durable state but no live actor.
        let (router2, _registry2, _) = build(pool);
        let ack = router2.route(swap(&addr(1))).await.unwrap();
        assert_eq!(ack.rooms_notified, 1);
        assert_eq!(ack.details[0].room_code, code);
    }
}
