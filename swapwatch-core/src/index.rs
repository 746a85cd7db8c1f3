//! The bidirectional wallet↔room index.
//!
//! Persisted as two independent key-value-shaped tables (`wallet_rooms` and
//! `room_wallets`, each holding a JSON array per key).  A logical link is
//! written with two independent per-key statements, never a cross-table
//! transaction: a brief window in which only one side reflects the change
//! is accepted — the worst outcome is a transiently missed broadcast, never
//! corrupted state.  Each per-key update is a single SQL statement built on
//! SQLite's JSON functions, so concurrent writers to the same key serialize
//! at the storage layer and set-level add/remove stay commutative.
//!
//! All mutations are idempotent; duplicate add/remove are no-ops, never
//! errors.  Storage errors on mutations are retried with capped exponential
//! backoff before surfacing as [`IndexError`].

use crate::error::IndexError;
use sqlx::{Row, SqlitePool};
use std::collections::BTreeSet;
use std::future::Future;
use std::time::Duration;
use swapwatch_sdk::objects::Address;
use tracing::{debug, warn};

/// Retry attempts for idempotent index writes.
const WRITE_RETRIES: u32 = 3;

/// Base delay for write retries; doubles per attempt.
const RETRY_BASE_DELAY: Duration = Duration::from_millis(50);

/// O(1)-lookup bidirectional mapping between wallets and rooms.
///
/// Cloneable; all clones share the same pool.
#[derive(Clone)]
pub struct WalletIndex {
    pool: SqlitePool,
}

impl WalletIndex {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Link `wallet` to `room`.  Idempotent: linking an already-linked pair
    /// is a no-op.  The wallet-side and room-side entries are written
    /// independently.
    pub async fn add_wallet_to_room(&self, wallet: &Address, room: &str) -> Result<(), IndexError> {
        with_retry(|| self.add_entry("wallet_rooms", "wallet", "rooms", wallet.as_str(), room))
            .await?;
        with_retry(|| self.add_entry("room_wallets", "room_code", "wallets", room, wallet.as_str()))
            .await?;
        debug!(wallet = %wallet, room, "index: linked");
        Ok(())
    }

    /// Unlink `wallet` from `room`.  Idempotent.  An entry whose set becomes
    /// empty is deleted entirely.
    pub async fn remove_wallet_from_room(
        &self,
        wallet: &Address,
        room: &str,
    ) -> Result<(), IndexError> {
        with_retry(|| self.remove_entry("wallet_rooms", "wallet", "rooms", wallet.as_str(), room))
            .await?;
        with_retry(|| {
            self.remove_entry("room_wallets", "room_code", "wallets", room, wallet.as_str())
        })
        .await?;
        debug!(wallet = %wallet, room, "index: unlinked");
        Ok(())
    }

    /// Rooms currently tracking `wallet`; empty set if unknown.
    pub async fn rooms_for_wallet(&self, wallet: &Address) -> Result<BTreeSet<String>, IndexError> {
        let row = sqlx::query("SELECT rooms FROM wallet_rooms WHERE wallet = ?1")
            .bind(wallet.as_str())
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => parse_set(&row.try_get::<String, _>("rooms")?, wallet.as_str()),
            None => Ok(BTreeSet::new()),
        }
    }

    /// Wallets currently tracked by `room`; empty set if unknown.
    pub async fn wallets_for_room(&self, room: &str) -> Result<BTreeSet<String>, IndexError> {
        let row = sqlx::query("SELECT wallets FROM room_wallets WHERE room_code = ?1")
            .bind(room)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => parse_set(&row.try_get::<String, _>("wallets")?, room),
            None => Ok(BTreeSet::new()),
        }
    }

    /// The union of all tracked wallets — a full scan over non-empty wallet
    /// entries.  Used only by the filter synchronizer; cost is bounded by
    /// distinct tracked wallets, not event volume.
    pub async fn all_tracked_wallets(&self) -> Result<BTreeSet<Address>, IndexError> {
        let rows = sqlx::query("SELECT wallet, rooms FROM wallet_rooms")
            .fetch_all(&self.pool)
            .await?;
        let mut wallets = BTreeSet::new();
        for row in rows {
            let wallet: String = row.try_get("wallet")?;
            let rooms = parse_set(&row.try_get::<String, _>("rooms")?, &wallet)?;
            if rooms.is_empty() {
                continue;
            }
            match Address::parse(&wallet) {
                Ok(addr) => {
                    wallets.insert(addr);
                }
                Err(e) => warn!(wallet, error = %e, "index: skipping malformed wallet key"),
            }
        }
        Ok(wallets)
    }

    /// Remove `room` from every wallet entry that references it and delete
    /// the room's wallet-set entry.  Called on room destruction.
    pub async fn cleanup_room(&self, room: &str) -> Result<(), IndexError> {
        let wallets = self.wallets_for_room(room).await?;
        for wallet in &wallets {
            with_retry(|| self.remove_entry("wallet_rooms", "wallet", "rooms", wallet, room))
                .await?;
        }
        with_retry(|| async {
            sqlx::query("DELETE FROM room_wallets WHERE room_code = ?1")
                .bind(room)
                .execute(&self.pool)
                .await?;
            Ok(())
        })
        .await?;
        debug!(room, wallets = wallets.len(), "index: room cleaned up");
        Ok(())
    }

    // -- Atomic per-key mutations -------------------------------------------
    //
    // Each mutation is one statement over the existing row, never a
    // read-modify-write round trip through Rust, so interleaved writers to
    // the same key cannot overwrite each other's sets.

    async fn add_entry(
        &self,
        table: &str,
        key_col: &str,
        val_col: &str,
        key: &str,
        value: &str,
    ) -> Result<(), sqlx::Error> {
        let now = time::OffsetDateTime::now_utc().unix_timestamp();
        let sql = format!(
            "INSERT INTO {table} ({key_col}, {val_col}, last_updated) \
             VALUES (?1, json_array(?2), ?3) \
             ON CONFLICT({key_col}) DO UPDATE SET \
                 {val_col} = json_insert({table}.{val_col}, '$[#]', ?2), \
                 last_updated = ?3 \
             WHERE NOT EXISTS \
                 (SELECT 1 FROM json_each({table}.{val_col}) WHERE value = ?2)"
        );
        sqlx::query(&sql)
            .bind(key)
            .bind(value)
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn remove_entry(
        &self,
        table: &str,
        key_col: &str,
        val_col: &str,
        key: &str,
        value: &str,
    ) -> Result<(), sqlx::Error> {
        let now = time::OffsetDateTime::now_utc().unix_timestamp();
        let update = format!(
            "UPDATE {table} SET \
                 {val_col} = (SELECT COALESCE(json_group_array(value), '[]') \
                              FROM json_each({val_col}) WHERE value <> ?2), \
                 last_updated = ?3 \
             WHERE {key_col} = ?1 \
               AND EXISTS (SELECT 1 FROM json_each({val_col}) WHERE value = ?2)"
        );
        sqlx::query(&update)
            .bind(key)
            .bind(value)
            .bind(now)
            .execute(&self.pool)
            .await?;
        // An entry whose set just became empty is dropped; a value added in
        // between keeps the row alive.
        let delete = format!(
            "DELETE FROM {table} WHERE {key_col} = ?1 AND json_array_length({val_col}) = 0"
        );
        sqlx::query(&delete).bind(key).execute(&self.pool).await?;
        Ok(())
    }
}

/// Parse a JSON array column into a string set.
fn parse_set(json: &str, key: &str) -> Result<BTreeSet<String>, IndexError> {
    serde_json::from_str(json).map_err(|source| IndexError::Corrupt {
        key: key.to_owned(),
        source,
    })
}

/// Retry an idempotent write with capped exponential backoff.
async fn with_retry<F, Fut>(mut op: F) -> Result<(), IndexError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), sqlx::Error>>,
{
    let mut attempt = 0u32;
    loop {
        match op().await {
            Ok(()) => return Ok(()),
            Err(e) if attempt + 1 < WRITE_RETRIES => {
                let delay = RETRY_BASE_DELAY * 2u32.pow(attempt);
                warn!(error = %e, attempt, "index write failed, retrying");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }
}
