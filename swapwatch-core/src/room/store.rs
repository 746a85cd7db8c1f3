//! Durable room state.
//!
//! Membership and config survive actor restarts; sessions and presence are
//! never written here.

use sqlx::SqlitePool;
use swapwatch_sdk::objects::Address;

/// One row of the `rooms` table.  Timestamps are unix seconds.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct RoomRecord {
    pub code: String,
    pub notify_threshold: Option<f64>,
    pub notify_target: Option<String>,
    pub created_at: i64,
    pub expires_at: i64,
}

/// One row of the `room_members` table.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct MemberRecord {
    pub address: String,
    pub label: Option<String>,
}

/// Pool-backed accessor for room persistence.
#[derive(Clone)]
pub struct RoomStore {
    pool: SqlitePool,
}

impl RoomStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn insert_room(&self, record: &RoomRecord) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO rooms (code, notify_threshold, notify_target, created_at, expires_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&record.code)
        .bind(record.notify_threshold)
        .bind(&record.notify_target)
        .bind(record.created_at)
        .bind(record.expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn load_room(&self, code: &str) -> Result<Option<RoomRecord>, sqlx::Error> {
        sqlx::query_as::<_, RoomRecord>(
            "SELECT code, notify_threshold, notify_target, created_at, expires_at \
             FROM rooms WHERE code = ?1",
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn load_members(&self, code: &str) -> Result<Vec<MemberRecord>, sqlx::Error> {
        sqlx::query_as::<_, MemberRecord>(
            "SELECT address, label FROM room_members WHERE room_code = ?1 ORDER BY added_at",
        )
        .bind(code)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn insert_member(
        &self,
        code: &str,
        address: &Address,
        label: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        let now = time::OffsetDateTime::now_utc().unix_timestamp();
        sqlx::query(
            "INSERT INTO room_members (room_code, address, label, added_at) \
             VALUES (?1, ?2, ?3, ?4) \
             ON CONFLICT(room_code, address) DO UPDATE SET label = excluded.label",
        )
        .bind(code)
        .bind(address.as_str())
        .bind(label)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn delete_member(&self, code: &str, address: &Address) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM room_members WHERE room_code = ?1 AND address = ?2")
            .bind(code)
            .bind(address.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn update_member_label(
        &self,
        code: &str,
        address: &Address,
        label: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE room_members SET label = ?3 WHERE room_code = ?1 AND address = ?2")
            .bind(code)
            .bind(address.as_str())
            .bind(label)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn update_config(
        &self,
        code: &str,
        notify_threshold: Option<f64>,
        notify_target: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE rooms SET notify_threshold = ?2, notify_target = ?3 WHERE code = ?1")
            .bind(code)
            .bind(notify_threshold)
            .bind(notify_target)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn update_expiry(&self, code: &str, expires_at: i64) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE rooms SET expires_at = ?2 WHERE code = ?1")
            .bind(code)
            .bind(expires_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Remove a room's row and all of its membership rows.
    pub async fn delete_room(&self, code: &str) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM room_members WHERE room_code = ?1")
            .bind(code)
            .execute(&self.pool)
            .await?;
        sqlx::query("DELETE FROM rooms WHERE code = ?1")
            .bind(code)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
