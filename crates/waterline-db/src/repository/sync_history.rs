//! # Sync History Repository
//!
//! The append-only audit trail of the reconciler. Exactly one row is
//! written per cascade invocation, success or failure; rows are never
//! mutated or deleted. Operators see the most recent entries through
//! `GET /api/sync/history`.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use waterline_core::SyncRecord;

/// Repository for the sync audit trail.
#[derive(Debug, Clone)]
pub struct SyncHistoryRepository {
    pool: SqlitePool,
}

impl SyncHistoryRepository {
    /// Creates a new SyncHistoryRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SyncHistoryRepository { pool }
    }

    /// Appends one audit record.
    ///
    /// ## Arguments
    /// * `sync_type` - Audit label (e.g. [`waterline_core::SYNC_TYPE_COMPLETE`])
    /// * `records_synced` - Cumulative row count of the run (0 on failure)
    /// * `is_success` - Whether the cascade completed without a fatal error
    /// * `error_message` - The fatal error's message, if any
    pub async fn record(
        &self,
        sync_type: &str,
        records_synced: i64,
        is_success: bool,
        error_message: Option<&str>,
    ) -> DbResult<()> {
        let now = Utc::now();

        debug!(
            sync_type = %sync_type,
            records_synced,
            is_success,
            "Recording sync outcome"
        );

        sqlx::query(
            "INSERT INTO sync_history (sync_type, records_synced, is_success, error_message, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(sync_type)
        .bind(records_synced)
        .bind(is_success)
        .bind(error_message)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Returns the most recent audit records, newest first.
    pub async fn recent(&self, limit: u32) -> DbResult<Vec<SyncRecord>> {
        let records = sqlx::query_as::<_, SyncRecord>(
            "SELECT id, sync_type, records_synced, is_success, error_message, created_at \
             FROM sync_history \
             ORDER BY created_at DESC, id DESC \
             LIMIT ?1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use waterline_core::SYNC_TYPE_COMPLETE;

    #[tokio::test]
    async fn test_record_and_recent_ordering() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.sync_history();

        repo.record(SYNC_TYPE_COMPLETE, 42, true, None)
            .await
            .unwrap();
        repo.record(SYNC_TYPE_COMPLETE, 0, false, Some("upstream sent garbage"))
            .await
            .unwrap();

        let recent = repo.recent(50).await.unwrap();
        assert_eq!(recent.len(), 2);
        // Newest first
        assert!(!recent[0].is_success);
        assert_eq!(recent[0].records_synced, 0);
        assert_eq!(
            recent[0].error_message.as_deref(),
            Some("upstream sent garbage")
        );
        assert!(recent[1].is_success);
        assert_eq!(recent[1].records_synced, 42);
    }

    #[tokio::test]
    async fn test_recent_honors_limit() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.sync_history();

        for i in 0..5 {
            repo.record(SYNC_TYPE_COMPLETE, i, true, None).await.unwrap();
        }

        assert_eq!(repo.recent(3).await.unwrap().len(), 3);
    }
}
