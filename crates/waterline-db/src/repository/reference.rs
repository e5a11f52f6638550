//! # Reference Table Repository
//!
//! Owns the mirrored reference tables. Two write patterns exist:
//!
//! - **Full-replace**: delete all existing rows, insert the freshly fetched
//!   set, as one transaction. Used by every entity except service zones.
//!   The transaction closes the window where a table would be momentarily
//!   empty between the delete and the inserts.
//! - **Upsert**: INSERT OR REPLACE by id, no delete. Used for service
//!   zones, which are fetched per area and accumulate across runs.
//!
//! Both return the number of rows written so the reconciler can keep its
//! running total.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use waterline_core::{
    LookupItem, LookupKind, MeterBook, MeterSheet, ReadingAnomaly, ReadingAnomalyCase, ReadingCase,
    ServiceArea, ServiceZone, TaskAction,
};

/// Maps a lookup kind to its table. All simple lookups share the
/// (id, name) shape, so one pair of replace/list methods serves all seven.
fn lookup_table(kind: LookupKind) -> &'static str {
    match kind {
        LookupKind::TaskType => "task_types",
        LookupKind::AccountType => "account_types",
        LookupKind::TariffChargeCategory => "tariff_charge_categories",
        LookupKind::MaterialPipeline => "material_pipelines",
        LookupKind::MeterSize => "meter_sizes",
        LookupKind::TariffCategory => "tariff_categories",
        LookupKind::IncidentType => "incident_types",
    }
}

/// Repository for the mirrored reference tables.
#[derive(Debug, Clone)]
pub struct ReferenceRepository {
    pool: SqlitePool,
}

impl ReferenceRepository {
    /// Creates a new ReferenceRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ReferenceRepository { pool }
    }

    // =========================================================================
    // Service areas
    // =========================================================================

    /// Replaces the service_areas table with the given snapshot.
    pub async fn replace_service_areas(&self, rows: &[ServiceArea]) -> DbResult<u64> {
        debug!(count = rows.len(), "Replacing service areas");

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
        sqlx::query("DELETE FROM service_areas")
            .execute(&mut *tx)
            .await?;
        for row in rows {
            sqlx::query("INSERT INTO service_areas (id, name) VALUES (?1, ?2)")
                .bind(row.id)
                .bind(&row.name)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        Ok(rows.len() as u64)
    }

    /// Lists all service areas.
    pub async fn service_areas(&self) -> DbResult<Vec<ServiceArea>> {
        let rows = sqlx::query_as::<_, ServiceArea>(
            "SELECT id, name FROM service_areas ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    // =========================================================================
    // Service zones (upsert, never delete)
    // =========================================================================

    /// Upserts the given zones by id.
    ///
    /// Zones accumulate across runs: a zone that disappears upstream stays
    /// in the table until an operator clears local data.
    pub async fn upsert_service_zones(&self, rows: &[ServiceZone]) -> DbResult<u64> {
        debug!(count = rows.len(), "Upserting service zones");

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
        for row in rows {
            sqlx::query(
                "INSERT OR REPLACE INTO service_zones (id, name, parent_id) VALUES (?1, ?2, ?3)",
            )
            .bind(row.id)
            .bind(&row.name)
            .bind(row.parent_id)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        Ok(rows.len() as u64)
    }

    /// Lists all service zones.
    pub async fn service_zones(&self) -> DbResult<Vec<ServiceZone>> {
        let rows = sqlx::query_as::<_, ServiceZone>(
            "SELECT id, name, parent_id FROM service_zones ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Returns the full accumulated set of zone ids.
    ///
    /// The reconciler fetches meter books for this set, not just the zones
    /// written in the current run.
    pub async fn zone_ids(&self) -> DbResult<Vec<i64>> {
        let ids = sqlx::query_scalar::<_, i64>("SELECT id FROM service_zones ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }

    // =========================================================================
    // Meter books and sheets
    // =========================================================================

    /// Replaces the meter_books table with the given snapshot.
    pub async fn replace_meter_books(&self, rows: &[MeterBook]) -> DbResult<u64> {
        debug!(count = rows.len(), "Replacing meter books");

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
        sqlx::query("DELETE FROM meter_books")
            .execute(&mut *tx)
            .await?;
        for row in rows {
            sqlx::query(
                "INSERT INTO meter_books (id, name, service_area_id) VALUES (?1, ?2, ?3)",
            )
            .bind(row.id)
            .bind(&row.name)
            .bind(row.service_area_id)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        Ok(rows.len() as u64)
    }

    /// Lists all meter books.
    pub async fn meter_books(&self) -> DbResult<Vec<MeterBook>> {
        let rows = sqlx::query_as::<_, MeterBook>(
            "SELECT id, name, service_area_id FROM meter_books ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Replaces the meter_sheets table with the given snapshot.
    pub async fn replace_meter_sheets(&self, rows: &[MeterSheet]) -> DbResult<u64> {
        debug!(count = rows.len(), "Replacing meter sheets");

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
        sqlx::query("DELETE FROM meter_sheets")
            .execute(&mut *tx)
            .await?;
        for row in rows {
            sqlx::query("INSERT INTO meter_sheets (id, name, meter_book_id) VALUES (?1, ?2, ?3)")
                .bind(row.id)
                .bind(&row.name)
                .bind(row.meter_book_id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        Ok(rows.len() as u64)
    }

    /// Lists all meter sheets.
    pub async fn meter_sheets(&self) -> DbResult<Vec<MeterSheet>> {
        let rows = sqlx::query_as::<_, MeterSheet>(
            "SELECT id, name, meter_book_id FROM meter_sheets ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    // =========================================================================
    // Simple id/name lookups
    // =========================================================================

    /// Replaces one of the simple lookup tables with the given snapshot.
    pub async fn replace_lookup(&self, kind: LookupKind, rows: &[LookupItem]) -> DbResult<u64> {
        let table = lookup_table(kind);
        debug!(table, count = rows.len(), "Replacing lookup table");

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
        sqlx::query(&format!("DELETE FROM {table}"))
            .execute(&mut *tx)
            .await?;
        for row in rows {
            sqlx::query(&format!("INSERT INTO {table} (id, name) VALUES (?1, ?2)"))
                .bind(row.id)
                .bind(&row.name)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        Ok(rows.len() as u64)
    }

    /// Lists one of the simple lookup tables.
    pub async fn lookup(&self, kind: LookupKind) -> DbResult<Vec<LookupItem>> {
        let table = lookup_table(kind);
        let rows =
            sqlx::query_as::<_, LookupItem>(&format!("SELECT id, name FROM {table} ORDER BY id"))
                .fetch_all(&self.pool)
                .await?;
        Ok(rows)
    }

    // =========================================================================
    // Structured lookups
    // =========================================================================

    /// Replaces the task_actions table with the given snapshot.
    pub async fn replace_task_actions(&self, rows: &[TaskAction]) -> DbResult<u64> {
        debug!(count = rows.len(), "Replacing task actions");

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
        sqlx::query("DELETE FROM task_actions")
            .execute(&mut *tx)
            .await?;
        for row in rows {
            sqlx::query("INSERT INTO task_actions (id, name, task_type_id) VALUES (?1, ?2, ?3)")
                .bind(row.id)
                .bind(&row.name)
                .bind(row.task_type_id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        Ok(rows.len() as u64)
    }

    /// Replaces the reading_cases table with the given snapshot.
    pub async fn replace_reading_cases(&self, rows: &[ReadingCase]) -> DbResult<u64> {
        debug!(count = rows.len(), "Replacing reading cases");

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
        sqlx::query("DELETE FROM reading_cases")
            .execute(&mut *tx)
            .await?;
        for row in rows {
            sqlx::query(
                "INSERT INTO reading_cases (id, name, has_reading, has_image) \
                 VALUES (?1, ?2, ?3, ?4)",
            )
            .bind(row.id)
            .bind(&row.name)
            .bind(row.has_reading)
            .bind(row.has_image)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        Ok(rows.len() as u64)
    }

    /// Lists all reading cases.
    pub async fn reading_cases(&self) -> DbResult<Vec<ReadingCase>> {
        let rows = sqlx::query_as::<_, ReadingCase>(
            "SELECT id, name, has_reading, has_image FROM reading_cases ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Replaces the reading_anomalies table with the given snapshot.
    pub async fn replace_reading_anomalies(&self, rows: &[ReadingAnomaly]) -> DbResult<u64> {
        debug!(count = rows.len(), "Replacing reading anomalies");

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
        sqlx::query("DELETE FROM reading_anomalies")
            .execute(&mut *tx)
            .await?;
        for row in rows {
            sqlx::query(
                "INSERT INTO reading_anomalies (id, name, description) VALUES (?1, ?2, ?3)",
            )
            .bind(row.id)
            .bind(&row.name)
            .bind(&row.description)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        Ok(rows.len() as u64)
    }

    /// Lists all reading anomalies.
    pub async fn reading_anomalies(&self) -> DbResult<Vec<ReadingAnomaly>> {
        let rows = sqlx::query_as::<_, ReadingAnomaly>(
            "SELECT id, name, description FROM reading_anomalies ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Replaces the reading_anomaly_cases table with the given snapshot.
    pub async fn replace_reading_anomaly_cases(
        &self,
        rows: &[ReadingAnomalyCase],
    ) -> DbResult<u64> {
        debug!(count = rows.len(), "Replacing reading anomaly cases");

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
        sqlx::query("DELETE FROM reading_anomaly_cases")
            .execute(&mut *tx)
            .await?;
        for row in rows {
            sqlx::query(
                "INSERT INTO reading_anomaly_cases (id, name, case_id) VALUES (?1, ?2, ?3)",
            )
            .bind(row.id)
            .bind(&row.name)
            .bind(row.case_id)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        Ok(rows.len() as u64)
    }

    /// Lists reading anomaly cases, optionally filtered by owning case.
    pub async fn reading_anomaly_cases(
        &self,
        case_id: Option<i64>,
    ) -> DbResult<Vec<ReadingAnomalyCase>> {
        let rows = match case_id {
            Some(case_id) => {
                sqlx::query_as::<_, ReadingAnomalyCase>(
                    "SELECT id, name, case_id FROM reading_anomaly_cases \
                     WHERE case_id = ?1 ORDER BY id",
                )
                .bind(case_id)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, ReadingAnomalyCase>(
                    "SELECT id, name, case_id FROM reading_anomaly_cases ORDER BY id",
                )
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(rows)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn area(id: i64, name: &str) -> ServiceArea {
        ServiceArea {
            id,
            name: name.to_string(),
        }
    }

    #[tokio::test]
    async fn test_full_replace_discards_previous_snapshot() {
        let db = test_db().await;
        let repo = db.reference();

        let written = repo
            .replace_service_areas(&[area(1, "Central"), area(2, "Harbour")])
            .await
            .unwrap();
        assert_eq!(written, 2);

        // A second snapshot fully replaces the first, including removals.
        repo.replace_service_areas(&[area(3, "Hillside")])
            .await
            .unwrap();

        let areas = repo.service_areas().await.unwrap();
        assert_eq!(areas.len(), 1);
        assert_eq!(areas[0].id, 3);
    }

    #[tokio::test]
    async fn test_zones_accumulate_across_upserts() {
        let db = test_db().await;
        let repo = db.reference();

        let zone = |id, parent_id| ServiceZone {
            id,
            name: format!("Zone {id}"),
            parent_id,
        };

        repo.upsert_service_zones(&[zone(10, 1), zone(11, 1)])
            .await
            .unwrap();
        // A later run for another area adds zones without clearing.
        repo.upsert_service_zones(&[zone(20, 2), zone(10, 1)])
            .await
            .unwrap();

        assert_eq!(repo.zone_ids().await.unwrap(), vec![10, 11, 20]);
    }

    #[tokio::test]
    async fn test_lookup_replace_and_list() {
        let db = test_db().await;
        let repo = db.reference();

        let item = |id, name: &str| LookupItem {
            id,
            name: name.to_string(),
        };

        repo.replace_lookup(
            LookupKind::IncidentType,
            &[item(1, "Burst pipe"), item(2, "Illegal connection")],
        )
        .await
        .unwrap();

        // Other lookup tables are unaffected.
        assert!(repo.lookup(LookupKind::MeterSize).await.unwrap().is_empty());

        repo.replace_lookup(LookupKind::IncidentType, &[item(3, "Leak")])
            .await
            .unwrap();
        let types = repo.lookup(LookupKind::IncidentType).await.unwrap();
        assert_eq!(types.len(), 1);
        assert_eq!(types[0].name, "Leak");
    }

    #[tokio::test]
    async fn test_reading_case_flags_round_trip() {
        let db = test_db().await;
        let repo = db.reference();

        repo.replace_reading_cases(&[ReadingCase {
            id: 1,
            name: "Normal".to_string(),
            has_reading: true,
            has_image: false,
        }])
        .await
        .unwrap();

        let cases = repo.reading_cases().await.unwrap();
        assert!(cases[0].has_reading);
        assert!(!cases[0].has_image);
    }

    #[tokio::test]
    async fn test_anomaly_case_filter() {
        let db = test_db().await;
        let repo = db.reference();

        let case = |id, case_id| ReadingAnomalyCase {
            id,
            name: format!("Anomaly {id}"),
            case_id,
        };

        repo.replace_reading_anomaly_cases(&[case(1, 5), case(2, 5), case(3, 7)])
            .await
            .unwrap();

        assert_eq!(repo.reading_anomaly_cases(None).await.unwrap().len(), 3);
        assert_eq!(repo.reading_anomaly_cases(Some(5)).await.unwrap().len(), 2);
        assert!(repo
            .reading_anomaly_cases(Some(9))
            .await
            .unwrap()
            .is_empty());
    }
}
