//! # Reference-Data Reconciler
//!
//! Orchestrates the full sync cascade:
//!
//! ```text
//!  1. service areas        full-replace, keyed by the requesting user
//!  2. service zones        upsert per area, accumulate across runs
//!  3. meter books          full-replace, for ALL accumulated zone ids
//!  4. meter sheets         full-replace, for this run's book ids
//!  5. eleven lookups       full-replace each, independent of 1-4
//! ```
//!
//! Steps run strictly in order. Each step is fetch → validate → write; an
//! upstream with no data for a step contributes zero records and leaves
//! that table's previous snapshot untouched (only a present envelope key
//! replaces, even with an empty set), while a wrong-shaped payload aborts
//! the run. Completed steps are never rolled back on a later failure.
//! Exactly one audit row is written per invocation.
//!
//! Concurrent invocations are not locked against each other; callers that
//! need serialization must provide it.

use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{error, info, instrument, warn};

use waterline_core::{
    CoreError, LookupItem, LookupKind, MeterBook, MeterSheet, ReadingAnomaly, ReadingAnomalyCase,
    ReadingCase, ServiceArea, ServiceZone, TaskAction, SYNC_TYPE_COMPLETE,
};
use waterline_db::Database;

use crate::error::{SyncError, SyncResult};
use crate::schema::{
    AnomalyCaseRecord, AnomalyRecord, AreaRecord, BookRecord, NamedRecord, ReadingCaseRecord,
    SheetRecord, TariffCategoryRecord, TaskActionRecord, ZoneRecord,
};
use crate::upstream::UpstreamApi;

// Upstream endpoints, one per cascade step.
const PATH_AREAS: &str = "api_get/get_service_areas";
const PATH_ZONES: &str = "api_get/get_service_zones";
const PATH_BOOKS: &str = "api_get/get_meter_books";
const PATH_SHEETS: &str = "api_get/get_meter_sheets";
const PATH_TASK_TYPES: &str = "technician/get_task_types";
const PATH_TASK_ACTIONS: &str = "technician/get_task_actions";
const PATH_ACCOUNT_TYPES: &str = "api_get/get_account_types";
const PATH_TARIFF_CHARGE_CATEGORIES: &str = "api_get/get_tariff_charge_categories";
const PATH_MATERIAL_PIPELINES: &str = "api_get/get_material_pipelines";
const PATH_METER_SIZES: &str = "api_get/get_meter_sizes";
const PATH_TARIFF_CATEGORIES: &str = "api_get/get_tariff_categories";
const PATH_READING_CASES: &str = "meter_reader/get_reading_cases";
const PATH_READING_ANOMALIES: &str = "meter_reader/get_reading_anom";
const PATH_READING_ANOMALY_CASES: &str = "meter_reader/get_reading_anom_cases";
const PATH_INCIDENTS: &str = "api_get/get_incidents";

/// Audit messages longer than this are truncated before storage.
const ERROR_MESSAGE_LIMIT: usize = 500;

/// Extracts and validates the records under `key` in an envelope payload.
///
/// Returns `None` when the payload is absent or the envelope lacks the
/// key: the upstream produced no data for this step, and the previous
/// snapshot must be left untouched. Returns `Some` (possibly empty) when
/// the key is present: that IS the upstream's current set, and an empty
/// one replaces the table with nothing. Records that fail to deserialize
/// or convert are schema violations.
fn validate<R, D>(
    entity: &'static str,
    key: &str,
    payload: Option<Value>,
) -> SyncResult<Option<Vec<D>>>
where
    R: DeserializeOwned,
    D: TryFrom<R, Error = CoreError>,
{
    let records = match payload.as_ref().and_then(|v| v.get(key)) {
        Some(records) => records.clone(),
        None => return Ok(None),
    };

    let raws: Vec<R> = serde_json::from_value(records).map_err(|e| SyncError::Schema {
        entity,
        reason: e.to_string(),
    })?;

    raws.into_iter()
        .map(|raw| D::try_from(raw).map_err(|e| SyncError::schema(entity, e)))
        .collect::<SyncResult<Vec<D>>>()
        .map(Some)
}

fn truncate_message(message: &str) -> String {
    if message.chars().count() <= ERROR_MESSAGE_LIMIT {
        return message.to_string();
    }
    message.chars().take(ERROR_MESSAGE_LIMIT).collect()
}

/// The reconciler: runs the cascade against an upstream and a local store.
#[derive(Debug, Clone)]
pub struct Reconciler<U> {
    db: Database,
    upstream: U,
}

impl<U: UpstreamApi> Reconciler<U> {
    /// Creates a new Reconciler.
    pub fn new(db: Database, upstream: U) -> Self {
        Reconciler { db, upstream }
    }

    /// Runs the full cascade for a technician and records the outcome.
    ///
    /// Returns the cumulative number of rows written. On a fatal error the
    /// audit row carries zero records and the truncated error message;
    /// reference rows written by completed steps are kept.
    #[instrument(skip(self, token))]
    pub async fn run_full_sync(&self, user_id: i64, token: &str) -> SyncResult<u64> {
        match self.run_cascade(user_id, token).await {
            Ok(total) => {
                self.db
                    .sync_history()
                    .record(SYNC_TYPE_COMPLETE, total as i64, true, None)
                    .await?;
                info!(records = total, "Sync completed");
                Ok(total)
            }
            Err(err) => {
                let message = truncate_message(&err.to_string());
                if let Err(audit_err) = self
                    .db
                    .sync_history()
                    .record(SYNC_TYPE_COMPLETE, 0, false, Some(&message))
                    .await
                {
                    error!(error = %audit_err, "Failed to record sync failure");
                }
                error!(error = %err, "Sync aborted");
                Err(err)
            }
        }
    }

    async fn run_cascade(&self, user_id: i64, token: &str) -> SyncResult<u64> {
        let reference = self.db.reference();
        let mut total: u64 = 0;

        // Step 1: service areas, scoped to the requesting user. No data
        // means the previous snapshot stays; only a present key replaces.
        let payload = self
            .upstream
            .fetch(
                PATH_AREAS,
                token,
                Some(json!({ "user_id": user_id.to_string() })),
            )
            .await?;
        let areas: Vec<ServiceArea> =
            match validate::<AreaRecord, _>("service area", "service_areas", payload)? {
                Some(areas) => {
                    total += reference.replace_service_areas(&areas).await?;
                    info!(count = areas.len(), "Service areas synced");
                    areas
                }
                None => {
                    warn!("No service areas from upstream, keeping previous snapshot");
                    Vec::new()
                }
            };

        // Step 2: zones per area. A zone that vanishes upstream is kept;
        // the table only grows.
        for area in &areas {
            let payload = self
                .upstream
                .fetch(
                    PATH_ZONES,
                    token,
                    Some(json!({ "parent_id": area.id.to_string() })),
                )
                .await?;
            if let Some(zones) =
                validate::<ZoneRecord, ServiceZone>("service zone", "service_zones", payload)?
            {
                total += reference.upsert_service_zones(&zones).await?;
            }
        }

        // Steps 3 and 4: books for every zone id ever seen, then sheets for
        // this run's books. No zones means neither step runs.
        let zone_ids = reference.zone_ids().await?;
        if zone_ids.is_empty() {
            warn!("No service zones on record, skipping meter books and sheets");
        } else {
            let payload = self
                .upstream
                .fetch(PATH_BOOKS, token, Some(json!({ "zone_ids": zone_ids })))
                .await?;
            match validate::<BookRecord, MeterBook>("meter book", "meter_books", payload)? {
                None => warn!("No meter books from upstream, keeping previous snapshot"),
                Some(books) => {
                    total += reference.replace_meter_books(&books).await?;
                    info!(count = books.len(), "Meter books synced");

                    if books.is_empty() {
                        warn!("No meter books returned, skipping meter sheets");
                    } else {
                        let book_ids: Vec<i64> = books.iter().map(|b| b.id).collect();
                        let payload = self
                            .upstream
                            .fetch(PATH_SHEETS, token, Some(json!({ "book_ids": book_ids })))
                            .await?;
                        match validate::<SheetRecord, MeterSheet>(
                            "meter sheet",
                            "meter_sheets",
                            payload,
                        )? {
                            None => {
                                warn!("No meter sheets from upstream, keeping previous snapshot")
                            }
                            Some(sheets) => {
                                total += reference.replace_meter_sheets(&sheets).await?;
                                info!(count = sheets.len(), "Meter sheets synced");
                            }
                        }
                    }
                }
            }
        }

        // Step 5: the independent lookups, still strictly in order.
        total += self
            .sync_lookup(token, PATH_TASK_TYPES, "field_task_types", LookupKind::TaskType)
            .await?;
        total += self.sync_task_actions(token).await?;
        total += self
            .sync_lookup(token, PATH_ACCOUNT_TYPES, "account_types", LookupKind::AccountType)
            .await?;
        total += self
            .sync_lookup(
                token,
                PATH_TARIFF_CHARGE_CATEGORIES,
                "tariff_charge_categories",
                LookupKind::TariffChargeCategory,
            )
            .await?;
        total += self
            .sync_lookup(
                token,
                PATH_MATERIAL_PIPELINES,
                "material_pipelines",
                LookupKind::MaterialPipeline,
            )
            .await?;
        total += self
            .sync_lookup(token, PATH_METER_SIZES, "meter_sizes", LookupKind::MeterSize)
            .await?;
        total += self.sync_tariff_categories(token).await?;
        total += self.sync_reading_cases(token).await?;
        total += self.sync_reading_anomalies(token).await?;
        total += self.sync_reading_anomaly_cases(token).await?;
        total += self
            .sync_lookup(token, PATH_INCIDENTS, "report_incidents", LookupKind::IncidentType)
            .await?;

        Ok(total)
    }

    /// Syncs one of the simple id/name lookup tables. No data from the
    /// upstream leaves the previous snapshot in place.
    async fn sync_lookup(
        &self,
        token: &str,
        path: &'static str,
        key: &'static str,
        kind: LookupKind,
    ) -> SyncResult<u64> {
        let payload = self.upstream.fetch(path, token, None).await?;
        let Some(rows) = validate::<NamedRecord, LookupItem>(kind.entity(), key, payload)? else {
            return Ok(0);
        };
        Ok(self.db.reference().replace_lookup(kind, &rows).await?)
    }

    async fn sync_task_actions(&self, token: &str) -> SyncResult<u64> {
        let payload = self.upstream.fetch(PATH_TASK_ACTIONS, token, None).await?;
        let Some(rows) = validate::<TaskActionRecord, TaskAction>(
            "task action",
            "field_task_actions",
            payload,
        )?
        else {
            return Ok(0);
        };
        Ok(self.db.reference().replace_task_actions(&rows).await?)
    }

    async fn sync_tariff_categories(&self, token: &str) -> SyncResult<u64> {
        let payload = self
            .upstream
            .fetch(PATH_TARIFF_CATEGORIES, token, None)
            .await?;
        let Some(rows) = validate::<TariffCategoryRecord, LookupItem>(
            LookupKind::TariffCategory.entity(),
            "tariff_categories",
            payload,
        )?
        else {
            return Ok(0);
        };
        Ok(self
            .db
            .reference()
            .replace_lookup(LookupKind::TariffCategory, &rows)
            .await?)
    }

    async fn sync_reading_cases(&self, token: &str) -> SyncResult<u64> {
        let payload = self.upstream.fetch(PATH_READING_CASES, token, None).await?;
        let Some(rows) =
            validate::<ReadingCaseRecord, ReadingCase>("reading case", "reading_cases", payload)?
        else {
            return Ok(0);
        };
        Ok(self.db.reference().replace_reading_cases(&rows).await?)
    }

    async fn sync_reading_anomalies(&self, token: &str) -> SyncResult<u64> {
        let payload = self
            .upstream
            .fetch(PATH_READING_ANOMALIES, token, None)
            .await?;
        let Some(rows) =
            validate::<AnomalyRecord, ReadingAnomaly>("reading anomaly", "reading_anom", payload)?
        else {
            return Ok(0);
        };
        Ok(self.db.reference().replace_reading_anomalies(&rows).await?)
    }

    async fn sync_reading_anomaly_cases(&self, token: &str) -> SyncResult<u64> {
        let payload = self
            .upstream
            .fetch(PATH_READING_ANOMALY_CASES, token, None)
            .await?;
        let Some(rows) = validate::<AnomalyCaseRecord, ReadingAnomalyCase>(
            "reading anomaly case",
            "reading_anom_cases",
            payload,
        )?
        else {
            return Ok(0);
        };
        Ok(self
            .db
            .reference()
            .replace_reading_anomaly_cases(&rows)
            .await?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use waterline_db::{Database, DbConfig};

    /// Scripted upstream. Responses are keyed by path; the zone endpoint is
    /// keyed `path?parent_id=N` so each area can get its own payload. A
    /// missing key behaves like an unreachable endpoint.
    #[derive(Default)]
    struct StubUpstream {
        responses: HashMap<String, Value>,
        calls: Mutex<Vec<String>>,
    }

    impl StubUpstream {
        fn respond(mut self, key: &str, value: Value) -> Self {
            self.responses.insert(key.to_string(), value);
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl UpstreamApi for StubUpstream {
        async fn fetch(
            &self,
            path: &str,
            _token: &str,
            body: Option<Value>,
        ) -> SyncResult<Option<Value>> {
            let key = match body.as_ref().and_then(|b| b.get("parent_id")) {
                Some(Value::String(parent)) => format!("{path}?parent_id={parent}"),
                _ => path.to_string(),
            };
            self.calls.lock().unwrap().push(key.clone());
            Ok(self.responses.get(&key).cloned())
        }
    }

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn named(id: &str, name: &str) -> Value {
        json!({ "id": id, "name": name })
    }

    #[tokio::test]
    async fn test_cascade_counts_and_audits_success() {
        let upstream = StubUpstream::default()
            .respond(
                PATH_AREAS,
                json!({ "service_areas": [named("1", "Central"), named("2", "Harbour")] }),
            )
            .respond(
                "api_get/get_service_zones?parent_id=1",
                json!({ "service_zones": [
                    { "id": "10", "name": "North", "parent_id": 1 },
                    { "id": "11", "name": "South", "parent_id": 1 }
                ]}),
            )
            .respond(
                "api_get/get_service_zones?parent_id=2",
                json!({ "service_zones": [
                    { "id": "20", "name": "Docks", "parent_id": 2 }
                ]}),
            )
            .respond(
                PATH_BOOKS,
                json!({ "meter_books": [
                    { "id": "100", "name": "Book A", "service_areas_id": 1 }
                ]}),
            )
            .respond(
                PATH_SHEETS,
                json!({ "meter_sheets": [
                    { "id": "1000", "name": "Sheet 1", "meter_books_id": 100 },
                    { "id": "1001", "name": "Sheet 2", "meter_books_id": 100 }
                ]}),
            )
            .respond(PATH_INCIDENTS, json!({ "report_incidents": [named("5", "Burst pipe")] }));

        let db = test_db().await;
        let reconciler = Reconciler::new(db.clone(), upstream);

        // 2 areas + 3 zones + 1 book + 2 sheets + 1 incident type = 9
        let total = reconciler.run_full_sync(7, "tok").await.unwrap();
        assert_eq!(total, 9);

        let history = db.sync_history().recent(50).await.unwrap();
        assert_eq!(history.len(), 1);
        assert!(history[0].is_success);
        assert_eq!(history[0].records_synced, 9);
        assert!(history[0].error_message.is_none());

        assert_eq!(db.reference().zone_ids().await.unwrap(), vec![10, 11, 20]);
        assert_eq!(db.reference().meter_sheets().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_three_areas_two_zones_each_no_books() {
        let mut upstream = StubUpstream::default().respond(
            PATH_AREAS,
            json!({ "service_areas": [
                named("1", "Central"), named("2", "Harbour"), named("3", "Hillside")
            ]}),
        );
        for area in 1i64..=3 {
            upstream = upstream.respond(
                &format!("api_get/get_service_zones?parent_id={area}"),
                json!({ "service_zones": [
                    { "id": (area * 10).to_string(), "name": "A", "parent_id": area },
                    { "id": (area * 10 + 1).to_string(), "name": "B", "parent_id": area }
                ]}),
            );
        }
        let upstream = upstream.respond(PATH_BOOKS, json!({ "meter_books": [] }));

        let db = test_db().await;
        let reconciler = Reconciler::new(db.clone(), upstream);

        // 3 areas + 6 zones + 0 books, no lookups scripted.
        let total = reconciler.run_full_sync(7, "tok").await.unwrap();
        assert_eq!(total, 9);

        assert_eq!(db.reference().service_areas().await.unwrap().len(), 3);
        assert_eq!(db.reference().zone_ids().await.unwrap().len(), 6);
        assert!(db.reference().meter_books().await.unwrap().is_empty());
        assert!(db.reference().meter_sheets().await.unwrap().is_empty());

        let history = db.sync_history().recent(50).await.unwrap();
        assert!(history[0].is_success);
        assert_eq!(history[0].records_synced, 9);
    }

    #[tokio::test]
    async fn test_no_zones_skips_books_and_sheets() {
        let upstream = StubUpstream::default().respond(
            PATH_AREAS,
            json!({ "service_areas": [named("1", "Central")] }),
        );

        let db = test_db().await;
        let reconciler = Reconciler::new(db.clone(), upstream);
        let total = reconciler.run_full_sync(7, "tok").await.unwrap();
        assert_eq!(total, 1);

        let calls = reconciler.upstream.calls();
        assert!(!calls.iter().any(|c| c == PATH_BOOKS));
        assert!(!calls.iter().any(|c| c == PATH_SHEETS));
    }

    #[tokio::test]
    async fn test_empty_books_skips_sheets_but_clears_table() {
        let db = test_db().await;
        // Stale book from a previous run.
        db.reference()
            .replace_meter_books(&[MeterBook {
                id: 999,
                name: "Stale".to_string(),
                service_area_id: 1,
            }])
            .await
            .unwrap();

        let upstream = StubUpstream::default()
            .respond(
                PATH_AREAS,
                json!({ "service_areas": [named("1", "Central")] }),
            )
            .respond(
                "api_get/get_service_zones?parent_id=1",
                json!({ "service_zones": [
                    { "id": "10", "name": "North", "parent_id": 1 }
                ]}),
            )
            .respond(PATH_BOOKS, json!({ "meter_books": [] }));

        let reconciler = Reconciler::new(db.clone(), upstream);
        reconciler.run_full_sync(7, "tok").await.unwrap();

        assert!(db.reference().meter_books().await.unwrap().is_empty());
        let calls = reconciler.upstream.calls();
        assert!(calls.iter().any(|c| c == PATH_BOOKS));
        assert!(!calls.iter().any(|c| c == PATH_SHEETS));
    }

    #[tokio::test]
    async fn test_unreachable_upstream_keeps_previous_snapshot() {
        // Mirror data from an earlier successful run.
        let db = test_db().await;
        let reference = db.reference();
        reference
            .replace_service_areas(&[ServiceArea {
                id: 1,
                name: "Central".to_string(),
            }])
            .await
            .unwrap();
        reference
            .upsert_service_zones(&[ServiceZone {
                id: 10,
                name: "North".to_string(),
                parent_id: 1,
            }])
            .await
            .unwrap();
        reference
            .replace_lookup(
                LookupKind::IncidentType,
                &[LookupItem {
                    id: 5,
                    name: "Burst pipe".to_string(),
                }],
            )
            .await
            .unwrap();

        // Nothing scripted at all: every endpoint acts unreachable. The
        // run succeeds with zero records and no table is touched.
        let reconciler = Reconciler::new(db.clone(), StubUpstream::default());
        let total = reconciler.run_full_sync(7, "tok").await.unwrap();
        assert_eq!(total, 0);

        let history = db.sync_history().recent(50).await.unwrap();
        assert_eq!(history.len(), 1);
        assert!(history[0].is_success);

        assert_eq!(reference.service_areas().await.unwrap().len(), 1);
        assert_eq!(reference.zone_ids().await.unwrap(), vec![10]);
        assert_eq!(
            reference.lookup(LookupKind::IncidentType).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn test_present_but_empty_envelope_clears_table() {
        let db = test_db().await;
        db.reference()
            .replace_lookup(
                LookupKind::MeterSize,
                &[LookupItem {
                    id: 1,
                    name: "15mm".to_string(),
                }],
            )
            .await
            .unwrap();

        // The key is present with an empty set: that IS the upstream's
        // current snapshot, unlike an unreachable endpoint.
        let upstream =
            StubUpstream::default().respond(PATH_METER_SIZES, json!({ "meter_sizes": [] }));
        Reconciler::new(db.clone(), upstream)
            .run_full_sync(7, "tok")
            .await
            .unwrap();

        assert!(db
            .reference()
            .lookup(LookupKind::MeterSize)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_schema_violation_aborts_and_keeps_completed_steps() {
        let upstream = StubUpstream::default()
            .respond(
                PATH_AREAS,
                json!({ "service_areas": [named("1", "Central")] }),
            )
            .respond(
                "api_get/get_service_zones?parent_id=1",
                // parent_id missing: schema violation, fatal.
                json!({ "service_zones": [{ "id": "10", "name": "North" }] }),
            );

        let db = test_db().await;
        let reconciler = Reconciler::new(db.clone(), upstream);

        let err = reconciler.run_full_sync(7, "tok").await.unwrap_err();
        assert!(matches!(err, SyncError::Schema { .. }));

        // Areas from the completed step survive the abort.
        assert_eq!(db.reference().service_areas().await.unwrap().len(), 1);

        let history = db.sync_history().recent(50).await.unwrap();
        assert_eq!(history.len(), 1);
        assert!(!history[0].is_success);
        assert_eq!(history[0].records_synced, 0);
        assert!(history[0].error_message.is_some());
    }

    #[tokio::test]
    async fn test_bad_numeric_id_is_fatal() {
        let upstream = StubUpstream::default().respond(
            PATH_AREAS,
            json!({ "service_areas": [named("not-a-number", "Central")] }),
        );

        let db = test_db().await;
        let reconciler = Reconciler::new(db, StubUpstream::default());
        // Sanity: empty upstream succeeds...
        reconciler.run_full_sync(7, "tok").await.unwrap();

        let db = test_db().await;
        let reconciler = Reconciler::new(db.clone(), upstream);
        // ...but a non-numeric id does not.
        let err = reconciler.run_full_sync(7, "tok").await.unwrap_err();
        assert!(matches!(err, SyncError::Schema { .. }));
    }

    #[tokio::test]
    async fn test_rerun_is_idempotent_for_replace_tables() {
        let upstream = || {
            StubUpstream::default()
                .respond(
                    PATH_AREAS,
                    json!({ "service_areas": [named("1", "Central")] }),
                )
                .respond(
                    "api_get/get_service_zones?parent_id=1",
                    json!({ "service_zones": [
                        { "id": "10", "name": "North", "parent_id": 1 }
                    ]}),
                )
                .respond(
                    PATH_BOOKS,
                    json!({ "meter_books": [
                        { "id": "100", "name": "Book A", "service_areas_id": 1 }
                    ]}),
                )
        };

        let db = test_db().await;
        let first = Reconciler::new(db.clone(), upstream());
        let second = Reconciler::new(db.clone(), upstream());

        let total_a = first.run_full_sync(7, "tok").await.unwrap();
        let total_b = second.run_full_sync(7, "tok").await.unwrap();
        assert_eq!(total_a, total_b);

        assert_eq!(db.reference().service_areas().await.unwrap().len(), 1);
        assert_eq!(db.reference().meter_books().await.unwrap().len(), 1);
        assert_eq!(db.reference().zone_ids().await.unwrap(), vec![10]);
        assert_eq!(db.sync_history().recent(50).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_zones_accumulate_when_area_disappears() {
        let db = test_db().await;

        let first = StubUpstream::default()
            .respond(
                PATH_AREAS,
                json!({ "service_areas": [named("1", "Central"), named("2", "Harbour")] }),
            )
            .respond(
                "api_get/get_service_zones?parent_id=1",
                json!({ "service_zones": [{ "id": "10", "name": "North", "parent_id": 1 }] }),
            )
            .respond(
                "api_get/get_service_zones?parent_id=2",
                json!({ "service_zones": [{ "id": "20", "name": "Docks", "parent_id": 2 }] }),
            );
        Reconciler::new(db.clone(), first)
            .run_full_sync(7, "tok")
            .await
            .unwrap();

        // Area 2 is gone upstream, but its zones stay on record and meter
        // books are still requested for them.
        let second = StubUpstream::default()
            .respond(
                PATH_AREAS,
                json!({ "service_areas": [named("1", "Central")] }),
            )
            .respond(
                "api_get/get_service_zones?parent_id=1",
                json!({ "service_zones": [{ "id": "10", "name": "North", "parent_id": 1 }] }),
            );
        Reconciler::new(db.clone(), second)
            .run_full_sync(7, "tok")
            .await
            .unwrap();

        assert_eq!(db.reference().zone_ids().await.unwrap(), vec![10, 20]);
    }

    #[tokio::test]
    async fn test_lookup_payloads_land_in_their_tables() {
        let upstream = StubUpstream::default()
            .respond(
                PATH_TASK_TYPES,
                json!({ "field_task_types": [named("1", "Disconnection")] }),
            )
            .respond(
                PATH_TASK_ACTIONS,
                json!({ "field_task_actions": [
                    { "id": "3", "name": "Close valve", "task_type": 1 }
                ]}),
            )
            .respond(
                PATH_TARIFF_CATEGORIES,
                json!({ "tariff_categories": [{ "id": "8", "name": null }] }),
            )
            .respond(
                PATH_READING_CASES,
                json!({ "reading_cases": [
                    { "id": "2", "name": "Normal", "has_reading": "1", "has_image": "0" }
                ]}),
            )
            .respond(
                PATH_READING_ANOMALY_CASES,
                json!({ "reading_anom_cases": [
                    { "id": "4", "name": "No access", "case_id": "2" }
                ]}),
            );

        let db = test_db().await;
        let total = Reconciler::new(db.clone(), upstream)
            .run_full_sync(7, "tok")
            .await
            .unwrap();
        assert_eq!(total, 5);

        let reference = db.reference();
        assert_eq!(reference.lookup(LookupKind::TaskType).await.unwrap().len(), 1);
        let tariffs = reference.lookup(LookupKind::TariffCategory).await.unwrap();
        assert_eq!(tariffs[0].name, "");
        let cases = reference.reading_cases().await.unwrap();
        assert!(cases[0].has_reading);
        assert!(!cases[0].has_image);
        assert_eq!(
            reference.reading_anomaly_cases(Some(2)).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn test_steps_run_in_dependency_order() {
        let upstream = StubUpstream::default()
            .respond(
                PATH_AREAS,
                json!({ "service_areas": [named("1", "Central")] }),
            )
            .respond(
                "api_get/get_service_zones?parent_id=1",
                json!({ "service_zones": [{ "id": "10", "name": "North", "parent_id": 1 }] }),
            )
            .respond(
                PATH_BOOKS,
                json!({ "meter_books": [
                    { "id": "100", "name": "Book A", "service_areas_id": 1 }
                ]}),
            );

        let db = test_db().await;
        let reconciler = Reconciler::new(db, upstream);
        reconciler.run_full_sync(7, "tok").await.unwrap();

        let calls = reconciler.upstream.calls();
        let position = |needle: &str| calls.iter().position(|c| c == needle).unwrap();
        assert!(position(PATH_AREAS) < position("api_get/get_service_zones?parent_id=1"));
        assert!(position("api_get/get_service_zones?parent_id=1") < position(PATH_BOOKS));
        assert!(position(PATH_BOOKS) < position(PATH_SHEETS));
        assert!(position(PATH_SHEETS) < position(PATH_TASK_TYPES));
        assert!(position(PATH_TASK_TYPES) < position(PATH_INCIDENTS));
    }

    #[test]
    fn test_truncate_message_caps_length() {
        let long = "x".repeat(ERROR_MESSAGE_LIMIT + 100);
        assert_eq!(truncate_message(&long).chars().count(), ERROR_MESSAGE_LIMIT);
        assert_eq!(truncate_message("short"), "short");
    }
}
