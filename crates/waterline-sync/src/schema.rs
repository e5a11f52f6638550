//! # Wire-Format Payload Schemas
//!
//! The raw record shapes the upstream sends inside its response envelopes,
//! and their validation into domain types.
//!
//! The upstream is a PHP-backed API with loose typing at the edges:
//! identifiers are numeric strings (`"id": "12"`), flags are `"0"`/`"1"`,
//! while parent-reference columns arrive as real JSON numbers. The structs
//! here mirror that shape exactly; [`TryFrom`] conversions parse them into
//! the strictly typed domain structs. A conversion failure is a schema
//! violation and fatal for the run.

use serde::Deserialize;

use waterline_core::{
    parse, CoreError, LookupItem, MeterBook, MeterSheet, ReadingAnomaly, ReadingAnomalyCase,
    ReadingCase, ServiceArea, ServiceZone, Session, TaskAction,
};

// =============================================================================
// Geography
// =============================================================================

/// One record under the `service_areas` envelope key.
#[derive(Debug, Clone, Deserialize)]
pub struct AreaRecord {
    pub id: String,
    pub name: String,
}

impl TryFrom<AreaRecord> for ServiceArea {
    type Error = CoreError;

    fn try_from(raw: AreaRecord) -> Result<Self, CoreError> {
        Ok(ServiceArea {
            id: parse::remote_id("id", &raw.id)?,
            name: raw.name,
        })
    }
}

/// One record under the `service_zones` envelope key.
#[derive(Debug, Clone, Deserialize)]
pub struct ZoneRecord {
    pub id: String,
    pub name: String,
    pub parent_id: i64,
}

impl TryFrom<ZoneRecord> for ServiceZone {
    type Error = CoreError;

    fn try_from(raw: ZoneRecord) -> Result<Self, CoreError> {
        Ok(ServiceZone {
            id: parse::remote_id("id", &raw.id)?,
            name: raw.name,
            parent_id: raw.parent_id,
        })
    }
}

/// One record under the `meter_books` envelope key.
#[derive(Debug, Clone, Deserialize)]
pub struct BookRecord {
    pub id: String,
    pub name: String,
    pub service_areas_id: i64,
}

impl TryFrom<BookRecord> for MeterBook {
    type Error = CoreError;

    fn try_from(raw: BookRecord) -> Result<Self, CoreError> {
        Ok(MeterBook {
            id: parse::remote_id("id", &raw.id)?,
            name: raw.name,
            service_area_id: raw.service_areas_id,
        })
    }
}

/// One record under the `meter_sheets` envelope key.
#[derive(Debug, Clone, Deserialize)]
pub struct SheetRecord {
    pub id: String,
    pub name: String,
    pub meter_books_id: i64,
}

impl TryFrom<SheetRecord> for MeterSheet {
    type Error = CoreError;

    fn try_from(raw: SheetRecord) -> Result<Self, CoreError> {
        Ok(MeterSheet {
            id: parse::remote_id("id", &raw.id)?,
            name: raw.name,
            meter_book_id: raw.meter_books_id,
        })
    }
}

// =============================================================================
// Lookups
// =============================================================================

/// The common id/name record shape shared by most lookup envelopes.
#[derive(Debug, Clone, Deserialize)]
pub struct NamedRecord {
    pub id: String,
    pub name: String,
}

impl TryFrom<NamedRecord> for LookupItem {
    type Error = CoreError;

    fn try_from(raw: NamedRecord) -> Result<Self, CoreError> {
        Ok(LookupItem {
            id: parse::remote_id("id", &raw.id)?,
            name: raw.name,
        })
    }
}

/// Tariff categories are the one lookup whose name may be null upstream;
/// a missing name is stored as the empty string.
#[derive(Debug, Clone, Deserialize)]
pub struct TariffCategoryRecord {
    pub id: String,
    pub name: Option<String>,
}

impl TryFrom<TariffCategoryRecord> for LookupItem {
    type Error = CoreError;

    fn try_from(raw: TariffCategoryRecord) -> Result<Self, CoreError> {
        Ok(LookupItem {
            id: parse::remote_id("id", &raw.id)?,
            name: raw.name.unwrap_or_default(),
        })
    }
}

/// One record under the `field_task_actions` envelope key.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskActionRecord {
    pub id: String,
    pub name: String,
    pub task_type: i64,
}

impl TryFrom<TaskActionRecord> for TaskAction {
    type Error = CoreError;

    fn try_from(raw: TaskActionRecord) -> Result<Self, CoreError> {
        Ok(TaskAction {
            id: parse::remote_id("id", &raw.id)?,
            name: raw.name,
            task_type_id: raw.task_type,
        })
    }
}

/// One record under the `reading_cases` envelope key.
#[derive(Debug, Clone, Deserialize)]
pub struct ReadingCaseRecord {
    pub id: String,
    pub name: String,
    pub has_reading: String,
    pub has_image: String,
}

impl TryFrom<ReadingCaseRecord> for ReadingCase {
    type Error = CoreError;

    fn try_from(raw: ReadingCaseRecord) -> Result<Self, CoreError> {
        Ok(ReadingCase {
            id: parse::remote_id("id", &raw.id)?,
            name: raw.name,
            has_reading: parse::remote_flag("has_reading", &raw.has_reading)?,
            has_image: parse::remote_flag("has_image", &raw.has_image)?,
        })
    }
}

/// One record under the `reading_anom` envelope key.
#[derive(Debug, Clone, Deserialize)]
pub struct AnomalyRecord {
    pub id: String,
    pub name: String,
    pub description: String,
}

impl TryFrom<AnomalyRecord> for ReadingAnomaly {
    type Error = CoreError;

    fn try_from(raw: AnomalyRecord) -> Result<Self, CoreError> {
        Ok(ReadingAnomaly {
            id: parse::remote_id("id", &raw.id)?,
            name: raw.name,
            description: raw.description,
        })
    }
}

/// One record under the `reading_anom_cases` envelope key.
#[derive(Debug, Clone, Deserialize)]
pub struct AnomalyCaseRecord {
    pub id: String,
    pub name: String,
    pub case_id: String,
}

impl TryFrom<AnomalyCaseRecord> for ReadingAnomalyCase {
    type Error = CoreError;

    fn try_from(raw: AnomalyCaseRecord) -> Result<Self, CoreError> {
        Ok(ReadingAnomalyCase {
            id: parse::remote_id("id", &raw.id)?,
            name: raw.name,
            case_id: parse::remote_id("case_id", &raw.case_id)?,
        })
    }
}

// =============================================================================
// Login
// =============================================================================

/// The upstream login response.
///
/// Unlike the reference envelopes, login fields arrive with real JSON
/// numbers; every field is required. A payload missing any of them fails
/// login and no session is created.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginPayload {
    pub trongate_token: String,
    pub user_role_id: i64,
    pub trongate_user_id: i64,
    pub user_id: i64,
    pub username: String,
    pub employee_name: String,
}

impl From<LoginPayload> for Session {
    fn from(raw: LoginPayload) -> Self {
        Session {
            user_id: raw.user_id,
            trongate_user_id: raw.trongate_user_id,
            trongate_token: raw.trongate_token,
            username: raw.username,
            employee_name: raw.employee_name,
            user_role_id: raw.user_role_id,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_area_record_parses_numeric_string_id() {
        let raw: AreaRecord = serde_json::from_value(json!({"id": "12", "name": "Central"})).unwrap();
        let area = ServiceArea::try_from(raw).unwrap();
        assert_eq!(area.id, 12);
        assert_eq!(area.name, "Central");
    }

    #[test]
    fn test_area_record_rejects_missing_name() {
        let result: Result<AreaRecord, _> = serde_json::from_value(json!({"id": "12"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_area_record_rejects_non_numeric_id() {
        let raw: AreaRecord =
            serde_json::from_value(json!({"id": "twelve", "name": "Central"})).unwrap();
        assert!(ServiceArea::try_from(raw).is_err());
    }

    #[test]
    fn test_reading_case_flags() {
        let raw: ReadingCaseRecord = serde_json::from_value(json!({
            "id": "3", "name": "Normal", "has_reading": "1", "has_image": "0"
        }))
        .unwrap();
        let case = ReadingCase::try_from(raw).unwrap();
        assert!(case.has_reading);
        assert!(!case.has_image);
    }

    #[test]
    fn test_tariff_category_null_name_becomes_empty() {
        let raw: TariffCategoryRecord =
            serde_json::from_value(json!({"id": "4", "name": null})).unwrap();
        let item = LookupItem::try_from(raw).unwrap();
        assert_eq!(item.name, "");
    }

    #[test]
    fn test_anomaly_case_parses_case_id_string() {
        let raw: AnomalyCaseRecord =
            serde_json::from_value(json!({"id": "8", "name": "No access", "case_id": "2"})).unwrap();
        let case = ReadingAnomalyCase::try_from(raw).unwrap();
        assert_eq!(case.case_id, 2);
    }

    #[test]
    fn test_login_payload_to_session() {
        let raw: LoginPayload = serde_json::from_value(json!({
            "trongate_token": "tok",
            "user_role_id": 3,
            "trongate_user_id": 14,
            "user_id": 9,
            "username": "jdoe",
            "employee_name": "J. Doe"
        }))
        .unwrap();
        let session = Session::from(raw);
        assert_eq!(session.user_id, 9);
        assert_eq!(session.trongate_token, "tok");
    }

    #[test]
    fn test_login_payload_requires_employee_name() {
        let result: Result<LoginPayload, _> = serde_json::from_value(json!({
            "trongate_token": "tok",
            "user_role_id": 3,
            "trongate_user_id": 14,
            "user_id": 9,
            "username": "jdoe"
        }));
        assert!(result.is_err());
    }
}
