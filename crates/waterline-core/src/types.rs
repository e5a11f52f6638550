//! # Domain Types
//!
//! The mirrored reference entities and the records surrounding them.
//!
//! ## Identity
//! Every mirrored entity is keyed by a remote-assigned integer identifier.
//! The upstream transports it as a numeric string; it is parsed on ingest
//! (see [`crate::parse`]) and never travels through the system as a string
//! again.
//!
//! ## Serialization
//! Structs serialize with camelCase field names because that is the contract
//! of the mobile front-end. Database columns stay snake_case; `FromRow`
//! (behind the `sqlx` feature) maps by Rust field name.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Geography: areas → zones → books → sheets
// =============================================================================

/// A service area, the top of the geographic hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct ServiceArea {
    pub id: i64,
    pub name: String,
}

/// A service zone inside a service area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct ServiceZone {
    pub id: i64,
    pub name: String,
    /// The owning [`ServiceArea`] id.
    pub parent_id: i64,
}

/// A meter book, grouping meters within a service area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct MeterBook {
    pub id: i64,
    pub name: String,
    pub service_area_id: i64,
}

/// A meter-reading sheet within a meter book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct MeterSheet {
    pub id: i64,
    pub name: String,
    pub meter_book_id: i64,
}

// =============================================================================
// Simple id/name lookups
// =============================================================================

/// One row of an id/name lookup table.
///
/// Seven of the mirrored entities carry nothing but an id and a name; they
/// share this struct and are told apart by [`LookupKind`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct LookupItem {
    pub id: i64,
    pub name: String,
}

/// The simple id/name lookup tables mirrored from the upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LookupKind {
    TaskType,
    AccountType,
    TariffChargeCategory,
    MaterialPipeline,
    MeterSize,
    TariffCategory,
    IncidentType,
}

impl LookupKind {
    /// Human-readable entity name, used in log lines and error messages.
    pub fn entity(&self) -> &'static str {
        match self {
            LookupKind::TaskType => "task type",
            LookupKind::AccountType => "account type",
            LookupKind::TariffChargeCategory => "tariff charge category",
            LookupKind::MaterialPipeline => "material pipeline",
            LookupKind::MeterSize => "meter size",
            LookupKind::TariffCategory => "tariff category",
            LookupKind::IncidentType => "incident type",
        }
    }
}

// =============================================================================
// Structured lookups
// =============================================================================

/// A field-task action, belonging to a task type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct TaskAction {
    pub id: i64,
    pub name: String,
    pub task_type_id: i64,
}

/// A meter-reading case ("normal read", "meter buried", ...).
///
/// The flags drive the capture UI: whether the technician must enter a
/// reading and whether a photo is required.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct ReadingCase {
    pub id: i64,
    pub name: String,
    pub has_reading: bool,
    pub has_image: bool,
}

/// A reading anomaly ("leak", "broken seal", ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct ReadingAnomaly {
    pub id: i64,
    pub name: String,
    pub description: String,
}

/// A reading anomaly scoped to a specific reading case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct ReadingAnomalyCase {
    pub id: i64,
    pub name: String,
    /// The owning [`ReadingCase`] id.
    pub case_id: i64,
}

// =============================================================================
// Sync Audit
// =============================================================================

/// One audit record describing the outcome of one cascade invocation.
///
/// Append-only: written exactly once per run, never mutated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct SyncRecord {
    pub id: i64,
    pub sync_type: String,
    /// Cumulative rows written across every entity that completed in the
    /// run. 0 when the run failed before any entity completed.
    pub records_synced: i64,
    pub is_success: bool,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Session
// =============================================================================

/// An authenticated technician session, created by a successful login
/// against the upstream and persisted locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user_id: i64,
    pub trongate_user_id: i64,
    pub trongate_token: String,
    pub username: String,
    pub employee_name: String,
    pub user_role_id: i64,
}
