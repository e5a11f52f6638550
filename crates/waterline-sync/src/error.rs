//! # Sync Error Types
//!
//! Error types for the reconciler cascade.
//!
//! ## Error Taxonomy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sync Error Categories                             │
//! │                                                                         │
//! │  RECOVERED (never surface as SyncError)                                 │
//! │  • Upstream unreachable / non-2xx / empty body on an optional step     │
//! │    → the step contributes zero records, keeps that table's previous     │
//! │      snapshot, and the run continues                                    │
//! │                                                                         │
//! │  FATAL (abort the run, recorded in the audit trail)                     │
//! │  • Schema            - payload shape mismatch, bad numeric string       │
//! │  • MalformedResponse - 2xx response body that is not JSON               │
//! │  • Database          - storage failure mid-cascade                      │
//! │                                                                         │
//! │  LOGIN ONLY (outside the cascade)                                       │
//! │  • Unauthorized      - upstream rejected the credentials                │
//! │  • Transport         - upstream unreachable during login                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Transport tolerance is deliberately asymmetric: the cascade accepts
//! "no data" silently but never accepts wrong-shaped data. This is
//! observable behavior and must not be "improved".

use thiserror::Error;

use waterline_core::CoreError;

/// Result type alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Sync error type covering all fatal cascade failures plus login failures.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A payload failed validation against its entity schema.
    ///
    /// ## When This Occurs
    /// - A record is missing a required field
    /// - A field has the wrong JSON type
    /// - A numeric-string field does not parse (see [`waterline_core::parse`])
    #[error("Schema validation failed for {entity}: {reason}")]
    Schema { entity: &'static str, reason: String },

    /// The upstream returned 2xx with a body that is not JSON.
    #[error("Malformed response from {path}: {reason}")]
    MalformedResponse { path: String, reason: String },

    /// The upstream was unreachable (login path only; the cascade treats
    /// transport failures as "no data").
    #[error("Upstream request failed: {0}")]
    Transport(String),

    /// The upstream rejected the login credentials.
    #[error("Upstream rejected credentials")]
    Unauthorized,

    /// Database operation failed mid-cascade.
    #[error("Database error: {0}")]
    Database(#[from] waterline_db::DbError),

    /// Internal error (client construction, serialization).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SyncError {
    /// Wraps a field-parsing failure as a schema violation for `entity`.
    pub fn schema(entity: &'static str, err: CoreError) -> Self {
        SyncError::Schema {
            entity,
            reason: err.to_string(),
        }
    }
}
