//! # waterline-sync: The Reference-Data Reconciler
//!
//! Mirrors reference data from the upstream utility-management API into the
//! local SQLite store. The cascade is dependency-ordered:
//!
//! ```text
//! service areas ──▶ zones (per area) ──▶ meter books ──▶ meter sheets
//!
//! plus eleven independent lookups:
//! task types, task actions, account types, tariff charge categories,
//! material pipelines, meter sizes, tariff categories, reading cases,
//! reading anomalies, reading anomaly cases, incident types
//! ```
//!
//! Every step is fetch → validate → replace. Steps are tolerant of the
//! upstream having no data (the step contributes zero records and the
//! previous snapshot stays in place) but a wrong-shaped payload aborts the
//! whole run. One audit record is written per invocation, success or
//! failure.
//!
//! ## Modules
//!
//! - [`reconciler`] - The cascade itself
//! - [`upstream`] - The HTTP client and the [`upstream::UpstreamApi`] seam
//! - [`schema`] - Wire-format payload records and their validation
//! - [`error`] - Sync error types

pub mod error;
pub mod reconciler;
pub mod schema;
pub mod upstream;

pub use error::{SyncError, SyncResult};
pub use reconciler::Reconciler;
pub use upstream::{HttpUpstream, UpstreamApi};
