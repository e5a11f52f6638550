//! # waterline-core: Pure Domain Types for Waterline
//!
//! This crate holds the domain model shared by every other crate in the
//! workspace: the mirrored reference entities, the sync audit record, the
//! technician session, and the parsing rules for the upstream API's
//! stringly-typed fields.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Waterline Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   apps/server (Axum API)                        │   │
//! │  │    /api/login, /api/sync/all, /api/sync/history, lookups       │   │
//! │  └───────────┬─────────────────────────────────────┬───────────────┘   │
//! │              │                                     │                    │
//! │  ┌───────────▼───────────┐             ┌───────────▼───────────┐       │
//! │  │    waterline-sync     │             │     waterline-db      │       │
//! │  │  Reconciler cascade   │────────────▶│  SQLite repositories  │       │
//! │  └───────────┬───────────┘             └───────────┬───────────┘       │
//! │              │                                     │                    │
//! │  ┌───────────▼─────────────────────────────────────▼───────────┐       │
//! │  │              ★ waterline-core (THIS CRATE) ★                │       │
//! │  │                                                             │       │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE TYPES            │       │
//! │  └─────────────────────────────────────────────────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Mirrored entities, [`types::SyncRecord`], [`types::Session`]
//! - [`parse`] - Numeric-string and flag-string parsing for upstream fields
//! - [`error`] - Domain error types

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod parse;
pub mod types;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Audit label written for every full-cascade invocation.
///
/// Only one sync type exists today; the column is kept so partial syncs can
/// be audited under their own label later without a schema change.
pub const SYNC_TYPE_COMPLETE: &str = "complete_sync";

/// How many audit records the history endpoint surfaces to operators.
pub const SYNC_HISTORY_LIMIT: u32 = 50;
