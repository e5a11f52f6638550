//! # Repository Implementations
//!
//! One repository per concern:
//!
//! - [`reference`] - The mirrored reference tables (written only by the
//!   reconciler, read by the server)
//! - [`sync_history`] - The append-only sync audit trail
//! - [`session`] - Locally persisted technician sessions

pub mod reference;
pub mod session;
pub mod sync_history;
