//! # Error Types
//!
//! Domain-specific error types for waterline-core.
//!
//! ## Error Hierarchy
//! ```text
//! waterline-core errors (this file)
//! └── CoreError         - Field parsing failures on upstream payloads
//!
//! waterline-db errors (separate crate)
//! └── DbError           - Database operation failures
//!
//! waterline-sync errors (separate crate)
//! └── SyncError         - Transport / validation / cascade failures
//!
//! Server API errors (in app)
//! └── ApiError          - What callers see (JSON envelope)
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (field name, offending value)
//! 3. Errors are enum variants, never bare Strings

use thiserror::Error;

/// Domain errors raised while interpreting upstream field values.
///
/// The upstream API transports every identifier and flag as a string.
/// These errors are what schema validation surfaces when such a string
/// does not hold what it is supposed to hold.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    /// An identifier field did not contain an integer.
    ///
    /// ## When This Occurs
    /// - Upstream sends `"id": "abc"` or `"id": ""`
    /// - A parent-reference field holds a non-numeric string
    #[error("{field} is not a numeric identifier: '{value}'")]
    InvalidId { field: &'static str, value: String },

    /// A flag field did not contain a numeric 0/1 value.
    ///
    /// ## When This Occurs
    /// - Upstream sends `"has_reading": "yes"` instead of `"1"`
    #[error("{field} is not a numeric flag: '{value}'")]
    InvalidFlag { field: &'static str, value: String },
}

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InvalidId {
            field: "parent_id",
            value: "n/a".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "parent_id is not a numeric identifier: 'n/a'"
        );
    }
}
