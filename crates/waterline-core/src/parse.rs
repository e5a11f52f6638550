//! # Upstream Field Parsing
//!
//! The upstream utility-management API serializes almost everything as a
//! string: record identifiers arrive as `"123"`, boolean flags as `"0"` or
//! `"1"`. These helpers turn those strings into typed values on ingest, so
//! the rest of the system only ever sees integers and booleans.
//!
//! A string that fails to parse is a schema violation, not a transport
//! hiccup: the caller treats it as fatal for the whole sync run.

use crate::error::{CoreError, CoreResult};

/// Parses a remote identifier field (`"123"` → `123`).
///
/// ## Arguments
/// * `field` - Field name, used for the error message
/// * `value` - The raw string from the upstream payload
pub fn remote_id(field: &'static str, value: &str) -> CoreResult<i64> {
    value.trim().parse::<i64>().map_err(|_| CoreError::InvalidId {
        field,
        value: value.to_string(),
    })
}

/// Parses a remote flag field (`"0"`/`"1"` → `false`/`true`).
///
/// Any non-zero numeric string counts as set, mirroring how the upstream
/// treats these columns.
pub fn remote_flag(field: &'static str, value: &str) -> CoreResult<bool> {
    let n = value
        .trim()
        .parse::<i64>()
        .map_err(|_| CoreError::InvalidFlag {
            field,
            value: value.to_string(),
        })?;
    Ok(n != 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_id_parses_numeric_strings() {
        assert_eq!(remote_id("id", "42").unwrap(), 42);
        assert_eq!(remote_id("id", " 7 ").unwrap(), 7);
        assert_eq!(remote_id("id", "-1").unwrap(), -1);
    }

    #[test]
    fn test_remote_id_rejects_garbage() {
        let err = remote_id("id", "abc").unwrap_err();
        assert_eq!(
            err,
            CoreError::InvalidId {
                field: "id",
                value: "abc".to_string()
            }
        );
        assert!(remote_id("id", "").is_err());
        assert!(remote_id("id", "12.5").is_err());
    }

    #[test]
    fn test_remote_flag() {
        assert!(!remote_flag("has_reading", "0").unwrap());
        assert!(remote_flag("has_reading", "1").unwrap());
        // Upstream occasionally sends other non-zero values; they count as set.
        assert!(remote_flag("has_reading", "2").unwrap());
        assert!(remote_flag("has_reading", "yes").is_err());
    }
}
