//! Nanosecond-precision time codec for serialized item bodies.
//!
//! Item bodies carry their instants as strings so that the wire format
//! stays stable regardless of the store's value encoding. The native
//! `DateTime<Utc>` fields are reconstructed from these strings on read.

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::TimeError;

/// Serialized time layout: ISO-8601 with nanosecond precision, UTC, literal `Z`.
pub const ITEM_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.9fZ";

/// Format an instant into the serialized body layout.
pub fn format_item_time(t: DateTime<Utc>) -> String {
    t.format(ITEM_TIME_FORMAT).to_string()
}

/// Parse a serialized body time back into an instant.
pub fn parse_item_time(value: &str) -> Result<DateTime<Utc>, TimeError> {
    NaiveDateTime::parse_from_str(value, ITEM_TIME_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|_| TimeError::Parse {
            value: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_round_trip_preserves_nanoseconds() {
        let t = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 45).unwrap()
            + chrono::Duration::nanoseconds(123_456_789);
        let formatted = format_item_time(t);
        assert_eq!(formatted, "2024-03-01T12:30:45.123456789Z");
        assert_eq!(parse_item_time(&formatted).unwrap(), t);
    }

    #[test]
    fn test_whole_second_formats_nine_digits() {
        let t = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        assert_eq!(format_item_time(t), "2024-03-01T00:00:00.000000000Z");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_item_time("not-a-time").is_err());
    }
}
