//! Timestamp formatting and the canonical-bytes helper shared across
//! builders (spec §6 `dt`, §4.1 canonical serializer).

use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::Error;

/// Formats a Unix-epoch microsecond timestamp as ISO-8601 with explicit
/// `+00:00` offset and microsecond precision (spec §6: "producers must
/// not emit naive timestamps").
pub fn format_timestamp_micros(unix_micros: i64) -> String {
    let secs = unix_micros.div_euclid(1_000_000);
    let micros = unix_micros.rem_euclid(1_000_000);
    let dt = DateTime::<Utc>::from_timestamp(secs, (micros * 1_000) as u32).unwrap_or_else(|| DateTime::<Utc>::from_timestamp(0, 0).unwrap());
    let formatted = dt.to_rfc3339_opts(SecondsFormat::Micros, true);
    formatted.replace('Z', "+00:00")
}

/// Parses a timestamp produced by `format_timestamp_micros`, rejecting
/// naive (offset-less) input.
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, Error> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::InvalidInput(format!("bad timestamp {s}: {e}")))
}

/// Canonical (insertion-order, no-whitespace) serialization of any
/// `Serialize` value, the `dfs_serializer` role in the teacher's design.
/// `serde_json`'s `preserve_order` feature already backs `Value`/`Map`
/// with an order-preserving map, so this is a thin, explicitly-named
/// wrapper rather than a hand-rolled depth-first walker.
pub fn to_canonical_bytes<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, Error> {
    serde_json::to_vec(value).map_err(|e| Error::Internal(format!("canonicalization failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_with_explicit_offset() {
        let s = format_timestamp_micros(1_700_000_000_123_456);
        assert!(s.ends_with("+00:00"));
        assert!(!s.contains('Z'));
    }

    #[test]
    fn round_trips_through_parse() {
        let s = format_timestamp_micros(1_700_000_000_000_000);
        assert!(parse_timestamp(&s).is_ok());
    }

    #[test]
    fn rejects_garbage_timestamp() {
        assert!(parse_timestamp("not-a-timestamp").is_err());
    }
}
