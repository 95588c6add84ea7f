//! RFC3339 timestamp parsing for stored `created_at` / `updated_at` columns.

use chrono::{DateTime, Utc};

use crate::DomainError;

/// Parses an RFC3339 timestamp into UTC.
///
/// ```
/// use compass_domain::common::parse_datetime;
/// use chrono::Datelike;
///
/// let dt = parse_datetime("2024-03-02T08:15:00Z").unwrap();
/// assert_eq!(dt.month(), 3);
/// ```
pub fn parse_datetime(s: &str) -> Result<DateTime<Utc>, DomainError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DomainError::parse(format!("invalid timestamp {s:?}: {e}")))
}

/// Parses an RFC3339 timestamp, returning `default` when the value is malformed.
pub fn parse_datetime_or(s: &str, default: DateTime<Utc>) -> DateTime<Utc> {
    parse_datetime(s).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, TimeZone, Timelike};

    #[test]
    fn parses_offsets_into_utc() {
        let dt = parse_datetime("2024-03-02T08:15:00+02:00").unwrap();
        assert_eq!(dt.hour(), 6);
        assert_eq!(dt.day(), 2);
    }

    #[test]
    fn rejects_dates_without_time() {
        let err = parse_datetime("2024-03-02").unwrap_err();
        assert!(matches!(err, DomainError::Parse(_)));
    }

    #[test]
    fn falls_back_on_garbage() {
        let default = Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(parse_datetime_or("yesterday", default), default);
        assert_eq!(parse_datetime_or("", default), default);
    }
}
