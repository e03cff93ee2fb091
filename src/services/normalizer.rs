//! Timestamp normalization service
//!
//! Converts the heterogeneous timestamp encodings found in purchase records
//! (epoch seconds, epoch milliseconds, digit strings, ISO-8601 text) into an
//! instant on the fixed local clock (UTC+03:00, no daylight saving).

use crate::types::{RawTimestamp, TimestampError};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Utc};

/// Local clock offset in seconds east of UTC (East Africa Time)
pub const LOCAL_OFFSET_SECS: i32 = 3 * 3600;

/// 2100-01-01T00:00:00Z in epoch seconds. Anything larger is read as
/// milliseconds.
pub const SECONDS_CUTOFF: i64 = 4_102_444_800;

/// Naive layouts accepted after RFC 3339 fails. Interpreted as UTC.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Offset-carrying layouts that RFC 3339 parsing rejects. `%z` takes the
/// offset with or without a colon.
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M%z",
];

/// The fixed local offset
pub fn local_tz() -> FixedOffset {
    FixedOffset::east_opt(LOCAL_OFFSET_SECS).expect("+03:00 is a valid offset")
}

/// Current instant on the local clock
pub fn local_now() -> DateTime<FixedOffset> {
    Utc::now().with_timezone(&local_tz())
}

/// Normalize a raw timestamp to the local clock.
///
/// # Examples
/// ```
/// use token_analyzer::services::normalizer::normalize_timestamp;
/// use token_analyzer::types::RawTimestamp;
///
/// let secs = normalize_timestamp(Some(&RawTimestamp::Integer(1_700_000_000))).unwrap();
/// let millis = normalize_timestamp(Some(&RawTimestamp::Integer(1_700_000_000_000))).unwrap();
/// assert_eq!(secs, millis);
/// assert_eq!(secs.to_rfc3339(), "2023-11-15T01:13:20+03:00");
/// ```
pub fn normalize_timestamp(
    raw: Option<&RawTimestamp>,
) -> Result<DateTime<FixedOffset>, TimestampError> {
    let utc = match raw {
        None => return Err(TimestampError::Missing),
        Some(RawTimestamp::Integer(v)) => from_epoch(*v)?,
        Some(RawTimestamp::Float(v)) => return Err(TimestampError::Invalid(v.to_string())),
        Some(RawTimestamp::Text(s)) if s.is_empty() => return Err(TimestampError::Missing),
        Some(RawTimestamp::Text(s)) if s.bytes().all(|b| b.is_ascii_digit()) => {
            let v: i64 = s
                .parse()
                .map_err(|_| TimestampError::Invalid(s.clone()))?;
            from_epoch(v)?
        }
        Some(RawTimestamp::Text(s)) => parse_iso8601(s)?,
    };

    Ok(utc.with_timezone(&local_tz()))
}

/// Epoch integer with inferred unit
fn from_epoch(v: i64) -> Result<DateTime<Utc>, TimestampError> {
    let dt = if v > SECONDS_CUTOFF {
        DateTime::from_timestamp_millis(v)
    } else {
        DateTime::from_timestamp(v, 0)
    };
    dt.ok_or_else(|| TimestampError::Invalid(v.to_string()))
}

/// ISO-8601 text. A trailing `Z` means UTC, an explicit offset is honoured,
/// and text without any offset is taken as UTC.
fn parse_iso8601(s: &str) -> Result<DateTime<Utc>, TimestampError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    let zulu = s.strip_suffix('Z').map(|head| format!("{head}+00:00"));
    let text = zulu.as_deref().unwrap_or(s);

    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(text, fmt) {
            return Ok(dt.with_timezone(&Utc));
        }
    }

    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(naive.and_utc());
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }

    Err(TimestampError::Invalid(s.to_string()))
}
