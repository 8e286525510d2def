//! Time utility functions
//!
//! Calendar APIs want RFC 3339 timestamps with an explicit offset, while
//! agents hand over naive wall-clock strings. [`parse_and_format_datetime`]
//! bridges the two using IANA timezone names.

use chrono::{DateTime, Duration, FixedOffset, LocalResult, NaiveDateTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;
use thiserror::Error;

/// Accepted input layout for calendar datetimes
pub const NAIVE_DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Error, Debug)]
pub enum DatetimeError {
    #[error("Invalid datetime '{input}' (expected YYYY-MM-DDTHH:MM:SS): {source}")]
    Parse {
        input: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("Unknown timezone: {name}")]
    UnknownTimezone { name: String },

    #[error("Could not determine the local timezone: {reason}")]
    LocalTimezone { reason: String },
}

/// Parse two naive datetimes and attach a timezone to both.
///
/// Returns `(start_rfc3339, end_rfc3339, timezone_name)`. When `timezone` is
/// `None` the process's local zone is used and its IANA name is returned.
pub fn parse_and_format_datetime(
    start_datetime: &str,
    end_datetime: &str,
    timezone: Option<&str>,
) -> Result<(String, String, String), DatetimeError> {
    let timezone = match timezone {
        Some(name) => name.to_string(),
        None => local_timezone_name()?,
    };
    let tz = parse_timezone(&timezone)?;

    let start = localize(start_datetime, tz)?;
    let end = localize(end_datetime, tz)?;

    tracing::trace!(start = %start, end = %end, timezone = %timezone, "Formatted datetime range");
    Ok((start.to_rfc3339(), end.to_rfc3339(), timezone))
}

/// Parse an IANA timezone name using chrono-tz.
pub fn parse_timezone(name: &str) -> Result<Tz, DatetimeError> {
    name.parse::<Tz>()
        .map_err(|_| DatetimeError::UnknownTimezone {
            name: name.to_string(),
        })
}

/// IANA name of the process's local timezone.
///
/// `TZ` wins when it names a known zone; otherwise the OS setting is used.
pub fn local_timezone_name() -> Result<String, DatetimeError> {
    if let Some(tz) = timezone_from_env_value(std::env::var("TZ").ok()) {
        return Ok(tz.name().to_string());
    }
    iana_time_zone::get_timezone().map_err(|e| DatetimeError::LocalTimezone {
        reason: e.to_string(),
    })
}

/// `TZ` values may carry a leading ':' (POSIX "implementation-defined" form)
fn timezone_from_env_value(value: Option<String>) -> Option<Tz> {
    let value = value?;
    let name = value.trim().trim_start_matches(':');
    if name.is_empty() {
        return None;
    }
    name.parse::<Tz>().ok()
}

fn localize(input: &str, tz: Tz) -> Result<DateTime<FixedOffset>, DatetimeError> {
    let naive = NaiveDateTime::parse_from_str(input, NAIVE_DATETIME_FORMAT).map_err(|source| {
        DatetimeError::Parse {
            input: input.to_string(),
            source,
        }
    })?;

    // Wall-clock times repeated at DST fall-back resolve to the earlier offset
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Ok(dt.fixed_offset()),
        LocalResult::Ambiguous(earliest, _) => Ok(earliest.fixed_offset()),
        LocalResult::None => Ok(localize_in_gap(naive, tz)),
    }
}

/// Wall-clock time skipped by a spring-forward transition.
///
/// The wall-clock value is kept and the offset in force after the
/// transition is attached, so `02:30` in New York becomes `02:30-04:00`.
fn localize_in_gap(naive: NaiveDateTime, tz: Tz) -> DateTime<FixedOffset> {
    let before = tz.offset_from_utc_datetime(&(naive - Duration::days(1))).fix();
    let instant = naive - Duration::seconds(i64::from(before.local_minus_utc()));
    let after = tz.offset_from_utc_datetime(&instant).fix();
    let utc = naive - Duration::seconds(i64::from(after.local_minus_utc()));
    DateTime::from_naive_utc_and_offset(utc, after)
}

/// Convert microseconds since Unix epoch to DateTime<Utc>
pub fn micros_to_datetime(micros: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_micros(micros).unwrap_or_else(|| {
        tracing::warn!(micros, "Invalid timestamp, using epoch");
        DateTime::UNIX_EPOCH
    })
}
