//! Due-instant resolution for scheduled posts.
//!
//! A post's `date` is either an absolute instant (when no timezone is given)
//! or a naive local wall-clock time in an IANA zone. Both are resolved to a
//! UTC instant for comparison against the cycle's wall-clock time.

use chrono::{DateTime, LocalResult, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TimeError {
    #[error("unknown timezone identifier: {0}")]
    UnknownTimezone(String),
    #[error("unparseable date: {0}")]
    UnparseableDate(String),
    #[error("local time {date} does not exist in zone {zone} (DST gap)")]
    NonexistentLocalTime { date: String, zone: String },
}

/// Resolve a post's stored date to an absolute UTC instant.
///
/// Without a timezone the date must carry its own offset (RFC 3339) or is
/// taken as UTC. With a timezone the date is local wall-clock time in that
/// zone; ambiguous times during a DST fall-back resolve to the earlier
/// mapping, and times inside a spring-forward gap are rejected.
///
/// # Errors
///
/// Returns an error for an unknown zone identifier, an unparseable date, or
/// a nonexistent local time.
pub fn resolve_instant(date: &str, timezone: Option<&str>) -> Result<DateTime<Utc>, TimeError> {
    match timezone {
        None => parse_absolute(date),
        Some(zone_id) => {
            let zone: Tz = zone_id
                .parse()
                .map_err(|_| TimeError::UnknownTimezone(zone_id.to_string()))?;
            let naive = parse_naive(date)?;
            match zone.from_local_datetime(&naive) {
                LocalResult::Single(dt) => Ok(dt.with_timezone(&Utc)),
                LocalResult::Ambiguous(earlier, _) => Ok(earlier.with_timezone(&Utc)),
                LocalResult::None => Err(TimeError::NonexistentLocalTime {
                    date: date.to_string(),
                    zone: zone_id.to_string(),
                }),
            }
        }
    }
}

/// A post is due when its resolved instant is at or before `now`.
#[must_use]
pub fn is_due(resolved: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    resolved <= now
}

/// Offset label of a zone at a given local date, e.g. `"+02:00"`.
///
/// Recorded on archived posts for human audit. Falls back to `"+00:00"` when
/// the post has no zone.
///
/// # Errors
///
/// Returns an error for an unknown zone identifier or unparseable date.
pub fn utc_offset_label(date: &str, timezone: Option<&str>) -> Result<String, TimeError> {
    let Some(zone_id) = timezone else {
        return Ok("+00:00".to_string());
    };
    let zone: Tz = zone_id
        .parse()
        .map_err(|_| TimeError::UnknownTimezone(zone_id.to_string()))?;
    let naive = parse_naive(date)?;
    let local = match zone.from_local_datetime(&naive) {
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt,
        LocalResult::None => {
            return Err(TimeError::NonexistentLocalTime {
                date: date.to_string(),
                zone: zone_id.to_string(),
            })
        }
    };
    Ok(local.format("%:z").to_string())
}

fn parse_absolute(date: &str) -> Result<DateTime<Utc>, TimeError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(date) {
        return Ok(dt.with_timezone(&Utc));
    }
    // No offset present: take the naive fields as UTC.
    parse_naive(date).map(|naive| Utc.from_utc_datetime(&naive))
}

fn parse_naive(date: &str) -> Result<NaiveDateTime, TimeError> {
    const FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
    ];
    for format in FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(date, format) {
            return Ok(naive);
        }
    }
    Err(TimeError::UnparseableDate(date.to_string()))
}
