use chrono::{DateTime, Duration, NaiveDateTime, Utc};

use crate::CoreError;

const BASE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
const WHOLE_SECONDS_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Microsecond precision; anything finer in the identifier is dropped.
pub const MAX_FRACTION_DIGITS: usize = 6;

/// Decode a snapshot identifier into a UTC instant.
///
/// Accepted forms:
/// - `YYYY-MM-DDTHH:MM:SSZ`
/// - `YYYY-MM-DDTHH:MM:SS.fZ` with 1..=6 fraction digits after truncation
///
/// Trailing `Z`s are stripped from the fraction before it is cut to
/// [`MAX_FRACTION_DIGITS`], so `.1234567Z` and `.123456Z` decode identically.
pub fn parse_snapshot_timestamp(s: &str) -> Result<DateTime<Utc>, CoreError> {
    let malformed = || CoreError::MalformedTimestamp(s.to_string());

    let naive = match s.split_once('.') {
        Some((base, frac)) => {
            if frac.contains('.') {
                return Err(malformed());
            }
            let frac: String = frac.trim_end_matches('Z').chars().take(MAX_FRACTION_DIGITS).collect();
            let micros = fraction_micros(&frac).ok_or_else(malformed)?;
            let base = NaiveDateTime::parse_from_str(base, BASE_FORMAT).map_err(|_| malformed())?;
            base + Duration::microseconds(micros)
        }
        None => NaiveDateTime::parse_from_str(s, WHOLE_SECONDS_FORMAT).map_err(|_| malformed())?,
    };

    Ok(naive.and_utc())
}

/// `"5"` is 500000us, `"000001"` is 1us.
fn fraction_micros(frac: &str) -> Option<i64> {
    if frac.is_empty() || !frac.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    format!("{frac:0<width$}", width = MAX_FRACTION_DIGITS).parse().ok()
}

/// Retention cutoff: snapshots strictly older than this are eligible.
///
/// Fails when `now - days` falls outside the representable date range.
pub fn cutoff_from_days(now: DateTime<Utc>, days: u32) -> Result<DateTime<Utc>, CoreError> {
    Duration::try_days(i64::from(days))
        .and_then(|d| now.checked_sub_signed(d))
        .ok_or(CoreError::CutoffOutOfRange(days))
}
