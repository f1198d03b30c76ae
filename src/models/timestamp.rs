use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, SubsecRound, Utc};

/// Precision kept by the store. Every instant is cut to this before use.
const STORED_SUBSEC_DIGITS: u16 = 3;

/// Fixed-width UTC text used in the store, so lexical order matches time order.
pub fn to_store(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Current time at store precision.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(STORED_SUBSEC_DIGITS)
}

pub fn from_store(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(s).map(|dt| dt.with_timezone(&Utc))
}

/// Parses a client-supplied timestamp. Values without an offset are taken as UTC;
/// sub-millisecond digits are dropped.
pub fn parse_input(s: &str) -> Option<DateTime<Utc>> {
    parse_any(s.trim()).map(|dt| dt.trunc_subsecs(STORED_SUBSEC_DIGITS))
}

fn parse_any(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
