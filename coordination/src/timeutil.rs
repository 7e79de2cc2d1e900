//! Timestamp helpers shared by every module that stamps store entries.

use chrono::{DateTime, Utc};

pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Parse a stored RFC3339 timestamp, defaulting to the epoch on failure so
/// a corrupt field degrades to "very old" rather than panicking.
pub fn parse(ts: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(ts)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| DateTime::<Utc>::from_timestamp(0, 0).unwrap())
}

/// An RFC3339 timestamp `secs` seconds in the past. Used by tests (unit and
/// the `coordination/tests/` integration suite) to seed aged session/claim
/// entries without sleeping.
pub fn now_rfc3339_minus_secs(secs: i64) -> String {
    (Utc::now() - chrono::Duration::seconds(secs)).to_rfc3339()
}
