//! Wire encodings shared by the envelope fields

/// ISO-8601 UTC timestamps with millisecond precision: `2026-01-07T09:30:00.125Z`
///
/// Decoding also accepts any RFC 3339 offset and offset-less timestamps
/// (taken as UTC); sub-millisecond digits are truncated.
pub mod iso8601_millis {
    use chrono::{DateTime, NaiveDateTime, SubsecRound, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub const FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

    const NAIVE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

    pub fn serialize<S>(timestamp: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&timestamp.format(FORMAT))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(de::Error::custom)
    }

    /// Parse a wire timestamp
    pub fn parse(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
        let timestamp = match DateTime::parse_from_rfc3339(raw) {
            Ok(dt) => dt.with_timezone(&Utc),
            Err(e) => match NaiveDateTime::parse_from_str(raw, NAIVE_FORMAT) {
                Ok(naive) => naive.and_utc(),
                Err(_) => return Err(e),
            },
        };
        Ok(timestamp.trunc_subsecs(3))
    }
}
