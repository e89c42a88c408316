// ABOUTME: Timestamp identifiers for releases in YYYYMMDDHHMMSS form.
// ABOUTME: Lexicographic order equals chronological order, so ids sort as strings.

use chrono::{DateTime, Duration, NaiveDateTime, TimeZone};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;

/// chrono format string for release identifiers.
pub const RELEASE_FORMAT: &str = "%Y%m%d%H%M%S";

#[derive(Debug, Error)]
pub enum ReleaseIdError {
    #[error("release id must be 14 digits, got '{0}'")]
    InvalidFormat(String),

    #[error("release id is not a valid timestamp: '{0}'")]
    InvalidTimestamp(String),
}

/// A release identifier, e.g. `20240131235959`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReleaseId(String);

impl ReleaseId {
    pub fn parse(value: &str) -> Result<Self, ReleaseIdError> {
        let value = value.trim();
        if value.len() != 14 || !value.chars().all(|c| c.is_ascii_digit()) {
            return Err(ReleaseIdError::InvalidFormat(value.to_string()));
        }

        NaiveDateTime::parse_from_str(value, RELEASE_FORMAT)
            .map_err(|_| ReleaseIdError::InvalidTimestamp(value.to_string()))?;

        Ok(Self(value.to_string()))
    }

    /// Format a wall-clock time as a release id.
    pub fn from_datetime<Tz: TimeZone>(time: &DateTime<Tz>) -> Self
    where
        Tz::Offset: fmt::Display,
    {
        Self(time.format(RELEASE_FORMAT).to_string())
    }

    /// The id one second after this one.
    pub fn next(&self) -> Self {
        let time = NaiveDateTime::parse_from_str(&self.0, RELEASE_FORMAT)
            .expect("ReleaseId is validated on construction");
        Self((time + Duration::seconds(1)).format(RELEASE_FORMAT).to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReleaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for ReleaseId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ReleaseId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Self::parse(&value).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn parses_fourteen_digit_timestamps() {
        let id = ReleaseId::parse("20240131235959").unwrap();
        assert_eq!(id.as_str(), "20240131235959");
    }

    #[test]
    fn rejects_malformed_ids() {
        assert!(ReleaseId::parse("2024").is_err());
        assert!(ReleaseId::parse("2024013123595a").is_err());
        assert!(matches!(
            ReleaseId::parse("20241399000000"),
            Err(ReleaseIdError::InvalidTimestamp(_))
        ));
    }

    #[test]
    fn next_rolls_over_minutes_and_days() {
        let id = ReleaseId::parse("20231231235959").unwrap();
        assert_eq!(id.next().as_str(), "20240101000000");
    }

    #[test]
    fn ordering_is_chronological() {
        let older = ReleaseId::parse("20240101000000").unwrap();
        let newer = ReleaseId::parse("20240101000001").unwrap();
        assert!(older < newer);
        assert!(older.next() == newer);
    }

    #[test]
    fn from_datetime_uses_release_format() {
        let id = ReleaseId::from_datetime(&Utc::now());
        assert!(ReleaseId::parse(id.as_str()).is_ok());
    }
}
