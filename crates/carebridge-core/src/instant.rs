use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;

use crate::error::CoreError;

/// An RFC 3339 instant as carried in resource `meta.lastUpdated` and
/// date-valued search parameters.
///
/// Wraps [`time::OffsetDateTime`] and serializes to/from the RFC 3339 string
/// form used on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FhirInstant(pub OffsetDateTime);

impl FhirInstant {
    pub fn new(inner: OffsetDateTime) -> Self {
        Self(inner)
    }

    /// Current instant in UTC.
    pub fn now() -> Self {
        Self(OffsetDateTime::now_utc())
    }

    /// Parse an instant, accepting either a full RFC 3339 timestamp or a
    /// bare `YYYY-MM-DD` date (interpreted as midnight UTC).
    ///
    /// Search parameters routinely carry date-only values; `meta.lastUpdated`
    /// itself is always a full timestamp.
    pub fn parse_lenient(s: &str) -> Result<Self, CoreError> {
        if let Ok(instant) = s.parse::<FhirInstant>() {
            return Ok(instant);
        }
        let date_only = format_description!("[year]-[month]-[day]");
        time::Date::parse(s, &date_only)
            .map(|d| Self(d.midnight().assume_utc()))
            .map_err(|_| CoreError::invalid_instant(s))
    }

    pub fn inner(&self) -> OffsetDateTime {
        self.0
    }
}

impl fmt::Display for FhirInstant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let formatted = self.0.format(&Rfc3339).map_err(|_| fmt::Error)?;
        f.write_str(&formatted)
    }
}

impl FromStr for FhirInstant {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OffsetDateTime::parse(s, &Rfc3339)
            .map(FhirInstant)
            .map_err(CoreError::from)
    }
}

impl Serialize for FhirInstant {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let formatted = self
            .0
            .format(&Rfc3339)
            .map_err(|e| serde::ser::Error::custom(format!("invalid instant: {e}")))?;
        serializer.serialize_str(&formatted)
    }
}

impl<'de> Deserialize<'de> for FhirInstant {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Current instant in UTC.
pub fn now_utc() -> FhirInstant {
    FhirInstant::now()
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_display_round_trip() {
        let instant = FhirInstant(datetime!(2024-03-15 10:30:00 UTC));
        let text = instant.to_string();
        assert_eq!(text, "2024-03-15T10:30:00Z");
        assert_eq!(text.parse::<FhirInstant>().unwrap(), instant);
    }

    #[test]
    fn test_serde_round_trip() {
        let instant = FhirInstant(datetime!(2024-03-15 10:30:00.5 UTC));
        let json = serde_json::to_string(&instant).unwrap();
        assert_eq!(json, "\"2024-03-15T10:30:00.5Z\"");

        let back: FhirInstant = serde_json::from_str(&json).unwrap();
        assert_eq!(back, instant);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("yesterday".parse::<FhirInstant>().is_err());
        assert!("2024-03-15".parse::<FhirInstant>().is_err());
    }

    #[test]
    fn test_parse_lenient_accepts_date_only() {
        let instant = FhirInstant::parse_lenient("2024-03-15").unwrap();
        assert_eq!(instant.0, datetime!(2024-03-15 00:00:00 UTC));

        let full = FhirInstant::parse_lenient("2024-03-15T10:30:00Z").unwrap();
        assert_eq!(full.0, datetime!(2024-03-15 10:30:00 UTC));

        assert!(FhirInstant::parse_lenient("03/15/2024").is_err());
    }

    #[test]
    fn test_ordering() {
        let earlier = FhirInstant(datetime!(2024-01-01 00:00:00 UTC));
        let later = FhirInstant(datetime!(2024-06-01 00:00:00 UTC));
        assert!(earlier < later);
    }

    #[test]
    fn test_now_is_recent() {
        let now = now_utc();
        let reference = OffsetDateTime::now_utc();
        assert!((reference - now.0).whole_seconds().abs() < 5);
    }
}
