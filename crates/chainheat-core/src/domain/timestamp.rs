use std::fmt::{Display, Formatter};

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::format_description::well_known::Rfc3339;
use time::format_description::FormatItem;
use time::macros::format_description;
use time::{Date, Duration, OffsetDateTime, PrimitiveDateTime, UtcOffset};

use crate::ValidationError;

const DIR_FORMAT: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day]-[hour]-[minute]-[second]");

const DATE_FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// RFC3339 UTC instant at which a chain snapshot was captured.
///
/// The cache additionally uses a second-precision directory form
/// (`YYYY-MM-DD-HH-MM-SS`) whose fixed width makes lexicographic order equal
/// to chronological order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CaptureTime(OffsetDateTime);

impl CaptureTime {
    pub fn now() -> Self {
        Self(OffsetDateTime::now_utc())
    }

    /// The instant `days` calendar days before now. Used by age-based cache
    /// eviction.
    pub fn days_ago(days: i64) -> Self {
        Self(OffsetDateTime::now_utc() - Duration::days(days))
    }

    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let parsed = OffsetDateTime::parse(input, &Rfc3339).map_err(|_| {
            ValidationError::TimestampNotUtc {
                value: input.to_owned(),
            }
        })?;

        Self::from_offset_datetime(parsed).map_err(|_| ValidationError::TimestampNotUtc {
            value: input.to_owned(),
        })
    }

    pub fn from_offset_datetime(value: OffsetDateTime) -> Result<Self, ValidationError> {
        if value.offset() != UtcOffset::UTC {
            return Err(ValidationError::TimestampNotUtc {
                value: value
                    .format(&Rfc3339)
                    .unwrap_or_else(|_| String::from("<unformattable>")),
            });
        }

        Ok(Self(value))
    }

    pub fn into_inner(self) -> OffsetDateTime {
        self.0
    }

    pub fn format_rfc3339(self) -> String {
        self.0
            .format(&Rfc3339)
            .expect("CaptureTime must be RFC3339 formattable")
    }

    /// Second-precision name used for cache entry directories.
    pub fn dir_name(self) -> String {
        self.0
            .format(DIR_FORMAT)
            .expect("CaptureTime must be directory formattable")
    }

    /// Parse a cache directory name back into an instant.
    pub fn parse_dir_name(input: &str) -> Result<Self, ValidationError> {
        PrimitiveDateTime::parse(input, DIR_FORMAT)
            .map(|dt| Self(dt.assume_utc()))
            .map_err(|_| ValidationError::BadCacheTimestamp {
                value: input.to_owned(),
            })
    }

    /// Time elapsed between this instant and `now`.
    pub fn elapsed_since(self, now: Self) -> Duration {
        now.0 - self.0
    }
}

impl Display for CaptureTime {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.format_rfc3339())
    }
}

impl Serialize for CaptureTime {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.format_rfc3339())
    }
}

impl<'de> Deserialize<'de> for CaptureTime {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Self::parse(&value).map_err(D::Error::custom)
    }
}

/// Calendar expiration date of a contract, serialized as `YYYY-MM-DD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ExpiryDate(Date);

impl ExpiryDate {
    pub const fn new(date: Date) -> Self {
        Self(date)
    }

    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        Date::parse(input, DATE_FORMAT)
            .map(Self)
            .map_err(|_| ValidationError::BadExpirationDate {
                value: input.to_owned(),
            })
    }

    pub const fn date(self) -> Date {
        self.0
    }

    /// Whole calendar days between `today` and this expiration. Negative for
    /// already-expired contracts.
    pub fn dte(self, today: Date) -> i64 {
        (self.0 - today).whole_days()
    }
}

impl Display for ExpiryDate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let formatted = self
            .0
            .format(DATE_FORMAT)
            .expect("ExpiryDate must be formattable");
        f.write_str(&formatted)
    }
}

impl Serialize for ExpiryDate {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ExpiryDate {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Self::parse(&value).map_err(D::Error::custom)
    }
}
