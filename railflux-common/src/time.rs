//! Utilities to deal with timestamps in the precision configured for the metrics backend.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The precision in which point timestamps are transmitted.
///
/// Serialized with the short names understood by the metrics backend: `s`, `ms`, `u` and `ns`.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum TimePrecision {
    /// Full seconds since the UNIX epoch.
    #[default]
    Seconds,
    /// Milliseconds since the UNIX epoch.
    Milliseconds,
    /// Microseconds since the UNIX epoch.
    Microseconds,
    /// Nanoseconds since the UNIX epoch.
    Nanoseconds,
}

impl TimePrecision {
    /// Returns the short name of this precision.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Seconds => "s",
            Self::Milliseconds => "ms",
            Self::Microseconds => "u",
            Self::Nanoseconds => "ns",
        }
    }

    /// Converts a point in time into an integer timestamp of this precision.
    ///
    /// Nanosecond timestamps saturate outside of the range representable in an `i64`
    /// (roughly the years 1677 to 2262).
    ///
    /// # Example
    ///
    /// ```
    /// use chrono::{TimeZone, Utc};
    /// use railflux_common::TimePrecision;
    ///
    /// let time = Utc.timestamp_opt(1_517_567_370, 0).unwrap();
    /// assert_eq!(TimePrecision::Milliseconds.convert(time), 1_517_567_370_000);
    /// ```
    pub fn convert(self, time: DateTime<Utc>) -> i64 {
        match self {
            Self::Seconds => time.timestamp(),
            Self::Milliseconds => time.timestamp_millis(),
            Self::Microseconds => time.timestamp_micros(),
            Self::Nanoseconds => time.timestamp_nanos_opt().unwrap_or(if time.timestamp() < 0 {
                i64::MIN
            } else {
                i64::MAX
            }),
        }
    }

    /// Returns the current time in this precision.
    #[inline]
    pub fn now(self) -> i64 {
        self.convert(Utc::now())
    }
}

impl fmt::Display for TimePrecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error returned when parsing an unknown [`TimePrecision`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ParseTimePrecisionError(String);

impl fmt::Display for ParseTimePrecisionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown time precision `{}`", self.0)
    }
}

impl std::error::Error for ParseTimePrecisionError {}

impl FromStr for TimePrecision {
    type Err = ParseTimePrecisionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "s" => Self::Seconds,
            "ms" => Self::Milliseconds,
            "u" | "us" | "µs" => Self::Microseconds,
            "n" | "ns" => Self::Nanoseconds,
            other => return Err(ParseTimePrecisionError(other.to_owned())),
        })
    }
}

impl Serialize for TimePrecision {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TimePrecision {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let string = Cow::<str>::deserialize(deserializer)?;
        string.parse().map_err(serde::de::Error::custom)
    }
}

/// Returns the elapsed time between `start` and `end` in milliseconds, rounded up.
///
/// Clock skew can produce an `end` before `start`, in which case the duration is `0`.
pub fn duration_millis(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    let micros = (end - start).num_microseconds().unwrap_or(i64::MAX).max(0);
    micros.saturating_add(999) / 1000
}
