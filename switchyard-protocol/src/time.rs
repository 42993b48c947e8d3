use std::fmt;
use std::str::FromStr;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// A point in time as milliseconds elapsed since 1970-01-01 00:00 UTC.
#[derive(Clone, Copy, Eq, Hash, Ord, PartialEq, PartialOrd, Deserialize, Serialize)]
pub struct UnixMillis(u64);

impl UnixMillis {
    /// Creates a timestamp from the given number of milliseconds.
    pub fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// Creates a timestamp from the given system time.
    pub fn from_system(time: SystemTime) -> Self {
        let millis = time
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();

        Self(u64::try_from(millis).unwrap_or(u64::MAX))
    }

    /// Creates a timestamp from a value expressed in units of the given precision.
    pub fn from_precision(value: u64, precision: Precision) -> Self {
        Self(match precision {
            Precision::Nanoseconds => value / 1_000_000,
            Precision::Microseconds => value / 1_000,
            Precision::Milliseconds => value,
            Precision::Seconds => value.saturating_mul(1_000),
        })
    }

    /// Returns the current timestamp.
    #[inline]
    pub fn now() -> Self {
        Self::from_system(SystemTime::now())
    }

    /// Returns the number of milliseconds since the UNIX epoch start.
    pub fn as_millis(self) -> u64 {
        self.0
    }

    /// Returns the timestamp expressed in units of the given precision.
    pub fn in_precision(self, precision: Precision) -> u64 {
        match precision {
            Precision::Nanoseconds => self.0.saturating_mul(1_000_000),
            Precision::Microseconds => self.0.saturating_mul(1_000),
            Precision::Milliseconds => self.0,
            Precision::Seconds => self.0 / 1_000,
        }
    }
}

impl fmt::Debug for UnixMillis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UnixMillis({})", self.0)
    }
}

impl fmt::Display for UnixMillis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Time precision of timestamps in a write request.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    /// Nanoseconds, the backend default when no precision is sent.
    Nanoseconds,
    /// Microseconds.
    Microseconds,
    /// Milliseconds, the resolution of access-log timestamps.
    #[default]
    Milliseconds,
    /// Seconds.
    Seconds,
}

impl Precision {
    /// Returns the short form used in the `precision` query parameter.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Nanoseconds => "n",
            Self::Microseconds => "u",
            Self::Milliseconds => "ms",
            Self::Seconds => "s",
        }
    }
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a precision string is not one of `n`, `u`, `ms`, `s`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
#[error("invalid time precision")]
pub struct ParsePrecisionError;

impl FromStr for Precision {
    type Err = ParsePrecisionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "n" | "ns" | "nanoseconds" => Self::Nanoseconds,
            "u" | "us" | "microseconds" => Self::Microseconds,
            "ms" | "milliseconds" => Self::Milliseconds,
            "s" | "seconds" => Self::Seconds,
            _ => return Err(ParsePrecisionError),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_from_system() {
        let time = SystemTime::UNIX_EPOCH + Duration::from_millis(1_600_000_000_123);
        assert_eq!(UnixMillis::from_system(time).as_millis(), 1_600_000_000_123);
    }

    #[test]
    fn test_before_epoch() {
        let time = SystemTime::UNIX_EPOCH - Duration::from_secs(1);
        assert_eq!(UnixMillis::from_system(time).as_millis(), 0);
    }

    #[test]
    fn test_in_precision() {
        let ts = UnixMillis::from_millis(1_500);
        assert_eq!(ts.in_precision(Precision::Nanoseconds), 1_500_000_000);
        assert_eq!(ts.in_precision(Precision::Microseconds), 1_500_000);
        assert_eq!(ts.in_precision(Precision::Milliseconds), 1_500);
        assert_eq!(ts.in_precision(Precision::Seconds), 1);
    }

    #[test]
    fn test_from_precision() {
        let ts = UnixMillis::from_millis(2_000);
        for precision in [
            Precision::Nanoseconds,
            Precision::Microseconds,
            Precision::Milliseconds,
            Precision::Seconds,
        ] {
            let value = ts.in_precision(precision);
            assert_eq!(UnixMillis::from_precision(value, precision), ts);
        }
    }

    #[test]
    fn test_parse_precision() {
        assert_eq!("ms".parse(), Ok(Precision::Milliseconds));
        assert_eq!("n".parse(), Ok(Precision::Nanoseconds));
        assert_eq!("h".parse::<Precision>(), Err(ParsePrecisionError));
    }
}
