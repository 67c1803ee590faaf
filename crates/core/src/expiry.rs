//! Expiry normalisation shared by the cache and the lock
//!
//! Callers may describe an expiry as an absolute timestamp, a millisecond
//! offset, a [`Duration`] or a relative time string such as `"90s"` or
//! `"1h 30m"`. Everything is resolved against a single `now` into an
//! absolute UTC timestamp before it reaches a storage driver.

use crate::errors::{Error, Result};
use chrono::{DateTime, TimeDelta, Utc};
use std::fmt;
use std::time::Duration;

/// A requested expiry, not yet resolved against the clock
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expiry {
    /// Absolute point in time
    At(DateTime<Utc>),
    /// Offset in milliseconds from now; negative offsets are in the past
    Millis(i64),
    /// Offset from now
    In(Duration),
    /// Relative time string parsed with `humantime` (e.g. `"10m"`, `"2h 5s"`)
    Relative(String),
}

impl Expiry {
    /// Resolve to an absolute timestamp relative to `now`
    ///
    /// Fails with [`Error::InvalidExpiry`] when the string cannot be parsed or
    /// the resolved point is not after `now`.
    pub fn resolve_at(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
        let resolved = match self {
            Expiry::At(at) => *at,
            Expiry::Millis(ms) => now
                .checked_add_signed(TimeDelta::milliseconds(*ms))
                .ok_or_else(|| Error::invalid_expiry(self.to_string(), "offset out of range"))?,
            Expiry::In(duration) => add_duration(now, *duration)
                .ok_or_else(|| Error::invalid_expiry(self.to_string(), "offset out of range"))?,
            Expiry::Relative(text) => {
                let duration = parse_relative(text)?;
                add_duration(now, duration)
                    .ok_or_else(|| Error::invalid_expiry(text.clone(), "offset out of range"))?
            }
        };

        if resolved <= now {
            return Err(Error::invalid_expiry(
                self.to_string(),
                format!("resolves to {} which is not in the future", resolved.to_rfc3339()),
            ));
        }

        Ok(resolved)
    }

    /// Resolve against the current clock
    pub fn resolve(&self) -> Result<DateTime<Utc>> {
        self.resolve_at(Utc::now())
    }
}

impl fmt::Display for Expiry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expiry::At(at) => write!(f, "{}", at.to_rfc3339()),
            Expiry::Millis(ms) => write!(f, "{ms}ms"),
            Expiry::In(duration) => write!(f, "{}", humantime::format_duration(*duration)),
            Expiry::Relative(text) => write!(f, "{text}"),
        }
    }
}

impl From<DateTime<Utc>> for Expiry {
    fn from(at: DateTime<Utc>) -> Self {
        Expiry::At(at)
    }
}

impl From<Duration> for Expiry {
    fn from(duration: Duration) -> Self {
        Expiry::In(duration)
    }
}

impl From<i64> for Expiry {
    fn from(ms: i64) -> Self {
        Expiry::Millis(ms)
    }
}

impl From<&str> for Expiry {
    fn from(text: &str) -> Self {
        Expiry::Relative(text.to_string())
    }
}

impl From<String> for Expiry {
    fn from(text: String) -> Self {
        Expiry::Relative(text)
    }
}

/// Parse a relative time string, accepting a plain integer as milliseconds
pub fn parse_relative(text: &str) -> Result<Duration> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(Error::invalid_expiry(text, "empty relative time"));
    }
    if let Ok(ms) = trimmed.parse::<u64>() {
        return Ok(Duration::from_millis(ms));
    }
    humantime::parse_duration(trimmed).map_err(|e| Error::invalid_expiry(text, e.to_string()))
}

/// Add a std duration to a UTC timestamp without panicking on overflow
pub fn add_duration(at: DateTime<Utc>, duration: Duration) -> Option<DateTime<Utc>> {
    let delta = TimeDelta::from_std(duration).ok()?;
    at.checked_add_signed(delta)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_millis_offset() {
        let now = fixed_now();
        let at = Expiry::Millis(1500).resolve_at(now).unwrap();
        assert_eq!(at - now, TimeDelta::milliseconds(1500));
    }

    #[test]
    fn test_relative_string() {
        let now = fixed_now();
        let at = Expiry::from("1h 30m").resolve_at(now).unwrap();
        assert_eq!(at - now, TimeDelta::minutes(90));

        let at = Expiry::from("250").resolve_at(now).unwrap();
        assert_eq!(at - now, TimeDelta::milliseconds(250));
    }

    #[test]
    fn test_past_expiry_rejected() {
        let now = fixed_now();
        let past = now - TimeDelta::seconds(1);

        assert!(matches!(
            Expiry::At(past).resolve_at(now),
            Err(Error::InvalidExpiry { .. })
        ));
        assert!(matches!(
            Expiry::Millis(-10).resolve_at(now),
            Err(Error::InvalidExpiry { .. })
        ));
        assert!(matches!(
            Expiry::In(Duration::ZERO).resolve_at(now),
            Err(Error::InvalidExpiry { .. })
        ));
    }

    #[test]
    fn test_unparsable_relative_string() {
        let error = Expiry::from("soonish").resolve_at(fixed_now()).unwrap_err();
        assert!(matches!(error, Error::InvalidExpiry { ref input, .. } if input == "soonish"));
    }
}
