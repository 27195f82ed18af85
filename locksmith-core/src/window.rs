//! Daily reboot windows.
//!
//! A window is a start time-of-day plus a length. Scheduling is a pure
//! function of the supplied clock reading, so callers own the clock.

use std::fmt;
use std::time::Duration;

use chrono::{NaiveDateTime, NaiveTime, TimeDelta};

use crate::error::ConfigError;

const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Recurring daily range during which reboots are permitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RebootWindow {
    start: NaiveTime,
    length: Duration,
}

impl RebootWindow {
    /// Build a window; the length must be in `(0, 24h]`.
    pub fn new(start: NaiveTime, length: Duration) -> Result<Self, ConfigError> {
        if length.is_zero() || length > DAY {
            return Err(ConfigError::WindowLength {
                value: format_duration(length),
                reason: "must be greater than zero and at most 24h".to_string(),
            });
        }
        Ok(Self { start, length })
    }

    /// Parse `HH:MM[:SS]` and a duration such as `1h30m`.
    pub fn parse(start: &str, length: &str) -> Result<Self, ConfigError> {
        let start_time = parse_time_of_day(start)?;
        let length_value = parse_duration(length).map_err(|reason| ConfigError::WindowLength {
            value: length.to_string(),
            reason,
        })?;
        Self::new(start_time, length_value)
    }

    /// Resolve the optional pair of window settings.
    ///
    /// Empty strings count as unset. Exactly one of the two being set is an
    /// error; neither means no window restriction.
    pub fn from_settings(
        start: Option<&str>,
        length: Option<&str>,
    ) -> Result<Option<Self>, ConfigError> {
        let start = start.map(str::trim).filter(|s| !s.is_empty());
        let length = length.map(str::trim).filter(|s| !s.is_empty());
        match (start, length) {
            (None, None) => Ok(None),
            (Some(start), Some(length)) => Self::parse(start, length).map(Some),
            _ => Err(ConfigError::PartialWindow),
        }
    }

    pub fn start(&self) -> NaiveTime {
        self.start
    }

    pub fn length(&self) -> Duration {
        self.length
    }

    /// How long to wait from `now` until the window is open.
    ///
    /// Zero when `now` is inside `[start, start + length)` of either today's
    /// or yesterday's occurrence, which covers windows crossing midnight.
    pub fn duration_to_start(&self, now: NaiveDateTime) -> Duration {
        let length = TimeDelta::milliseconds(self.length.as_millis() as i64);
        let today = now.date().and_time(self.start);
        let yesterday = today - TimeDelta::days(1);

        for start in [yesterday, today] {
            if now >= start && now < start + length {
                return Duration::ZERO;
            }
        }

        let next = if now < today {
            today
        } else {
            today + TimeDelta::days(1)
        };
        (next - now).to_std().unwrap_or_default()
    }
}

impl fmt::Display for RebootWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} for {}",
            self.start.format("%H:%M:%S"),
            format_duration(self.length)
        )
    }
}

fn parse_time_of_day(value: &str) -> Result<NaiveTime, ConfigError> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|source| ConfigError::WindowStart {
            value: value.to_string(),
            source,
        })
}

/// Parse a Go-style duration: one or more `<number><unit>` terms with units
/// `h`, `m`, `s` or `ms`, e.g. `1h30m`, `90m`, `1.5h`.
pub fn parse_duration(value: &str) -> Result<Duration, String> {
    let value = value.trim();
    if value.is_empty() {
        return Err("empty duration".to_string());
    }

    let mut total_ms = 0f64;
    let mut rest = value;
    while !rest.is_empty() {
        let number_end = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if number_end == 0 {
            return Err(format!("expected a number at {rest:?}"));
        }
        let number: f64 = rest[..number_end]
            .parse()
            .map_err(|_| format!("invalid number {:?}", &rest[..number_end]))?;
        rest = &rest[number_end..];

        let unit_end = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let scale = match &rest[..unit_end] {
            "h" => 3_600_000.0,
            "m" => 60_000.0,
            "s" => 1_000.0,
            "ms" => 1.0,
            "" => return Err(format!("missing unit in {value:?}")),
            other => return Err(format!("unknown unit {other:?} in {value:?}")),
        };
        rest = &rest[unit_end..];
        total_ms += number * scale;
    }

    Ok(Duration::from_millis(total_ms.round() as u64))
}

/// Render a duration the way [`parse_duration`] accepts it.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    let mut out = String::new();
    if h > 0 {
        out.push_str(&format!("{h}h"));
    }
    if m > 0 {
        out.push_str(&format!("{m}m"));
    }
    if s > 0 || out.is_empty() {
        out.push_str(&format!("{s}s"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_compound_durations() {
        assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_duration("1h30m").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_duration("90s").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_duration("1.5h").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
    }

    #[test]
    fn rejects_malformed_durations() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("10").is_err());
        assert!(parse_duration("h").is_err());
        assert!(parse_duration("3d").is_err());
        assert!(parse_duration("1..5h").is_err());
    }

    #[test]
    fn formats_durations_compactly() {
        assert_eq!(format_duration(Duration::from_secs(5400)), "1h30m");
        assert_eq!(format_duration(Duration::from_secs(45)), "45s");
        assert_eq!(format_duration(Duration::ZERO), "0s");
    }
}
