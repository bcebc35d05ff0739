//! Named durations and the expiry times derived from them

use crate::error::{Result, SecurityError};
use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;
use warrant_common::SharedClock;
use warrant_token::TimestampFormat;

/// Duration used for unknown keys and unparsable values.
pub const DEFAULT_DURATION: Duration = Duration::minutes(60);

const SUFFIX: &str = "_duration";

/// Parse a duration written as a sequence of decimal numbers with units,
/// such as `"300ms"`, `"1.5h"` or `"2h45m"`.
///
/// Valid units are `ns`, `us` (or `µs`), `ms`, `s`, `m` and `h`. A leading
/// sign is allowed and a bare `"0"` needs no unit.
///
/// # Errors
/// Returns [`SecurityError::InvalidDuration`] for anything else, including
/// values that overflow.
pub fn parse_duration(value: &str) -> Result<Duration> {
    let invalid = || SecurityError::InvalidDuration(value.to_string());

    let (negative, mut rest) = match value.as_bytes().first() {
        Some(b'-') => (true, &value[1..]),
        Some(b'+') => (false, &value[1..]),
        _ => (false, value),
    };
    if rest == "0" {
        return Ok(Duration::zero());
    }
    if rest.is_empty() {
        return Err(invalid());
    }

    let mut nanos: i128 = 0;
    while !rest.is_empty() {
        let number_end = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        let (number, tail) = rest.split_at(number_end);
        let unit_end = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_end);

        let scale = unit_nanos(unit).ok_or_else(invalid)?;
        let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
        if whole.is_empty() && fraction.is_empty() {
            return Err(invalid());
        }

        let whole: i128 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid())?
        };
        let mut part = whole.checked_mul(scale).ok_or_else(invalid)?;
        if !fraction.is_empty() {
            let fraction: f64 = format!("0.{fraction}").parse().map_err(|_| invalid())?;
            part += (fraction * scale as f64) as i128;
        }
        nanos = nanos.checked_add(part).ok_or_else(invalid)?;
        rest = tail;
    }

    let nanos = i64::try_from(nanos).map_err(|_| invalid())?;
    let duration = Duration::nanoseconds(nanos);
    Ok(if negative { -duration } else { duration })
}

fn unit_nanos(unit: &str) -> Option<i128> {
    match unit {
        "ns" => Some(1),
        "us" | "\u{b5}s" | "\u{3bc}s" => Some(1_000),
        "ms" => Some(1_000_000),
        "s" => Some(1_000_000_000),
        "m" => Some(60 * 1_000_000_000),
        "h" => Some(3_600 * 1_000_000_000),
        _ => None,
    }
}

fn normalize(key: &str) -> String {
    let key = key.to_ascii_lowercase();
    match key.strip_suffix(SUFFIX) {
        Some(stripped) => stripped.to_string(),
        None => key,
    }
}

/// Table of named durations, used to pick `exp` values and max ages.
///
/// Keys are case-insensitive and a trailing `_duration` is ignored, so
/// `"send_reset"`, `"SEND_RESET"` and `"send_reset_duration"` name the same
/// entry.
#[derive(Debug, Clone)]
pub struct Times {
    values: BTreeMap<String, Duration>,
    format: TimestampFormat,
    clock: SharedClock,
}

impl Times {
    /// Build from `(name, duration string)` pairs.
    ///
    /// Unparsable values are kept as [`DEFAULT_DURATION`].
    pub fn new<I, K, V>(settings: I, format: TimestampFormat, clock: SharedClock) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let values = settings
            .into_iter()
            .map(|(key, value)| {
                let duration = parse_duration(value.as_ref()).unwrap_or_else(|err| {
                    tracing::warn!(key = key.as_ref(), error = %err, "using default duration");
                    DEFAULT_DURATION
                });
                (normalize(key.as_ref()), duration)
            })
            .collect();
        Self {
            values,
            format,
            clock,
        }
    }

    /// Duration named `key`, or [`DEFAULT_DURATION`].
    #[must_use]
    pub fn duration(&self, key: &str) -> Duration {
        self.values
            .get(&normalize(key))
            .copied()
            .unwrap_or(DEFAULT_DURATION)
    }

    /// Now plus the duration named `key`.
    #[must_use]
    pub fn expires(&self, key: &str) -> DateTime<Utc> {
        self.expires_at(key, self.clock.now())
    }

    /// `now` plus the duration named `key`.
    #[must_use]
    pub fn expires_at(&self, key: &str, now: DateTime<Utc>) -> DateTime<Utc> {
        now + self.duration(key)
    }

    /// [`Times::expires`] rendered with the configured timestamp layout.
    ///
    /// # Errors
    /// Returns the token engine's formatting error if the instant cannot be
    /// rendered.
    pub fn expiration(&self, key: &str) -> Result<String> {
        Ok(self.format.format(self.expires(key))?)
    }

    /// Timestamp layout used by [`Times::expiration`].
    #[must_use]
    pub fn format(&self) -> &TimestampFormat {
        &self.format
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use warrant_common::ManualClock;

    #[test]
    fn test_parse_duration_notation() {
        let cases = [
            ("0", Duration::zero()),
            ("5m", Duration::minutes(5)),
            ("12h", Duration::hours(12)),
            ("1h30m", Duration::minutes(90)),
            ("1.5h", Duration::minutes(90)),
            (".5s", Duration::milliseconds(500)),
            ("250ms", Duration::milliseconds(250)),
            ("10us", Duration::microseconds(10)),
            ("10\u{b5}s", Duration::microseconds(10)),
            ("7ns", Duration::nanoseconds(7)),
            ("-90s", Duration::seconds(-90)),
            ("+2m", Duration::minutes(2)),
        ];
        for (input, expected) in cases {
            assert_eq!(parse_duration(input).unwrap(), expected, "{input}");
        }
    }

    #[test]
    fn test_parse_duration_rejects() {
        for input in ["", "-", "10", "h", "1d", "1.2.3s", "invalid", "5 m", "."] {
            assert!(
                matches!(parse_duration(input), Err(SecurityError::InvalidDuration(_))),
                "{input}"
            );
        }
        assert!(parse_duration("99999999999999999999h").is_err());
    }

    #[test]
    fn test_invalid_duration_falls_back_to_an_hour() {
        let times = Times::new(
            [("send_reset", "invalid")],
            TimestampFormat::default(),
            warrant_common::SystemClock::shared(),
        );
        assert_eq!(times.duration("send_reset"), Duration::hours(1));
    }

    #[test]
    fn test_times_lookup_and_expiration() {
        let start = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let times = Times::new(
            [("SEND_RESET_DURATION", "60h"), ("leased_token", "5m"), ("broken", "soon")],
            TimestampFormat::default(),
            Arc::new(ManualClock::new(start)),
        );

        assert_eq!(times.duration("send_reset"), Duration::hours(60));
        assert_eq!(times.duration("LEASED_TOKEN_DURATION"), Duration::minutes(5));
        assert_eq!(times.duration("broken"), DEFAULT_DURATION);
        assert_eq!(times.duration("missing"), DEFAULT_DURATION);

        assert_eq!(times.expires("leased_token"), start + Duration::minutes(5));
        assert_eq!(
            times.expiration("leased_token").unwrap(),
            "2023-11-14T22:18:20+0000"
        );
    }
}
