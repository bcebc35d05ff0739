//! Timestamp claim formatting
//!
//! Time-bound claims travel as strings rendered with a strftime-style layout,
//! not as numeric epochs. The layout used at issue time is carried in the
//! `timestamp_format` claim so the parser can read the values back.

use crate::error::{TokenError, TokenResult};
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, NaiveDateTime, Utc};
use std::fmt::Write as _;

/// Layout used when a token carries no `timestamp_format` claim.
pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%z";

/// Instant every layout must render and read back, to the minute.
const SAMPLE_INSTANT: i64 = 1_700_000_017;

/// Validated timestamp layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampFormat(String);

impl TimestampFormat {
    /// Validate `layout`.
    ///
    /// # Errors
    /// Returns [`TokenError::InvalidTimestampFormat`] if the layout contains
    /// a specifier chrono cannot render, renders nothing at all, or loses
    /// more than the seconds of an instant when read back. A layout that
    /// cannot be read back would leave `exp` and `nbf` unenforceable.
    pub fn new(layout: impl Into<String>) -> TokenResult<Self> {
        let layout = layout.into();
        let items: Vec<Item<'_>> = StrftimeItems::new(&layout).collect();
        if items.is_empty() || items.iter().any(|item| matches!(item, Item::Error)) {
            return Err(TokenError::InvalidTimestampFormat(layout));
        }

        let format = Self(layout);
        let sample = DateTime::from_timestamp(SAMPLE_INSTANT, 0)
            .ok_or_else(|| TokenError::InvalidTimestampFormat(format.0.clone()))?;
        let rendered = format.format(sample)?;
        match parse_timestamp(&rendered, format.as_str()) {
            Some(parsed) if parsed.timestamp().div_euclid(60) == sample.timestamp().div_euclid(60) => {
                Ok(format)
            }
            _ => Err(TokenError::InvalidTimestampFormat(format.0)),
        }
    }

    /// Layout string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Render `at` with this layout.
    ///
    /// # Errors
    /// Returns [`TokenError::InvalidTimestampFormat`] if rendering fails,
    /// which a validated layout only does for out-of-range values.
    pub fn format(&self, at: DateTime<Utc>) -> TokenResult<String> {
        let mut rendered = String::new();
        write!(rendered, "{}", at.format(&self.0))
            .map_err(|_| TokenError::InvalidTimestampFormat(self.0.clone()))?;
        Ok(rendered)
    }
}

impl Default for TimestampFormat {
    fn default() -> Self {
        Self(DEFAULT_TIMESTAMP_FORMAT.to_string())
    }
}

/// Parse a timestamp claim written with `layout`.
///
/// Layouts carrying an offset are honoured; layouts without one are read as
/// UTC. Returns `None` when the value does not match the layout.
#[must_use]
pub fn parse_timestamp(value: &str, layout: &str) -> Option<DateTime<Utc>> {
    if let Ok(with_offset) = DateTime::parse_from_str(value, layout) {
        return Some(with_offset.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, layout)
        .ok()
        .map(|naive| naive.and_utc())
}
