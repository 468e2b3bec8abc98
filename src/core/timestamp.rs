//! Timestamp formats for appender output

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Timestamp format options selectable per appender.
///
/// Configuration names: `iso8601`, `iso8601_micros`, `rfc3339`, `unix`,
/// `unix_millis`, `unix_micros`; any value containing `%` is taken as a
/// strftime pattern.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimestampFormat {
    /// `2025-01-08T10:30:45.123Z`
    #[default]
    Iso8601,
    /// `2025-01-08T10:30:45.123456Z`
    Iso8601Micros,
    /// `2025-01-08T10:30:45+00:00`
    Rfc3339,
    /// Seconds since the epoch
    Unix,
    UnixMillis,
    UnixMicros,
    /// strftime pattern
    Custom(String),
}

impl TimestampFormat {
    #[must_use]
    pub fn format(&self, datetime: &DateTime<Utc>) -> String {
        match self {
            TimestampFormat::Iso8601 => datetime.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
            TimestampFormat::Iso8601Micros => datetime.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string(),
            TimestampFormat::Rfc3339 => datetime.to_rfc3339(),
            TimestampFormat::Unix => datetime.timestamp().to_string(),
            TimestampFormat::UnixMillis => datetime.timestamp_millis().to_string(),
            TimestampFormat::UnixMicros => datetime.timestamp_micros().to_string(),
            TimestampFormat::Custom(format_str) => datetime.format(format_str).to_string(),
        }
    }

    /// Unix-based formats render as JSON numbers
    #[must_use]
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            TimestampFormat::Unix | TimestampFormat::UnixMillis | TimestampFormat::UnixMicros
        )
    }
}

impl FromStr for TimestampFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.contains('%') {
            return Ok(TimestampFormat::Custom(s.to_string()));
        }
        match s.trim().to_lowercase().as_str() {
            "iso8601" => Ok(TimestampFormat::Iso8601),
            "iso8601_micros" => Ok(TimestampFormat::Iso8601Micros),
            "rfc3339" => Ok(TimestampFormat::Rfc3339),
            "unix" => Ok(TimestampFormat::Unix),
            "unix_millis" => Ok(TimestampFormat::UnixMillis),
            "unix_micros" => Ok(TimestampFormat::UnixMicros),
            _ => Err(format!("Invalid timestamp format: '{}'", s)),
        }
    }
}
