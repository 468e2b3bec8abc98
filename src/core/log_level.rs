//! Log level definitions and the legacy numeric severity mapping

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Legacy numeric severity codes accepted by the module log service.
///
/// Lower codes are more severe. Anything below [`LEGACY_ERROR`] is folded
/// into [`LogLevel::Fatal`]; anything above [`LEGACY_DEBUG`] is trace.
pub const LEGACY_ERROR: i32 = 1;
pub const LEGACY_WARNING: i32 = 2;
pub const LEGACY_INFO: i32 = 3;
pub const LEGACY_DEBUG: i32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[derive(Default)]
pub enum LogLevel {
    Trace = 0,
    Debug = 1,
    #[default]
    Info = 2,
    Warn = 3,
    Error = 4,
    Fatal = 5,
}

impl LogLevel {
    pub const ALL: [LogLevel; 6] = [
        LogLevel::Trace,
        LogLevel::Debug,
        LogLevel::Info,
        LogLevel::Warn,
        LogLevel::Error,
        LogLevel::Fatal,
    ];

    pub fn to_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
            LogLevel::Fatal => "FATAL",
        }
    }

    /// Convert a legacy numeric severity code into a level.
    ///
    /// This is the only place legacy codes are interpreted. Codes below
    /// `LEGACY_ERROR` (including zero and negatives) become `Fatal`.
    pub fn from_legacy_code(code: i32) -> Self {
        match code {
            c if c < LEGACY_ERROR => LogLevel::Fatal,
            LEGACY_ERROR => LogLevel::Error,
            LEGACY_WARNING => LogLevel::Warn,
            LEGACY_INFO => LogLevel::Info,
            LEGACY_DEBUG => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }

    /// Legacy numeric code for this level.
    ///
    /// `Fatal` reports as `LEGACY_ERROR` and `Trace` as one past
    /// `LEGACY_DEBUG`, the closest codes the legacy domain can express.
    pub fn legacy_code(&self) -> i32 {
        match self {
            LogLevel::Fatal | LogLevel::Error => LEGACY_ERROR,
            LogLevel::Warn => LEGACY_WARNING,
            LogLevel::Info => LEGACY_INFO,
            LogLevel::Debug => LEGACY_DEBUG,
            LogLevel::Trace => LEGACY_DEBUG + 1,
        }
    }

    /// Error and Fatal records are never dropped by a saturated async engine.
    #[inline]
    pub fn is_critical(&self) -> bool {
        *self >= LogLevel::Error
    }

    #[cfg(feature = "console")]
    pub fn color_code(&self) -> colored::Color {
        use colored::Color::*;
        match self {
            LogLevel::Trace => BrightBlack,
            LogLevel::Debug => Blue,
            LogLevel::Info => Green,
            LogLevel::Warn => Yellow,
            LogLevel::Error => Red,
            LogLevel::Fatal => BrightRed,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "TRACE" => Ok(LogLevel::Trace),
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARN" | "WARNING" => Ok(LogLevel::Warn),
            "ERROR" => Ok(LogLevel::Error),
            "FATAL" => Ok(LogLevel::Fatal),
            _ => Err(format!("Invalid log level: '{}'", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_boundaries() {
        assert_eq!(LogLevel::from_legacy_code(i32::MIN), LogLevel::Fatal);
        assert_eq!(LogLevel::from_legacy_code(-1), LogLevel::Fatal);
        assert_eq!(LogLevel::from_legacy_code(0), LogLevel::Fatal);
        assert_eq!(LogLevel::from_legacy_code(1), LogLevel::Error);
        assert_eq!(LogLevel::from_legacy_code(2), LogLevel::Warn);
        assert_eq!(LogLevel::from_legacy_code(3), LogLevel::Info);
        assert_eq!(LogLevel::from_legacy_code(4), LogLevel::Debug);
        assert_eq!(LogLevel::from_legacy_code(5), LogLevel::Trace);
        assert_eq!(LogLevel::from_legacy_code(i32::MAX), LogLevel::Trace);
    }

    #[test]
    fn test_legacy_code_inverse() {
        for level in [LogLevel::Error, LogLevel::Warn, LogLevel::Info, LogLevel::Debug, LogLevel::Trace] {
            assert_eq!(LogLevel::from_legacy_code(level.legacy_code()), level);
        }
        // Fatal has no code of its own
        assert_eq!(LogLevel::from_legacy_code(LogLevel::Fatal.legacy_code()), LogLevel::Error);
    }

    #[test]
    fn test_parse() {
        assert_eq!("warning".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!(" Debug ".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_is_critical() {
        assert!(!LogLevel::Warn.is_critical());
        assert!(LogLevel::Error.is_critical());
        assert!(LogLevel::Fatal.is_critical());
    }
}
