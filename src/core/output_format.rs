//! Output layouts for log records
//!
//! - Text: `[timestamp] [LEVEL] channel (thread) - message`
//! - Json: one JSON object per record
//! - Logfmt: key=value pairs

use super::log_context::FieldValue;
use super::log_record::LogRecord;
use super::timestamp::TimestampFormat;
use std::str::FromStr;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Logfmt,
}

impl OutputFormat {
    pub fn format(&self, record: &LogRecord, timestamp_format: &TimestampFormat) -> String {
        match self {
            OutputFormat::Text => self.format_text(record, timestamp_format),
            OutputFormat::Json => self.format_json(record, timestamp_format),
            OutputFormat::Logfmt => self.format_logfmt(record, timestamp_format),
        }
    }

    fn format_text(&self, record: &LogRecord, timestamp_format: &TimestampFormat) -> String {
        let mut line = format!(
            "[{}] [{:5}] {} ({}) - {}",
            timestamp_format.format(&record.timestamp),
            record.level.to_str(),
            record.display_channel(),
            record.thread_label(),
            record.message
        );

        if let Some(ref context) = record.context {
            if !context.is_empty() {
                line.push(' ');
                line.push_str(&context.format_fields());
            }
        }
        if let Some(ref cause) = record.cause {
            line.push_str(" | cause: ");
            line.push_str(&cause.to_string());
        }

        line
    }

    fn format_json(&self, record: &LogRecord, timestamp_format: &TimestampFormat) -> String {
        use serde_json::Value;

        let mut json_obj = serde_json::Map::new();

        let timestamp = if timestamp_format.is_numeric() {
            timestamp_format
                .format(&record.timestamp)
                .parse::<i64>()
                .map(|n| Value::Number(n.into()))
                .unwrap_or(Value::Null)
        } else {
            Value::String(timestamp_format.format(&record.timestamp))
        };
        json_obj.insert("timestamp".to_string(), timestamp);
        json_obj.insert("level".to_string(), Value::String(record.level.to_str().to_string()));
        json_obj.insert(
            "channel".to_string(),
            Value::String(record.display_channel().to_string()),
        );
        json_obj.insert("message".to_string(), Value::String(record.message.clone()));
        json_obj.insert("thread".to_string(), Value::String(record.thread_label().to_string()));

        if let Some(ref module) = record.module {
            json_obj.insert("module".to_string(), Value::String(module.symbolic_name.clone()));
        }
        if let Some(ref cause) = record.cause {
            json_obj.insert("cause".to_string(), Value::String(cause.to_string()));
        }
        if let Some(ref context) = record.context {
            for (key, value) in context.fields() {
                json_obj
                    .entry(key.clone())
                    .or_insert_with(|| value.to_json_value());
            }
        }

        serde_json::to_string(&Value::Object(json_obj)).unwrap_or_default()
    }

    fn format_logfmt(&self, record: &LogRecord, timestamp_format: &TimestampFormat) -> String {
        let mut parts = vec![
            format!(
                "timestamp={}",
                escape_logfmt_value(&timestamp_format.format(&record.timestamp))
            ),
            format!("level={}", record.level.to_str()),
            format!("channel={}", escape_logfmt_value(record.display_channel())),
            format!("message={}", quote_logfmt_value(&record.message)),
            format!("thread={}", escape_logfmt_value(record.thread_label())),
        ];

        if let Some(ref module) = record.module {
            parts.push(format!("module={}", escape_logfmt_value(&module.symbolic_name)));
        }
        if let Some(ref cause) = record.cause {
            parts.push(format!("cause={}", quote_logfmt_value(&cause.to_string())));
        }
        if let Some(ref context) = record.context {
            for (key, value) in context.fields() {
                let formatted = match value {
                    FieldValue::String(s) => quote_logfmt_value(s),
                    other => other.to_string(),
                };
                parts.push(format!("{}={}", escape_logfmt_key(key), formatted));
            }
        }

        parts.join(" ")
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" | "pattern" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "logfmt" => Ok(OutputFormat::Logfmt),
            _ => Err(format!("Invalid output format: '{}'", s)),
        }
    }
}

fn escape_logfmt_key(key: &str) -> String {
    key.chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-' || *c == '.')
        .collect()
}

fn escape_logfmt_value(value: &str) -> String {
    if value.is_empty() || value.contains(' ') || value.contains('"') || value.contains('=') {
        quote_logfmt_value(value)
    } else {
        value.to_string()
    }
}

fn quote_logfmt_value(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ErrorCause, LogContext, LogLevel, ModuleId};

    #[test]
    fn test_text_format() {
        let record = LogRecord::new("com.acme.db", LogLevel::Info, "pool ready")
            .with_context(LogContext::new().with_field("size", 8));
        let result = OutputFormat::Text.format(&record, &TimestampFormat::Iso8601);

        assert!(result.contains("[INFO ]"));
        assert!(result.contains("com.acme.db"));
        assert!(result.contains("pool ready size=8"));
    }

    #[test]
    fn test_text_format_root_and_cause() {
        let record = LogRecord::new("", LogLevel::Error, "boot failed")
            .with_cause(Some(ErrorCause::new("disk full")));
        let result = OutputFormat::Text.format(&record, &TimestampFormat::Iso8601);

        assert!(result.contains("root"));
        assert!(result.ends_with("| cause: disk full"));
    }

    #[test]
    fn test_json_format() {
        let record = LogRecord::new("web", LogLevel::Warn, "slow request")
            .with_module(Some(ModuleId::new(7, "com.acme.web")))
            .with_context(LogContext::new().with_field("latency_ms", 420));
        let result = OutputFormat::Json.format(&record, &TimestampFormat::UnixMillis);

        let parsed: serde_json::Value = serde_json::from_str(&result).unwrap();
        assert_eq!(parsed["level"], "WARN");
        assert_eq!(parsed["channel"], "web");
        assert_eq!(parsed["module"], "com.acme.web");
        assert_eq!(parsed["latency_ms"], 420);
        assert!(parsed["timestamp"].is_number());
    }

    #[test]
    fn test_json_context_cannot_override_core_fields() {
        let record = LogRecord::new("web", LogLevel::Info, "real")
            .with_context(LogContext::new().with_field("message", "forged"));
        let result = OutputFormat::Json.format(&record, &TimestampFormat::Iso8601);

        let parsed: serde_json::Value = serde_json::from_str(&result).unwrap();
        assert_eq!(parsed["message"], "real");
    }

    #[test]
    fn test_logfmt_format() {
        let record = LogRecord::new("", LogLevel::Debug, "cache miss")
            .with_context(LogContext::new().with_field("query", "id=1"));
        let result = OutputFormat::Logfmt.format(&record, &TimestampFormat::Iso8601);

        assert!(result.contains("level=DEBUG"));
        assert!(result.contains("channel=root"));
        assert!(result.contains("message=\"cache miss\""));
        assert!(result.contains("query=\"id=1\""));
    }

    #[test]
    fn test_parse() {
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("pattern".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert!("xml".parse::<OutputFormat>().is_err());
    }
}
