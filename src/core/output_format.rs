//! Rendering log entries to text
//!
//! Provides the `Formatter` trait hooks use to turn an entry into a message
//! body, and the built-in formats:
//! - Text: `time=... level=... msg=...` followed by sorted fields (default)
//! - Json: one JSON object per entry
//! - Logfmt: strict key=value pairs for log aggregation tools

use super::error::Result;
use super::log_context::FieldValue;
use super::log_entry::LogEntry;
use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};

/// Renders a log entry to its textual form
///
/// Rendering may fail; a hook reports that as a serialization failure and
/// sends nothing.
pub trait Formatter: Send + Sync {
    fn format(&self, entry: &LogEntry) -> Result<String>;
}

impl<F> Formatter for F
where
    F: Fn(&LogEntry) -> Result<String> + Send + Sync,
{
    fn format(&self, entry: &LogEntry) -> Result<String> {
        self(entry)
    }
}

/// Output format for log entries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable text format (default)
    ///
    /// Example: `time="2025-01-08T10:30:45.000Z" level=info msg="Request processed" user=42`
    #[default]
    Text,

    /// JSON format for machine processing
    ///
    /// Example: `{"time":"2025-01-08T10:30:45.000Z","level":"info","msg":"Request processed"}`
    Json,

    /// Logfmt format (key=value pairs, every string quoted)
    ///
    /// Example: `time=2025-01-08T10:30:45.000Z level=info msg="Request processed"`
    Logfmt,
}

impl Formatter for OutputFormat {
    fn format(&self, entry: &LogEntry) -> Result<String> {
        match self {
            OutputFormat::Text => Ok(format_text(entry)),
            OutputFormat::Json => format_json(entry),
            OutputFormat::Logfmt => Ok(format_logfmt(entry)),
        }
    }
}

fn timestamp(entry: &LogEntry) -> String {
    entry.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn format_text(entry: &LogEntry) -> String {
    let mut parts = vec![
        format!("time={}", quote(&timestamp(entry))),
        format!("level={}", entry.level),
        format!("msg={}", quote_if_needed(&entry.message)),
    ];

    for (key, value) in entry.context.fields() {
        let rendered = match value {
            FieldValue::String(s) => quote_if_needed(s),
            other => other.to_string(),
        };
        parts.push(format!("{}={}", key, rendered));
    }

    parts.join(" ")
}

fn format_json(entry: &LogEntry) -> Result<String> {
    let mut json_obj = serde_json::Map::new();

    // User fields first so the reserved keys below always win
    for (key, value) in entry.context.fields() {
        json_obj.insert(key.clone(), value.to_json_value());
    }

    json_obj.insert("time".to_string(), serde_json::Value::String(timestamp(entry)));
    json_obj.insert(
        "level".to_string(),
        serde_json::Value::String(entry.level.to_str().to_string()),
    );
    json_obj.insert(
        "msg".to_string(),
        serde_json::Value::String(entry.message.clone()),
    );

    if let Some(ref file) = entry.file {
        json_obj.insert("file".to_string(), serde_json::Value::String(file.clone()));
    }
    if let Some(line) = entry.line {
        json_obj.insert("line".to_string(), serde_json::Value::Number(line.into()));
    }
    if let Some(ref module_path) = entry.module_path {
        json_obj.insert(
            "module_path".to_string(),
            serde_json::Value::String(module_path.clone()),
        );
    }

    Ok(serde_json::to_string(&serde_json::Value::Object(json_obj))?)
}

fn format_logfmt(entry: &LogEntry) -> String {
    let mut parts = vec![
        format!("time={}", timestamp(entry)),
        format!("level={}", entry.level),
        format!("msg={}", quote(&entry.message)),
    ];

    if let Some(ref file) = entry.file {
        parts.push(format!("file={}", quote_if_needed(file)));
    }
    if let Some(line) = entry.line {
        parts.push(format!("line={}", line));
    }

    for (key, value) in entry.context.fields() {
        let formatted_value = match value {
            FieldValue::String(s) => quote(s),
            other => other.to_string(),
        };
        parts.push(format!("{}={}", escape_logfmt_key(key), formatted_value));
    }

    parts.join(" ")
}

/// Escape a logfmt key (remove spaces and special chars)
fn escape_logfmt_key(key: &str) -> String {
    key.chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-' || *c == '.')
        .collect()
}

fn quote_if_needed(value: &str) -> String {
    let needs_quoting = value.is_empty()
        || value
            .chars()
            .any(|c| c.is_whitespace() || c == '"' || c == '=' || c == '\\');
    if needs_quoting {
        quote(value)
    } else {
        value.to_string()
    }
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{LogContext, LogLevel, LoggerError};
    use chrono::{TimeZone, Utc};

    fn fixed_entry(level: LogLevel, message: &str) -> LogEntry {
        LogEntry::new(level, message)
            .with_timestamp(Utc.with_ymd_and_hms(2025, 1, 8, 10, 30, 45).unwrap())
    }

    #[test]
    fn test_text_format() {
        let entry = fixed_entry(LogLevel::Info, "Request processed");
        let result = OutputFormat::Text.format(&entry).unwrap();

        assert_eq!(
            result,
            "time=\"2025-01-08T10:30:45.000Z\" level=info msg=\"Request processed\""
        );
    }

    #[test]
    fn test_text_format_with_context() {
        let context = LogContext::new()
            .with_field("user_id", 123)
            .with_field("action", "login");

        let entry = fixed_entry(LogLevel::Info, "User logged in").with_context(context);
        let result = OutputFormat::Text.format(&entry).unwrap();

        assert!(result.ends_with("msg=\"User logged in\" action=login user_id=123"));
    }

    #[test]
    fn test_json_format() {
        let entry = fixed_entry(LogLevel::Error, "Error occurred").with_field("code", 500);
        let result = OutputFormat::Json.format(&entry).unwrap();

        let parsed: serde_json::Value = serde_json::from_str(&result).unwrap();
        assert_eq!(parsed["level"], "error");
        assert_eq!(parsed["msg"], "Error occurred");
        assert_eq!(parsed["time"], "2025-01-08T10:30:45.000Z");
        assert_eq!(parsed["code"], 500);
    }

    #[test]
    fn test_json_reserved_keys_win() {
        let entry = fixed_entry(LogLevel::Info, "real").with_field("msg", "spoofed");
        let result = OutputFormat::Json.format(&entry).unwrap();

        let parsed: serde_json::Value = serde_json::from_str(&result).unwrap();
        assert_eq!(parsed["msg"], "real");
    }

    #[test]
    fn test_logfmt_escape_special_chars() {
        let context = LogContext::new().with_field("query", "SELECT * FROM users WHERE id=1");
        let entry = fixed_entry(LogLevel::Debug, "Query executed").with_context(context);
        let result = OutputFormat::Logfmt.format(&entry).unwrap();

        assert!(result.contains("level=debug"));
        assert!(result.contains("query=\"SELECT * FROM users WHERE id=1\""));
    }

    #[test]
    fn test_closure_formatter() {
        let formatter = |entry: &LogEntry| -> Result<String> {
            if entry.message.is_empty() {
                Err(LoggerError::formatter("custom", "empty message"))
            } else {
                Ok(entry.message.to_uppercase())
            }
        };

        assert_eq!(formatter.format(&fixed_entry(LogLevel::Info, "hi")).unwrap(), "HI");
        assert!(formatter.format(&fixed_entry(LogLevel::Info, "")).is_err());
    }

    #[test]
    fn test_output_format_serde() {
        assert_eq!(OutputFormat::default(), OutputFormat::Text);
        let format: OutputFormat = serde_json::from_str("\"logfmt\"").unwrap();
        assert_eq!(format, OutputFormat::Logfmt);
    }
}
