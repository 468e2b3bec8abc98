//! Flat key/value configuration snapshots

use crate::core::{LoggerError, Result};
use std::collections::BTreeMap;

/// Path of an external engine configuration file
pub const CONFIG_FILE_KEY: &str = "logging.config.file";

/// Selects the asynchronous engine when `true`
pub const ASYNC_KEY: &str = "logging.async";

/// Capacity of the history buffer
pub const HISTORY_SIZE_KEY: &str = "logging.history.size";

/// Older name of [`HISTORY_SIZE_KEY`], consulted only when it is absent
pub const HISTORY_SIZE_LEGACY_KEY: &str = "logging.entries.size";

/// Prefix of inline engine configuration keys
pub const ENGINE_PREFIX: &str = "engine.";

/// A configuration snapshot: ordered string keys to string values.
///
/// # Example
///
/// ```
/// use rust_logging_service::config::{ConfigProperties, ENGINE_PREFIX};
///
/// let props = ConfigProperties::new()
///     .with("logging.async", "true")
///     .with("engine.rootLogger.level", "debug");
///
/// assert_eq!(props.get_bool("logging.async"), true);
/// assert_eq!(props.subset(ENGINE_PREFIX).get("rootLogger.level"), Some("debug"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigProperties {
    entries: BTreeMap<String, String>,
}

impl ConfigProperties {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// `true` only for a case-insensitive `"true"`; absent or anything else
    /// is `false`
    pub fn get_bool(&self, key: &str) -> bool {
        self.get(key)
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Entries whose key starts with `prefix`, with the prefix removed
    pub fn subset(&self, prefix: &str) -> ConfigProperties {
        ConfigProperties {
            entries: self
                .entries
                .iter()
                .filter_map(|(k, v)| {
                    k.strip_prefix(prefix)
                        .filter(|rest| !rest.is_empty())
                        .map(|rest| (rest.to_string(), v.clone()))
                })
                .collect(),
        }
    }

    /// Parse a `.properties` document.
    ///
    /// - Blank lines and lines starting with `#` or `!` are ignored.
    /// - A line ending in an odd number of backslashes continues on the
    ///   next line, whose leading whitespace is dropped.
    /// - The key ends at the first unescaped `=`, `:` or whitespace, so
    ///   `key=value`, `key: value` and `key value` are all accepted.
    /// - `\t`, `\n`, `\r`, `\f` and `\uXXXX` are decoded; any other
    ///   escaped character stands for itself.
    pub fn parse(text: &str) -> Result<Self> {
        let mut props = ConfigProperties::new();
        for (line_no, logical) in logical_lines(text)? {
            let end = key_end(&logical);
            let mut rest = logical[end..].trim_start();
            if let Some(value) = rest.strip_prefix(['=', ':']) {
                rest = value.trim_start();
            }

            let key = unescape(&logical[..end], line_no)?;
            if key.is_empty() {
                return Err(LoggerError::parse(
                    "properties",
                    format!("line {}: empty key", line_no),
                ));
            }
            props.insert(key, unescape(rest, line_no)?);
        }
        Ok(props)
    }
}

/// Join continued lines; each logical line keeps its first line number
fn logical_lines(text: &str) -> Result<Vec<(usize, String)>> {
    let mut lines = Vec::new();
    let mut pending: Option<(usize, String)> = None;

    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim_start();
        let (start_line, mut logical) = match pending.take() {
            Some(continued) => continued,
            None => {
                if line.is_empty() || line.starts_with(['#', '!']) {
                    continue;
                }
                (idx + 1, String::new())
            }
        };

        let trailing = line.bytes().rev().take_while(|&b| b == b'\\').count();
        if trailing % 2 == 1 {
            logical.push_str(&line[..line.len() - 1]);
            pending = Some((start_line, logical));
        } else {
            logical.push_str(line);
            lines.push((start_line, logical));
        }
    }

    if let Some((start_line, logical)) = pending {
        return Err(LoggerError::parse(
            "properties",
            format!("line {}: unterminated continuation '{}'", start_line, logical),
        ));
    }
    Ok(lines)
}

/// Byte offset of the first unescaped separator or whitespace
fn key_end(logical: &str) -> usize {
    let mut escaped = false;
    for (idx, c) in logical.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == '=' || c == ':' || c.is_whitespace() {
            return idx;
        }
    }
    logical.len()
}

/// Decode escapes and drop unescaped trailing whitespace
fn unescape(raw: &str, line_no: usize) -> Result<String> {
    let mut out = String::with_capacity(raw.len());
    let mut keep = 0;
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            if !c.is_whitespace() {
                keep = out.len();
            }
            continue;
        }

        let decoded = match chars.next() {
            Some('t') => '\t',
            Some('n') => '\n',
            Some('r') => '\r',
            Some('f') => '\u{000C}',
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                let code = Some(hex.as_str())
                    .filter(|h| h.len() == 4 && h.chars().all(|d| d.is_ascii_hexdigit()))
                    .and_then(|h| u32::from_str_radix(h, 16).ok())
                    .and_then(char::from_u32);
                code.ok_or_else(|| {
                    LoggerError::parse(
                        "properties",
                        format!("line {}: malformed escape '\\u{}'", line_no, hex),
                    )
                })?
            }
            Some(other) => other,
            None => break,
        };
        out.push(decoded);
        keep = out.len();
    }

    out.truncate(keep);
    Ok(out)
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ConfigProperties {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut props = ConfigProperties::new();
        for (k, v) in iter {
            props.insert(k, v);
        }
        props
    }
}
