//! Key-value context for log records
//!
//! - `FieldValue` / `LogContext`: an immutable snapshot of fields
//! - `DiagnosticContext`: process-wide mutable fields (MDC) whose snapshot
//!   travels with posted log events
//! - `ContextGuard`: RAII guard for scoped diagnostic fields

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Value type for context fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::String(s) => write!(f, "{}", s),
            FieldValue::Int(i) => write!(f, "{}", i),
            FieldValue::Float(fl) => write!(f, "{}", fl),
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Null => write!(f, "null"),
        }
    }
}

impl FieldValue {
    #[must_use]
    pub fn to_json_value(&self) -> serde_json::Value {
        match self {
            FieldValue::String(s) => serde_json::Value::String(s.clone()),
            FieldValue::Int(i) => serde_json::Value::Number((*i).into()),
            FieldValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            FieldValue::Bool(b) => serde_json::Value::Bool(*b),
            FieldValue::Null => serde_json::Value::Null,
        }
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::String(s)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::String(s.to_string())
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        FieldValue::Int(i)
    }
}

impl From<i32> for FieldValue {
    fn from(i: i32) -> Self {
        FieldValue::Int(i as i64)
    }
}

impl From<f64> for FieldValue {
    fn from(f: f64) -> Self {
        FieldValue::Float(f)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

/// Snapshot of context fields attached to a record or event.
///
/// Fields are kept sorted so formatted output is stable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogContext {
    fields: BTreeMap<String, FieldValue>,
}

impl LogContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<FieldValue>,
    {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn add_field<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<FieldValue>,
    {
        self.fields.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    pub fn fields(&self) -> &BTreeMap<String, FieldValue> {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Format fields as key=value pairs
    pub fn format_fields(&self) -> String {
        self.fields
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for LogContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_fields())
    }
}

/// Process-wide diagnostic context shared by everything logging through
/// one routing service.
///
/// Thread-safe: clones share the same underlying fields.
///
/// # Example
///
/// ```
/// use rust_logging_service::core::DiagnosticContext;
///
/// let ctx = DiagnosticContext::new();
/// ctx.set("node", "edge-7");
/// {
///     let _guard = ctx.scoped("request_id", "abc-123");
///     assert_eq!(ctx.len(), 2);
/// }
/// assert_eq!(ctx.len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct DiagnosticContext {
    fields: Arc<RwLock<BTreeMap<String, FieldValue>>>,
}

impl DiagnosticContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field, overwriting any previous value
    pub fn set<K, V>(&self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<FieldValue>,
    {
        self.fields.write().insert(key.into(), value.into());
    }

    pub fn remove(&self, key: &str) {
        self.fields.write().remove(key);
    }

    pub fn clear(&self) {
        self.fields.write().clear();
    }

    pub fn is_empty(&self) -> bool {
        self.fields.read().is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.read().len()
    }

    /// Set a field for the lifetime of the returned guard
    #[must_use = "the field is removed as soon as the guard is dropped"]
    pub fn scoped<K, V>(&self, key: K, value: V) -> ContextGuard
    where
        K: Into<String>,
        V: Into<FieldValue>,
    {
        let key = key.into();
        self.set(key.clone(), value);
        ContextGuard {
            context: Arc::clone(&self.fields),
            key,
        }
    }

    /// Copy of the current fields
    pub fn snapshot(&self) -> LogContext {
        LogContext {
            fields: self.fields.read().clone(),
        }
    }
}

/// RAII guard for scoped diagnostic fields
pub struct ContextGuard {
    context: Arc<RwLock<BTreeMap<String, FieldValue>>>,
    key: String,
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        self.context.write().remove(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_context_format_is_sorted() {
        let ctx = LogContext::new()
            .with_field("zone", "b")
            .with_field("attempt", 2);

        assert_eq!(ctx.format_fields(), "attempt=2 zone=b");
        assert_eq!(ctx.len(), 2);
    }

    #[test]
    fn test_diagnostic_context_snapshot_is_detached() {
        let ctx = DiagnosticContext::new();
        ctx.set("user", "alice");

        let snapshot = ctx.snapshot();
        ctx.set("user", "bob");

        assert_eq!(snapshot.get("user"), Some(&FieldValue::String("alice".into())));
    }

    #[test]
    fn test_diagnostic_context_shared_between_clones() {
        let ctx = DiagnosticContext::new();
        let other = ctx.clone();
        other.set("key", true);

        assert_eq!(ctx.len(), 1);
        ctx.clear();
        assert!(other.is_empty());
    }

    #[test]
    fn test_scoped_guard_removes_field() {
        let ctx = DiagnosticContext::new();
        {
            let _guard = ctx.scoped("request_id", "r-1");
            assert_eq!(ctx.len(), 1);
        }
        assert!(ctx.is_empty());
    }
}
