//! Property-based tests for rust_logging_service using proptest

use proptest::prelude::*;
use rust_logging_service::config::ConfigProperties;
use rust_logging_service::core::{
    LogRecord, LEGACY_DEBUG, LEGACY_ERROR, LEGACY_INFO, LEGACY_WARNING,
};
use rust_logging_service::prelude::*;
use rust_logging_service::service::HistoryBuffer;

fn any_level() -> impl Strategy<Value = LogLevel> {
    prop_oneof![
        Just(LogLevel::Trace),
        Just(LogLevel::Debug),
        Just(LogLevel::Info),
        Just(LogLevel::Warn),
        Just(LogLevel::Error),
        Just(LogLevel::Fatal),
    ]
}

// ============================================================================
// Legacy Level Mapping
// ============================================================================

proptest! {
    /// Codes inside the legacy range map back onto themselves
    #[test]
    fn test_legacy_code_roundtrip(code in LEGACY_ERROR..=LEGACY_DEBUG) {
        prop_assert_eq!(LogLevel::from_legacy_code(code).legacy_code(), code);
    }

    /// Lower codes are never less severe
    #[test]
    fn test_legacy_mapping_is_monotonic(a in any::<i32>(), b in any::<i32>()) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(LogLevel::from_legacy_code(low) >= LogLevel::from_legacy_code(high));
    }

    /// Out-of-range codes clamp to the extremes
    #[test]
    fn test_legacy_mapping_clamps(code in any::<i32>()) {
        let level = LogLevel::from_legacy_code(code);
        if code < LEGACY_ERROR {
            prop_assert_eq!(level, LogLevel::Fatal);
        } else if code > LEGACY_DEBUG {
            prop_assert_eq!(level, LogLevel::Trace);
        } else {
            prop_assert!(level != LogLevel::Fatal && level != LogLevel::Trace);
        }
    }

    /// Every level reports a code the mapping understands
    #[test]
    fn test_level_to_legacy_code(level in any_level()) {
        let code = level.legacy_code();
        prop_assert!(code >= LEGACY_ERROR);
        prop_assert!(LogLevel::from_legacy_code(code) <= level);
    }
}

#[test]
fn test_legacy_constants() {
    assert_eq!(LogLevel::from_legacy_code(LEGACY_ERROR), LogLevel::Error);
    assert_eq!(LogLevel::from_legacy_code(LEGACY_WARNING), LogLevel::Warn);
    assert_eq!(LogLevel::from_legacy_code(LEGACY_INFO), LogLevel::Info);
    assert_eq!(LogLevel::from_legacy_code(LEGACY_DEBUG), LogLevel::Debug);
}

// ============================================================================
// History Buffer
// ============================================================================

proptest! {
    /// The buffer holds the newest `min(pushed, capacity)` records in order
    #[test]
    fn test_history_keeps_newest(capacity in 0usize..20, pushed in 0usize..60) {
        let history = HistoryBuffer::with_capacity(capacity);
        for i in 0..pushed {
            history.push(LogRecord::new("prop", LogLevel::Info, i.to_string()));
        }

        let kept = pushed.min(capacity);
        let messages: Vec<String> = history.entries().into_iter().map(|e| e.record.message).collect();
        let expected: Vec<String> = (pushed - kept..pushed).map(|i| i.to_string()).collect();
        prop_assert_eq!(messages, expected);
        prop_assert_eq!(history.evicted() as usize, pushed - kept);
    }

    /// Shrinking evicts the oldest entries at once
    #[test]
    fn test_history_shrink(initial in 1usize..30, shrunk in 0usize..30) {
        let history = HistoryBuffer::with_capacity(initial);
        for i in 0..initial {
            history.push(LogRecord::new("prop", LogLevel::Info, i.to_string()));
        }
        history.set_capacity(shrunk);

        prop_assert_eq!(history.len(), initial.min(shrunk));
        if let Some(last) = history.entries().last() {
            prop_assert_eq!(&last.record.message, &(initial - 1).to_string());
        }
    }
}

// ============================================================================
// Category Registry
// ============================================================================

proptest! {
    /// Repeated lookups return one identity per name
    #[test]
    fn test_registry_identity(names in prop::collection::vec("[a-z]{1,4}(\\.[a-z]{1,4}){0,2}", 1..20)) {
        let registry = CategoryRegistry::new();
        let first: Vec<LoggerHandle> = names.iter().map(|n| registry.get_or_create(n)).collect();
        let second: Vec<LoggerHandle> = names.iter().map(|n| registry.get_or_create(n)).collect();

        for (a, b) in first.iter().zip(&second) {
            prop_assert!(a.same_channel(b));
            prop_assert_eq!(a.name(), b.name());
        }

        let mut unique = names.clone();
        unique.sort();
        unique.dedup();
        prop_assert_eq!(registry.channel_names(), unique);
    }
}

// ============================================================================
// Configuration Snapshots
// ============================================================================

proptest! {
    /// `subset` strips the prefix and keeps only matching keys
    #[test]
    fn test_subset_strips_prefix(keys in prop::collection::btree_set("[a-z]{1,6}", 0..10)) {
        let mut props = ConfigProperties::new().with("other.key", "x");
        for key in &keys {
            props.insert(format!("engine.{}", key), key.clone());
        }

        let subset = props.subset("engine.");
        prop_assert_eq!(subset.len(), keys.len());
        for key in &keys {
            prop_assert_eq!(subset.get(key), Some(key.as_str()));
        }
    }

    /// Parsed `key = value` lines come back unchanged
    #[test]
    fn test_properties_parse(entries in prop::collection::btree_map("[a-z][a-z.]{0,8}", "[A-Za-z0-9 ]{0,12}", 0..10)) {
        let text: String = entries
            .iter()
            .map(|(k, v)| format!("{} = {}\n", k, v))
            .collect();
        let props = ConfigProperties::parse(&text).unwrap();

        for (key, value) in &entries {
            prop_assert_eq!(props.get(key), Some(value.trim()));
        }
    }
}
