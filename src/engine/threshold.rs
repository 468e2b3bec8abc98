//! Channel threshold tree
//!
//! Channels form a dot-delimited hierarchy under the root channel (`""`).
//! A channel without its own level inherits the level of its nearest
//! configured ancestor. Appenders accumulate from the channel up towards the
//! root until a binding with `additive == false` is passed.

use crate::core::LogLevel;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Configured state of one channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelBinding {
    pub level: Option<LogLevel>,
    /// Indices into the owning engine's appender list
    pub appenders: Vec<usize>,
    pub additive: bool,
}

impl ChannelBinding {
    pub fn new(level: Option<LogLevel>) -> Self {
        Self {
            level,
            appenders: Vec::new(),
            additive: true,
        }
    }
}

/// Resolved effective state of a channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub level: LogLevel,
    pub appenders: Vec<usize>,
}

impl Route {
    #[inline]
    pub fn accepts(&self, level: LogLevel) -> bool {
        level >= self.level
    }
}

/// Parent of a channel, `None` for the root
pub fn parent_channel(name: &str) -> Option<&str> {
    if name.is_empty() {
        return None;
    }
    Some(name.rfind('.').map_or("", |idx| &name[..idx]))
}

#[derive(Debug)]
pub struct ThresholdTree {
    bindings: HashMap<String, ChannelBinding>,
    resolved: RwLock<HashMap<String, Arc<Route>>>,
}

impl ThresholdTree {
    pub fn new(root_level: LogLevel, root_appenders: Vec<usize>) -> Self {
        let mut bindings = HashMap::new();
        bindings.insert(
            String::new(),
            ChannelBinding {
                level: Some(root_level),
                appenders: root_appenders,
                additive: false,
            },
        );
        Self {
            bindings,
            resolved: RwLock::new(HashMap::new()),
        }
    }

    /// Bind a non-root channel. Binding the root replaces its appenders and,
    /// when given, its level.
    pub fn bind(&mut self, channel: impl Into<String>, binding: ChannelBinding) {
        let channel = channel.into();
        if channel.is_empty() {
            if let Some(root) = self.bindings.get_mut("") {
                if binding.level.is_some() {
                    root.level = binding.level;
                }
                root.appenders = binding.appenders;
            }
        } else {
            self.bindings.insert(channel, binding);
        }
        self.resolved.get_mut().clear();
    }

    pub fn root_level(&self) -> LogLevel {
        self.bindings
            .get("")
            .and_then(|root| root.level)
            .unwrap_or_default()
    }

    pub fn binding(&self, channel: &str) -> Option<&ChannelBinding> {
        self.bindings.get(channel)
    }

    /// Effective route of `channel`, cached after the first lookup
    pub fn route(&self, channel: &str) -> Arc<Route> {
        if let Some(route) = self.resolved.read().get(channel) {
            return Arc::clone(route);
        }

        let route = Arc::new(self.resolve(channel));
        self.resolved
            .write()
            .entry(channel.to_string())
            .or_insert(route)
            .clone()
    }

    pub fn effective_level(&self, channel: &str) -> LogLevel {
        self.route(channel).level
    }

    fn resolve(&self, channel: &str) -> Route {
        let mut level = None;
        let mut appenders: Vec<usize> = Vec::new();
        let mut collecting = true;
        let mut current = Some(channel);

        while let Some(name) = current {
            if let Some(binding) = self.bindings.get(name) {
                if level.is_none() {
                    level = binding.level;
                }
                if collecting {
                    for idx in &binding.appenders {
                        if !appenders.contains(idx) {
                            appenders.push(*idx);
                        }
                    }
                    collecting = binding.additive;
                }
            }
            if level.is_some() && !collecting {
                break;
            }
            current = parent_channel(name);
        }

        Route {
            level: level.unwrap_or_else(|| self.root_level()),
            appenders,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> ThresholdTree {
        let mut tree = ThresholdTree::new(LogLevel::Info, vec![0]);
        tree.bind(
            "com.acme",
            ChannelBinding {
                level: Some(LogLevel::Debug),
                appenders: vec![1],
                additive: true,
            },
        );
        tree.bind(
            "com.acme.audit",
            ChannelBinding {
                level: None,
                appenders: vec![2],
                additive: false,
            },
        );
        tree
    }

    #[test]
    fn test_parent_channel() {
        assert_eq!(parent_channel("a.b.c"), Some("a.b"));
        assert_eq!(parent_channel("a"), Some(""));
        assert_eq!(parent_channel(""), None);
    }

    #[test]
    fn test_level_inheritance() {
        let tree = tree();
        assert_eq!(tree.effective_level(""), LogLevel::Info);
        assert_eq!(tree.effective_level("org.other"), LogLevel::Info);
        assert_eq!(tree.effective_level("com.acme"), LogLevel::Debug);
        assert_eq!(tree.effective_level("com.acme.web.handler"), LogLevel::Debug);
        assert_eq!(tree.effective_level("com.acme.audit"), LogLevel::Debug);
    }

    #[test]
    fn test_prefix_is_hierarchical_not_textual() {
        let tree = tree();
        // "com.acmeX" is a sibling of "com.acme", not a child
        assert_eq!(tree.effective_level("com.acmeX"), LogLevel::Info);
    }

    #[test]
    fn test_appender_additivity() {
        let tree = tree();
        assert_eq!(tree.route("com.acme.web").appenders, vec![1, 0]);
        assert_eq!(tree.route("com.acme.audit.login").appenders, vec![2]);
        assert_eq!(tree.route("net").appenders, vec![0]);
    }

    #[test]
    fn test_root_literal_is_an_ordinary_child() {
        let mut tree = tree();
        tree.bind("root", ChannelBinding::new(Some(LogLevel::Error)));
        assert_eq!(tree.effective_level("root"), LogLevel::Error);
        assert_eq!(tree.effective_level(""), LogLevel::Info);
    }

    #[test]
    fn test_route_is_cached_and_rebinding_invalidates() {
        let mut tree = tree();
        let first = tree.route("com.acme.web");
        assert!(Arc::ptr_eq(&first, &tree.route("com.acme.web")));

        tree.bind("com.acme.web", ChannelBinding::new(Some(LogLevel::Warn)));
        assert_eq!(tree.effective_level("com.acme.web"), LogLevel::Warn);
    }

    #[test]
    fn test_route_accepts() {
        let tree = tree();
        let route = tree.route("com.acme");
        assert!(route.accepts(LogLevel::Debug));
        assert!(!route.accepts(LogLevel::Trace));
    }
}
