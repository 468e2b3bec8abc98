//! Engine configuration documents
//!
//! Four document formats describe the same [`EngineConfig`] model:
//!
//! - JSON (`.json`, `.jsn`)
//! - YAML (`.yaml`, `.yml`)
//! - properties (`.properties`, and inline `engine.*` keys)
//! - XML (`.xml` and any other extension)
//!
//! ```json
//! {
//!   "name": "app",
//!   "root": { "level": "info", "appenders": ["out"] },
//!   "loggers": [
//!     { "name": "com.acme.db", "level": "debug", "appenders": ["db"], "additivity": false }
//!   ],
//!   "appenders": [
//!     { "name": "out", "type": "console" },
//!     { "name": "db", "type": "file", "path": "/var/log/db.log", "format": "logfmt" }
//!   ]
//! }
//! ```
//!
//! In XML scalars are attributes and lists are repeated elements, which
//! may appear in any order:
//!
//! ```xml
//! <configuration name="app">
//!   <appender name="out" type="console"/>
//!   <root level="info"><appender-ref ref="out"/></root>
//!   <logger name="com.acme.db" level="debug" additivity="false"/>
//! </configuration>
//! ```

use super::properties::ConfigProperties;
use crate::core::{LogLevel, LoggerError, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// Name of the appender in the built-in default configuration
pub const DEFAULT_APPENDER_NAME: &str = "console";

/// Document format, chosen by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Yaml,
    Properties,
    Xml,
}

impl ConfigFormat {
    /// Unrecognized or missing extensions select XML
    pub fn from_path(path: &Path) -> Self {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("json") | Some("jsn") => ConfigFormat::Json,
            Some("yaml") | Some("yml") => ConfigFormat::Yaml,
            Some("properties") => ConfigFormat::Properties,
            _ => ConfigFormat::Xml,
        }
    }
}

impl fmt::Display for ConfigFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigFormat::Json => write!(f, "JSON"),
            ConfigFormat::Yaml => write!(f, "YAML"),
            ConfigFormat::Properties => write!(f, "properties"),
            ConfigFormat::Xml => write!(f, "XML"),
        }
    }
}

/// `<appender-ref ref="..."/>`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AppenderRef {
    #[serde(rename = "ref", alias = "@ref")]
    pub target: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RootConfig {
    #[serde(default, alias = "@level")]
    pub level: Option<String>,
    #[serde(default)]
    pub appenders: Vec<String>,
    #[serde(default, rename = "appender-ref")]
    pub appender_refs: Vec<AppenderRef>,
}

impl RootConfig {
    /// Appender names from both the list and the element forms
    pub fn appender_names(&self) -> Vec<&str> {
        merged_refs(&self.appenders, &self.appender_refs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggerConfig {
    #[serde(alias = "@name")]
    pub name: String,
    #[serde(default, alias = "@level")]
    pub level: Option<String>,
    #[serde(default)]
    pub appenders: Vec<String>,
    #[serde(default, rename = "appender-ref")]
    pub appender_refs: Vec<AppenderRef>,
    #[serde(default = "default_additivity", alias = "@additivity")]
    pub additivity: bool,
}

impl LoggerConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            level: None,
            appenders: Vec::new(),
            appender_refs: Vec::new(),
            additivity: true,
        }
    }

    pub fn appender_names(&self) -> Vec<&str> {
        merged_refs(&self.appenders, &self.appender_refs)
    }
}

fn default_additivity() -> bool {
    true
}

fn merged_refs<'a>(names: &'a [String], refs: &'a [AppenderRef]) -> Vec<&'a str> {
    names
        .iter()
        .map(String::as_str)
        .chain(refs.iter().map(|r| r.target.as_str()))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AppenderConfig {
    #[serde(alias = "@name")]
    pub name: String,
    /// `console`, `file`, `json` or `sink`
    #[serde(rename = "type", alias = "@type")]
    pub kind: String,
    #[serde(default, alias = "@path")]
    pub path: Option<String>,
    /// `text`, `json` or `logfmt`
    #[serde(default, alias = "@format")]
    pub format: Option<String>,
    #[serde(default, alias = "@timestamp")]
    pub timestamp: Option<String>,
    #[serde(default, alias = "@colors")]
    pub colors: Option<bool>,
    /// Logical name of the output sinks a `sink` appender forwards to
    #[serde(default, alias = "@sink")]
    pub sink: Option<String>,
}

impl AppenderConfig {
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            path: None,
            format: None,
            timestamp: None,
            colors: None,
            sink: None,
        }
    }
}

/// Declarative description of one engine context
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EngineConfig {
    #[serde(default, alias = "@name")]
    pub name: Option<String>,
    #[serde(default)]
    pub root: RootConfig,
    #[serde(default, alias = "logger")]
    pub loggers: Vec<LoggerConfig>,
    #[serde(default, alias = "appender")]
    pub appenders: Vec<AppenderConfig>,
}

impl EngineConfig {
    /// One console appender on the root channel at `level`
    pub fn default_console(level: LogLevel) -> Self {
        Self {
            name: Some("default".to_string()),
            root: RootConfig {
                level: Some(level.to_str().to_string()),
                appenders: vec![DEFAULT_APPENDER_NAME.to_string()],
                appender_refs: Vec::new(),
            },
            loggers: Vec::new(),
            appenders: vec![AppenderConfig::new(DEFAULT_APPENDER_NAME, "console")],
        }
    }

    /// Read and parse a configuration file, choosing the format by extension
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            LoggerError::io_operation("reading configuration", path.display().to_string(), e)
        })?;
        let mut config = Self::parse(ConfigFormat::from_path(path), &text)?;
        if config.name.is_none() {
            config.name = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .map(String::from);
        }
        Ok(config)
    }

    pub fn parse(format: ConfigFormat, text: &str) -> Result<Self> {
        match format {
            ConfigFormat::Json => Ok(serde_json::from_str(text)?),
            ConfigFormat::Yaml => Ok(serde_yaml::from_str(text)?),
            ConfigFormat::Xml => Ok(quick_xml::de::from_str(text)?),
            ConfigFormat::Properties => Self::from_properties(&ConfigProperties::parse(text)?),
        }
    }

    /// Interpret flat keys:
    ///
    /// ```text
    /// name = app
    /// rootLogger.level = info
    /// rootLogger.appenderRefs = out, audit
    /// logger.db.name = com.acme.db
    /// logger.db.level = debug
    /// logger.db.appenderRefs = db
    /// logger.db.additivity = false
    /// appender.out.type = console
    /// appender.db.type = file
    /// appender.db.path = /var/log/db.log
    /// ```
    pub fn from_properties(props: &ConfigProperties) -> Result<Self> {
        let mut config = EngineConfig {
            name: props.get("name").map(String::from),
            ..EngineConfig::default()
        };

        let root = props.subset("rootLogger.");
        config.root.level = root.get("level").map(String::from);
        config.root.appenders = split_list(root.get("appenderRefs"));

        for (id, attrs) in group_by_id(&props.subset("logger.")) {
            let name = attrs.get("name").ok_or_else(|| {
                LoggerError::parse("properties", format!("logger '{}' has no name", id))
            })?;
            let mut logger = LoggerConfig::new(*name);
            logger.level = attrs.get("level").map(|s| s.to_string());
            logger.appenders = split_list(attrs.get("appenderRefs").copied());
            if let Some(value) = attrs.get("additivity") {
                logger.additivity = parse_bool("logger", &id, "additivity", value)?;
            }
            config.loggers.push(logger);
        }

        for (id, attrs) in group_by_id(&props.subset("appender.")) {
            let kind = attrs.get("type").ok_or_else(|| {
                LoggerError::parse("properties", format!("appender '{}' has no type", id))
            })?;
            let name = attrs.get("name").copied().unwrap_or(id.as_str());
            let mut appender = AppenderConfig::new(name, *kind);
            appender.path = attrs.get("path").map(|s| s.to_string());
            appender.format = attrs.get("format").map(|s| s.to_string());
            appender.timestamp = attrs.get("timestamp").map(|s| s.to_string());
            appender.sink = attrs.get("sink").map(|s| s.to_string());
            if let Some(value) = attrs.get("colors") {
                appender.colors = Some(parse_bool("appender", &id, "colors", value)?);
            }
            config.appenders.push(appender);
        }

        Ok(config)
    }
}

/// `id.attr = value` entries grouped by id
fn group_by_id(props: &ConfigProperties) -> BTreeMap<String, BTreeMap<&str, &str>> {
    let mut groups: BTreeMap<String, BTreeMap<&str, &str>> = BTreeMap::new();
    for (key, value) in props.iter() {
        if let Some((id, attr)) = key.split_once('.') {
            groups.entry(id.to_string()).or_default().insert(attr, value);
        }
    }
    groups
}

fn split_list(value: Option<&str>) -> Vec<String> {
    value
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

fn parse_bool(kind: &str, id: &str, attr: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(LoggerError::parse(
            "properties",
            format!("{} '{}': invalid {} '{}'", kind, id, attr, value),
        )),
    }
}
