//! Realizing an [`EngineConfig`] as an engine context

use super::context::{EngineContext, EngineMode, NamedAppender, DEFAULT_ASYNC_BUFFER};
use super::threshold::{ChannelBinding, ThresholdTree};
use crate::appenders::{
    ConsoleAppender, FileAppender, JsonAppender, SinkAppender, SinkDirectory, SinkRegistry,
};
use crate::config::{AppenderConfig, EngineConfig};
use crate::core::{
    Appender, LogLevel, LoggerError, OutputFormat, Result, StatusLogger, StatusSink,
    TimestampFormat,
};
use std::collections::HashMap;
use std::sync::Arc;

/// Collaborators every engine context is built against
#[derive(Clone)]
pub struct EngineEnvironment {
    pub sinks: Arc<dyn SinkDirectory>,
    pub status: Arc<dyn StatusSink>,
    pub async_buffer: usize,
}

impl EngineEnvironment {
    pub fn new(sinks: Arc<dyn SinkDirectory>, status: Arc<dyn StatusSink>) -> Self {
        Self {
            sinks,
            status,
            async_buffer: DEFAULT_ASYNC_BUFFER,
        }
    }

    #[must_use]
    pub fn with_async_buffer(mut self, size: usize) -> Self {
        self.async_buffer = size;
        self
    }
}

impl Default for EngineEnvironment {
    fn default() -> Self {
        Self::new(Arc::new(SinkRegistry::new()), Arc::new(StatusLogger::new()))
    }
}

fn parse_level(owner: &str, value: &str) -> Result<LogLevel> {
    value
        .parse::<LogLevel>()
        .map_err(|e| LoggerError::config(owner, e))
}

impl EngineConfig {
    /// Build an `Initialized` engine context. Files are opened here, so a
    /// successful build only leaves `start` to do.
    pub fn build(&self, mode: EngineMode, env: &EngineEnvironment) -> Result<EngineContext> {
        let mut appenders = Vec::with_capacity(self.appenders.len());
        let mut indices: HashMap<&str, usize> = HashMap::new();

        for config in &self.appenders {
            if indices.insert(config.name.as_str(), appenders.len()).is_some() {
                return Err(LoggerError::config(
                    format!("appender '{}'", config.name),
                    "defined more than once",
                ));
            }
            appenders.push(NamedAppender::new(build_appender(config, env)?));
        }

        let resolve = |owner: &str, names: Vec<&str>| -> Result<Vec<usize>> {
            names
                .into_iter()
                .map(|name| {
                    indices.get(name).copied().ok_or_else(|| {
                        LoggerError::config(owner, format!("unknown appender reference '{}'", name))
                    })
                })
                .collect()
        };

        let root_level = match self.root.level.as_deref() {
            Some(level) => parse_level("root logger", level)?,
            None => LogLevel::default(),
        };
        let mut tree = ThresholdTree::new(
            root_level,
            resolve("root logger", self.root.appender_names())?,
        );

        for logger in &self.loggers {
            let owner = format!("logger '{}'", logger.name);
            let level = logger
                .level
                .as_deref()
                .map(|level| parse_level(&owner, level))
                .transpose()?;
            tree.bind(
                logger.name.clone(),
                ChannelBinding {
                    level,
                    appenders: resolve(&owner, logger.appender_names())?,
                    additive: logger.additivity,
                },
            );
        }

        Ok(EngineContext::new(
            self.name.as_deref().unwrap_or("engine"),
            mode,
            env.async_buffer,
            tree,
            appenders,
            Arc::clone(&env.status),
        ))
    }
}

fn build_appender(config: &AppenderConfig, env: &EngineEnvironment) -> Result<Box<dyn Appender>> {
    let owner = format!("appender '{}'", config.name);
    let output_format = match config.format.as_deref() {
        Some(format) => format
            .parse::<OutputFormat>()
            .map_err(|e| LoggerError::config(&owner, e))?,
        None => OutputFormat::default(),
    };
    let timestamp_format = match config.timestamp.as_deref() {
        Some(format) => format
            .parse::<TimestampFormat>()
            .map_err(|e| LoggerError::config(&owner, e))?,
        None => TimestampFormat::default(),
    };
    let require = |value: &Option<String>, attr: &str| -> Result<String> {
        value
            .clone()
            .ok_or_else(|| LoggerError::config(&owner, format!("missing '{}'", attr)))
    };

    let appender: Box<dyn Appender> = match config.kind.trim().to_ascii_lowercase().as_str() {
        "console" => Box::new(
            ConsoleAppender::new()
                .with_name(&config.name)
                .with_colors(config.colors.unwrap_or(true))
                .with_output_format(output_format)
                .with_timestamp_format(timestamp_format),
        ),
        "file" => Box::new(
            FileAppender::new(require(&config.path, "path")?)?
                .with_name(&config.name)
                .with_output_format(output_format)
                .with_timestamp_format(timestamp_format),
        ),
        "json" => Box::new(JsonAppender::new(require(&config.path, "path")?)?.with_name(&config.name)),
        "sink" => Box::new(SinkAppender::new(
            &config.name,
            Arc::clone(&env.sinks),
            require(&config.sink, "sink")?,
        )),
        other => {
            return Err(LoggerError::config(
                &owner,
                format!("unknown appender type '{}'", other),
            ))
        }
    };
    Ok(appender)
}
