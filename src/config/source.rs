//! Configuration sources: turning a configuration request into an engine context

use super::document::EngineConfig;
use super::properties::ConfigProperties;
use crate::core::{LogLevel, Result};
use crate::engine::{EngineContext, EngineEnvironment, EngineMode};
use std::path::Path;

/// Builds engine contexts for the configuration controller.
///
/// Every method returns a fully built, not yet started context or an
/// error; nothing is published or started here.
pub trait ConfigurationSource: Send + Sync {
    /// Build from a configuration file
    fn from_file(&self, path: &Path, mode: EngineMode) -> Result<EngineContext>;

    /// Build from inline engine properties (already stripped of their prefix)
    fn from_properties(&self, props: &ConfigProperties, mode: EngineMode) -> Result<EngineContext>;

    /// Build the built-in default configuration
    fn defaults(&self, level: LogLevel, mode: EngineMode) -> Result<EngineContext>;
}

/// [`ConfigurationSource`] reading [`EngineConfig`] documents
#[derive(Clone, Default)]
pub struct DocumentSource {
    env: EngineEnvironment,
}

impl DocumentSource {
    pub fn new(env: EngineEnvironment) -> Self {
        Self { env }
    }

    pub fn environment(&self) -> &EngineEnvironment {
        &self.env
    }
}

impl ConfigurationSource for DocumentSource {
    fn from_file(&self, path: &Path, mode: EngineMode) -> Result<EngineContext> {
        EngineConfig::load(path)?.build(mode, &self.env)
    }

    fn from_properties(&self, props: &ConfigProperties, mode: EngineMode) -> Result<EngineContext> {
        let mut config = EngineConfig::from_properties(props)?;
        if config.name.is_none() {
            config.name = Some("inline".to_string());
        }
        config.build(mode, &self.env)
    }

    fn defaults(&self, level: LogLevel, mode: EngineMode) -> Result<EngineContext> {
        EngineConfig::default_console(level).build(mode, &self.env)
    }
}
