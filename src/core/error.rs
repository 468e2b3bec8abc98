//! Error types for the logging service

pub type Result<T> = std::result::Result<T, LoggerError>;

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    /// IO error with context
    #[error("IO error while {operation}: {message}")]
    IoOperation {
        operation: String,
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Generic IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// YAML configuration error
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// XML configuration error
    #[error("XML error: {0}")]
    XmlError(#[from] quick_xml::de::DeError),

    /// Configuration document could not be parsed
    #[error("Failed to parse {format} configuration: {message}")]
    ParseError { format: String, message: String },

    /// Invalid configuration with details
    #[error("Invalid configuration for {component}: {message}")]
    InvalidConfiguration { component: String, message: String },

    /// File appender error with path
    #[error("File appender error for '{path}': {message}")]
    FileAppenderError { path: String, message: String },

    /// Engine context used outside of its started lifetime
    #[error("Engine context '{name}' is {state}")]
    EngineState { name: String, state: String },

    /// Service already shut down
    #[error("Logging service already stopped")]
    ServiceStopped,

    /// Failed to start a background worker
    #[error("Failed to spawn {worker} worker: {source}")]
    WorkerSpawn {
        worker: String,
        #[source]
        source: std::io::Error,
    },

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl LoggerError {
    /// Create an IO operation error with context
    pub fn io_operation(
        operation: impl Into<String>,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        LoggerError::IoOperation {
            operation: operation.into(),
            message: message.into(),
            source,
        }
    }

    /// Create a parse error for the named configuration format
    pub fn parse(format: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::ParseError {
            format: format.into(),
            message: message.into(),
        }
    }

    /// Create an invalid configuration error
    pub fn config(component: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::InvalidConfiguration {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Create a file appender error
    pub fn file_appender(path: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::FileAppenderError {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn engine_state(name: impl Into<String>, state: impl Into<String>) -> Self {
        LoggerError::EngineState {
            name: name.into(),
            state: state.into(),
        }
    }

    pub fn worker_spawn(worker: impl Into<String>, source: std::io::Error) -> Self {
        LoggerError::WorkerSpawn {
            worker: worker.into(),
            source,
        }
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        LoggerError::Other(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = LoggerError::config("appender 'console'", "unknown type 'tcp'");
        assert!(matches!(err, LoggerError::InvalidConfiguration { .. }));

        let err = LoggerError::file_appender("/var/log/app.log", "Permission denied");
        assert!(matches!(err, LoggerError::FileAppenderError { .. }));

        let err = LoggerError::parse("properties", "line 3: missing '='");
        assert!(matches!(err, LoggerError::ParseError { .. }));
    }

    #[test]
    fn test_error_display() {
        let err = LoggerError::config("logger 'com.acme'", "Invalid log level: 'loud'");
        assert_eq!(
            err.to_string(),
            "Invalid configuration for logger 'com.acme': Invalid log level: 'loud'"
        );

        let err = LoggerError::engine_state("default", "stopped");
        assert_eq!(err.to_string(), "Engine context 'default' is stopped");

        let err = LoggerError::parse("YAML", "unexpected key");
        assert_eq!(err.to_string(), "Failed to parse YAML configuration: unexpected key");
    }

    #[test]
    fn test_io_operation_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = LoggerError::io_operation("reading configuration", "/etc/logging.xml", io_err);

        assert!(matches!(err, LoggerError::IoOperation { .. }));
        assert!(err.to_string().contains("reading configuration"));
        assert!(err.to_string().contains("/etc/logging.xml"));
    }
}
