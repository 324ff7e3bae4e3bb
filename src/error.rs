//! Error handling for the count stabilization engine
//!
//! The core itself is total over well-typed counts, so most variants here
//! describe configuration problems and observer or replay file I/O. Rejected
//! frame events have their own `IngestError`.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the count stabilization system
#[derive(Error, Debug)]
pub enum CountError {
    // Configuration errors
    #[error("Configuration file not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error("Configuration parsing failed: {0}")]
    ConfigParseError(String),

    #[error("Invalid configuration value: {field} = {value}")]
    InvalidConfigValue { field: String, value: String },

    // Estimator errors
    #[error("Percentile fraction must be within (0, 1], got {0}")]
    InvalidPercentile(f64),

    #[error("Window capacity must be greater than zero")]
    ZeroCapacity,

    // Input and output files
    #[error("Input file could not be read: {0}: {1}")]
    InputFileError(PathBuf, #[source] std::io::Error),

    #[error("Output file could not be opened: {0}: {1}")]
    OutputFileError(PathBuf, #[source] std::io::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Observer errors
    #[error("Observer '{observer}' failed: {message}")]
    ObserverFailed { observer: String, message: String },

    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<CountError>,
    },

    // Generic errors for compatibility
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

/// Result type alias for convenience
pub type CountResult<T> = std::result::Result<T, CountError>;

impl From<toml::de::Error> for CountError {
    fn from(err: toml::de::Error) -> Self {
        CountError::ConfigParseError(err.to_string())
    }
}

impl From<crate::config::ConfigError> for CountError {
    fn from(err: crate::config::ConfigError) -> Self {
        match err {
            crate::config::ConfigError::FileReadError(path, _) => CountError::ConfigNotFound(path),
            crate::config::ConfigError::ParseError(msg) => CountError::ConfigParseError(msg),
            crate::config::ConfigError::InvalidValue { field, value } => {
                CountError::InvalidConfigValue { field, value }
            }
            other => CountError::Unexpected(other.to_string()),
        }
    }
}

/// Error context builder for adding additional information
pub struct ErrorContext {
    base_error: CountError,
    context: Vec<String>,
}

impl ErrorContext {
    pub fn new(error: CountError) -> Self {
        Self {
            base_error: error,
            context: Vec::new(),
        }
    }

    pub fn with_context(mut self, context: &str) -> Self {
        self.context.push(context.to_string());
        self
    }

    pub fn build(self) -> CountError {
        if self.context.is_empty() {
            self.base_error
        } else {
            CountError::WithContext {
                context: self.context.join(" -> "),
                source: Box::new(self.base_error),
            }
        }
    }
}

/// Convenience macro for adding context to errors
#[macro_export]
macro_rules! count_context {
    ($result:expr, $context:expr) => {
        $result.map_err(|e| {
            $crate::error::ErrorContext::new(e.into())
                .with_context($context)
                .build()
        })
    };
}
