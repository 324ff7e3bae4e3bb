//! Configuration management

use crate::estimator::EstimatorKind;
use crate::ingest::is_valid_stream_name;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use thiserror::Error;

/// Upper bound on `fps * window_seconds`, keeps a single window well below
/// the size where per-frame estimation stops being cheap.
pub const MAX_WINDOW_CAPACITY: usize = 1_000_000;

/// Stabilization configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilizationConfig {
    /// Frames per second delivered by each stream
    pub fps: u32,
    /// Length of the sliding window in seconds
    pub window_seconds: u32,
    /// Estimator strategy: "mode" or "percentile"
    pub estimator: EstimatorKind,
    /// Target fraction for the percentile estimator, in (0, 1]
    pub percentile: f64,
}

impl Default for StabilizationConfig {
    fn default() -> Self {
        Self {
            fps: 30,
            window_seconds: 10,
            estimator: EstimatorKind::Percentile,
            percentile: 0.95,
        }
    }
}

impl StabilizationConfig {
    /// Number of raw counts held per stream window
    pub fn capacity(&self) -> usize {
        self.fps as usize * self.window_seconds as usize
    }
}

/// Observer output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Log one terminal line per frame
    pub console: bool,
    /// Minimum interval between terminal lines per stream (0 logs every frame)
    pub console_interval_ms: u64,
    /// Directory receiving one `<stream>_counts.csv` per stream
    pub csv_dir: Option<PathBuf>,
    /// JSON lines file receiving one record per frame
    pub json_path: Option<PathBuf>,
    /// Keep the latest overlay text per stream for the render stage
    pub overlay: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            console: true,
            console_interval_ms: 0,
            csv_dir: None,
            json_path: None,
            overlay: true,
        }
    }
}

/// A logical video stream and the title shown above its counts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamConfig {
    pub name: String,
    pub title: String,
}

impl StreamConfig {
    pub fn new(name: &str, title: &str) -> Self {
        Self {
            name: name.to_string(),
            title: title.to_string(),
        }
    }

    /// Stream with the default title derived from its name ("top" -> "TOP VIEW")
    pub fn named(name: &str) -> Self {
        Self::new(name, &default_title(name))
    }
}

/// Title used when a stream has no configured one
pub fn default_title(stream: &str) -> String {
    format!("{} VIEW", stream.to_uppercase())
}

/// Configured title of `stream` in `streams`, or its default title
pub fn resolve_title(streams: &[StreamConfig], stream: &str) -> String {
    streams
        .iter()
        .find(|s| s.name == stream)
        .map(|s| s.title.clone())
        .unwrap_or_else(|| default_title(stream))
}

/// Composed output canvas, split into one tile per stream
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub stabilization: StabilizationConfig,
    pub output: OutputConfig,
    pub layout: LayoutConfig,
    pub streams: Vec<StreamConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            stabilization: StabilizationConfig::default(),
            output: OutputConfig::default(),
            layout: LayoutConfig::default(),
            streams: vec![
                StreamConfig::new("top", "TOP VIEW"),
                StreamConfig::new("side", "SIDE VIEW"),
            ],
        }
    }
}

impl AppConfig {
    /// Load configuration from TOML file
    pub fn from_toml_file(path: &PathBuf) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileReadError(path.clone(), e))?;

        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(content)
            .map_err(|e| ConfigError::ParseError(format!("TOML parse error: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn to_toml_file(&self, path: &PathBuf) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(format!("TOML serialize error: {}", e)))?;

        std::fs::write(path, content).map_err(|e| ConfigError::FileWriteError(path.clone(), e))?;

        Ok(())
    }

    /// Apply command line overrides on top of this configuration
    pub fn with_overrides(
        mut self,
        fps: Option<u32>,
        window_seconds: Option<u32>,
        estimator: Option<EstimatorKind>,
        percentile: Option<f64>,
    ) -> Self {
        if let Some(fps) = fps {
            self.stabilization.fps = fps;
        }
        if let Some(window_seconds) = window_seconds {
            self.stabilization.window_seconds = window_seconds;
        }
        if let Some(estimator) = estimator {
            self.stabilization.estimator = estimator;
        }
        if let Some(percentile) = percentile {
            self.stabilization.percentile = percentile;
        }
        self
    }

    /// Title for `stream`, falling back to the derived default
    pub fn title_for(&self, stream: &str) -> String {
        resolve_title(&self.streams, stream)
    }

    /// Add a stream unless one with the same name is already configured
    pub fn ensure_stream(&mut self, name: &str) {
        if !self.streams.iter().any(|s| s.name == name) {
            self.streams.push(StreamConfig::named(name));
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        let stabilization = &self.stabilization;

        if stabilization.fps == 0 || stabilization.fps > 240 {
            return Err(ConfigError::invalid(
                "stabilization.fps",
                format!("{} (must be between 1 and 240)", stabilization.fps),
            ));
        }

        if stabilization.window_seconds == 0 {
            return Err(ConfigError::invalid(
                "stabilization.window_seconds",
                "0 (must be at least 1)",
            ));
        }

        if stabilization.capacity() > MAX_WINDOW_CAPACITY {
            return Err(ConfigError::invalid(
                "stabilization.window_seconds",
                format!(
                    "{} (window of {} samples exceeds {})",
                    stabilization.window_seconds,
                    stabilization.capacity(),
                    MAX_WINDOW_CAPACITY
                ),
            ));
        }

        let p = stabilization.percentile;
        if !p.is_finite() || p <= 0.0 || p > 1.0 {
            return Err(ConfigError::invalid(
                "stabilization.percentile",
                format!("{} (must be within (0, 1])", p),
            ));
        }

        let mut seen = HashSet::new();
        for stream in &self.streams {
            if !is_valid_stream_name(&stream.name) {
                return Err(ConfigError::invalid("streams.name", stream.name.clone()));
            }
            if !seen.insert(stream.name.as_str()) {
                return Err(ConfigError::invalid(
                    "streams.name",
                    format!("{} (duplicate)", stream.name),
                ));
            }
        }

        if self.layout.width == 0 || self.layout.height == 0 {
            return Err(ConfigError::invalid(
                "layout",
                format!("{}x{} (dimensions must be greater than 0)", self.layout.width, self.layout.height),
            ));
        }

        Ok(())
    }
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {0}: {1}")]
    FileReadError(PathBuf, std::io::Error),

    #[error("Failed to write config file {0}: {1}")]
    FileWriteError(PathBuf, std::io::Error),

    #[error("Config parse error: {0}")]
    ParseError(String),

    #[error("Config serialize error: {0}")]
    SerializeError(String),

    #[error("Invalid configuration value: {field} = {value}")]
    InvalidValue { field: String, value: String },
}

impl ConfigError {
    fn invalid(field: &str, value: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            field: field.to_string(),
            value: value.into(),
        }
    }
}
