use std::time::Duration;
use thiserror::Error;

/// Application level error type used throughout the crate.
#[derive(Error, Debug)]
pub enum SimError {
    /// I/O related failure
    #[error("Io error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or inconsistent configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error while parsing YAML configuration files
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Requested sensor is not part of the configured set
    #[error("Sensor not found: {0}")]
    SensorNotFound(String),

    /// Broker session could not be established
    #[error("Connection failed: {0}")]
    Connect(String),

    /// A single publish was rejected or lost
    #[error("Publish failed: {0}")]
    Send(String),

    /// A publish was not acknowledged in time
    #[error("Publish timed out after {0:?}")]
    Timeout(Duration),

    /// Batch could not be serialized
    #[error("Encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Convenient alias over [`Result`] using [`SimError`]
pub type Result<T> = std::result::Result<T, SimError>;
