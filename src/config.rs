// src/config.rs - Simulator configuration, read once at startup

use crate::error::{Result, SimError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Environment variable that overrides `mqtt.password`.
pub const PASSWORD_ENV: &str = "TANKSIM_MQTT_PASSWORD";

// ============================================================================
// MAIN CONFIGURATION
// ============================================================================

/// Main simulator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// MQTT configuration
    pub mqtt: MqttConfig,

    /// Ship identifier, used in the publish topic
    pub ship_id: String,

    /// Tank identifier attached to every batch
    pub tank_id: u32,

    /// Sensor ids, in publish order
    pub sensors: Vec<String>,

    /// Pause after each tick, in seconds
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Time allowed for a publish to be acknowledged
    #[serde(default = "default_send_timeout_ms")]
    pub send_timeout_ms: u64,

    /// Time allowed for a single connection attempt
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Connection retry policy
    #[serde(default)]
    pub reconnect: ReconnectConfig,

    /// Fixed RNG seed for reproducible runs
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Config {
    /// Load, apply environment overrides and validate a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        debug!("Loaded configuration from {}", path.display());
        Self::from_yaml(&contents)
    }

    /// Parse, apply environment overrides and validate YAML text.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let mut config: Config = serde_yaml::from_str(yaml)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Replace secrets with values from the environment when present.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(password) = std::env::var(PASSWORD_ENV) {
            self.mqtt.password = Some(password);
        }
    }

    /// Check invariants the rest of the crate relies on.
    pub fn validate(&self) -> Result<()> {
        if self.mqtt.broker.host.trim().is_empty() {
            return Err(SimError::Config("mqtt.broker.host must not be empty".into()));
        }
        if self.mqtt.broker.port == 0 {
            return Err(SimError::Config("mqtt.broker.port must not be 0".into()));
        }
        if self.mqtt.client_id.is_empty() || self.mqtt.client_id.starts_with(' ') {
            return Err(SimError::Config(
                "mqtt.client_id must be non-empty and not start with a space".into(),
            ));
        }
        if self.mqtt.keepalive_secs < 5 {
            return Err(SimError::Config("mqtt.keepalive_secs must be at least 5".into()));
        }
        if self.mqtt.password.is_some() && self.mqtt.username.is_none() {
            return Err(SimError::Config("mqtt.password requires mqtt.username".into()));
        }
        if self.ship_id.is_empty() || self.ship_id.contains(['/', '+', '#']) {
            return Err(SimError::Config(format!(
                "ship_id '{}' must be non-empty and free of '/', '+' and '#'",
                self.ship_id
            )));
        }
        if self.sensors.is_empty() {
            return Err(SimError::Config("At least one sensor must be configured".into()));
        }
        let mut seen = HashSet::new();
        for sensor in &self.sensors {
            if sensor.is_empty() {
                return Err(SimError::Config("Sensor ids must not be empty".into()));
            }
            if !seen.insert(sensor.as_str()) {
                return Err(SimError::Config(format!("Duplicate sensor id '{}'", sensor)));
            }
        }
        if self.interval_secs == 0 {
            return Err(SimError::Config("interval_secs must be greater than 0".into()));
        }
        if self.send_timeout_ms == 0 {
            return Err(SimError::Config("send_timeout_ms must be greater than 0".into()));
        }
        if self.connect_timeout_secs == 0 {
            return Err(SimError::Config("connect_timeout_secs must be greater than 0".into()));
        }
        self.reconnect.validate()
    }

    /// Topic every batch is published to.
    pub fn topic(&self) -> String {
        format!("ship/{}/sensors", self.ship_id)
    }

    /// Pause after each tick.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Publish acknowledgement deadline.
    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }

    /// Deadline for one connection attempt.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

// ============================================================================
// MQTT CONFIGURATION
// ============================================================================

/// MQTT configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MqttConfig {
    /// Broker configuration
    pub broker: MqttBrokerConfig,

    /// Client ID
    #[serde(default = "default_mqtt_client_id")]
    pub client_id: String,

    /// Username
    #[serde(default)]
    pub username: Option<String>,

    /// Password
    #[serde(default)]
    pub password: Option<String>,

    /// Keep alive in seconds
    #[serde(default = "default_mqtt_keepalive")]
    pub keepalive_secs: u64,

    /// TLS configuration
    #[serde(default)]
    pub tls: MqttTlsConfig,
}

/// MQTT broker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MqttBrokerConfig {
    /// Broker host
    pub host: String,

    /// Broker port
    #[serde(default = "default_mqtt_port")]
    pub port: u16,
}

/// MQTT TLS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MqttTlsConfig {
    /// Encrypt the broker session
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// CA bundle to trust instead of the system roots
    #[serde(default)]
    pub ca_cert: Option<PathBuf>,
}

impl Default for MqttTlsConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            ca_cert: None,
        }
    }
}

// ============================================================================
// RECONNECT CONFIGURATION
// ============================================================================

/// Bounded exponential backoff for connection attempts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconnectConfig {
    /// Attempts per connect or reconnect phase, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Wait after the first failed attempt
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Upper bound on any single wait
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl ReconnectConfig {
    /// Wait after failed attempt number `attempt` (1-based), doubling up to the cap.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(32);
        let delay = self.initial_delay_ms.saturating_mul(1u64 << shift);
        Duration::from_millis(delay.min(self.max_delay_ms))
    }

    fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(SimError::Config("reconnect.max_attempts must be at least 1".into()));
        }
        if self.initial_delay_ms > self.max_delay_ms {
            return Err(SimError::Config(
                "reconnect.initial_delay_ms must not exceed reconnect.max_delay_ms".into(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// DEFAULT VALUE FUNCTIONS
// ============================================================================

fn default_true() -> bool { true }
fn default_interval_secs() -> u64 { 3 }
fn default_send_timeout_ms() -> u64 { 5000 }
fn default_connect_timeout_secs() -> u64 { 10 }
fn default_max_attempts() -> u32 { 5 }
fn default_initial_delay_ms() -> u64 { 500 }
fn default_max_delay_ms() -> u64 { 30_000 }
fn default_mqtt_client_id() -> String { "tank-sensor-sim".to_string() }
fn default_mqtt_keepalive() -> u64 { 30 }
fn default_mqtt_port() -> u16 { 8883 }

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MINIMAL: &str = r#"
mqtt:
  broker:
    host: broker.example.net
  username: sim
ship_id: MTGREATMANTA
tank_id: 1
sensors: ["SN-G-001", "CO-L-23B", "S3"]
"#;

    #[test]
    fn minimal_config_gets_defaults() {
        let config = Config::from_yaml(MINIMAL).unwrap();
        assert_eq!(config.mqtt.broker.port, 8883);
        assert_eq!(config.mqtt.client_id, "tank-sensor-sim");
        assert_eq!(config.mqtt.keepalive_secs, 30);
        assert!(config.mqtt.tls.enabled);
        assert_eq!(config.interval(), Duration::from_secs(3));
        assert_eq!(config.send_timeout(), Duration::from_millis(5000));
        assert_eq!(config.reconnect, ReconnectConfig::default());
        assert_eq!(config.seed, None);
        assert_eq!(config.topic(), "ship/MTGREATMANTA/sensors");
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = ReconnectConfig {
            max_attempts: 10,
            initial_delay_ms: 500,
            max_delay_ms: 3000,
        };
        assert_eq!(policy.delay_for(1), Duration::from_millis(500));
        assert_eq!(policy.delay_for(2), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(3), Duration::from_millis(2000));
        assert_eq!(policy.delay_for(4), Duration::from_millis(3000));
        assert_eq!(policy.delay_for(60), Duration::from_millis(3000));
    }

    #[test]
    fn rejects_duplicate_sensors() {
        let yaml = MINIMAL.replace("\"S3\"", "\"SN-G-001\"");
        let err = Config::from_yaml(&yaml).unwrap_err();
        assert!(err.to_string().contains("Duplicate sensor id"));
    }

    #[test]
    fn rejects_wildcards_in_ship_id() {
        let yaml = MINIMAL.replace("MTGREATMANTA", "ship/#");
        assert!(matches!(Config::from_yaml(&yaml), Err(SimError::Config(_))));
    }

    #[test]
    fn rejects_zero_interval() {
        let yaml = format!("{MINIMAL}interval_secs: 0\n");
        assert!(matches!(Config::from_yaml(&yaml), Err(SimError::Config(_))));
    }

    #[test]
    fn rejects_inverted_backoff() {
        let yaml = format!(
            "{MINIMAL}reconnect:\n  initial_delay_ms: 5000\n  max_delay_ms: 100\n"
        );
        assert!(matches!(Config::from_yaml(&yaml), Err(SimError::Config(_))));
    }

    #[test]
    fn missing_fields_are_yaml_errors() {
        assert!(matches!(Config::from_yaml("ship_id: X\n"), Err(SimError::Yaml(_))));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(MINIMAL.as_bytes()).unwrap();
        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.sensors, ["SN-G-001", "CO-L-23B", "S3"]);
    }

    #[test]
    fn missing_file_is_io_error() {
        assert!(matches!(
            Config::from_file("/nonexistent/tank-sensor-sim.yaml"),
            Err(SimError::Io(_))
        ));
    }
}
