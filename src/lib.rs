//! tank-sensor-sim - synthetic gas-sensor telemetry for tank monitoring
//!
//! Generates slowly drifting O2, CO, LEL and H2S readings for a fixed set of
//! sensors and publishes one JSON batch per tick to an MQTT broker. It stands
//! in for real hardware while downstream monitoring is developed.
//!
//! # Feature Flags
//!
//! - **mqtt** (default): the `rumqttc` broker transport and the binary
//!
//! Without `mqtt` the crate still provides the sensor model, the payload and
//! the publish loop, driven through any [`Publisher`] implementation.
//!
//! # Examples
//!
//! ```rust
//! use tank_sensor_sim::{RandomDrift, SensorStateStore};
//!
//! let mut store = SensorStateStore::new(1, ["SN-G-001", "CO-L-23B", "S3"], RandomDrift::seeded(42))?;
//! let batch = store.advance_all();
//! assert_eq!(batch.readings.len(), 3);
//! assert!(batch.readings.iter().all(|r| r.is_within_bounds()));
//! let payload = batch.to_json()?;
//! assert!(payload.starts_with("{\"tank_id\":1,"));
//! # Ok::<(), tank_sensor_sim::SimError>(())
//! ```

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// ============================================================================
// CORE MODULES (always available)
// ============================================================================

/// Error type and result alias
pub mod error;

/// YAML configuration with validation
pub mod config;

/// Gas channels, bounds and the per-sensor reading
pub mod sensor;

/// Injectable random sources
pub mod drift;

/// Random-walk state for every configured sensor
pub mod store;

/// Per-tick batch and its JSON encoding
pub mod payload;

/// Transport seam used by the publish loop
pub mod publisher;

/// Tick cadence, send handling and reconnection
pub mod publish_loop;

// ============================================================================
// PROTOCOL MODULES (feature-gated)
// ============================================================================

#[cfg(feature = "mqtt")]
#[cfg_attr(docsrs, doc(cfg(feature = "mqtt")))]
/// MQTT transport over TLS
pub mod mqtt;

// ============================================================================
// RE-EXPORTS
// ============================================================================

pub use config::Config;
pub use drift::{DriftSource, FixedDrift, RandomDrift, SequenceDrift};
pub use error::{Result, SimError};
pub use payload::Batch;
pub use publish_loop::{LoopSettings, PublishLoop, PublishStats};
pub use publisher::{ConnectionState, Publisher};
pub use sensor::{Channel, ChannelLimits, SensorReading};
pub use store::SensorStateStore;

#[cfg(feature = "mqtt")]
pub use mqtt::MqttPublisher;

// ============================================================================
// VERSION INFORMATION
// ============================================================================

/// Crate version string
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log filter used when `RUST_LOG` is not set
pub const DEFAULT_LOG_FILTER: &str = "tank_sensor_sim=info";

// ============================================================================
// INITIALIZATION
// ============================================================================

/// Install the global tracing subscriber.
///
/// Honours `RUST_LOG`, falling back to [`DEFAULT_LOG_FILTER`]. Calling it more
/// than once is harmless; later calls keep the first subscriber.
pub fn init_logging(json: bool) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let installed = if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false))
            .try_init()
    };

    if installed.is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
}
