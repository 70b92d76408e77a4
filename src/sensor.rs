// src/sensor.rs - Gas channels and the per-sensor reading
use serde::{Deserialize, Serialize};
use std::fmt;

/// Per-tick drift and hard bounds for one channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelLimits {
    /// Maximum peak-to-peak swing per tick
    pub step: f64,
    /// Inclusive floor
    pub lo: f64,
    /// Inclusive ceiling
    pub hi: f64,
}

impl ChannelLimits {
    /// Next value for a draw on [-1, 1]: `clamp(prev + draw * step / 2, lo, hi)`.
    ///
    /// Out-of-range draws are clamped to [-1, 1]; NaN and infinite draws count as 0.
    pub fn apply(&self, prev: f64, draw: f64) -> f64 {
        let draw = if draw.is_finite() { draw.clamp(-1.0, 1.0) } else { 0.0 };
        (prev + draw * self.step / 2.0).clamp(self.lo, self.hi)
    }

    /// Whether `value` lies within `[lo, hi]`.
    pub fn contains(&self, value: f64) -> bool {
        value >= self.lo && value <= self.hi
    }
}

/// Measured gas quantities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Oxygen, % vol
    O2,
    /// Carbon monoxide, ppm
    Co,
    /// Lower explosive limit, %
    Lel,
    /// Hydrogen sulphide, ppm
    H2s,
}

impl Channel {
    /// All channels in draw order.
    pub const ALL: [Channel; 4] = [Channel::O2, Channel::Co, Channel::Lel, Channel::H2s];

    /// Drift and bounds for this channel.
    pub const fn limits(self) -> ChannelLimits {
        match self {
            Channel::O2 => ChannelLimits { step: 0.2, lo: 14.0, hi: 21.0 },
            Channel::Co => ChannelLimits { step: 4.0, lo: 0.0, hi: 200.0 },
            Channel::Lel => ChannelLimits { step: 0.7, lo: 0.0, hi: 100.0 },
            Channel::H2s => ChannelLimits { step: 0.7, lo: 0.0, hi: 100.0 },
        }
    }

    /// Baseline value every sensor starts from.
    pub const fn baseline(self) -> f64 {
        match self {
            Channel::O2 => 20.9,
            Channel::Co => 8.0,
            Channel::Lel => 2.0,
            Channel::H2s => 2.0,
        }
    }

    /// Field name on the wire.
    pub const fn as_str(self) -> &'static str {
        match self {
            Channel::O2 => "O2",
            Channel::Co => "CO",
            Channel::Lel => "LEL",
            Channel::H2s => "H2S",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One sensor's instantaneous measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    /// Configured sensor identifier
    pub sensor_id: String,
    /// Oxygen
    #[serde(rename = "O2")]
    pub o2: f64,
    /// Carbon monoxide
    #[serde(rename = "CO")]
    pub co: f64,
    /// Lower explosive limit
    #[serde(rename = "LEL")]
    pub lel: f64,
    /// Hydrogen sulphide
    #[serde(rename = "H2S")]
    pub h2s: f64,
}

impl SensorReading {
    /// Reading at the startup baseline.
    pub fn baseline(sensor_id: impl Into<String>) -> Self {
        Self {
            sensor_id: sensor_id.into(),
            o2: Channel::O2.baseline(),
            co: Channel::Co.baseline(),
            lel: Channel::Lel.baseline(),
            h2s: Channel::H2s.baseline(),
        }
    }

    /// Value of a single channel.
    pub fn get(&self, channel: Channel) -> f64 {
        match channel {
            Channel::O2 => self.o2,
            Channel::Co => self.co,
            Channel::Lel => self.lel,
            Channel::H2s => self.h2s,
        }
    }

    /// Overwrite a single channel. Callers are expected to pass a bounded value.
    pub fn set(&mut self, channel: Channel, value: f64) {
        match channel {
            Channel::O2 => self.o2 = value,
            Channel::Co => self.co = value,
            Channel::Lel => self.lel = value,
            Channel::H2s => self.h2s = value,
        }
    }

    /// Whether every channel is inside its bounds.
    pub fn is_within_bounds(&self) -> bool {
        Channel::ALL
            .iter()
            .all(|&channel| channel.limits().contains(self.get(channel)))
    }
}
