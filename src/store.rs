// src/store.rs - Random-walk state for every configured sensor
use crate::{
    drift::DriftSource,
    error::{Result, SimError},
    payload::Batch,
    sensor::{Channel, SensorReading},
};
use std::collections::HashMap;
use tracing::trace;

/// Current reading of every configured sensor, advanced one tick at a time.
///
/// The sensor set and its order are fixed at construction. Each sensor starts
/// at the baseline reading and drifts by a bounded uniform step per tick,
/// saturating at the channel limits.
///
/// # Examples
///
/// ```rust
/// use tank_sensor_sim::{FixedDrift, SensorStateStore};
///
/// let mut store = SensorStateStore::new(1, ["SN-G-001", "S3"], FixedDrift(0.0))?;
/// let batch = store.advance_all();
/// assert_eq!(batch.tank_id, 1);
/// assert_eq!(batch.readings.len(), 2);
/// assert_eq!(batch.readings[0].o2, 20.9);
/// # Ok::<(), tank_sensor_sim::SimError>(())
/// ```
#[derive(Debug)]
pub struct SensorStateStore<D> {
    tank_id: u32,
    readings: Vec<SensorReading>,
    index: HashMap<String, usize>,
    drift: D,
}

impl<D: DriftSource> SensorStateStore<D> {
    /// Create the store with every sensor at baseline.
    ///
    /// Fails on an empty sensor list or a repeated id.
    pub fn new<I, S>(tank_id: u32, sensor_ids: I, drift: D) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut readings = Vec::new();
        let mut index = HashMap::new();

        for id in sensor_ids {
            let id = id.into();
            if index.insert(id.clone(), readings.len()).is_some() {
                return Err(SimError::Config(format!("Duplicate sensor id '{}'", id)));
            }
            readings.push(SensorReading::baseline(id));
        }

        if readings.is_empty() {
            return Err(SimError::Config("At least one sensor must be configured".to_string()));
        }

        Ok(Self {
            tank_id,
            readings,
            index,
            drift,
        })
    }

    /// Advance one sensor by a single tick and return its new reading.
    pub fn advance(&mut self, sensor_id: &str) -> Result<SensorReading> {
        let slot = *self
            .index
            .get(sensor_id)
            .ok_or_else(|| SimError::SensorNotFound(sensor_id.to_string()))?;
        Ok(self.advance_slot(slot))
    }

    /// Advance every sensor in configured order and collect the batch.
    pub fn advance_all(&mut self) -> Batch {
        let readings = (0..self.readings.len())
            .map(|slot| self.advance_slot(slot))
            .collect();

        Batch {
            tank_id: self.tank_id,
            readings,
        }
    }

    fn advance_slot(&mut self, slot: usize) -> SensorReading {
        let reading = &mut self.readings[slot];
        for channel in Channel::ALL {
            let next = channel.limits().apply(reading.get(channel), self.drift.draw());
            reading.set(channel, next);
        }
        trace!(
            "Sensor '{}' -> O2={:.3} CO={:.3} LEL={:.3} H2S={:.3}",
            reading.sensor_id, reading.o2, reading.co, reading.lel, reading.h2s
        );
        reading.clone()
    }
}

impl<D> SensorStateStore<D> {
    /// Tank identifier attached to every batch.
    pub fn tank_id(&self) -> u32 {
        self.tank_id
    }

    /// Current reading for a sensor, if configured.
    pub fn get(&self, sensor_id: &str) -> Option<&SensorReading> {
        self.index.get(sensor_id).map(|&slot| &self.readings[slot])
    }

    /// Current readings in configured order.
    pub fn readings(&self) -> &[SensorReading] {
        &self.readings
    }

    /// Sensor ids in configured order.
    pub fn sensor_ids(&self) -> impl Iterator<Item = &str> {
        self.readings.iter().map(|r| r.sensor_id.as_str())
    }

    /// Number of configured sensors.
    pub fn len(&self) -> usize {
        self.readings.len()
    }

    /// Whether the store holds no sensors. A constructed store never does.
    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }
}
