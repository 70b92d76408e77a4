// src/payload.rs - Per-tick batch and its wire encoding
use crate::{error::Result, sensor::SensorReading};
use serde::{Deserialize, Serialize};

/// All readings produced in one tick, tagged with the tank they belong to.
///
/// Encodes as:
///
/// ```json
/// {"tank_id": 1, "readings": [{"sensor_id": "S3", "O2": 20.9, "CO": 8.0, "LEL": 2.0, "H2S": 2.0}]}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    /// Static tank identifier
    pub tank_id: u32,
    /// One reading per configured sensor, in configured order
    pub readings: Vec<SensorReading>,
}

impl Batch {
    /// Serialize to the JSON text sent to the broker.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a payload previously produced by [`Batch::to_json`].
    pub fn from_json(payload: &str) -> Result<Self> {
        Ok(serde_json::from_str(payload)?)
    }

    /// Number of readings in the batch.
    pub fn len(&self) -> usize {
        self.readings.len()
    }

    /// True when the batch carries no readings.
    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// Sensor ids in batch order.
    pub fn sensor_ids(&self) -> impl Iterator<Item = &str> {
        self.readings.iter().map(|r| r.sensor_id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn batch() -> Batch {
        Batch {
            tank_id: 1,
            readings: vec![SensorReading::baseline("SN-G-001"), SensorReading::baseline("S3")],
        }
    }

    #[test]
    fn wire_shape_is_exact() {
        let json: Value = serde_json::from_str(&batch().to_json().unwrap()).unwrap();
        let object = json.as_object().unwrap();
        assert_eq!(object.len(), 2);
        assert_eq!(json["tank_id"], 1);

        let readings = json["readings"].as_array().unwrap();
        assert_eq!(readings.len(), 2);
        let first = readings[0].as_object().unwrap();
        let mut keys: Vec<&str> = first.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, ["CO", "H2S", "LEL", "O2", "sensor_id"]);
        assert_eq!(readings[0]["sensor_id"], "SN-G-001");
        assert_eq!(readings[1]["sensor_id"], "S3");
    }

    #[test]
    fn payload_parses_back() {
        let original = batch();
        let parsed = Batch::from_json(&original.to_json().unwrap()).unwrap();
        assert_eq!(parsed, original);
        assert_eq!(parsed.sensor_ids().collect::<Vec<_>>(), ["SN-G-001", "S3"]);
    }

    #[test]
    fn malformed_payload_is_an_encoding_error() {
        let err = Batch::from_json("{\"tank_id\": \"x\"}").unwrap_err();
        assert!(matches!(err, crate::SimError::Encoding(_)));
    }
}
