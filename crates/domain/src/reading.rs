//! Sensor readings and the metadata kept about the last one.

use serde::{Deserialize, Serialize};

use crate::error::SensorHubError;
use crate::time::{Timestamp, now};

/// Outcome marker carried by readings and per-item results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Success,
    Error,
}

/// Standardized reading published for one sensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub sensor_id: String,
    pub sensor_type: String,
    pub data: serde_json::Value,
    pub timestamp: Timestamp,
    pub status: Outcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SensorReading {
    #[must_use]
    pub fn success(
        sensor_id: impl Into<String>,
        sensor_type: impl Into<String>,
        data: serde_json::Value,
    ) -> Self {
        Self {
            sensor_id: sensor_id.into(),
            sensor_type: sensor_type.into(),
            data,
            timestamp: now(),
            status: Outcome::Success,
            error: None,
        }
    }

    #[must_use]
    pub fn failure(
        sensor_id: impl Into<String>,
        sensor_type: impl Into<String>,
        err: &SensorHubError,
    ) -> Self {
        Self {
            sensor_id: sensor_id.into(),
            sensor_type: sensor_type.into(),
            data: serde_json::Value::Object(serde_json::Map::new()),
            timestamp: now(),
            status: Outcome::Error,
            error: Some(err.chain_message()),
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == Outcome::Success
    }

    /// Metadata retained by the registry after this reading.
    #[must_use]
    pub fn meta(&self) -> ReadingMeta {
        ReadingMeta {
            timestamp: self.timestamp,
            status: self.status,
            error: self.error.clone(),
        }
    }
}

/// Last-read metadata reported by `status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadingMeta {
    pub timestamp: Timestamp,
    pub status: Outcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
