//! Partial configuration updates and the merge law applied by `configure`.
//!
//! A [`SensorConfigPatch`] carries only the keys the operator sent. [`merge`]
//! overlays it on the current definition (or an empty template when the id is
//! new). `inputs` is merged key by key so a wiring change that touches one pin
//! keeps every other input.

use serde::{Deserialize, Deserializer};

use crate::definition::{Inputs, SensorDefinition, validate_sensor_id};
use crate::error::{MalformedCommandError, SensorHubError};

/// Every field optional; absent means "keep the current value".
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SensorConfigPatch {
    #[serde(default)]
    pub sensor_id: Option<String>,
    #[serde(default)]
    pub sensor_type: Option<String>,
    #[serde(default)]
    pub inputs: Option<Inputs>,
    #[serde(default)]
    pub enabled: Option<bool>,
    /// `Some(None)` clears the alias (explicit `null`).
    #[serde(default, deserialize_with = "present_or_null")]
    pub alias: Option<Option<String>>,
}

fn present_or_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl SensorConfigPatch {
    /// Parse a `config` payload.
    ///
    /// # Errors
    ///
    /// Returns [`MalformedCommandError::InvalidField`] when the payload is not
    /// an object or a field has the wrong type.
    pub fn from_value(value: serde_json::Value) -> Result<Self, MalformedCommandError> {
        if !value.is_object() {
            return Err(MalformedCommandError::InvalidField {
                field: "config".to_string(),
                reason: "expected an object".to_string(),
            });
        }
        serde_json::from_value(value).map_err(|err| MalformedCommandError::InvalidField {
            field: "config".to_string(),
            reason: err.to_string(),
        })
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// A patch that sets every field of `definition`.
impl From<&SensorDefinition> for SensorConfigPatch {
    fn from(definition: &SensorDefinition) -> Self {
        Self {
            sensor_id: Some(definition.sensor_id.clone()),
            sensor_type: Some(definition.sensor_type.clone()),
            inputs: Some(definition.inputs.clone()),
            enabled: Some(definition.enabled),
            alias: Some(definition.alias.clone()),
        }
    }
}

/// Overlay `patch` onto `existing` (or a fresh template for `sensor_id`).
///
/// Only structural rules are checked here; whether `sensor_type` names a
/// registered driver is decided by the caller, which owns the driver catalog.
///
/// # Errors
///
/// - [`SensorHubError::MalformedCommand`] for a blank id or an attempt to
///   change `sensor_id`.
/// - [`SensorHubError::UnknownSensorType`] when creating a sensor without a
///   `sensor_type`.
pub fn merge(
    sensor_id: &str,
    existing: Option<&SensorDefinition>,
    patch: &SensorConfigPatch,
) -> Result<SensorDefinition, SensorHubError> {
    validate_sensor_id(sensor_id)?;
    if let Some(given) = &patch.sensor_id
        && given != sensor_id
    {
        return Err(MalformedCommandError::SensorIdMismatch {
            target: sensor_id.to_string(),
            given: given.clone(),
        }
        .into());
    }

    let mut merged = match existing {
        Some(current) => current.clone(),
        None => SensorDefinition {
            sensor_id: sensor_id.to_string(),
            sensor_type: String::new(),
            inputs: Inputs::new(),
            enabled: true,
            alias: None,
        },
    };

    if let Some(sensor_type) = &patch.sensor_type {
        merged.sensor_type.clone_from(sensor_type);
    }
    if merged.sensor_type.trim().is_empty() {
        return Err(SensorHubError::UnknownSensorType(merged.sensor_type));
    }
    if let Some(inputs) = &patch.inputs {
        for (key, value) in inputs {
            merged.inputs.insert(key.clone(), value.clone());
        }
    }
    if let Some(enabled) = patch.enabled {
        merged.enabled = enabled;
    }
    if let Some(alias) = &patch.alias {
        merged.alias.clone_from(alias);
    }

    Ok(merged)
}
