//! Sensor definition — the persisted description of one sensor or actuator.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::MalformedCommandError;

/// Driver-specific wiring parameters (pin numbers, bus addresses, …).
pub type Inputs = BTreeMap<String, InputValue>;

/// A single scalar input value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InputValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl InputValue {
    /// Integer view, accepting integral floats.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            Self::Float(value) if value.fract() == 0.0 => Some(*value as i64),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value),
            _ => None,
        }
    }
}

impl From<i64> for InputValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<bool> for InputValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for InputValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<f64> for InputValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

/// Durable description of a sensor: which driver, how it is wired, whether it runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorDefinition {
    pub sensor_id: String,
    pub sensor_type: String,
    #[serde(default)]
    pub inputs: Inputs,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

fn default_enabled() -> bool {
    true
}

impl SensorDefinition {
    /// Create a builder for constructing a [`SensorDefinition`].
    #[must_use]
    pub fn builder() -> SensorDefinitionBuilder {
        SensorDefinitionBuilder::default()
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`MalformedCommandError::EmptySensorId`] when `sensor_id` is blank.
    pub fn validate(&self) -> Result<(), MalformedCommandError> {
        validate_sensor_id(&self.sensor_id)
    }

    /// Compact listing row.
    #[must_use]
    pub fn summary(&self) -> SensorSummary {
        SensorSummary {
            sensor_id: self.sensor_id.clone(),
            sensor_type: self.sensor_type.clone(),
            enabled: self.enabled,
            alias: self.alias.clone(),
        }
    }
}

/// Reject ids that are empty or whitespace-only.
///
/// # Errors
///
/// Returns [`MalformedCommandError::EmptySensorId`] for blank ids.
pub fn validate_sensor_id(sensor_id: &str) -> Result<(), MalformedCommandError> {
    if sensor_id.trim().is_empty() {
        return Err(MalformedCommandError::EmptySensorId);
    }
    Ok(())
}

/// `(sensor_id, sensor_type, enabled, alias)` row used for listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorSummary {
    pub sensor_id: String,
    pub sensor_type: String,
    pub enabled: bool,
    pub alias: Option<String>,
}

/// Step-by-step builder for [`SensorDefinition`].
#[derive(Debug, Default)]
pub struct SensorDefinitionBuilder {
    sensor_id: Option<String>,
    sensor_type: Option<String>,
    inputs: Inputs,
    enabled: Option<bool>,
    alias: Option<String>,
}

impl SensorDefinitionBuilder {
    #[must_use]
    pub fn sensor_id(mut self, sensor_id: impl Into<String>) -> Self {
        self.sensor_id = Some(sensor_id.into());
        self
    }

    #[must_use]
    pub fn sensor_type(mut self, sensor_type: impl Into<String>) -> Self {
        self.sensor_type = Some(sensor_type.into());
        self
    }

    #[must_use]
    pub fn input(mut self, key: impl Into<String>, value: impl Into<InputValue>) -> Self {
        self.inputs.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    #[must_use]
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Consume the builder, validate, and return a [`SensorDefinition`].
    ///
    /// # Errors
    ///
    /// Returns [`MalformedCommandError::EmptySensorId`] if the id is missing or blank.
    pub fn build(self) -> Result<SensorDefinition, MalformedCommandError> {
        let definition = SensorDefinition {
            sensor_id: self.sensor_id.unwrap_or_default(),
            sensor_type: self.sensor_type.unwrap_or_default(),
            inputs: self.inputs,
            enabled: self.enabled.unwrap_or(true),
            alias: self.alias,
        };
        definition.validate()?;
        Ok(definition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_build_enabled_definition_by_default() {
        let def = SensorDefinition::builder()
            .sensor_id("relay_1")
            .sensor_type("dout")
            .input("pin_no", 17)
            .build()
            .unwrap();
        assert!(def.enabled);
        assert_eq!(def.inputs.get("pin_no"), Some(&InputValue::Int(17)));
        assert!(def.alias.is_none());
    }

    #[test]
    fn should_reject_blank_sensor_id() {
        let result = SensorDefinition::builder()
            .sensor_id("   ")
            .sensor_type("dout")
            .build();
        assert_eq!(result, Err(MalformedCommandError::EmptySensorId));
    }

    #[test]
    fn should_default_enabled_to_true_when_absent_from_json() {
        let def: SensorDefinition = serde_json::from_value(serde_json::json!({
            "sensor_id": "cpu_temp",
            "sensor_type": "vcgen"
        }))
        .unwrap();
        assert!(def.enabled);
        assert!(def.inputs.is_empty());
    }

    #[test]
    fn should_omit_alias_when_serializing_without_one() {
        let def = SensorDefinition::builder()
            .sensor_id("motion_1")
            .sensor_type("pir")
            .input("pin_no", 4)
            .build()
            .unwrap();
        let json = serde_json::to_value(&def).unwrap();
        assert!(json.get("alias").is_none());
        assert_eq!(json["inputs"]["pin_no"], 4);
    }

    #[test]
    fn should_deserialize_scalar_inputs_into_typed_values() {
        let inputs: Inputs = serde_json::from_value(serde_json::json!({
            "pin_no": 14,
            "mode": "pull_up",
            "initial_value": false,
            "offset": 0.5
        }))
        .unwrap();
        assert_eq!(inputs["pin_no"], InputValue::Int(14));
        assert_eq!(inputs["mode"], InputValue::String("pull_up".to_string()));
        assert_eq!(inputs["initial_value"], InputValue::Bool(false));
        assert_eq!(inputs["offset"], InputValue::Float(0.5));
    }

    #[test]
    fn should_reject_nested_input_values() {
        let result: Result<Inputs, _> =
            serde_json::from_value(serde_json::json!({"pin_no": {"nested": 1}}));
        assert!(result.is_err());
    }

    #[test]
    fn should_read_integral_float_as_integer() {
        assert_eq!(InputValue::Float(17.0).as_i64(), Some(17));
        assert_eq!(InputValue::Float(17.5).as_i64(), None);
    }
}
