//! Digital input (button, reed switch).

use std::sync::Mutex;

use sensorhub_app::ports::{Sensor, SensorDriver};
use sensorhub_domain::definition::Inputs;
use sensorhub_domain::error::DriverError;
use serde_json::{Value, json};

use crate::inputs;

/// Bias applied to the simulated line; decides its idle level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pull {
    Up,
    Down,
    Floating,
}

impl Pull {
    fn parse(inputs: &Inputs) -> Result<Self, DriverError> {
        match inputs::text(inputs, "mode")? {
            None | Some("floating") => Ok(Self::Floating),
            Some("pull_up") => Ok(Self::Up),
            Some("pull_down") => Ok(Self::Down),
            Some(other) => Err(DriverError::InvalidInput {
                key: "mode".to_string(),
                reason: format!("`{other}` is not one of pull_up, pull_down, floating"),
            }),
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Up => "pull_up",
            Self::Down => "pull_down",
            Self::Floating => "floating",
        }
    }
}

/// Driver for `din`. Inputs: `pin_no`, optional `mode`.
pub struct DigitalInputDriver;

impl SensorDriver for DigitalInputDriver {
    fn sensor_type(&self) -> &'static str {
        "din"
    }

    fn instantiate(&self, inputs: &Inputs) -> Result<Box<dyn Sensor>, DriverError> {
        let pin = inputs::pin(inputs)?;
        let pull = Pull::parse(inputs)?;
        Ok(Box::new(DigitalInput {
            pin,
            pull,
            level: Mutex::new(pull == Pull::Up),
        }))
    }
}

/// A simulated input line. `set_level` stands in for the outside world.
pub struct DigitalInput {
    pin: u8,
    pull: Pull,
    level: Mutex<bool>,
}

impl DigitalInput {
    fn level(&self) -> std::sync::MutexGuard<'_, bool> {
        self.level
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Sensor for DigitalInput {
    fn read(&self) -> Result<Value, DriverError> {
        Ok(json!({ "value": *self.level() }))
    }

    fn status(&self) -> Value {
        json!({ "pin_no": self.pin, "mode": self.pull.as_str() })
    }

    fn execute(&self, action: &str, params: &Value) -> Result<Value, DriverError> {
        if action != "set_level" {
            return Err(DriverError::UnsupportedAction(action.to_string()));
        }
        let value = inputs::bool_param(params, "value")?.ok_or_else(|| DriverError::InvalidParam {
            key: "value".to_string(),
            reason: "required".to_string(),
        })?;
        *self.level() = value;
        Ok(json!({ "value": value }))
    }
}
