//! Digital output (relay, LED) — responds to `toggle`, `set_output`,
//! `turn_on`, `turn_off`.

use std::sync::Mutex;

use sensorhub_app::ports::{Sensor, SensorDriver};
use sensorhub_domain::definition::Inputs;
use sensorhub_domain::error::DriverError;
use serde_json::{Value, json};

use crate::inputs;

/// Driver for `dout`. Inputs: `pin_no`, optional `initial_value`.
pub struct DigitalOutputDriver;

impl SensorDriver for DigitalOutputDriver {
    fn sensor_type(&self) -> &'static str {
        "dout"
    }

    fn instantiate(&self, inputs: &Inputs) -> Result<Box<dyn Sensor>, DriverError> {
        let pin = inputs::pin(inputs)?;
        let initial = inputs::flag(inputs, "initial_value", false)?;
        tracing::debug!(pin, initial, "claimed digital output");
        Ok(Box::new(DigitalOutput {
            pin,
            level: Mutex::new(initial),
        }))
    }
}

/// A simulated output line.
pub struct DigitalOutput {
    pin: u8,
    level: Mutex<bool>,
}

impl DigitalOutput {
    fn level(&self) -> std::sync::MutexGuard<'_, bool> {
        self.level
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Sensor for DigitalOutput {
    fn read(&self) -> Result<Value, DriverError> {
        Ok(json!({ "value": *self.level() }))
    }

    fn status(&self) -> Value {
        json!({ "pin_no": self.pin, "value": *self.level() })
    }

    fn execute(&self, action: &str, params: &Value) -> Result<Value, DriverError> {
        let mut level = self.level();
        match action {
            "toggle" => *level = !*level,
            "turn_on" => *level = true,
            "turn_off" => *level = false,
            "set_output" => {
                *level = inputs::bool_param(params, "value")?.unwrap_or(false);
            }
            other => return Err(DriverError::UnsupportedAction(other.to_string())),
        }
        Ok(json!({ "value": *level }))
    }
}

impl Drop for DigitalOutput {
    fn drop(&mut self) {
        tracing::debug!(pin = self.pin, "released digital output");
    }
}
