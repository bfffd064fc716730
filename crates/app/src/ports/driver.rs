//! Driver port — the capability every sensor kind provides.
//!
//! A [`SensorDriver`] is a factory registered under a type tag. It turns a
//! definition's inputs into a live [`Sensor`] bound to hardware (or to a
//! simulation of it). Calls on a [`Sensor`] are synchronous and may block;
//! the services run them on the blocking pool under a timeout.

use sensorhub_domain::definition::Inputs;
use sensorhub_domain::error::DriverError;
use serde_json::{Map, Value};

/// A live sensor or actuator instance.
///
/// Dropping the instance releases whatever it holds (pins, bus handles).
pub trait Sensor: Send + Sync {
    /// Take one measurement.
    ///
    /// # Errors
    ///
    /// Returns a [`DriverError`] when the device cannot be read.
    fn read(&self) -> Result<Value, DriverError>;

    /// Driver-specific status fields. Must not touch the device.
    fn status(&self) -> Value {
        Value::Object(Map::new())
    }

    /// Perform a named action with JSON parameters.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::UnsupportedAction`] for unknown actions, or
    /// another [`DriverError`] when the action fails.
    fn execute(&self, action: &str, params: &Value) -> Result<Value, DriverError> {
        let _ = params;
        Err(DriverError::UnsupportedAction(action.to_string()))
    }

    /// Apply the full set of inputs after construction.
    ///
    /// # Errors
    ///
    /// Returns a [`DriverError`] when an input is rejected.
    fn configure(&self, inputs: &Inputs) -> Result<(), DriverError> {
        let _ = inputs;
        Ok(())
    }
}

/// Factory for one sensor kind.
pub trait SensorDriver: Send + Sync {
    /// Type tag definitions use to select this driver (e.g. `"dout"`).
    fn sensor_type(&self) -> &'static str;

    /// Build a live instance from a definition's inputs.
    ///
    /// # Errors
    ///
    /// Returns a [`DriverError`] when a required input is missing or invalid.
    fn instantiate(&self, inputs: &Inputs) -> Result<Box<dyn Sensor>, DriverError>;
}
