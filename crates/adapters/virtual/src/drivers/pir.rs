//! Passive infrared motion sensor.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use sensorhub_app::ports::{Sensor, SensorDriver};
use sensorhub_domain::definition::Inputs;
use sensorhub_domain::error::DriverError;
use serde_json::{Value, json};

use crate::inputs;

/// Driver for `pir`. Inputs: `pin_no`.
pub struct MotionSensorDriver;

impl SensorDriver for MotionSensorDriver {
    fn sensor_type(&self) -> &'static str {
        "pir"
    }

    fn instantiate(&self, inputs: &Inputs) -> Result<Box<dyn Sensor>, DriverError> {
        Ok(Box::new(MotionSensor {
            pin: inputs::pin(inputs)?,
            pending: AtomicBool::new(false),
            detections: AtomicU64::new(0),
        }))
    }
}

/// Motion is latched by `trigger` and cleared by the next read.
pub struct MotionSensor {
    pin: u8,
    pending: AtomicBool,
    detections: AtomicU64,
}

impl Sensor for MotionSensor {
    fn read(&self) -> Result<Value, DriverError> {
        let motion = self.pending.swap(false, Ordering::SeqCst);
        Ok(json!({ "motion": motion }))
    }

    fn status(&self) -> Value {
        json!({
            "pin_no": self.pin,
            "detections": self.detections.load(Ordering::SeqCst),
        })
    }

    fn execute(&self, action: &str, _params: &Value) -> Result<Value, DriverError> {
        match action {
            "trigger" => {
                self.pending.store(true, Ordering::SeqCst);
                let detections = self.detections.fetch_add(1, Ordering::SeqCst) + 1;
                Ok(json!({ "detections": detections }))
            }
            other => Err(DriverError::UnsupportedAction(other.to_string())),
        }
    }
}
