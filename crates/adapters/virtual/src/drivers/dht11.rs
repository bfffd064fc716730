//! DHT11 temperature and humidity sensor.
//!
//! Values cycle through a fixed pattern so readings are reproducible.
//! `fail_every = n` makes every n-th read fail with a checksum error, the
//! way the real single-wire protocol occasionally does.

use std::sync::atomic::{AtomicU64, Ordering};

use sensorhub_app::ports::{Sensor, SensorDriver};
use sensorhub_domain::definition::Inputs;
use sensorhub_domain::error::DriverError;
use serde_json::{Value, json};

use crate::inputs;

const BASE_TEMPERATURE: f64 = 21.0;
const BASE_HUMIDITY: f64 = 40.0;

/// Driver for `dht11`. Inputs: `pin_no`, optional `fail_every`.
pub struct Dht11Driver;

impl SensorDriver for Dht11Driver {
    fn sensor_type(&self) -> &'static str {
        "dht11"
    }

    fn instantiate(&self, inputs: &Inputs) -> Result<Box<dyn Sensor>, DriverError> {
        let pin = inputs::pin(inputs)?;
        let fail_every = match inputs.get("fail_every") {
            None => None,
            Some(value) => {
                let every = value
                    .as_i64()
                    .and_then(|n| u64::try_from(n).ok())
                    .filter(|n| *n > 0)
                    .ok_or_else(|| DriverError::InvalidInput {
                        key: "fail_every".to_string(),
                        reason: "expected a positive integer".to_string(),
                    })?;
                Some(every)
            }
        };
        Ok(Box::new(Dht11 {
            pin,
            fail_every,
            reads: AtomicU64::new(0),
        }))
    }
}

pub struct Dht11 {
    pin: u8,
    fail_every: Option<u64>,
    reads: AtomicU64,
}

impl Sensor for Dht11 {
    #[allow(clippy::cast_precision_loss)]
    fn read(&self) -> Result<Value, DriverError> {
        let count = self.reads.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(every) = self.fail_every
            && count % every == 0
        {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "checksum mismatch",
            )
            .into());
        }
        let temperature = BASE_TEMPERATURE + 0.5 * (count % 4) as f64;
        let humidity = BASE_HUMIDITY + (count % 3) as f64;
        Ok(json!({
            "temperature": temperature,
            "humidity": humidity,
        }))
    }

    fn status(&self) -> Value {
        json!({ "pin_no": self.pin, "reads": self.reads.load(Ordering::SeqCst) })
    }
}

#[cfg(test)]
mod tests {
    use sensorhub_domain::definition::InputValue;

    use super::*;

    fn sensor(fail_every: Option<i64>) -> Box<dyn Sensor> {
        let mut inputs = Inputs::new();
        inputs.insert("pin_no".to_string(), InputValue::Int(14));
        if let Some(every) = fail_every {
            inputs.insert("fail_every".to_string(), InputValue::Int(every));
        }
        Dht11Driver.instantiate(&inputs).unwrap()
    }

    #[test]
    fn should_read_temperature_and_humidity() {
        let reading = sensor(None).read().unwrap();
        assert_eq!(reading["temperature"], 21.5);
        assert_eq!(reading["humidity"], 41.0);
    }

    #[test]
    fn should_fail_every_nth_read() {
        let sensor = sensor(Some(2));
        assert!(sensor.read().is_ok());
        assert!(matches!(sensor.read(), Err(DriverError::Io(_))));
        assert!(sensor.read().is_ok());
        assert_eq!(sensor.status()["reads"], 3);
    }

    #[test]
    fn should_reject_zero_fail_every() {
        let mut inputs = Inputs::new();
        inputs.insert("pin_no".to_string(), InputValue::Int(14));
        inputs.insert("fail_every".to_string(), InputValue::Int(0));
        assert!(Dht11Driver.instantiate(&inputs).is_err());
    }
}
