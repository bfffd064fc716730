//! SoC temperature, as reported by the firmware's `vcgencmd`.
//!
//! With a `thermal_zone` input (`thermal_zone0`, `thermal_zone1`, ...) the
//! value is read from that zone's `temp` file under the thermal root, in
//! millidegrees Celsius. Without it the temperature is simulated.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use sensorhub_app::ports::{Sensor, SensorDriver};
use sensorhub_domain::definition::Inputs;
use sensorhub_domain::error::DriverError;
use serde_json::{Value, json};

use crate::inputs;

/// Where the kernel exposes thermal zones.
pub const THERMAL_ROOT: &str = "/sys/class/thermal";

const ZONE_PREFIX: &str = "thermal_zone";

/// Driver for `vcgen`. Inputs: optional `thermal_zone`.
pub struct SocTemperatureDriver {
    thermal_root: PathBuf,
}

impl Default for SocTemperatureDriver {
    fn default() -> Self {
        Self::with_root(THERMAL_ROOT)
    }
}

impl SocTemperatureDriver {
    /// Driver reading zones below `thermal_root` instead of the sysfs one.
    #[must_use]
    pub fn with_root(thermal_root: impl Into<PathBuf>) -> Self {
        Self {
            thermal_root: thermal_root.into(),
        }
    }
}

/// `thermal_zone<N>`, nothing else: the zone name is joined onto a path.
fn is_zone_name(zone: &str) -> bool {
    zone.strip_prefix(ZONE_PREFIX)
        .is_some_and(|index| !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit()))
}

impl SensorDriver for SocTemperatureDriver {
    fn sensor_type(&self) -> &'static str {
        "vcgen"
    }

    fn instantiate(&self, inputs: &Inputs) -> Result<Box<dyn Sensor>, DriverError> {
        let thermal_path = match inputs::text(inputs, "thermal_zone")? {
            None => None,
            Some(zone) if is_zone_name(zone) => Some(self.thermal_root.join(zone).join("temp")),
            Some(_) => {
                return Err(DriverError::InvalidInput {
                    key: "thermal_zone".to_string(),
                    reason: format!("expected `{ZONE_PREFIX}<N>`"),
                });
            }
        };
        Ok(Box::new(SocTemperature {
            thermal_path,
            reads: AtomicU64::new(0),
        }))
    }
}

pub struct SocTemperature {
    thermal_path: Option<PathBuf>,
    reads: AtomicU64,
}

impl SocTemperature {
    fn from_file(path: &Path) -> Result<f64, DriverError> {
        let raw = std::fs::read_to_string(path)?;
        let millis: f64 = raw.trim().parse().map_err(|_| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "thermal zone did not report a temperature",
            )
        })?;
        Ok((millis / 100.0).round() / 10.0)
    }
}

impl Sensor for SocTemperature {
    #[allow(clippy::cast_precision_loss)]
    fn read(&self) -> Result<Value, DriverError> {
        let count = self.reads.fetch_add(1, Ordering::SeqCst);
        let celsius = match &self.thermal_path {
            Some(path) => Self::from_file(path)?,
            None => 45.0 + (count % 10) as f64 / 10.0,
        };
        Ok(json!({ "cpu_temperature": celsius }))
    }

    fn status(&self) -> Value {
        let source = self
            .thermal_path
            .as_ref()
            .map_or_else(|| "simulated".to_string(), |path| path.display().to_string());
        json!({ "source": source })
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn zone_inputs(zone: &str) -> Inputs {
        let mut inputs = Inputs::new();
        inputs.insert("thermal_zone".to_string(), zone.into());
        inputs
    }

    fn thermal_root(content: &str) -> TempDir {
        let root = TempDir::new().unwrap();
        let zone = root.path().join("thermal_zone0");
        std::fs::create_dir_all(&zone).unwrap();
        std::fs::write(zone.join("temp"), content).unwrap();
        root
    }

    #[test]
    fn should_simulate_without_thermal_zone() {
        let sensor = SocTemperatureDriver::default()
            .instantiate(&Inputs::new())
            .unwrap();
        assert_eq!(sensor.read().unwrap()["cpu_temperature"], 45.0);
        assert_eq!(sensor.status()["source"], "simulated");
    }

    #[test]
    fn should_read_millidegrees_from_zone() {
        let root = thermal_root("48312\n");
        let driver = SocTemperatureDriver::with_root(root.path());

        let sensor = driver.instantiate(&zone_inputs("thermal_zone0")).unwrap();
        assert_eq!(sensor.read().unwrap()["cpu_temperature"], 48.3);
    }

    #[test]
    fn should_reject_zone_that_is_not_a_zone_name() {
        let driver = SocTemperatureDriver::default();
        for zone in ["../../etc/shadow", "/etc/shadow", "thermal_zone", "thermal_zone0/../x", "cpu"] {
            assert!(
                matches!(
                    driver.instantiate(&zone_inputs(zone)),
                    Err(DriverError::InvalidInput { .. })
                ),
                "{zone} should be rejected"
            );
        }
    }

    #[test]
    fn should_not_echo_file_content_on_parse_failure() {
        let root = thermal_root("root:$6$hash:19000:0:99999:7:::\n");
        let driver = SocTemperatureDriver::with_root(root.path());
        let sensor = driver.instantiate(&zone_inputs("thermal_zone0")).unwrap();

        let Err(DriverError::Io(err)) = sensor.read() else {
            panic!("garbage must not parse as a temperature");
        };
        let message = err.to_string();
        assert!(!message.contains("root"), "{message}");
        assert!(!message.contains("hash"), "{message}");
    }

    #[test]
    fn should_fail_read_when_zone_is_missing() {
        let root = TempDir::new().unwrap();
        let driver = SocTemperatureDriver::with_root(root.path());

        let sensor = driver.instantiate(&zone_inputs("thermal_zone7")).unwrap();
        assert!(matches!(sensor.read(), Err(DriverError::Io(_))));
    }
}
