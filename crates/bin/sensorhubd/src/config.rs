//! Configuration loading — TOML file with environment variable overrides.
//!
//! Looks for `sensorhub.toml` in the working directory. Every field has a
//! default so the file is optional. Environment variables take precedence
//! over file values.

use std::path::PathBuf;
use std::time::Duration;

use sensorhub_domain::definition::SensorDefinition;
use serde::Deserialize;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Device identity and data location.
    pub device: DeviceConfig,
    /// Definition store location.
    pub store: StoreConfig,
    /// Periodic publish settings.
    pub publisher: PublisherConfig,
    /// Driver call settings.
    pub drivers: DriversConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Definitions from `SENSORHUB_SENSORS`, applied at boot for ids the
    /// store does not already hold.
    #[serde(skip)]
    pub seed_sensors: Vec<SensorDefinition>,
}

/// Device identity.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Identifier reported in published payloads; also names the store directory.
    pub id: String,
    /// Root directory for per-device state.
    pub data_dir: PathBuf,
}

/// Definition store configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Explicit store file. Defaults to `<data_dir>/<device id>/sensors.json`.
    pub path: Option<PathBuf>,
}

/// Periodic publish configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PublisherConfig {
    /// Seconds between publishes; `0` disables the loop.
    pub interval_secs: u64,
}

/// Driver call configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DriversConfig {
    /// Budget for one driver `read`/`execute` call.
    pub timeout_ms: u64,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

impl Config {
    /// Load configuration from `sensorhub.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, if an
    /// override cannot be parsed, or if validation fails.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("sensorhub.toml")?;
        config.apply_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(val) = lookup("SENSORHUB_DEVICE_ID") {
            self.device.id = val;
        }
        if let Some(val) = lookup("SENSORHUB_DATA_DIR") {
            self.device.data_dir = PathBuf::from(val);
        }
        if let Some(val) = lookup("SENSORHUB_STORE_PATH") {
            self.store.path = Some(PathBuf::from(val));
        }
        if let Some(val) = lookup("SENSORHUB_PUBLISH_INTERVAL") {
            self.publisher.interval_secs = parse_number("SENSORHUB_PUBLISH_INTERVAL", &val)?;
        }
        if let Some(val) = lookup("SENSORHUB_DRIVER_TIMEOUT_MS") {
            self.drivers.timeout_ms = parse_number("SENSORHUB_DRIVER_TIMEOUT_MS", &val)?;
        }
        if let Some(val) = lookup("SENSORHUB_SENSORS") {
            self.seed_sensors = serde_json::from_str(&val).map_err(ConfigError::Seed)?;
        }
        if let Some(val) = lookup("SENSORHUB_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = lookup("RUST_LOG") {
            self.logging.filter = val;
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let id = self.device.id.trim();
        if id.is_empty() {
            return Err(ConfigError::Validation(
                "device id must not be empty".to_string(),
            ));
        }
        if id.contains(['/', '\\']) || id == "." || id == ".." {
            return Err(ConfigError::Validation(format!(
                "device id `{id}` cannot be used as a directory name"
            )));
        }
        if self.drivers.timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "driver timeout must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Store file location.
    #[must_use]
    pub fn store_path(&self) -> PathBuf {
        self.store.path.clone().unwrap_or_else(|| {
            self.device
                .data_dir
                .join(&self.device.id)
                .join(sensorhub_adapter_storage_json::FILE_NAME)
        })
    }

    /// Publish interval, or `None` when publishing is disabled.
    #[must_use]
    pub fn publish_interval(&self) -> Option<Duration> {
        (self.publisher.interval_secs > 0).then(|| Duration::from_secs(self.publisher.interval_secs))
    }

    #[must_use]
    pub fn driver_timeout(&self) -> Duration {
        Duration::from_millis(self.drivers.timeout_ms)
    }
}

fn parse_number(name: &'static str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Env {
        name,
        value: value.to_string(),
    })
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            id: "sensorhub-device".to_string(),
            data_dir: PathBuf::from("data"),
        }
    }
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self { interval_secs: 60 }
    }
}

impl Default for DriversConfig {
    fn default() -> Self {
        Self { timeout_ms: 2000 }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "sensorhub=info".to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// An environment override is not a number.
    #[error("environment variable {name} must be a non-negative integer, got `{value}`")]
    Env { name: &'static str, value: String },
    /// `SENSORHUB_SENSORS` is not a JSON array of sensor definitions.
    #[error("SENSORHUB_SENSORS must be a JSON array of sensor definitions")]
    Seed(#[source] serde_json::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
