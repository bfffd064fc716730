//! Error taxonomy shared across the workspace.
//!
//! Each layer defines its own typed errors and converts into
//! [`SensorHubError`] via `#[from]`. Every variant maps onto a stable
//! [`ErrorKind`] that is reported on the wire.

use std::error::Error as StdError;

use serde::{Deserialize, Serialize};

/// Boxed error used for opaque storage failures.
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Top-level error for sensorhub operations.
#[derive(Debug, thiserror::Error)]
pub enum SensorHubError {
    /// The envelope is missing a required field or carries an invalid one.
    #[error("malformed command")]
    MalformedCommand(#[from] MalformedCommandError),

    /// The `action` field names no known handler.
    #[error("unknown action `{action}`")]
    UnknownAction {
        action: String,
        /// The envelope as received, echoed back for diagnostics.
        envelope: serde_json::Value,
    },

    /// No definition exists for the given id.
    #[error("sensor `{0}` not found")]
    SensorNotFound(String),

    /// The definition exists but has no live instance (disabled or failed to start).
    #[error("sensor `{0}` is disabled or unavailable")]
    SensorUnavailable(String),

    /// No driver is registered under the given type tag.
    #[error("unknown sensor type `{0}`")]
    UnknownSensorType(String),

    /// The driver refused to build an instance from the given inputs.
    #[error("driver `{sensor_type}` rejected the inputs of sensor `{sensor_id}`")]
    DriverInit {
        sensor_id: String,
        sensor_type: String,
        #[source]
        source: DriverError,
    },

    /// A driver call did not complete within the configured budget.
    #[error("sensor `{sensor_id}` did not respond within {timeout_ms} ms")]
    DriverTimeout { sensor_id: String, timeout_ms: u64 },

    /// The driver does not know the requested execute action.
    #[error("action `{action}` is not supported by sensor `{sensor_id}`")]
    UnsupportedExecuteAction { sensor_id: String, action: String },

    /// A driver read or execute call failed.
    #[error("sensor `{sensor_id}` failed")]
    Execution {
        sensor_id: String,
        #[source]
        source: DriverError,
    },

    /// The persisted definition file could not be parsed.
    #[error("stored sensor definitions are corrupt")]
    StoreCorrupt(#[source] BoxError),

    /// The definition file could not be written.
    #[error("failed to persist sensor definitions")]
    StorePersist(#[source] BoxError),
}

/// Reasons an envelope is rejected before any sensor is touched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MalformedCommandError {
    #[error("command must be a JSON object")]
    NotAnObject,

    #[error("missing `action` field")]
    MissingAction,

    #[error("action `{action}` requires field `{field}`")]
    MissingField {
        action: &'static str,
        field: &'static str,
    },

    #[error("field `{field}` is invalid: {reason}")]
    InvalidField { field: String, reason: String },

    #[error("`sensor_id` must not be empty")]
    EmptySensorId,

    #[error("`sensor_id` is immutable: got `{given}` for sensor `{target}`")]
    SensorIdMismatch { target: String, given: String },
}

/// Errors reported by sensor drivers.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("missing input `{0}`")]
    MissingInput(&'static str),

    #[error("input `{key}` is invalid: {reason}")]
    InvalidInput { key: String, reason: String },

    #[error("unsupported action `{0}`")]
    UnsupportedAction(String),

    #[error("parameter `{key}` is invalid: {reason}")]
    InvalidParam { key: String, reason: String },

    #[error("device I/O failed")]
    Io(#[from] std::io::Error),
}

/// Stable wire name for each error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    MalformedCommand,
    UnknownAction,
    SensorNotFound,
    SensorUnavailable,
    UnknownSensorType,
    #[serde(rename = "DriverInitError")]
    DriverInit,
    DriverTimeout,
    #[serde(rename = "ExecutionError")]
    Execution,
    UnsupportedExecuteAction,
    #[serde(rename = "StoreCorruptError")]
    StoreCorrupt,
    #[serde(rename = "StorePersistError")]
    StorePersist,
}

impl SensorHubError {
    /// Category reported on the wire.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MalformedCommand(_) => ErrorKind::MalformedCommand,
            Self::UnknownAction { .. } => ErrorKind::UnknownAction,
            Self::SensorNotFound(_) => ErrorKind::SensorNotFound,
            Self::SensorUnavailable(_) => ErrorKind::SensorUnavailable,
            Self::UnknownSensorType(_) => ErrorKind::UnknownSensorType,
            Self::DriverInit { .. } => ErrorKind::DriverInit,
            Self::DriverTimeout { .. } => ErrorKind::DriverTimeout,
            Self::UnsupportedExecuteAction { .. } => ErrorKind::UnsupportedExecuteAction,
            Self::Execution { .. } => ErrorKind::Execution,
            Self::StoreCorrupt(_) => ErrorKind::StoreCorrupt,
            Self::StorePersist(_) => ErrorKind::StorePersist,
        }
    }

    /// Human-readable message including every `source` in the chain.
    #[must_use]
    pub fn chain_message(&self) -> String {
        let mut message = self.to_string();
        let mut source = self.source();
        while let Some(err) = source {
            message.push_str(": ");
            message.push_str(&err.to_string());
            source = err.source();
        }
        message
    }

    /// Build the error for a driver failure during `execute`.
    #[must_use]
    pub fn from_execute(sensor_id: &str, err: DriverError) -> Self {
        match err {
            DriverError::UnsupportedAction(action) => Self::UnsupportedExecuteAction {
                sensor_id: sensor_id.to_string(),
                action,
            },
            other => Self::Execution {
                sensor_id: sensor_id.to_string(),
                source: other,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_serialize_kinds_with_taxonomy_names() {
        let names: Vec<String> = [
            ErrorKind::DriverInit,
            ErrorKind::Execution,
            ErrorKind::StoreCorrupt,
            ErrorKind::StorePersist,
            ErrorKind::SensorNotFound,
        ]
        .iter()
        .map(|kind| serde_json::to_string(kind).unwrap())
        .collect();
        assert_eq!(
            names,
            [
                "\"DriverInitError\"",
                "\"ExecutionError\"",
                "\"StoreCorruptError\"",
                "\"StorePersistError\"",
                "\"SensorNotFound\"",
            ]
        );
    }

    #[test]
    fn should_convert_malformed_command_via_from() {
        let err: SensorHubError = MalformedCommandError::MissingAction.into();
        assert_eq!(err.kind(), ErrorKind::MalformedCommand);
    }

    #[test]
    fn should_include_source_in_chain_message() {
        let err = SensorHubError::DriverInit {
            sensor_id: "relay_1".to_string(),
            sensor_type: "dout".to_string(),
            source: DriverError::MissingInput("pin_no"),
        };
        assert_eq!(
            err.chain_message(),
            "driver `dout` rejected the inputs of sensor `relay_1`: missing input `pin_no`"
        );
    }

    #[test]
    fn should_map_unsupported_driver_action_to_unsupported_execute_action() {
        let err = SensorHubError::from_execute(
            "display_1",
            DriverError::UnsupportedAction("dance".to_string()),
        );
        assert_eq!(err.kind(), ErrorKind::UnsupportedExecuteAction);
    }

    #[test]
    fn should_map_other_driver_failures_to_execution_error() {
        let err = SensorHubError::from_execute(
            "display_1",
            DriverError::InvalidParam {
                key: "text".to_string(),
                reason: "expected a string".to_string(),
            },
        );
        assert_eq!(err.kind(), ErrorKind::Execution);
    }
}
