//! Command responses — echo the action and target ids for correlation.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ErrorKind, SensorHubError};
use crate::reading::Outcome;
use crate::time::{Timestamp, now};

/// Structured error reported to the command's origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ErrorBody {
    #[must_use]
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl From<&SensorHubError> for ErrorBody {
    fn from(err: &SensorHubError) -> Self {
        let details = match err {
            SensorHubError::UnknownAction { envelope, .. } => {
                Some(serde_json::json!({ "envelope": envelope }))
            }
            _ => None,
        };
        Self {
            kind: err.kind(),
            message: err.chain_message(),
            details,
        }
    }
}

/// Response to one inbound command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandResponse {
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensor_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensor_ids: Option<Vec<String>>,
    pub status: Outcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
    pub timestamp: Timestamp,
}

impl CommandResponse {
    #[must_use]
    pub fn success(action: impl Into<String>, result: Value) -> Self {
        Self {
            action: action.into(),
            sensor_id: None,
            sensor_ids: None,
            status: Outcome::Success,
            result: Some(result),
            error: None,
            timestamp: now(),
        }
    }

    #[must_use]
    pub fn failure(action: impl Into<String>, error: ErrorBody) -> Self {
        Self {
            action: action.into(),
            sensor_id: None,
            sensor_ids: None,
            status: Outcome::Error,
            result: None,
            error: Some(error),
            timestamp: now(),
        }
    }

    #[must_use]
    pub fn with_sensor_id(mut self, sensor_id: Option<String>) -> Self {
        self.sensor_id = sensor_id;
        self
    }

    #[must_use]
    pub fn with_sensor_ids(mut self, sensor_ids: Option<Vec<String>>) -> Self {
        self.sensor_ids = sensor_ids;
        self
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == Outcome::Success
    }
}

/// Outcome of one sub-operation inside `read_multiple` or `batch_execute`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemOutcome {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    pub sensor_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execute_action: Option<String>,
    pub status: Outcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl ItemOutcome {
    #[must_use]
    pub fn from_result(sensor_id: impl Into<String>, result: Result<Value, SensorHubError>) -> Self {
        let (status, result, error) = match result {
            Ok(value) => (Outcome::Success, Some(value), None),
            Err(err) => (Outcome::Error, None, Some(ErrorBody::from(&err))),
        };
        Self {
            index: None,
            sensor_id: sensor_id.into(),
            execute_action: None,
            status,
            result,
            error,
        }
    }

    #[must_use]
    pub fn for_batch(mut self, index: usize, execute_action: impl Into<String>) -> Self {
        self.index = Some(index);
        self.execute_action = Some(execute_action.into());
        self
    }
}
