//! Command envelope — the inbound JSON request and its typed form.
//!
//! The wire message is `{"sensor_command": {...}}`. The inner envelope is
//! classified by its `action` field into one of seven [`Command`] variants;
//! every required field is checked here so that a malformed envelope is
//! rejected before any sensor is touched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::definition::validate_sensor_id;
use crate::error::{MalformedCommandError, SensorHubError};
use crate::patch::SensorConfigPatch;

/// Top-level key carrying a sensor command inside an inbound message.
pub const COMMAND_KEY: &str = "sensor_command";

/// Extract the command envelope from an inbound message, if it carries one.
#[must_use]
pub fn envelope_of(message: &Value) -> Option<&Value> {
    message.get(COMMAND_KEY)
}

/// The seven supported action kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    Status,
    List,
    Execute,
    Configure,
    ReadMultiple,
    BatchExecute,
}

impl Action {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Status => "status",
            Self::List => "list",
            Self::Execute => "execute",
            Self::Configure => "configure",
            Self::ReadMultiple => "read_multiple",
            Self::BatchExecute => "batch_execute",
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "read" => Self::Read,
            "status" => Self::Status,
            "list" => Self::List,
            "execute" => Self::Execute,
            "configure" => Self::Configure,
            "read_multiple" => Self::ReadMultiple,
            "batch_execute" => Self::BatchExecute,
            _ => return None,
        })
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One named action invoked on one sensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecuteRequest {
    pub sensor_id: String,
    pub execute_action: String,
    #[serde(default)]
    pub execute_params: Value,
}

/// A fully validated command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Read one sensor, or every enabled sensor when `sensor_id` is `None`.
    Read { sensor_id: Option<String> },
    /// Status of one sensor, or of all of them.
    Status { sensor_id: Option<String> },
    /// Every definition, in registry order.
    List,
    Execute(ExecuteRequest),
    Configure {
        sensor_id: String,
        config: SensorConfigPatch,
    },
    ReadMultiple { sensor_ids: Vec<String> },
    BatchExecute { commands: Vec<ExecuteRequest> },
}

impl Command {
    /// Classify and validate an envelope.
    ///
    /// # Errors
    ///
    /// - [`SensorHubError::MalformedCommand`] when the envelope is not an
    ///   object or a required field is missing or mistyped.
    /// - [`SensorHubError::UnknownAction`] when `action` names no handler; the
    ///   envelope is echoed in the error.
    pub fn parse(envelope: &Value) -> Result<Self, SensorHubError> {
        let object = envelope
            .as_object()
            .ok_or(MalformedCommandError::NotAnObject)?;
        let name = match object.get("action") {
            None | Some(Value::Null) => return Err(MalformedCommandError::MissingAction.into()),
            Some(Value::String(name)) => name.as_str(),
            Some(_) => return Err(invalid("action", "expected a string").into()),
        };
        let Some(action) = Action::from_name(name) else {
            return Err(SensorHubError::UnknownAction {
                action: name.to_string(),
                envelope: envelope.clone(),
            });
        };

        let command = match action {
            Action::Read => Self::Read {
                sensor_id: optional_id(object)?,
            },
            Action::Status => Self::Status {
                sensor_id: optional_id(object)?,
            },
            Action::List => Self::List,
            Action::Execute => Self::Execute(parse_execute(object)?),
            Action::Configure => {
                let sensor_id = required_id(object, action)?;
                let config = match object.get("config") {
                    None | Some(Value::Null) => {
                        return Err(missing(action, "config").into());
                    }
                    Some(value) => SensorConfigPatch::from_value(value.clone())?,
                };
                Self::Configure { sensor_id, config }
            }
            Action::ReadMultiple => Self::ReadMultiple {
                sensor_ids: parse_sensor_ids(object)?,
            },
            Action::BatchExecute => Self::BatchExecute {
                commands: parse_batch(object)?,
            },
        };
        Ok(command)
    }

    #[must_use]
    pub fn action(&self) -> Action {
        match self {
            Self::Read { .. } => Action::Read,
            Self::Status { .. } => Action::Status,
            Self::List => Action::List,
            Self::Execute(_) => Action::Execute,
            Self::Configure { .. } => Action::Configure,
            Self::ReadMultiple { .. } => Action::ReadMultiple,
            Self::BatchExecute { .. } => Action::BatchExecute,
        }
    }
}

fn missing(action: Action, field: &'static str) -> MalformedCommandError {
    MalformedCommandError::MissingField {
        action: action.as_str(),
        field,
    }
}

fn invalid(field: impl Into<String>, reason: impl Into<String>) -> MalformedCommandError {
    MalformedCommandError::InvalidField {
        field: field.into(),
        reason: reason.into(),
    }
}

fn id_from(value: &Value, field: impl Into<String>) -> Result<String, MalformedCommandError> {
    let Value::String(id) = value else {
        return Err(invalid(field, "expected a string"));
    };
    validate_sensor_id(id)?;
    Ok(id.clone())
}

fn optional_id(object: &Map<String, Value>) -> Result<Option<String>, MalformedCommandError> {
    match object.get("sensor_id") {
        None | Some(Value::Null) => Ok(None),
        Some(value) => id_from(value, "sensor_id").map(Some),
    }
}

fn required_id(object: &Map<String, Value>, action: Action) -> Result<String, MalformedCommandError> {
    optional_id(object)?.ok_or_else(|| missing(action, "sensor_id"))
}

fn params_or_empty(value: Option<&Value>) -> Value {
    match value {
        None | Some(Value::Null) => Value::Object(Map::new()),
        Some(value) => value.clone(),
    }
}

fn parse_execute(object: &Map<String, Value>) -> Result<ExecuteRequest, MalformedCommandError> {
    let sensor_id = required_id(object, Action::Execute)?;
    let params = match object.get("params") {
        None | Some(Value::Null) => {
            return Err(missing(Action::Execute, "params.execute_action"));
        }
        Some(Value::Object(params)) => params,
        Some(_) => return Err(invalid("params", "expected an object")),
    };
    let execute_action = match params.get("execute_action") {
        None | Some(Value::Null) => {
            return Err(missing(Action::Execute, "params.execute_action"));
        }
        Some(Value::String(name)) if !name.is_empty() => name.clone(),
        Some(_) => return Err(invalid("params.execute_action", "expected a non-empty string")),
    };
    Ok(ExecuteRequest {
        sensor_id,
        execute_action,
        execute_params: params_or_empty(params.get("execute_params")),
    })
}

fn parse_sensor_ids(object: &Map<String, Value>) -> Result<Vec<String>, MalformedCommandError> {
    let ids = match object.get("sensor_ids") {
        None | Some(Value::Null) => return Err(missing(Action::ReadMultiple, "sensor_ids")),
        Some(Value::Array(ids)) => ids,
        Some(_) => return Err(invalid("sensor_ids", "expected an array")),
    };
    ids.iter()
        .enumerate()
        .map(|(index, id)| id_from(id, format!("sensor_ids[{index}]")))
        .collect()
}

fn parse_batch(object: &Map<String, Value>) -> Result<Vec<ExecuteRequest>, MalformedCommandError> {
    let commands = match object.get("commands") {
        None | Some(Value::Null) => return Err(missing(Action::BatchExecute, "commands")),
        Some(Value::Array(commands)) => commands,
        Some(_) => return Err(invalid("commands", "expected an array")),
    };
    commands
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let field = |name: &str| format!("commands[{index}].{name}");
            let Value::Object(item) = item else {
                return Err(invalid(format!("commands[{index}]"), "expected an object"));
            };
            let sensor_id = match item.get("sensor_id") {
                None | Some(Value::Null) => return Err(invalid(field("sensor_id"), "missing")),
                Some(value) => id_from(value, field("sensor_id"))?,
            };
            let execute_action = match item.get("execute_action") {
                Some(Value::String(name)) if !name.is_empty() => name.clone(),
                None | Some(Value::Null) => {
                    return Err(invalid(field("execute_action"), "missing"));
                }
                Some(_) => {
                    return Err(invalid(
                        field("execute_action"),
                        "expected a non-empty string",
                    ));
                }
            };
            Ok(ExecuteRequest {
                sensor_id,
                execute_action,
                execute_params: params_or_empty(item.get("execute_params")),
            })
        })
        .collect()
}
