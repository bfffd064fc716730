//! Command dispatcher — routes one inbound envelope to its handler.
//!
//! Every handled envelope yields exactly one [`CommandResponse`]. Failures
//! are reported in the response, never raised to the transport loop.

use std::sync::Arc;

use sensorhub_domain::command::{Command, ExecuteRequest, envelope_of};
use sensorhub_domain::error::SensorHubError;
use sensorhub_domain::patch::SensorConfigPatch;
use sensorhub_domain::response::{CommandResponse, ErrorBody, ItemOutcome};
use serde_json::{Value, json};

use crate::ports::DefinitionStore;
use crate::services::config_service::ConfigService;
use crate::services::sensor_service::SensorService;

/// Stateless router from [`Command`]s to the sensor and config services.
pub struct CommandDispatcher<S> {
    sensors: SensorService,
    config: Arc<ConfigService<S>>,
}

impl<S> Clone for CommandDispatcher<S> {
    fn clone(&self) -> Self {
        Self {
            sensors: self.sensors.clone(),
            config: Arc::clone(&self.config),
        }
    }
}

impl<S: DefinitionStore + Send + Sync> CommandDispatcher<S> {
    #[must_use]
    pub fn new(sensors: SensorService, config: Arc<ConfigService<S>>) -> Self {
        Self { sensors, config }
    }

    /// Handle a top-level transport message.
    ///
    /// Returns `None` when the message carries no `sensor_command`; such
    /// messages belong to other consumers.
    pub async fn handle_message(&self, message: &Value) -> Option<CommandResponse> {
        let envelope = envelope_of(message)?;
        Some(self.dispatch(envelope).await)
    }

    /// Parse and run one command envelope.
    #[tracing::instrument(skip_all, fields(action))]
    pub async fn dispatch(&self, envelope: &Value) -> CommandResponse {
        match Command::parse(envelope) {
            Ok(command) => {
                tracing::Span::current().record("action", command.action().as_str());
                self.execute(command).await
            }
            Err(err) => {
                tracing::warn!(error = %err.chain_message(), "rejected command");
                CommandResponse::failure(raw_action(envelope), ErrorBody::from(&err))
                    .with_sensor_id(raw_sensor_id(envelope))
                    .with_sensor_ids(raw_sensor_ids(envelope))
            }
        }
    }

    /// Run an already validated command.
    pub async fn execute(&self, command: Command) -> CommandResponse {
        let action = command.action().as_str();
        match command {
            Command::Read {
                sensor_id: Some(sensor_id),
            } => {
                let result = self
                    .sensors
                    .read(&sensor_id)
                    .await
                    .map(|reading| to_json(&reading));
                respond(action, result).with_sensor_id(Some(sensor_id))
            }
            Command::Read { sensor_id: None } => {
                let readings = self.sensors.read_all().await;
                CommandResponse::success(
                    action,
                    json!({ "count": readings.len(), "readings": readings }),
                )
            }
            Command::Status {
                sensor_id: Some(sensor_id),
            } => respond(action, self.sensors.status(&sensor_id)).with_sensor_id(Some(sensor_id)),
            Command::Status { sensor_id: None } => {
                CommandResponse::success(action, self.sensors.status_all())
            }
            Command::List => {
                CommandResponse::success(action, to_json(&self.config.registry().definitions()))
            }
            Command::Execute(request) => {
                let result = self.run_execute(&request).await;
                respond(action, result).with_sensor_id(Some(request.sensor_id))
            }
            Command::Configure { sensor_id, config } => self
                .configure(&sensor_id, &config)
                .await
                .with_sensor_id(Some(sensor_id)),
            Command::ReadMultiple { sensor_ids } => {
                let mut results = Vec::with_capacity(sensor_ids.len());
                for sensor_id in &sensor_ids {
                    let result = self
                        .sensors
                        .read(sensor_id)
                        .await
                        .map(|reading| to_json(&reading));
                    results.push(ItemOutcome::from_result(sensor_id.clone(), result));
                }
                CommandResponse::success(action, json!({ "results": results }))
                    .with_sensor_ids(Some(sensor_ids))
            }
            Command::BatchExecute { commands } => {
                let mut results = Vec::with_capacity(commands.len());
                for (index, request) in commands.iter().enumerate() {
                    let result = self.run_execute(request).await;
                    results.push(
                        ItemOutcome::from_result(request.sensor_id.clone(), result)
                            .for_batch(index, request.execute_action.clone()),
                    );
                }
                let sensor_ids = commands.into_iter().map(|request| request.sensor_id).collect();
                CommandResponse::success(action, json!({ "results": results }))
                    .with_sensor_ids(Some(sensor_ids))
            }
        }
    }

    async fn run_execute(&self, request: &ExecuteRequest) -> Result<Value, SensorHubError> {
        let result = self.sensors.execute(request).await?;
        Ok(json!({
            "execute_action": request.execute_action,
            "execute_params": request.execute_params,
            "result": result,
        }))
    }

    async fn configure(&self, sensor_id: &str, patch: &SensorConfigPatch) -> CommandResponse {
        let action = "configure";
        match self.config.configure(sensor_id, patch).await {
            Ok(definition) => CommandResponse::success(action, json!({ "config": definition })),
            Err(err @ SensorHubError::StorePersist(_)) => {
                let live = self.config.registry().definition(sensor_id);
                let body = ErrorBody::from(&err).with_details(json!({
                    "applied": true,
                    "config": live,
                }));
                CommandResponse::failure(action, body)
            }
            Err(err) => CommandResponse::failure(action, ErrorBody::from(&err)),
        }
    }
}

fn respond(action: &str, result: Result<Value, SensorHubError>) -> CommandResponse {
    match result {
        Ok(value) => CommandResponse::success(action, value),
        Err(err) => {
            tracing::debug!(error = %err.chain_message(), "command failed");
            CommandResponse::failure(action, ErrorBody::from(&err))
        }
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

fn raw_action(envelope: &Value) -> String {
    envelope
        .get("action")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn raw_sensor_id(envelope: &Value) -> Option<String> {
    envelope
        .get("sensor_id")
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn raw_sensor_ids(envelope: &Value) -> Option<Vec<String>> {
    let ids = envelope.get("sensor_ids")?.as_array()?;
    Some(
        ids.iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
    )
}
