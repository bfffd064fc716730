//! Sensor service — reads, status and actions on live instances.

use std::sync::Arc;
use std::time::Duration;

use sensorhub_domain::command::ExecuteRequest;
use sensorhub_domain::error::{DriverError, SensorHubError};
use sensorhub_domain::reading::SensorReading;
use sensorhub_domain::time::as_millis;
use serde_json::{Value, json};
use tokio::task::JoinSet;

use crate::locks::{SensorGuard, SensorLocks};
use crate::ports::Sensor;
use crate::registry::{SensorHandle, SensorRegistry, SensorSnapshot};

/// Default budget for one driver call.
pub const DEFAULT_DRIVER_TIMEOUT: Duration = Duration::from_millis(2000);

/// Runs driver calls for one sensor at a time, on the blocking pool.
#[derive(Clone)]
pub struct SensorService {
    registry: Arc<SensorRegistry>,
    locks: Arc<SensorLocks>,
    timeout: Duration,
}

impl SensorService {
    #[must_use]
    pub fn new(registry: Arc<SensorRegistry>, locks: Arc<SensorLocks>, timeout: Duration) -> Self {
        Self {
            registry,
            locks,
            timeout,
        }
    }

    /// Read one sensor and remember the outcome for `status`.
    ///
    /// # Errors
    ///
    /// - [`SensorHubError::SensorNotFound`] for an unknown id.
    /// - [`SensorHubError::SensorUnavailable`] when the sensor is disabled or
    ///   has no instance.
    /// - [`SensorHubError::Execution`] or [`SensorHubError::DriverTimeout`]
    ///   when the driver fails or stalls.
    #[tracing::instrument(skip(self))]
    pub async fn read(&self, sensor_id: &str) -> Result<SensorReading, SensorHubError> {
        self.ensure_known(sensor_id)?;
        let guard = self.locks.acquire(sensor_id).await?;
        let (sensor_type, instance) = self.live(sensor_id)?;

        let outcome = self
            .call(sensor_id, guard, instance, |sensor| sensor.read())
            .await
            .and_then(|result| {
                result.map_err(|source| SensorHubError::Execution {
                    sensor_id: sensor_id.to_string(),
                    source,
                })
            });

        let reading = match &outcome {
            Ok(data) => SensorReading::success(sensor_id, &sensor_type, data.clone()),
            Err(err) => SensorReading::failure(sensor_id, &sensor_type, err),
        };
        self.registry.record_reading(sensor_id, reading.meta());
        outcome.map(|_| reading)
    }

    /// Read every enabled sensor concurrently, reporting in registry order.
    ///
    /// Failed reads appear as error readings. Sensors that are disabled,
    /// removed or not running when their turn comes are skipped.
    #[tracing::instrument(skip(self))]
    pub async fn read_all(&self) -> Vec<SensorReading> {
        let ids = self.registry.enabled_ids();
        let mut tasks = JoinSet::new();
        for (index, sensor_id) in ids.iter().cloned().enumerate() {
            let service = self.clone();
            tasks.spawn(async move {
                let result = service.read(&sensor_id).await;
                (index, sensor_id, result)
            });
        }

        let mut slots: Vec<Option<SensorReading>> = vec![None; ids.len()];
        while let Some(joined) = tasks.join_next().await {
            let Ok((index, sensor_id, result)) = joined else {
                tracing::error!("sensor read task aborted");
                continue;
            };
            slots[index] = match result {
                Ok(reading) => Some(reading),
                Err(SensorHubError::SensorNotFound(_) | SensorHubError::SensorUnavailable(_)) => {
                    None
                }
                Err(err) => {
                    tracing::warn!(%sensor_id, error = %err.chain_message(), "sensor read failed");
                    let sensor_type = self
                        .registry
                        .definition(&sensor_id)
                        .map(|definition| definition.sensor_type)
                        .unwrap_or_default();
                    Some(SensorReading::failure(sensor_id, sensor_type, &err))
                }
            };
        }
        slots.into_iter().flatten().collect()
    }

    /// Invoke a named action on one sensor and return the driver's result.
    ///
    /// # Errors
    ///
    /// - [`SensorHubError::SensorNotFound`] / [`SensorHubError::SensorUnavailable`]
    ///   as for [`read`](Self::read).
    /// - [`SensorHubError::UnsupportedExecuteAction`] when the driver does not
    ///   know the action.
    /// - [`SensorHubError::Execution`] or [`SensorHubError::DriverTimeout`].
    #[tracing::instrument(skip(self, request), fields(sensor_id = %request.sensor_id, action = %request.execute_action))]
    pub async fn execute(&self, request: &ExecuteRequest) -> Result<Value, SensorHubError> {
        let sensor_id = request.sensor_id.as_str();
        self.ensure_known(sensor_id)?;
        let guard = self.locks.acquire(sensor_id).await?;
        let (_, instance) = self.live(sensor_id)?;

        let action = request.execute_action.clone();
        let params = request.execute_params.clone();
        let result = self
            .call(sensor_id, guard, instance, move |sensor| {
                sensor.execute(&action, &params)
            })
            .await?
            .map_err(|err| SensorHubError::from_execute(sensor_id, err))?;
        tracing::debug!("action executed");
        Ok(result)
    }

    /// Status of one sensor: definition, liveness, last read, driver fields.
    ///
    /// # Errors
    ///
    /// Returns [`SensorHubError::SensorNotFound`] for an unknown id.
    pub fn status(&self, sensor_id: &str) -> Result<Value, SensorHubError> {
        self.registry
            .snapshot(sensor_id)
            .map(|snapshot| status_of(&snapshot))
            .ok_or_else(|| SensorHubError::SensorNotFound(sensor_id.to_string()))
    }

    /// Status of every sensor, in registry order.
    #[must_use]
    pub fn status_all(&self) -> Value {
        let sensors: Vec<Value> = self.registry.snapshots().iter().map(status_of).collect();
        json!({
            "total_sensors": sensors.len(),
            "sensors": sensors,
        })
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<SensorRegistry> {
        &self.registry
    }

    fn ensure_known(&self, sensor_id: &str) -> Result<(), SensorHubError> {
        if self.registry.contains(sensor_id) {
            Ok(())
        } else {
            Err(SensorHubError::SensorNotFound(sensor_id.to_string()))
        }
    }

    /// Type tag and instance of a sensor that is enabled and running.
    fn live(&self, sensor_id: &str) -> Result<(String, SensorHandle), SensorHubError> {
        let snapshot = self
            .registry
            .snapshot(sensor_id)
            .ok_or_else(|| SensorHubError::SensorNotFound(sensor_id.to_string()))?;
        match snapshot.instance {
            Some(instance) if snapshot.definition.enabled => {
                Ok((snapshot.definition.sensor_type, instance))
            }
            _ => Err(SensorHubError::SensorUnavailable(sensor_id.to_string())),
        }
    }

    /// Run a blocking driver call under the configured timeout.
    ///
    /// The guard and the instance travel with the call: when the timeout
    /// fires, the sensor stays locked and its instance alive until the
    /// driver returns, so no other call or replacement instance overlaps it.
    async fn call<T, F>(
        &self,
        sensor_id: &str,
        guard: SensorGuard,
        instance: SensorHandle,
        work: F,
    ) -> Result<Result<T, DriverError>, SensorHubError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn Sensor) -> Result<T, DriverError> + Send + 'static,
    {
        let task = tokio::task::spawn_blocking(move || {
            let result = work(instance.as_ref());
            drop(instance);
            drop(guard);
            result
        });
        match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(join_error)) => Err(SensorHubError::Execution {
                sensor_id: sensor_id.to_string(),
                source: DriverError::Io(std::io::Error::other(join_error)),
            }),
            Err(_) => {
                tracing::warn!(sensor_id, timeout_ms = as_millis(self.timeout), "driver call timed out");
                Err(SensorHubError::DriverTimeout {
                    sensor_id: sensor_id.to_string(),
                    timeout_ms: as_millis(self.timeout),
                })
            }
        }
    }
}

fn status_of(snapshot: &SensorSnapshot) -> Value {
    let definition = &snapshot.definition;
    json!({
        "sensor_id": definition.sensor_id,
        "sensor_type": definition.sensor_type,
        "alias": definition.alias,
        "enabled": definition.enabled,
        "initialized": snapshot.is_initialized(),
        "inputs": definition.inputs,
        "last_reading": snapshot.last_reading,
        "driver": snapshot
            .instance
            .as_ref()
            .map_or(Value::Null, |instance| instance.status()),
    })
}
