//! Config service — partial-update merge engine over registry and store.

use std::sync::Arc;

use sensorhub_domain::definition::SensorDefinition;
use sensorhub_domain::error::SensorHubError;
use sensorhub_domain::patch::{SensorConfigPatch, merge};

use crate::locks::SensorLocks;
use crate::ports::DefinitionStore;
use crate::registry::SensorRegistry;

/// Applies config patches and removals, then persists the full set.
pub struct ConfigService<S> {
    registry: Arc<SensorRegistry>,
    locks: Arc<SensorLocks>,
    store: S,
    persist_lock: tokio::sync::Mutex<()>,
}

impl<S: DefinitionStore + Send + Sync> ConfigService<S> {
    pub fn new(registry: Arc<SensorRegistry>, locks: Arc<SensorLocks>, store: S) -> Self {
        Self {
            registry,
            locks,
            store,
            persist_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Merge `patch` into the definition of `sensor_id` (creating it when
    /// unknown), restart the sensor and persist every definition.
    ///
    /// # Errors
    ///
    /// - [`SensorHubError::MalformedCommand`] for an invalid id or an
    ///   attempt to change `sensor_id`.
    /// - [`SensorHubError::UnknownSensorType`] when the resulting type has no
    ///   registered driver.
    /// - [`SensorHubError::DriverInit`] when the driver rejects the merged
    ///   inputs; the previous definition stays active.
    /// - [`SensorHubError::StorePersist`] when the save fails; the new
    ///   definition is live regardless.
    /// - [`SensorHubError::DriverTimeout`] when a stalled driver call keeps
    ///   the sensor busy; nothing changes.
    #[tracing::instrument(skip(self, patch))]
    pub async fn configure(
        &self,
        sensor_id: &str,
        patch: &SensorConfigPatch,
    ) -> Result<SensorDefinition, SensorHubError> {
        let _guard = self.locks.acquire(sensor_id).await?;

        let existing = self.registry.definition(sensor_id);
        let merged = merge(sensor_id, existing.as_ref(), patch)?;
        if (existing.is_none() || patch.sensor_type.is_some())
            && !self.registry.catalog().contains(&merged.sensor_type)
        {
            return Err(SensorHubError::UnknownSensorType(merged.sensor_type));
        }

        self.registry.upsert(merged.clone())?;
        tracing::info!(
            sensor_type = %merged.sensor_type,
            enabled = merged.enabled,
            created = existing.is_none(),
            "sensor configured"
        );
        self.persist().await?;
        Ok(merged)
    }

    /// Drop the sensor and persist the remaining definitions.
    ///
    /// # Errors
    ///
    /// - [`SensorHubError::SensorNotFound`] for an unknown id.
    /// - [`SensorHubError::StorePersist`] when the save fails; the sensor is
    ///   gone from the registry regardless.
    #[tracing::instrument(skip(self))]
    pub async fn remove(&self, sensor_id: &str) -> Result<SensorDefinition, SensorHubError> {
        let _guard = self.locks.acquire(sensor_id).await?;
        let removed = self
            .registry
            .remove(sensor_id)
            .ok_or_else(|| SensorHubError::SensorNotFound(sensor_id.to_string()))?;
        tracing::info!("sensor removed");
        self.persist().await?;
        Ok(removed)
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<SensorRegistry> {
        &self.registry
    }

    /// Snapshot and save under one lock, so the last save always carries
    /// every change applied before it.
    async fn persist(&self) -> Result<(), SensorHubError> {
        let _guard = self.persist_lock.lock().await;
        let definitions = self.registry.definitions();
        self.store.save(&definitions).await.inspect_err(|err| {
            tracing::error!(error = %err.chain_message(), "failed to persist sensor definitions");
        })
    }
}
