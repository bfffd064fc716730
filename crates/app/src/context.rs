//! Device context — the single owner of registry, services and store.
//!
//! Built once at startup and passed explicitly to the dispatcher and the
//! publisher loop. [`DeviceContext::teardown`] releases every instance.

use std::sync::Arc;
use std::time::Duration;

use sensorhub_domain::definition::SensorDefinition;
use sensorhub_domain::error::SensorHubError;
use sensorhub_domain::patch::SensorConfigPatch;

use crate::dispatcher::CommandDispatcher;
use crate::locks::SensorLocks;
use crate::ports::{DefinitionStore, ReadingPublisher};
use crate::publisher::PublisherLoop;
use crate::registry::{DriverCatalog, SensorRegistry};
use crate::services::config_service::ConfigService;
use crate::services::sensor_service::SensorService;

/// Everything a running device needs, wired together.
pub struct DeviceContext<S> {
    registry: Arc<SensorRegistry>,
    sensors: SensorService,
    config: Arc<ConfigService<S>>,
}

impl<S: DefinitionStore + Send + Sync> DeviceContext<S> {
    /// Load the stored definitions and start every enabled sensor.
    ///
    /// An unreadable store is logged and replaced by an empty sensor set.
    /// Sensors whose driver fails to start are kept, without an instance.
    #[tracing::instrument(skip_all)]
    pub async fn init(catalog: DriverCatalog, store: S, driver_timeout: Duration) -> Self {
        let registry = Arc::new(SensorRegistry::new(catalog));
        let locks = Arc::new(SensorLocks::with_wait(driver_timeout));

        let definitions = match store.load().await {
            Ok(definitions) => definitions,
            Err(err @ SensorHubError::StoreCorrupt(_)) => {
                tracing::warn!(error = %err.chain_message(), "sensor store is corrupt, starting with no sensors");
                Vec::new()
            }
            Err(err) => {
                tracing::warn!(error = %err.chain_message(), "sensor store unavailable, starting with no sensors");
                Vec::new()
            }
        };
        for definition in definitions {
            let sensor_id = definition.sensor_id.clone();
            if let Err(err) = registry.restore(definition) {
                tracing::warn!(%sensor_id, error = %err.chain_message(), "sensor failed to start");
            }
        }
        tracing::info!(sensors = registry.len(), "sensor registry ready");

        let sensors = SensorService::new(Arc::clone(&registry), Arc::clone(&locks), driver_timeout);
        let config = Arc::new(ConfigService::new(Arc::clone(&registry), locks, store));
        Self {
            registry,
            sensors,
            config,
        }
    }

    /// Configure every seed definition whose id the store does not know yet.
    ///
    /// Seeds go through the merge engine, so they are validated and persisted
    /// like a remote `configure`. Returns how many sensors were added.
    #[tracing::instrument(skip_all, fields(seeds = definitions.len()))]
    pub async fn seed(&self, definitions: &[SensorDefinition]) -> usize {
        let mut seeded = 0;
        for definition in definitions {
            let sensor_id = definition.sensor_id.as_str();
            if self.registry.contains(sensor_id) {
                tracing::debug!(sensor_id, "stored definition wins over seed");
                continue;
            }
            let patch = SensorConfigPatch::from(definition);
            match self.config.configure(sensor_id, &patch).await {
                Ok(_) => seeded += 1,
                Err(err) => {
                    tracing::warn!(sensor_id, error = %err.chain_message(), "failed to seed sensor");
                }
            }
        }
        seeded
    }

    #[must_use]
    pub fn dispatcher(&self) -> CommandDispatcher<S> {
        CommandDispatcher::new(self.sensors.clone(), Arc::clone(&self.config))
    }

    #[must_use]
    pub fn publisher<P: ReadingPublisher + Send + Sync>(
        &self,
        device_id: impl Into<String>,
        publisher: P,
        interval: Duration,
    ) -> PublisherLoop<P> {
        PublisherLoop::new(device_id, self.sensors.clone(), publisher, interval)
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<SensorRegistry> {
        &self.registry
    }

    #[must_use]
    pub fn sensors(&self) -> &SensorService {
        &self.sensors
    }

    #[must_use]
    pub fn config(&self) -> &Arc<ConfigService<S>> {
        &self.config
    }

    /// Release every sensor instance. Returns how many sensors were held.
    pub fn teardown(self) -> usize {
        let released = self.registry.clear();
        tracing::info!(released, "sensor registry torn down");
        released
    }
}
