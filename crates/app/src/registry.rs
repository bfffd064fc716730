//! Driver catalog and sensor registry.
//!
//! The [`DriverCatalog`] maps type tags to driver factories. The
//! [`SensorRegistry`] owns, per sensor id, the active definition, the live
//! instance (absent while disabled or after a failed start) and metadata
//! about the last read. Iteration follows insertion order.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use indexmap::IndexMap;
use sensorhub_domain::definition::{SensorDefinition, SensorSummary};
use sensorhub_domain::error::SensorHubError;
use sensorhub_domain::reading::ReadingMeta;

use crate::ports::{Sensor, SensorDriver};

/// Shared handle to a live sensor instance.
pub type SensorHandle = Arc<dyn Sensor>;

/// Type tag → driver factory.
#[derive(Default, Clone)]
pub struct DriverCatalog {
    drivers: HashMap<&'static str, Arc<dyn SensorDriver>>,
}

impl DriverCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a driver under its own type tag, replacing any previous one.
    pub fn register<D: SensorDriver + 'static>(&mut self, driver: D) -> &mut Self {
        let tag = driver.sensor_type();
        if self.drivers.insert(tag, Arc::new(driver)).is_some() {
            tracing::warn!(sensor_type = tag, "driver registered twice, keeping the last one");
        }
        self
    }

    /// Builder-style variant of [`register`](Self::register).
    #[must_use]
    pub fn with<D: SensorDriver + 'static>(mut self, driver: D) -> Self {
        self.register(driver);
        self
    }

    #[must_use]
    pub fn get(&self, sensor_type: &str) -> Option<Arc<dyn SensorDriver>> {
        self.drivers.get(sensor_type).cloned()
    }

    #[must_use]
    pub fn contains(&self, sensor_type: &str) -> bool {
        self.drivers.contains_key(sensor_type)
    }

    /// Registered tags, sorted.
    #[must_use]
    pub fn types(&self) -> Vec<&'static str> {
        let mut tags: Vec<_> = self.drivers.keys().copied().collect();
        tags.sort_unstable();
        tags
    }
}

struct Entry {
    definition: SensorDefinition,
    instance: Option<SensorHandle>,
    last_reading: Option<ReadingMeta>,
}

/// Point-in-time view of one registry entry.
#[derive(Clone)]
pub struct SensorSnapshot {
    pub definition: SensorDefinition,
    pub instance: Option<SensorHandle>,
    pub last_reading: Option<ReadingMeta>,
}

impl SensorSnapshot {
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.instance.is_some()
    }
}

/// In-memory map of sensor id → definition + live instance.
pub struct SensorRegistry {
    catalog: DriverCatalog,
    entries: RwLock<IndexMap<String, Entry>>,
}

impl SensorRegistry {
    #[must_use]
    pub fn new(catalog: DriverCatalog) -> Self {
        Self {
            catalog,
            entries: RwLock::new(IndexMap::new()),
        }
    }

    #[must_use]
    pub fn catalog(&self) -> &DriverCatalog {
        &self.catalog
    }

    /// Build a live instance for `definition` and apply its inputs.
    ///
    /// # Errors
    ///
    /// - [`SensorHubError::UnknownSensorType`] when no driver has the tag.
    /// - [`SensorHubError::DriverInit`] when the driver rejects the inputs.
    pub fn instantiate(&self, definition: &SensorDefinition) -> Result<SensorHandle, SensorHubError> {
        let driver = self
            .catalog
            .get(&definition.sensor_type)
            .ok_or_else(|| SensorHubError::UnknownSensorType(definition.sensor_type.clone()))?;
        let init_error = |source| SensorHubError::DriverInit {
            sensor_id: definition.sensor_id.clone(),
            sensor_type: definition.sensor_type.clone(),
            source,
        };
        let sensor = driver.instantiate(&definition.inputs).map_err(init_error)?;
        sensor.configure(&definition.inputs).map_err(init_error)?;
        Ok(Arc::from(sensor))
    }

    /// Install `definition`, replacing any previous entry with the same id.
    ///
    /// The previous instance is released before the new one is built. When
    /// the new instance cannot be built, the previous definition stays active
    /// and is re-instantiated; a new id leaves no trace.
    ///
    /// # Errors
    ///
    /// Propagates [`instantiate`](Self::instantiate) failures.
    pub fn upsert(&self, definition: SensorDefinition) -> Result<(), SensorHubError> {
        let previous = self.write().get_mut(&definition.sensor_id).map(|entry| {
            drop(entry.instance.take());
            entry.definition.clone()
        });

        if !definition.enabled {
            self.install(definition, None);
            return Ok(());
        }

        match self.instantiate(&definition) {
            Ok(instance) => {
                self.install(definition, Some(instance));
                Ok(())
            }
            Err(err) => {
                if let Some(previous) = previous {
                    tracing::warn!(
                        sensor_id = %previous.sensor_id,
                        error = %err.chain_message(),
                        "new configuration rejected, restoring the previous one"
                    );
                    self.restore_instance(previous);
                }
                Err(err)
            }
        }
    }

    /// Install a persisted definition at boot.
    ///
    /// The definition is kept even when its instance cannot be built, so
    /// that later saves do not drop it.
    ///
    /// # Errors
    ///
    /// Returns the instantiation failure after recording the definition.
    pub fn restore(&self, definition: SensorDefinition) -> Result<(), SensorHubError> {
        if !definition.enabled {
            self.install(definition, None);
            return Ok(());
        }
        match self.instantiate(&definition) {
            Ok(instance) => {
                self.install(definition, Some(instance));
                Ok(())
            }
            Err(err) => {
                self.install(definition, None);
                Err(err)
            }
        }
    }

    fn restore_instance(&self, definition: SensorDefinition) {
        let instance = if definition.enabled {
            self.instantiate(&definition)
                .inspect_err(|err| {
                    tracing::error!(
                        sensor_id = %definition.sensor_id,
                        error = %err.chain_message(),
                        "previous configuration could not be restarted"
                    );
                })
                .ok()
        } else {
            None
        };
        if let Some(entry) = self.write().get_mut(&definition.sensor_id) {
            entry.instance = instance;
        }
    }

    fn install(&self, definition: SensorDefinition, instance: Option<SensorHandle>) {
        let mut entries = self.write();
        match entries.get_mut(&definition.sensor_id) {
            Some(entry) => {
                entry.definition = definition;
                entry.instance = instance;
            }
            None => {
                entries.insert(
                    definition.sensor_id.clone(),
                    Entry {
                        definition,
                        instance,
                        last_reading: None,
                    },
                );
            }
        }
    }

    /// Drop the entry for `sensor_id`, releasing its instance.
    pub fn remove(&self, sensor_id: &str) -> Option<SensorDefinition> {
        self.write()
            .shift_remove(sensor_id)
            .map(|entry| entry.definition)
    }

    /// Live instance, if the sensor exists and is running.
    #[must_use]
    pub fn get(&self, sensor_id: &str) -> Option<SensorHandle> {
        self.read()
            .get(sensor_id)
            .and_then(|entry| entry.instance.clone())
    }

    #[must_use]
    pub fn definition(&self, sensor_id: &str) -> Option<SensorDefinition> {
        self.read()
            .get(sensor_id)
            .map(|entry| entry.definition.clone())
    }

    #[must_use]
    pub fn contains(&self, sensor_id: &str) -> bool {
        self.read().contains_key(sensor_id)
    }

    /// Every definition, in registry order.
    #[must_use]
    pub fn definitions(&self) -> Vec<SensorDefinition> {
        self.read()
            .values()
            .map(|entry| entry.definition.clone())
            .collect()
    }

    #[must_use]
    pub fn list(&self) -> Vec<SensorSummary> {
        self.read()
            .values()
            .map(|entry| entry.definition.summary())
            .collect()
    }

    /// Ids of sensors that are enabled, in registry order.
    #[must_use]
    pub fn enabled_ids(&self) -> Vec<String> {
        self.read()
            .values()
            .filter(|entry| entry.definition.enabled)
            .map(|entry| entry.definition.sensor_id.clone())
            .collect()
    }

    #[must_use]
    pub fn snapshot(&self, sensor_id: &str) -> Option<SensorSnapshot> {
        self.read().get(sensor_id).map(Entry::snapshot)
    }

    #[must_use]
    pub fn snapshots(&self) -> Vec<SensorSnapshot> {
        self.read().values().map(Entry::snapshot).collect()
    }

    pub fn record_reading(&self, sensor_id: &str, meta: ReadingMeta) {
        if let Some(entry) = self.write().get_mut(sensor_id) {
            entry.last_reading = Some(meta);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Release every instance and forget all entries. Returns how many were held.
    pub fn clear(&self) -> usize {
        let drained: Vec<Entry> = self.write().drain(..).map(|(_, entry)| entry).collect();
        drained.len()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, IndexMap<String, Entry>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, IndexMap<String, Entry>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Entry {
    fn snapshot(&self) -> SensorSnapshot {
        SensorSnapshot {
            definition: self.definition.clone(),
            instance: self.instance.clone(),
            last_reading: self.last_reading.clone(),
        }
    }
}
