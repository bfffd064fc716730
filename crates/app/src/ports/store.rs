//! Store port — durable home of the sensor definitions.

use std::future::Future;

use sensorhub_domain::definition::SensorDefinition;
use sensorhub_domain::error::SensorHubError;

/// Loads and saves the full set of sensor definitions.
///
/// The registry is the source of truth at runtime; the store is written
/// with the complete snapshot after every successful change.
pub trait DefinitionStore {
    /// Load every persisted definition, in stored order.
    ///
    /// A missing store yields an empty list. Unparseable content yields
    /// [`SensorHubError::StoreCorrupt`].
    fn load(&self) -> impl Future<Output = Result<Vec<SensorDefinition>, SensorHubError>> + Send;

    /// Replace the persisted set with `definitions`.
    ///
    /// Failures are reported as [`SensorHubError::StorePersist`].
    fn save(
        &self,
        definitions: &[SensorDefinition],
    ) -> impl Future<Output = Result<(), SensorHubError>> + Send;
}

impl<T: DefinitionStore + Send + Sync> DefinitionStore for std::sync::Arc<T> {
    fn load(&self) -> impl Future<Output = Result<Vec<SensorDefinition>, SensorHubError>> + Send {
        (**self).load()
    }

    fn save(
        &self,
        definitions: &[SensorDefinition],
    ) -> impl Future<Output = Result<(), SensorHubError>> + Send {
        (**self).save(definitions)
    }
}
