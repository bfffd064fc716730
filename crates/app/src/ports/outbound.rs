//! Outbound port — hands JSON payloads to the device's transport.

use std::future::Future;

use sensorhub_domain::error::BoxError;
use serde_json::Value;

/// Sends a payload to the cloud side (periodic readings, command responses).
pub trait ReadingPublisher {
    /// Publish one payload.
    fn publish(&self, payload: Value) -> impl Future<Output = Result<(), BoxError>> + Send;
}

impl<T: ReadingPublisher + Send + Sync> ReadingPublisher for std::sync::Arc<T> {
    fn publish(&self, payload: Value) -> impl Future<Output = Result<(), BoxError>> + Send {
        (**self).publish(payload)
    }
}
