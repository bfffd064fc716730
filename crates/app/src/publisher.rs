//! Periodic publish loop — reads every enabled sensor and ships the batch.

use std::time::Duration;

use sensorhub_domain::error::BoxError;
use serde_json::json;
use tokio::sync::watch;

use crate::ports::ReadingPublisher;
use crate::services::sensor_service::SensorService;

/// Publishes `{device_id, sensors, count}` on a fixed interval.
pub struct PublisherLoop<P> {
    device_id: String,
    sensors: SensorService,
    publisher: P,
    interval: Duration,
}

impl<P: ReadingPublisher + Send + Sync> PublisherLoop<P> {
    #[must_use]
    pub fn new(
        device_id: impl Into<String>,
        sensors: SensorService,
        publisher: P,
        interval: Duration,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            sensors,
            publisher,
            interval,
        }
    }

    /// Read all enabled sensors and publish one payload.
    ///
    /// Returns the number of readings sent.
    ///
    /// # Errors
    ///
    /// Returns the transport error when the payload cannot be published.
    pub async fn publish_once(&self) -> Result<usize, BoxError> {
        let readings = self.sensors.read_all().await;
        let count = readings.len();
        let payload = json!({
            "device_id": self.device_id,
            "sensors": readings,
            "count": count,
        });
        self.publisher.publish(payload).await?;
        Ok(count)
    }

    /// Publish every interval until `shutdown` flips to `true` or its sender
    /// is dropped. The first publish happens one interval after start.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        ticker.tick().await;

        tracing::info!(
            device_id = %self.device_id,
            interval_secs = self.interval.as_secs(),
            "publisher loop started"
        );
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.publish_once().await {
                        Ok(count) => tracing::debug!(count, "published sensor readings"),
                        Err(err) => tracing::warn!(error = %err, "failed to publish sensor readings"),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        tracing::info!("publisher loop stopped");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::locks::SensorLocks;
    use crate::registry::{DriverCatalog, SensorRegistry};
    use crate::test_support::{FakeDriver, RecordingPublisher, fake_definition};

    fn publisher_loop(
        interval: Duration,
    ) -> (PublisherLoop<Arc<RecordingPublisher>>, Arc<RecordingPublisher>) {
        let registry = Arc::new(SensorRegistry::new(
            DriverCatalog::new().with(FakeDriver::default()),
        ));
        registry.upsert(fake_definition("a", 1)).unwrap();
        let mut disabled = fake_definition("b", 2);
        disabled.enabled = false;
        registry.upsert(disabled).unwrap();

        let sensors = SensorService::new(registry, Arc::new(SensorLocks::new()), Duration::from_secs(1));
        let recorder = Arc::new(RecordingPublisher::default());
        (
            PublisherLoop::new("device-1", sensors, Arc::clone(&recorder), interval),
            recorder,
        )
    }

    #[tokio::test]
    async fn should_publish_enabled_readings_with_device_id() {
        let (publisher, recorder) = publisher_loop(Duration::from_secs(60));

        assert_eq!(publisher.publish_once().await.unwrap(), 1);

        let payloads = recorder.payloads.lock().unwrap();
        assert_eq!(payloads[0]["device_id"], "device-1");
        assert_eq!(payloads[0]["count"], 1);
        assert_eq!(payloads[0]["sensors"][0]["sensor_id"], "a");
    }

    #[tokio::test]
    async fn should_surface_transport_failure() {
        let (publisher, recorder) = publisher_loop(Duration::from_secs(60));
        recorder.fail.store(true, Ordering::SeqCst);

        assert!(publisher.publish_once().await.is_err());
    }

    #[tokio::test]
    async fn should_stop_on_shutdown_signal() {
        let (publisher, recorder) = publisher_loop(Duration::from_millis(10));
        let (tx, rx) = watch::channel(false);

        let handle = tokio::spawn(publisher.run(rx));
        tokio::time::sleep(Duration::from_millis(60)).await;
        tx.send(true).unwrap();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(!recorder.payloads.lock().unwrap().is_empty());
    }
}
