//! Per-sensor serialization.
//!
//! Operations that touch one sensor (configure, remove, read, execute) take
//! that sensor's lock, so they run one at a time and in arrival order.
//! Distinct ids never contend.
//!
//! A [`SensorGuard`] can be moved into a blocking driver call; the sensor
//! stays locked until that call really returns, even when the caller has
//! already given up on it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use sensorhub_domain::error::SensorHubError;
use sensorhub_domain::time::as_millis;
use tokio::sync::OwnedMutexGuard;

use crate::services::sensor_service::DEFAULT_DRIVER_TIMEOUT;

type Table = HashMap<String, Arc<tokio::sync::Mutex<()>>>;

/// Table of async mutexes keyed by sensor id.
///
/// An entry lives only while someone holds or waits for it.
pub struct SensorLocks {
    table: Arc<Mutex<Table>>,
    wait: Duration,
}

impl Default for SensorLocks {
    fn default() -> Self {
        Self::with_wait(DEFAULT_DRIVER_TIMEOUT)
    }
}

impl SensorLocks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks whose waiters give up after `wait`.
    #[must_use]
    pub fn with_wait(wait: Duration) -> Self {
        Self {
            table: Arc::new(Mutex::new(HashMap::new())),
            wait,
        }
    }

    /// Wait for exclusive access to `sensor_id`.
    ///
    /// # Errors
    ///
    /// Returns [`SensorHubError::DriverTimeout`] when the sensor stays busy
    /// for longer than the configured wait, which happens when a stalled
    /// driver call still holds it.
    pub async fn acquire(&self, sensor_id: &str) -> Result<SensorGuard, SensorHubError> {
        let lock = {
            let mut table = lock_table(&self.table);
            Arc::clone(table.entry(sensor_id.to_string()).or_default())
        };
        match tokio::time::timeout(self.wait, lock.lock_owned()).await {
            Ok(guard) => Ok(SensorGuard {
                sensor_id: sensor_id.to_string(),
                table: Arc::clone(&self.table),
                guard: Some(guard),
            }),
            Err(_) => {
                evict_if_idle(&self.table, sensor_id);
                tracing::warn!(sensor_id, "sensor still busy with an earlier driver call");
                Err(SensorHubError::DriverTimeout {
                    sensor_id: sensor_id.to_string(),
                    timeout_ms: as_millis(self.wait),
                })
            }
        }
    }

    /// Number of ids currently held or waited for.
    #[must_use]
    pub fn len(&self) -> usize {
        lock_table(&self.table).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Exclusive access to one sensor; released on drop.
pub struct SensorGuard {
    sensor_id: String,
    table: Arc<Mutex<Table>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for SensorGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        evict_if_idle(&self.table, &self.sensor_id);
    }
}

fn lock_table(table: &Mutex<Table>) -> MutexGuard<'_, Table> {
    table.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Drop the entry when the table holds the only reference. Clones are only
/// taken under the table lock, so nobody can pick it up concurrently.
fn evict_if_idle(table: &Mutex<Table>, sensor_id: &str) {
    let mut table = lock_table(table);
    if table
        .get(sensor_id)
        .is_some_and(|lock| Arc::strong_count(lock) == 1)
    {
        table.remove(sensor_id);
    }
}

#[cfg(test)]
mod tests {
    use sensorhub_domain::error::ErrorKind;

    use super::*;

    #[tokio::test]
    async fn should_serialize_same_id() {
        let locks = SensorLocks::with_wait(Duration::from_millis(20));
        let _guard = locks.acquire("relay_1").await.unwrap();

        let err = locks.acquire("relay_1").await.err().unwrap();
        assert_eq!(err.kind(), ErrorKind::DriverTimeout);
    }

    #[tokio::test]
    async fn should_not_block_distinct_ids() {
        let locks = SensorLocks::with_wait(Duration::from_millis(20));
        let _guard = locks.acquire("relay_1").await.unwrap();

        assert!(locks.acquire("relay_2").await.is_ok());
    }

    #[tokio::test]
    async fn should_release_on_drop() {
        let locks = SensorLocks::with_wait(Duration::from_millis(20));
        drop(locks.acquire("relay_1").await.unwrap());

        assert!(locks.acquire("relay_1").await.is_ok());
    }

    #[tokio::test]
    async fn should_hand_over_to_waiter_in_order() {
        let locks = Arc::new(SensorLocks::with_wait(Duration::from_secs(1)));
        let guard = locks.acquire("relay_1").await.unwrap();

        let waiter = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move { locks.acquire("relay_1").await.map(|_| ()) })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(guard);

        assert!(waiter.await.unwrap().is_ok());
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn should_forget_ids_once_released() {
        let locks = SensorLocks::with_wait(Duration::from_millis(20));
        for index in 0..50 {
            drop(locks.acquire(&format!("sensor_{index}")).await.unwrap());
        }
        assert!(locks.is_empty());

        let held = locks.acquire("relay_1").await.unwrap();
        assert!(locks.acquire("relay_1").await.is_err());
        assert_eq!(locks.len(), 1);
        drop(held);
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn should_release_when_guard_moves_to_blocking_task() {
        let locks = SensorLocks::with_wait(Duration::from_millis(20));
        let guard = locks.acquire("relay_1").await.unwrap();

        tokio::task::spawn_blocking(move || drop(guard)).await.unwrap();

        assert!(locks.acquire("relay_1").await.is_ok());
    }
}
