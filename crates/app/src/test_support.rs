//! Fakes shared by the unit tests of this crate.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use sensorhub_domain::definition::{Inputs, SensorDefinition};
use sensorhub_domain::error::{BoxError, DriverError, SensorHubError};
use serde_json::{Value, json};

use crate::ports::{DefinitionStore, ReadingPublisher, Sensor, SensorDriver};

/// Driver with a required `pin_no`, optional `delay_ms` and `fail` inputs.
///
/// `created` and `live` count instances; `reads` counts driver reads across
/// every instance.
#[derive(Clone)]
pub struct FakeDriver {
    tag: &'static str,
    pub created: Arc<AtomicUsize>,
    pub live: Arc<AtomicUsize>,
    pub reads: Arc<AtomicUsize>,
}

impl Default for FakeDriver {
    fn default() -> Self {
        Self::tagged("fake")
    }
}

impl FakeDriver {
    pub fn tagged(tag: &'static str) -> Self {
        Self {
            tag,
            created: Arc::new(AtomicUsize::new(0)),
            live: Arc::new(AtomicUsize::new(0)),
            reads: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl SensorDriver for FakeDriver {
    fn sensor_type(&self) -> &'static str {
        self.tag
    }

    fn instantiate(&self, inputs: &Inputs) -> Result<Box<dyn Sensor>, DriverError> {
        let pin = inputs
            .get("pin_no")
            .and_then(|value| value.as_i64())
            .ok_or(DriverError::MissingInput("pin_no"))?;
        let delay = inputs
            .get("delay_ms")
            .and_then(|value| value.as_i64())
            .and_then(|ms| u64::try_from(ms).ok())
            .map(Duration::from_millis);
        let fail = inputs
            .get("fail")
            .and_then(|value| value.as_bool())
            .unwrap_or(false);

        self.created.fetch_add(1, Ordering::SeqCst);
        self.live.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeSensor {
            pin,
            delay,
            fail,
            state: AtomicBool::new(false),
            live: Arc::clone(&self.live),
            reads: Arc::clone(&self.reads),
        }))
    }
}

struct FakeSensor {
    pin: i64,
    delay: Option<Duration>,
    fail: bool,
    state: AtomicBool,
    live: Arc<AtomicUsize>,
    reads: Arc<AtomicUsize>,
}

impl FakeSensor {
    fn stall(&self) {
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
    }
}

impl Sensor for FakeSensor {
    fn read(&self) -> Result<Value, DriverError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.stall();
        if self.fail {
            return Err(std::io::Error::other("bus timeout").into());
        }
        Ok(json!({ "pin": self.pin, "value": self.state.load(Ordering::SeqCst) }))
    }

    fn status(&self) -> Value {
        json!({ "pin_no": self.pin })
    }

    fn execute(&self, action: &str, params: &Value) -> Result<Value, DriverError> {
        self.stall();
        match action {
            "toggle" => {
                let value = !self.state.fetch_xor(true, Ordering::SeqCst);
                Ok(json!({ "value": value }))
            }
            "set" => {
                let value = params["value"]
                    .as_bool()
                    .ok_or_else(|| DriverError::InvalidParam {
                        key: "value".to_string(),
                        reason: "expected a boolean".to_string(),
                    })?;
                self.state.store(value, Ordering::SeqCst);
                Ok(json!({ "value": value }))
            }
            other => Err(DriverError::UnsupportedAction(other.to_string())),
        }
    }

    fn configure(&self, inputs: &Inputs) -> Result<(), DriverError> {
        if inputs.get("reject").and_then(|v| v.as_bool()) == Some(true) {
            return Err(DriverError::InvalidInput {
                key: "reject".to_string(),
                reason: "rejected on configure".to_string(),
            });
        }
        Ok(())
    }
}

impl Drop for FakeSensor {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

pub fn fake_definition(sensor_id: &str, pin: i64) -> SensorDefinition {
    SensorDefinition::builder()
        .sensor_id(sensor_id)
        .sensor_type("fake")
        .input("pin_no", pin)
        .build()
        .unwrap()
}

#[derive(Default)]
pub struct InMemoryStore {
    pub saved: Mutex<Option<Vec<SensorDefinition>>>,
    pub saves: AtomicUsize,
    pub fail_saves: AtomicBool,
    pub corrupt: AtomicBool,
}

impl InMemoryStore {
    pub fn with(definitions: Vec<SensorDefinition>) -> Self {
        let store = Self::default();
        *store.saved.lock().unwrap() = Some(definitions);
        store
    }

    pub fn persisted(&self) -> Vec<SensorDefinition> {
        self.saved.lock().unwrap().clone().unwrap_or_default()
    }
}

impl DefinitionStore for InMemoryStore {
    async fn load(&self) -> Result<Vec<SensorDefinition>, SensorHubError> {
        if self.corrupt.load(Ordering::SeqCst) {
            return Err(SensorHubError::StoreCorrupt("expected value at line 1".into()));
        }
        Ok(self.persisted())
    }

    async fn save(&self, definitions: &[SensorDefinition]) -> Result<(), SensorHubError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(SensorHubError::StorePersist(
                std::io::Error::other("disk full").into(),
            ));
        }
        *self.saved.lock().unwrap() = Some(definitions.to_vec());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingPublisher {
    pub payloads: Mutex<Vec<Value>>,
    pub fail: AtomicBool,
}

impl ReadingPublisher for RecordingPublisher {
    async fn publish(&self, payload: Value) -> Result<(), BoxError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err("transport down".into());
        }
        self.payloads.lock().unwrap().push(payload);
        Ok(())
    }
}
