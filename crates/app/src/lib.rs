//! # sensorhub-app
//!
//! Application layer — use-cases and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement:
//!   - `SensorDriver` / `Sensor` — driver factory and live instance capability
//!   - `DefinitionStore` — load & save the full set of sensor definitions
//!   - `ReadingPublisher` — hand payloads to the device transport
//! - Own the **sensor registry** and the **driver catalog**
//! - Provide the use-cases:
//!   - `SensorService` — read, read all, status, execute
//!   - `ConfigService` — partial-update merge engine, remove
//!   - `CommandDispatcher` — route command envelopes to the services
//!   - `PublisherLoop` — periodic batch publish
//! - Wire everything once in `DeviceContext`
//!
//! ## Dependency rule
//! Depends on `sensorhub-domain` only (plus `tokio` for locks, timers and the
//! blocking pool). Never imports adapter crates.

pub mod context;
pub mod dispatcher;
pub mod locks;
pub mod ports;
pub mod publisher;
pub mod registry;
pub mod services;

#[cfg(test)]
mod test_support;
