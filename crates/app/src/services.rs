//! Application services — use-case implementations.
//!
//! Services share the registry and the per-sensor lock table through `Arc`s.
//! Port implementations are injected through generic parameters.

pub mod config_service;
pub mod sensor_service;
