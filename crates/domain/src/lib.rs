//! # sensorhub-domain
//!
//! Pure domain model for the sensorhub device agent.
//!
//! ## Responsibilities
//! - Foundational types: error taxonomy, timestamps
//! - Define **Sensor Definitions** (id, driver type tag, inputs, alias, enabled)
//! - Define **Config Patches** and the pure merge law applied by `configure`
//! - Define **Commands** (the seven-action envelope) and their validation
//! - Define **Readings** and **Responses** as they appear on the wire
//!
//! ## Dependency rule
//! This crate has **no internal dependencies** and performs no IO.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod time;

pub mod command;
pub mod definition;
pub mod patch;
pub mod reading;
pub mod response;
