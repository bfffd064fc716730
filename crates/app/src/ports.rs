//! Port definitions — traits that adapters implement.
//!
//! Drivers, the definition store and the outbound transport are all
//! supplied from outside the application core. They are declared here so
//! that services and adapters can both depend on them.

pub mod driver;
pub mod outbound;
pub mod store;

pub use driver::{Sensor, SensorDriver};
pub use outbound::ReadingPublisher;
pub use store::DefinitionStore;
