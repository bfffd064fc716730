//! # sensorhub-adapter-storage-json
//!
//! JSON file persistence for sensor definitions.
//!
//! ## Responsibilities
//! - Implement the `DefinitionStore` port defined in `sensorhub-app::ports`
//! - Read and write the `{"sensors": [...]}` file layout (bare arrays are
//!   accepted on load)
//! - Replace the file atomically, so a crash leaves either the old or the
//!   new complete set on disk
//!
//! ## Dependency rule
//! Depends on `sensorhub-app` (for the port trait) and `sensorhub-domain`
//! (for domain types). The `app` and `domain` crates must never reference
//! this adapter.

mod error;
mod store;

pub use error::StorageError;
pub use store::{FILE_NAME, JsonFileStore};
