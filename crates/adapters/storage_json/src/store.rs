//! [`DefinitionStore`] backed by one JSON file.

use std::io::Write;
use std::path::{Path, PathBuf};

use sensorhub_app::ports::DefinitionStore;
use sensorhub_domain::definition::SensorDefinition;
use sensorhub_domain::error::SensorHubError;
use serde::{Deserialize, Serialize};

use crate::error::StorageError;

/// File name used inside a device's data directory.
pub const FILE_NAME: &str = "sensors.json";

#[derive(Serialize)]
struct StoredFileRef<'a> {
    sensors: &'a [SensorDefinition],
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredFile {
    Wrapped { sensors: Vec<SensorDefinition> },
    Bare(Vec<SensorDefinition>),
}

impl StoredFile {
    fn into_definitions(self) -> Vec<SensorDefinition> {
        match self {
            Self::Wrapped { sensors } | Self::Bare(sensors) => sensors,
        }
    }
}

/// Stores every definition in one JSON file, replaced atomically on save.
///
/// Saves are serialized: concurrent callers write one after the other.
pub struct JsonFileStore {
    path: PathBuf,
    write_lock: tokio::sync::Mutex<()>,
}

impl JsonFileStore {
    /// Store at an explicit file path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Store at `<data_dir>/<device_id>/sensors.json`.
    #[must_use]
    pub fn for_device(data_dir: impl AsRef<Path>, device_id: &str) -> Self {
        Self::new(data_dir.as_ref().join(device_id).join(FILE_NAME))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn read_file(path: &Path) -> Result<Vec<SensorDefinition>, StorageError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no sensor store yet");
            return Ok(Vec::new());
        }
        Err(source) => {
            return Err(StorageError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    if content.trim().is_empty() {
        tracing::warn!(path = %path.display(), "sensor store is empty");
        return Ok(Vec::new());
    }
    let stored: StoredFile =
        serde_json::from_str(&content).map_err(|source| StorageError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(stored.into_definitions())
}

fn write_file(path: &Path, content: &[u8]) -> Result<(), StorageError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let write_error = |source| StorageError::Write {
        path: path.to_path_buf(),
        source,
    };
    std::fs::create_dir_all(parent).map_err(write_error)?;
    let mut temp = tempfile::NamedTempFile::new_in(parent).map_err(write_error)?;
    temp.write_all(content).map_err(write_error)?;
    temp.as_file().sync_all().map_err(write_error)?;
    temp.persist(path).map_err(|source| StorageError::Persist {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

impl DefinitionStore for JsonFileStore {
    async fn load(&self) -> Result<Vec<SensorDefinition>, SensorHubError> {
        let path = self.path.clone();
        let definitions = tokio::task::spawn_blocking(move || read_file(&path))
            .await
            .map_err(StorageError::from)??;
        tracing::debug!(path = %self.path.display(), count = definitions.len(), "sensor store loaded");
        Ok(definitions)
    }

    async fn save(&self, definitions: &[SensorDefinition]) -> Result<(), SensorHubError> {
        let content = serde_json::to_vec_pretty(&StoredFileRef {
            sensors: definitions,
        })
        .map_err(StorageError::Encode)?;

        let _guard = self.write_lock.lock().await;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_file(&path, &content))
            .await
            .map_err(StorageError::from)??;
        tracing::debug!(path = %self.path.display(), count = definitions.len(), "sensor store saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use sensorhub_domain::error::ErrorKind;

    use super::*;

    fn definition(sensor_id: &str, pin: i64) -> SensorDefinition {
        SensorDefinition::builder()
            .sensor_id(sensor_id)
            .sensor_type("dout")
            .input("pin_no", pin)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn should_load_empty_set_when_file_is_missing() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = JsonFileStore::for_device(dir.path(), "device-1");

        assert!(store.load().await.unwrap().is_empty());
        assert_eq!(store.path(), dir.path().join("device-1").join(FILE_NAME));
    }

    #[tokio::test]
    async fn should_round_trip_definitions_in_order() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = JsonFileStore::for_device(dir.path(), "device-1");
        let mut door = definition("door", 4);
        door.alias = Some("Front door".to_string());
        door.enabled = false;
        let definitions = vec![definition("relay_1", 17), door];

        store.save(&definitions).await.unwrap();

        assert_eq!(store.load().await.unwrap(), definitions);
    }

    #[tokio::test]
    async fn should_write_wrapped_layout() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path().join(FILE_NAME));
        store.save(&[definition("relay_1", 17)]).await.unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(raw["sensors"][0]["sensor_id"], "relay_1");
        assert_eq!(raw["sensors"][0]["inputs"]["pin_no"], 17);
        assert_eq!(raw["sensors"][0]["enabled"], true);
    }

    #[tokio::test]
    async fn should_accept_bare_array_with_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join(FILE_NAME);
        std::fs::write(&path, r#"[{"sensor_id": "cpu", "sensor_type": "vcgen"}]"#).unwrap();

        let loaded = JsonFileStore::new(&path).load().await.unwrap();

        assert_eq!(loaded.len(), 1);
        assert!(loaded[0].enabled);
        assert!(loaded[0].inputs.is_empty());
    }

    #[tokio::test]
    async fn should_report_corrupt_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join(FILE_NAME);
        std::fs::write(&path, "{\"sensors\": [").unwrap();

        let err = JsonFileStore::new(&path).load().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StoreCorrupt);
        assert!(err.chain_message().contains(FILE_NAME));
    }

    #[tokio::test]
    async fn should_report_persist_failure() {
        let dir = tempfile::TempDir::new().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "").unwrap();
        let store = JsonFileStore::new(blocker.join(FILE_NAME));

        let err = store.save(&[definition("relay_1", 17)]).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StorePersist);
    }

    #[tokio::test]
    async fn should_keep_last_concurrent_save() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = Arc::new(JsonFileStore::new(dir.path().join(FILE_NAME)));

        let first = vec![definition("a", 1)];
        let second = vec![definition("a", 1), definition("b", 2)];
        let (left, right) = tokio::join!(store.save(&first), store.save(&second));
        left.unwrap();
        right.unwrap();

        let loaded = store.load().await.unwrap();
        assert!(loaded == first || loaded == second);
        let leftovers = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }
}
