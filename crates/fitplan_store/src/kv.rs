//! Key-value substrate: string keys, string blobs, no transactions.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

use crate::{PlanError, PlanResult};

#[async_trait]
pub trait KeyValueStore: Send + Sync + 'static {
    async fn get(&self, key: &str) -> PlanResult<Option<String>>;
    /// Replace the whole value stored under `key`.
    async fn set(&self, key: &str, value: String) -> PlanResult<()>;
    async fn remove(&self, key: &str) -> PlanResult<()>;
    async fn keys(&self) -> PlanResult<Vec<String>>;
}

#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn get(&self, key: &str) -> PlanResult<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> PlanResult<()> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> PlanResult<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn keys(&self) -> PlanResult<Vec<String>> {
        let mut keys: Vec<String> = self.entries.read().await.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}

const BLOB_EXTENSION: &str = "json";

/// One `<key>.json` file per key under a root directory.
///
/// Writes go to a temp file in the same directory which is synced and then renamed
/// over the target, so readers see either the old or the new blob.
#[derive(Clone, Debug)]
pub struct FileKeyValueStore {
    root: PathBuf,
}

impl FileKeyValueStore {
    /// Open (creating if needed) a store rooted at `root`.
    pub async fn open(root: impl Into<PathBuf>) -> PlanResult<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root)
            .await
            .map_err(|e| io_error("create directory", &root, e))?;
        Ok(Self { root })
    }

    fn path_for(&self, key: &str) -> PlanResult<PathBuf> {
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !valid {
            return Err(PlanError::Persistence(format!("invalid storage key {key:?}")));
        }
        Ok(self.root.join(format!("{key}.{BLOB_EXTENSION}")))
    }

    async fn write_atomic(&self, path: &Path, data: &[u8]) -> PlanResult<()> {
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| PlanError::Persistence("invalid blob filename".into()))?;
        let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
        let temp_path = self.root.join(format!(".{file_name}.{nanos}.tmp"));

        let written = async {
            let mut file = tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&temp_path)
                .await?;
            file.write_all(data).await?;
            file.sync_all().await?;
            tokio::fs::rename(&temp_path, path).await?;
            Ok::<(), std::io::Error>(())
        }
        .await;

        if let Err(e) = written {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(io_error("write", path, e));
        }
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for FileKeyValueStore {
    async fn get(&self, key: &str) -> PlanResult<Option<String>> {
        let path = self.path_for(key)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(blob) => Ok(Some(blob)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error("read", &path, e)),
        }
    }

    async fn set(&self, key: &str, value: String) -> PlanResult<()> {
        let path = self.path_for(key)?;
        self.write_atomic(&path, value.as_bytes()).await
    }

    async fn remove(&self, key: &str) -> PlanResult<()> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error("remove", &path, e)),
        }
    }

    async fn keys(&self) -> PlanResult<Vec<String>> {
        let mut dir = tokio::fs::read_dir(&self.root)
            .await
            .map_err(|e| io_error("list", &self.root, e))?;
        let mut keys = Vec::new();
        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|e| io_error("list", &self.root, e))?
        {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            if let Some(key) = name.strip_suffix(&format!(".{BLOB_EXTENSION}")) {
                keys.push(key.to_string());
            }
        }
        keys.sort();
        Ok(keys)
    }
}

fn io_error(action: &str, path: &Path, err: std::io::Error) -> PlanError {
    PlanError::Persistence(format!("{action} {}: {err}", path.display()))
}
