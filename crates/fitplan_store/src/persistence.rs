//! Serialization boundary between in-memory collections and the key-value substrate.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::kv::KeyValueStore;
use crate::{PlanError, PlanResult};

/// The persisted collections. Each one is stored as a single blob.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CollectionKey {
    Splits,
    WorkoutDays,
    MacroEntries,
    ProgressPhotos,
    Clients,
}

impl CollectionKey {
    pub const ALL: [CollectionKey; 5] = [
        CollectionKey::Splits,
        CollectionKey::WorkoutDays,
        CollectionKey::MacroEntries,
        CollectionKey::ProgressPhotos,
        CollectionKey::Clients,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CollectionKey::Splits => "splits",
            CollectionKey::WorkoutDays => "workoutDays",
            CollectionKey::MacroEntries => "macroEntries",
            CollectionKey::ProgressPhotos => "progressPhotos",
            CollectionKey::Clients => "clients",
        }
    }

    /// Storage key, shared with blobs written by the mobile app.
    pub fn storage_key(self) -> &'static str {
        match self {
            CollectionKey::Splits => "workoutSplits",
            other => other.name(),
        }
    }
}

impl fmt::Display for CollectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CollectionKey {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CollectionKey::ALL
            .into_iter()
            .find(|key| key.name() == s || key.storage_key() == s)
            .ok_or_else(|| PlanError::Validation(format!("unknown collection {s:?}")))
    }
}

#[derive(Clone)]
pub struct PersistenceAdapter {
    kv: Arc<dyn KeyValueStore>,
    prefix: String,
}

impl PersistenceAdapter {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self {
            kv,
            prefix: String::new(),
        }
    }

    /// Namespace every storage key, e.g. per profile.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn storage_key(&self, key: CollectionKey) -> String {
        format!("{}{}", self.prefix, key.storage_key())
    }

    /// Load a collection. A missing key is the empty collection; a blob that does not
    /// decode is a serialization error.
    pub async fn load<T>(&self, key: CollectionKey) -> PlanResult<T>
    where
        T: DeserializeOwned + Default,
    {
        match self.kv.get(&self.storage_key(key)).await? {
            None => Ok(T::default()),
            Some(blob) => Ok(serde_json::from_str(&blob)?),
        }
    }

    /// Encode the full collection and replace the stored blob in one write.
    pub async fn save<T>(&self, key: CollectionKey, value: &T) -> PlanResult<()>
    where
        T: Serialize + ?Sized,
    {
        let blob = serde_json::to_string(value)?;
        self.kv.set(&self.storage_key(key), blob).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryKeyValueStore;
    use crate::model::WorkoutSplit;

    #[test]
    fn collection_names_parse_both_ways() {
        for key in CollectionKey::ALL {
            assert_eq!(key.name().parse::<CollectionKey>().unwrap(), key);
            assert_eq!(key.storage_key().parse::<CollectionKey>().unwrap(), key);
        }
        assert_eq!(CollectionKey::Splits.storage_key(), "workoutSplits");
        assert!(matches!(
            "settings".parse::<CollectionKey>(),
            Err(PlanError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn load_missing_key_is_empty() {
        let adapter = PersistenceAdapter::new(Arc::new(MemoryKeyValueStore::new()));
        let splits: Vec<WorkoutSplit> = adapter.load(CollectionKey::Splits).await.unwrap();
        assert!(splits.is_empty());
    }

    #[tokio::test]
    async fn corrupt_blob_is_a_serialization_error() {
        let kv = Arc::new(MemoryKeyValueStore::new());
        kv.set("workoutSplits", "{oops".into()).await.unwrap();
        let adapter = PersistenceAdapter::new(kv);
        let err = adapter
            .load::<Vec<WorkoutSplit>>(CollectionKey::Splits)
            .await
            .unwrap_err();
        assert!(matches!(err, PlanError::Serialization(_)));
    }

    #[tokio::test]
    async fn prefix_namespaces_storage_keys() {
        let kv = Arc::new(MemoryKeyValueStore::new());
        let adapter = PersistenceAdapter::new(kv.clone()).with_prefix("alice.");
        adapter
            .save(CollectionKey::MacroEntries, &Vec::<u32>::new())
            .await
            .unwrap();
        assert_eq!(kv.keys().await.unwrap(), vec!["alice.macroEntries"]);
    }
}
