//! Shared test doubles for the key-value substrate.
#![cfg(test)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::kv::{KeyValueStore, MemoryKeyValueStore};
use crate::{PlanError, PlanResult};

/// In-memory store whose writes can be made to fail or to park on demand.
#[derive(Debug, Default)]
pub struct FlakyStore {
    inner: MemoryKeyValueStore,
    fail_writes: AtomicBool,
    park_writes: AtomicBool,
    parked: Notify,
    release: Notify,
    writes: AtomicUsize,
    yield_on_write: bool,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Yield to the scheduler in the middle of every write so concurrent callers
    /// interleave.
    pub fn with_yield_on_write(mut self) -> Self {
        self.yield_on_write = true;
        self
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Parked writes wait for [`FlakyStore::release_parked`]; without it they never
    /// complete.
    pub fn park_writes(&self, park: bool) {
        self.park_writes.store(park, Ordering::SeqCst);
    }

    pub async fn wait_until_parked(&self) {
        self.parked.notified().await;
    }

    pub fn release_parked(&self) {
        self.release.notify_one();
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KeyValueStore for FlakyStore {
    async fn get(&self, key: &str) -> PlanResult<Option<String>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: String) -> PlanResult<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.yield_on_write {
            tokio::task::yield_now().await;
        }
        if self.park_writes.load(Ordering::SeqCst) {
            self.parked.notify_one();
            self.release.notified().await;
        }
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(PlanError::Persistence(format!("injected write failure for {key}")));
        }
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> PlanResult<()> {
        self.inner.remove(key).await
    }

    async fn keys(&self) -> PlanResult<Vec<String>> {
        self.inner.keys().await
    }
}
