//! In-process snapshot store for tests and single-process development.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;

use crate::distribution::key::{sha256_hex, StorageKey};
use crate::distribution::store::SnapshotStore;
use crate::distribution::types::{
    build_artifacts, ComposedConfiguration, ConfigPointer, DistributionError, FragmentRef,
    ServiceFragment,
};

struct MemoryEntry {
    pointer: ConfigPointer,
    blobs: HashMap<String, Vec<u8>>,
}

/// Snapshot store backed by process memory.
///
/// Publish replaces a key's entry wholesale, so readers observe either the
/// previous complete snapshot or the new one. The offline switch injects
/// store outages for fault testing.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, MemoryEntry>>,
    offline: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a store outage: all operations return `Unreachable` until
    /// switched back.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_reachable(&self) -> Result<(), DistributionError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(DistributionError::Unreachable("memory store offline".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl SnapshotStore for MemoryStore {
    async fn publish(
        &self,
        key: &StorageKey,
        config: &ComposedConfiguration,
    ) -> Result<ConfigPointer, DistributionError> {
        self.check_reachable()?;
        let artifacts = build_artifacts(config)?;

        let blobs = artifacts
            .blobs
            .into_iter()
            .map(|(fref, bytes)| (fref.location, bytes))
            .collect();

        let mut entries = self.entries.write().expect("memory store lock poisoned");
        entries.insert(
            key.to_string(),
            MemoryEntry {
                pointer: artifacts.pointer.clone(),
                blobs,
            },
        );
        Ok(artifacts.pointer)
    }

    async fn head(&self, key: &StorageKey) -> Result<Option<ConfigPointer>, DistributionError> {
        self.check_reachable()?;
        let entries = self.entries.read().expect("memory store lock poisoned");
        Ok(entries.get(&key.to_string()).map(|e| e.pointer.clone()))
    }

    async fn fetch(
        &self,
        key: &StorageKey,
        fragment: &FragmentRef,
    ) -> Result<ServiceFragment, DistributionError> {
        self.check_reachable()?;
        let entries = self.entries.read().expect("memory store lock poisoned");
        let bytes = entries
            .get(&key.to_string())
            .and_then(|e| e.blobs.get(&fragment.location))
            .ok_or_else(|| DistributionError::MissingFragment {
                service: fragment.service.clone(),
            })?;

        if sha256_hex(bytes) != fragment.sha256 {
            return Err(DistributionError::FragmentIntegrity {
                service: fragment.service.clone(),
            });
        }
        Ok(serde_json::from_slice(bytes)?)
    }
}
