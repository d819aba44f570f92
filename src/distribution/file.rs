//! Filesystem-backed snapshot store.
//!
//! Layout per storage key:
//! ```text
//! <root>/<scope>/<graph>/<variant>/
//!     pointer.json              current pointer record
//!     v<version>/supergraph.json
//!     v<version>/services/<service>.json
//! ```
//!
//! Fragments land before the pointer; the pointer is written to a temp file
//! and renamed over `pointer.json`, so a reader sees either the old complete
//! snapshot or the new one, never a partial set.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use crate::distribution::key::{sha256_hex, StorageKey};
use crate::distribution::store::SnapshotStore;
use crate::distribution::types::{
    build_artifacts, ComposedConfiguration, ConfigPointer, DistributionError, FragmentRef,
    ServiceFragment,
};

/// Name of the pointer record inside a key's directory.
pub const POINTER_FILE: &str = "pointer.json";

/// Snapshot store rooted at a directory, shareable between registry and
/// gateway processes on a common filesystem.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Path of the pointer record for `key` (used by the pointer watcher).
    pub fn pointer_path(&self, key: &StorageKey) -> PathBuf {
        key.dir(&self.root).join(POINTER_FILE)
    }

    fn fragment_path(&self, key: &StorageKey, fragment: &FragmentRef) -> PathBuf {
        key.dir(&self.root).join(&fragment.location)
    }
}

#[async_trait]
impl SnapshotStore for FileStore {
    async fn publish(
        &self,
        key: &StorageKey,
        config: &ComposedConfiguration,
    ) -> Result<ConfigPointer, DistributionError> {
        let artifacts = build_artifacts(config)?;
        let dir = key.dir(&self.root);

        for (fref, bytes) in &artifacts.blobs {
            let path = dir.join(&fref.location);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).await?;
            }
            fs::write(&path, bytes).await?;
        }

        let pointer_bytes = serde_json::to_vec_pretty(&artifacts.pointer)?;
        let tmp = dir.join(format!("{POINTER_FILE}.tmp"));
        fs::write(&tmp, &pointer_bytes).await?;
        fs::rename(&tmp, dir.join(POINTER_FILE)).await?;

        tracing::debug!(
            key = %key,
            version = artifacts.pointer.version,
            fragments = artifacts.pointer.fragments.len(),
            "snapshot published"
        );
        Ok(artifacts.pointer)
    }

    async fn head(&self, key: &StorageKey) -> Result<Option<ConfigPointer>, DistributionError> {
        let path = self.pointer_path(key);
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&bytes).map(Some).map_err(|e| {
            DistributionError::CorruptPointer {
                key: key.to_string(),
                detail: e.to_string(),
            }
        })
    }

    async fn fetch(
        &self,
        key: &StorageKey,
        fragment: &FragmentRef,
    ) -> Result<ServiceFragment, DistributionError> {
        let path = self.fragment_path(key, fragment);
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(DistributionError::MissingFragment {
                    service: fragment.service.clone(),
                })
            }
            Err(e) => return Err(e.into()),
        };

        if sha256_hex(&bytes) != fragment.sha256 {
            return Err(DistributionError::FragmentIntegrity {
                service: fragment.service.clone(),
            });
        }
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Convenience for binaries: ensure the store root exists up front so a
/// misconfigured path fails at startup, not at first publish.
pub async fn ensure_root(root: &Path) -> Result<(), DistributionError> {
    fs::create_dir_all(root).await?;
    Ok(())
}
