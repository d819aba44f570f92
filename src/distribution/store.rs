//! Snapshot store boundary.

use async_trait::async_trait;

use crate::distribution::key::StorageKey;
use crate::distribution::types::{
    ComposedConfiguration, ConfigPointer, DistributionError, FragmentRef, ServiceFragment,
};

/// Write-once-per-version snapshot store.
///
/// The registry writes through `publish`; gateways read through `head` and
/// `fetch`. No other channel exists between the two sides.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Write a new snapshot and atomically advance the pointer.
    ///
    /// Fragments must be durable before the pointer becomes visible; a
    /// reader that observes the returned pointer can fetch every fragment
    /// it references.
    async fn publish(
        &self,
        key: &StorageKey,
        config: &ComposedConfiguration,
    ) -> Result<ConfigPointer, DistributionError>;

    /// Current pointer record, or `None` if nothing was ever published.
    async fn head(&self, key: &StorageKey) -> Result<Option<ConfigPointer>, DistributionError>;

    /// Fetch one fragment, verifying its digest against the ref.
    async fn fetch(
        &self,
        key: &StorageKey,
        fragment: &FragmentRef,
    ) -> Result<ServiceFragment, DistributionError>;
}
