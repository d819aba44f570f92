//! Managed-configuration reconciliation loop.

use std::sync::Arc;

use futures_util::future;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{interval, Duration};

use crate::config::PollConfig;
use crate::distribution::{DistributionError, ServiceFragment, SnapshotStore, StorageKey};
use crate::gateway::active::{ActiveConfiguration, GatewaySnapshot};
use crate::gateway::planner::{PlanError, PlannerFactory, ServiceRoute};
use crate::observability::metrics;
use crate::registry::GraphRef;
use crate::resilience::Backoff;

/// Result of one reconciliation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Nothing published yet, or the active snapshot is already current.
    UpToDate,
    /// A newer snapshot was validated and adopted.
    Adopted { version: u64 },
}

/// Why a reconciliation pass failed. The previously adopted configuration
/// keeps serving in every case.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Store(#[from] DistributionError),

    /// Fragment set is not a consistent snapshot.
    #[error("fragment `{service}` reports version {found}, pointer says {expected}")]
    VersionMismatch {
        service: String,
        expected: u64,
        found: u64,
    },

    /// A service fragment arrived without a routing URL.
    #[error("fragment `{service}` is missing its routing url")]
    MissingRoutingUrl { service: String },

    #[error("planner build failed: {0}")]
    Planner(#[from] PlanError),
}

/// Keeps one gateway's active configuration converged on the store.
///
/// `Idle → Polling → Downloading → Validating → Swapping → Idle`;
/// Downloading and Validating fail back to Idle with the previous snapshot
/// untouched.
pub struct Reconciler {
    store: Arc<dyn SnapshotStore>,
    key: StorageKey,
    graph_ref: GraphRef,
    active: Arc<ActiveConfiguration>,
    planners: Arc<dyn PlannerFactory>,
    poll: PollConfig,
}

impl Reconciler {
    pub fn new(
        store: Arc<dyn SnapshotStore>,
        key: StorageKey,
        graph_ref: GraphRef,
        active: Arc<ActiveConfiguration>,
        planners: Arc<dyn PlannerFactory>,
        poll: PollConfig,
    ) -> Self {
        Self {
            store,
            key,
            graph_ref,
            active,
            planners,
            poll,
        }
    }

    /// Run until shutdown. `nudge` (from a pointer watcher) wakes the loop
    /// ahead of the next tick; correctness never depends on it.
    pub async fn run(
        self,
        mut shutdown: broadcast::Receiver<()>,
        mut nudge: Option<mpsc::UnboundedReceiver<()>>,
    ) {
        tracing::info!(
            graph_ref = %self.graph_ref,
            interval_secs = self.poll.interval_secs,
            "reconciler starting"
        );

        let mut ticker = interval(Duration::from_secs(self.poll.interval_secs));
        let mut backoff = Backoff::new(self.poll.base_backoff_ms, self.poll.max_backoff_ms);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = recv_nudge(&mut nudge) => {
                    tracing::debug!(graph_ref = %self.graph_ref, "woken by pointer change");
                }
                _ = shutdown.recv() => {
                    tracing::info!(graph_ref = %self.graph_ref, "reconciler received shutdown signal, exiting loop");
                    break;
                }
            }

            match self.sync_once().await {
                Ok(SyncOutcome::Adopted { version }) => {
                    backoff.reset();
                    tracing::info!(graph_ref = %self.graph_ref, version, "configuration adopted");
                }
                Ok(SyncOutcome::UpToDate) => {
                    backoff.reset();
                }
                Err(e) => {
                    metrics::record_poll_failure(&self.graph_ref);
                    let delay = backoff.next_delay();
                    tracing::warn!(
                        graph_ref = %self.graph_ref,
                        error = %e,
                        retry_in_ms = delay.as_millis() as u64,
                        active_version = ?self.active.version(),
                        "reconciliation failed; continuing to serve last adopted configuration"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// One full pass: poll, and if the store is ahead, download, validate,
    /// and swap.
    pub async fn sync_once(&self) -> Result<SyncOutcome, ReconcileError> {
        // Polling
        let Some(pointer) = self.store.head(&self.key).await? else {
            return Ok(SyncOutcome::UpToDate);
        };
        if let Some(current) = self.active.version() {
            if pointer.version <= current {
                return Ok(SyncOutcome::UpToDate);
            }
        }

        // Downloading: independent fetches, no ordering between them.
        let mut wanted = Vec::with_capacity(pointer.fragments.len() + 1);
        wanted.push(&pointer.supergraph);
        wanted.extend(pointer.fragments.iter());

        let results = future::join_all(
            wanted.iter().map(|fref| self.store.fetch(&self.key, fref)),
        )
        .await;
        let mut fragments = Vec::with_capacity(results.len());
        for result in results {
            fragments.push(result?);
        }

        // Validating: one uniform version across the set, routable services.
        for fragment in &fragments {
            if fragment.version != pointer.version {
                return Err(ReconcileError::VersionMismatch {
                    service: fragment.service.clone(),
                    expected: pointer.version,
                    found: fragment.version,
                });
            }
        }
        let supergraph = &fragments[0];
        let services = fragments[1..]
            .iter()
            .map(service_route)
            .collect::<Result<Vec<_>, _>>()?;

        let planner = self
            .planners
            .build(pointer.version, &supergraph.sdl, &services)?;

        // Swapping: next request sees the new snapshot, in-flight requests
        // finish on the one they pinned.
        let snapshot = Arc::new(GatewaySnapshot {
            id: pointer.id,
            version: pointer.version,
            composed_at: pointer.composed_at,
            supergraph_sdl: supergraph.sdl.clone(),
            services,
            planner,
        });
        let superseded = self.active.adopt(snapshot);
        metrics::record_config_swap(&self.graph_ref, pointer.version);
        tracing::debug!(
            graph_ref = %self.graph_ref,
            version = pointer.version,
            superseded = ?superseded,
            "snapshot swapped"
        );
        Ok(SyncOutcome::Adopted {
            version: pointer.version,
        })
    }
}

fn service_route(fragment: &ServiceFragment) -> Result<ServiceRoute, ReconcileError> {
    let routing_url = fragment
        .routing_url
        .clone()
        .ok_or_else(|| ReconcileError::MissingRoutingUrl {
            service: fragment.service.clone(),
        })?;
    Ok(ServiceRoute {
        name: fragment.service.clone(),
        routing_url,
    })
}

async fn recv_nudge(nudge: &mut Option<mpsc::UnboundedReceiver<()>>) {
    match nudge {
        Some(rx) => {
            if rx.recv().await.is_none() {
                // Watcher gone; fall back to pure polling.
                std::future::pending::<()>().await
            }
        }
        None => std::future::pending::<()>().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composition::{Composer, StructuralComposer};
    use crate::distribution::{ComposedConfiguration, MemoryStore};
    use crate::gateway::planner::FanoutPlannerFactory;
    use crate::registry::ServiceDescriptor;

    fn sample_config(version: u64) -> ComposedConfiguration {
        let services = vec![ServiceDescriptor {
            name: "accounts".into(),
            routing_url: "http://accounts.internal/graphql".into(),
            schema_sdl: "type Query { me: User }\ntype User { id: ID! }".into(),
        }];
        let schema = StructuralComposer.compose(&services).unwrap();
        ComposedConfiguration::new(version, schema, services)
    }

    fn reconciler(store: Arc<MemoryStore>) -> (Reconciler, Arc<ActiveConfiguration>) {
        let active = Arc::new(ActiveConfiguration::empty());
        let key = StorageKey::derive("secret", "shop", "production");
        let rec = Reconciler::new(
            store,
            key,
            GraphRef::new("shop", "production"),
            active.clone(),
            Arc::new(FanoutPlannerFactory),
            PollConfig::default(),
        );
        (rec, active)
    }

    #[tokio::test]
    async fn test_adopts_published_snapshot() {
        let store = Arc::new(MemoryStore::new());
        let key = StorageKey::derive("secret", "shop", "production");
        store.publish(&key, &sample_config(1)).await.unwrap();

        let (rec, active) = reconciler(store);
        assert_eq!(rec.sync_once().await.unwrap(), SyncOutcome::Adopted { version: 1 });
        assert_eq!(active.version(), Some(1));
    }

    #[tokio::test]
    async fn test_empty_store_is_up_to_date() {
        let (rec, active) = reconciler(Arc::new(MemoryStore::new()));
        assert_eq!(rec.sync_once().await.unwrap(), SyncOutcome::UpToDate);
        assert_eq!(active.version(), None);
    }

    #[tokio::test]
    async fn test_current_snapshot_not_readopted() {
        let store = Arc::new(MemoryStore::new());
        let key = StorageKey::derive("secret", "shop", "production");
        store.publish(&key, &sample_config(1)).await.unwrap();

        let (rec, _) = reconciler(store);
        rec.sync_once().await.unwrap();
        assert_eq!(rec.sync_once().await.unwrap(), SyncOutcome::UpToDate);
    }

    #[tokio::test]
    async fn test_store_outage_keeps_last_snapshot() {
        let store = Arc::new(MemoryStore::new());
        let key = StorageKey::derive("secret", "shop", "production");
        store.publish(&key, &sample_config(1)).await.unwrap();

        let (rec, active) = reconciler(store.clone());
        rec.sync_once().await.unwrap();

        store.set_offline(true);
        assert!(matches!(
            rec.sync_once().await,
            Err(ReconcileError::Store(DistributionError::Unreachable(_)))
        ));
        // Staleness over unavailability.
        assert_eq!(active.version(), Some(1));
    }
}
