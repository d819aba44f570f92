//! Active configuration and request pinning.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use thiserror::Error;
use uuid::Uuid;

use crate::gateway::planner::{PlanError, QueryPlan, QueryPlanner, ServiceRoute};

/// One validated, planner-ready configuration as adopted by a gateway.
pub struct GatewaySnapshot {
    pub id: Uuid,
    pub version: u64,
    pub composed_at: u64,
    pub supergraph_sdl: String,
    pub services: Vec<ServiceRoute>,
    pub planner: Arc<dyn QueryPlanner>,
}

impl std::fmt::Debug for GatewaySnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewaySnapshot")
            .field("id", &self.id)
            .field("version", &self.version)
            .field("services", &self.services.len())
            .finish()
    }
}

/// The gateway's current configuration slot.
///
/// Readers load the full `Arc` and keep it for as long as they need;
/// adoption swaps the slot without touching outstanding references. This is
/// the immutable-snapshot-plus-pointer-swap the registry's "mutable global
/// configuration" collapses into.
#[derive(Default)]
pub struct ActiveConfiguration {
    current: ArcSwapOption<GatewaySnapshot>,
}

impl ActiveConfiguration {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Current snapshot, if one has been adopted.
    pub fn snapshot(&self) -> Option<Arc<GatewaySnapshot>> {
        self.current.load_full()
    }

    pub fn version(&self) -> Option<u64> {
        self.current.load().as_ref().map(|s| s.version)
    }

    /// Atomically adopt `next`; returns the superseded version, if any.
    pub fn adopt(&self, next: Arc<GatewaySnapshot>) -> Option<u64> {
        let previous = self.current.swap(Some(next));
        previous.map(|p| p.version)
    }
}

/// Errors on the request path.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// No configuration adopted yet (managed gateway before first sync).
    #[error("no configuration adopted yet")]
    NotReady,

    #[error(transparent)]
    Plan(#[from] PlanError),
}

/// Request-facing face of the gateway.
#[derive(Clone)]
pub struct Gateway {
    active: Arc<ActiveConfiguration>,
}

impl Gateway {
    pub fn new(active: Arc<ActiveConfiguration>) -> Self {
        Self { active }
    }

    /// Pin the current snapshot for one request.
    ///
    /// Everything the request does afterwards — planning included — runs
    /// against the pinned snapshot, even if a newer one is adopted before
    /// the request finishes.
    pub fn begin_request(&self) -> Result<RequestContext, GatewayError> {
        let snapshot = self.active.snapshot().ok_or(GatewayError::NotReady)?;
        Ok(RequestContext { snapshot })
    }
}

/// One request's pinned view of the configuration.
pub struct RequestContext {
    snapshot: Arc<GatewaySnapshot>,
}

impl RequestContext {
    pub fn version(&self) -> u64 {
        self.snapshot.version
    }

    pub fn snapshot(&self) -> &GatewaySnapshot {
        &self.snapshot
    }

    pub fn plan(&self, operation: &str) -> Result<QueryPlan, GatewayError> {
        Ok(self.snapshot.planner.plan(operation)?)
    }
}
