//! Query planner boundary.
//!
//! Planning and execution belong to the query engine, which this core does
//! not implement. The gateway only needs two facts: a planner is built once
//! per adopted snapshot, and planning happens against the snapshot a request
//! pinned.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A service the gateway can route fetches to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRoute {
    pub name: String,
    pub routing_url: String,
}

/// One downstream fetch of a plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchNode {
    pub service: String,
    pub routing_url: String,
}

/// An executable plan for one operation.
#[derive(Debug, Clone)]
pub struct QueryPlan {
    /// Configuration version the plan was built against.
    pub version: u64,
    pub operation: String,
    pub fetches: Vec<FetchNode>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlanError {
    #[error("cannot plan an empty operation")]
    EmptyOperation,

    #[error("planner rejected the supergraph document: {0}")]
    InvalidSupergraph(String),
}

/// Plans operations against one fixed snapshot.
pub trait QueryPlanner: Send + Sync {
    fn plan(&self, operation: &str) -> Result<QueryPlan, PlanError>;
}

/// Builds a planner for each adopted snapshot.
pub trait PlannerFactory: Send + Sync {
    fn build(
        &self,
        version: u64,
        supergraph_sdl: &str,
        services: &[ServiceRoute],
    ) -> Result<Arc<dyn QueryPlanner>, PlanError>;
}

/// Development stand-in planner: fans every operation out to all services.
///
/// Carries the snapshot version into each plan, which is what the swap and
/// in-flight pinning tests observe.
pub struct FanoutPlanner {
    version: u64,
    services: Vec<ServiceRoute>,
}

impl QueryPlanner for FanoutPlanner {
    fn plan(&self, operation: &str) -> Result<QueryPlan, PlanError> {
        let operation = operation.trim();
        if operation.is_empty() {
            return Err(PlanError::EmptyOperation);
        }
        Ok(QueryPlan {
            version: self.version,
            operation: operation.to_string(),
            fetches: self
                .services
                .iter()
                .map(|s| FetchNode {
                    service: s.name.clone(),
                    routing_url: s.routing_url.clone(),
                })
                .collect(),
        })
    }
}

/// Factory for [`FanoutPlanner`].
#[derive(Debug, Default, Clone, Copy)]
pub struct FanoutPlannerFactory;

impl PlannerFactory for FanoutPlannerFactory {
    fn build(
        &self,
        version: u64,
        supergraph_sdl: &str,
        services: &[ServiceRoute],
    ) -> Result<Arc<dyn QueryPlanner>, PlanError> {
        if supergraph_sdl.trim().is_empty() {
            return Err(PlanError::InvalidSupergraph("empty supergraph document".into()));
        }
        Ok(Arc::new(FanoutPlanner {
            version,
            services: services.to_vec(),
        }))
    }
}
