//! Gateway-side managed configuration.
//!
//! # Data Flow
//! ```text
//! reconciler loop (one per gateway instance):
//!     Idle → Polling (store head)
//!          → Downloading (all fragments, parallel)
//!          → Validating (uniform version, digests, routing urls)
//!          → Swapping (ArcSwap adopt)
//!          → Idle
//!     any failure → Idle, last adopted snapshot keeps serving
//!
//! request path:
//!     begin_request → pins Arc<GatewaySnapshot>
//!     planning/execution run against the pinned snapshot even if a newer
//!     one is adopted mid-request
//! ```
//!
//! # Design Decisions
//! - Swap is drain-old/adopt-new: in-flight requests finish on the snapshot
//!   they started with; the next request observes the new one
//! - Request handling never blocks on reconciliation; staleness is always
//!   preferred over unavailability
//! - The query planner is an external collaborator behind `PlannerFactory`

pub mod active;
pub mod bootstrap;
pub mod planner;
pub mod reconciler;

pub use active::{ActiveConfiguration, Gateway, GatewayError, GatewaySnapshot, RequestContext};
pub use bootstrap::{compose_static, BootstrapError};
pub use planner::{
    FanoutPlanner, FanoutPlannerFactory, FetchNode, PlanError, PlannerFactory, QueryPlan,
    QueryPlanner, ServiceRoute,
};
pub use reconciler::{ReconcileError, Reconciler, SyncOutcome};
