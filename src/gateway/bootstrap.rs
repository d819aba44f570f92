//! Static (development) bootstrap: compose a fixed service list at boot,
//! no reconciliation.

use thiserror::Error;

use crate::composition::{CompositionError, Composer};
use crate::distribution::types::unix_now;
use crate::gateway::active::GatewaySnapshot;
use crate::gateway::planner::{PlanError, PlannerFactory, ServiceRoute};
use crate::registry::ServiceDescriptor;

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("static service list is empty")]
    NoServices,

    #[error("static service list does not compose ({} error(s))", .0.len())]
    Composition(Vec<CompositionError>),

    #[error("planner build failed: {0}")]
    Planner(#[from] PlanError),
}

/// Compose `services` once and build the snapshot a development gateway
/// serves for its whole lifetime.
pub fn compose_static(
    composer: &dyn Composer,
    planners: &dyn PlannerFactory,
    services: Vec<ServiceDescriptor>,
) -> Result<GatewaySnapshot, BootstrapError> {
    if services.is_empty() {
        return Err(BootstrapError::NoServices);
    }

    let schema = composer
        .compose(&services)
        .map_err(BootstrapError::Composition)?;

    let routes: Vec<ServiceRoute> = services
        .iter()
        .map(|s| ServiceRoute {
            name: s.name.clone(),
            routing_url: s.routing_url.clone(),
        })
        .collect();
    let planner = planners.build(1, &schema.sdl, &routes)?;

    Ok(GatewaySnapshot {
        id: uuid::Uuid::new_v4(),
        version: 1,
        composed_at: unix_now(),
        supergraph_sdl: schema.sdl,
        services: routes,
        planner,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composition::StructuralComposer;
    use crate::gateway::planner::FanoutPlannerFactory;

    #[test]
    fn test_static_bootstrap_composes_and_plans() {
        let services = vec![ServiceDescriptor {
            name: "accounts".into(),
            routing_url: "http://localhost:4001/graphql".into(),
            schema_sdl: "type Query { me: User }\ntype User { id: ID! }".into(),
        }];
        let snapshot =
            compose_static(&StructuralComposer, &FanoutPlannerFactory, services).unwrap();
        assert_eq!(snapshot.version, 1);
        assert!(snapshot.planner.plan("query { me { id } }").is_ok());
    }

    #[test]
    fn test_empty_list_rejected() {
        let err = compose_static(&StructuralComposer, &FanoutPlannerFactory, Vec::new());
        assert!(matches!(err, Err(BootstrapError::NoServices)));
    }

    #[test]
    fn test_non_composing_list_rejected() {
        let services = vec![ServiceDescriptor {
            name: "reviews".into(),
            routing_url: "http://localhost:4002/graphql".into(),
            schema_sdl: "extend type User { reviews: Int }".into(),
        }];
        let err = compose_static(&StructuralComposer, &FanoutPlannerFactory, services);
        assert!(matches!(err, Err(BootstrapError::Composition(_))));
    }
}
