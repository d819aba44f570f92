//! JSON handlers for the registry API.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::api::server::AppState;
use crate::registry::{
    CheckOutcome, CheckRequest, DeleteOutcome, GraphRef, PushOutcome, PushRequest, RegistryError,
    ServiceSummary,
};

/// Registry error with its HTTP mapping.
pub struct ApiError(RegistryError);

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            RegistryError::InvalidGraphRef(_)
            | RegistryError::InvalidServiceName(_)
            | RegistryError::MalformedSchema { .. }
            | RegistryError::InvalidRoutingUrl { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            RegistryError::NameRetired(_) => StatusCode::CONFLICT,
            RegistryError::UnknownService { .. } => StatusCode::NOT_FOUND,
            RegistryError::Distribution(_) => StatusCode::BAD_GATEWAY,
        };
        let body = Json(serde_json::json!({ "error": self.0.to_string() }));
        (status, body).into_response()
    }
}

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
}

pub async fn status() -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
    })
}

pub async fn push(
    State(state): State<AppState>,
    Path((graph, variant)): Path<(String, String)>,
    Json(body): Json<PushRequest>,
) -> Result<Json<PushOutcome>, ApiError> {
    let graph_ref = GraphRef::new(graph, variant);
    let outcome = state.registry.push(&graph_ref, body).await?;
    Ok(Json(outcome))
}

pub async fn check(
    State(state): State<AppState>,
    Path((graph, variant)): Path<(String, String)>,
    Json(body): Json<CheckRequest>,
) -> Result<Json<CheckOutcome>, ApiError> {
    let graph_ref = GraphRef::new(graph, variant);
    let outcome = state.registry.check(&graph_ref, body).await?;
    Ok(Json(outcome))
}

pub async fn delete_service(
    State(state): State<AppState>,
    Path((graph, variant, service)): Path<(String, String, String)>,
) -> Result<Json<DeleteOutcome>, ApiError> {
    let graph_ref = GraphRef::new(graph, variant);
    let outcome = state.registry.delete(&graph_ref, &service).await?;
    Ok(Json(outcome))
}

pub async fn list_services(
    State(state): State<AppState>,
    Path((graph, variant)): Path<(String, String)>,
) -> Result<Json<Vec<ServiceSummary>>, ApiError> {
    let graph_ref = GraphRef::new(graph, variant);
    let services = state.registry.list(&graph_ref).await?;
    Ok(Json(services))
}
