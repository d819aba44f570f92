//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Value ranges (attempts >= 1, intervals > 0, addresses parse)
//! - Mode coherence (managed needs a shared store, static needs services)
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Pure functions: config in, Result out
//! - Runs before a config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::{
    GatewayConfig, GatewayMode, ObservabilityConfig, RegistryConfig, StorageBackend,
};
use crate::registry::valid_service_name;

/// One semantic problem in a config file.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("listener.bind_address `{0}` is not a valid socket address")]
    InvalidBindAddress(String),

    #[error("auth.api_key must not be empty")]
    EmptyApiKey,

    #[error("publish.max_attempts must be at least 1")]
    ZeroPublishAttempts,

    #[error("poll.interval_secs must be at least 1")]
    ZeroPollInterval,

    #[error("observability.metrics_address `{0}` is not a valid socket address")]
    InvalidMetricsAddress(String),

    #[error("graph `{0}` is not a valid identifier")]
    InvalidGraphName(String),

    #[error("variant `{0}` is not a valid identifier")]
    InvalidVariantName(String),

    #[error("managed mode requires storage.backend = \"file\" (a store shared with the registry)")]
    ManagedNeedsSharedStore,

    #[error("static mode requires at least one [[services]] entry")]
    StaticNeedsServices,

    #[error("service `{0}` is listed twice")]
    DuplicateStaticService(String),

    #[error("service `{0}` needs either `schema` or `schema_path`")]
    StaticServiceWithoutSchema(String),

    #[error("service `{service}` routing_url `{url}` does not parse")]
    InvalidStaticRoutingUrl { service: String, url: String },
}

/// Validate a registry server config. Collects every error.
pub fn validate_registry(config: &RegistryConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }
    if config.auth.api_key.is_empty() {
        errors.push(ValidationError::EmptyApiKey);
    }
    if config.publish.max_attempts == 0 {
        errors.push(ValidationError::ZeroPublishAttempts);
    }
    validate_observability(&config.observability, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate a gateway config. Collects every error.
pub fn validate_gateway(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if !valid_service_name(&config.graph) {
        errors.push(ValidationError::InvalidGraphName(config.graph.clone()));
    }
    if !valid_service_name(&config.variant) {
        errors.push(ValidationError::InvalidVariantName(config.variant.clone()));
    }

    match config.mode {
        GatewayMode::Managed => {
            if config.auth.api_key.is_empty() {
                errors.push(ValidationError::EmptyApiKey);
            }
            if config.storage.backend != StorageBackend::File {
                errors.push(ValidationError::ManagedNeedsSharedStore);
            }
            if config.poll.interval_secs == 0 {
                errors.push(ValidationError::ZeroPollInterval);
            }
        }
        GatewayMode::Static => {
            if config.services.is_empty() {
                errors.push(ValidationError::StaticNeedsServices);
            }
            let mut seen = HashSet::new();
            for service in &config.services {
                if !seen.insert(service.name.as_str()) {
                    errors.push(ValidationError::DuplicateStaticService(service.name.clone()));
                }
                if service.schema.is_none() && service.schema_path.is_none() {
                    errors.push(ValidationError::StaticServiceWithoutSchema(
                        service.name.clone(),
                    ));
                }
                if url::Url::parse(&service.routing_url).is_err() {
                    errors.push(ValidationError::InvalidStaticRoutingUrl {
                        service: service.name.clone(),
                        url: service.routing_url.clone(),
                    });
                }
            }
        }
    }
    validate_observability(&config.observability, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_observability(config: &ObservabilityConfig, errors: &mut Vec<ValidationError>) {
    if config.metrics_enabled && config.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.metrics_address.clone(),
        ));
    }
}
