//! Snapshot model: the configuration that travels between registry and
//! gateway, and the pointer/fragment form it takes in the store.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::composition::ComposedSchema;
use crate::distribution::key::sha256_hex;
use crate::registry::ServiceDescriptor;

/// Reserved fragment name carrying the composed supergraph document.
///
/// Stored under its own location (`supergraph.json`), so it can never
/// collide with a service fragment.
pub const SUPERGRAPH_FRAGMENT: &str = "supergraph";

/// Errors from the distribution store.
#[derive(Debug, Error)]
pub enum DistributionError {
    /// Store or network unavailable. Callers fall back to their last
    /// cached snapshot.
    #[error("distribution store unreachable: {0}")]
    Unreachable(String),

    #[error("distribution store i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot codec error: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("pointer record for `{key}` is corrupt: {detail}")]
    CorruptPointer { key: String, detail: String },

    #[error("fragment `{service}` is missing from the store")]
    MissingFragment { service: String },

    #[error("fragment `{service}` failed its integrity check")]
    FragmentIntegrity { service: String },
}

/// An immutable configuration snapshot: one successful composition over a
/// consistent set of service descriptors.
///
/// Never mutated after publication; superseded only by a snapshot with a
/// higher version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComposedConfiguration {
    pub id: Uuid,
    /// Monotonically increasing per (graph, variant).
    pub version: u64,
    /// Unix seconds at composition time.
    pub composed_at: u64,
    pub schema: ComposedSchema,
    /// Descriptor set the composition was built from.
    pub services: Vec<ServiceDescriptor>,
}

impl ComposedConfiguration {
    pub fn new(version: u64, schema: ComposedSchema, services: Vec<ServiceDescriptor>) -> Self {
        Self {
            id: Uuid::new_v4(),
            version,
            composed_at: unix_now(),
            schema,
            services,
        }
    }
}

pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Location and digest of one stored fragment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FragmentRef {
    pub service: String,
    /// Location relative to the key's slot, e.g. `v3/services/reviews.json`.
    pub location: String,
    pub sha256: String,
}

/// The top-level pointer record for a (graph, variant): names the current
/// version and where each fragment lives.
///
/// Writing this record is the atomic commit of a publish; fragments are in
/// place before any reader can see the pointer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigPointer {
    pub id: Uuid,
    pub version: u64,
    pub composed_at: u64,
    pub supergraph: FragmentRef,
    pub fragments: Vec<FragmentRef>,
}

/// One downloadable unit of configuration.
///
/// Service fragments carry a routing URL and the service's partial schema;
/// the supergraph fragment carries the composed document and no URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceFragment {
    pub service: String,
    /// Version of the snapshot this fragment belongs to. Every fragment of
    /// a consistent download reports the pointer's version.
    pub version: u64,
    pub routing_url: Option<String>,
    pub sdl: String,
}

/// A snapshot serialized for storage: pointer plus fragment blobs.
#[derive(Debug, Clone)]
pub struct SnapshotArtifacts {
    pub pointer: ConfigPointer,
    /// Fragment blobs keyed by their ref, supergraph included.
    pub blobs: Vec<(FragmentRef, Vec<u8>)>,
}

/// Serialize a configuration into its stored form.
///
/// Both store implementations publish through this, so pointer layout and
/// digests are identical regardless of backend.
pub fn build_artifacts(config: &ComposedConfiguration) -> Result<SnapshotArtifacts, DistributionError> {
    let mut blobs = Vec::with_capacity(config.services.len() + 1);

    let supergraph_fragment = ServiceFragment {
        service: SUPERGRAPH_FRAGMENT.to_string(),
        version: config.version,
        routing_url: None,
        sdl: config.schema.sdl.clone(),
    };
    let supergraph_bytes = serde_json::to_vec(&supergraph_fragment)?;
    let supergraph = FragmentRef {
        service: SUPERGRAPH_FRAGMENT.to_string(),
        location: format!("v{}/supergraph.json", config.version),
        sha256: sha256_hex(&supergraph_bytes),
    };
    blobs.push((supergraph.clone(), supergraph_bytes));

    let mut fragments = Vec::with_capacity(config.services.len());
    for svc in &config.services {
        let fragment = ServiceFragment {
            service: svc.name.clone(),
            version: config.version,
            routing_url: Some(svc.routing_url.clone()),
            sdl: svc.schema_sdl.clone(),
        };
        let bytes = serde_json::to_vec(&fragment)?;
        let fref = FragmentRef {
            service: svc.name.clone(),
            location: format!("v{}/services/{}.json", config.version, svc.name),
            sha256: sha256_hex(&bytes),
        };
        fragments.push(fref.clone());
        blobs.push((fref, bytes));
    }

    Ok(SnapshotArtifacts {
        pointer: ConfigPointer {
            id: config.id,
            version: config.version,
            composed_at: config.composed_at,
            supergraph,
            fragments,
        },
        blobs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composition::{Composer, StructuralComposer};

    fn sample_config(version: u64) -> ComposedConfiguration {
        let services = vec![ServiceDescriptor {
            name: "accounts".into(),
            routing_url: "http://accounts.internal/graphql".into(),
            schema_sdl: "type Query { me: User }\ntype User { id: ID! }".into(),
        }];
        let schema = StructuralComposer.compose(&services).unwrap();
        ComposedConfiguration::new(version, schema, services)
    }

    #[test]
    fn test_artifacts_cover_every_service() {
        let config = sample_config(3);
        let artifacts = build_artifacts(&config).unwrap();

        assert_eq!(artifacts.pointer.version, 3);
        assert_eq!(artifacts.pointer.fragments.len(), 1);
        assert_eq!(artifacts.pointer.fragments[0].service, "accounts");
        assert_eq!(artifacts.pointer.supergraph.location, "v3/supergraph.json");
        // Supergraph blob plus one per service.
        assert_eq!(artifacts.blobs.len(), 2);
    }

    #[test]
    fn test_fragment_digests_match_blobs() {
        let artifacts = build_artifacts(&sample_config(1)).unwrap();
        for (fref, bytes) in &artifacts.blobs {
            assert_eq!(fref.sha256, sha256_hex(bytes));
        }
    }
}
