//! The registry: per-variant descriptor sets behind a compose-and-publish
//! gate.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, RwLock};

use dashmap::DashMap;
use tokio::sync::Mutex;
use url::Url;

use crate::composition::{usage_failures, Composer, OperationCorpus};
use crate::config::PublishConfig;
use crate::distribution::{sha256_hex, ComposedConfiguration, SnapshotStore, StorageKey};
use crate::observability::metrics;
use crate::registry::types::{
    valid_service_name, CheckOutcome, CheckRequest, DeleteOutcome, GraphRef, PushOutcome,
    PushRequest, RegistryError, ServiceDescriptor, ServiceSummary,
};
use crate::resilience::Backoff;
use crate::schema::parse_partial;

/// Registry backend for any number of graphs and variants.
///
/// Composition (`Composer`) and the client-operation corpus
/// (`OperationCorpus`) are injected collaborators; the registry owns only
/// descriptor state and the publish gate.
pub struct Registry {
    composer: Arc<dyn Composer>,
    corpus: Arc<dyn OperationCorpus>,
    store: Arc<dyn SnapshotStore>,
    credential: String,
    publish: PublishConfig,
    graphs: DashMap<String, Arc<GraphEntry>>,
}

#[derive(Default)]
struct GraphEntry {
    /// Service names deleted from this graph. Never reusable, across all
    /// variants of the graph.
    retired: RwLock<HashSet<String>>,
    variants: DashMap<String, Arc<VariantState>>,
}

#[derive(Default)]
struct VariantState {
    /// Serializes registry mutation and compose-and-publish per variant.
    gate: Mutex<VariantInner>,
}

#[derive(Default)]
struct VariantInner {
    /// Name-ordered descriptor set.
    services: BTreeMap<String, ServiceDescriptor>,
    /// Last successfully composed and published configuration.
    published: Option<Arc<ComposedConfiguration>>,
}

impl VariantInner {
    fn active_version(&self) -> Option<u64> {
        self.published.as_ref().map(|p| p.version)
    }

    fn descriptor_set(&self) -> Vec<ServiceDescriptor> {
        self.services.values().cloned().collect()
    }
}

impl Registry {
    pub fn new(
        composer: Arc<dyn Composer>,
        corpus: Arc<dyn OperationCorpus>,
        store: Arc<dyn SnapshotStore>,
        credential: impl Into<String>,
        publish: PublishConfig,
    ) -> Self {
        Self {
            composer,
            corpus,
            store,
            credential: credential.into(),
            publish,
            graphs: DashMap::new(),
        }
    }

    /// Register or replace a service's descriptor, then recompose the
    /// variant and publish on success.
    pub async fn push(
        &self,
        graph_ref: &GraphRef,
        req: PushRequest,
    ) -> Result<PushOutcome, RegistryError> {
        self.validate_ref(graph_ref)?;
        if !valid_service_name(&req.service) {
            return Err(RegistryError::InvalidServiceName(req.service));
        }
        parse_partial(&req.schema).map_err(|source| RegistryError::MalformedSchema {
            service: req.service.clone(),
            source,
        })?;
        Url::parse(&req.routing_url).map_err(|source| RegistryError::InvalidRoutingUrl {
            url: req.routing_url.clone(),
            source,
        })?;

        let entry = self.graph_entry(&graph_ref.graph);
        let state = entry.variant_state(&graph_ref.variant);
        let mut inner = state.gate.lock().await;

        // Checked under the gate: a delete that retired this name must not
        // interleave with the upsert.
        if entry.is_retired(&req.service) {
            return Err(RegistryError::NameRetired(req.service));
        }

        inner.services.insert(
            req.service.clone(),
            ServiceDescriptor {
                name: req.service.clone(),
                routing_url: req.routing_url,
                schema_sdl: req.schema,
            },
        );

        let services = inner.descriptor_set();
        match self.composer.compose(&services) {
            Err(errors) => {
                tracing::warn!(
                    graph_ref = %graph_ref,
                    service = %req.service,
                    error_count = errors.len(),
                    "composition failed; descriptor retained, configuration unchanged"
                );
                metrics::record_push(graph_ref, false);
                Ok(PushOutcome::CompositionFailed {
                    errors,
                    active_version: inner.active_version(),
                })
            }
            Ok(schema) => {
                let version = inner.active_version().map_or(1, |v| v + 1);
                let config = ComposedConfiguration::new(version, schema, services);
                self.publish_with_retry(graph_ref, &config).await?;

                let config = Arc::new(config);
                tracing::info!(
                    graph_ref = %graph_ref,
                    service = %req.service,
                    version,
                    id = %config.id,
                    "configuration published"
                );
                metrics::record_push(graph_ref, true);
                let id = config.id;
                inner.published = Some(config);
                Ok(PushOutcome::Published { version, id })
            }
        }
    }

    /// Dry-run a candidate schema against the variant's current set.
    ///
    /// The descriptor set is snapshotted under the gate and composed outside
    /// it: no mutation, and an abandoned check leaves no trace.
    pub async fn check(
        &self,
        graph_ref: &GraphRef,
        req: CheckRequest,
    ) -> Result<CheckOutcome, RegistryError> {
        self.validate_ref(graph_ref)?;
        if !valid_service_name(&req.service) {
            return Err(RegistryError::InvalidServiceName(req.service));
        }
        parse_partial(&req.schema).map_err(|source| RegistryError::MalformedSchema {
            service: req.service.clone(),
            source,
        })?;

        let entry = self.graph_entry(&graph_ref.graph);
        let state = entry.variant_state(&graph_ref.variant);

        let services = {
            let inner = state.gate.lock().await;
            let mut set = inner.services.clone();
            let routing_url = set
                .get(&req.service)
                .map(|d| d.routing_url.clone())
                .unwrap_or_default();
            set.insert(
                req.service.clone(),
                ServiceDescriptor {
                    name: req.service.clone(),
                    routing_url,
                    schema_sdl: req.schema,
                },
            );
            set.into_values().collect::<Vec<_>>()
        };

        match self.composer.compose(&services) {
            Err(errors) => {
                metrics::record_check(graph_ref, "composition_failed");
                Ok(CheckOutcome::CompositionFailed { errors })
            }
            Ok(schema) => {
                let operations = self
                    .corpus
                    .recorded_operations(&graph_ref.graph, &graph_ref.variant);
                let failures = usage_failures(&schema, &operations);
                if failures.is_empty() {
                    metrics::record_check(graph_ref, "pass");
                    Ok(CheckOutcome::Pass {
                        operations_checked: operations.len(),
                    })
                } else {
                    metrics::record_check(graph_ref, "usage_failed");
                    Ok(CheckOutcome::UsageFailed { failures })
                }
            }
        }
    }

    /// Remove a service and retire its name for the whole graph, then
    /// recompose whatever remains.
    pub async fn delete(
        &self,
        graph_ref: &GraphRef,
        service: &str,
    ) -> Result<DeleteOutcome, RegistryError> {
        self.validate_ref(graph_ref)?;
        let entry = self.graph_entry(&graph_ref.graph);
        let state = entry.variant_state(&graph_ref.variant);
        let mut inner = state.gate.lock().await;

        if inner.services.remove(service).is_none() {
            return Err(RegistryError::UnknownService {
                service: service.to_string(),
                graph_ref: graph_ref.to_string(),
            });
        }
        entry.retire(service);
        tracing::info!(graph_ref = %graph_ref, service, "service deleted; name retired");

        if inner.services.is_empty() {
            return Ok(DeleteOutcome::Emptied {
                active_version: inner.active_version(),
            });
        }

        let services = inner.descriptor_set();
        match self.composer.compose(&services) {
            Err(errors) => {
                tracing::warn!(
                    graph_ref = %graph_ref,
                    service,
                    error_count = errors.len(),
                    "remaining services no longer compose; configuration unchanged"
                );
                Ok(DeleteOutcome::CompositionFailed {
                    errors,
                    active_version: inner.active_version(),
                })
            }
            Ok(schema) => {
                let version = inner.active_version().map_or(1, |v| v + 1);
                let config = ComposedConfiguration::new(version, schema, services);
                self.publish_with_retry(graph_ref, &config).await?;

                let config = Arc::new(config);
                let id = config.id;
                inner.published = Some(config);
                Ok(DeleteOutcome::Published { version, id })
            }
        }
    }

    /// Name-ordered summaries of the variant's registered services.
    pub async fn list(&self, graph_ref: &GraphRef) -> Result<Vec<ServiceSummary>, RegistryError> {
        self.validate_ref(graph_ref)?;
        let Some(state) = self.existing_variant(graph_ref) else {
            return Ok(Vec::new());
        };
        let inner = state.gate.lock().await;
        Ok(inner
            .services
            .values()
            .map(|d| ServiceSummary {
                name: d.name.clone(),
                routing_url: d.routing_url.clone(),
                schema_sha256: sha256_hex(d.schema_sdl.as_bytes()),
            })
            .collect())
    }

    /// Version of the variant's published configuration, if any.
    pub async fn active_version(&self, graph_ref: &GraphRef) -> Option<u64> {
        let state = self.existing_variant(graph_ref)?;
        let inner = state.gate.lock().await;
        inner.active_version()
    }

    /// The variant's published configuration, if any.
    pub async fn published(&self, graph_ref: &GraphRef) -> Option<Arc<ComposedConfiguration>> {
        let state = self.existing_variant(graph_ref)?;
        let inner = state.gate.lock().await;
        inner.published.clone()
    }

    /// Storage key this registry publishes under for `graph_ref`.
    pub fn storage_key(&self, graph_ref: &GraphRef) -> StorageKey {
        StorageKey::derive(&self.credential, &graph_ref.graph, &graph_ref.variant)
    }

    async fn publish_with_retry(
        &self,
        graph_ref: &GraphRef,
        config: &ComposedConfiguration,
    ) -> Result<(), RegistryError> {
        let key = self.storage_key(graph_ref);
        let mut backoff = Backoff::new(self.publish.base_delay_ms, self.publish.max_delay_ms);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.store.publish(&key, config).await {
                Ok(_) => return Ok(()),
                Err(e) if attempt < self.publish.max_attempts => {
                    let delay = backoff.next_delay();
                    tracing::warn!(
                        graph_ref = %graph_ref,
                        version = config.version,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "snapshot publish failed, retrying"
                    );
                    metrics::record_publish_retry(graph_ref);
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    tracing::error!(
                        graph_ref = %graph_ref,
                        version = config.version,
                        attempts = attempt,
                        error = %e,
                        "snapshot publish failed; giving up, published version unchanged"
                    );
                    return Err(e.into());
                }
            }
        }
    }

    fn validate_ref(&self, graph_ref: &GraphRef) -> Result<(), RegistryError> {
        if !valid_service_name(&graph_ref.graph) || !valid_service_name(&graph_ref.variant) {
            return Err(RegistryError::InvalidGraphRef(graph_ref.to_string()));
        }
        Ok(())
    }

    fn graph_entry(&self, graph: &str) -> Arc<GraphEntry> {
        Arc::clone(self.graphs.entry(graph.to_string()).or_default().value())
    }

    fn existing_variant(&self, graph_ref: &GraphRef) -> Option<Arc<VariantState>> {
        self.graphs
            .get(&graph_ref.graph)?
            .variants
            .get(&graph_ref.variant)
            .map(|v| Arc::clone(v.value()))
    }
}

impl GraphEntry {
    fn is_retired(&self, service: &str) -> bool {
        self.retired
            .read()
            .expect("retired-name lock poisoned")
            .contains(service)
    }

    fn retire(&self, service: &str) {
        self.retired
            .write()
            .expect("retired-name lock poisoned")
            .insert(service.to_string());
    }

    fn variant_state(&self, variant: &str) -> Arc<VariantState> {
        Arc::clone(self.variants.entry(variant.to_string()).or_default().value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composition::{NullCorpus, StructuralComposer};
    use crate::distribution::MemoryStore;

    const ACCOUNTS: &str = "type Query { me: User }\ntype User { id: ID! name: String }";
    const REVIEWS: &str = "type Review { body: String! }\nextend type User { reviews: [Review!] }";
    const BROKEN_REVIEWS: &str = "extend type Product { reviews: Int }";

    fn test_registry() -> (Registry, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let registry = Registry::new(
            Arc::new(StructuralComposer),
            Arc::new(NullCorpus),
            store.clone(),
            "test-credential",
            PublishConfig {
                max_attempts: 2,
                base_delay_ms: 5,
                max_delay_ms: 10,
            },
        );
        (registry, store)
    }

    fn push_req(service: &str, schema: &str) -> PushRequest {
        PushRequest {
            service: service.into(),
            routing_url: format!("http://{service}.internal:4000/graphql"),
            schema: schema.into(),
        }
    }

    fn graph_ref() -> GraphRef {
        GraphRef::new("shop", "production")
    }

    #[tokio::test]
    async fn test_first_push_publishes_version_one() {
        let (registry, store) = test_registry();
        let outcome = registry.push(&graph_ref(), push_req("accounts", ACCOUNTS)).await.unwrap();

        assert!(matches!(outcome, PushOutcome::Published { version: 1, .. }));
        assert_eq!(registry.active_version(&graph_ref()).await, Some(1));

        let key = registry.storage_key(&graph_ref());
        let pointer = store.head(&key).await.unwrap().unwrap();
        assert_eq!(pointer.version, 1);
    }

    #[tokio::test]
    async fn test_failed_composition_retains_upsert_and_version() {
        let (registry, store) = test_registry();
        registry.push(&graph_ref(), push_req("accounts", ACCOUNTS)).await.unwrap();

        let outcome = registry
            .push(&graph_ref(), push_req("reviews", BROKEN_REVIEWS))
            .await
            .unwrap();
        match outcome {
            PushOutcome::CompositionFailed { errors, active_version } => {
                assert!(!errors.is_empty());
                assert_eq!(active_version, Some(1));
            }
            other => panic!("expected composition failure, got {other:?}"),
        }

        // Registry lists both services, configuration still at version 1.
        let names: Vec<_> = registry
            .list(&graph_ref())
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["accounts", "reviews"]);
        assert_eq!(registry.active_version(&graph_ref()).await, Some(1));

        let key = registry.storage_key(&graph_ref());
        assert_eq!(store.head(&key).await.unwrap().unwrap().version, 1);
    }

    #[tokio::test]
    async fn test_corrected_push_publishes_version_two() {
        let (registry, _) = test_registry();
        registry.push(&graph_ref(), push_req("accounts", ACCOUNTS)).await.unwrap();
        registry.push(&graph_ref(), push_req("reviews", BROKEN_REVIEWS)).await.unwrap();

        let outcome = registry.push(&graph_ref(), push_req("reviews", REVIEWS)).await.unwrap();
        assert!(matches!(outcome, PushOutcome::Published { version: 2, .. }));

        let published = registry.published(&graph_ref()).await.unwrap();
        assert_eq!(published.services.len(), 2);
        assert!(published.schema.has_field("User", "reviews"));
    }

    #[tokio::test]
    async fn test_check_mutates_nothing() {
        let (registry, store) = test_registry();
        registry.push(&graph_ref(), push_req("accounts", ACCOUNTS)).await.unwrap();

        let outcome = registry
            .check(
                &graph_ref(),
                CheckRequest { service: "reviews".into(), schema: BROKEN_REVIEWS.into() },
            )
            .await
            .unwrap();
        assert!(matches!(outcome, CheckOutcome::CompositionFailed { .. }));

        let names: Vec<_> = registry
            .list(&graph_ref())
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["accounts"]);
        assert_eq!(registry.active_version(&graph_ref()).await, Some(1));

        let key = registry.storage_key(&graph_ref());
        assert_eq!(store.head(&key).await.unwrap().unwrap().version, 1);
    }

    #[tokio::test]
    async fn test_deleted_name_cannot_be_reused() {
        let (registry, _) = test_registry();
        registry.push(&graph_ref(), push_req("accounts", ACCOUNTS)).await.unwrap();
        registry.push(&graph_ref(), push_req("reviews", REVIEWS)).await.unwrap();

        let outcome = registry.delete(&graph_ref(), "reviews").await.unwrap();
        assert!(matches!(outcome, DeleteOutcome::Published { version: 3, .. }));

        let err = registry
            .push(&graph_ref(), push_req("reviews", REVIEWS))
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::NameRetired(name) if name == "reviews"));
    }

    #[tokio::test]
    async fn test_retired_names_apply_across_variants_of_a_graph() {
        let (registry, _) = test_registry();
        let canary = GraphRef::new("shop", "canary");
        registry.push(&graph_ref(), push_req("accounts", ACCOUNTS)).await.unwrap();
        registry.delete(&graph_ref(), "accounts").await.unwrap();

        let err = registry.push(&canary, push_req("accounts", ACCOUNTS)).await.unwrap_err();
        assert!(matches!(err, RegistryError::NameRetired(_)));
    }

    #[tokio::test]
    async fn test_delete_unknown_service() {
        let (registry, _) = test_registry();
        let err = registry.delete(&graph_ref(), "ghost").await.unwrap_err();
        assert!(matches!(err, RegistryError::UnknownService { .. }));
    }

    #[tokio::test]
    async fn test_deleting_last_service_keeps_configuration() {
        let (registry, _) = test_registry();
        registry.push(&graph_ref(), push_req("accounts", ACCOUNTS)).await.unwrap();

        let outcome = registry.delete(&graph_ref(), "accounts").await.unwrap();
        assert!(matches!(outcome, DeleteOutcome::Emptied { active_version: Some(1) }));
        assert_eq!(registry.active_version(&graph_ref()).await, Some(1));
    }

    #[tokio::test]
    async fn test_malformed_schema_rejected_before_mutation() {
        let (registry, _) = test_registry();
        let err = registry
            .push(&graph_ref(), push_req("accounts", "type Query {"))
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::MalformedSchema { .. }));
        assert!(registry.list(&graph_ref()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_routing_url_rejected() {
        let (registry, _) = test_registry();
        let err = registry
            .push(
                &graph_ref(),
                PushRequest {
                    service: "accounts".into(),
                    routing_url: "not a url".into(),
                    schema: ACCOUNTS.into(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::InvalidRoutingUrl { .. }));
        assert!(registry.list(&graph_ref()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_store_retains_upsert_without_advancing_version() {
        let (registry, store) = test_registry();
        registry.push(&graph_ref(), push_req("accounts", ACCOUNTS)).await.unwrap();

        store.set_offline(true);
        let err = registry
            .push(&graph_ref(), push_req("reviews", REVIEWS))
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::Distribution(_)));

        // Upsert retained, published version unchanged.
        assert_eq!(registry.list(&graph_ref()).await.unwrap().len(), 2);
        assert_eq!(registry.active_version(&graph_ref()).await, Some(1));

        // Store back: the next push publishes version 2.
        store.set_offline(false);
        let outcome = registry.push(&graph_ref(), push_req("reviews", REVIEWS)).await.unwrap();
        assert!(matches!(outcome, PushOutcome::Published { version: 2, .. }));
    }

    #[tokio::test]
    async fn test_variants_are_independent() {
        let (registry, _) = test_registry();
        let canary = GraphRef::new("shop", "canary");

        registry.push(&graph_ref(), push_req("accounts", ACCOUNTS)).await.unwrap();
        assert_eq!(registry.active_version(&graph_ref()).await, Some(1));
        assert_eq!(registry.active_version(&canary).await, None);
        assert!(registry.list(&canary).await.unwrap().is_empty());
    }
}
