//! Shared fixtures for integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use graph_registry::composition::{OperationCorpus, StructuralComposer};
use graph_registry::config::PublishConfig;
use graph_registry::distribution::MemoryStore;
use graph_registry::registry::{GraphRef, PushRequest, Registry};

/// Credential shared by the test registry and its gateways.
pub const CREDENTIAL: &str = "integration-test-key";

pub const ACCOUNTS_SDL: &str = r#"
type Query {
  me: User
}

type User {
  id: ID!
  name: String
}
"#;

pub const REVIEWS_SDL: &str = r#"
type Review {
  body: String!
}

extend type User {
  reviews: [Review!]
}
"#;

/// Extends a type no service defines; cannot compose with accounts.
pub const BROKEN_REVIEWS_SDL: &str = r#"
extend type Product {
  reviews: Int
}
"#;

/// Accounts schema with `User.name` removed.
pub const ACCOUNTS_WITHOUT_NAME_SDL: &str = r#"
type Query {
  me: User
}

type User {
  id: ID!
}
"#;

pub fn graph_ref() -> GraphRef {
    GraphRef::new("shop", "production")
}

pub fn push_req(service: &str, schema: &str) -> PushRequest {
    PushRequest {
        service: service.into(),
        routing_url: format!("http://{service}.internal:4000/graphql"),
        schema: schema.into(),
    }
}

/// Registry over a shared in-memory store, with fast publish retries.
pub fn registry_with_store(corpus: Arc<dyn OperationCorpus>) -> (Arc<Registry>, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let registry = Registry::new(
        Arc::new(StructuralComposer),
        corpus,
        store.clone(),
        CREDENTIAL,
        PublishConfig {
            max_attempts: 2,
            base_delay_ms: 5,
            max_delay_ms: 10,
        },
    );
    (Arc::new(registry), store)
}
