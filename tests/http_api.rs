//! End-to-end tests of the registry HTTP surface.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use graph_registry::api::RegistryServer;
use graph_registry::composition::NullCorpus;
use graph_registry::config::RegistryConfig;
use graph_registry::lifecycle::Shutdown;
use serde_json::{json, Value};

mod common;
use common::{registry_with_store, ACCOUNTS_SDL, BROKEN_REVIEWS_SDL, REVIEWS_SDL, CREDENTIAL};

async fn spawn_server(addr: SocketAddr) -> Shutdown {
    let mut config = RegistryConfig::default();
    config.listener.bind_address = addr.to_string();
    config.auth.api_key = CREDENTIAL.to_string();

    let (registry, _) = registry_with_store(Arc::new(NullCorpus));
    let server = RegistryServer::new(&config, registry);

    let shutdown = Shutdown::new();
    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });
    tokio::time::sleep(Duration::from_millis(100)).await;
    shutdown
}

fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

fn bearer() -> String {
    format!("Bearer {CREDENTIAL}")
}

#[tokio::test]
async fn test_push_list_delete_over_http() {
    let addr: SocketAddr = "127.0.0.1:28411".parse().unwrap();
    let _shutdown = spawn_server(addr).await;
    let client = client();

    // Push accounts: published as version 1.
    let res = client
        .post(format!("http://{addr}/api/graphs/shop/production/push"))
        .header("Authorization", bearer())
        .json(&json!({
            "service": "accounts",
            "routing_url": "http://accounts.internal:4000/graphql",
            "schema": ACCOUNTS_SDL,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["outcome"], "published");
    assert_eq!(body["version"], 1);

    // Failing push returns the error list but still registers the service.
    let res = client
        .post(format!("http://{addr}/api/graphs/shop/production/push"))
        .header("Authorization", bearer())
        .json(&json!({
            "service": "reviews",
            "routing_url": "http://reviews.internal:4000/graphql",
            "schema": BROKEN_REVIEWS_SDL,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["outcome"], "composition_failed");
    assert_eq!(body["active_version"], 1);
    assert!(!body["errors"].as_array().unwrap().is_empty());

    // List shows both services in name order.
    let res = client
        .get(format!("http://{addr}/api/graphs/shop/production/services"))
        .header("Authorization", bearer())
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    let names: Vec<_> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["accounts", "reviews"]);

    // Delete reviews, then reuse of the name is a 409.
    let res = client
        .delete(format!("http://{addr}/api/graphs/shop/production/services/reviews"))
        .header("Authorization", bearer())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);

    let res = client
        .post(format!("http://{addr}/api/graphs/shop/production/push"))
        .header("Authorization", bearer())
        .json(&json!({
            "service": "reviews",
            "routing_url": "http://reviews.internal:4000/graphql",
            "schema": REVIEWS_SDL,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 409);
}

#[tokio::test]
async fn test_check_endpoint_reports_composition_errors() {
    let addr: SocketAddr = "127.0.0.1:28412".parse().unwrap();
    let _shutdown = spawn_server(addr).await;
    let client = client();

    let res = client
        .post(format!("http://{addr}/api/graphs/shop/production/push"))
        .header("Authorization", bearer())
        .json(&json!({
            "service": "accounts",
            "routing_url": "http://accounts.internal:4000/graphql",
            "schema": ACCOUNTS_SDL,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);

    let res = client
        .post(format!("http://{addr}/api/graphs/shop/production/check"))
        .header("Authorization", bearer())
        .json(&json!({ "service": "reviews", "schema": BROKEN_REVIEWS_SDL }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["outcome"], "composition_failed");

    // Check mutated nothing.
    let res = client
        .get(format!("http://{addr}/api/graphs/shop/production/services"))
        .header("Authorization", bearer())
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_auth_and_input_rejections() {
    let addr: SocketAddr = "127.0.0.1:28413".parse().unwrap();
    let _shutdown = spawn_server(addr).await;
    let client = client();

    // Missing credential.
    let res = client
        .get(format!("http://{addr}/api/graphs/shop/production/services"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 401);

    // Wrong credential.
    let res = client
        .get(format!("http://{addr}/api/graphs/shop/production/services"))
        .header("Authorization", "Bearer wrong-key")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 401);

    // Malformed schema is a 422 and never lands in the registry.
    let res = client
        .post(format!("http://{addr}/api/graphs/shop/production/push"))
        .header("Authorization", bearer())
        .json(&json!({
            "service": "accounts",
            "routing_url": "http://accounts.internal:4000/graphql",
            "schema": "type Query {",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 422);

    // Deleting an unknown service is a 404.
    let res = client
        .delete(format!("http://{addr}/api/graphs/shop/production/services/ghost"))
        .header("Authorization", bearer())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 404);

    // Status endpoint needs no credential.
    let res = client.get(format!("http://{addr}/status")).send().await.unwrap();
    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "operational");
}
