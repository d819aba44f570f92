//! Registry Server
//!
//! The registry/composer process: accepts partial schema submissions over
//! HTTP, gates publication on successful composition, and writes snapshots
//! to the distribution store for gateways to pick up.
//!
//! # Architecture Overview
//!
//! ```text
//!   registry-cli ──HTTP──▶ ┌──────────────────────────────────────┐
//!                          │            REGISTRY SERVER            │
//!                          │                                       │
//!                          │  api (axum) ──▶ registry ──▶ composer │
//!                          │                     │                 │
//!                          │                     ▼                 │
//!                          │             distribution store        │
//!                          └──────────────────────────────────────┘
//!                                               ▲
//!                         graph-gateway ────────┘ (head/fetch)
//! ```

use std::path::Path;
use std::sync::Arc;

use tokio::net::TcpListener;

use graph_registry::api::RegistryServer;
use graph_registry::composition::{NullCorpus, StructuralComposer};
use graph_registry::config::{load_registry_config, RegistryConfig, StorageBackend};
use graph_registry::distribution::{file, FileStore, MemoryStore, SnapshotStore};
use graph_registry::lifecycle::{wait_for_signal, Shutdown};
use graph_registry::observability::{init_logging, init_metrics};
use graph_registry::registry::Registry;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = match std::env::args().nth(1) {
        Some(path) => load_registry_config(Path::new(&path))?,
        None => RegistryConfig::default(),
    };

    init_logging(&config.observability.log_filter);
    tracing::info!(
        bind_address = %config.listener.bind_address,
        storage_backend = ?config.storage.backend,
        "configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "failed to parse metrics address"
            ),
        }
    }

    let store: Arc<dyn SnapshotStore> = match config.storage.backend {
        StorageBackend::File => {
            file::ensure_root(&config.storage.root).await?;
            Arc::new(FileStore::new(&config.storage.root))
        }
        StorageBackend::Memory => {
            tracing::warn!("memory store selected: snapshots are not visible to other processes");
            Arc::new(MemoryStore::new())
        }
    };

    let registry = Arc::new(Registry::new(
        Arc::new(StructuralComposer),
        Arc::new(NullCorpus),
        store,
        config.auth.api_key.clone(),
        config.publish.clone(),
    ));

    let listener = TcpListener::bind(&config.listener.bind_address).await?;

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        wait_for_signal().await;
        shutdown.trigger();
    });

    let server = RegistryServer::new(&config, registry);
    server.run(listener, server_shutdown).await?;

    tracing::info!("shutdown complete");
    Ok(())
}
