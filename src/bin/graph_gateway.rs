//! Gateway Process
//!
//! Runs one gateway instance. In managed mode it polls the distribution
//! store for published configuration and swaps it in atomically; in static
//! mode it composes a fixed service list at boot and never reconciles.

use std::path::Path;
use std::sync::Arc;

use graph_registry::composition::StructuralComposer;
use graph_registry::config::{load_gateway_config, GatewayMode, StorageBackend};
use graph_registry::distribution::{file, FileStore, PointerWatcher, SnapshotStore, StorageKey};
use graph_registry::gateway::{
    compose_static, ActiveConfiguration, FanoutPlannerFactory, Gateway, Reconciler,
};
use graph_registry::lifecycle::{wait_for_signal, Shutdown};
use graph_registry::observability::{init_logging, init_metrics};
use graph_registry::registry::{GraphRef, ServiceDescriptor};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let Some(config_path) = std::env::args().nth(1) else {
        eprintln!("usage: graph-gateway <gateway.toml>");
        std::process::exit(2);
    };
    let config = load_gateway_config(Path::new(&config_path))?;

    init_logging(&config.observability.log_filter);

    let graph_ref = GraphRef::new(config.graph.clone(), config.variant.clone());
    tracing::info!(graph_ref = %graph_ref, mode = ?config.mode, "gateway starting");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "failed to parse metrics address"
            ),
        }
    }

    let active = Arc::new(ActiveConfiguration::empty());
    let gateway = Gateway::new(active.clone());

    let shutdown = Shutdown::new();
    let mut main_shutdown = shutdown.subscribe();
    let reconciler_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        wait_for_signal().await;
        shutdown.trigger();
    });

    match config.mode {
        GatewayMode::Static => {
            let mut services = Vec::with_capacity(config.services.len());
            for entry in &config.services {
                let sdl = match (&entry.schema, &entry.schema_path) {
                    (Some(inline), _) => inline.clone(),
                    (None, Some(path)) => tokio::fs::read_to_string(path).await?,
                    (None, None) => unreachable!("rejected by config validation"),
                };
                services.push(ServiceDescriptor {
                    name: entry.name.clone(),
                    routing_url: entry.routing_url.clone(),
                    schema_sdl: sdl,
                });
            }

            let snapshot = compose_static(&StructuralComposer, &FanoutPlannerFactory, services)?;
            active.adopt(Arc::new(snapshot));
            tracing::info!(
                graph_ref = %graph_ref,
                version = ?active.version(),
                "static configuration composed; reconciliation disabled"
            );

            let _ = main_shutdown.recv().await;
        }
        GatewayMode::Managed => {
            // Validation guarantees the file backend here; a memory store
            // could never observe another process's publishes.
            debug_assert_eq!(config.storage.backend, StorageBackend::File);
            let file_store = FileStore::new(&config.storage.root);
            file::ensure_root(&config.storage.root).await?;
            let key = StorageKey::derive(&config.auth.api_key, &config.graph, &config.variant);

            // Keep the notify handle alive for the lifetime of the loop.
            let mut _watcher_handle = None;
            let nudge = if config.poll.watch_pointer {
                let (watcher, nudge_rx) = PointerWatcher::new(&file_store, &key);
                match watcher.run() {
                    Ok(handle) => {
                        _watcher_handle = Some(handle);
                        Some(nudge_rx)
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "pointer watcher unavailable, relying on polling");
                        None
                    }
                }
            } else {
                None
            };

            let store: Arc<dyn SnapshotStore> = Arc::new(file_store);
            let reconciler = Reconciler::new(
                store,
                key,
                graph_ref.clone(),
                active.clone(),
                Arc::new(FanoutPlannerFactory),
                config.poll.clone(),
            );
            reconciler.run(reconciler_shutdown, nudge).await;
        }
    }

    // The request-serving side is the query engine's concern; log the final
    // state so operators can see what this instance was serving.
    match gateway.begin_request() {
        Ok(ctx) => tracing::info!(version = ctx.version(), "gateway stopping"),
        Err(_) => tracing::info!("gateway stopping before any configuration was adopted"),
    }
    tracing::info!("shutdown complete");
    Ok(())
}
