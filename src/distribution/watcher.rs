//! Pointer-file watcher for file-backed stores.
//!
//! Polling alone preserves convergence at any interval; the watcher only
//! nudges the reconciler to poll ahead of its next tick when the pointer
//! record changes on a shared filesystem.

use std::path::PathBuf;
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::distribution::file::{FileStore, POINTER_FILE};
use crate::distribution::key::StorageKey;

/// Watches one (graph, variant) pointer record and emits a nudge whenever
/// it is created or rewritten.
pub struct PointerWatcher {
    dir: PathBuf,
    nudge_tx: mpsc::UnboundedSender<()>,
}

impl PointerWatcher {
    /// Create a watcher for `key` within `store`.
    ///
    /// Returns the watcher and the nudge receiver the reconciler selects on.
    pub fn new(store: &FileStore, key: &StorageKey) -> (Self, mpsc::UnboundedReceiver<()>) {
        let (nudge_tx, nudge_rx) = mpsc::unbounded_channel();
        let dir = store
            .pointer_path(key)
            .parent()
            .map(PathBuf::from)
            .unwrap_or_default();
        (Self { dir, nudge_tx }, nudge_rx)
    }

    /// Start watching in a background thread.
    ///
    /// The variant directory is watched (not the pointer file itself) so the
    /// watch survives the pointer not existing yet and the tmp+rename dance.
    /// The returned watcher must be kept alive.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        std::fs::create_dir_all(&self.dir).map_err(|e| notify::Error::io(e))?;

        let tx = self.nudge_tx.clone();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    let pointer_touched = event
                        .paths
                        .iter()
                        .any(|p| p.file_name().is_some_and(|n| n == POINTER_FILE));
                    if pointer_touched && (event.kind.is_modify() || event.kind.is_create()) {
                        tracing::debug!("pointer record changed, nudging reconciler");
                        let _ = tx.send(());
                    }
                }
                Err(e) => tracing::error!(error = ?e, "pointer watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.dir, RecursiveMode::NonRecursive)?;
        tracing::info!(dir = ?self.dir, "pointer watcher started");
        Ok(watcher)
    }
}
