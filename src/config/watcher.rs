//! Configuration file watcher for hot reload.
//!
//! # Responsibilities
//! - Notice edits to the config file, including atomic rename-over saves
//! - Coalesce bursts of filesystem events into a single reload
//! - Hand validated configurations to the server
//!
//! # Design Decisions
//! - The parent directory is watched and events are filtered by file name,
//!   so rename-over saves keep reloading
//! - Invalid files are logged and skipped; the running config stays
//! - Stops once the server side of the channel is gone

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::ProxyConfig;

/// Quiet period that ends a burst of events.
pub const DEBOUNCE: Duration = Duration::from_millis(250);

/// Directory entry Kubernetes swaps when a mounted ConfigMap changes.
const CONFIGMAP_DATA_LINK: &str = "..data";

/// A watcher that monitors the configuration file for changes.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<ProxyConfig>,
}

impl ConfigWatcher {
    /// Returns the watcher and a receiver for validated configuration updates.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<ProxyConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        (
            Self {
                path: path.to_path_buf(),
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching. Must be called inside a Tokio runtime.
    ///
    /// The returned watcher must be kept alive for as long as updates are wanted.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let dir = watch_dir(&self.path);
        let file_name = self
            .path
            .file_name()
            .map(OsStr::to_os_string)
            .unwrap_or_default();

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if is_relevant(&event, &file_name) => {
                    // Fails only after the reload task stopped.
                    let _ = event_tx.send(());
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = %e, "Config watch error"),
            },
            Config::default(),
        )?;
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        tokio::spawn(forward_reloads(self.path.clone(), event_rx, self.update_tx));

        tracing::info!(path = ?self.path, dir = ?dir, "Config watcher started");
        Ok(watcher)
    }
}

fn watch_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// True when `event` may have changed the contents behind `file_name`.
fn is_relevant(event: &Event, file_name: &OsString) -> bool {
    if !(event.kind.is_modify() || event.kind.is_create() || event.kind.is_remove()) {
        return false;
    }
    event.paths.iter().any(|p| {
        p.file_name()
            .is_some_and(|name| name == file_name.as_os_str() || name == CONFIGMAP_DATA_LINK)
    })
}

/// Wait for the first event, then until `quiet` passes without another.
/// Returns false once the event source is closed.
async fn debounce(events: &mut mpsc::UnboundedReceiver<()>, quiet: Duration) -> bool {
    if events.recv().await.is_none() {
        return false;
    }
    loop {
        match tokio::time::timeout(quiet, events.recv()).await {
            Ok(Some(())) => continue,
            Ok(None) | Err(_) => return true,
        }
    }
}

/// Reload `path` after each burst of events and pass valid configs on.
async fn forward_reloads(
    path: PathBuf,
    mut events: mpsc::UnboundedReceiver<()>,
    updates: mpsc::UnboundedSender<ProxyConfig>,
) {
    while debounce(&mut events, DEBOUNCE).await {
        match load_config(&path) {
            Ok(config) => {
                tracing::info!(path = ?path, "Config file changed, reloading");
                if updates.send(config).is_err() {
                    tracing::debug!("Config receiver closed, stopping watcher");
                    return;
                }
            }
            Err(e) => {
                tracing::error!(path = ?path, error = %e, "Failed to reload config, keeping current configuration");
            }
        }
    }
}
