use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex, PoisonError, RwLock},
};

use log::{debug, info, warn};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::watch;

use crate::error::{AppError, Result};

use super::{
    loader::{load_dashboard_config, load_or_builtin},
    DashboardConfig,
};

/// Holds the active dashboard config, with optional hot reload from disk.
pub struct ConfigRegistry {
    path: Option<PathBuf>,
    state: RwLock<Arc<DashboardConfig>>,
    updates_tx: watch::Sender<Arc<DashboardConfig>>,
    watcher: Mutex<Option<RecommendedWatcher>>,
}

impl ConfigRegistry {
    /// Resolve the config file (or fall back to built-in defaults) and load it.
    pub fn new(explicit: Option<&Path>) -> Result<Self> {
        let (config, path) = load_or_builtin(explicit)?;
        Ok(Self::from_config(config, path))
    }

    pub fn from_config(config: DashboardConfig, path: Option<PathBuf>) -> Self {
        let current = Arc::new(config);
        let (updates_tx, _) = watch::channel(current.clone());

        Self {
            path,
            state: RwLock::new(current),
            updates_tx,
            watcher: Mutex::new(None),
        }
    }

    pub fn current(&self) -> Arc<DashboardConfig> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Subscribe to config updates. The receiver immediately yields the latest config.
    pub fn subscribe(&self) -> watch::Receiver<Arc<DashboardConfig>> {
        self.updates_tx.subscribe()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Reload from disk and broadcast when the config changed.
    ///
    /// Returns whether a new config was published.
    pub fn refresh(&self) -> Result<bool> {
        let Some(path) = self.path.as_deref() else {
            return Ok(false);
        };

        let config = Arc::new(load_dashboard_config(path)?);
        {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            if **state == *config {
                return Ok(false);
            }
            *state = config.clone();
        }

        info!("dashboard config reloaded from {}", path.display());
        let _ = self.updates_tx.send(config);
        Ok(true)
    }

    /// Begin watching the config file's directory. Multiple invocations are no-ops.
    pub fn start_watching(self: &Arc<Self>) -> Result<()> {
        let mut guard = self.watcher.lock().unwrap_or_else(PoisonError::into_inner);
        if guard.is_some() {
            return Ok(());
        }

        let Some(path) = self.path.clone() else {
            debug!("no config file to watch, running on built-in defaults");
            return Ok(());
        };
        let watch_dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let file_name = path.file_name().map(|name| name.to_os_string());

        let registry = Arc::clone(self);
        let mut watcher =
            notify::recommended_watcher(move |res: notify::Result<notify::Event>| match res {
                Ok(event) if is_relevant_event(&event.kind) => {
                    let touches_config = event.paths.is_empty()
                        || event
                            .paths
                            .iter()
                            .any(|changed| changed.file_name() == file_name.as_deref());
                    if !touches_config {
                        return;
                    }
                    if let Err(err) = registry.refresh() {
                        warn!("Failed to reload dashboard config: {err}");
                    }
                }
                Ok(_) => {}
                Err(err) => warn!("Dashboard config watch error: {err}"),
            })
            .map_err(|err| AppError::message(format!("Failed to start watcher: {err}")))?;

        watcher
            .watch(&watch_dir, RecursiveMode::NonRecursive)
            .map_err(|err| AppError::message(format!("Failed to watch config directory: {err}")))?;
        *guard = Some(watcher);
        Ok(())
    }
}

fn is_relevant_event(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Any | EventKind::Other
    )
}
