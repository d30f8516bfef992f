//! Configuration file watcher for hot reload.
//!
//! # Design Decisions
//! - The parent directory is watched, not the file: editors that save by
//!   writing a temp file and renaming it would otherwise detach the watch
//! - Events for other files in the directory are ignored
//! - Only configurations that parse and validate are forwarded; the route
//!   table performs its own checks when the update is applied

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::GatewayConfig;
use crate::observability::metrics;

pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<GatewayConfig>,
}

impl ConfigWatcher {
    /// Create a watcher that publishes on an existing update channel.
    pub fn new(path: &Path, update_tx: mpsc::UnboundedSender<GatewayConfig>) -> Self {
        Self {
            path: path.to_path_buf(),
            update_tx,
        }
    }

    /// Start watching in a background thread.
    ///
    /// The returned watcher must be kept alive for notifications to flow.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let path = self.path.clone();
        let tx = self.update_tx;

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if touches(&event, &path) => {
                    tracing::info!(path = %path.display(), "Config file change detected, reloading");
                    match load_config(&path) {
                        Ok(config) => {
                            let _ = tx.send(config);
                        }
                        Err(e) => {
                            metrics::record_reload("failure");
                            tracing::error!(error = %e, "Failed to reload config. Keeping current route table.");
                        }
                    }
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = %e, "Config watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        tracing::info!(path = %self.path.display(), "Config watcher started");
        Ok(watcher)
    }
}

/// Whether `event` writes or replaces the watched file.
fn touches(event: &Event, path: &Path) -> bool {
    if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
        return false;
    }
    let Some(name) = path.file_name() else {
        return false;
    };
    event.paths.iter().any(|p| p.file_name() == Some(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, ModifyKind, RemoveKind};

    fn event(kind: EventKind, path: &str) -> Event {
        Event::new(kind).add_path(PathBuf::from(path))
    }

    #[test]
    fn reacts_to_writes_of_the_config_file() {
        let path = Path::new("/etc/gateway/gateway.Production.toml");
        assert!(touches(
            &event(EventKind::Modify(ModifyKind::Any), "/etc/gateway/gateway.Production.toml"),
            path
        ));
        assert!(touches(
            &event(EventKind::Create(CreateKind::File), "/etc/gateway/gateway.Production.toml"),
            path
        ));
    }

    #[test]
    fn ignores_other_files_and_removals() {
        let path = Path::new("/etc/gateway/gateway.Production.toml");
        assert!(!touches(
            &event(EventKind::Modify(ModifyKind::Any), "/etc/gateway/gateway.Development.toml"),
            path
        ));
        assert!(!touches(
            &event(EventKind::Remove(RemoveKind::File), "/etc/gateway/gateway.Production.toml"),
            path
        ));
    }
}
