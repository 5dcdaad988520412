//! Configuration file watcher for hot reload.
//!
//! Only configurations that load, validate and differ from the last one
//! delivered are forwarded. Editors that save with several writes would
//! otherwise trigger a burst of identical reloads.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::ProxyConfig;

/// Watches one configuration file and streams validated updates.
pub struct ConfigWatcher {
    path: PathBuf,
    current: ProxyConfig,
    update_tx: mpsc::UnboundedSender<ProxyConfig>,
}

impl ConfigWatcher {
    /// Create a watcher for `path`, seeded with the configuration as last
    /// loaded from that file. Pass the file's contents, not a config with
    /// command-line overrides applied, or an untouched save reads as a change.
    ///
    /// Returns the watcher and a receiver for configuration updates.
    pub fn new(
        path: &Path,
        current: ProxyConfig,
    ) -> (Self, mpsc::UnboundedReceiver<ProxyConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let watcher = Self {
            path: path.to_path_buf(),
            current,
            update_tx,
        };
        (watcher, update_rx)
    }

    /// Re-read the file and deliver it if it loads, validates and differs
    /// from the last delivered configuration. Returns whether it was delivered.
    fn reload(&mut self) -> bool {
        match load_config(&self.path) {
            Ok(config) if config == self.current => {
                tracing::debug!(path = ?self.path, "Config file touched without changes");
                false
            }
            Ok(config) => {
                tracing::info!(path = ?self.path, "Config file changed, applying");
                self.current = config.clone();
                self.update_tx.send(config).is_ok()
            }
            Err(e) => {
                tracing::error!(path = ?self.path, error = %e, "Rejected config reload, keeping current configuration");
                false
            }
        }
    }

    /// Start watching. The returned handle stops the watch when dropped.
    pub fn run(mut self) -> Result<RecommendedWatcher, notify::Error> {
        let watched = self.path.clone();

        let handler = move |res: notify::Result<Event>| match res {
            Ok(event) if event.kind.is_modify() || event.kind.is_create() => {
                self.reload();
            }
            Ok(_) => {}
            Err(e) => tracing::error!(error = ?e, "Config watch error"),
        };

        let mut watcher = RecommendedWatcher::new(
            handler,
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;
        watcher.watch(&watched, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?watched, "Config watcher started");
        Ok(watcher)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const ORIGIN_A: &str = "[backend]\norigin = \"http://127.0.0.1:8001\"\n";
    const ORIGIN_B: &str = "[backend]\norigin = \"http://10.0.0.7:8001\"\n";

    fn write(file: &tempfile::NamedTempFile, contents: &str) {
        let mut handle = file.reopen().unwrap();
        handle.set_len(0).unwrap();
        handle.write_all(contents.as_bytes()).unwrap();
    }

    fn watcher_for(contents: &str) -> (tempfile::NamedTempFile, ConfigWatcher, mpsc::UnboundedReceiver<ProxyConfig>) {
        let file = tempfile::NamedTempFile::new().unwrap();
        write(&file, contents);
        let loaded = load_config(file.path()).unwrap();
        let (watcher, rx) = ConfigWatcher::new(file.path(), loaded);
        (file, watcher, rx)
    }

    #[test]
    fn test_unchanged_rewrite_is_not_delivered() {
        let (file, mut watcher, mut rx) = watcher_for(ORIGIN_A);

        write(&file, ORIGIN_A);
        assert!(!watcher.reload());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_changed_file_is_delivered_once() {
        let (file, mut watcher, mut rx) = watcher_for(ORIGIN_A);

        write(&file, ORIGIN_B);
        assert!(watcher.reload());
        assert_eq!(rx.try_recv().unwrap().backend.origin, "http://10.0.0.7:8001");

        // A second event for the same save.
        assert!(!watcher.reload());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_invalid_file_is_rejected() {
        let (file, mut watcher, mut rx) = watcher_for(ORIGIN_A);

        write(&file, "[backend\norigin = ");
        assert!(!watcher.reload());
        write(&file, "[backend]\norigin = \"ftp://files.example.com\"\n");
        assert!(!watcher.reload());
        assert!(rx.try_recv().is_err());

        // Still compares against the last good config.
        write(&file, ORIGIN_A);
        assert!(!watcher.reload());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_watch_delivers_file_change() {
        let (file, watcher, mut rx) = watcher_for(ORIGIN_A);
        let _handle = watcher.run().unwrap();

        write(&file, ORIGIN_B);
        let update = tokio::time::timeout(Duration::from_secs(10), rx.recv())
            .await
            .expect("no reload within 10s")
            .unwrap();
        assert_eq!(update.backend.origin, "http://10.0.0.7:8001");
    }
}
