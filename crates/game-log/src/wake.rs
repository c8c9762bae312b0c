//! Filesystem change hints that wake the poll loop early.

use std::ffi::OsString;
use std::path::Path;
use std::sync::Arc;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::Notify;

/// Watches a file's parent directory and signals on events for that file.
///
/// Purely an optimisation: the tail loop still polls on its interval, so a
/// missed or spurious hint changes latency, never output.
pub(crate) struct WakeHint {
    _watcher: RecommendedWatcher,
    signal: Arc<Notify>,
}

impl WakeHint {
    /// Starts watching, or returns `None` when the platform watcher or the
    /// parent directory is unavailable.
    pub(crate) fn watch(path: &Path) -> Option<Self> {
        let dir = path.parent()?;
        let name: OsString = path.file_name()?.to_os_string();

        let signal = Arc::new(Notify::new());
        let signal2 = Arc::clone(&signal);

        let mut watcher = match notify::recommended_watcher(
            move |res: notify::Result<notify::Event>| {
                let Ok(event) = res else {
                    return;
                };
                if event
                    .paths
                    .iter()
                    .any(|p| p.file_name() == Some(name.as_os_str()))
                {
                    signal2.notify_one();
                }
            },
        ) {
            Ok(w) => w,
            Err(e) => {
                tracing::debug!(error = %e, "file watcher unavailable, polling only");
                return None;
            }
        };

        if let Err(e) = watcher.watch(dir, RecursiveMode::NonRecursive) {
            tracing::debug!(dir = %dir.display(), error = %e, "cannot watch log directory, polling only");
            return None;
        }

        Some(Self {
            _watcher: watcher,
            signal,
        })
    }

    /// Completes on the next change hint.
    pub(crate) async fn notified(&self) {
        self.signal.notified().await;
    }
}
