use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::RecursiveMode;
use notify_debouncer_mini::{new_debouncer, DebounceEventResult, Debouncer};
use tokio::sync::mpsc;

use crate::core::errors::{Error, Result};

/// Reports directories whose contents changed, debounced.
///
/// Each message holds the distinct parent directories of the changed paths,
/// which is what a directory listing needs to decide whether to relist.
pub struct DirectoryWatcher {
    root: PathBuf,
    // Keep debouncer alive
    _debouncer: Debouncer<notify::RecommendedWatcher>,
}

impl DirectoryWatcher {
    pub fn new(root: PathBuf, tx: mpsc::Sender<Vec<PathBuf>>, timeout: Duration) -> Result<Self> {
        let mut debouncer = new_debouncer(timeout, move |res: DebounceEventResult| match res {
            Ok(events) => {
                let dirs = changed_directories(events.into_iter().map(|e| e.path));
                // Runs on the notify thread, so a blocking send is fine.
                if let Err(e) = tx.blocking_send(dirs) {
                    tracing::warn!("failed to send watcher events: {}", e);
                }
            }
            Err(e) => {
                tracing::warn!("watcher error: {:?}", e);
            }
        })
        .map_err(|e| Error::Other(format!("cannot create watcher: {e}")))?;

        debouncer
            .watcher()
            .watch(&root, RecursiveMode::NonRecursive)
            .map_err(|e| Error::Other(format!("cannot watch {}: {e}", root.display())))?;

        Ok(Self {
            root,
            _debouncer: debouncer,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

fn changed_directories(paths: impl Iterator<Item = PathBuf>) -> Vec<PathBuf> {
    paths
        .filter_map(|p| p.parent().map(Path::to_path_buf))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
