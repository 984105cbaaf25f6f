//! Background recursive size computation.
//!
//! The walk runs on the blocking pool; the result comes back over an mpsc
//! channel so the single threaded owner of the entries can apply it with
//! `FileEntry::set_tree_size`.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::services::fs::provider::{CancellationToken, DiskUsage, VfsError, VfsProvider};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeSizeUpdate {
    /// Walk finished. A partial walk still counts as done; `usage.interrupted`
    /// tells why it stopped.
    Done { path: PathBuf, usage: DiskUsage },
    Cancelled { path: PathBuf },
    Failed { path: PathBuf, error: VfsError },
}

impl TreeSizeUpdate {
    pub fn path(&self) -> &PathBuf {
        match self {
            TreeSizeUpdate::Done { path, .. }
            | TreeSizeUpdate::Cancelled { path }
            | TreeSizeUpdate::Failed { path, .. } => path,
        }
    }
}

/// Handle to a running computation. Dropping it does not cancel the walk.
pub struct TreeSizeTask {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl TreeSizeTask {
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

/// Starts measuring `path`. Must be called from within a tokio runtime.
pub fn spawn_tree_size(
    provider: Arc<dyn VfsProvider>,
    path: PathBuf,
    tx: mpsc::Sender<TreeSizeUpdate>,
) -> TreeSizeTask {
    let token = CancellationToken::new();
    let cancel = token.clone();
    let handle = tokio::task::spawn_blocking(move || {
        debug!(path = %path.display(), "tree size started");
        let update = match provider.measure_disk_usage(&path, &cancel) {
            Ok(usage) if usage.interrupted == Some(VfsError::Cancelled) => {
                TreeSizeUpdate::Cancelled { path }
            }
            Ok(usage) => {
                if let Some(err) = &usage.interrupted {
                    warn!(path = %path.display(), error = %err, "tree size is partial");
                }
                TreeSizeUpdate::Done { path, usage }
            }
            Err(error) => TreeSizeUpdate::Failed { path, error },
        };
        if tx.blocking_send(update).is_err() {
            debug!("tree size receiver dropped");
        }
    });
    TreeSizeTask { token, handle }
}
