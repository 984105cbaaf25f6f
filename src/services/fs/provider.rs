//! Filesystem provider abstraction.
//!
//! A `VfsProvider` is the only way the core touches storage. Implementations:
//! - `LocalVfs`: the local POSIX filesystem
//! - `InMemoryVfs`: an in-memory tree used as a test double
//!
//! Providers never panic across the boundary; every operation returns a
//! `VfsResult` carrying the path and the underlying error code on failure.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;

use crate::models::metadata::FileMetadata;

pub type VfsResult<T> = std::result::Result<T, VfsError>;

/// Error type for provider operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VfsError {
    #[error("path not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("permission denied: {}", .0.display())]
    PermissionDenied(PathBuf),
    #[error("already exists: {}", .0.display())]
    AlreadyExists(PathBuf),
    #[error("not a directory: {}", .0.display())]
    NotADirectory(PathBuf),
    #[error("invalid file name: {0:?}")]
    InvalidName(String),
    #[error("operation not supported")]
    NotSupported,
    #[error("operation cancelled")]
    Cancelled,
    #[error("i/o error on {}: {message}", .path.display())]
    Io {
        path: PathBuf,
        kind: io::ErrorKind,
        code: Option<i32>,
        message: String,
    },
}

impl VfsError {
    pub fn from_io(path: impl Into<PathBuf>, err: io::Error) -> Self {
        let path = path.into();
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path),
            io::ErrorKind::AlreadyExists => Self::AlreadyExists(path),
            kind => Self::Io {
                path,
                kind,
                code: err.raw_os_error(),
                message: err.to_string(),
            },
        }
    }

    /// Closest `io::ErrorKind` for this failure.
    pub fn kind(&self) -> io::ErrorKind {
        match self {
            Self::NotFound(_) => io::ErrorKind::NotFound,
            Self::PermissionDenied(_) => io::ErrorKind::PermissionDenied,
            Self::AlreadyExists(_) => io::ErrorKind::AlreadyExists,
            Self::NotADirectory(_) | Self::InvalidName(_) => io::ErrorKind::InvalidInput,
            Self::NotSupported => io::ErrorKind::Unsupported,
            Self::Cancelled => io::ErrorKind::Interrupted,
            Self::Io { kind, .. } => *kind,
        }
    }

    /// Raw OS error code when the failure came from the operating system.
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            Self::Io { code, .. } => *code,
            _ => None,
        }
    }
}

/// Result of measuring a subtree. `interrupted` is set when enumeration
/// stopped early; the counters then hold the partial sums.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiskUsage {
    pub bytes: u64,
    pub files: u64,
    pub directories: u64,
    pub interrupted: Option<VfsError>,
}

/// Cloneable cancellation flag passed to long running provider calls.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Trait for storage backends.
///
/// All paths are absolute within the provider's namespace.
pub trait VfsProvider: Send + Sync {
    /// Display name of the backend ("Local", "sftp://host", ...).
    fn name(&self) -> &str;

    /// Whether entries of this provider live on the local filesystem.
    fn is_local(&self) -> bool;

    /// Reads metadata for a single path without following a final symlink.
    fn stat(&self, path: &Path) -> VfsResult<FileMetadata>;

    /// Lists the direct children of a directory, in no particular order.
    fn list(&self, path: &Path) -> VfsResult<Vec<FileMetadata>>;

    /// Renames `path` inside its parent directory and returns the fresh metadata.
    fn rename(&self, path: &Path, new_name: &str) -> VfsResult<FileMetadata>;

    fn set_permissions(&self, path: &Path, permissions: u32) -> VfsResult<()>;

    /// Changes ownership. `uid == None` leaves the owner untouched.
    fn set_owner(&self, path: &Path, uid: Option<u32>, gid: u32) -> VfsResult<()>;

    fn create_symlink(&self, link: &Path, target: &Path) -> VfsResult<()> {
        let _ = (link, target);
        Err(VfsError::NotSupported)
    }

    /// Walks the subtree below `path` and sums regular file sizes.
    ///
    /// Enumeration problems do not fail the call: the partial result is
    /// returned with `interrupted` set. Only a missing root is an error.
    fn measure_disk_usage(&self, path: &Path, cancel: &CancellationToken) -> VfsResult<DiskUsage>;
}

/// Validates a single path component used for rename or symlink creation.
pub fn validate_file_name(name: &str) -> VfsResult<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains('/') || name.contains('\0')
    {
        return Err(VfsError::InvalidName(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_map_to_structured_variants() {
        let err = VfsError::from_io("/x", io::Error::from(io::ErrorKind::NotFound));
        assert_eq!(err, VfsError::NotFound(PathBuf::from("/x")));

        let err = VfsError::from_io("/y", io::Error::from_raw_os_error(39));
        assert!(matches!(err, VfsError::Io { .. }));
        assert_eq!(err.raw_os_error(), Some(39));
    }

    #[test]
    fn file_names_are_validated() {
        assert!(validate_file_name("ok.txt").is_ok());
        assert!(validate_file_name("").is_err());
        assert!(validate_file_name("..").is_err());
        assert!(validate_file_name("a/b").is_err());
    }

    #[test]
    fn cancellation_is_shared_between_clones() {
        let token = CancellationToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }
}
