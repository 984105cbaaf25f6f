//! Provider for the local filesystem.

use std::fs;
use std::path::Path;
use std::time::UNIX_EPOCH;

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::models::metadata::{guess_mime_type, FileMetadata, FileType};
use crate::services::fs::provider::{
    validate_file_name, CancellationToken, DiskUsage, VfsError, VfsProvider, VfsResult,
};

#[derive(Debug, Clone, Default)]
pub struct LocalVfs;

impl LocalVfs {
    pub fn new() -> Self {
        Self
    }
}

fn seconds(time: std::io::Result<std::time::SystemTime>) -> i64 {
    time.ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

fn metadata_from(name: String, path: &Path, md: &fs::Metadata) -> FileMetadata {
    let ft = md.file_type();
    let file_type = if ft.is_symlink() {
        FileType::Symlink
    } else if ft.is_dir() {
        FileType::Directory
    } else if ft.is_file() {
        FileType::Regular
    } else {
        FileType::Special
    };

    let mut meta = FileMetadata::new(name, file_type);
    meta.size = if file_type == FileType::Regular { md.len() } else { 0 };
    meta.accessed = seconds(md.accessed());
    meta.modified = seconds(md.modified());
    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        meta.permissions = md.mode() & 0o7777;
        meta.uid = md.uid();
        meta.gid = md.gid();
    }
    #[cfg(not(unix))]
    {
        meta.permissions = if md.permissions().readonly() { 0o444 } else { 0o644 };
    }
    if file_type == FileType::Symlink {
        meta.symlink_target = fs::read_link(path)
            .ok()
            .map(|t| t.to_string_lossy().into_owned());
    }
    meta.mime_type = guess_mime_type(&meta.name, file_type);
    meta
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

impl VfsProvider for LocalVfs {
    fn name(&self) -> &str {
        "Local"
    }

    fn is_local(&self) -> bool {
        true
    }

    fn stat(&self, path: &Path) -> VfsResult<FileMetadata> {
        let md = fs::symlink_metadata(path).map_err(|e| VfsError::from_io(path, e))?;
        Ok(metadata_from(file_name_of(path), path, &md))
    }

    fn list(&self, path: &Path) -> VfsResult<Vec<FileMetadata>> {
        let read_dir = fs::read_dir(path).map_err(|e| match e.raw_os_error() {
            Some(20) => VfsError::NotADirectory(path.to_path_buf()),
            _ => VfsError::from_io(path, e),
        })?;
        let mut entries = Vec::new();
        for entry in read_dir {
            let entry = entry.map_err(|e| VfsError::from_io(path, e))?;
            let child = entry.path();
            match fs::symlink_metadata(&child) {
                Ok(md) => entries.push(metadata_from(
                    entry.file_name().to_string_lossy().into_owned(),
                    &child,
                    &md,
                )),
                // Removed between readdir and stat.
                Err(err) => debug!(path = %child.display(), error = %err, "skipping entry"),
            }
        }
        Ok(entries)
    }

    fn rename(&self, path: &Path, new_name: &str) -> VfsResult<FileMetadata> {
        validate_file_name(new_name)?;
        let target = path
            .parent()
            .ok_or_else(|| VfsError::InvalidName(new_name.to_string()))?
            .join(new_name);
        if target != path && fs::symlink_metadata(&target).is_ok() {
            return Err(VfsError::AlreadyExists(target));
        }
        fs::rename(path, &target).map_err(|e| VfsError::from_io(path, e))?;
        self.stat(&target)
    }

    #[cfg(unix)]
    fn set_permissions(&self, path: &Path, permissions: u32) -> VfsResult<()> {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(permissions & 0o7777))
            .map_err(|e| VfsError::from_io(path, e))
    }

    #[cfg(not(unix))]
    fn set_permissions(&self, _path: &Path, _permissions: u32) -> VfsResult<()> {
        Err(VfsError::NotSupported)
    }

    #[cfg(unix)]
    fn set_owner(&self, path: &Path, uid: Option<u32>, gid: u32) -> VfsResult<()> {
        std::os::unix::fs::lchown(path, uid, Some(gid)).map_err(|e| VfsError::from_io(path, e))
    }

    #[cfg(not(unix))]
    fn set_owner(&self, _path: &Path, _uid: Option<u32>, _gid: u32) -> VfsResult<()> {
        Err(VfsError::NotSupported)
    }

    #[cfg(unix)]
    fn create_symlink(&self, link: &Path, target: &Path) -> VfsResult<()> {
        std::os::unix::fs::symlink(target, link).map_err(|e| VfsError::from_io(link, e))
    }

    fn measure_disk_usage(&self, path: &Path, cancel: &CancellationToken) -> VfsResult<DiskUsage> {
        fs::symlink_metadata(path).map_err(|e| VfsError::from_io(path, e))?;

        let mut usage = DiskUsage::default();
        for entry in WalkDir::new(path).follow_links(false).min_depth(1) {
            if cancel.is_cancelled() {
                usage.interrupted = Some(VfsError::Cancelled);
                break;
            }
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    let failed = err.path().unwrap_or(path).to_path_buf();
                    warn!(path = %failed.display(), error = %err, "disk usage walk stopped");
                    usage.interrupted = Some(match err.into_io_error() {
                        Some(io) => VfsError::from_io(failed, io),
                        None => VfsError::Io {
                            path: failed,
                            kind: std::io::ErrorKind::Other,
                            code: None,
                            message: "filesystem loop".to_string(),
                        },
                    });
                    break;
                }
            };
            let ft = entry.file_type();
            if ft.is_dir() {
                usage.directories += 1;
            } else if ft.is_file() {
                usage.files += 1;
                match entry.metadata() {
                    Ok(md) => usage.bytes += md.len(),
                    Err(err) => debug!(path = %entry.path().display(), error = %err, "no size"),
                }
            }
        }
        Ok(usage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_and_measures_a_tree() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("a.txt"), b"hello").unwrap();
        fs::write(dir.path().join("sub/b.bin"), vec![0u8; 100]).unwrap();

        let vfs = LocalVfs::new();
        let mut names: Vec<String> = vfs
            .list(dir.path())
            .unwrap()
            .into_iter()
            .map(|m| m.name)
            .collect();
        names.sort();
        assert_eq!(names, vec!["a.txt", "sub"]);

        let usage = vfs
            .measure_disk_usage(dir.path(), &CancellationToken::new())
            .unwrap();
        assert_eq!(usage.bytes, 105);
        assert_eq!(usage.files, 2);
        assert_eq!(usage.directories, 1);
        assert!(usage.interrupted.is_none());
    }

    #[test]
    fn cancelled_walk_reports_interruption() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a"), b"x").unwrap();
        let token = CancellationToken::new();
        token.cancel();
        let usage = LocalVfs.measure_disk_usage(dir.path(), &token).unwrap();
        assert_eq!(usage.interrupted, Some(VfsError::Cancelled));
        assert_eq!(usage.bytes, 0);
    }

    #[test]
    fn rename_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a");
        fs::write(&a, b"1").unwrap();
        fs::write(dir.path().join("b"), b"2").unwrap();

        let err = LocalVfs.rename(&a, "b").unwrap_err();
        assert!(matches!(err, VfsError::AlreadyExists(_)));

        let renamed = LocalVfs.rename(&a, "c").unwrap();
        assert_eq!(renamed.name, "c");
        assert!(dir.path().join("c").exists());
    }

    #[test]
    fn missing_paths_map_to_not_found() {
        let err = LocalVfs.stat(Path::new("/definitely/not/here")).unwrap_err();
        assert!(matches!(err, VfsError::NotFound(_)));
    }

    #[cfg(unix)]
    #[test]
    fn chmod_updates_mode_bits() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("f");
        fs::write(&file, b"").unwrap();
        LocalVfs.set_permissions(&file, 0o600).unwrap();
        assert_eq!(LocalVfs.stat(&file).unwrap().permissions, 0o600);
    }
}
