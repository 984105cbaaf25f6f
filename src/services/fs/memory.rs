//! In-memory provider used as a test double.
//!
//! Paths are absolute; `/` always exists. Failures can be injected per path
//! to exercise error handling without a real filesystem.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use crate::models::metadata::{guess_mime_type, FileMetadata, FileType};
use crate::services::fs::provider::{
    validate_file_name, CancellationToken, DiskUsage, VfsError, VfsProvider, VfsResult,
};

pub struct InMemoryVfs {
    name: String,
    nodes: RwLock<BTreeMap<PathBuf, FileMetadata>>,
    failures: RwLock<HashMap<PathBuf, VfsError>>,
    measure_calls: AtomicUsize,
}

impl Default for InMemoryVfs {
    fn default() -> Self {
        Self::new("Memory")
    }
}

impl InMemoryVfs {
    pub fn new(name: impl Into<String>) -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(
            PathBuf::from("/"),
            FileMetadata::new("/", FileType::Directory).with_permissions(0o755),
        );
        Self {
            name: name.into(),
            nodes: RwLock::new(nodes),
            failures: RwLock::new(HashMap::new()),
            measure_calls: AtomicUsize::new(0),
        }
    }

    fn insert(&self, path: &Path, meta: FileMetadata) {
        if let Ok(mut nodes) = self.nodes.write() {
            let mut ancestor = path.parent();
            while let Some(dir) = ancestor {
                nodes.entry(dir.to_path_buf()).or_insert_with(|| {
                    FileMetadata::new(file_name(dir), FileType::Directory).with_permissions(0o755)
                });
                ancestor = dir.parent();
            }
            nodes.insert(path.to_path_buf(), meta);
        }
    }

    /// Adds a directory, creating missing ancestors.
    pub fn add_dir(&self, path: impl AsRef<Path>) -> &Self {
        let path = path.as_ref();
        self.insert(
            path,
            FileMetadata::new(file_name(path), FileType::Directory).with_permissions(0o755),
        );
        self
    }

    pub fn add_file(&self, path: impl AsRef<Path>, size: u64) -> &Self {
        let path = path.as_ref();
        let name = file_name(path);
        let mut meta = FileMetadata::new(name, FileType::Regular)
            .with_size(size)
            .with_permissions(0o644);
        meta.mime_type = guess_mime_type(&meta.name, FileType::Regular);
        self.insert(path, meta);
        self
    }

    /// Replaces the stored metadata of an existing path.
    pub fn set_metadata(&self, path: impl AsRef<Path>, meta: FileMetadata) {
        self.insert(path.as_ref(), meta);
    }

    pub fn remove(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        if let Ok(mut nodes) = self.nodes.write() {
            nodes.retain(|p, _| !p.starts_with(path));
        }
    }

    pub fn exists(&self, path: impl AsRef<Path>) -> bool {
        self.nodes
            .read()
            .map(|nodes| nodes.contains_key(path.as_ref()))
            .unwrap_or(false)
    }

    /// Every operation touching `path` fails with `error` until cleared.
    /// During a disk usage walk the failure interrupts the enumeration.
    pub fn inject_failure(&self, path: impl AsRef<Path>, error: VfsError) {
        if let Ok(mut failures) = self.failures.write() {
            failures.insert(path.as_ref().to_path_buf(), error);
        }
    }

    pub fn clear_failures(&self) {
        if let Ok(mut failures) = self.failures.write() {
            failures.clear();
        }
    }

    /// Number of `measure_disk_usage` calls so far.
    pub fn measure_calls(&self) -> usize {
        self.measure_calls.load(Ordering::SeqCst)
    }

    fn check(&self, path: &Path) -> VfsResult<()> {
        match self.failures.read() {
            Ok(failures) => match failures.get(path) {
                Some(err) => Err(err.clone()),
                None => Ok(()),
            },
            Err(_) => Ok(()),
        }
    }

    fn get(&self, path: &Path) -> VfsResult<FileMetadata> {
        self.nodes
            .read()
            .ok()
            .and_then(|nodes| nodes.get(path).cloned())
            .ok_or_else(|| VfsError::NotFound(path.to_path_buf()))
    }

    fn update(&self, path: &Path, f: impl FnOnce(&mut FileMetadata)) -> VfsResult<()> {
        self.check(path)?;
        let mut nodes = self
            .nodes
            .write()
            .map_err(|_| VfsError::NotFound(path.to_path_buf()))?;
        let meta = nodes
            .get_mut(path)
            .ok_or_else(|| VfsError::NotFound(path.to_path_buf()))?;
        f(meta);
        Ok(())
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "/".to_string())
}

impl VfsProvider for InMemoryVfs {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_local(&self) -> bool {
        false
    }

    fn stat(&self, path: &Path) -> VfsResult<FileMetadata> {
        self.check(path)?;
        self.get(path)
    }

    fn list(&self, path: &Path) -> VfsResult<Vec<FileMetadata>> {
        self.check(path)?;
        if !self.get(path)?.is_dir() {
            return Err(VfsError::NotADirectory(path.to_path_buf()));
        }
        let nodes = self
            .nodes
            .read()
            .map_err(|_| VfsError::NotFound(path.to_path_buf()))?;
        Ok(nodes
            .iter()
            .filter(|(p, _)| p.parent() == Some(path))
            .map(|(_, m)| m.clone())
            .collect())
    }

    fn rename(&self, path: &Path, new_name: &str) -> VfsResult<FileMetadata> {
        validate_file_name(new_name)?;
        self.check(path)?;
        let parent = path
            .parent()
            .ok_or_else(|| VfsError::InvalidName(new_name.to_string()))?;
        let target = parent.join(new_name);
        let mut nodes = self
            .nodes
            .write()
            .map_err(|_| VfsError::NotFound(path.to_path_buf()))?;
        if !nodes.contains_key(path) {
            return Err(VfsError::NotFound(path.to_path_buf()));
        }
        if target != path && nodes.contains_key(&target) {
            return Err(VfsError::AlreadyExists(target));
        }

        let moved: Vec<PathBuf> = nodes
            .keys()
            .filter(|p| p.starts_with(path))
            .cloned()
            .collect();
        for old in moved {
            if let Some(mut meta) = nodes.remove(&old) {
                let suffix = old.strip_prefix(path).unwrap_or(Path::new(""));
                let new_path = if suffix.as_os_str().is_empty() {
                    meta.name = new_name.to_string();
                    meta.mime_type = guess_mime_type(new_name, meta.file_type);
                    target.clone()
                } else {
                    target.join(suffix)
                };
                nodes.insert(new_path, meta);
            }
        }
        nodes
            .get(&target)
            .cloned()
            .ok_or(VfsError::NotFound(target))
    }

    fn set_permissions(&self, path: &Path, permissions: u32) -> VfsResult<()> {
        self.update(path, |m| m.permissions = permissions & 0o7777)
    }

    fn set_owner(&self, path: &Path, uid: Option<u32>, gid: u32) -> VfsResult<()> {
        self.update(path, |m| {
            if let Some(uid) = uid {
                m.uid = uid;
            }
            m.gid = gid;
        })
    }

    fn create_symlink(&self, link: &Path, target: &Path) -> VfsResult<()> {
        self.check(link)?;
        if self.exists(link) {
            return Err(VfsError::AlreadyExists(link.to_path_buf()));
        }
        let parent = link
            .parent()
            .ok_or_else(|| VfsError::InvalidName(file_name(link)))?;
        if !self.get(parent)?.is_dir() {
            return Err(VfsError::NotADirectory(parent.to_path_buf()));
        }
        let mut meta = FileMetadata::new(file_name(link), FileType::Symlink).with_permissions(0o777);
        meta.symlink_target = Some(target.to_string_lossy().into_owned());
        self.insert(link, meta);
        Ok(())
    }

    fn measure_disk_usage(&self, path: &Path, cancel: &CancellationToken) -> VfsResult<DiskUsage> {
        self.measure_calls.fetch_add(1, Ordering::SeqCst);
        self.check(path)?;
        let root = self.get(path)?;

        let mut usage = DiskUsage::default();
        if !root.is_dir() {
            usage.files = 1;
            usage.bytes = root.size;
            return Ok(usage);
        }

        let descendants: Vec<(PathBuf, FileMetadata)> = self
            .nodes
            .read()
            .map(|nodes| {
                nodes
                    .iter()
                    .filter(|(p, _)| p.starts_with(path) && p.as_path() != path)
                    .map(|(p, m)| (p.clone(), m.clone()))
                    .collect()
            })
            .unwrap_or_default();

        for (child, meta) in descendants {
            if cancel.is_cancelled() {
                usage.interrupted = Some(VfsError::Cancelled);
                break;
            }
            if let Err(err) = self.check(&child) {
                usage.interrupted = Some(err);
                break;
            }
            match meta.file_type {
                FileType::Directory => usage.directories += 1,
                FileType::Regular => {
                    usage.files += 1;
                    usage.bytes += meta.size;
                }
                _ => {}
            }
        }
        Ok(usage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> InMemoryVfs {
        let vfs = InMemoryVfs::default();
        vfs.add_file("/home/docs/a.txt", 10)
            .add_file("/home/docs/deep/b.txt", 20)
            .add_dir("/home/empty");
        vfs
    }

    #[test]
    fn lists_direct_children_only() {
        let vfs = sample();
        let mut names: Vec<String> = vfs
            .list(Path::new("/home"))
            .unwrap()
            .into_iter()
            .map(|m| m.name)
            .collect();
        names.sort();
        assert_eq!(names, vec!["docs", "empty"]);
        assert!(matches!(
            vfs.list(Path::new("/home/docs/a.txt")),
            Err(VfsError::NotADirectory(_))
        ));
    }

    #[test]
    fn rename_moves_descendants() {
        let vfs = sample();
        let meta = vfs.rename(Path::new("/home/docs"), "papers").unwrap();
        assert_eq!(meta.name, "papers");
        assert!(vfs.exists("/home/papers/deep/b.txt"));
        assert!(!vfs.exists("/home/docs"));
    }

    #[test]
    fn injected_failure_interrupts_measurement() {
        let vfs = sample();
        vfs.inject_failure(
            "/home/docs/deep",
            VfsError::PermissionDenied(PathBuf::from("/home/docs/deep")),
        );
        let usage = vfs
            .measure_disk_usage(Path::new("/home/docs"), &CancellationToken::new())
            .unwrap();
        assert_eq!(usage.bytes, 10);
        assert!(matches!(usage.interrupted, Some(VfsError::PermissionDenied(_))));
        assert_eq!(vfs.measure_calls(), 1);
    }

    #[test]
    fn symlinks_are_created_once() {
        let vfs = sample();
        let link = Path::new("/home/link to a.txt");
        vfs.create_symlink(link, Path::new("/home/docs/a.txt")).unwrap();
        assert_eq!(vfs.stat(link).unwrap().file_type, FileType::Symlink);
        assert!(matches!(
            vfs.create_symlink(link, Path::new("/x")),
            Err(VfsError::AlreadyExists(_))
        ));
    }
}
