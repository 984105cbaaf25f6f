//! One filesystem object with cached derived attributes.
//!
//! Entries are shared through `Rc<FileEntry>`. A directory owns its children
//! strongly; a child only keeps a `Weak` link back to its directory. Rename,
//! chmod and chown mutate the entry in place so every outstanding handle,
//! weak ones included, keeps pointing at the same object.

use std::cell::{Cell, Ref, RefCell};
use std::path::{Path, PathBuf};
use std::rc::{Rc, Weak};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::core::config::types::{PermissionDisplayMode, SizeDisplayMode};
use crate::core::format::{permissions_to_string, size_to_string, time_to_string};
use crate::models::collation::{CasePolicy, CollationKey};
use crate::models::directory::DirectoryNode;
use crate::models::metadata::{FileMetadata, FileType};
use crate::services::fs::owners::{group_name, owner_name};
use crate::services::fs::provider::{CancellationToken, VfsError, VfsProvider, VfsResult};

pub const DIR_INDICATOR: &str = "<DIR> ";

pub enum FileNode {
    File,
    Directory(DirectoryNode),
}

pub struct FileEntry {
    info: RefCell<FileMetadata>,
    collate_key: RefCell<CollationKey>,
    case_policy: Cell<CasePolicy>,
    location: RefCell<PathBuf>,
    parent: RefCell<Weak<FileEntry>>,
    node: FileNode,
    is_dotdot: bool,
    local: Cell<bool>,
    tree_size: Cell<Option<u64>>,
    last_update: Cell<Option<Instant>>,
}

impl FileEntry {
    fn build(
        info: FileMetadata,
        location: PathBuf,
        parent: Weak<FileEntry>,
        policy: CasePolicy,
        is_dotdot: bool,
    ) -> Rc<Self> {
        let node = if info.is_dir() {
            FileNode::Directory(DirectoryNode::default())
        } else {
            FileNode::File
        };
        let local = parent.upgrade().map_or(false, |p| p.is_local());
        Rc::new(Self {
            collate_key: RefCell::new(CollationKey::for_filename(&info.name, policy)),
            info: RefCell::new(info),
            case_policy: Cell::new(policy),
            location: RefCell::new(location),
            parent: RefCell::new(parent),
            node,
            is_dotdot,
            local: Cell::new(local),
            tree_size: Cell::new(None),
            last_update: Cell::new(None),
        })
    }

    /// New entry for `info` located at `location`. The returned handle is the
    /// only strong reference; `parent` is linked weakly.
    pub fn create(
        info: FileMetadata,
        location: impl Into<PathBuf>,
        parent: Option<&Rc<FileEntry>>,
        policy: CasePolicy,
    ) -> Rc<Self> {
        let parent = parent.map(Rc::downgrade).unwrap_or_default();
        Self::build(info, location.into(), parent, policy, false)
    }

    /// Synthetic ".." entry that navigates from `dir` to its parent.
    pub fn dotdot(dir: &Rc<FileEntry>) -> Rc<Self> {
        let dir_path = dir.path();
        let target = dir_path.parent().unwrap_or(&dir_path).to_path_buf();
        let mut info = FileMetadata::new("..", FileType::Directory);
        info.modified = dir.info().modified;
        info.permissions = dir.info().permissions;
        Self::build(info, target, Rc::downgrade(dir), dir.case_policy(), true)
    }

    /// Another strong handle to the same entry.
    pub fn retain(self: &Rc<Self>) -> Rc<Self> {
        Rc::clone(self)
    }

    /// Gives up one strong handle. The entry is destroyed with its last handle.
    pub fn release(self: Rc<Self>) {
        drop(self);
    }

    pub fn ref_count(self: &Rc<Self>) -> usize {
        Rc::strong_count(self)
    }

    pub fn info(&self) -> Ref<'_, FileMetadata> {
        self.info.borrow()
    }

    pub fn name(&self) -> String {
        self.info.borrow().name.clone()
    }

    pub fn path(&self) -> PathBuf {
        self.location.borrow().clone()
    }

    pub fn collate_key(&self) -> Ref<'_, CollationKey> {
        self.collate_key.borrow()
    }

    pub fn case_policy(&self) -> CasePolicy {
        self.case_policy.get()
    }

    /// Recomputes the collation key, e.g. after the case sensitivity option changed.
    pub fn set_case_policy(&self, policy: CasePolicy) {
        self.case_policy.set(policy);
        self.update_collate_key();
    }

    fn update_collate_key(&self) {
        let key = CollationKey::for_filename(&self.info.borrow().name, self.case_policy.get());
        *self.collate_key.borrow_mut() = key;
    }

    pub fn node(&self) -> &FileNode {
        &self.node
    }

    pub(crate) fn directory_node(&self) -> Option<&DirectoryNode> {
        match &self.node {
            FileNode::Directory(dir) => Some(dir),
            FileNode::File => None,
        }
    }

    pub fn parent(&self) -> Option<Rc<FileEntry>> {
        self.parent.borrow().upgrade()
    }

    pub fn has_parent(&self) -> bool {
        self.parent().is_some()
    }

    pub(crate) fn set_parent(&self, parent: Weak<FileEntry>) {
        *self.parent.borrow_mut() = parent;
    }

    pub(crate) fn set_location(&self, location: PathBuf) {
        *self.location.borrow_mut() = location;
    }

    pub fn is_dotdot(&self) -> bool {
        self.is_dotdot
    }

    pub fn is_dir(&self) -> bool {
        self.info.borrow().is_dir()
    }

    pub fn is_local(&self) -> bool {
        self.local.get()
    }

    pub fn set_local(&self, local: bool) {
        self.local.set(local);
    }

    /// Replaces the metadata snapshot, keeping identity.
    pub fn update_info(&self, info: FileMetadata) {
        *self.info.borrow_mut() = info;
        self.update_collate_key();
    }

    pub fn rename(&self, provider: &dyn VfsProvider, new_name: &str) -> VfsResult<()> {
        if self.is_dotdot {
            return Err(VfsError::InvalidName("..".to_string()));
        }
        let old_path = self.path();
        let info = provider.rename(&old_path, new_name)?;
        let new_path = match old_path.parent() {
            Some(parent) => parent.join(new_name),
            None => PathBuf::from(new_name),
        };
        debug!(from = %old_path.display(), to = %new_path.display(), "entry renamed");

        self.update_info(info);
        self.set_location(new_path.clone());
        if let Some(parent) = self.parent() {
            parent.file_renamed(&old_path, &new_path);
        }
        if self.is_dir() {
            self.update_path(&new_path);
        }
        Ok(())
    }

    pub fn chmod(&self, provider: &dyn VfsProvider, permissions: u32) -> VfsResult<()> {
        provider.set_permissions(&self.path(), permissions)?;
        self.info.borrow_mut().permissions = permissions & 0o7777;
        self.notify_changed();
        Ok(())
    }

    /// `uid == None` keeps the current owner.
    pub fn chown(&self, provider: &dyn VfsProvider, uid: Option<u32>, gid: u32) -> VfsResult<()> {
        provider.set_owner(&self.path(), uid, gid)?;
        {
            let mut info = self.info.borrow_mut();
            if let Some(uid) = uid {
                info.uid = uid;
            }
            info.gid = gid;
        }
        self.notify_changed();
        Ok(())
    }

    fn notify_changed(&self) {
        if let Some(parent) = self.parent() {
            parent.file_changed(&self.path());
        }
    }

    /// Tells the owning directory this entry no longer exists.
    pub fn mark_deleted(&self) {
        if let Some(parent) = self.parent() {
            parent.file_deleted(&self.path());
        }
    }

    /// Recursive size in bytes. Directories are walked once and the result
    /// cached until [`FileEntry::invalidate_tree_size`]. An enumeration error
    /// ends the walk and the partial sum is cached.
    pub fn get_tree_size(&self, provider: &dyn VfsProvider) -> u64 {
        if !self.is_dir() {
            return self.info.borrow().size;
        }
        if self.is_dotdot {
            return 0;
        }
        if let Some(size) = self.tree_size.get() {
            return size;
        }

        let path = self.path();
        match provider.measure_disk_usage(&path, &CancellationToken::new()) {
            Ok(usage) => {
                if let Some(err) = &usage.interrupted {
                    warn!(path = %path.display(), error = %err, "tree size walk interrupted");
                }
                self.tree_size.set(Some(usage.bytes));
                usage.bytes
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "cannot compute tree size");
                0
            }
        }
    }

    pub fn invalidate_tree_size(&self) {
        self.tree_size.set(None);
    }

    pub fn has_tree_size(&self) -> bool {
        self.tree_size.get().is_some()
    }

    /// Cached recursive size, never computed here.
    pub fn tree_size(&self) -> Option<u64> {
        self.tree_size.get()
    }

    /// Stores a size computed elsewhere (background task).
    pub fn set_tree_size(&self, size: u64) {
        self.tree_size.set(Some(size));
    }

    pub fn needs_update(&self, interval: Duration) -> bool {
        self.needs_update_at(Instant::now(), interval)
    }

    /// True when more than `interval` passed since the last approved update.
    pub fn needs_update_at(&self, now: Instant, interval: Duration) -> bool {
        if let Some(last) = self.last_update.get() {
            if now.saturating_duration_since(last) <= interval {
                return false;
            }
        }
        self.last_update.set(Some(now));
        true
    }

    pub fn extension(&self) -> Option<String> {
        let info = self.info.borrow();
        if info.is_dir() {
            return None;
        }
        info.name.rsplit_once('.').map(|(_, ext)| ext.to_string())
    }

    pub fn owner(&self) -> String {
        let uid = self.info.borrow().uid;
        if self.is_local() {
            owner_name(uid)
        } else {
            uid.to_string()
        }
    }

    pub fn group(&self) -> String {
        let gid = self.info.borrow().gid;
        if self.is_local() {
            group_name(gid)
        } else {
            gid.to_string()
        }
    }

    pub fn permissions_string(&self, mode: PermissionDisplayMode) -> String {
        permissions_to_string(self.info.borrow().permissions, mode)
    }

    pub fn type_string(&self) -> &'static str {
        match self.info.borrow().file_type {
            FileType::Regular => "file",
            FileType::Directory => "directory",
            FileType::Symlink => "symlink",
            FileType::Special => "special",
            FileType::Unknown => "unknown",
        }
    }

    pub fn size_string(&self, mode: SizeDisplayMode) -> String {
        let info = self.info.borrow();
        if info.is_dir() {
            return DIR_INDICATOR.to_string();
        }
        size_to_string(info.size, mode)
    }

    /// Like [`FileEntry::size_string`] but shows the cached recursive size of
    /// directories when known.
    pub fn tree_size_string(&self, mode: SizeDisplayMode) -> String {
        match self.tree_size.get() {
            Some(size) if self.is_dir() && !self.is_dotdot => size_to_string(size, mode),
            _ => self.size_string(mode),
        }
    }

    pub fn mdate_string(&self, format: &str) -> String {
        time_to_string(self.info.borrow().modified, format)
    }

    pub fn adate_string(&self, format: &str) -> String {
        time_to_string(self.info.borrow().accessed, format)
    }

    pub fn has_mime_type(&self, mime_type: &str) -> bool {
        self.info.borrow().mime_type.as_deref() == Some(mime_type)
    }

    pub fn mime_begins_with(&self, prefix: &str) -> bool {
        self.info
            .borrow()
            .mime_type
            .as_deref()
            .map_or(false, |m| m.starts_with(prefix))
    }

    /// Whether the user `uid`/`gid` may execute this local regular file.
    pub fn is_executable(&self, uid: u32, gid: u32) -> bool {
        let info = self.info.borrow();
        if !info.is_regular() || !self.is_local() {
            return false;
        }
        (info.uid == uid && info.permissions & 0o100 != 0)
            || (info.gid == gid && info.permissions & 0o010 != 0)
            || info.permissions & 0o001 != 0
    }

    pub fn is_hidden(&self) -> bool {
        !self.is_dotdot && self.info.borrow().name.starts_with('.')
    }
}

impl Drop for FileEntry {
    fn drop(&mut self) {
        debug!(path = %self.location.get_mut().display(), "file entry destroyed");
    }
}

impl std::fmt::Debug for FileEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileEntry")
            .field("path", &*self.location.borrow())
            .field("is_dotdot", &self.is_dotdot)
            .field("tree_size", &self.tree_size.get())
            .finish()
    }
}

pub(crate) fn path_eq(a: &Path, b: &Path) -> bool {
    a.components().eq(b.components())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::fs::memory::InMemoryVfs;

    fn file(name: &str, size: u64) -> Rc<FileEntry> {
        FileEntry::create(
            FileMetadata::new(name, FileType::Regular).with_size(size),
            Path::new("/").join(name),
            None,
            CasePolicy::Insensitive,
        )
    }

    #[test]
    fn last_release_destroys_the_entry() {
        let entry = file("a.txt", 1);
        let weak = Rc::downgrade(&entry);
        let extra = entry.retain();
        assert_eq!(entry.ref_count(), 2);

        entry.release();
        assert!(weak.upgrade().is_some());
        extra.release();
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn needs_update_is_rate_limited() {
        let entry = file("a", 0);
        let start = Instant::now();
        let interval = Duration::from_millis(10);
        assert!(entry.needs_update_at(start, interval));
        assert!(!entry.needs_update_at(start + Duration::from_millis(5), interval));
        assert!(!entry.needs_update_at(start + Duration::from_millis(10), interval));
        assert!(entry.needs_update_at(start + Duration::from_millis(11), interval));
    }

    #[test]
    fn regular_files_report_their_own_size() {
        let vfs = InMemoryVfs::default();
        let entry = file("big.iso", 4096);
        assert_eq!(entry.get_tree_size(&vfs), 4096);
        assert_eq!(vfs.measure_calls(), 0);
    }

    #[test]
    fn dotdot_never_walks() {
        let vfs = InMemoryVfs::default();
        vfs.add_file("/a/b/c", 3);
        let dir = FileEntry::create(
            FileMetadata::new("b", FileType::Directory),
            "/a/b",
            None,
            CasePolicy::Insensitive,
        );
        let up = FileEntry::dotdot(&dir);
        assert!(up.is_dotdot());
        assert_eq!(up.path(), PathBuf::from("/a"));
        assert_eq!(up.get_tree_size(&vfs), 0);
        assert_eq!(vfs.measure_calls(), 0);
        assert!(!dir.is_dotdot());
    }

    #[test]
    fn helpers_render_metadata() {
        let entry = FileEntry::create(
            FileMetadata::new("archive.tar.gz", FileType::Regular)
                .with_size(2048)
                .with_permissions(0o750)
                .with_owner(1000, 100),
            "/tmp/archive.tar.gz",
            None,
            CasePolicy::Insensitive,
        );
        assert_eq!(entry.extension().as_deref(), Some("gz"));
        assert_eq!(entry.owner(), "1000");
        assert_eq!(entry.group(), "100");
        assert_eq!(entry.permissions_string(PermissionDisplayMode::Text), "rwxr-x---");
        assert_eq!(entry.size_string(SizeDisplayMode::Plain), "2048");
        assert_eq!(entry.type_string(), "file");
        assert!(!entry.is_executable(1000, 100));
        entry.set_local(true);
        assert!(entry.is_executable(1000, 100));
        assert!(!entry.is_executable(1, 1));
    }

    #[test]
    fn directories_show_dir_indicator() {
        let dir = FileEntry::create(
            FileMetadata::new("src", FileType::Directory),
            "/src",
            None,
            CasePolicy::Insensitive,
        );
        assert_eq!(dir.extension(), None);
        assert_eq!(dir.size_string(SizeDisplayMode::Powered), DIR_INDICATOR);
        dir.set_tree_size(2048);
        assert_eq!(dir.tree_size_string(SizeDisplayMode::Powered), "2.0 kB");
    }
}
