//! Directory side of [`FileEntry`]: owned children and change events.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tracing::debug;

use crate::models::file_entry::FileEntry;
use crate::models::metadata::FileMetadata;
use crate::services::fs::provider::{VfsError, VfsProvider, VfsResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryEvent {
    FileCreated(PathBuf),
    FileDeleted(PathBuf),
    FileChanged(PathBuf),
    FileRenamed { old_path: PathBuf, new_path: PathBuf },
    /// The directory itself moved; descendants were re-pathed.
    PathUpdated(PathBuf),
    Relisted,
}

#[derive(Default)]
pub struct DirectoryNode {
    children: RefCell<Vec<Rc<FileEntry>>>,
    listed: Cell<bool>,
    events: RefCell<VecDeque<DirectoryEvent>>,
}

/// Oldest events are dropped once this many are waiting.
pub const MAX_QUEUED_EVENTS: usize = 256;

impl DirectoryNode {
    fn push(&self, event: DirectoryEvent) {
        let mut events = self.events.borrow_mut();
        if events.len() >= MAX_QUEUED_EVENTS {
            events.pop_front();
        }
        events.push_back(event);
    }
}

impl FileEntry {
    fn dir_node(&self) -> Option<&DirectoryNode> {
        let node = self.directory_node();
        debug_assert!(node.is_some(), "{} is not a directory", self.path().display());
        node
    }

    /// Drops the cached tree size of this directory and every ancestor.
    fn invalidate_upwards(&self) {
        self.invalidate_tree_size();
        let mut ancestor = self.parent();
        while let Some(dir) = ancestor {
            dir.invalidate_tree_size();
            ancestor = dir.parent();
        }
    }

    pub fn is_listed(&self) -> bool {
        self.directory_node().map_or(false, |d| d.listed.get())
    }

    /// Reads the children from `provider`. Children that still exist keep
    /// their identity and get fresh metadata.
    pub fn relist(self: &Rc<Self>, provider: &dyn VfsProvider) -> VfsResult<()> {
        self.relist_with(provider, |_| None)
    }

    /// Like [`FileEntry::relist`]; a new child directory is taken from
    /// `adopt` when it returns a live entry for the child's path.
    pub(crate) fn relist_with<F>(self: &Rc<Self>, provider: &dyn VfsProvider, adopt: F) -> VfsResult<()>
    where
        F: Fn(&Path) -> Option<Rc<FileEntry>>,
    {
        let Some(dir) = self.directory_node() else {
            return Err(VfsError::NotADirectory(self.path()));
        };
        let path = self.path();
        let listing = provider.list(&path)?;

        let mut existing: HashMap<String, Rc<FileEntry>> = dir
            .children
            .borrow_mut()
            .drain(..)
            .map(|c| (c.name(), c))
            .collect();

        let children: Vec<Rc<FileEntry>> = listing
            .into_iter()
            .map(|info| match existing.remove(&info.name) {
                Some(child) if child.is_dir() == info.is_dir() => {
                    child.update_info(info);
                    child
                }
                _ => {
                    let location = path.join(&info.name);
                    let live = info
                        .is_dir()
                        .then(|| adopt(&location))
                        .flatten()
                        .filter(|e| e.is_dir() && !Rc::ptr_eq(e, self));
                    match live {
                        Some(entry) => {
                            entry.update_info(info);
                            entry.set_parent(Rc::downgrade(self));
                            entry.set_local(self.is_local());
                            entry
                        }
                        None => FileEntry::create(info, location, Some(self), self.case_policy()),
                    }
                }
            })
            .collect();

        debug!(path = %path.display(), count = children.len(), "directory listed");
        *dir.children.borrow_mut() = children;
        dir.listed.set(true);
        self.invalidate_tree_size();
        dir.push(DirectoryEvent::Relisted);
        Ok(())
    }

    pub fn children(&self) -> Vec<Rc<FileEntry>> {
        self.directory_node()
            .map(|d| d.children.borrow().clone())
            .unwrap_or_default()
    }

    pub fn child(&self, name: &str) -> Option<Rc<FileEntry>> {
        self.directory_node()?
            .children
            .borrow()
            .iter()
            .find(|c| c.info().name == name)
            .cloned()
    }

    pub fn file_created(self: &Rc<Self>, info: FileMetadata) -> Option<Rc<FileEntry>> {
        let dir = self.dir_node()?;
        let location = self.path().join(&info.name);
        let entry = match self.child(&info.name) {
            Some(existing) => {
                existing.update_info(info);
                existing
            }
            None => {
                let entry = FileEntry::create(info, location.clone(), Some(self), self.case_policy());
                dir.children.borrow_mut().push(entry.clone());
                entry
            }
        };
        self.invalidate_upwards();
        dir.push(DirectoryEvent::FileCreated(location));
        Some(entry)
    }

    pub fn file_deleted(&self, path: &Path) {
        let Some(dir) = self.dir_node() else {
            return;
        };
        dir.children.borrow_mut().retain(|c| c.path() != path);
        self.invalidate_upwards();
        dir.push(DirectoryEvent::FileDeleted(path.to_path_buf()));
    }

    pub fn file_changed(&self, path: &Path) {
        let Some(dir) = self.dir_node() else {
            return;
        };
        self.invalidate_upwards();
        dir.push(DirectoryEvent::FileChanged(path.to_path_buf()));
    }

    pub fn file_renamed(&self, old_path: &Path, new_path: &Path) {
        let Some(dir) = self.dir_node() else {
            return;
        };
        dir.push(DirectoryEvent::FileRenamed {
            old_path: old_path.to_path_buf(),
            new_path: new_path.to_path_buf(),
        });
    }

    /// Rewrites the paths of all descendants below `new_path`.
    pub fn update_path(&self, new_path: &Path) {
        let Some(dir) = self.dir_node() else {
            return;
        };
        self.set_location(new_path.to_path_buf());
        for child in dir.children.borrow().iter() {
            let child_path = new_path.join(child.info().name.as_str());
            if child.is_dir() {
                child.update_path(&child_path);
            } else {
                child.set_location(child_path);
            }
        }
        dir.push(DirectoryEvent::PathUpdated(new_path.to_path_buf()));
    }

    pub fn drain_events(&self) -> Vec<DirectoryEvent> {
        self.directory_node()
            .map(|d| d.events.borrow_mut().drain(..).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::collation::CasePolicy;
    use crate::models::metadata::FileType;
    use crate::services::fs::memory::InMemoryVfs;

    fn root(vfs: &InMemoryVfs) -> Rc<FileEntry> {
        FileEntry::create(
            vfs.stat(Path::new("/data")).unwrap(),
            "/data",
            None,
            CasePolicy::Insensitive,
        )
    }

    fn vfs() -> InMemoryVfs {
        let vfs = InMemoryVfs::default();
        vfs.add_file("/data/a.txt", 10)
            .add_file("/data/sub/b.txt", 20)
            .add_file("/data/sub/deeper/c.txt", 30);
        vfs
    }

    #[test]
    fn relist_keeps_identity_of_surviving_children() {
        let vfs = vfs();
        let dir = root(&vfs);
        dir.relist(&vfs).unwrap();
        let a = dir.child("a.txt").unwrap();
        assert_eq!(a.parent().map(|p| p.path()), Some(PathBuf::from("/data")));

        vfs.add_file("/data/a.txt", 11);
        vfs.add_file("/data/new.txt", 1);
        dir.relist(&vfs).unwrap();

        let again = dir.child("a.txt").unwrap();
        assert!(Rc::ptr_eq(&a, &again));
        assert_eq!(again.info().size, 11);
        assert_eq!(dir.children().len(), 3);
    }

    #[test]
    fn renaming_a_directory_repaths_descendants() {
        let vfs = vfs();
        let dir = root(&vfs);
        dir.relist(&vfs).unwrap();
        let sub = dir.child("sub").unwrap();
        sub.relist(&vfs).unwrap();
        let deeper = sub.child("deeper").unwrap();
        deeper.relist(&vfs).unwrap();
        let c = deeper.child("c.txt").unwrap();
        dir.drain_events();
        sub.drain_events();

        sub.rename(&vfs, "renamed").unwrap();

        assert_eq!(c.path(), PathBuf::from("/data/renamed/deeper/c.txt"));
        assert!(vfs.exists(c.path()));
        assert_eq!(
            dir.drain_events(),
            vec![DirectoryEvent::FileRenamed {
                old_path: PathBuf::from("/data/sub"),
                new_path: PathBuf::from("/data/renamed"),
            }]
        );
        assert_eq!(
            sub.drain_events(),
            vec![DirectoryEvent::PathUpdated(PathBuf::from("/data/renamed"))]
        );
    }

    #[test]
    fn changes_invalidate_ancestor_sizes() {
        let vfs = vfs();
        let dir = root(&vfs);
        dir.relist(&vfs).unwrap();
        let sub = dir.child("sub").unwrap();
        sub.relist(&vfs).unwrap();
        assert_eq!(dir.get_tree_size(&vfs), 60);
        assert_eq!(sub.get_tree_size(&vfs), 50);

        let created = sub
            .file_created(FileMetadata::new("x", FileType::Regular).with_size(5))
            .unwrap();
        assert!(!dir.has_tree_size());
        assert!(!sub.has_tree_size());
        assert_eq!(created.path(), PathBuf::from("/data/sub/x"));

        created.mark_deleted();
        assert!(sub.child("x").is_none());
        assert!(matches!(
            sub.drain_events().last(),
            Some(DirectoryEvent::FileDeleted(_))
        ));
    }

    #[test]
    fn event_queue_is_bounded() {
        let vfs = vfs();
        let dir = root(&vfs);
        for _ in 0..MAX_QUEUED_EVENTS + 10 {
            dir.relist(&vfs).unwrap();
        }
        dir.file_changed(Path::new("/data/a.txt"));

        let events = dir.drain_events();
        assert_eq!(events.len(), MAX_QUEUED_EVENTS);
        assert_eq!(
            events.last(),
            Some(&DirectoryEvent::FileChanged(PathBuf::from("/data/a.txt")))
        );
        assert!(dir.drain_events().is_empty());
    }

    #[test]
    fn listing_a_file_is_an_error() {
        let vfs = vfs();
        let file = FileEntry::create(
            vfs.stat(Path::new("/data/a.txt")).unwrap(),
            "/data/a.txt",
            None,
            CasePolicy::Insensitive,
        );
        assert!(matches!(file.relist(&vfs), Err(VfsError::NotADirectory(_))));
        assert!(file.children().is_empty());
    }
}
