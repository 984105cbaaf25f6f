//! Storage backends a pane can browse.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::rc::{Rc, Weak};
use std::sync::Arc;

use tracing::{debug, info};

use crate::core::errors::{Error, Result};
use crate::models::collation::CasePolicy;
use crate::models::file_entry::FileEntry;
use crate::services::fs::local::LocalVfs;
use crate::services::fs::provider::VfsProvider;

pub const HOME_CONNECTION_ID: &str = "home";

pub struct Connection {
    id: String,
    alias: String,
    provider: Arc<dyn VfsProvider>,
    base_path: PathBuf,
    open: Cell<bool>,
    case_policy: Cell<CasePolicy>,
    dir_cache: RefCell<HashMap<PathBuf, Weak<FileEntry>>>,
}

impl Connection {
    pub fn new(
        id: impl Into<String>,
        alias: impl Into<String>,
        provider: Arc<dyn VfsProvider>,
        base_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            id: id.into(),
            alias: alias.into(),
            provider,
            base_path: base_path.into(),
            open: Cell::new(false),
            case_policy: Cell::new(CasePolicy::default()),
            dir_cache: RefCell::new(HashMap::new()),
        }
    }

    /// The always-open local connection rooted at `home`.
    pub fn home(home: impl Into<PathBuf>) -> Self {
        let conn = Self::new(HOME_CONNECTION_ID, "Home", Arc::new(LocalVfs::new()), home);
        conn.open.set(true);
        conn
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn provider(&self) -> &Arc<dyn VfsProvider> {
        &self.provider
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn is_local(&self) -> bool {
        self.provider.is_local()
    }

    pub fn is_open(&self) -> bool {
        self.open.get()
    }

    pub fn open(&self) {
        if !self.open.replace(true) {
            info!(id = %self.id, provider = self.provider.name(), "connection opened");
        }
    }

    pub fn close(&self) {
        if self.open.replace(false) {
            self.dir_cache.borrow_mut().clear();
            info!(id = %self.id, "connection closed");
        }
    }

    pub fn set_case_policy(&self, policy: CasePolicy) {
        self.case_policy.set(policy);
    }

    /// Absolute, lexically normalized form of `path` on this connection.
    pub fn absolute(&self, path: &Path) -> PathBuf {
        normalize(&self.base_path.join(path))
    }

    /// Returns the directory entry for `path`. While any handle to it is
    /// alive, the same entry is returned for the same path, including
    /// entries created by listing the parent directory.
    pub fn resolve_directory(&self, path: &Path) -> Result<Rc<FileEntry>> {
        let entry = self.resolve(path)?;
        if !entry.is_dir() {
            return Err(Error::NotADirectory(entry.path()));
        }
        Ok(entry)
    }

    pub fn resolve(&self, path: &Path) -> Result<Rc<FileEntry>> {
        if !self.is_open() {
            return Err(Error::ConnectionClosed(self.id.clone()));
        }
        let path = self.absolute(path);
        let info = self.provider.stat(&path)?;
        if let Some(entry) = self.cached(&path).filter(|e| e.is_dir() == info.is_dir()) {
            return Ok(entry);
        }

        let entry = FileEntry::create(info, path.clone(), None, self.case_policy.get());
        entry.set_local(self.is_local());
        if entry.is_dir() {
            self.register(&entry);
        }
        debug!(id = %self.id, path = %path.display(), "path resolved");
        Ok(entry)
    }

    /// Lists `dir` through this connection. Child directories that are
    /// already alive are adopted instead of duplicated.
    pub fn relist(&self, dir: &Rc<FileEntry>) -> Result<()> {
        dir.relist_with(self.provider.as_ref(), |path| self.cached(path))?;
        for child in dir.children().iter().filter(|c| c.is_dir()) {
            self.register(child);
        }
        Ok(())
    }

    pub fn ensure_listed(&self, dir: &Rc<FileEntry>) -> Result<()> {
        if dir.is_listed() {
            return Ok(());
        }
        self.relist(dir)
    }

    /// Live directory entry currently located at `path`. Entries renamed
    /// since they were cached are found under their new path only.
    fn cached(&self, path: &Path) -> Option<Rc<FileEntry>> {
        let mut cache = self.dir_cache.borrow_mut();
        if let Some(entry) = cache.get(path).and_then(Weak::upgrade) {
            if entry.path() == path {
                return Some(entry);
            }
            cache.insert(entry.path(), Rc::downgrade(&entry));
        }
        cache.remove(path);
        let moved = cache
            .values()
            .filter_map(Weak::upgrade)
            .find(|e| e.path() == path)?;
        cache.insert(path.to_path_buf(), Rc::downgrade(&moved));
        Some(moved)
    }

    fn register(&self, entry: &Rc<FileEntry>) {
        let mut cache = self.dir_cache.borrow_mut();
        cache.retain(|_, weak| weak.strong_count() > 0);
        cache.insert(entry.path(), Rc::downgrade(entry));
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("alias", &self.alias)
            .field("provider", &self.provider.name())
            .field("open", &self.open.get())
            .finish()
    }
}

/// Resolves `.` and `..` components without touching the filesystem.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if out.parent().is_some() {
                    out.pop();
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    if out.as_os_str().is_empty() {
        out.push("/");
    }
    out
}

/// All known connections; the home connection is always first.
pub struct ConnectionList {
    connections: Vec<Rc<Connection>>,
}

impl ConnectionList {
    pub fn new(home: Connection) -> Self {
        Self {
            connections: vec![Rc::new(home)],
        }
    }

    pub fn home(&self) -> &Rc<Connection> {
        &self.connections[0]
    }

    pub fn add(&mut self, connection: Connection) -> Result<Rc<Connection>> {
        if self.get(connection.id()).is_some() {
            return Err(Error::InvalidArgument(format!(
                "duplicate connection id '{}'",
                connection.id()
            )));
        }
        let connection = Rc::new(connection);
        self.connections.push(connection.clone());
        Ok(connection)
    }

    pub fn get(&self, id: &str) -> Option<&Rc<Connection>> {
        self.connections.iter().find(|c| c.id() == id)
    }

    /// Removes a connection. The home connection cannot be removed.
    pub fn remove(&mut self, id: &str) -> Option<Rc<Connection>> {
        if id == HOME_CONNECTION_ID {
            return None;
        }
        let index = self.connections.iter().position(|c| c.id() == id)?;
        let connection = self.connections.remove(index);
        connection.close();
        Some(connection)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rc<Connection>> {
        self.connections.iter()
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::fs::memory::InMemoryVfs;

    fn memory_connection() -> Connection {
        let vfs = InMemoryVfs::default();
        vfs.add_file("/srv/a.txt", 1).add_dir("/srv/sub");
        Connection::new("mem", "Memory", Arc::new(vfs), "/")
    }

    #[test]
    fn normalizes_lexically() {
        assert_eq!(normalize(Path::new("/a/b/../c/./d")), PathBuf::from("/a/c/d"));
        assert_eq!(normalize(Path::new("/..")), PathBuf::from("/"));
    }

    #[test]
    fn closed_connections_refuse_to_resolve() {
        let conn = memory_connection();
        assert!(matches!(
            conn.resolve_directory(Path::new("/srv")),
            Err(Error::ConnectionClosed(_))
        ));
        conn.open();
        assert!(conn.resolve_directory(Path::new("/srv")).is_ok());
    }

    #[test]
    fn live_directories_resolve_to_the_same_entry() {
        let conn = memory_connection();
        conn.open();
        let first = conn.resolve_directory(Path::new("/srv")).unwrap();
        let second = conn.resolve_directory(Path::new("/srv/sub/..")).unwrap();
        assert!(Rc::ptr_eq(&first, &second));

        let weak = Rc::downgrade(&first);
        drop(first);
        drop(second);
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn listed_children_share_identity_with_resolved_directories() {
        let vfs = Arc::new(InMemoryVfs::default());
        vfs.add_dir("/srv/sub").add_dir("/srv/other");
        let conn = Connection::new("mem", "Memory", vfs, "/");
        conn.open();
        let srv = conn.resolve_directory(Path::new("/srv")).unwrap();
        let resolved_first = conn.resolve_directory(Path::new("/srv/sub")).unwrap();
        conn.relist(&srv).unwrap();

        let listed = srv.child("sub").unwrap();
        assert!(Rc::ptr_eq(&listed, &resolved_first));
        assert_eq!(listed.parent().map(|p| p.path()), Some(PathBuf::from("/srv")));

        let other = srv.child("other").unwrap();
        let resolved_later = conn.resolve_directory(Path::new("/srv/other")).unwrap();
        assert!(Rc::ptr_eq(&other, &resolved_later));
    }

    #[test]
    fn renamed_directories_leave_their_old_path() {
        let conn = memory_connection();
        conn.open();
        let sub = conn.resolve_directory(Path::new("/srv/sub")).unwrap();
        sub.rename(conn.provider().as_ref(), "moved").unwrap();

        assert!(matches!(
            conn.resolve_directory(Path::new("/srv/sub")),
            Err(Error::Vfs(_))
        ));
        let moved = conn.resolve_directory(Path::new("/srv/moved")).unwrap();
        assert!(Rc::ptr_eq(&sub, &moved));
    }

    #[test]
    fn files_are_not_directories() {
        let conn = memory_connection();
        conn.open();
        assert!(matches!(
            conn.resolve_directory(Path::new("/srv/a.txt")),
            Err(Error::NotADirectory(_))
        ));
    }

    #[test]
    fn home_connection_cannot_be_removed() {
        let mut list = ConnectionList::new(Connection::home("/"));
        list.add(memory_connection()).unwrap();
        assert!(list.add(memory_connection()).is_err());
        assert!(list.remove(HOME_CONNECTION_ID).is_none());
        assert!(list.remove("mem").is_some());
        assert_eq!(list.len(), 1);
    }
}
