//! One tab's worth of directory listing: the bound directory, the visible
//! and sorted entries, and the marked subset.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tracing::debug;

use crate::core::config::data::{SharedOptions, TabState};
use crate::core::config::types::{PaneSide, SortColumn, SortOrder};
use crate::core::errors::{Error, Result};
use crate::models::{Connection, FileEntry, FileType};
use crate::ui::components::layout::footer::SelectionStats;

/// Shell-style match supporting `*` and `?`.
pub fn glob_match(pattern: &str, name: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let name: Vec<char> = name.chars().collect();

    let (mut p, mut n) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;
    while n < name.len() {
        match pattern.get(p) {
            Some('*') => {
                backtrack = Some((p, n));
                p += 1;
            }
            Some('?') => {
                p += 1;
                n += 1;
            }
            Some(c) if *c == name[n] => {
                p += 1;
                n += 1;
            }
            _ => match backtrack {
                Some((star, matched)) => {
                    p = star + 1;
                    n = matched + 1;
                    backtrack = Some((star, matched + 1));
                }
                None => return false,
            },
        }
    }
    pattern[p..].iter().all(|c| *c == '*')
}

fn file_type_key(entry: &FileEntry) -> u8 {
    if entry.is_dotdot() {
        return 0;
    }
    match entry.info().file_type {
        FileType::Special => 3,
        FileType::Symlink => 4,
        FileType::Directory => 5,
        FileType::Regular => 6,
        FileType::Unknown => 8,
    }
}

fn compare_column(a: &FileEntry, b: &FileEntry, column: SortColumn) -> Ordering {
    let by_name = || a.collate_key().cmp(&b.collate_key());
    match column {
        SortColumn::Name => by_name(),
        SortColumn::Ext => a.extension().cmp(&b.extension()).then_with(by_name),
        SortColumn::Dir => a
            .path()
            .parent()
            .cmp(&b.path().parent())
            .then_with(by_name),
        SortColumn::Size => a
            .tree_size()
            .unwrap_or(a.info().size)
            .cmp(&b.tree_size().unwrap_or(b.info().size))
            .then_with(by_name),
        SortColumn::Date => a.info().modified.cmp(&b.info().modified).then_with(by_name),
        SortColumn::Perm => a
            .info()
            .permissions
            .cmp(&b.info().permissions)
            .then_with(by_name),
        SortColumn::Owner => a.owner().cmp(&b.owner()).then_with(by_name),
        SortColumn::Group => a.group().cmp(&b.group()).then_with(by_name),
    }
}

/// Ordering used by file lists: type group first, then the column key.
/// Only the column key is reversed for descending order.
pub fn compare_entries(
    a: &FileEntry,
    b: &FileEntry,
    column: SortColumn,
    order: SortOrder,
) -> Ordering {
    let type_order = file_type_key(a).cmp(&file_type_key(b));
    type_order.then_with(|| match order {
        SortOrder::Ascending => compare_column(a, b, column),
        SortOrder::Descending => compare_column(a, b, column).reverse(),
    })
}

pub struct FileList {
    connection: Rc<Connection>,
    cwd: Option<Rc<FileEntry>>,
    dotdot: Option<Rc<FileEntry>>,
    visible: Vec<Rc<FileEntry>>,
    marked: Vec<Rc<FileEntry>>,
    sort_column: SortColumn,
    sort_order: SortOrder,
    locked: bool,
    quick_filter: Option<String>,
    options: SharedOptions,
}

impl FileList {
    pub fn new(
        connection: Rc<Connection>,
        options: SharedOptions,
        sort_column: SortColumn,
        sort_order: SortOrder,
        locked: bool,
    ) -> Self {
        Self {
            connection,
            cwd: None,
            dotdot: None,
            visible: Vec::new(),
            marked: Vec::new(),
            sort_column,
            sort_order,
            locked,
            quick_filter: None,
            options,
        }
    }

    pub fn connection(&self) -> &Rc<Connection> {
        &self.connection
    }

    pub fn cwd(&self) -> Option<&Rc<FileEntry>> {
        self.cwd.as_ref()
    }

    pub fn cwd_path(&self) -> Option<PathBuf> {
        self.cwd.as_ref().map(|d| d.path())
    }

    /// Name shown on the tab: the directory name, `/` for the root.
    pub fn title(&self) -> String {
        match self.cwd_path() {
            Some(path) => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.to_string_lossy().into_owned()),
            None => String::new(),
        }
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn set_locked(&mut self, locked: bool) {
        self.locked = locked;
    }

    pub fn sort_column(&self) -> SortColumn {
        self.sort_column
    }

    pub fn sort_order(&self) -> SortOrder {
        self.sort_order
    }

    pub fn options(&self) -> &SharedOptions {
        &self.options
    }

    pub fn set_sorting(&mut self, column: SortColumn, order: SortOrder) {
        self.sort_column = column;
        self.sort_order = order;
        self.sort();
    }

    /// Swaps in a new options snapshot, re-keying entries when the case
    /// policy changed.
    pub fn set_options(&mut self, options: SharedOptions) {
        let policy = options.case_policy();
        if policy != self.options.case_policy() {
            if let Some(cwd) = &self.cwd {
                cwd.set_case_policy(policy);
                for child in cwd.children() {
                    child.set_case_policy(policy);
                }
            }
        }
        self.options = options;
        self.refresh();
    }

    /// Binds the list to `dir`, listing it if needed. Marks are cleared.
    pub fn set_directory(&mut self, dir: Rc<FileEntry>) -> Result<()> {
        if !dir.is_dir() || dir.is_dotdot() {
            return Err(Error::NotADirectory(dir.path()));
        }
        self.connection.ensure_listed(&dir)?;
        debug!(path = %dir.path().display(), "file list bound to directory");

        self.dotdot = dir.path().parent().map(|_| FileEntry::dotdot(&dir));
        self.cwd = Some(dir);
        self.marked.clear();
        self.refresh();
        Ok(())
    }

    /// Moves the list to another connection. On failure the list keeps its
    /// previous connection and directory.
    pub fn set_connection(&mut self, connection: Rc<Connection>, dir: Rc<FileEntry>) -> Result<()> {
        let previous = std::mem::replace(&mut self.connection, connection);
        if let Err(err) = self.set_directory(dir) {
            self.connection = previous;
            return Err(err);
        }
        Ok(())
    }

    /// Navigates to `path`; `..` goes to the parent, relative paths are
    /// taken from the current directory.
    pub fn goto_directory(&mut self, path: &Path) -> Result<()> {
        let target = match &self.cwd {
            Some(cwd) if path == Path::new("..") => {
                let current = cwd.path();
                current.parent().unwrap_or(&current).to_path_buf()
            }
            Some(cwd) if path.is_relative() => cwd.path().join(path),
            _ => path.to_path_buf(),
        };
        let dir = self.connection.resolve_directory(&target)?;
        self.set_directory(dir)
    }

    /// Re-reads the bound directory. Marked entries that survive stay marked.
    pub fn reload(&mut self) -> Result<()> {
        let Some(cwd) = self.cwd.clone() else {
            return Ok(());
        };
        self.connection.relist(&cwd)?;
        self.refresh();
        cwd.drain_events();
        Ok(())
    }

    /// Rebuilds the visible set from the directory's children.
    pub fn refresh(&mut self) {
        let Some(cwd) = &self.cwd else {
            self.visible.clear();
            self.marked.clear();
            return;
        };
        let options = &self.options;
        let filter = self.quick_filter.as_deref();
        let children = cwd.children();

        self.visible = self
            .dotdot
            .iter()
            .cloned()
            .chain(children.into_iter().filter(|entry| {
                let name = entry.name();
                (options.show_hidden || !entry.is_hidden())
                    && (options.show_backup || !options.is_backup_name(&name))
                    && filter.map_or(true, |f| glob_match(f, &name))
            }))
            .collect();

        let visible = &self.visible;
        self.marked
            .retain(|m| visible.iter().any(|v| Rc::ptr_eq(v, m)));
        self.sort();
    }

    fn sort(&mut self) {
        let (column, order) = (self.sort_column, self.sort_order);
        self.visible
            .sort_by(|a, b| compare_entries(a, b, column, order));
    }

    pub fn quick_filter(&self) -> Option<&str> {
        self.quick_filter.as_deref()
    }

    pub fn set_quick_filter(&mut self, filter: Option<String>) {
        self.quick_filter = filter.filter(|f| !f.is_empty());
        self.refresh();
    }

    pub fn visible_files(&self) -> &[Rc<FileEntry>] {
        &self.visible
    }

    pub fn find(&self, name: &str) -> Option<&Rc<FileEntry>> {
        self.visible.iter().find(|e| e.info().name == name)
    }

    pub fn marked_files(&self) -> &[Rc<FileEntry>] {
        &self.marked
    }

    /// Marked files, or the given focused entry when nothing is marked.
    pub fn selected_files(&self, focused: Option<&Rc<FileEntry>>) -> Vec<Rc<FileEntry>> {
        if !self.marked.is_empty() {
            return self.marked.clone();
        }
        focused
            .filter(|f| !f.is_dotdot())
            .cloned()
            .into_iter()
            .collect()
    }

    pub fn is_marked(&self, entry: &Rc<FileEntry>) -> bool {
        self.marked.iter().any(|m| Rc::ptr_eq(m, entry))
    }

    /// Marks a visible entry. The dotdot entry is never marked.
    pub fn mark(&mut self, entry: &Rc<FileEntry>) -> bool {
        if entry.is_dotdot()
            || self.is_marked(entry)
            || !self.visible.iter().any(|v| Rc::ptr_eq(v, entry))
        {
            return false;
        }
        self.marked.push(entry.clone());
        true
    }

    pub fn unmark(&mut self, entry: &Rc<FileEntry>) -> bool {
        let before = self.marked.len();
        self.marked.retain(|m| !Rc::ptr_eq(m, entry));
        self.marked.len() != before
    }

    pub fn toggle_mark(&mut self, entry: &Rc<FileEntry>) {
        if !self.unmark(entry) {
            self.mark(entry);
        }
    }

    fn markable(&self, entry: &FileEntry) -> bool {
        !entry.is_dotdot() && (self.options.select_dirs || !entry.is_dir())
    }

    /// Marks every visible entry; directories only if the `select_dirs`
    /// option allows it. Returns the number of newly marked entries.
    pub fn mark_all(&mut self) -> usize {
        let candidates: Vec<_> = self
            .visible
            .iter()
            .filter(|e| self.markable(e))
            .cloned()
            .collect();
        candidates.iter().filter(|e| self.mark(e)).count()
    }

    pub fn unmark_all(&mut self) {
        self.marked.clear();
    }

    /// Marks entries whose name matches `pattern`.
    pub fn mark_by_pattern(&mut self, pattern: &str, case_sensitive: bool) -> usize {
        let candidates = self.matching(pattern, case_sensitive);
        candidates.iter().filter(|e| self.mark(e)).count()
    }

    pub fn unmark_by_pattern(&mut self, pattern: &str, case_sensitive: bool) -> usize {
        let candidates = self.matching(pattern, case_sensitive);
        candidates.iter().filter(|e| self.unmark(e)).count()
    }

    fn matching(&self, pattern: &str, case_sensitive: bool) -> Vec<Rc<FileEntry>> {
        let pattern = if case_sensitive {
            pattern.to_string()
        } else {
            pattern.to_lowercase()
        };
        self.visible
            .iter()
            .filter(|e| self.markable(e))
            .filter(|e| {
                let name = e.name();
                if case_sensitive {
                    glob_match(&pattern, &name)
                } else {
                    glob_match(&pattern, &name.to_lowercase())
                }
            })
            .cloned()
            .collect()
    }

    pub fn invert_marks(&mut self) {
        let candidates: Vec<_> = self
            .visible
            .iter()
            .filter(|e| self.markable(e))
            .cloned()
            .collect();
        for entry in candidates {
            self.toggle_mark(&entry);
        }
    }

    /// Drops cached recursive sizes of the visible directories.
    pub fn invalidate_tree_size(&self) {
        for entry in self.visible.iter().filter(|e| e.is_dir()) {
            entry.invalidate_tree_size();
        }
    }

    /// Counts and byte totals for the label under the list. Directories
    /// contribute only a cached recursive size; entries that are neither
    /// regular files nor directories are not counted.
    pub fn selection_stats(&self) -> SelectionStats {
        let mut stats = SelectionStats::default();
        for entry in self.visible.iter().filter(|e| !e.is_dotdot()) {
            let marked = self.is_marked(entry);
            let file_type = entry.info().file_type;
            match file_type {
                FileType::Directory => {
                    let size = entry.tree_size().unwrap_or(0);
                    stats.total_dirs += 1;
                    stats.total_bytes += size;
                    if marked {
                        stats.selected_dirs += 1;
                        stats.selected_bytes += size;
                    }
                }
                FileType::Regular => {
                    let size = entry.info().size;
                    stats.total_files += 1;
                    stats.total_bytes += size;
                    if marked {
                        stats.selected_files += 1;
                        stats.selected_bytes += size;
                    }
                }
                _ => {}
            }
        }
        stats
    }

    pub fn tab_state(&self, side: PaneSide) -> Option<TabState> {
        Some(TabState {
            side,
            connection: self.connection.id().to_string(),
            path: self.cwd_path()?,
            sort_column: self.sort_column,
            sort_order: self.sort_order,
            locked: self.locked,
        })
    }
}

impl std::fmt::Debug for FileList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileList")
            .field("connection", &self.connection.id())
            .field("cwd", &self.cwd_path())
            .field("visible", &self.visible.len())
            .field("marked", &self.marked.len())
            .field("locked", &self.locked)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::data::Options;
    use crate::services::fs::memory::InMemoryVfs;
    use std::sync::Arc;

    fn list_with(options: Options) -> FileList {
        let vfs = InMemoryVfs::default();
        vfs.add_file("/work/file10.txt", 10)
            .add_file("/work/file2.txt", 20)
            .add_file("/work/.hidden", 1)
            .add_file("/work/notes.txt~", 3)
            .add_file("/work/zeta/inner.bin", 100)
            .add_dir("/work/alpha");
        let connection = Rc::new(Connection::new("mem", "Memory", Arc::new(vfs), "/"));
        connection.open();
        let mut list = FileList::new(
            connection,
            Rc::new(options),
            SortColumn::Name,
            SortOrder::Ascending,
            false,
        );
        list.goto_directory(Path::new("/work")).unwrap();
        list
    }

    fn names(list: &FileList) -> Vec<String> {
        list.visible_files().iter().map(|e| e.name()).collect()
    }

    #[test]
    fn globs() {
        assert!(glob_match("*.txt", "a.txt"));
        assert!(glob_match("a?c", "abc"));
        assert!(glob_match("*", ""));
        assert!(glob_match("*a*b", "xxaxxb"));
        assert!(!glob_match("*.txt", "a.txt.gz"));
        assert!(!glob_match("a?c", "ac"));
    }

    #[test]
    fn dotdot_then_directories_then_files() {
        let list = list_with(Options::default());
        assert_eq!(names(&list), vec!["..", "alpha", "zeta", "file2.txt", "file10.txt"]);
    }

    #[test]
    fn descending_keeps_groups() {
        let mut list = list_with(Options::default());
        list.set_sorting(SortColumn::Name, SortOrder::Descending);
        assert_eq!(names(&list), vec!["..", "zeta", "alpha", "file10.txt", "file2.txt"]);
    }

    #[test]
    fn hidden_and_backup_files_follow_options() {
        let options = Options {
            show_hidden: true,
            show_backup: true,
            ..Options::default()
        };
        let list = list_with(options);
        assert!(list.find(".hidden").is_some());
        assert!(list.find("notes.txt~").is_some());
    }

    #[test]
    fn mark_all_respects_select_dirs() {
        let mut list = list_with(Options {
            select_dirs: false,
            ..Options::default()
        });
        assert_eq!(list.mark_all(), 2);
        assert!(list.marked_files().iter().all(|e| !e.is_dir()));

        let dotdot = list.visible_files()[0].clone();
        assert!(!list.mark(&dotdot));
    }

    #[test]
    fn pattern_marking_and_inversion() {
        let mut list = list_with(Options::default());
        assert_eq!(list.mark_by_pattern("FILE*", false), 2);
        assert_eq!(list.mark_by_pattern("FILE*", true), 0);
        list.invert_marks();
        let marked: Vec<_> = list.marked_files().iter().map(|e| e.name()).collect();
        assert_eq!(marked.len(), 2);
        assert!(marked.contains(&"alpha".to_string()));
    }

    #[test]
    fn goto_parent_and_quick_filter() {
        let mut list = list_with(Options::default());
        list.goto_directory(Path::new("zeta")).unwrap();
        assert_eq!(list.title(), "zeta");
        list.goto_directory(Path::new("..")).unwrap();
        assert_eq!(list.cwd_path(), Some(PathBuf::from("/work")));

        list.set_quick_filter(Some("*.txt".into()));
        assert_eq!(names(&list), vec!["..", "file2.txt", "file10.txt"]);
    }

    #[test]
    fn goto_a_file_is_refused() {
        let mut list = list_with(Options::default());
        assert!(matches!(
            list.goto_directory(Path::new("/work/file2.txt")),
            Err(Error::NotADirectory(_))
        ));
        assert_eq!(list.cwd_path(), Some(PathBuf::from("/work")));
    }
}
