//! One side of the dual pane layout: its tabs and directory history.
//!
//! History is kept per connection. Jumps through history put the pane in
//! [`NavigationState::Replaying`] so the resulting directory change is not
//! recorded again.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tracing::{debug, info, warn};

use crate::core::config::data::{SharedOptions, TabState};
use crate::core::config::types::{PaneSide, SortColumn, SortOrder};
use crate::core::errors::{Error, Result};
use crate::models::connection::HOME_CONNECTION_ID;
use crate::models::file_entry::path_eq;
use crate::models::{Connection, ConnectionList, DirectoryEvent, FileEntry};
use crate::services::fs::provider::{validate_file_name, VfsError};
use crate::services::fs::tree_size::TreeSizeUpdate;
use crate::ui::components::file_list::FileList;
use crate::ui::components::history::History;
use crate::ui::components::layout::footer::{format_selection_label, SelectionStats};
use crate::ui::components::tab_label::TabLabel;
use crate::ui::{UiEvent, UiSurface};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NavigationState {
    #[default]
    Idle,
    Replaying,
}

/// What activating an entry did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    NavigatedInPlace,
    OpenedTab(usize),
    NotADirectory,
}

/// Answer to a failed item in a batch operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchChoice {
    Skip,
    /// Skip this and every later failure without asking.
    SkipAll,
    Cancel,
    Retry,
}

#[derive(Debug, Default)]
pub struct SymlinkReport {
    pub created: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, VfsError)>,
    pub cancelled: bool,
}

#[derive(Debug, Clone, Copy)]
enum HistoryStep {
    First,
    Back,
    Forward,
    Last,
}

pub struct Pane {
    side: PaneSide,
    tabs: Vec<FileList>,
    current: usize,
    active: bool,
    state: NavigationState,
    histories: HashMap<String, History<PathBuf>>,
    options: SharedOptions,
    surface: Rc<dyn UiSurface>,
}

impl Pane {
    /// Opens a pane with a single tab showing `path` on `connection`.
    pub fn new(
        side: PaneSide,
        connection: Rc<Connection>,
        path: &Path,
        options: SharedOptions,
        surface: Rc<dyn UiSurface>,
    ) -> Result<Self> {
        connection.open();
        let dir = connection.resolve_directory(path)?;

        let mut histories = HashMap::new();
        if options.save_directory_history && !options.directory_history.is_empty() {
            let saved = options.directory_history.iter().map(PathBuf::from).collect();
            histories.insert(
                HOME_CONNECTION_ID.to_string(),
                History::from_entries(options.history_length(), saved),
            );
        }

        let mut pane = Self {
            side,
            tabs: Vec::new(),
            current: 0,
            active: false,
            state: NavigationState::Idle,
            histories,
            options,
            surface,
        };
        pane.open_tab(
            connection,
            dir,
            SortColumn::default(),
            SortOrder::default(),
            false,
            true,
        )?;
        Ok(pane)
    }

    pub fn side(&self) -> PaneSide {
        self.side
    }

    pub fn state(&self) -> NavigationState {
        self.state
    }

    pub fn options(&self) -> &SharedOptions {
        &self.options
    }

    pub fn tabs(&self) -> &[FileList] {
        &self.tabs
    }

    pub fn tab_count(&self) -> usize {
        self.tabs.len()
    }

    pub fn tab(&self, index: usize) -> Option<&FileList> {
        self.tabs.get(index)
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn file_list(&self) -> &FileList {
        &self.tabs[self.current]
    }

    pub fn file_list_mut(&mut self) -> &mut FileList {
        &mut self.tabs[self.current]
    }

    pub fn connection(&self) -> Rc<Connection> {
        self.file_list().connection().clone()
    }

    pub fn directory(&self) -> Option<Rc<FileEntry>> {
        self.file_list().cwd().cloned()
    }

    pub fn directory_path(&self) -> Option<PathBuf> {
        self.file_list().cwd_path()
    }

    /// History of the current connection.
    pub fn history(&self) -> Option<&History<PathBuf>> {
        self.histories.get(self.file_list().connection().id())
    }

    pub fn can_back(&self) -> bool {
        self.history().map_or(false, History::can_back)
    }

    pub fn can_forward(&self) -> bool {
        self.history().map_or(false, History::can_forward)
    }

    pub fn first(&mut self) -> Result<()> {
        self.replay(HistoryStep::First)
    }

    pub fn back(&mut self) -> Result<()> {
        self.replay(HistoryStep::Back)
    }

    pub fn forward(&mut self) -> Result<()> {
        self.replay(HistoryStep::Forward)
    }

    pub fn last(&mut self) -> Result<()> {
        self.replay(HistoryStep::Last)
    }

    fn replay(&mut self, step: HistoryStep) -> Result<()> {
        if self.state == NavigationState::Replaying {
            return Ok(());
        }
        let connection = self.connection();
        let Some(history) = self.histories.get_mut(connection.id()) else {
            return Ok(());
        };
        let previous = history.position();
        let target = match step {
            HistoryStep::First if history.can_back() => history.first(),
            HistoryStep::Back if history.can_back() => history.back(),
            HistoryStep::Forward if history.can_forward() => history.forward(),
            HistoryStep::Last if history.can_forward() => history.last(),
            _ => None,
        };
        let Some(target) = target else {
            return Ok(());
        };
        debug!(side = ?self.side, ?step, path = %target.display(), "replaying history");

        self.state = NavigationState::Replaying;
        let result = self.goto_directory(&connection, &target);
        self.state = NavigationState::Idle;
        if result.is_err() {
            if let Some(history) = self.histories.get_mut(connection.id()) {
                history.set_position(previous);
            }
        }
        result
    }

    /// Navigation result reported by a tab. Ignored unless `tab` is the
    /// current tab and still shows `dir`.
    pub fn on_directory_changed(&mut self, tab: usize, dir: &Path) {
        if tab != self.current {
            debug!(side = ?self.side, tab, "ignoring directory change of background tab");
            return;
        }
        let Some(list) = self.tabs.get(tab) else {
            return;
        };
        if !list.cwd_path().map_or(false, |cwd| path_eq(&cwd, dir)) {
            debug!(side = ?self.side, tab, path = %dir.display(), "ignoring stale directory change");
            return;
        }

        if self.state == NavigationState::Idle {
            let length = self.options.history_length();
            self.histories
                .entry(list.connection().id().to_string())
                .or_insert_with(|| History::new(length))
                .add(dir.to_path_buf());
        }

        self.update_tab_label(tab);
        self.update_selected_files_label();
        self.surface.emit(UiEvent::DirectoryChanged {
            side: self.side,
            path: dir.to_path_buf(),
        });
    }

    /// Visible or marked files of `tab` changed.
    pub fn on_files_changed(&mut self, tab: usize) {
        if tab == self.current {
            self.update_selected_files_label();
        }
    }

    pub fn selection_stats(&self) -> SelectionStats {
        self.file_list().selection_stats()
    }

    pub fn selection_label(&self) -> String {
        format_selection_label(&self.selection_stats(), self.options.size_display_mode)
    }

    fn update_selected_files_label(&self) {
        self.surface.emit(UiEvent::SelectedFilesLabel {
            side: self.side,
            text: self.selection_label(),
        });
    }

    pub fn tab_label(&self, index: usize) -> Option<TabLabel> {
        let list = self.tabs.get(index)?;
        Some(TabLabel::new(
            &list.title(),
            list.is_locked(),
            self.options.tab_lock_indicator,
        ))
    }

    fn update_tab_label(&self, index: usize) {
        if let Some(label) = self.tab_label(index) {
            self.surface.emit(UiEvent::TabLabel {
                side: self.side,
                index,
                label,
            });
        }
    }

    /// Opens `dir` of the current connection in a new tab.
    pub fn new_tab(
        &mut self,
        dir: Rc<FileEntry>,
        sort_column: SortColumn,
        sort_order: SortOrder,
        locked: bool,
        activate: bool,
    ) -> Result<usize> {
        let connection = self.connection();
        self.open_tab(connection, dir, sort_column, sort_order, locked, activate)
    }

    pub fn open_tab(
        &mut self,
        connection: Rc<Connection>,
        dir: Rc<FileEntry>,
        sort_column: SortColumn,
        sort_order: SortOrder,
        locked: bool,
        activate: bool,
    ) -> Result<usize> {
        let mut list = FileList::new(
            connection,
            self.options.clone(),
            sort_column,
            sort_order,
            locked,
        );
        list.set_directory(dir)?;
        let path = list.cwd_path();
        self.tabs.push(list);
        let index = self.tabs.len() - 1;
        debug!(side = ?self.side, index, locked, "tab opened");

        self.surface.emit(UiEvent::TabOpened {
            side: self.side,
            index,
        });
        self.update_tab_label(index);
        if activate {
            self.current = index;
            if let Some(path) = path {
                self.on_directory_changed(index, &path);
            }
        }
        Ok(index)
    }

    /// Same sort settings as the current tab, unlocked and activated.
    fn open_tab_like_current(&mut self, connection: Rc<Connection>, dir: Rc<FileEntry>) -> Result<usize> {
        let column = self.file_list().sort_column();
        let order = self.file_list().sort_order();
        self.open_tab(connection, dir, column, order, false, true)
    }

    pub fn switch_to_tab(&mut self, index: usize) -> Result<()> {
        if index >= self.tabs.len() {
            return Err(Error::NoSuchTab(index));
        }
        let previous = self.directory_path();
        self.current = index;
        self.update_selected_files_label();

        let now = self.directory_path();
        if let Some(path) = now {
            let same = previous.as_deref().map_or(false, |p| path_eq(p, &path));
            if !same {
                self.surface.emit(UiEvent::DirectoryChanged {
                    side: self.side,
                    path,
                });
            }
        }
        Ok(())
    }

    /// Closes the tab at `index`. Locked tabs need `confirmed`. The last
    /// tab is never closed; `Ok(false)` is returned instead.
    pub fn close_tab(&mut self, index: usize, confirmed: bool) -> Result<bool> {
        let Some(list) = self.tabs.get(index) else {
            return Err(Error::NoSuchTab(index));
        };
        if self.tabs.len() == 1 {
            return Ok(false);
        }
        if list.is_locked() && !confirmed {
            return Err(Error::TabLocked(index));
        }
        self.remove_tab(index);
        Ok(true)
    }

    fn remove_tab(&mut self, index: usize) {
        let removed = self.tabs.remove(index);
        debug!(side = ?self.side, index, path = ?removed.cwd_path(), "tab closed");
        self.surface.emit(UiEvent::TabClosed {
            side: self.side,
            index,
        });

        if index < self.current {
            self.current -= 1;
        } else if index == self.current {
            self.current = self.current.min(self.tabs.len() - 1);
            if let Some(path) = self.directory_path() {
                self.update_selected_files_label();
                self.surface.emit(UiEvent::DirectoryChanged {
                    side: self.side,
                    path,
                });
            }
        }
    }

    /// Closes every tab except the current one and the locked ones.
    pub fn close_all_tabs(&mut self) -> usize {
        let mut closed = 0;
        let mut index = self.tabs.len();
        while index > 0 {
            index -= 1;
            if index != self.current && !self.tabs[index].is_locked() {
                self.remove_tab(index);
                closed += 1;
            }
        }
        closed
    }

    /// Closes unlocked tabs showing the same directory as an earlier tab.
    /// The current tab always survives.
    pub fn close_duplicate_tabs(&mut self) -> usize {
        let key = |list: &FileList| (list.connection().id().to_string(), list.cwd_path());

        let mut seen = HashSet::new();
        seen.insert(key(self.file_list()));
        let mut duplicates = Vec::new();
        for (index, list) in self.tabs.iter().enumerate() {
            if index == self.current {
                continue;
            }
            if !seen.insert(key(list)) && !list.is_locked() {
                duplicates.push(index);
            }
        }
        for index in duplicates.iter().rev() {
            self.remove_tab(*index);
        }
        duplicates.len()
    }

    pub fn set_tab_locked(&mut self, index: usize, locked: bool) -> Result<()> {
        let list = self.tabs.get_mut(index).ok_or(Error::NoSuchTab(index))?;
        list.set_locked(locked);
        self.update_tab_label(index);
        Ok(())
    }

    /// Returns the new lock state.
    pub fn toggle_tab_lock(&mut self, index: usize) -> Result<bool> {
        let locked = !self.tabs.get(index).ok_or(Error::NoSuchTab(index))?.is_locked();
        self.set_tab_locked(index, locked)?;
        Ok(locked)
    }

    /// Shows `path` of `connection`, opening the connection if needed. A
    /// locked current tab is left alone and a new tab is opened instead.
    /// Relative paths and `..` are taken from the current directory when
    /// `connection` is the current one.
    pub fn goto_directory(&mut self, connection: &Rc<Connection>, path: &Path) -> Result<()> {
        connection.open();
        let same_connection = Rc::ptr_eq(self.file_list().connection(), connection);
        let target = match self.directory_path() {
            Some(cwd) if same_connection && path == Path::new("..") => {
                cwd.parent().unwrap_or(&cwd).to_path_buf()
            }
            Some(cwd) if same_connection && path.is_relative() => cwd.join(path),
            _ => path.to_path_buf(),
        };
        let dir = connection.resolve_directory(&target)?;

        if self.file_list().is_locked() {
            self.open_tab_like_current(connection.clone(), dir)?;
            return Ok(());
        }

        let index = self.current;
        let list = &mut self.tabs[index];
        if same_connection {
            list.set_directory(dir)?;
        } else {
            info!(side = ?self.side, connection = connection.id(), "switching connection");
            list.set_connection(connection.clone(), dir)?;
        }
        if let Some(path) = list.cwd_path() {
            self.on_directory_changed(index, &path);
        }
        Ok(())
    }

    /// `goto_directory` on the current connection.
    pub fn goto_path(&mut self, path: &Path) -> Result<()> {
        let connection = self.connection();
        self.goto_directory(&connection, path)
    }

    /// Activation of `entry` in the current tab. Directories are entered in
    /// place, or opened in a new tab when the tab is locked or
    /// `force_new_tab` is set.
    pub fn do_file_specific_action(
        &mut self,
        entry: &Rc<FileEntry>,
        force_new_tab: bool,
    ) -> Result<Activation> {
        if !entry.is_dir() {
            return Ok(Activation::NotADirectory);
        }

        let index = self.current;
        if !self.tabs[index].is_locked() && !force_new_tab {
            let list = &mut self.tabs[index];
            list.invalidate_tree_size();
            if entry.is_dotdot() {
                list.goto_directory(Path::new(".."))?;
            } else {
                list.set_directory(entry.clone())?;
            }
            if let Some(path) = list.cwd_path() {
                self.on_directory_changed(index, &path);
            }
            return Ok(Activation::NavigatedInPlace);
        }

        let connection = self.connection();
        let dir = if entry.is_dotdot() {
            connection.resolve_directory(&entry.path())?
        } else {
            entry.clone()
        };
        let opened = self.open_tab_like_current(connection, dir)?;
        Ok(Activation::OpenedTab(opened))
    }

    /// Creates a symlink to `target` in the current directory. Without a
    /// name the configured symlink format is used.
    pub fn create_symlink(&mut self, target: &Rc<FileEntry>, name: Option<&str>) -> Result<Rc<FileEntry>> {
        let name = match name {
            Some(name) => name.to_string(),
            None => self.options.symlink_name(&target.name()),
        };
        if name.trim().is_empty() {
            return Err(Error::InvalidArgument("no file name given".to_string()));
        }
        let entry = self.try_create_symlink(target, &name)?;
        self.refresh_current();
        Ok(entry)
    }

    fn try_create_symlink(&self, target: &Rc<FileEntry>, name: &str) -> std::result::Result<Rc<FileEntry>, VfsError> {
        validate_file_name(name)?;
        let list = self.file_list();
        let Some(cwd) = list.cwd() else {
            return Err(VfsError::NotFound(PathBuf::from(name)));
        };
        let provider = list.connection().provider();
        let link = cwd.path().join(name);
        provider.create_symlink(&link, &target.path())?;
        let info = provider.stat(&link)?;
        cwd.file_created(info)
            .ok_or_else(|| VfsError::NotADirectory(cwd.path()))
    }

    /// Creates one symlink per target in the current directory. `choose`
    /// decides what happens after a failure, unless an earlier answer was
    /// [`BatchChoice::SkipAll`].
    pub fn create_symlinks<F>(&mut self, targets: &[Rc<FileEntry>], mut choose: F) -> SymlinkReport
    where
        F: FnMut(&Rc<FileEntry>, &VfsError) -> BatchChoice,
    {
        let mut report = SymlinkReport::default();
        let mut skip_all = false;

        'targets: for target in targets {
            let name = self.options.symlink_name(&target.name());
            loop {
                match self.try_create_symlink(target, &name) {
                    Ok(entry) => {
                        report.created.push(entry.path());
                        break;
                    }
                    Err(err) => {
                        let choice = if skip_all {
                            BatchChoice::Skip
                        } else {
                            choose(target, &err)
                        };
                        warn!(link_target = %target.path().display(), error = %err, ?choice, "symlink failed");
                        match choice {
                            BatchChoice::Retry => continue,
                            BatchChoice::Skip => {}
                            BatchChoice::SkipAll => skip_all = true,
                            BatchChoice::Cancel => {
                                report.failed.push((target.path(), err));
                                report.cancelled = true;
                                break 'targets;
                            }
                        }
                        report.failed.push((target.path(), err));
                        break;
                    }
                }
            }
        }

        if !report.created.is_empty() {
            self.refresh_current();
        }
        report
    }

    fn refresh_current(&mut self) {
        if self.process_directory_events() == 0 {
            let index = self.current;
            self.tabs[index].refresh();
            self.on_files_changed(index);
        }
    }

    /// Applies the change events queued on the directories the tabs show:
    /// affected tabs are refreshed and re-sorted, and a moved directory
    /// updates its tab label. Returns how many tabs were refreshed.
    pub fn process_directory_events(&mut self) -> usize {
        let mut pending: Vec<(Rc<FileEntry>, bool)> = Vec::new();
        for list in &self.tabs {
            let Some(cwd) = list.cwd() else {
                continue;
            };
            if pending.iter().any(|(dir, _)| Rc::ptr_eq(dir, cwd)) {
                continue;
            }
            let events = cwd.drain_events();
            if !events.is_empty() {
                let moved = events
                    .iter()
                    .any(|e| matches!(e, DirectoryEvent::PathUpdated(_)));
                pending.push((cwd.clone(), moved));
            }
        }
        if pending.is_empty() {
            return 0;
        }

        let mut refreshed = 0;
        for index in 0..self.tabs.len() {
            let moved = match self.tabs[index].cwd() {
                Some(cwd) => pending
                    .iter()
                    .find(|(dir, _)| Rc::ptr_eq(dir, cwd))
                    .map(|(_, moved)| *moved),
                None => None,
            };
            let Some(moved) = moved else {
                continue;
            };
            self.tabs[index].refresh();
            refreshed += 1;
            if moved {
                self.update_tab_label(index);
            }
            if index == self.current {
                self.update_selected_files_label();
                if let Some(path) = self.directory_path().filter(|_| moved) {
                    self.surface.emit(UiEvent::DirectoryChanged {
                        side: self.side,
                        path,
                    });
                }
            }
        }
        debug!(side = ?self.side, refreshed, "directory events applied");
        refreshed
    }

    pub fn toggle_mark(&mut self, entry: &Rc<FileEntry>) {
        self.file_list_mut().toggle_mark(entry);
        self.on_files_changed(self.current);
    }

    pub fn mark_all(&mut self) -> usize {
        let marked = self.file_list_mut().mark_all();
        self.on_files_changed(self.current);
        marked
    }

    pub fn unmark_all(&mut self) {
        self.file_list_mut().unmark_all();
        self.on_files_changed(self.current);
    }

    pub fn mark_by_pattern(&mut self, pattern: &str, case_sensitive: bool) -> usize {
        let marked = self.file_list_mut().mark_by_pattern(pattern, case_sensitive);
        self.on_files_changed(self.current);
        marked
    }

    /// Re-reads every tab showing `dir`. Returns how many tabs were reloaded.
    pub fn reload_directory(&mut self, dir: &Path) -> usize {
        let mut reloaded = 0;
        for index in 0..self.tabs.len() {
            let list = &mut self.tabs[index];
            if !list.cwd_path().map_or(false, |p| path_eq(&p, dir)) {
                continue;
            }
            match list.reload() {
                Ok(()) => {
                    reloaded += 1;
                    self.on_files_changed(index);
                }
                Err(err) => warn!(path = %dir.display(), error = %err, "reload failed"),
            }
        }
        reloaded
    }

    /// Stores a finished background size computation in every visible
    /// entry for that path. Returns whether any entry took it.
    pub fn apply_tree_size(&mut self, update: &TreeSizeUpdate) -> bool {
        let TreeSizeUpdate::Done { path, usage } = update else {
            return false;
        };
        let mut applied = false;
        for list in &self.tabs {
            let matching = list
                .visible_files()
                .iter()
                .chain(list.cwd())
                .filter(|e| e.is_dir() && !e.is_dotdot() && path_eq(&e.path(), path));
            for entry in matching {
                entry.set_tree_size(usage.bytes);
                applied = true;
            }
        }
        if applied {
            self.on_files_changed(self.current);
        }
        applied
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
        self.surface.emit(UiEvent::ActiveChanged {
            side: self.side,
            active,
        });
    }

    /// Replaces the options snapshot of the pane and all its tabs.
    pub fn set_options(&mut self, options: SharedOptions) {
        for list in &mut self.tabs {
            list.set_options(options.clone());
        }
        self.options = options;
        for index in 0..self.tabs.len() {
            self.update_tab_label(index);
        }
        self.update_selected_files_label();
        self.surface.emit(UiEvent::UpdateView { side: self.side });
    }

    pub fn save_tabs(&self) -> Vec<TabState> {
        self.tabs
            .iter()
            .filter_map(|list| list.tab_state(self.side))
            .collect()
    }

    /// Directory history of the home connection, newest first.
    pub fn directory_history(&self) -> Vec<String> {
        self.histories
            .get(HOME_CONNECTION_ID)
            .map(|h| {
                h.export()
                    .iter()
                    .map(|p| p.to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Replaces the open tabs with the saved ones for this side. Tabs whose
    /// connection or directory is gone are skipped. When nothing can be
    /// restored the current tabs stay.
    pub fn restore_tabs(&mut self, saved: &[TabState], connections: &ConnectionList) -> usize {
        let mut restored = Vec::new();
        for state in saved.iter().filter(|s| s.side == self.side) {
            let Some(connection) = connections.get(&state.connection) else {
                warn!(connection = %state.connection, "saved tab refers to unknown connection");
                continue;
            };
            connection.open();
            let mut list = FileList::new(
                connection.clone(),
                self.options.clone(),
                state.sort_column,
                state.sort_order,
                state.locked,
            );
            match connection
                .resolve_directory(&state.path)
                .and_then(|dir| list.set_directory(dir))
            {
                Ok(()) => restored.push(list),
                Err(err) => {
                    warn!(path = %state.path.display(), error = %err, "cannot restore tab")
                }
            }
        }
        if restored.is_empty() {
            return 0;
        }

        let count = restored.len();
        for index in (0..self.tabs.len()).rev() {
            self.surface.emit(UiEvent::TabClosed {
                side: self.side,
                index,
            });
        }
        self.tabs = restored;
        self.current = 0;
        for index in 0..count {
            self.surface.emit(UiEvent::TabOpened {
                side: self.side,
                index,
            });
            self.update_tab_label(index);
        }
        if let Some(path) = self.directory_path() {
            self.on_directory_changed(0, &path);
        }
        info!(side = ?self.side, count, "tabs restored");
        count
    }
}

impl std::fmt::Debug for Pane {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pane")
            .field("side", &self.side)
            .field("tabs", &self.tabs)
            .field("current", &self.current)
            .field("active", &self.active)
            .field("state", &self.state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::data::Options;
    use crate::services::fs::memory::InMemoryVfs;
    use crate::ui::RecordingSurface;
    use std::sync::Arc;

    fn setup() -> (Rc<RecordingSurface>, Rc<Connection>, Pane) {
        let vfs = InMemoryVfs::default();
        vfs.add_file("/home/a/one.txt", 1024)
            .add_file("/home/b/two.txt", 2048)
            .add_dir("/home/c");
        let connection = Rc::new(Connection::new("mem", "Memory", Arc::new(vfs), "/"));
        let surface = Rc::new(RecordingSurface::new());
        let pane = Pane::new(
            PaneSide::Left,
            connection.clone(),
            Path::new("/home"),
            Rc::new(Options::default()),
            surface.clone(),
        )
        .unwrap();
        (surface, connection, pane)
    }

    #[test]
    fn replay_does_not_record_history() {
        let (_, _, mut pane) = setup();
        pane.goto_path(Path::new("a")).unwrap();
        pane.goto_path(Path::new("/home/b")).unwrap();
        assert_eq!(pane.history().map(History::len), Some(3));

        pane.back().unwrap();
        assert_eq!(pane.directory_path(), Some(PathBuf::from("/home/a")));
        assert_eq!(pane.state(), NavigationState::Idle);
        assert_eq!(pane.history().map(History::len), Some(3));
        assert!(pane.can_forward());
    }

    #[test]
    fn background_tab_changes_are_ignored() {
        let (surface, connection, mut pane) = setup();
        let dir = connection.resolve_directory(Path::new("/home/c")).unwrap();
        let index = pane
            .new_tab(dir, SortColumn::Name, SortOrder::Ascending, false, false)
            .unwrap();
        surface.take();

        pane.on_directory_changed(index, Path::new("/home/c"));
        assert!(surface.events().is_empty());
        assert_eq!(pane.history().map(History::len), Some(1));

        // current tab, but a directory it no longer shows
        pane.on_directory_changed(0, Path::new("/home/a"));
        assert!(surface.events().is_empty());
    }

    #[test]
    fn locked_tabs_need_confirmation_and_last_tab_stays() {
        let (_, connection, mut pane) = setup();
        assert_eq!(pane.close_tab(0, true).unwrap(), false);

        let dir = connection.resolve_directory(Path::new("/home/a")).unwrap();
        let index = pane
            .new_tab(dir, SortColumn::Name, SortOrder::Ascending, true, true)
            .unwrap();
        assert!(matches!(pane.close_tab(index, false), Err(Error::TabLocked(1))));
        assert!(pane.close_tab(index, true).unwrap());
        assert_eq!(pane.tab_count(), 1);
        assert!(matches!(pane.close_tab(5, true), Err(Error::NoSuchTab(5))));
    }

    #[test]
    fn close_all_keeps_current_and_locked() {
        let (_, connection, mut pane) = setup();
        for (path, locked) in [("/home/a", false), ("/home/b", true), ("/home/c", false)] {
            let dir = connection.resolve_directory(Path::new(path)).unwrap();
            pane.new_tab(dir, SortColumn::Name, SortOrder::Ascending, locked, false)
                .unwrap();
        }
        assert_eq!(pane.close_all_tabs(), 2);
        let paths: Vec<_> = pane.tabs().iter().filter_map(FileList::cwd_path).collect();
        assert_eq!(paths, vec![PathBuf::from("/home"), PathBuf::from("/home/b")]);
    }

    #[test]
    fn duplicates_are_closed() {
        let (_, connection, mut pane) = setup();
        for path in ["/home", "/home/a", "/home/a"] {
            let dir = connection.resolve_directory(Path::new(path)).unwrap();
            pane.new_tab(dir, SortColumn::Name, SortOrder::Ascending, false, false)
                .unwrap();
        }
        assert_eq!(pane.close_duplicate_tabs(), 2);
        assert_eq!(pane.tab_count(), 2);
        assert_eq!(pane.current_index(), 0);
    }

    #[test]
    fn goto_in_locked_tab_opens_a_new_one() {
        let (_, _, mut pane) = setup();
        pane.toggle_tab_lock(0).unwrap();
        pane.goto_path(Path::new("a")).unwrap();
        assert_eq!(pane.tab_count(), 2);
        assert_eq!(pane.current_index(), 1);
        assert_eq!(pane.tab(0).and_then(FileList::cwd_path), Some(PathBuf::from("/home")));
        assert!(!pane.file_list().is_locked());
    }

    #[test]
    fn tab_labels_follow_lock_state() {
        let (surface, _, mut pane) = setup();
        surface.take();
        pane.set_tab_locked(0, true).unwrap();
        let label = surface.events().into_iter().find_map(|e| match e {
            UiEvent::TabLabel { label, .. } => Some(label),
            _ => None,
        });
        assert_eq!(label.map(|l| l.show_pin), Some(true));
    }

    #[test]
    fn activation_of_files_is_not_navigation() {
        let (_, _, mut pane) = setup();
        pane.goto_path(Path::new("a")).unwrap();
        let file = pane.file_list().find("one.txt").cloned().unwrap();
        assert_eq!(
            pane.do_file_specific_action(&file, false).unwrap(),
            Activation::NotADirectory
        );
    }

    #[test]
    fn dotdot_in_locked_tab_opens_the_parent() {
        let (_, _, mut pane) = setup();
        pane.goto_path(Path::new("a")).unwrap();
        pane.set_tab_locked(0, true).unwrap();
        let dotdot = pane.file_list().visible_files()[0].clone();
        assert!(dotdot.is_dotdot());

        let outcome = pane.do_file_specific_action(&dotdot, false).unwrap();
        assert_eq!(outcome, Activation::OpenedTab(1));
        assert_eq!(pane.directory_path(), Some(PathBuf::from("/home")));
        assert_eq!(pane.tab(0).and_then(FileList::cwd_path), Some(PathBuf::from("/home/a")));
    }

    #[test]
    fn symlink_batch_honours_choices() {
        let (_, connection, mut pane) = setup();
        let a = connection.resolve_directory(Path::new("/home/a")).unwrap();
        let b = connection.resolve_directory(Path::new("/home/b")).unwrap();

        pane.goto_path(Path::new("/home/c")).unwrap();
        let first = pane.create_symlinks(&[a.clone()], |_, _| BatchChoice::Cancel);
        assert_eq!(first.created, vec![PathBuf::from("/home/c/link to a")]);

        let mut asked = 0;
        let second = pane.create_symlinks(&[a, b], |_, _| {
            asked += 1;
            BatchChoice::SkipAll
        });
        assert_eq!(asked, 1);
        assert_eq!(second.failed.len(), 1);
        assert_eq!(second.created, vec![PathBuf::from("/home/c/link to b")]);
        assert!(pane.file_list().find("link to b").is_some());
    }
}
