//! In-memory options and their mirror in the settings store.
//!
//! `ConfigData` loads once at startup and writes back on an explicit
//! [`ConfigData::save`]. Components never read the store directly; they are
//! handed a [`SharedOptions`] snapshot.

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::config::color::Color;
use crate::core::config::options::{
    keys, GeneralOptions, StringOption, DEFAULT_DIR_HISTORY_LENGTH, DEFAULT_GUI_UPDATE_RATE,
    DEFAULT_SYMLINK_PREFIX, MAX_GUI_UPDATE_RATE, MIN_GUI_UPDATE_RATE,
};
use crate::core::config::store::{HandlerId, SettingsStore};
use crate::core::config::types::{
    PaneSide, PermissionDisplayMode, SizeDisplayMode, SortColumn, SortOrder, TabLockIndicator,
};
use crate::core::errors::Result;
use crate::core::format::DEFAULT_DATE_FORMAT;
use crate::models::collation::CasePolicy;
use crate::ui::theme::{ColorMode, ColorTheme};

/// Persisted description of one open tab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabState {
    pub side: PaneSide,
    pub connection: String,
    pub path: PathBuf,
    #[serde(default)]
    pub sort_column: SortColumn,
    #[serde(default)]
    pub sort_order: SortOrder,
    #[serde(default)]
    pub locked: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    pub case_sensitive: bool,
    pub size_display_mode: SizeDisplayMode,
    pub permissions_display_mode: PermissionDisplayMode,
    pub date_format: String,
    pub tab_lock_indicator: TabLockIndicator,
    pub symlink_format: String,
    pub select_dirs: bool,
    pub show_hidden: bool,
    pub show_backup: bool,
    pub backup_pattern: String,
    pub always_show_tabs: bool,
    /// Milliseconds, as stored. Use [`Options::gui_update_rate`] for the clamped value.
    pub gui_update_rate_ms: u32,
    pub directory_history_length: u32,
    pub save_directory_history: bool,
    pub directory_history: Vec<String>,
    pub theme_icon_dir: Option<PathBuf>,
    pub document_icon_dir: Option<PathBuf>,
    pub color_mode: ColorMode,
    pub custom_colors: ColorTheme,
    pub save_tabs: bool,
    pub tabs: Vec<TabState>,
}

pub type SharedOptions = Rc<Options>;

impl Default for Options {
    fn default() -> Self {
        Self {
            case_sensitive: false,
            size_display_mode: SizeDisplayMode::default(),
            permissions_display_mode: PermissionDisplayMode::default(),
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            tab_lock_indicator: TabLockIndicator::default(),
            symlink_format: DEFAULT_SYMLINK_PREFIX.to_string(),
            select_dirs: true,
            show_hidden: false,
            show_backup: false,
            backup_pattern: "*~;*.bak".to_string(),
            always_show_tabs: false,
            gui_update_rate_ms: DEFAULT_GUI_UPDATE_RATE,
            directory_history_length: DEFAULT_DIR_HISTORY_LENGTH,
            save_directory_history: true,
            directory_history: Vec::new(),
            theme_icon_dir: None,
            document_icon_dir: None,
            color_mode: ColorMode::default(),
            custom_colors: ColorTheme::custom_default(),
            save_tabs: true,
            tabs: Vec::new(),
        }
    }
}

impl Options {
    /// Minimum delay between two refreshes of the same entry, clamped to [10ms, 1000ms].
    pub fn gui_update_rate(&self) -> Duration {
        Duration::from_millis(
            self.gui_update_rate_ms
                .clamp(MIN_GUI_UPDATE_RATE, MAX_GUI_UPDATE_RATE) as u64,
        )
    }

    pub fn case_policy(&self) -> CasePolicy {
        CasePolicy::from_case_sensitive(self.case_sensitive)
    }

    pub fn color_theme(&self) -> ColorTheme {
        ColorTheme::builtin(self.color_mode).unwrap_or(self.custom_colors)
    }

    /// Name for a new symlink pointing at `target_name`.
    pub fn symlink_name(&self, target_name: &str) -> String {
        let format = if self.symlink_format.trim().is_empty() {
            DEFAULT_SYMLINK_PREFIX
        } else {
            self.symlink_format.as_str()
        };
        if format.contains("%s") {
            format.replacen("%s", target_name, 1)
        } else {
            format!("{format}{target_name}")
        }
    }

    /// Whether `name` matches one of the `;` separated backup patterns.
    pub fn is_backup_name(&self, name: &str) -> bool {
        self.backup_pattern
            .split(';')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .any(|pattern| crate::ui::components::file_list::glob_match(pattern, name))
    }

    pub fn history_length(&self) -> usize {
        self.directory_history_length.max(1) as usize
    }
}

pub struct ConfigData {
    store: Rc<dyn SettingsStore>,
    general: GeneralOptions,
    options: Options,
}

impl ConfigData {
    pub fn load(store: Rc<dyn SettingsStore>) -> Self {
        let general = GeneralOptions::new(&store);
        let mut data = Self {
            store,
            general,
            options: Options::default(),
        };
        data.load_all();
        data
    }

    pub fn store(&self) -> &Rc<dyn SettingsStore> {
        &self.store
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut Options {
        &mut self.options
    }

    /// Immutable copy for injection into panes and entries.
    pub fn snapshot(&self) -> SharedOptions {
        Rc::new(self.options.clone())
    }

    fn load_all(&mut self) {
        let g = &self.general;
        let o = &mut self.options;
        o.case_sensitive = g.case_sensitive.get();
        o.size_display_mode = g.size_display_mode.get();
        o.permissions_display_mode = g.permissions_display_mode.get();
        o.date_format = g.date_display_format.get();
        o.tab_lock_indicator = g.tab_lock_indicator.get();
        o.symlink_format = g.symlink_format.get();
        o.select_dirs = g.select_dirs.get();
        o.show_hidden = g.show_hidden.get();
        o.show_backup = g.show_backup.get();
        o.backup_pattern = g.backup_pattern.get();
        o.always_show_tabs = g.always_show_tabs.get();
        o.gui_update_rate_ms = g.gui_update_rate.get();
        o.directory_history_length = g.directory_history_length.get();
        o.save_directory_history = g.save_directory_history_on_exit.get();
        o.directory_history = g.directory_history.get();
        o.theme_icon_dir = g.theme_icon_dir.get();
        o.document_icon_dir = g.document_icon_dir.get();
        o.color_mode = g.color_mode.get();
        o.save_tabs = g.save_tabs_on_exit.get();
        o.tabs = decode_tabs(&g.file_list_tabs.get());

        for (option, color) in g.custom_colors.iter().zip(o.custom_colors.colors_mut()) {
            set_color_if_valid_key_value(color, option);
        }
        debug!("configuration loaded");
    }

    /// Re-reads one key after an external change. Returns `false` for keys
    /// this component does not track.
    pub fn reload_key(&mut self, key: &str) -> bool {
        let g = &self.general;
        let o = &mut self.options;
        match key {
            keys::CASE_SENSITIVE => o.case_sensitive = g.case_sensitive.get(),
            keys::SIZE_DISPLAY_MODE => o.size_display_mode = g.size_display_mode.get(),
            keys::PERM_DISPLAY_MODE => o.permissions_display_mode = g.permissions_display_mode.get(),
            keys::DATE_FORMAT => o.date_format = g.date_display_format.get(),
            keys::TAB_LOCK_INDICATOR => o.tab_lock_indicator = g.tab_lock_indicator.get(),
            keys::SYMLINK_PREFIX => o.symlink_format = g.symlink_format.get(),
            keys::SELECT_DIRS => o.select_dirs = g.select_dirs.get(),
            keys::SHOW_HIDDEN => o.show_hidden = g.show_hidden.get(),
            keys::SHOW_BACKUP => o.show_backup = g.show_backup.get(),
            keys::BACKUP_PATTERN => o.backup_pattern = g.backup_pattern.get(),
            keys::ALWAYS_SHOW_TABS => o.always_show_tabs = g.always_show_tabs.get(),
            keys::GUI_UPDATE_RATE => o.gui_update_rate_ms = g.gui_update_rate.get(),
            keys::DIR_HISTORY_LENGTH => {
                o.directory_history_length = g.directory_history_length.get()
            }
            keys::SAVE_DIR_HISTORY => {
                o.save_directory_history = g.save_directory_history_on_exit.get()
            }
            keys::DIR_HISTORY => o.directory_history = g.directory_history.get(),
            keys::THEME_ICON_DIR => o.theme_icon_dir = g.theme_icon_dir.get(),
            keys::DOCUMENT_ICON_DIR => o.document_icon_dir = g.document_icon_dir.get(),
            keys::COLOR_MODE => o.color_mode = g.color_mode.get(),
            keys::SAVE_TABS => o.save_tabs = g.save_tabs_on_exit.get(),
            keys::FILE_LIST_TABS => o.tabs = decode_tabs(&g.file_list_tabs.get()),
            _ => {
                let Some(index) = keys::CUSTOM_COLORS.iter().position(|k| *k == key) else {
                    return false;
                };
                let color = o.custom_colors.colors_mut().into_iter().nth(index);
                if let Some(color) = color {
                    set_color_if_valid_key_value(color, &g.custom_colors[index]);
                }
            }
        }
        debug!(key, "configuration key reloaded");
        true
    }

    /// Writes every option whose stored value differs from memory. Returns
    /// the number of keys written.
    pub fn save(&self) -> Result<usize> {
        let g = &self.general;
        let o = &self.options;
        let mut written = 0;
        let mut count = |changed: bool| written += usize::from(changed);

        count(g.case_sensitive.set_if_changed(o.case_sensitive)?);
        count(g.size_display_mode.set_if_changed(o.size_display_mode)?);
        count(g.permissions_display_mode.set_if_changed(o.permissions_display_mode)?);
        count(g.date_display_format.set_if_changed(o.date_format.clone())?);
        count(g.tab_lock_indicator.set_if_changed(o.tab_lock_indicator)?);
        count(g.symlink_format.set_if_changed(o.symlink_format.clone())?);
        count(g.select_dirs.set_if_changed(o.select_dirs)?);
        count(g.show_hidden.set_if_changed(o.show_hidden)?);
        count(g.show_backup.set_if_changed(o.show_backup)?);
        count(g.backup_pattern.set_if_changed(o.backup_pattern.clone())?);
        count(g.always_show_tabs.set_if_changed(o.always_show_tabs)?);
        count(g.gui_update_rate.set_if_changed(o.gui_update_rate_ms)?);
        count(g.directory_history_length.set_if_changed(o.directory_history_length)?);
        count(g.save_directory_history_on_exit.set_if_changed(o.save_directory_history)?);
        if o.save_directory_history {
            count(g.directory_history.set_if_changed(o.directory_history.clone())?);
        }
        count(g.theme_icon_dir.set_if_changed(o.theme_icon_dir.clone())?);
        count(g.document_icon_dir.set_if_changed(o.document_icon_dir.clone())?);
        count(g.color_mode.set_if_changed(o.color_mode)?);
        count(g.save_tabs_on_exit.set_if_changed(o.save_tabs)?);
        if o.save_tabs {
            count(g.file_list_tabs.set_if_changed(encode_tabs(&o.tabs)?)?);
        }
        for (option, color) in g.custom_colors.iter().zip(o.custom_colors.colors()) {
            count(set_color_if_changed(option, color)?);
        }

        debug!(written, "configuration saved");
        Ok(written)
    }
}

/// Keeps `config` in sync with writes made to its store by other parties.
pub fn connect_store_changes(config: &Rc<RefCell<ConfigData>>) -> HandlerId {
    let weak = Rc::downgrade(config);
    let store = config.borrow().store.clone();
    store.connect_changed(
        None,
        Rc::new(move |key: &str| {
            let Some(config) = weak.upgrade() else {
                return;
            };
            // A write issued while reloading (color write-back) re-enters here.
            if let Ok(mut data) = config.try_borrow_mut() {
                data.reload_key(key);
            };
        }),
    )
}

/// Accepts the stored color only if it parses. Otherwise the current color
/// is kept and written back over the invalid value.
fn set_color_if_valid_key_value(color: &mut Color, option: &StringOption) {
    let stored = option.get();
    match Color::parse(&stored) {
        Some(parsed) => *color = parsed,
        None => {
            warn!(
                key = option.key(),
                value = %stored,
                "invalid color in settings, keeping {}",
                color
            );
            if let Err(err) = option.set(color.to_string()) {
                warn!(key = option.key(), error = %err, "failed to restore color");
            }
        }
    }
}

fn set_color_if_changed(option: &StringOption, color: Color) -> Result<bool> {
    if Color::parse(&option.get()) == Some(color) {
        return Ok(false);
    }
    option.set(color.to_string())?;
    Ok(true)
}

fn decode_tabs(encoded: &[String]) -> Vec<TabState> {
    encoded
        .iter()
        .filter_map(|s| match serde_json::from_str::<TabState>(s) {
            Ok(tab) => Some(tab),
            Err(err) => {
                warn!(error = %err, "skipping unreadable saved tab");
                None
            }
        })
        .collect()
}

fn encode_tabs(tabs: &[TabState]) -> Result<Vec<String>> {
    tabs.iter()
        .map(|tab| serde_json::to_string(tab).map_err(Into::into))
        .collect()
}

/// Default location of the JSON settings file.
pub fn default_settings_path(config_home: &Path) -> PathBuf {
    config_home.join("twinpane").join("settings.json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::options::default_schema;
    use crate::core::config::store::{MemorySettingsStore, SettingValue};

    fn setup() -> (Rc<MemorySettingsStore>, ConfigData) {
        let store = Rc::new(MemorySettingsStore::new(default_schema()));
        let data = ConfigData::load(store.clone());
        (store, data)
    }

    #[test]
    fn load_uses_schema_defaults() {
        let (_, data) = setup();
        assert_eq!(data.options(), &Options::default());
        assert_eq!(data.options().gui_update_rate(), Duration::from_millis(100));
    }

    #[test]
    fn save_writes_only_changed_keys() {
        let (store, mut data) = setup();
        assert_eq!(data.save().unwrap(), 0);
        assert_eq!(store.write_count(), 0);

        data.options_mut().case_sensitive = true;
        data.options_mut().size_display_mode = SizeDisplayMode::Grouped;
        assert_eq!(data.save().unwrap(), 2);
        assert_eq!(store.write_count(), 2);

        assert_eq!(data.save().unwrap(), 0);
        assert_eq!(store.write_count(), 2);
    }

    #[test]
    fn update_rate_is_clamped() {
        let mut options = Options::default();
        options.gui_update_rate_ms = 1;
        assert_eq!(options.gui_update_rate(), Duration::from_millis(10));
        options.gui_update_rate_ms = 60_000;
        assert_eq!(options.gui_update_rate(), Duration::from_millis(1000));
    }

    #[test]
    fn invalid_stored_color_keeps_previous_value() {
        let (store, mut data) = setup();
        let before = data.options().custom_colors.norm_fg;

        store.insert_raw(keys::CUSTOM_NORM_FG, SettingValue::Str("#12".into()));
        assert!(data.reload_key(keys::CUSTOM_NORM_FG));
        assert_eq!(data.options().custom_colors.norm_fg, before);
        assert_eq!(store.string(keys::CUSTOM_NORM_FG), before.to_string());

        store.insert_raw(keys::CUSTOM_NORM_FG, SettingValue::Str("#ff0000".into()));
        data.reload_key(keys::CUSTOM_NORM_FG);
        assert_eq!(data.options().custom_colors.norm_fg, Color::from_rgb8(0xff, 0, 0));
    }

    #[test]
    fn external_changes_are_picked_up() {
        let store = Rc::new(MemorySettingsStore::new(default_schema()));
        let data = Rc::new(RefCell::new(ConfigData::load(store.clone())));
        connect_store_changes(&data);

        store.set_string(keys::TAB_LOCK_INDICATOR, "asterisk").unwrap();
        assert_eq!(data.borrow().options().tab_lock_indicator, TabLockIndicator::Asterisk);

        store.set_string(keys::CUSTOM_SEL_BG, "bogus").unwrap();
        assert_eq!(
            data.borrow().options().custom_colors.sel_bg,
            ColorTheme::custom_default().sel_bg
        );
    }

    #[test]
    fn tabs_round_trip_through_the_store() {
        let (store, mut data) = setup();
        data.options_mut().tabs = vec![TabState {
            side: PaneSide::Right,
            connection: "home".into(),
            path: PathBuf::from("/tmp"),
            sort_column: SortColumn::Size,
            sort_order: SortOrder::Descending,
            locked: true,
        }];
        data.save().unwrap();

        let reloaded = ConfigData::load(store);
        assert_eq!(reloaded.options().tabs, data.options().tabs);
    }

    #[test]
    fn symlink_names_and_backup_patterns() {
        let options = Options::default();
        assert_eq!(options.symlink_name("notes.txt"), "link to notes.txt");
        assert!(options.is_backup_name("draft~"));
        assert!(options.is_backup_name("db.bak"));
        assert!(!options.is_backup_name("db.txt"));
    }
}
