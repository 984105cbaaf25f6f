//! Typed accessors over a [`SettingsStore`] and the settings schema.

use std::marker::PhantomData;
use std::path::PathBuf;
use std::rc::Rc;
use std::str::FromStr;
use std::time::Duration;

use crate::core::config::store::{HandlerId, Schema, SettingValue, SettingsStore};
use crate::core::config::types::{PermissionDisplayMode, SizeDisplayMode, TabLockIndicator};
use crate::core::errors::Result;
use crate::core::format::DEFAULT_DATE_FORMAT;
use crate::ui::theme::ColorMode;

pub mod keys {
    pub const CASE_SENSITIVE: &str = "case-sensitive";
    pub const SIZE_DISPLAY_MODE: &str = "size-display-mode";
    pub const PERM_DISPLAY_MODE: &str = "perm-display-mode";
    pub const DATE_FORMAT: &str = "date-disp-format";
    pub const TAB_LOCK_INDICATOR: &str = "tab-lock-indicator";
    pub const SYMLINK_PREFIX: &str = "symlink-string";
    pub const SELECT_DIRS: &str = "select-dirs";
    pub const SHOW_HIDDEN: &str = "show-hidden-files";
    pub const SHOW_BACKUP: &str = "show-backup-files";
    pub const BACKUP_PATTERN: &str = "backup-pattern";
    pub const ALWAYS_SHOW_TABS: &str = "always-show-tabs";
    pub const GUI_UPDATE_RATE: &str = "gui-update-rate";
    pub const DIR_HISTORY_LENGTH: &str = "dir-history-length";
    pub const SAVE_DIR_HISTORY: &str = "save-dir-history-on-exit";
    pub const DIR_HISTORY: &str = "dir-history";
    pub const THEME_ICON_DIR: &str = "theme-icon-dir";
    pub const DOCUMENT_ICON_DIR: &str = "document-icon-dir";
    pub const COLOR_MODE: &str = "color-theme";
    pub const SAVE_TABS: &str = "save-tabs-on-exit";
    pub const FILE_LIST_TABS: &str = "file-list-tabs";

    pub const CUSTOM_NORM_FG: &str = "custom-color-norm-fg";
    pub const CUSTOM_NORM_BG: &str = "custom-color-norm-bg";
    pub const CUSTOM_ALT_FG: &str = "custom-color-alt-fg";
    pub const CUSTOM_ALT_BG: &str = "custom-color-alt-bg";
    pub const CUSTOM_SEL_FG: &str = "custom-color-sel-fg";
    pub const CUSTOM_SEL_BG: &str = "custom-color-sel-bg";
    pub const CUSTOM_CURS_FG: &str = "custom-color-curs-fg";
    pub const CUSTOM_CURS_BG: &str = "custom-color-curs-bg";

    pub const CUSTOM_COLORS: [&str; 8] = [
        CUSTOM_NORM_FG,
        CUSTOM_NORM_BG,
        CUSTOM_ALT_FG,
        CUSTOM_ALT_BG,
        CUSTOM_SEL_FG,
        CUSTOM_SEL_BG,
        CUSTOM_CURS_FG,
        CUSTOM_CURS_BG,
    ];
}

pub const DEFAULT_GUI_UPDATE_RATE: u32 = 100;
pub const MIN_GUI_UPDATE_RATE: u32 = 10;
pub const MAX_GUI_UPDATE_RATE: u32 = 1000;
pub const DEFAULT_DIR_HISTORY_LENGTH: u32 = 20;
pub const DEFAULT_SYMLINK_PREFIX: &str = "link to %s";

/// Default value of every known key.
pub fn default_schema() -> Schema {
    use keys::*;

    let s = |v: &str| SettingValue::Str(v.to_string());
    let mut schema = Schema::new();
    schema.insert(CASE_SENSITIVE, SettingValue::Bool(false));
    schema.insert(SIZE_DISPLAY_MODE, s("powered"));
    schema.insert(PERM_DISPLAY_MODE, s("text"));
    schema.insert(DATE_FORMAT, s(DEFAULT_DATE_FORMAT));
    schema.insert(TAB_LOCK_INDICATOR, s("icon"));
    schema.insert(SYMLINK_PREFIX, s(DEFAULT_SYMLINK_PREFIX));
    schema.insert(SELECT_DIRS, SettingValue::Bool(true));
    schema.insert(SHOW_HIDDEN, SettingValue::Bool(false));
    schema.insert(SHOW_BACKUP, SettingValue::Bool(false));
    schema.insert(BACKUP_PATTERN, s("*~;*.bak"));
    schema.insert(ALWAYS_SHOW_TABS, SettingValue::Bool(false));
    schema.insert(GUI_UPDATE_RATE, SettingValue::UInt(DEFAULT_GUI_UPDATE_RATE));
    schema.insert(DIR_HISTORY_LENGTH, SettingValue::UInt(DEFAULT_DIR_HISTORY_LENGTH));
    schema.insert(SAVE_DIR_HISTORY, SettingValue::Bool(true));
    schema.insert(DIR_HISTORY, SettingValue::StrList(Vec::new()));
    schema.insert(THEME_ICON_DIR, s(""));
    schema.insert(DOCUMENT_ICON_DIR, s(""));
    schema.insert(COLOR_MODE, s("default"));
    schema.insert(SAVE_TABS, SettingValue::Bool(true));
    schema.insert(FILE_LIST_TABS, SettingValue::StrList(Vec::new()));

    let custom = crate::ui::theme::ColorTheme::custom_default();
    for (key, color) in CUSTOM_COLORS.iter().zip(custom.colors()) {
        schema.insert(*key, SettingValue::Str(color.to_string()));
    }
    schema
}

/// Conversion between a stored representation and the user facing type.
pub trait SettingsRepr: Sized {
    fn value(store: &dyn SettingsStore, key: &str) -> Self;
    fn set_value(store: &dyn SettingsStore, key: &str, value: Self) -> Result<()>;
}

impl SettingsRepr for bool {
    fn value(store: &dyn SettingsStore, key: &str) -> bool {
        store.boolean(key)
    }

    fn set_value(store: &dyn SettingsStore, key: &str, value: bool) -> Result<()> {
        store.set_boolean(key, value)
    }
}

impl SettingsRepr for u32 {
    fn value(store: &dyn SettingsStore, key: &str) -> u32 {
        store.uint(key)
    }

    fn set_value(store: &dyn SettingsStore, key: &str, value: u32) -> Result<()> {
        store.set_uint(key, value)
    }
}

impl SettingsRepr for String {
    fn value(store: &dyn SettingsStore, key: &str) -> String {
        store.string(key)
    }

    fn set_value(store: &dyn SettingsStore, key: &str, value: String) -> Result<()> {
        store.set_string(key, &value)
    }
}

impl SettingsRepr for Vec<String> {
    fn value(store: &dyn SettingsStore, key: &str) -> Vec<String> {
        store.strv(key)
    }

    fn set_value(store: &dyn SettingsStore, key: &str, value: Vec<String>) -> Result<()> {
        store.set_strv(key, value)
    }
}

/// Enum stored by its nick.
pub struct EnumRepr(pub String);

impl SettingsRepr for EnumRepr {
    fn value(store: &dyn SettingsStore, key: &str) -> EnumRepr {
        EnumRepr(store.string(key))
    }

    fn set_value(store: &dyn SettingsStore, key: &str, value: EnumRepr) -> Result<()> {
        store.set_string(key, &value.0)
    }
}

pub trait TypeConvert<T, R> {
    fn from_repr(&self, value: R) -> T;
    fn to_repr(&self, value: T) -> R;
}

pub struct TypeConvertIdentity<T>(PhantomData<T>);

impl<T> TypeConvert<T, T> for TypeConvertIdentity<T> {
    fn from_repr(&self, value: T) -> T {
        value
    }

    fn to_repr(&self, value: T) -> T {
        value
    }
}

pub struct TypeConvertCallback<T, R> {
    pub from_repr: fn(R) -> T,
    pub to_repr: fn(T) -> R,
}

impl<T, R> TypeConvert<T, R> for TypeConvertCallback<T, R> {
    fn from_repr(&self, value: R) -> T {
        (self.from_repr)(value)
    }

    fn to_repr(&self, value: T) -> R {
        (self.to_repr)(value)
    }
}

/// Nick based conversion for `strum` enums. Unknown nicks map to the default.
pub struct EnumNickConvert<T>(PhantomData<T>);

impl<T> TypeConvert<T, EnumRepr> for EnumNickConvert<T>
where
    T: FromStr + Default + Into<&'static str>,
{
    fn from_repr(&self, value: EnumRepr) -> T {
        T::from_str(&value.0).unwrap_or_default()
    }

    fn to_repr(&self, value: T) -> EnumRepr {
        EnumRepr(Into::<&'static str>::into(value).to_string())
    }
}

pub const OPTIONAL_PATH_TYPE: TypeConvertCallback<Option<PathBuf>, String> = TypeConvertCallback {
    from_repr: |s: String| Some(s).filter(|s| !s.is_empty()).map(PathBuf::from),
    to_repr: |value| {
        value
            .as_ref()
            .and_then(|v| v.to_str())
            .unwrap_or_default()
            .to_owned()
    },
};

pub const DURATION_MILLIS_TYPE: TypeConvertCallback<Duration, u32> = TypeConvertCallback {
    from_repr: |d: u32| Duration::from_millis(d as u64),
    to_repr: |value| value.as_millis().try_into().unwrap_or_default(),
};

pub struct AppOption<T, R = T> {
    store: Rc<dyn SettingsStore>,
    key: &'static str,
    convert: Rc<dyn TypeConvert<T, R>>,
}

impl<T: 'static, R: SettingsRepr + 'static> AppOption<T, R> {
    pub fn new(
        store: &Rc<dyn SettingsStore>,
        key: &'static str,
        convert: impl TypeConvert<T, R> + 'static,
    ) -> Self {
        Self {
            store: store.clone(),
            key,
            convert: Rc::new(convert),
        }
    }

    pub fn key(&self) -> &'static str {
        self.key
    }

    pub fn get(&self) -> T {
        self.convert
            .from_repr(<R as SettingsRepr>::value(self.store.as_ref(), self.key))
    }

    pub fn set(&self, value: impl Into<T>) -> Result<()> {
        <R as SettingsRepr>::set_value(
            self.store.as_ref(),
            self.key,
            self.convert.to_repr(value.into()),
        )
    }

    pub fn connect_changed(&self, f: impl Fn(T) + 'static) -> HandlerId {
        let convert = self.convert.clone();
        let store = Rc::downgrade(&self.store);
        let key = self.key;
        self.store.connect_changed(
            Some(key),
            Rc::new(move |_: &str| {
                if let Some(store) = store.upgrade() {
                    f(convert.from_repr(<R as SettingsRepr>::value(store.as_ref(), key)));
                }
            }),
        )
    }

    pub fn disconnect(&self, handler: HandlerId) {
        self.store.disconnect(handler);
    }
}

impl<T: PartialEq + 'static, R: SettingsRepr + 'static> AppOption<T, R> {
    /// Writes only when the stored value differs. Returns whether a write happened.
    pub fn set_if_changed(&self, value: T) -> Result<bool> {
        if self.get() == value {
            return Ok(false);
        }
        self.set(value)?;
        Ok(true)
    }
}

impl<T: SettingsRepr + 'static> AppOption<T, T> {
    pub fn simple(store: &Rc<dyn SettingsStore>, key: &'static str) -> Self {
        Self::new(store, key, TypeConvertIdentity(PhantomData))
    }
}

impl<T> AppOption<T, EnumRepr>
where
    T: FromStr + Default + Into<&'static str> + 'static,
{
    pub fn nick(store: &Rc<dyn SettingsStore>, key: &'static str) -> Self {
        Self::new(store, key, EnumNickConvert(PhantomData))
    }
}

pub type BoolOption = AppOption<bool>;
pub type U32Option = AppOption<u32>;
pub type StringOption = AppOption<String>;
pub type StrvOption = AppOption<Vec<String>>;
pub type EnumOption<T> = AppOption<T, EnumRepr>;

pub struct GeneralOptions {
    pub case_sensitive: BoolOption,
    pub size_display_mode: EnumOption<SizeDisplayMode>,
    pub permissions_display_mode: EnumOption<PermissionDisplayMode>,
    pub date_display_format: StringOption,
    pub tab_lock_indicator: EnumOption<TabLockIndicator>,
    pub symlink_format: StringOption,
    pub select_dirs: BoolOption,
    pub show_hidden: BoolOption,
    pub show_backup: BoolOption,
    pub backup_pattern: StringOption,
    pub always_show_tabs: BoolOption,
    pub gui_update_rate: U32Option,
    pub directory_history_length: U32Option,
    pub save_directory_history_on_exit: BoolOption,
    pub directory_history: StrvOption,
    pub theme_icon_dir: AppOption<Option<PathBuf>, String>,
    pub document_icon_dir: AppOption<Option<PathBuf>, String>,
    pub color_mode: EnumOption<ColorMode>,
    pub save_tabs_on_exit: BoolOption,
    pub file_list_tabs: StrvOption,
    pub custom_colors: [StringOption; 8],
}

impl GeneralOptions {
    pub fn new(store: &Rc<dyn SettingsStore>) -> Self {
        Self {
            case_sensitive: AppOption::simple(store, keys::CASE_SENSITIVE),
            size_display_mode: AppOption::nick(store, keys::SIZE_DISPLAY_MODE),
            permissions_display_mode: AppOption::nick(store, keys::PERM_DISPLAY_MODE),
            date_display_format: AppOption::simple(store, keys::DATE_FORMAT),
            tab_lock_indicator: AppOption::nick(store, keys::TAB_LOCK_INDICATOR),
            symlink_format: AppOption::simple(store, keys::SYMLINK_PREFIX),
            select_dirs: AppOption::simple(store, keys::SELECT_DIRS),
            show_hidden: AppOption::simple(store, keys::SHOW_HIDDEN),
            show_backup: AppOption::simple(store, keys::SHOW_BACKUP),
            backup_pattern: AppOption::simple(store, keys::BACKUP_PATTERN),
            always_show_tabs: AppOption::simple(store, keys::ALWAYS_SHOW_TABS),
            gui_update_rate: AppOption::simple(store, keys::GUI_UPDATE_RATE),
            directory_history_length: AppOption::simple(store, keys::DIR_HISTORY_LENGTH),
            save_directory_history_on_exit: AppOption::simple(store, keys::SAVE_DIR_HISTORY),
            directory_history: AppOption::simple(store, keys::DIR_HISTORY),
            theme_icon_dir: AppOption::new(store, keys::THEME_ICON_DIR, OPTIONAL_PATH_TYPE),
            document_icon_dir: AppOption::new(store, keys::DOCUMENT_ICON_DIR, OPTIONAL_PATH_TYPE),
            color_mode: AppOption::nick(store, keys::COLOR_MODE),
            save_tabs_on_exit: AppOption::simple(store, keys::SAVE_TABS),
            file_list_tabs: AppOption::simple(store, keys::FILE_LIST_TABS),
            custom_colors: keys::CUSTOM_COLORS.map(|key| AppOption::simple(store, key)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::store::MemorySettingsStore;
    use crate::core::config::types::SizeDisplayMode;
    use std::cell::Cell;

    fn store() -> (Rc<MemorySettingsStore>, Rc<dyn SettingsStore>) {
        let concrete = Rc::new(MemorySettingsStore::new(default_schema()));
        let dynamic: Rc<dyn SettingsStore> = concrete.clone();
        (concrete, dynamic)
    }

    #[test]
    fn set_if_changed_skips_identical_values() {
        let (concrete, store) = store();
        let option = BoolOption::simple(&store, keys::CASE_SENSITIVE);
        assert!(!option.set_if_changed(false).unwrap());
        assert_eq!(concrete.write_count(), 0);
        assert!(option.set_if_changed(true).unwrap());
        assert_eq!(concrete.write_count(), 1);
        assert!(option.get());
    }

    #[test]
    fn enum_options_use_nicks_and_fall_back() {
        let (concrete, store) = store();
        let option = EnumOption::<SizeDisplayMode>::nick(&store, keys::SIZE_DISPLAY_MODE);
        assert_eq!(option.get(), SizeDisplayMode::Powered);
        option.set(SizeDisplayMode::Grouped).unwrap();
        assert_eq!(store.string(keys::SIZE_DISPLAY_MODE), "grouped");

        concrete.insert_raw(keys::SIZE_DISPLAY_MODE, SettingValue::Str("bogus".into()));
        assert_eq!(option.get(), SizeDisplayMode::Powered);
    }

    #[test]
    fn typed_change_subscription() {
        let (_, store) = store();
        let option = AppOption::new(&store, keys::GUI_UPDATE_RATE, DURATION_MILLIS_TYPE);
        let seen = Rc::new(Cell::new(Duration::ZERO));
        let sink = seen.clone();
        option.connect_changed(move |rate| sink.set(rate));
        option.set(Duration::from_millis(250)).unwrap();
        assert_eq!(seen.get(), Duration::from_millis(250));
    }

    #[test]
    fn optional_paths_treat_empty_as_none() {
        let (_, store) = store();
        let option = AppOption::new(&store, keys::THEME_ICON_DIR, OPTIONAL_PATH_TYPE);
        assert_eq!(option.get(), None);
        option.set(Some(PathBuf::from("/usr/share/icons"))).unwrap();
        assert_eq!(option.get(), Some(PathBuf::from("/usr/share/icons")));
    }
}
