//! Typed key/value settings stores.
//!
//! Every key has a schema default; reading a key that was never written
//! yields that default. Writes notify subscribers registered with
//! [`SettingsStore::connect_changed`].

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::errors::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Bool(bool),
    UInt(u32),
    Str(String),
    StrList(Vec<String>),
}

impl SettingValue {
    fn same_type(&self, other: &SettingValue) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }

    fn type_name(&self) -> &'static str {
        match self {
            SettingValue::Bool(_) => "bool",
            SettingValue::UInt(_) => "uint",
            SettingValue::Str(_) => "string",
            SettingValue::StrList(_) => "string list",
        }
    }
}

/// Key to default value mapping.
pub type Schema = BTreeMap<&'static str, SettingValue>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

pub type ChangeCallback = Rc<dyn Fn(&str)>;

pub trait SettingsStore {
    fn default_value(&self, key: &str) -> Option<SettingValue>;

    /// Stored value, or the schema default. `None` for unknown keys.
    fn value(&self, key: &str) -> Option<SettingValue>;

    fn set_value(&self, key: &str, value: SettingValue) -> Result<()>;

    /// Subscribes to writes of `key`, or of every key when `key` is `None`.
    fn connect_changed(&self, key: Option<&str>, callback: ChangeCallback) -> HandlerId;

    fn disconnect(&self, handler: HandlerId);

    fn boolean(&self, key: &str) -> bool {
        matches!(self.value(key), Some(SettingValue::Bool(true)))
    }

    fn uint(&self, key: &str) -> u32 {
        match self.value(key) {
            Some(SettingValue::UInt(v)) => v,
            _ => 0,
        }
    }

    fn string(&self, key: &str) -> String {
        match self.value(key) {
            Some(SettingValue::Str(s)) => s,
            _ => String::new(),
        }
    }

    fn strv(&self, key: &str) -> Vec<String> {
        match self.value(key) {
            Some(SettingValue::StrList(v)) => v,
            _ => Vec::new(),
        }
    }

    fn set_boolean(&self, key: &str, value: bool) -> Result<()> {
        self.set_value(key, SettingValue::Bool(value))
    }

    fn set_uint(&self, key: &str, value: u32) -> Result<()> {
        self.set_value(key, SettingValue::UInt(value))
    }

    fn set_string(&self, key: &str, value: &str) -> Result<()> {
        self.set_value(key, SettingValue::Str(value.to_string()))
    }

    fn set_strv(&self, key: &str, value: Vec<String>) -> Result<()> {
        self.set_value(key, SettingValue::StrList(value))
    }
}

struct Handler {
    id: HandlerId,
    key: Option<String>,
    callback: ChangeCallback,
}

/// In-process store. Also serves as the test double; `write_count` exposes
/// how many writes reached it.
pub struct MemorySettingsStore {
    schema: Schema,
    values: RefCell<BTreeMap<String, SettingValue>>,
    handlers: RefCell<Vec<Handler>>,
    next_handler: Cell<u64>,
    writes: Cell<usize>,
}

impl MemorySettingsStore {
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            values: RefCell::new(BTreeMap::new()),
            handlers: RefCell::new(Vec::new()),
            next_handler: Cell::new(1),
            writes: Cell::new(0),
        }
    }

    pub fn write_count(&self) -> usize {
        self.writes.get()
    }

    /// Stores a value without type checks or notifications. Used to load
    /// persisted data and by tests that simulate external edits.
    pub fn insert_raw(&self, key: &str, value: SettingValue) {
        self.values.borrow_mut().insert(key.to_string(), value);
    }

    fn stored(&self) -> BTreeMap<String, SettingValue> {
        self.values.borrow().clone()
    }

    fn notify(&self, key: &str) {
        let callbacks: Vec<ChangeCallback> = self
            .handlers
            .borrow()
            .iter()
            .filter(|h| h.key.as_deref().map_or(true, |k| k == key))
            .map(|h| h.callback.clone())
            .collect();
        for callback in callbacks {
            callback(key);
        }
    }
}

impl SettingsStore for MemorySettingsStore {
    fn default_value(&self, key: &str) -> Option<SettingValue> {
        self.schema.get(key).cloned()
    }

    fn value(&self, key: &str) -> Option<SettingValue> {
        let default = self.schema.get(key)?;
        match self.values.borrow().get(key) {
            Some(v) if v.same_type(default) => Some(v.clone()),
            Some(v) => {
                warn!(key, found = v.type_name(), "stored setting has wrong type, using default");
                Some(default.clone())
            }
            None => Some(default.clone()),
        }
    }

    fn set_value(&self, key: &str, value: SettingValue) -> Result<()> {
        let default = self
            .schema
            .get(key)
            .ok_or_else(|| Error::Settings(format!("unknown key '{key}'")))?;
        if !value.same_type(default) {
            return Err(Error::Settings(format!(
                "key '{key}' expects {}, got {}",
                default.type_name(),
                value.type_name()
            )));
        }
        self.values.borrow_mut().insert(key.to_string(), value);
        self.writes.set(self.writes.get() + 1);
        debug!(key, "setting written");
        self.notify(key);
        Ok(())
    }

    fn connect_changed(&self, key: Option<&str>, callback: ChangeCallback) -> HandlerId {
        let id = HandlerId(self.next_handler.get());
        self.next_handler.set(id.0 + 1);
        self.handlers.borrow_mut().push(Handler {
            id,
            key: key.map(str::to_string),
            callback,
        });
        id
    }

    fn disconnect(&self, handler: HandlerId) {
        self.handlers.borrow_mut().retain(|h| h.id != handler);
    }
}

/// File backed store. Values are kept in memory and written out as a JSON
/// object by [`JsonSettingsStore::flush`].
pub struct JsonSettingsStore {
    path: PathBuf,
    inner: MemorySettingsStore,
    dirty: Cell<bool>,
}

impl JsonSettingsStore {
    /// Opens `path`, starting empty when the file does not exist yet.
    pub fn open(path: impl Into<PathBuf>, schema: Schema) -> Result<Self> {
        let path = path.into();
        let inner = MemorySettingsStore::new(schema);
        if path.exists() {
            let text = fs::read_to_string(&path)?;
            let values: BTreeMap<String, SettingValue> = serde_json::from_str(&text)?;
            for (key, value) in values {
                if inner.default_value(&key).is_none() {
                    warn!(key = %key, path = %path.display(), "ignoring unknown setting");
                    continue;
                }
                inner.insert_raw(&key, value);
            }
        }
        Ok(Self {
            path,
            inner,
            dirty: Cell::new(false),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.get()
    }

    pub fn write_count(&self) -> usize {
        self.inner.write_count()
    }

    pub fn flush(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let text = serde_json::to_string_pretty(&self.inner.stored())?;
        fs::write(&self.path, text)?;
        self.dirty.set(false);
        debug!(path = %self.path.display(), "settings flushed");
        Ok(())
    }
}

impl SettingsStore for JsonSettingsStore {
    fn default_value(&self, key: &str) -> Option<SettingValue> {
        self.inner.default_value(key)
    }

    fn value(&self, key: &str) -> Option<SettingValue> {
        self.inner.value(key)
    }

    fn set_value(&self, key: &str, value: SettingValue) -> Result<()> {
        self.inner.set_value(key, value)?;
        self.dirty.set(true);
        Ok(())
    }

    fn connect_changed(&self, key: Option<&str>, callback: ChangeCallback) -> HandlerId {
        self.inner.connect_changed(key, callback)
    }

    fn disconnect(&self, handler: HandlerId) {
        self.inner.disconnect(handler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Schema {
        let mut schema = Schema::new();
        schema.insert("flag", SettingValue::Bool(false));
        schema.insert("rate", SettingValue::UInt(100));
        schema.insert("name", SettingValue::Str("x".into()));
        schema
    }

    #[test]
    fn defaults_are_returned_until_written() {
        let store = MemorySettingsStore::new(schema());
        assert_eq!(store.uint("rate"), 100);
        store.set_uint("rate", 50).unwrap();
        assert_eq!(store.uint("rate"), 50);
        assert_eq!(store.value("missing"), None);
        assert_eq!(store.write_count(), 1);
    }

    #[test]
    fn writes_are_type_checked() {
        let store = MemorySettingsStore::new(schema());
        assert!(store.set_string("rate", "fast").is_err());
        assert!(store.set_boolean("unknown", true).is_err());
        assert_eq!(store.write_count(), 0);
    }

    #[test]
    fn change_handlers_fire_and_disconnect() {
        let store = MemorySettingsStore::new(schema());
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let id = store.connect_changed(
            Some("flag"),
            Rc::new(move |key: &str| sink.borrow_mut().push(key.to_string())),
        );
        store.set_boolean("flag", true).unwrap();
        store.set_uint("rate", 1).unwrap();
        store.disconnect(id);
        store.set_boolean("flag", false).unwrap();
        assert_eq!(*seen.borrow(), vec!["flag".to_string()]);
    }

    #[test]
    fn json_store_persists_on_flush() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let store = JsonSettingsStore::open(&path, schema()).unwrap();
        store.set_string("name", "twin").unwrap();
        assert!(store.is_dirty());
        store.flush().unwrap();

        let reopened = JsonSettingsStore::open(&path, schema()).unwrap();
        assert_eq!(reopened.string("name"), "twin");
        assert!(!reopened.boolean("flag"));
    }
}
