//! Settings store, typed options and the in-memory configuration.

pub mod color;
pub mod data;
pub mod options;
pub mod store;
pub mod types;

pub use data::{ConfigData, Options, SharedOptions, TabState};
pub use store::{JsonSettingsStore, MemorySettingsStore, SettingsStore};
