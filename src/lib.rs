//! Core of a two pane file manager: file entries and their caches, tabbed
//! panes with directory history, configuration and filesystem providers.
//! Rendering is left to a frontend implementing [`ui::UiSurface`].

pub mod core;
pub mod models;
pub mod services;
pub mod ui;
