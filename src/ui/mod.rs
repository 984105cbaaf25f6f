//! Toolkit independent presentation layer.
//!
//! Panes never draw. They describe what changed as [`UiEvent`]s and hand
//! them to a [`UiSurface`], which a frontend implements.

use std::cell::RefCell;
use std::path::PathBuf;

use crate::core::config::types::PaneSide;

pub mod app;
pub mod components;
pub mod theme;

pub use app::DualPane;
pub use components::file_list;
pub use components::tab_label::TabLabel;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    /// Styles or options changed; redraw everything of this pane.
    UpdateView { side: PaneSide },
    SelectedFilesLabel { side: PaneSide, text: String },
    TabLabel { side: PaneSide, index: usize, label: TabLabel },
    DirectoryChanged { side: PaneSide, path: PathBuf },
    TabOpened { side: PaneSide, index: usize },
    TabClosed { side: PaneSide, index: usize },
    ActiveChanged { side: PaneSide, active: bool },
}

pub trait UiSurface {
    fn emit(&self, event: UiEvent);
}

/// Discards everything. Used by the command line frontend.
#[derive(Debug, Default)]
pub struct NullSurface;

impl UiSurface for NullSurface {
    fn emit(&self, _event: UiEvent) {}
}

/// Keeps every event for later inspection.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    events: RefCell<Vec<UiEvent>>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<UiEvent> {
        self.events.borrow().clone()
    }

    /// Returns and forgets the recorded events.
    pub fn take(&self) -> Vec<UiEvent> {
        std::mem::take(&mut *self.events.borrow_mut())
    }

    pub fn last_selection_label(&self, side: PaneSide) -> Option<String> {
        self.events.borrow().iter().rev().find_map(|event| match event {
            UiEvent::SelectedFilesLabel { side: s, text } if *s == side => Some(text.clone()),
            _ => None,
        })
    }

    pub fn count(&self, predicate: impl Fn(&UiEvent) -> bool) -> usize {
        self.events.borrow().iter().filter(|e| predicate(e)).count()
    }
}

impl UiSurface for RecordingSurface {
    fn emit(&self, event: UiEvent) {
        self.events.borrow_mut().push(event);
    }
}
