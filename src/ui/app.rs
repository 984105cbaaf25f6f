use std::path::Path;
use std::rc::Rc;

use tracing::info;

use crate::core::config::data::{SharedOptions, TabState};
use crate::core::config::types::PaneSide;
use crate::core::errors::Result;
use crate::models::{Connection, ConnectionList};
use crate::ui::components::pane::Pane;
use crate::ui::UiSurface;

/// The two panes and which of them has the focus.
pub struct DualPane {
    left: Pane,
    right: Pane,
    active: PaneSide,
}

impl DualPane {
    /// Both panes start on `path` of `connection`; the left one is active.
    pub fn new(
        connection: Rc<Connection>,
        path: &Path,
        options: SharedOptions,
        surface: Rc<dyn UiSurface>,
    ) -> Result<Self> {
        let left = Pane::new(
            PaneSide::Left,
            connection.clone(),
            path,
            options.clone(),
            surface.clone(),
        )?;
        let right = Pane::new(PaneSide::Right, connection, path, options, surface)?;
        let mut panes = Self {
            left,
            right,
            active: PaneSide::Left,
        };
        panes.left.set_active(true);
        panes.right.set_active(false);
        Ok(panes)
    }

    pub fn active_side(&self) -> PaneSide {
        self.active
    }

    pub fn pane(&self, side: PaneSide) -> &Pane {
        match side {
            PaneSide::Left => &self.left,
            PaneSide::Right => &self.right,
        }
    }

    pub fn pane_mut(&mut self, side: PaneSide) -> &mut Pane {
        match side {
            PaneSide::Left => &mut self.left,
            PaneSide::Right => &mut self.right,
        }
    }

    pub fn active_pane(&self) -> &Pane {
        self.pane(self.active)
    }

    pub fn active_pane_mut(&mut self) -> &mut Pane {
        self.pane_mut(self.active)
    }

    pub fn inactive_pane(&self) -> &Pane {
        self.pane(self.active.opposite())
    }

    pub fn inactive_pane_mut(&mut self) -> &mut Pane {
        self.pane_mut(self.active.opposite())
    }

    pub fn set_active(&mut self, side: PaneSide) {
        if side == self.active {
            return;
        }
        self.pane_mut(self.active).set_active(false);
        self.active = side;
        self.pane_mut(side).set_active(true);
    }

    /// Gives the focus to the other pane.
    pub fn switch_active(&mut self) {
        self.set_active(self.active.opposite());
    }

    pub fn set_options(&mut self, options: SharedOptions) {
        self.left.set_options(options.clone());
        self.right.set_options(options);
    }

    /// Tabs of both panes, left first.
    pub fn save_tabs(&self) -> Vec<TabState> {
        let mut tabs = self.left.save_tabs();
        tabs.extend(self.right.save_tabs());
        tabs
    }

    pub fn restore_tabs(&mut self, saved: &[TabState], connections: &ConnectionList) -> usize {
        let restored =
            self.left.restore_tabs(saved, connections) + self.right.restore_tabs(saved, connections);
        info!(restored, "saved tabs restored");
        restored
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::data::Options;
    use crate::services::fs::memory::InMemoryVfs;
    use crate::ui::{RecordingSurface, UiEvent};
    use std::sync::Arc;

    #[test]
    fn switching_moves_the_focus() {
        let vfs = InMemoryVfs::default();
        vfs.add_dir("/srv");
        let connection = Rc::new(Connection::new("mem", "Memory", Arc::new(vfs), "/"));
        let surface = Rc::new(RecordingSurface::new());
        let mut panes = DualPane::new(
            connection,
            Path::new("/srv"),
            Rc::new(Options::default()),
            surface.clone(),
        )
        .unwrap();
        assert!(panes.active_pane().is_active());
        assert!(!panes.inactive_pane().is_active());

        surface.take();
        panes.switch_active();
        assert_eq!(panes.active_side(), PaneSide::Right);
        assert_eq!(
            surface.events(),
            vec![
                UiEvent::ActiveChanged {
                    side: PaneSide::Left,
                    active: false
                },
                UiEvent::ActiveChanged {
                    side: PaneSide::Right,
                    active: true
                },
            ]
        );
    }
}
