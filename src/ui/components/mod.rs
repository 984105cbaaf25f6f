pub mod file_list;
pub mod history;
pub mod layout;
pub mod pane;
pub mod tab_label;

pub use file_list::FileList;
pub use history::History;
pub use pane::{Activation, BatchChoice, NavigationState, Pane, SymlinkReport};
