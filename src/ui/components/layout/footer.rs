//! Status line under a file list: what is selected out of what is shown.

use crate::core::config::types::SizeDisplayMode;
use crate::core::format::size_to_string;

/// Counts and byte totals over the visible entries of a list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelectionStats {
    pub total_files: usize,
    pub total_dirs: usize,
    pub total_bytes: u64,
    pub selected_files: usize,
    pub selected_dirs: usize,
    pub selected_bytes: u64,
}

impl SelectionStats {
    pub fn selected_count(&self) -> usize {
        self.selected_files + self.selected_dirs
    }

    pub fn total_count(&self) -> usize {
        self.total_files + self.total_dirs
    }
}

/// Renders e.g. `"1 024 of 2 048 kB in 1 of 3 files, 0 of 1 dir selected"`.
///
/// Sizes are shown in kB; the powered mode would make the unit ambiguous
/// and falls back to grouped digits.
pub fn format_selection_label(stats: &SelectionStats, mode: SizeDisplayMode) -> String {
    let mode = match mode {
        SizeDisplayMode::Powered => SizeDisplayMode::Grouped,
        other => other,
    };
    let selected = size_to_string(stats.selected_bytes / 1024, mode);
    let total = size_to_string(stats.total_bytes / 1024, mode);
    let files = if stats.total_files == 1 { "file" } else { "files" };
    let dirs = if stats.total_dirs == 1 { "dir" } else { "dirs" };
    format!(
        "{selected} of {total} kB in {} of {} {files}, {} of {} {dirs} selected",
        stats.selected_files, stats.total_files, stats.selected_dirs, stats.total_dirs
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_selection() {
        let stats = SelectionStats {
            total_files: 2,
            total_bytes: 4096,
            ..Default::default()
        };
        assert_eq!(
            format_selection_label(&stats, SizeDisplayMode::Plain),
            "0 of 4 kB in 0 of 2 files, 0 of 0 dirs selected"
        );
    }

    #[test]
    fn singular_and_grouping() {
        let stats = SelectionStats {
            total_files: 1,
            total_dirs: 1,
            total_bytes: 5 * 1024 * 1024,
            selected_files: 1,
            selected_bytes: 5 * 1024 * 1024,
            ..Default::default()
        };
        assert_eq!(
            format_selection_label(&stats, SizeDisplayMode::Powered),
            "5 120 of 5 120 kB in 1 of 1 file, 0 of 1 dir selected"
        );
        assert_eq!(stats.selected_count(), 1);
        assert_eq!(stats.total_count(), 2);
    }
}
