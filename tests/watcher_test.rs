use anyhow::Result;
use std::fs;
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;
use tempfile::tempdir;
use tokio::sync::mpsc;
use tokio::time::timeout;
use twinpane::core::config::data::Options;
use twinpane::core::config::types::PaneSide;
use twinpane::models::Connection;
use twinpane::services::fs::watcher::DirectoryWatcher;
use twinpane::ui::components::Pane;
use twinpane::ui::RecordingSurface;

#[tokio::test]
async fn watcher_reports_the_changed_directory() -> Result<()> {
    let temp_root = tempdir()?;
    let watch_root = fs::canonicalize(temp_root.path())?;

    let (tx, mut rx) = mpsc::channel(100);
    let _watcher = DirectoryWatcher::new(watch_root.clone(), tx, Duration::from_millis(100))?;

    fs::write(watch_root.join("new_file.txt"), "Initial content")?;

    let dirs = timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for watcher event")
        .expect("channel closed unexpectedly");
    assert!(dirs.contains(&watch_root), "got {dirs:?}");

    Ok(())
}

#[tokio::test]
async fn reported_directories_reload_open_tabs() -> Result<()> {
    let temp_root = tempdir()?;
    let watch_root = fs::canonicalize(temp_root.path())?;
    fs::write(watch_root.join("before.txt"), "x")?;

    let surface = Rc::new(RecordingSurface::new());
    let mut pane = Pane::new(
        PaneSide::Left,
        Rc::new(Connection::home("/")),
        &watch_root,
        Rc::new(Options::default()),
        surface.clone(),
    )?;
    assert!(pane.file_list().find("before.txt").is_some());

    let (tx, mut rx) = mpsc::channel(100);
    let _watcher = DirectoryWatcher::new(watch_root.clone(), tx, Duration::from_millis(100))?;
    fs::write(watch_root.join("after.txt"), "y")?;

    let dirs = timeout(Duration::from_secs(2), rx.recv())
        .await?
        .expect("channel closed unexpectedly");
    let reloaded: usize = dirs.iter().map(|d| pane.reload_directory(d)).sum();

    assert_eq!(reloaded, 1);
    assert!(pane.file_list().find("after.txt").is_some());
    assert!(surface.last_selection_label(PaneSide::Left).is_some());
    assert!(pane.reload_directory(Path::new("/definitely/not/open")) == 0);
    Ok(())
}
