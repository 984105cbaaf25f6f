use std::path::PathBuf;

use thiserror::Error;

use crate::services::fs::VfsError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Vfs(#[from] VfsError),
    #[error("settings error: {0}")]
    Settings(String),
    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),
    #[error("tab {0} is locked")]
    TabLocked(usize),
    #[error("no tab at index {0}")]
    NoSuchTab(usize),
    #[error("connection '{0}' is not open")]
    ConnectionClosed(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("other error: {0}")]
    Other(String),
}
