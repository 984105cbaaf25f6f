use std::path::Path;
use std::sync::Arc;

use tokio::task;

use crate::core::errors::{Error, Result};
use crate::models::collation::{CasePolicy, CollationKey};
use crate::models::metadata::FileMetadata;
use crate::services::fs::provider::VfsProvider;

pub struct ListParams<'a> {
    pub path: &'a Path,
    pub limit: usize,
    pub cursor: Option<&'a str>,
    pub case_policy: CasePolicy,
}

#[derive(Debug)]
pub struct ListResult {
    pub entries: Vec<FileMetadata>,
    pub next_cursor: Option<String>,
}

pub async fn list_dir(provider: Arc<dyn VfsProvider>, params: ListParams<'_>) -> Result<ListResult> {
    // Provider calls block, keep them off the async executor.
    let path = params.path.to_path_buf();
    let limit = params.limit;
    let cursor = params.cursor.map(str::to_string);
    let policy = params.case_policy;

    task::spawn_blocking(move || list_dir_impl(provider.as_ref(), &path, limit, cursor.as_deref(), policy))
        .await
        .map_err(|e| Error::Other(format!("listing task failed: {e}")))?
}

/// Synchronous variant for callers without an async runtime.
pub fn list_dir_sync(provider: &dyn VfsProvider, params: ListParams<'_>) -> Result<ListResult> {
    list_dir_impl(
        provider,
        params.path,
        params.limit,
        params.cursor,
        params.case_policy,
    )
}

fn list_dir_impl(
    provider: &dyn VfsProvider,
    dir: &Path,
    limit: usize,
    cursor: Option<&str>,
    policy: CasePolicy,
) -> Result<ListResult> {
    let mut entries: Vec<(CollationKey, FileMetadata)> = provider
        .list(dir)?
        .into_iter()
        .map(|m| (CollationKey::for_filename(&m.name, policy), m))
        .collect();
    // Directories first, then natural name order, so pages are stable.
    entries.sort_by(|a, b| b.1.is_dir().cmp(&a.1.is_dir()).then_with(|| a.0.cmp(&b.0)));

    let total = entries.len();
    let offset = cursor
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(0)
        .min(total);
    let end = offset.saturating_add(limit).min(total);

    let next_cursor = if end < total {
        Some(end.to_string())
    } else {
        None
    };

    Ok(ListResult {
        entries: entries
            .drain(offset..end)
            .map(|(_, meta)| meta)
            .collect(),
        next_cursor,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::fs::memory::InMemoryVfs;

    fn vfs() -> InMemoryVfs {
        let vfs = InMemoryVfs::default();
        vfs.add_file("/d/file10", 1)
            .add_file("/d/file2", 1)
            .add_dir("/d/zdir")
            .add_file("/d/File1", 1);
        vfs
    }

    #[test]
    fn pages_through_sorted_entries() {
        let vfs = vfs();
        let first = list_dir_sync(
            &vfs,
            ListParams {
                path: Path::new("/d"),
                limit: 2,
                cursor: None,
                case_policy: CasePolicy::Insensitive,
            },
        )
        .unwrap();
        let names: Vec<&str> = first.entries.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["zdir", "File1"]);
        assert_eq!(first.next_cursor.as_deref(), Some("2"));

        let second = list_dir_sync(
            &vfs,
            ListParams {
                path: Path::new("/d"),
                limit: 10,
                cursor: first.next_cursor.as_deref(),
                case_policy: CasePolicy::Insensitive,
            },
        )
        .unwrap();
        let names: Vec<&str> = second.entries.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["file2", "file10"]);
        assert!(second.next_cursor.is_none());
    }

    #[tokio::test]
    async fn async_listing_matches_sync() {
        let provider: Arc<dyn VfsProvider> = Arc::new(vfs());
        let result = list_dir(
            provider,
            ListParams {
                path: Path::new("/d"),
                limit: 100,
                cursor: None,
                case_policy: CasePolicy::Sensitive,
            },
        )
        .await
        .unwrap();
        assert_eq!(result.entries.len(), 4);
    }
}
