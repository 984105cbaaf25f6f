use serde::{Deserialize, Serialize};

/// Kind of filesystem object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Regular,
    Directory,
    Symlink,
    Special,
    #[default]
    Unknown,
}

impl FileType {
    /// Single character used in listings.
    pub fn as_char(self) -> char {
        match self {
            FileType::Regular => '-',
            FileType::Directory => 'd',
            FileType::Symlink => 'l',
            FileType::Special => 's',
            FileType::Unknown => '?',
        }
    }
}

/// Snapshot of one filesystem object as reported by a provider.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FileMetadata {
    pub name: String,
    pub file_type: FileType,
    pub size: u64,
    /// Mode bits masked with `0o7777`.
    pub permissions: u32,
    pub uid: u32,
    pub gid: u32,
    /// Seconds since the epoch.
    pub accessed: i64,
    pub modified: i64,
    pub mime_type: Option<String>,
    pub symlink_target: Option<String>,
}

impl FileMetadata {
    pub fn new(name: impl Into<String>, file_type: FileType) -> Self {
        Self {
            name: name.into(),
            file_type,
            ..Default::default()
        }
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }

    pub fn with_permissions(mut self, permissions: u32) -> Self {
        self.permissions = permissions & 0o7777;
        self
    }

    pub fn with_owner(mut self, uid: u32, gid: u32) -> Self {
        self.uid = uid;
        self.gid = gid;
        self
    }

    pub fn with_modified(mut self, modified: i64) -> Self {
        self.modified = modified;
        self
    }

    pub fn is_dir(&self) -> bool {
        self.file_type == FileType::Directory
    }

    pub fn is_regular(&self) -> bool {
        self.file_type == FileType::Regular
    }
}

/// Best effort MIME type from a file name's extension.
pub fn guess_mime_type(name: &str, file_type: FileType) -> Option<String> {
    if file_type == FileType::Directory {
        return Some("inode/directory".to_string());
    }
    if file_type == FileType::Symlink {
        return Some("inode/symlink".to_string());
    }
    let ext = name.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase())?;
    let mime = match ext.as_str() {
        "txt" | "log" => "text/plain",
        "md" => "text/markdown",
        "rs" => "text/x-rust",
        "c" | "h" => "text/x-csrc",
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "json" => "application/json",
        "xml" => "application/xml",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "gz" => "application/gzip",
        "tar" => "application/x-tar",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "mp3" => "audio/mpeg",
        "ogg" => "audio/ogg",
        "mp4" => "video/mp4",
        "sh" => "application/x-shellscript",
        _ => return None,
    };
    Some(mime.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_guess_uses_extension() {
        assert_eq!(
            guess_mime_type("photo.JPG", FileType::Regular).as_deref(),
            Some("image/jpeg")
        );
        assert_eq!(guess_mime_type("README", FileType::Regular), None);
        assert_eq!(
            guess_mime_type("src", FileType::Directory).as_deref(),
            Some("inode/directory")
        );
    }
}
