pub mod collation;
pub mod connection;
pub mod directory;
pub mod file_entry;
pub mod metadata;

pub use connection::{Connection, ConnectionList};
pub use directory::DirectoryEvent;
pub use file_entry::{FileEntry, FileNode};
pub use metadata::{FileMetadata, FileType};
