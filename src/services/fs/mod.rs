pub mod listing;
pub mod local;
pub mod memory;
pub mod owners;
pub mod provider;
pub mod tree_size;
pub mod watcher;

pub use local::LocalVfs;
pub use memory::InMemoryVfs;
pub use provider::{
    validate_file_name, CancellationToken, DiskUsage, VfsError, VfsProvider, VfsResult,
};
