//! Storage call sites that route every disk operation through a check wrapper.

pub mod commitlog;
pub mod dirs;
pub mod sstable;

pub use commitlog::{CommitLogAppend, CommitLogWriter};
#[cfg(unix)]
pub use dirs::sync_directory;
pub use dirs::{create_data_dir, remove_file_if_exists};
pub use sstable::{read_sstable_range, SstableWriter};
