use crate::channels::DiskErrorChannels;
use crate::util::error::{CheckedIoResult, IoCheckError};
use std::fs;
use std::io;
use std::path::Path;

pub fn create_data_dir(channels: &DiskErrorChannels, path: &Path) -> CheckedIoResult<()> {
    channels.io_check().check(|| fs::create_dir_all(path))
}

/// Returns whether a file was removed. A missing file is not an error.
pub fn remove_file_if_exists(channels: &DiskErrorChannels, path: &Path) -> CheckedIoResult<bool> {
    match channels.io_check().check(|| fs::remove_file(path)) {
        Ok(()) => Ok(true),
        Err(IoCheckError::Passthrough(err)) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err),
    }
}

/// Persists directory entries (creates, renames) by syncing the directory.
#[cfg(unix)]
pub fn sync_directory(channels: &DiskErrorChannels, path: &Path) -> CheckedIoResult<()> {
    let check = channels.io_check();
    let dir = check.check(|| fs::File::open(path))?;
    check.check(|| dir.sync_all())
}
