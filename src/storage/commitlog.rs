use crate::channels::DiskErrorChannels;
use crate::util::error::CheckedIoResult;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Seek, SeekFrom};
use std::path::{Path, PathBuf};

#[cfg(not(unix))]
use std::io::Write;
#[cfg(unix)]
use std::os::unix::fs::FileExt;

/// Append-only commit log writer that enforces `pwrite` → `fdatasync` ordering.
///
/// Every disk call goes through the commit channel of the owning context.
#[derive(Debug)]
pub struct CommitLogWriter {
    path: PathBuf,
    file: File,
    cursor: u64,
}

impl CommitLogWriter {
    pub fn open(channels: &DiskErrorChannels, path: impl Into<PathBuf>) -> CheckedIoResult<Self> {
        let path = path.into();
        let commit = channels.commit_io_check();
        if let Some(parent) = path.parent() {
            commit.check(|| fs::create_dir_all(parent))?;
        }
        let mut file = commit.check(|| {
            OpenOptions::new()
                .create(true)
                .read(true)
                .write(true)
                .truncate(false)
                .open(&path)
        })?;
        let cursor = commit.check(|| file.seek(SeekFrom::End(0)))?;
        Ok(Self { path, file, cursor })
    }

    pub fn append(
        &mut self,
        channels: &DiskErrorChannels,
        payload: &[u8],
    ) -> CheckedIoResult<CommitLogAppend> {
        let commit = channels.commit_io_check();
        let offset = self.cursor;
        let len = payload.len() as u64;
        commit.check(|| write_at(&mut self.file, payload, offset))?;
        self.cursor = self.cursor.saturating_add(len);
        commit.check(|| self.file.sync_data())?;
        Ok(CommitLogAppend { offset, len })
    }

    pub fn len(&self) -> u64 {
        self.cursor
    }

    pub fn is_empty(&self) -> bool {
        self.cursor == 0
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn write_at(file: &mut File, payload: &[u8], offset: u64) -> io::Result<()> {
    #[cfg(unix)]
    {
        file.write_all_at(payload, offset)?;
    }
    #[cfg(not(unix))]
    {
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(payload)?;
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitLogAppend {
    pub offset: u64,
    pub len: u64,
}
