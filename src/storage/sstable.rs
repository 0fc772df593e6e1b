use crate::channels::DiskErrorChannels;
use crate::util::error::CheckedIoResult;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

#[cfg(not(unix))]
use std::io::{Read, Seek, SeekFrom};
#[cfg(unix)]
use std::os::unix::fs::FileExt;

/// Buffered sstable writer that flushes once buffered bytes exceed a threshold.
///
/// Writes, flushes and the final sync are checked on the sstable-write channel.
#[derive(Debug)]
pub struct SstableWriter {
    path: PathBuf,
    inner: BufWriter<File>,
    flush_threshold: usize,
    buffered: usize,
}

impl SstableWriter {
    pub fn create(
        channels: &DiskErrorChannels,
        path: impl Into<PathBuf>,
        capacity: usize,
        flush_threshold: usize,
    ) -> CheckedIoResult<Self> {
        let path = path.into();
        let file = channels.sstable_write_io_check().check(|| File::create(&path))?;
        Ok(Self {
            path,
            inner: BufWriter::with_capacity(capacity, file),
            flush_threshold,
            buffered: 0,
        })
    }

    pub fn write_all(&mut self, channels: &DiskErrorChannels, payload: &[u8]) -> CheckedIoResult<()> {
        channels
            .sstable_write_io_check()
            .check(|| self.inner.write_all(payload))?;
        self.buffered = self.buffered.saturating_add(payload.len());
        if self.flush_threshold > 0 && self.buffered >= self.flush_threshold {
            self.flush(channels)?;
        }
        Ok(())
    }

    pub fn flush(&mut self, channels: &DiskErrorChannels) -> CheckedIoResult<()> {
        channels.sstable_write_io_check().check(|| self.inner.flush())?;
        self.buffered = 0;
        Ok(())
    }

    /// Flushes, syncs and returns the underlying file.
    pub fn finish(mut self, channels: &DiskErrorChannels) -> CheckedIoResult<File> {
        self.flush(channels)?;
        let check = channels.sstable_write_io_check();
        let file = check.check(|| self.inner.into_inner().map_err(|err| err.into_error()))?;
        check.check(|| file.sync_all())?;
        Ok(file)
    }

    pub fn buffered_bytes(&self) -> usize {
        self.buffered
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Reads `len` bytes at `offset` from an sstable, checked on the sstable-read
/// channel. A short file surfaces as a non-system `UnexpectedEof`.
pub fn read_sstable_range(
    channels: &DiskErrorChannels,
    path: &Path,
    offset: u64,
    len: usize,
) -> CheckedIoResult<Vec<u8>> {
    let read = channels.sstable_read_io_check();
    #[allow(unused_mut)]
    let mut file = read.check(|| File::open(path))?;
    let mut buf = vec![0u8; len];
    read.check(|| {
        #[cfg(unix)]
        {
            file.read_exact_at(&mut buf, offset)?;
        }
        #[cfg(not(unix))]
        {
            file.seek(SeekFrom::Start(offset))?;
            file.read_exact(&mut buf)?;
        }
        Ok::<_, std::io::Error>(())
    })?;
    Ok(buf)
}
