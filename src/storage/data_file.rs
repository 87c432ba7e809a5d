//! Data File
//!
//! Append-only payload file with exclusive offset allocation.

use std::fs::{File, OpenOptions, TryLockError};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::error::{BlobError, Result};

/// Append-only payload file
///
/// ## Concurrency:
/// - `writer`: "read end, then append" is atomic under its lock
/// - `reader`: a separate handle used only for positioned reads, so reads
///   share it without a lock and never wait on appends
pub struct DataFile {
    path: PathBuf,
    writer: Mutex<Appender>,
    reader: File,
}

/// Write handle plus the current end of file
struct Appender {
    /// Holds the exclusive OS lock
    file: File,
    end: u64,
}

impl DataFile {
    /// Open or create the data file, locking it against other instances
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        match file.try_lock() {
            Ok(()) => {}
            Err(TryLockError::WouldBlock) => {
                return Err(BlobError::IoConflict(path.display().to_string()));
            }
            Err(TryLockError::Error(e)) => return Err(e.into()),
        }

        let end = file.metadata()?.len();
        let reader = File::open(&path)?;

        tracing::debug!(path = %path.display(), len = end, "Opened data file");

        Ok(Self {
            path,
            writer: Mutex::new(Appender { file, end }),
            reader,
        })
    }

    /// Append `bytes`, returning the offset they were written at
    pub fn append(&self, bytes: &[u8]) -> Result<u64> {
        let mut writer = self.writer.lock();
        let offset = writer.end;

        writer.file.seek(SeekFrom::Start(offset))?;
        writer.file.write_all(bytes)?;
        writer.end = offset + bytes.len() as u64;

        Ok(offset)
    }

    /// Read exactly `size` bytes at `offset`
    pub fn read_at(&self, offset: u64, size: u64) -> Result<Vec<u8>> {
        let mut buffer = vec![0u8; size as usize];
        read_exact_at(&self.reader, &mut buffer, offset)?;
        Ok(buffer)
    }

    /// Flush written bytes to disk
    pub fn sync(&self) -> Result<()> {
        self.writer.lock().file.sync_all()?;
        Ok(())
    }

    /// Current length (next append offset)
    pub fn len(&self) -> u64 {
        self.writer.lock().end
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(unix)]
fn read_exact_at(file: &File, buf: &mut [u8], offset: u64) -> io::Result<()> {
    use std::os::unix::fs::FileExt;
    file.read_exact_at(buf, offset)
}

#[cfg(windows)]
fn read_exact_at(file: &File, mut buf: &mut [u8], mut offset: u64) -> io::Result<()> {
    use std::os::windows::fs::FileExt;
    while !buf.is_empty() {
        match file.seek_read(buf, offset) {
            Ok(0) => return Err(io::ErrorKind::UnexpectedEof.into()),
            Ok(n) => {
                buf = &mut buf[n..];
                offset += n as u64;
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}
