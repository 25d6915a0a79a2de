//! Sequential index file writer.
//!
//! The writer walks a fixed sequence of states and rejects calls made out of
//! order with `InvalidState`:
//!
//! ```text
//! Empty -> HeaderWritten -> RecordSectionWritten -> MetadataWritten -> Closed
//! ```
//!
//! Bytes go to a private temp file next to the destination, renamed into
//! place by [`IndexWriter::close`]. Dropping the writer in any other state
//! (error return or panic) deletes the temp file and nothing else. On unix an
//! exclusive `flock` on `<index>.lock` is held for the writer's lifetime, so a
//! second writer for the same path fails instead of racing.

use crate::config::IndexConfig;
use crate::error::{IndexError, Result};
use crate::format::{IndexHeader, IndexKind, HEADER_LEN};
use crate::varint::encode_varint;
use std::ffi::OsString;
use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterState {
    Empty,
    HeaderWritten,
    RecordSectionWritten,
    MetadataWritten,
    Closed,
}

pub struct IndexWriter {
    path: PathBuf,
    temp_path: PathBuf,
    out: Option<BufWriter<File>>,
    kind: IndexKind,
    state: WriterState,
    records_len: u64,
    max_metadata_bytes: u64,
    _lock: WriteLock,
}

impl IndexWriter {
    /// Open a writer for `path`, deleting any existing index there first.
    ///
    /// Fails with `InvalidState` while another writer holds `path`.
    pub fn create(path: &Path, kind: IndexKind, config: &IndexConfig) -> Result<Self> {
        if path.file_name().is_none() {
            return Err(IndexError::invalid_config(format!(
                "index path {} has no file name",
                path.display()
            )));
        }
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let lock = WriteLock::acquire(&sibling(path, "lock"))?;

        if path.exists() {
            debug!(path = %path.display(), "removing existing index");
            std::fs::remove_file(path)?;
        }
        let n = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        let temp_path = sibling(path, &format!("{}-{n}.tmp", std::process::id()));
        let file = File::create(&temp_path)?;
        Ok(Self {
            path: path.to_path_buf(),
            temp_path,
            out: Some(BufWriter::new(file)),
            kind,
            state: WriterState::Empty,
            records_len: 0,
            max_metadata_bytes: config.max_metadata_bytes,
            _lock: lock,
        })
    }

    pub fn state(&self) -> WriterState {
        self.state
    }

    /// Destination path; the file appears there only once closed.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn expect_state(&self, expected: WriterState, op: &str) -> Result<()> {
        if self.state != expected {
            return Err(IndexError::invalid_state(format!(
                "{op} requires {expected:?}, writer is {:?}",
                self.state
            )));
        }
        Ok(())
    }

    fn out(&mut self) -> Result<&mut BufWriter<File>> {
        self.out
            .as_mut()
            .ok_or_else(|| IndexError::invalid_state("writer has no open file"))
    }

    /// Magic, version and a zero record-section length to be patched later.
    pub fn write_header(&mut self) -> Result<()> {
        self.expect_state(WriterState::Empty, "write_header")?;
        let mut buf = [0u8; HEADER_LEN];
        IndexHeader::new(self.kind).write_to(&mut buf);
        self.out()?.write_all(&buf)?;
        self.state = WriterState::HeaderWritten;
        Ok(())
    }

    /// Append one group blob; returns its offset within the record section.
    pub fn append_records(&mut self, blob: &[u8]) -> Result<u64> {
        self.expect_state(WriterState::HeaderWritten, "append_records")?;
        let offset = self.records_len;
        self.out()?.write_all(blob)?;
        self.records_len += blob.len() as u64;
        Ok(offset)
    }

    /// Close the record section and back-patch its length into the header.
    pub fn end_records(&mut self) -> Result<()> {
        self.expect_state(WriterState::HeaderWritten, "end_records")?;
        let records_len = self.records_len;
        let out = self.out()?;
        out.seek(SeekFrom::Start(24))?;
        out.write_all(&(records_len as i64).to_be_bytes())?;
        out.seek(SeekFrom::End(0))?;
        self.state = WriterState::RecordSectionWritten;
        Ok(())
    }

    /// Varint length followed by the metadata message.
    pub fn write_metadata(&mut self, message: &[u8]) -> Result<()> {
        self.expect_state(WriterState::RecordSectionWritten, "write_metadata")?;
        if message.len() as u64 > self.max_metadata_bytes {
            return Err(IndexError::invalid_config(format!(
                "metadata message of {} bytes exceeds max-metadata-bytes {}",
                message.len(),
                self.max_metadata_bytes
            )));
        }
        let mut len = Vec::with_capacity(10);
        encode_varint(message.len() as u64, &mut len);
        let out = self.out()?;
        out.write_all(&len)?;
        out.write_all(message)?;
        self.state = WriterState::MetadataWritten;
        Ok(())
    }

    /// Flush, sync and rename into place. The index exists only after this
    /// succeeds.
    pub fn close(mut self) -> Result<()> {
        self.expect_state(WriterState::MetadataWritten, "close")?;
        let out = self
            .out
            .take()
            .ok_or_else(|| IndexError::invalid_state("writer has no open file"))?;
        let file = out
            .into_inner()
            .map_err(|e| IndexError::Io(e.into_error()))?;
        file.sync_all()?;
        drop(file);
        std::fs::rename(&self.temp_path, &self.path)?;
        self.state = WriterState::Closed;
        info!(
            path = %self.path.display(),
            kind = %self.kind,
            records_len = self.records_len,
            "index written"
        );
        Ok(())
    }
}

impl Drop for IndexWriter {
    fn drop(&mut self) {
        if self.state == WriterState::Closed {
            return;
        }
        // Release the handle before unlinking.
        self.out.take();
        if let Err(e) = std::fs::remove_file(&self.temp_path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(
                    path = %self.temp_path.display(),
                    error = %e,
                    "failed to remove partial index"
                );
            }
        } else {
            warn!(path = %self.path.display(), state = ?self.state, "discarded partial index");
        }
    }
}

/// `<file name>.<suffix>` in the same directory as `path`.
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}

/// Exclusive advisory lock on a `.lock` file next to the index. The lock file
/// itself is left in place.
#[cfg(unix)]
struct WriteLock {
    file: File,
}

#[cfg(unix)]
impl WriteLock {
    fn acquire(path: &Path) -> Result<Self> {
        use std::os::unix::io::AsRawFd;

        let file = std::fs::OpenOptions::new()
            .create(true)
            .truncate(true)
            .read(true)
            .write(true)
            .open(path)?;
        let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
        if rc != 0 {
            let err = std::io::Error::last_os_error();
            if err.kind() == std::io::ErrorKind::WouldBlock {
                return Err(IndexError::invalid_state(format!(
                    "{} is held by another index writer",
                    path.display()
                )));
            }
            return Err(err.into());
        }
        Ok(Self { file })
    }
}

#[cfg(unix)]
impl Drop for WriteLock {
    fn drop(&mut self) {
        use std::os::unix::io::AsRawFd;

        unsafe {
            libc::flock(self.file.as_raw_fd(), libc::LOCK_UN);
        }
    }
}

#[cfg(not(unix))]
struct WriteLock;

#[cfg(not(unix))]
impl WriteLock {
    fn acquire(_path: &Path) -> Result<Self> {
        Ok(Self)
    }
}
