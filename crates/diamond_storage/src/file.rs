//! File-backed blob store.
//!
//! Blobs are appended to a single log file. Each record is:
//!
//! ```text
//! | magic "DBLB" (4) | kind (1) | len (4, LE) | payload (len) | crc32 (4, LE) |
//! ```
//!
//! Kind `0` is a blob; its handle is the record offset. Kind `1` is a release
//! marker whose payload is the released handle (8 bytes, BE). The checksum
//! covers kind, len and payload. The live index is rebuilt by scanning the log
//! on open; a torn or corrupt tail is cut off.

use crate::checksum::Crc32;
use crate::error::{StorageError, StorageResult};
use crate::handle::BlobHandle;
use crate::store::BlobStore;
use crate::MAX_BLOB_LEN;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Magic bytes opening every blob log record.
pub const RECORD_MAGIC: [u8; 4] = *b"DBLB";

const HEADER_SIZE: u64 = 9;
const CRC_SIZE: u64 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecordKind {
    Blob,
    Release,
}

impl RecordKind {
    const fn as_byte(self) -> u8 {
        match self {
            Self::Blob => 0,
            Self::Release => 1,
        }
    }

    const fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(Self::Blob),
            1 => Some(Self::Release),
            _ => None,
        }
    }
}

/// Summary of a blob log produced by a full scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogReport {
    /// Number of valid records (blobs and release markers).
    pub records: usize,
    /// Number of blob records ever written.
    pub blobs: usize,
    /// Number of release markers.
    pub releases: usize,
    /// Number of blobs still live.
    pub live_blobs: usize,
    /// Payload bytes held by live blobs.
    pub live_bytes: u64,
    /// Payload bytes held by released blobs.
    pub released_bytes: u64,
    /// Length of the valid record prefix.
    pub valid_len: u64,
    /// Length of the file on disk.
    pub file_len: u64,
}

impl LogReport {
    /// Returns `true` if the file carries bytes past the last valid record.
    #[must_use]
    pub fn has_torn_tail(&self) -> bool {
        self.file_len > self.valid_len
    }
}

struct Scan {
    index: HashMap<u64, u32>,
    report: LogReport,
}

/// A file-backed, append-only blob store.
///
/// # Durability
///
/// - `flush()` pushes buffered writes to the OS
/// - [`FileBlobStore::sync`] calls `File::sync_all()`
///
/// # Example
///
/// ```no_run
/// use diamond_storage::{BlobStore, FileBlobStore};
/// use std::path::Path;
///
/// let mut store = FileBlobStore::open(Path::new("shards.blob")).unwrap();
/// let handle = store.write(b"facet list").unwrap();
/// store.sync().unwrap();
/// ```
#[derive(Debug)]
pub struct FileBlobStore {
    path: PathBuf,
    file: Mutex<File>,
    size: u64,
    /// record offset -> payload length
    index: HashMap<u64, u32>,
    live_bytes: u64,
}

impl FileBlobStore {
    /// Opens or creates a blob log at `path` and rebuilds the live index.
    ///
    /// A torn tail left by an interrupted append is truncated away.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened, read or truncated, or if
    /// a checksummed release marker names a blob that was never written.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        let scan = scan_log(&mut file)?;
        if scan.report.has_torn_tail() {
            warn!(
                path = %path.display(),
                valid_len = scan.report.valid_len,
                file_len = scan.report.file_len,
                "truncating torn blob log tail"
            );
            file.set_len(scan.report.valid_len)?;
        }

        debug!(
            path = %path.display(),
            live = scan.report.live_blobs,
            released = scan.report.releases,
            "opened blob log"
        );

        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
            size: scan.report.valid_len,
            index: scan.index,
            live_bytes: scan.report.live_bytes,
        })
    }

    /// Opens or creates a blob log, creating parent directories if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if directories cannot be created or the log cannot be opened.
    pub fn open_with_create_dirs(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::open(path)
    }

    /// Scans an existing blob log without modifying it.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is structurally corrupt.
    pub fn inspect(path: &Path) -> StorageResult<LogReport> {
        let mut file = File::open(path)?;
        Ok(scan_log(&mut file)?.report)
    }

    /// Returns the path to the underlying file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the current log length in bytes.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Syncs data and metadata to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the sync fails.
    pub fn sync(&mut self) -> StorageResult<()> {
        let file = self.file.get_mut();
        file.flush()?;
        file.sync_all()?;
        Ok(())
    }

    fn append_record(&mut self, kind: RecordKind, payload: &[u8]) -> StorageResult<u64> {
        let len = u32::try_from(payload.len()).map_err(|_| StorageError::TooLarge {
            len: payload.len(),
            max: MAX_BLOB_LEN,
        })?;

        let total = HEADER_SIZE as usize + payload.len() + CRC_SIZE as usize;
        let mut record = Vec::with_capacity(total);
        record.extend_from_slice(&RECORD_MAGIC);
        record.push(kind.as_byte());
        record.extend_from_slice(&len.to_le_bytes());
        record.extend_from_slice(payload);
        let crc = Crc32::new().update(&record[4..]).finish();
        record.extend_from_slice(&crc.to_le_bytes());

        let offset = self.size;
        let file = self.file.get_mut();
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(&record)?;
        self.size += total as u64;
        Ok(offset)
    }
}

impl BlobStore for FileBlobStore {
    fn write(&mut self, data: &[u8]) -> StorageResult<BlobHandle> {
        if data.len() > MAX_BLOB_LEN {
            return Err(StorageError::TooLarge {
                len: data.len(),
                max: MAX_BLOB_LEN,
            });
        }

        let offset = self.append_record(RecordKind::Blob, data)?;
        // data.len() <= u32::MAX was checked above
        self.index.insert(offset, data.len() as u32);
        self.live_bytes += data.len() as u64;
        Ok(BlobHandle::from_raw(offset))
    }

    fn read(&self, handle: BlobHandle) -> StorageResult<Vec<u8>> {
        let offset = handle.as_u64();
        let len = *self
            .index
            .get(&offset)
            .ok_or_else(|| StorageError::not_found(handle))?;

        let mut file = self.file.lock();
        let header = read_exact_at(&mut file, offset + 4, 5)?;
        let payload = read_exact_at(&mut file, offset + HEADER_SIZE, len as usize)?;
        let stored = read_exact_at(&mut file, offset + HEADER_SIZE + u64::from(len), 4)?;

        let expected = Crc32::new().update(&header).update(&payload).finish();
        if expected.to_le_bytes() != stored[..] {
            return Err(StorageError::Corrupted(format!(
                "checksum mismatch for {handle}"
            )));
        }

        Ok(payload)
    }

    fn len_of(&self, handle: BlobHandle) -> StorageResult<usize> {
        self.index
            .get(&handle.as_u64())
            .map(|&len| len as usize)
            .ok_or_else(|| StorageError::not_found(handle))
    }

    fn contains(&self, handle: BlobHandle) -> bool {
        self.index.contains_key(&handle.as_u64())
    }

    fn release(&mut self, handle: BlobHandle) -> StorageResult<()> {
        let Some(&len) = self.index.get(&handle.as_u64()) else {
            return Err(StorageError::not_found(handle));
        };

        self.append_record(RecordKind::Release, &handle.to_be_bytes())?;
        self.index.remove(&handle.as_u64());
        self.live_bytes -= u64::from(len);
        Ok(())
    }

    fn live_count(&self) -> usize {
        self.index.len()
    }

    fn flush(&mut self) -> StorageResult<()> {
        self.file.get_mut().flush()?;
        Ok(())
    }
}

fn read_exact_at(file: &mut File, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
    let mut buffer = vec![0u8; len];
    if len > 0 {
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(&mut buffer)?;
    }
    Ok(buffer)
}

fn scan_log(file: &mut File) -> StorageResult<Scan> {
    let file_len = file.metadata()?.len();
    let mut index: HashMap<u64, u32> = HashMap::new();
    let mut report = LogReport {
        file_len,
        ..LogReport::default()
    };

    let mut offset = 0u64;
    while offset + HEADER_SIZE + CRC_SIZE <= file_len {
        let header = read_exact_at(file, offset, HEADER_SIZE as usize)?;
        if header[..4] != RECORD_MAGIC {
            break;
        }
        let Some(kind) = RecordKind::from_byte(header[4]) else {
            break;
        };
        let len = u32::from_le_bytes([header[5], header[6], header[7], header[8]]);
        let end = offset + HEADER_SIZE + u64::from(len) + CRC_SIZE;
        if end > file_len {
            break;
        }

        let payload = read_exact_at(file, offset + HEADER_SIZE, len as usize)?;
        let stored = read_exact_at(file, end - CRC_SIZE, CRC_SIZE as usize)?;
        let crc = Crc32::new().update(&header[4..]).update(&payload).finish();
        if crc.to_le_bytes() != stored[..] {
            break;
        }

        match kind {
            RecordKind::Blob => {
                index.insert(offset, len);
                report.blobs += 1;
                report.live_bytes += u64::from(len);
            }
            RecordKind::Release => {
                let bytes: [u8; 8] = payload.as_slice().try_into().map_err(|_| {
                    StorageError::Corrupted(format!(
                        "release marker at offset {offset} has {len}-byte payload"
                    ))
                })?;
                let released = BlobHandle::from_be_bytes(bytes);
                let released_len = index.remove(&released.as_u64()).ok_or_else(|| {
                    StorageError::Corrupted(format!(
                        "release marker at offset {offset} names unknown {released}"
                    ))
                })?;
                report.releases += 1;
                report.live_bytes -= u64::from(released_len);
                report.released_bytes += u64::from(released_len);
            }
        }

        report.records += 1;
        offset = end;
    }

    report.valid_len = offset;
    report.live_blobs = index.len();
    Ok(Scan { index, report })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_store() -> (TempDir, FileBlobStore) {
        let dir = TempDir::new().unwrap();
        let store = FileBlobStore::open(&dir.path().join("test.blob")).unwrap();
        (dir, store)
    }

    #[test]
    fn file_new_is_empty() {
        let (_dir, store) = temp_store();
        assert_eq!(store.size(), 0);
        assert_eq!(store.live_count(), 0);
    }

    #[test]
    fn file_write_then_read() {
        let (_dir, mut store) = temp_store();
        let first = store.write(b"hello").unwrap();
        let second = store.write(b"world!").unwrap();

        assert_eq!(first.as_u64(), 0);
        assert_eq!(second.as_u64(), HEADER_SIZE + 5 + CRC_SIZE);
        assert_eq!(store.read(first).unwrap(), b"hello");
        assert_eq!(store.read(second).unwrap(), b"world!");
        assert_eq!(store.len_of(second).unwrap(), 6);
    }

    #[test]
    fn file_read_unknown_handle_is_not_found() {
        let (_dir, mut store) = temp_store();
        store.write(b"hello").unwrap();
        // Offset inside a record is not a handle
        assert!(store.read(BlobHandle::from_raw(2)).unwrap_err().is_not_found());
    }

    #[test]
    fn file_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("persist.blob");

        let handle = {
            let mut store = FileBlobStore::open(&path).unwrap();
            let handle = store.write(b"persistent").unwrap();
            store.sync().unwrap();
            handle
        };

        let store = FileBlobStore::open(&path).unwrap();
        assert_eq!(store.read(handle).unwrap(), b"persistent");
        assert_eq!(store.live_count(), 1);
    }

    #[test]
    fn file_release_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("release.blob");

        let (kept, dropped) = {
            let mut store = FileBlobStore::open(&path).unwrap();
            let kept = store.write(b"kept").unwrap();
            let dropped = store.write(b"dropped").unwrap();
            store.release(dropped).unwrap();
            store.sync().unwrap();
            (kept, dropped)
        };

        let store = FileBlobStore::open(&path).unwrap();
        assert!(store.contains(kept));
        assert!(!store.contains(dropped));
        assert!(store.read(dropped).unwrap_err().is_not_found());

        let report = FileBlobStore::inspect(&path).unwrap();
        assert_eq!(report.blobs, 2);
        assert_eq!(report.releases, 1);
        assert_eq!(report.live_blobs, 1);
        assert_eq!(report.live_bytes, 4);
        assert_eq!(report.released_bytes, 7);
        assert!(!report.has_torn_tail());
    }

    #[test]
    fn file_torn_tail_is_truncated_on_open() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("torn.blob");

        let handle = {
            let mut store = FileBlobStore::open(&path).unwrap();
            let handle = store.write(b"complete").unwrap();
            store.sync().unwrap();
            handle
        };
        let valid_len = std::fs::metadata(&path).unwrap().len();

        // Simulate an interrupted append
        {
            let mut file = OpenOptions::new().append(true).open(&path).unwrap();
            file.write_all(b"DBLB\x00\xff\x00").unwrap();
        }

        let report = FileBlobStore::inspect(&path).unwrap();
        assert!(report.has_torn_tail());
        assert_eq!(report.valid_len, valid_len);

        let mut store = FileBlobStore::open(&path).unwrap();
        assert_eq!(store.size(), valid_len);
        assert_eq!(std::fs::metadata(&path).unwrap().len(), valid_len);
        assert_eq!(store.read(handle).unwrap(), b"complete");

        let next = store.write(b"after").unwrap();
        assert_eq!(next.as_u64(), valid_len);
    }

    #[test]
    fn file_corrupt_payload_stops_scan() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("corrupt.blob");
        {
            let mut store = FileBlobStore::open(&path).unwrap();
            store.write(b"first").unwrap();
            store.write(b"second").unwrap();
            store.sync().unwrap();
        }

        let mut bytes = std::fs::read(&path).unwrap();
        let second_payload = (HEADER_SIZE + 5 + CRC_SIZE + HEADER_SIZE) as usize;
        bytes[second_payload] ^= 0xFF;
        std::fs::write(&path, &bytes).unwrap();

        let report = FileBlobStore::inspect(&path).unwrap();
        assert_eq!(report.blobs, 1);
        assert!(report.has_torn_tail());
    }

    #[test]
    fn file_empty_blob() {
        let (_dir, mut store) = temp_store();
        let handle = store.write(b"").unwrap();
        assert!(store.read(handle).unwrap().is_empty());
        assert_eq!(store.size(), HEADER_SIZE + CRC_SIZE);
    }

    #[test]
    fn file_open_with_create_dirs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("deeper").join("x.blob");
        let store = FileBlobStore::open_with_create_dirs(&path).unwrap();
        assert_eq!(store.path(), path.as_path());
        assert!(path.exists());
    }
}
