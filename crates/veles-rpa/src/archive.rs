//! RPA archive accessor.

use std::collections::HashMap;
use std::fs::File;
use std::io::{Cursor, ErrorKind, Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Mutex;

use crate::header::{Header, RpaVersion};
use crate::index::{self, IndexEntry};
use crate::{Error, Result};

/// A Ren'Py archive opened for reading.
///
/// Construction parses the header and the full index up front; a malformed
/// archive fails here, never later. Member contents stay on disk and are
/// read on demand with a seek, since a single archive routinely packs an
/// entire game's assets.
///
/// The backing stream sits behind a mutex because every [`get`] repositions
/// its cursor, so the archive can be shared across threads (`Sync` whenever
/// `R: Send`) with reads serialized internally.
///
/// [`get`]: RpaArchive::get
pub struct RpaArchive<R> {
    /// Backing stream; `None` once the archive has been closed.
    stream: Mutex<Option<R>>,
    version: RpaVersion,
    index: HashMap<String, IndexEntry>,
}

impl RpaArchive<File> {
    /// Open an archive file from disk.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_reader(File::open(path)?)
    }
}

impl RpaArchive<Cursor<Vec<u8>>> {
    /// Open an archive held entirely in memory.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        Self::from_reader(Cursor::new(data))
    }
}

impl<R: Read + Seek> RpaArchive<R> {
    /// Open an archive from any readable, seekable byte source.
    ///
    /// Takes ownership of the stream; it is released when the archive is
    /// dropped or explicitly [`close`]d, including when construction itself
    /// fails partway through.
    ///
    /// [`close`]: RpaArchive::close
    pub fn from_reader(mut stream: R) -> Result<Self> {
        let header = Header::read(&mut stream)?;
        let index = index::read_index(&mut stream, header.index_offset, header.key)?;

        // The index is untrusted input: an entry pointing past end of stream
        // would otherwise only surface as a short read much later.
        let archive_len = stream.seek(SeekFrom::End(0))?;
        for (name, entry) in &index {
            if entry.end() > archive_len {
                return Err(Error::EntryOutOfRange {
                    name: name.clone(),
                    offset: entry.offset(),
                    length: entry.length(),
                    archive_len,
                });
            }
        }

        Ok(Self {
            stream: Mutex::new(Some(stream)),
            version: header.version,
            index,
        })
    }

    /// Read one member's full contents into an owned buffer.
    ///
    /// Fails with [`Error::NotFound`] for unknown names and [`Error::Closed`]
    /// after [`close`]; both leave the archive usable for further calls.
    ///
    /// [`close`]: RpaArchive::close
    pub fn get(&self, name: &str) -> Result<Vec<u8>> {
        let entry = self
            .index
            .get(name)
            .ok_or_else(|| Error::NotFound(name.to_string()))?;

        let mut guard = self.stream.lock().unwrap();
        let stream = guard.as_mut().ok_or(Error::Closed)?;

        stream.seek(SeekFrom::Start(entry.offset()))?;
        let mut data = vec![0u8; entry.length() as usize];
        stream.read_exact(&mut data).map_err(|e| {
            if e.kind() == ErrorKind::UnexpectedEof {
                Error::TruncatedRead {
                    name: name.to_string(),
                    expected: entry.length(),
                }
            } else {
                Error::Io(e)
            }
        })?;

        Ok(data)
    }

    /// Iterate over all member names, in no particular order.
    ///
    /// The iterator is restartable: call again for a fresh enumeration.
    pub fn names(&self) -> Result<impl Iterator<Item = &str> + '_> {
        if self.stream.lock().unwrap().is_none() {
            return Err(Error::Closed);
        }
        Ok(self.index.keys().map(String::as_str))
    }

    /// Release the backing stream.
    ///
    /// Idempotent: closing an already-closed archive is a no-op. Subsequent
    /// [`get`] and [`names`] calls fail with [`Error::Closed`].
    ///
    /// [`get`]: RpaArchive::get
    /// [`names`]: RpaArchive::names
    pub fn close(&self) {
        self.stream.lock().unwrap().take();
    }
}

impl<R> RpaArchive<R> {
    /// Format version of this archive.
    #[inline]
    pub fn version(&self) -> RpaVersion {
        self.version
    }

    /// Number of members in the archive.
    #[inline]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Whether the archive contains no members.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Whether a member with this name exists.
    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Look up a member's index entry without reading its contents.
    #[inline]
    pub fn entry(&self, name: &str) -> Option<IndexEntry> {
        self.index.get(name).copied()
    }
}

impl<R> std::fmt::Debug for RpaArchive<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpaArchive")
            .field("version", &self.version)
            .field("members", &self.index.len())
            .finish()
    }
}
