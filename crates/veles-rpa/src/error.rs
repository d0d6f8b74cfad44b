//! Error types for the RPA crate.

use thiserror::Error;

use crate::pickle::PickleError;

/// Errors that can occur when working with RPA archives.
///
/// Every construction-time failure is terminal: no partially indexed archive
/// is ever returned. [`Error::NotFound`] and [`Error::TruncatedRead`] are
/// local to a single read and leave the archive usable.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The leading magic bytes are not a known RPA version token.
    #[error("unsupported archive format {magic:?}")]
    UnsupportedFormat { magic: String },

    /// The header line is not terminated by a newline before end of stream.
    #[error("archive header is missing a newline terminator")]
    MissingHeaderTerminator,

    /// A required header token is absent.
    #[error("archive header is missing the {field} field")]
    MissingHeaderField { field: &'static str },

    /// A header token could not be parsed as hexadecimal.
    #[error("archive header field {field} has invalid value {value:?}")]
    InvalidHeaderField { field: &'static str, value: String },

    /// The compressed index payload could not be inflated.
    #[error("corrupt archive index: {0}")]
    CorruptIndex(String),

    /// The inflated index payload is not a well-formed pickle stream.
    #[error("corrupt archive index: {0}")]
    Pickle(#[from] PickleError),

    /// The decoded index is not a mapping at the top level.
    #[error("decoded archive index is not a mapping (got {actual})")]
    IndexNotMap { actual: &'static str },

    /// An index key (member name) is not a string.
    #[error("archive index key is not a string (got {actual})")]
    NonStringKey { actual: &'static str },

    /// An index entry does not have the expected `[(offset, length, "")]` shape.
    #[error("index entry for {member:?} is malformed: {reason}")]
    StructuralMismatch { member: String, reason: String },

    /// An index entry points past the end of the archive.
    #[error(
        "index entry for {name:?} is out of range: \
         offset {offset} + length {length} exceeds archive size {archive_len}"
    )]
    EntryOutOfRange {
        name: String,
        offset: u64,
        length: u32,
        archive_len: u64,
    },

    /// The requested member does not exist in the index.
    #[error("file {0:?} does not exist in this archive")]
    NotFound(String),

    /// The stream ended before the member's full contents could be read.
    #[error("file {name:?} is truncated: expected {expected} bytes")]
    TruncatedRead { name: String, expected: u32 },

    /// The archive was closed before this operation.
    #[error("archive has been closed")]
    Closed,
}

/// Result type for RPA operations.
pub type Result<T> = std::result::Result<T, Error>;
