//! Reader for Ren'Py RPA game archives.
//!
//! An `.rpa` file packs a visual novel's assets (images, audio, scripts)
//! into one sequential blob: an ASCII header line, member contents back to
//! back, and a zlib-compressed pickled index at the tail mapping each member
//! name to its byte range. This crate supports:
//!
//! - RPA-2.0 and RPA-3.0 archives (the latter XOR-obfuscates index values)
//! - Lazy extraction: only the index is held in memory, member contents are
//!   read on demand with a seek
//! - Strict validation of the index shape, with a distinct error for every
//!   way an archive can be malformed
//!
//! Archives are read-only; this crate does not write them.
//!
//! # Example
//!
//! ```no_run
//! use veles_rpa::RpaArchive;
//!
//! let archive = RpaArchive::open("game/archive.rpa")?;
//!
//! for name in archive.names()? {
//!     println!("{name}");
//! }
//!
//! let script = archive.get("script.rpy")?;
//! # Ok::<(), veles_rpa::Error>(())
//! ```

mod archive;
mod error;
mod header;
mod index;
mod pickle;

#[cfg(test)]
mod fixtures;

pub use archive::RpaArchive;
pub use error::{Error, Result};
pub use header::{Header, RpaVersion, MAGIC_V2, MAGIC_V3};
pub use index::IndexEntry;
pub use pickle::PickleError;
