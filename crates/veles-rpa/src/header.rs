//! RPA header parsing.
//!
//! An archive opens with a short ASCII line:
//!
//! ```text
//! RPA-3.0 <index offset, hex> <obfuscation key, hex>\n
//! RPA-2.0 <index offset, hex>\n
//! ```
//!
//! The magic token selects the format version, the remaining space-separated
//! tokens locate the compressed index and, for RPA-3.0, carry the 32-bit key
//! that is XORed against every raw offset and length in the index.

use std::io::{Read, Seek, SeekFrom};

use memchr::memchr;

use crate::{Error, Result};

/// Magic token for version 2.0 archives.
pub const MAGIC_V2: &[u8; 7] = b"RPA-2.0";
/// Magic token for version 3.0 archives.
pub const MAGIC_V3: &[u8; 7] = b"RPA-3.0";

/// Archive format version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpaVersion {
    /// RPA-2.0: plain offsets and lengths.
    V2,
    /// RPA-3.0: offsets and lengths obfuscated with a per-archive XOR key.
    V3,
}

impl std::fmt::Display for RpaVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RpaVersion::V2 => f.write_str("RPA-2.0"),
            RpaVersion::V3 => f.write_str("RPA-3.0"),
        }
    }
}

/// Parsed archive header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Format version declared by the magic token.
    pub version: RpaVersion,
    /// Byte offset of the zlib-compressed index.
    pub index_offset: u64,
    /// De-obfuscation key, present for RPA-3.0 only.
    pub key: Option<u32>,
}

impl Header {
    /// Read and parse the header from the start of `stream`.
    ///
    /// On an unrecognized magic token the stream has been consumed exactly 7
    /// bytes, nothing further.
    pub fn read<R: Read + Seek>(stream: &mut R) -> Result<Self> {
        stream.seek(SeekFrom::Start(0))?;

        let mut magic = [0u8; 7];
        stream.read_exact(&mut magic)?;
        let version = match &magic {
            MAGIC_V2 => RpaVersion::V2,
            MAGIC_V3 => RpaVersion::V3,
            _ => {
                return Err(Error::UnsupportedFormat {
                    magic: String::from_utf8_lossy(&magic).into_owned(),
                })
            }
        };

        // Single separator byte between the magic and the header body.
        stream.seek(SeekFrom::Current(1))?;

        let body_len = line_length(stream)?;
        let mut body = vec![0u8; body_len];
        stream.read_exact(&mut body)?;

        let mut tokens = body.split(|&b| b == b' ');
        let offset_token = tokens.next().unwrap_or(&[]);
        let index_offset = parse_hex("index offset", offset_token)?;

        let key = match version {
            RpaVersion::V2 => None,
            RpaVersion::V3 => {
                let key_token = tokens.next().ok_or(Error::MissingHeaderField {
                    field: "obfuscation key",
                })?;
                let wide = parse_hex("obfuscation key", key_token)?;
                let key = u32::try_from(wide).map_err(|_| Error::InvalidHeaderField {
                    field: "obfuscation key",
                    value: String::from_utf8_lossy(key_token).into_owned(),
                })?;
                Some(key)
            }
        };

        Ok(Header {
            version,
            index_offset,
            key,
        })
    }
}

/// Count the bytes up to (not including) the next `\n`, restoring the stream
/// position afterwards.
fn line_length<R: Read + Seek>(stream: &mut R) -> Result<usize> {
    let start = stream.stream_position()?;
    let mut chunk = [0u8; 256];
    let mut length = 0usize;

    let found = loop {
        let read = stream.read(&mut chunk)?;
        if read == 0 {
            break false;
        }
        match memchr(b'\n', &chunk[..read]) {
            Some(at) => {
                length += at;
                break true;
            }
            None => length += read,
        }
    };

    stream.seek(SeekFrom::Start(start))?;
    if !found {
        return Err(Error::MissingHeaderTerminator);
    }
    Ok(length)
}

/// Parse an ASCII hex token (no `0x` prefix) into a u64.
fn parse_hex(field: &'static str, raw: &[u8]) -> Result<u64> {
    std::str::from_utf8(raw)
        .ok()
        .and_then(|text| u64::from_str_radix(text, 16).ok())
        .ok_or_else(|| Error::InvalidHeaderField {
            field,
            value: String::from_utf8_lossy(raw).into_owned(),
        })
}
