//! Index decoding and validation.
//!
//! The index lives at the tail of the archive as a zlib-compressed pickle of
//! `{ member_name: [(offset, length, prefix)] }`. This module inflates it,
//! decodes the pickle, checks the shape strictly and applies the RPA-3.0
//! XOR de-obfuscation, producing the in-memory table the accessor serves
//! lookups from.
//!
//! Everything between the declared index offset and end of stream is treated
//! as the compressed payload. Whether the format permits trailer data after
//! the index is an open question upstream; this reader assumes there is none.

use std::collections::HashMap;
use std::io::{Read, Seek, SeekFrom};

use flate2::read::ZlibDecoder;

use crate::pickle::{self, Value};
use crate::{Error, Result};

/// Location of one member's contents within the backing stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    offset: u64,
    length: u32,
}

impl IndexEntry {
    /// Byte offset of the member's first byte.
    #[inline]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Size of the member in bytes.
    #[inline]
    pub fn length(&self) -> u32 {
        self.length
    }

    /// Byte offset just past the member's last byte.
    #[inline]
    pub fn end(&self) -> u64 {
        self.offset + u64::from(self.length)
    }
}

/// Decode the index table: seek, inflate, unpickle, validate, de-obfuscate.
///
/// Duplicate member names overwrite each other (last one wins); the format
/// does not define duplicate behavior, so this is implementation-defined.
pub(crate) fn read_index<R: Read + Seek>(
    stream: &mut R,
    index_offset: u64,
    key: Option<u32>,
) -> Result<HashMap<String, IndexEntry>> {
    stream.seek(SeekFrom::Start(index_offset))?;
    let mut compressed = Vec::new();
    stream.read_to_end(&mut compressed)?;

    let mut raw = Vec::new();
    ZlibDecoder::new(compressed.as_slice())
        .read_to_end(&mut raw)
        .map_err(|e| Error::CorruptIndex(e.to_string()))?;

    let decoded = pickle::decode(&raw)?;
    let pairs = match decoded {
        Value::Dict(pairs) => pairs,
        other => {
            return Err(Error::IndexNotMap {
                actual: other.type_name(),
            })
        }
    };

    let mut table = HashMap::with_capacity(pairs.len());
    for (key_value, entry_value) in pairs {
        let name = match key_value {
            Value::Str(name) => name,
            other => {
                return Err(Error::NonStringKey {
                    actual: other.type_name(),
                })
            }
        };
        let entry = entry_from_value(&name, entry_value)?;
        table.insert(name, entry);
    }

    // RPA-3.0 stores offsets and lengths XORed with the header key. The key
    // is 32 bits wide and zero-extends against the 64-bit offset.
    if let Some(key) = key {
        for entry in table.values_mut() {
            entry.offset ^= u64::from(key);
            entry.length ^= key;
        }
    }

    Ok(table)
}

/// Validate one member's value: a one-element sequence holding an
/// `(offset, length, prefix)` triple with an empty prefix.
fn entry_from_value(member: &str, value: Value) -> Result<IndexEntry> {
    let outer = as_sequence(member, value)?;
    let [triple]: [Value; 1] = outer.try_into().map_err(|items: Vec<Value>| {
        mismatch(
            member,
            format!("expected exactly one entry, got {}", items.len()),
        )
    })?;

    let inner = as_sequence(member, triple)?;
    let [offset, length, prefix]: [Value; 3] = inner.try_into().map_err(|items: Vec<Value>| {
        mismatch(
            member,
            format!(
                "expected an (offset, length, prefix) triple, got {} elements",
                items.len()
            ),
        )
    })?;

    // The prefix field is reserved for a feature this reader does not
    // support; a non-empty value must be surfaced, never dropped.
    match prefix {
        Value::Str(ref s) if s.is_empty() => {}
        Value::Str(_) => {
            return Err(mismatch(
                member,
                "reserved prefix field is not empty (prefixed members are not supported)",
            ))
        }
        other => {
            return Err(mismatch(
                member,
                format!(
                    "reserved prefix field is not a string (got {})",
                    other.type_name()
                ),
            ))
        }
    }

    let offset = int_field(member, "offset", &offset)?;
    let offset = u64::try_from(offset)
        .map_err(|_| mismatch(member, format!("offset {offset} is negative")))?;

    let length = int_field(member, "length", &length)?;
    let length = u32::try_from(length)
        .map_err(|_| mismatch(member, format!("length {length} does not fit in 32 bits")))?;

    Ok(IndexEntry { offset, length })
}

fn as_sequence(member: &str, value: Value) -> Result<Vec<Value>> {
    match value {
        Value::List(items) | Value::Tuple(items) => Ok(items),
        other => Err(mismatch(
            member,
            format!("expected a sequence, got {}", other.type_name()),
        )),
    }
}

fn int_field(member: &str, field: &str, value: &Value) -> Result<i64> {
    match value {
        Value::Int(v) => Ok(*v),
        other => Err(mismatch(
            member,
            format!("{field} is not an integer (got {})", other.type_name()),
        )),
    }
}

fn mismatch(member: &str, reason: impl Into<String>) -> Error {
    Error::StructuralMismatch {
        member: member.to_string(),
        reason: reason.into(),
    }
}
