//! Hand-assembled archive images for tests.
//!
//! Fixtures are emitted opcode by opcode rather than recorded from a real
//! packer, so each test states exactly which wire bytes it exercises.

use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::Compression;

/// Append a pickled non-negative integer: BININT when it fits, LONG1 above.
pub(crate) fn pickle_int(out: &mut Vec<u8>, value: u64) {
    if value <= i32::MAX as u64 {
        out.push(b'J');
        out.extend_from_slice(&(value as i32).to_le_bytes());
        return;
    }
    // Minimal little-endian encoding, padded with one zero byte when the top
    // bit would read as a sign bit.
    let mut bytes = value.to_le_bytes().to_vec();
    while bytes.len() > 1 && bytes[bytes.len() - 1] == 0 {
        bytes.pop();
    }
    if bytes[bytes.len() - 1] & 0x80 != 0 {
        bytes.push(0);
    }
    out.push(0x8a);
    out.push(bytes.len() as u8);
    out.extend_from_slice(&bytes);
}

/// Append a pickled string (SHORT_BINSTRING; fixtures never need more).
pub(crate) fn pickle_str(out: &mut Vec<u8>, text: &str) {
    assert!(text.len() < 256);
    out.push(b'U');
    out.push(text.len() as u8);
    out.extend_from_slice(text.as_bytes());
}

/// Pickle a complete index mapping: `{name: [(offset, length, "")]}`.
pub(crate) fn pickle_index(entries: &[(String, u64, u32)]) -> Vec<u8> {
    let mut out = vec![0x80, 0x02, b'}'];
    for (name, offset, length) in entries {
        pickle_str(&mut out, name);
        out.push(b']');
        pickle_int(&mut out, *offset);
        pickle_int(&mut out, u64::from(*length));
        pickle_str(&mut out, "");
        out.push(0x87); // TUPLE3
        out.push(b'a'); // APPEND
        out.push(b's'); // SETITEM
    }
    out.push(b'.');
    out
}

/// zlib-compress a buffer the way the packer compresses the index.
pub(crate) fn zlib_compress(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// Assemble a complete archive image: header line, member contents packed
/// back to back, then the compressed index. Passing a key produces an
/// RPA-3.0 image with obfuscated index values.
pub(crate) fn build_archive(key: Option<u32>, members: &[(&str, &[u8])]) -> Vec<u8> {
    // "RPA-x.0" + space + 16 hex digits (+ space + 8 hex digits) + newline.
    let header_len: u64 = if key.is_some() { 34 } else { 25 };

    let mut blob = Vec::new();
    let mut entries = Vec::with_capacity(members.len());
    let mut position = header_len;
    for (name, data) in members {
        let mut offset = position;
        let mut length = data.len() as u32;
        if let Some(key) = key {
            offset ^= u64::from(key);
            length ^= key;
        }
        entries.push(((*name).to_string(), offset, length));
        blob.extend_from_slice(data);
        position += data.len() as u64;
    }

    let mut image = match key {
        Some(key) => format!("RPA-3.0 {position:016x} {key:08x}\n").into_bytes(),
        None => format!("RPA-2.0 {position:016x}\n").into_bytes(),
    };
    image.extend_from_slice(&blob);
    image.extend_from_slice(&zlib_compress(&pickle_index(&entries)));
    image
}
