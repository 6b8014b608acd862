//! Fixed-width big-endian integer and string fields over byte buffers.
//!
//! Every multi-byte value in the PDB envelope, the MOBI header and the EXTH
//! block is big-endian. Reads are bounds-checked and report the missing span
//! as a [`MobiError::MalformedContainer`]; writes append to a `Vec<u8>`.

use byteorder::{BigEndian, ByteOrder};

use crate::codec::charset::Charset;
use crate::error::{MobiError, Result};

/// Borrow `len` bytes at `offset`, failing if the buffer is too short.
pub fn slice(buf: &[u8], offset: usize, len: usize) -> Result<&[u8]> {
    let end = offset
        .checked_add(len)
        .ok_or_else(|| MobiError::truncated("field", usize::MAX, buf.len()))?;
    buf.get(offset..end)
        .ok_or_else(|| MobiError::truncated("buffer", end, buf.len()))
}

/// Read an unsigned big-endian integer of `width` bytes (1 to 8).
///
/// No sign extension is performed: `FF FF` read with width 2 is `65535`.
pub fn read_uint(buf: &[u8], offset: usize, width: usize) -> Result<u64> {
    if !(1..=8).contains(&width) {
        return Err(MobiError::InvalidArgument(format!(
            "integer width must be 1..=8, got {width}"
        )));
    }
    Ok(BigEndian::read_uint(slice(buf, offset, width)?, width))
}

/// Read a single byte.
pub fn read_u8(buf: &[u8], offset: usize) -> Result<u8> {
    Ok(slice(buf, offset, 1)?[0])
}

/// Read a big-endian `u16`.
pub fn read_u16(buf: &[u8], offset: usize) -> Result<u16> {
    Ok(BigEndian::read_u16(slice(buf, offset, 2)?))
}

/// Read a big-endian `u32`.
pub fn read_u32(buf: &[u8], offset: usize) -> Result<u32> {
    Ok(BigEndian::read_u32(slice(buf, offset, 4)?))
}

/// Read a NUL-terminated string stored in a fixed-width field.
///
/// The string ends at the first NUL inside the field, or spans the whole
/// field when none is present.
pub fn read_fixed_string(buf: &[u8], offset: usize, width: usize, charset: Charset) -> Result<String> {
    Ok(charset.decode_nul_terminated(slice(buf, offset, width)?))
}

/// Append `value` as a big-endian integer of `width` bytes (1 to 8).
///
/// Higher-order bytes that do not fit in `width` are dropped, so `-1i32 as u64`
/// written with width 2 becomes `FF FF`.
pub fn write_uint(out: &mut Vec<u8>, value: u64, width: usize) {
    let width = width.clamp(1, 8);
    let mut buf = [0u8; 8];
    let masked = if width == 8 {
        value
    } else {
        value & ((1u64 << (width * 8)) - 1)
    };
    BigEndian::write_uint(&mut buf[..width], masked, width);
    out.extend_from_slice(&buf[..width]);
}

/// Append a big-endian `u16`.
pub fn write_u16(out: &mut Vec<u8>, value: u16) {
    let mut buf = [0u8; 2];
    BigEndian::write_u16(&mut buf, value);
    out.extend_from_slice(&buf);
}

/// Append a big-endian `u32`.
pub fn write_u32(out: &mut Vec<u8>, value: u32) {
    let mut buf = [0u8; 4];
    BigEndian::write_u32(&mut buf, value);
    out.extend_from_slice(&buf);
}

/// Append `value` into a field of exactly `width` bytes.
///
/// Shorter values are right-padded with NUL; longer values are truncated
/// silently. This is lossy by contract.
pub fn write_fixed_string(out: &mut Vec<u8>, value: &str, width: usize, charset: Charset) {
    let encoded = charset.encode(value);
    let take = encoded.len().min(width);
    out.extend_from_slice(&encoded[..take]);
    out.resize(out.len() + (width - take), 0);
}

/// Split `bytes` into consecutive spans of at most `size` bytes.
///
/// The number of spans is `ceil(len / size)`; only the last one may be
/// shorter. An empty input yields no spans.
pub fn chunk(bytes: &[u8], size: usize) -> Vec<&[u8]> {
    if size == 0 {
        return vec![bytes];
    }
    bytes.chunks(size).collect()
}

/// Whether `bytes` begins with `prefix`.
pub fn starts_with_magic(bytes: &[u8], prefix: &[u8]) -> bool {
    bytes.len() >= prefix.len() && &bytes[..prefix.len()] == prefix
}

/// Render a 4-byte magic for diagnostics, replacing non-printable bytes.
pub fn magic_display(bytes: &[u8]) -> String {
    bytes
        .iter()
        .take(4)
        .map(|&b| if b.is_ascii_graphic() { b as char } else { '.' })
        .collect()
}
