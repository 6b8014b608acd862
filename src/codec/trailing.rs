//! Trailing entries appended to text records.
//!
//! Bit 0 of `extraRecordDataFlags` marks a multibyte-overlap entry whose size
//! is `(last byte & 3) + 1`. Every other set bit marks an entry that ends with
//! its own size, written as a backward variable-width integer in up to the
//! last four bytes. Entries are stripped from the highest bit down to bit 1,
//! then the overlap entry.

/// Remove the trailing entries declared by `flags` from a text record.
///
/// Sizes that exceed what is left of the record strip everything.
pub fn strip_trailing_entries(record: &[u8], flags: u32) -> &[u8] {
    let mut end = record.len();

    for bit in (1..32).rev() {
        if flags & (1 << bit) == 0 {
            continue;
        }
        let size = backward_size(&record[..end]);
        end = end.saturating_sub(size);
    }

    if flags & 1 != 0 && end > 0 {
        let size = (record[end - 1] & 0x03) as usize + 1;
        end = end.saturating_sub(size);
    }

    &record[..end]
}

/// Decode the size stored at the end of `data`.
///
/// Bytes are read in order from the last four; a byte with the high bit set
/// starts a fresh value.
fn backward_size(data: &[u8]) -> usize {
    let start = data.len().saturating_sub(4);
    let mut size = 0usize;
    for &byte in &data[start..] {
        if byte & 0x80 != 0 {
            size = 0;
        }
        size = (size << 7) | (byte & 0x7F) as usize;
    }
    size
}
