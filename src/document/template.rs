//! Fixed records written into newly created books.

use crate::codec::bytes::write_u32;

/// Body text of an empty book.
pub const EMPTY_BODY: &str = "<html><head><guide></guide></head><body><p></p></body></html>";

/// Offset of the text length inside an FCIS record.
const FCIS_TEXT_LENGTH: usize = 20;

/// The FLIS record every writer emits unchanged.
const FLIS: [u8; 36] = [
    b'F', b'L', b'I', b'S', 0, 0, 0, 8, 0, 0x41, 0, 0, 0, 0, 0, 0, 0xFF, 0xFF, 0xFF, 0xFF,
    0, 1, 0, 3, 0, 0, 0, 3, 0, 0, 0, 1, 0xFF, 0xFF, 0xFF, 0xFF,
];

pub fn flis_record() -> Vec<u8> {
    FLIS.to_vec()
}

/// An FCIS record for a text of `text_length` bytes.
pub fn fcis_record(text_length: u32) -> Vec<u8> {
    let mut out = b"FCIS".to_vec();
    for word in [0x14, 0x10, 1, 0, text_length, 0, 0x20, 8] {
        write_u32(&mut out, word);
    }
    out.extend_from_slice(&[0, 1, 0, 1]);
    write_u32(&mut out, 0);
    out
}

/// Rewrite the text length carried by an existing FCIS record.
pub fn patch_fcis_text_length(record: &mut [u8], text_length: u32) {
    if let Some(field) = record.get_mut(FCIS_TEXT_LENGTH..FCIS_TEXT_LENGTH + 4) {
        field.copy_from_slice(&text_length.to_be_bytes());
    }
}
