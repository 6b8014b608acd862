//! MOBI header parsing and writing.
//!
//! ```text
//! 0    PalmDOC: compression, text length, record count/size, encryption
//! 16   "MOBI", header length, type, encoding, unique id, version
//! 40   dictionary indices, first non-book record, full name offset/length
//! 92   locale, languages, min version, first image, huffman, EXTH flags
//! 132  fields gated by the declared header length (table below)
//! 16+n EXTH block when EXTH flags has 0x40
//! ...  remainder (full name and padding)
//! ```
//!
//! The header is always written with the full 280-byte layout, whatever
//! length it was read with, so every field in the optional table is read
//! back from a written header.

use crate::codec::bytes::{self, read_u16, read_u32, read_uint};
use crate::codec::charset::Charset;
use crate::error::{MobiError, Result};
use crate::exth::ExthBlock;

use super::Compression;

/// Header length written on serialization.
pub const DEFAULT_HEADER_LENGTH: u32 = 280;

/// Bytes between the start of record 0 and the start of the counted header.
const PALMDOC_PREFIX: usize = 16;

/// Fixed primary block read from every header.
const PRIMARY_SIZE: usize = 132;

/// Serialized size of the header without EXTH and remainder.
pub const WRITTEN_SIZE: usize = DEFAULT_HEADER_LENGTH as usize + PALMDOC_PREFIX;

/// Sentinel for an absent record pointer.
pub const NULL_INDEX: u32 = u32::MAX;

/// EXTH flags bit announcing an EXTH block.
pub const EXTH_FLAG: u32 = 0x40;

/// Text record size written by text replacement.
pub const DEFAULT_RECORD_SIZE: u16 = 4096;

/// A field present only when the declared header length reaches `min_length`.
struct OptionalField {
    min_length: u32,
    offset: usize,
    width: usize,
    set: fn(&mut MobiHeader, u32),
}

/// Later versions of the header only ever append fields, so new layouts only
/// need a new row here.
const OPTIONAL_FIELDS: &[OptionalField] = &[
    OptionalField { min_length: 194, offset: 192, width: 2, set: |h, v| h.first_content_index = v as u16 },
    OptionalField { min_length: 196, offset: 194, width: 2, set: |h, v| h.last_content_index = v as u16 },
    OptionalField { min_length: 204, offset: 200, width: 4, set: |h, v| h.fcis_index = v },
    OptionalField { min_length: 208, offset: 204, width: 4, set: |h, v| h.fcis_count = v },
    OptionalField { min_length: 212, offset: 208, width: 4, set: |h, v| h.flis_index = v },
    OptionalField { min_length: 216, offset: 212, width: 4, set: |h, v| h.flis_count = v },
    OptionalField { min_length: 228, offset: 224, width: 4, set: |h, v| h.srcs_index = v },
    OptionalField { min_length: 232, offset: 228, width: 4, set: |h, v| h.srcs_count = v },
    OptionalField { min_length: 244, offset: 240, width: 4, set: |h, v| h.extra_record_data_flags = v },
    OptionalField { min_length: 248, offset: 244, width: 4, set: |h, v| h.indx_index = v },
    OptionalField { min_length: 256, offset: 252, width: 4, set: |h, v| h.fragment_index = v },
    OptionalField { min_length: 264, offset: 260, width: 4, set: |h, v| h.skeleton_index = v },
    OptionalField { min_length: 268, offset: 264, width: 4, set: |h, v| h.datp_index = v },
    OptionalField { min_length: 276, offset: 272, width: 4, set: |h, v| h.guide_index = v },
];

/// Record 0: the PalmDOC header, MOBI header, EXTH block and remainder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MobiHeader {
    /// Raw compression code; see [`MobiHeader::compression`].
    pub compression_code: u16,
    /// Uncompressed length of the book text.
    pub text_length: u32,
    /// Number of text records.
    pub record_count: u16,
    /// Maximum uncompressed size of a text record.
    pub record_size: u16,
    pub encryption: u16,
    pub mobi_type: u32,
    pub text_encoding: u32,
    pub unique_id: u32,
    pub file_version: u32,
    pub orthographic_index: u32,
    pub inflection_index: u32,
    pub index_names: u32,
    pub index_keys: u32,
    pub extra_indices: [u32; 6],
    /// First record after the text and its index.
    pub first_non_book_index: u32,
    pub locale: u32,
    pub input_language: u32,
    pub output_language: u32,
    pub min_version: u32,
    pub first_image_index: u32,
    pub huffman_record_offset: u32,
    pub huffman_record_count: u32,
    pub huffman_table_offset: u32,
    pub huffman_table_length: u32,
    pub exth_flags: u32,
    pub first_content_index: u16,
    pub last_content_index: u16,
    pub fcis_index: u32,
    pub fcis_count: u32,
    pub flis_index: u32,
    pub flis_count: u32,
    pub srcs_index: u32,
    pub srcs_count: u32,
    pub extra_record_data_flags: u32,
    pub indx_index: u32,
    pub fragment_index: u32,
    pub skeleton_index: u32,
    pub datp_index: u32,
    pub guide_index: u32,
    unused: [u16; 2],
    exth: Option<ExthBlock>,
    /// Bytes after the EXTH block; holds the full name.
    remainder: Vec<u8>,
    /// Full name position relative to `remainder`.
    full_name_pos: usize,
    full_name_len: usize,
}

impl Default for MobiHeader {
    fn default() -> Self {
        Self {
            compression_code: Compression::PalmDoc.code(),
            text_length: 0,
            record_count: 0,
            record_size: DEFAULT_RECORD_SIZE,
            encryption: 0,
            mobi_type: 2,
            text_encoding: Charset::Utf8.text_encoding(),
            unique_id: 0,
            file_version: 6,
            orthographic_index: NULL_INDEX,
            inflection_index: NULL_INDEX,
            index_names: NULL_INDEX,
            index_keys: NULL_INDEX,
            extra_indices: [NULL_INDEX; 6],
            first_non_book_index: NULL_INDEX,
            locale: 0,
            input_language: 0,
            output_language: 0,
            min_version: 6,
            first_image_index: NULL_INDEX,
            huffman_record_offset: 0,
            huffman_record_count: 0,
            huffman_table_offset: 0,
            huffman_table_length: 0,
            exth_flags: 0,
            first_content_index: 1,
            last_content_index: u16::MAX,
            fcis_index: 0,
            fcis_count: 0,
            flis_index: 0,
            flis_count: 0,
            srcs_index: NULL_INDEX,
            srcs_count: 0,
            extra_record_data_flags: 0,
            indx_index: NULL_INDEX,
            fragment_index: NULL_INDEX,
            skeleton_index: NULL_INDEX,
            datp_index: NULL_INDEX,
            guide_index: NULL_INDEX,
            unused: [0; 2],
            exth: None,
            remainder: Vec::new(),
            full_name_pos: 0,
            full_name_len: 0,
        }
    }
}

impl MobiHeader {
    /// Parse record 0.
    pub fn parse(record: &[u8]) -> Result<Self> {
        let magic = bytes::slice(record, 16, 4)?;
        if magic != b"MOBI" {
            return Err(MobiError::MalformedHeader {
                expected: "MOBI".into(),
                actual: bytes::magic_display(magic),
            });
        }
        if record.len() < PRIMARY_SIZE {
            return Err(MobiError::truncated("MOBI header", PRIMARY_SIZE, record.len()));
        }

        let header_length = read_u32(record, 20)?;
        let mut extra_indices = [0u32; 6];
        for (i, slot) in extra_indices.iter_mut().enumerate() {
            *slot = read_u32(record, 56 + i * 4)?;
        }

        let mut header = Self {
            compression_code: read_u16(record, 0)?,
            unused: [read_u16(record, 2)?, read_u16(record, 14)?],
            text_length: read_u32(record, 4)?,
            record_count: read_u16(record, 8)?,
            record_size: read_u16(record, 10)?,
            encryption: read_u16(record, 12)?,
            mobi_type: read_u32(record, 24)?,
            text_encoding: read_u32(record, 28)?,
            unique_id: read_u32(record, 32)?,
            file_version: read_u32(record, 36)?,
            orthographic_index: read_u32(record, 40)?,
            inflection_index: read_u32(record, 44)?,
            index_names: read_u32(record, 48)?,
            index_keys: read_u32(record, 52)?,
            extra_indices,
            first_non_book_index: read_u32(record, 80)?,
            locale: read_u32(record, 92)?,
            input_language: read_u32(record, 96)?,
            output_language: read_u32(record, 100)?,
            min_version: read_u32(record, 104)?,
            first_image_index: read_u32(record, 108)?,
            huffman_record_offset: read_u32(record, 112)?,
            huffman_record_count: read_u32(record, 116)?,
            huffman_table_offset: read_u32(record, 120)?,
            huffman_table_length: read_u32(record, 124)?,
            exth_flags: read_u32(record, 128)?,
            // Optional fields keep these defaults unless the table reads them.
            ..Self::default()
        };

        for field in OPTIONAL_FIELDS {
            if header_length < field.min_length {
                continue;
            }
            match read_uint(record, field.offset, field.width) {
                Ok(value) => (field.set)(&mut header, value as u32),
                Err(_) => {
                    tracing::warn!(
                        offset = field.offset,
                        header_length,
                        record_len = record.len(),
                        "Header field beyond record end, keeping default"
                    );
                }
            }
        }

        let exth_offset = header_length as usize + PALMDOC_PREFIX;
        let mut remainder_start = exth_offset;
        if header.exth_flags & EXTH_FLAG != 0 {
            let (block, extent) = ExthBlock::parse(record, exth_offset)?;
            header.exth = Some(block);
            remainder_start += extent;
        }
        let remainder_start = remainder_start.min(record.len());
        header.remainder = record[remainder_start..].to_vec();

        let name_offset = read_u32(record, 84)? as usize;
        let name_len = read_u32(record, 88)? as usize;
        header.locate_full_name(record, remainder_start, name_offset, name_len);

        tracing::debug!(
            header_length,
            compression = header.compression_code,
            text_records = header.record_count,
            encoding = header.text_encoding,
            exth = header.exth.as_ref().map_or(0, ExthBlock::len),
            "Parsed MOBI header"
        );
        Ok(header)
    }

    /// Point the full name into the remainder, copying it there when the
    /// source stored it somewhere else.
    fn locate_full_name(&mut self, record: &[u8], remainder_start: usize, offset: usize, len: usize) {
        let end = offset.saturating_add(len);
        if offset >= remainder_start && end <= record.len() {
            self.full_name_pos = offset - remainder_start;
            self.full_name_len = len;
            return;
        }
        let name = record.get(offset..end).unwrap_or_default().to_vec();
        tracing::debug!(offset, len, remainder_start, "Full name outside remainder, relocating");
        let mut relocated = padded_name(&name);
        relocated.extend_from_slice(&self.remainder);
        self.remainder = relocated;
        self.full_name_pos = 0;
        self.full_name_len = name.len();
    }

    /// Append the normalized header to `out`.
    pub fn write(&self, out: &mut Vec<u8>) {
        let start = out.len();
        let exth_size = self.exth_size();

        bytes::write_u16(out, self.compression_code);
        bytes::write_u16(out, self.unused[0]);
        bytes::write_u32(out, self.text_length);
        bytes::write_u16(out, self.record_count);
        bytes::write_u16(out, self.record_size);
        bytes::write_u16(out, self.encryption);
        bytes::write_u16(out, self.unused[1]);
        out.extend_from_slice(b"MOBI");
        for value in [
            DEFAULT_HEADER_LENGTH,
            self.mobi_type,
            self.text_encoding,
            self.unique_id,
            self.file_version,
            self.orthographic_index,
            self.inflection_index,
            self.index_names,
            self.index_keys,
        ] {
            bytes::write_u32(out, value);
        }
        for value in self.extra_indices {
            bytes::write_u32(out, value);
        }
        for value in [
            self.first_non_book_index,
            (WRITTEN_SIZE + exth_size + self.full_name_pos) as u32,
            self.full_name_len as u32,
            self.locale,
            self.input_language,
            self.output_language,
            self.min_version,
            self.first_image_index,
            self.huffman_record_offset,
            self.huffman_record_count,
            self.huffman_table_offset,
            self.huffman_table_length,
            self.exth_flags,
        ] {
            bytes::write_u32(out, value);
        }

        // 132: extended layout.
        out.resize(out.len() + 32, 0);
        // Unknown, then DRM offset/count/size/flags: no DRM.
        for value in [NULL_INDEX, NULL_INDEX, 0, 0, 0] {
            bytes::write_u32(out, value);
        }
        out.resize(out.len() + 8, 0);
        bytes::write_u16(out, self.first_content_index);
        bytes::write_u16(out, self.last_content_index);
        for value in [1, self.fcis_index, self.fcis_count, self.flis_index, self.flis_count] {
            bytes::write_u32(out, value);
        }
        out.resize(out.len() + 8, 0);
        for value in [
            self.srcs_index,
            self.srcs_count,
            NULL_INDEX,
            NULL_INDEX,
            self.extra_record_data_flags,
            self.indx_index,
            NULL_INDEX,
            self.fragment_index,
            NULL_INDEX,
            self.skeleton_index,
            self.datp_index,
            0,
            self.guide_index,
            0,
        ] {
            bytes::write_u32(out, value);
        }
        // 280: reserved.
        out.resize(out.len() + 16, 0);
        debug_assert_eq!(out.len() - start, WRITTEN_SIZE);

        if let Some(exth) = self.exth.as_ref().filter(|_| self.has_exth()) {
            exth.write(out);
        }
        out.extend_from_slice(&self.remainder);
    }

    /// Serialized size of record 0.
    pub fn size(&self) -> usize {
        WRITTEN_SIZE + self.exth_size() + self.remainder.len()
    }

    fn exth_size(&self) -> usize {
        match &self.exth {
            Some(exth) if self.has_exth() => exth.size(),
            _ => 0,
        }
    }

    /// Whether the EXTH flag is set.
    pub fn has_exth(&self) -> bool {
        self.exth_flags & EXTH_FLAG != 0
    }

    pub fn exth(&self) -> Option<&ExthBlock> {
        self.exth.as_ref().filter(|_| self.has_exth())
    }

    /// The EXTH block, created empty (and flagged) if missing.
    pub fn exth_mut(&mut self) -> &mut ExthBlock {
        self.exth_flags |= EXTH_FLAG;
        self.exth.get_or_insert_with(ExthBlock::new)
    }

    pub fn compression(&self) -> Option<Compression> {
        Compression::from_code(self.compression_code)
    }

    pub fn set_compression(&mut self, compression: Compression) {
        self.compression_code = compression.code();
    }

    pub fn charset(&self) -> Charset {
        Charset::from_text_encoding(self.text_encoding)
    }

    /// Index of the first text record. Defaults to 1 when unset.
    pub fn text_start(&self) -> usize {
        match self.first_content_index {
            0 | u16::MAX => 1,
            first => first as usize,
        }
    }

    /// Every field holding an absolute record index, except the text range
    /// and the two boundaries (first non-book and first image record).
    pub(crate) fn record_pointers_mut(&mut self) -> Vec<&mut u32> {
        let mut pointers = vec![
            &mut self.orthographic_index,
            &mut self.inflection_index,
            &mut self.index_names,
            &mut self.index_keys,
            &mut self.fcis_index,
            &mut self.flis_index,
            &mut self.srcs_index,
            &mut self.indx_index,
            &mut self.fragment_index,
            &mut self.skeleton_index,
            &mut self.datp_index,
            &mut self.guide_index,
        ];
        pointers.extend(self.extra_indices.iter_mut());
        if self.huffman_record_count > 0 {
            pointers.push(&mut self.huffman_record_offset);
        }
        pointers
    }

    pub fn full_name(&self) -> String {
        let end = (self.full_name_pos + self.full_name_len).min(self.remainder.len());
        let start = self.full_name_pos.min(end);
        self.charset().decode(&self.remainder[start..end])
    }

    /// Replace the full name. The remainder becomes the encoded name padded
    /// to a 4-byte boundary with at least two NULs.
    pub fn set_full_name(&mut self, name: &str) {
        let encoded = self.charset().encode(name);
        self.full_name_len = encoded.len();
        self.full_name_pos = 0;
        self.remainder = padded_name(&encoded);
    }
}

fn padded_name(name: &[u8]) -> Vec<u8> {
    let mut padding = (name.len() + 2) % 4;
    if padding != 0 {
        padding = 4 - padding;
    }
    padding += 2;
    let mut out = Vec::with_capacity(name.len() + padding);
    out.extend_from_slice(name);
    out.resize(name.len() + padding, 0);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exth::{ExthRecord, ExthTag};

    fn written(header: &MobiHeader) -> Vec<u8> {
        let mut out = Vec::new();
        header.write(&mut out);
        out
    }

    #[test]
    fn test_default_roundtrip() {
        let mut header = MobiHeader::default();
        header.set_full_name("Japanische Märchen");
        header.exth_mut().push(ExthRecord::new(ExthTag::Author, b"Ozaki".to_vec()));

        let out = written(&header);
        assert_eq!(out.len(), header.size());
        let parsed = MobiHeader::parse(&out).unwrap();
        assert_eq!(parsed.full_name(), "Japanische Märchen");
        assert_eq!(parsed.exth().unwrap().len(), 1);
        assert_eq!(parsed.first_content_index, 1);
        assert_eq!(parsed.skeleton_index, NULL_INDEX);
        assert_eq!(parsed.compression(), Some(Compression::PalmDoc));
        assert_eq!(written(&parsed), out);
    }

    #[test]
    fn test_every_optional_field_survives_rewrite() {
        let mut header = MobiHeader::default();
        header.set_full_name("Grimm");
        header.first_content_index = 1;
        header.last_content_index = 4;
        header.fcis_index = 9;
        header.fcis_count = 1;
        header.flis_index = 8;
        header.flis_count = 1;
        header.srcs_index = 10;
        header.srcs_count = 2;
        header.extra_record_data_flags = 3;
        header.indx_index = 6;
        header.fragment_index = 11;
        header.skeleton_index = 12;
        header.datp_index = 13;
        header.guide_index = 14;

        let out = written(&header);
        assert_eq!(read_u32(&out, 20).unwrap(), DEFAULT_HEADER_LENGTH);
        let parsed = MobiHeader::parse(&out).unwrap();
        assert_eq!(parsed, header);
        assert_eq!(parsed.datp_index, 13);
        assert_eq!(parsed.guide_index, 14);
        assert_eq!(parsed.full_name(), "Grimm");
    }

    #[test]
    fn test_padded_name() {
        assert_eq!(padded_name(b"TEST"), b"TEST\0\0\0\0".to_vec());
        assert_eq!(padded_name(b"AB"), b"AB\0\0".to_vec());
        assert_eq!(padded_name(b"ABC").len(), 8);
    }

    #[test]
    fn test_short_header_keeps_defaults() {
        let mut out = written(&MobiHeader::default());
        // Declare a 200-byte header: fields from fcis onwards are absent.
        out[20..24].copy_from_slice(&200u32.to_be_bytes());
        out[200 + 16..].fill(0);
        let parsed = MobiHeader::parse(&out).unwrap();
        assert_eq!(parsed.first_content_index, 1);
        assert_eq!(parsed.last_content_index, u16::MAX);
        assert_eq!(parsed.fcis_index, 0);
        assert_eq!(parsed.srcs_index, NULL_INDEX);
        assert_eq!(parsed.indx_index, NULL_INDEX);
    }

    #[test]
    fn test_bad_magic() {
        let mut out = written(&MobiHeader::default());
        out[16..20].copy_from_slice(b"BOOK");
        assert!(matches!(
            MobiHeader::parse(&out),
            Err(MobiError::MalformedHeader { .. })
        ));
        assert!(MobiHeader::parse(&[0u8; 8]).is_err());
    }

    #[test]
    fn test_exth_flag_without_block() {
        let mut header = MobiHeader::default();
        assert!(header.exth().is_none());
        header.exth_mut();
        assert!(header.has_exth());
        assert_eq!(header.size(), WRITTEN_SIZE + crate::exth::BLOCK_PREFIX);
    }
}
