//! INDX header.
//!
//! ```text
//! 0    "INDX"
//! 4    header length
//! 8    index type (0 normal, 2 inflection)
//! 12   two unknown words
//! 20   IDXT offset
//! 24   entry count, encoding, language, total entry count
//! 40   ORDT offset, LIGT offset, ORDT/LIGT entry count, CNCX record count
//! 56   unknown (phonetizer)
//! 164  ORDT type, entry count, two table offsets
//! 180  TAGX offset
//! ```

use crate::codec::bytes::{read_u32, starts_with_magic};
use crate::codec::charset::Charset;
use crate::error::{MobiError, Result};

pub const MAGIC: &[u8; 4] = b"INDX";

/// Bytes every INDX header carries.
const FIXED_SIZE: usize = 56;

const ORDT_OFFSET: usize = 164;
const TAGX_POINTER_OFFSET: usize = 180;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexType {
    Normal,
    Inflection,
}

impl IndexType {
    pub const ALL: [IndexType; 2] = [Self::Normal, Self::Inflection];

    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(Self::Normal),
            2 => Some(Self::Inflection),
            _ => None,
        }
    }

    pub fn code(self) -> u32 {
        match self {
            Self::Normal => 0,
            Self::Inflection => 2,
        }
    }
}

/// Collation table descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct OrdtInfo {
    pub ordt_type: u32,
    pub entry_count: u32,
    pub table1_offset: u32,
    pub table2_offset: u32,
}

impl OrdtInfo {
    /// Width of one ORDT entry in bytes.
    pub fn entry_size(&self) -> usize {
        if self.ordt_type == 0 {
            1
        } else {
            2
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct IndxHeader {
    pub header_length: u32,
    pub index_type_code: u32,
    pub idxt_offset: u32,
    pub entry_count: u32,
    pub encoding: u32,
    pub language: u32,
    pub total_entry_count: u32,
    pub ordt_offset: u32,
    pub ligt_offset: u32,
    pub ordt_ligt_entry_count: u32,
    pub cncx_record_count: u32,
    pub ordt: Option<OrdtInfo>,
    /// Zero when the record carries no TAGX table.
    pub tagx_offset: u32,
}

impl IndxHeader {
    pub fn parse(buf: &[u8]) -> Result<Self> {
        if !starts_with_magic(buf, MAGIC) {
            return Err(MobiError::MalformedIndex("missing INDX magic".into()));
        }
        if buf.len() < FIXED_SIZE {
            return Err(MobiError::MalformedIndex(format!(
                "INDX header needs {FIXED_SIZE} bytes, record has {}",
                buf.len()
            )));
        }
        let word = |offset| read_u32(buf, offset);
        let ordt = match (
            word(ORDT_OFFSET),
            word(ORDT_OFFSET + 4),
            word(ORDT_OFFSET + 8),
            word(ORDT_OFFSET + 12),
        ) {
            (Ok(ordt_type), Ok(entry_count), Ok(table1_offset), Ok(table2_offset)) => {
                Some(OrdtInfo {
                    ordt_type,
                    entry_count,
                    table1_offset,
                    table2_offset,
                })
            }
            _ => None,
        };
        Ok(Self {
            header_length: word(4)?,
            index_type_code: word(8)?,
            idxt_offset: word(20)?,
            entry_count: word(24)?,
            encoding: word(28)?,
            language: word(32)?,
            total_entry_count: word(36)?,
            ordt_offset: word(40)?,
            ligt_offset: word(44)?,
            ordt_ligt_entry_count: word(48)?,
            cncx_record_count: word(52)?,
            ordt,
            tagx_offset: word(TAGX_POINTER_OFFSET).unwrap_or(0),
        })
    }

    pub fn index_type(&self) -> Option<IndexType> {
        IndexType::from_code(self.index_type_code)
    }

    pub fn charset(&self) -> Charset {
        Charset::from_text_encoding(self.encoding)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::codec::bytes::write_u32;

    /// An INDX record of `length` bytes with the given TAGX and IDXT offsets.
    pub(crate) fn indx_record(length: usize, tagx_offset: u32, idxt_offset: u32, count: u32) -> Vec<u8> {
        let mut buf = MAGIC.to_vec();
        for word in [length as u32, 2, 0, 0, idxt_offset, count, 65001, 9, count, 0, 0, 0, 1] {
            write_u32(&mut buf, word);
        }
        buf.resize(ORDT_OFFSET, 0);
        for word in [1, 0, 0, 0, tagx_offset] {
            write_u32(&mut buf, word);
        }
        buf.resize(length.max(buf.len()), 0);
        buf
    }

    #[test]
    fn test_index_type_codes_are_injective() {
        assert_ne!(IndexType::Normal.code(), IndexType::Inflection.code());
        for t in IndexType::ALL {
            assert_eq!(IndexType::from_code(t.code()), Some(t));
        }
        assert_eq!(IndexType::from_code(1), None);
    }

    #[test]
    fn test_parse_header() {
        let header = IndxHeader::parse(&indx_record(192, 192, 0, 3)).unwrap();
        assert_eq!(header.header_length, 192);
        assert_eq!(header.index_type(), Some(IndexType::Inflection));
        assert_eq!(header.entry_count, 3);
        assert_eq!(header.charset(), Charset::Utf8);
        assert_eq!(header.cncx_record_count, 1);
        assert_eq!(header.tagx_offset, 192);
        assert_eq!(header.ordt.map(|o| o.entry_size()), Some(2));
    }

    #[test]
    fn test_short_header_without_ordt() {
        let mut buf = indx_record(192, 0, 0, 0);
        buf.truncate(FIXED_SIZE);
        let header = IndxHeader::parse(&buf).unwrap();
        assert_eq!(header.ordt, None);
        assert_eq!(header.tagx_offset, 0);
        buf.truncate(FIXED_SIZE - 1);
        assert!(IndxHeader::parse(&buf).is_err());
    }
}
