//! TAGX: the tag schema of an index.
//!
//! ```text
//! 0   "TAGX"
//! 4   header length (12 + 4 × entries)
//! 8   control byte count
//! 12  entries: tag, values per entry, bitmask, end-of-control-byte flag
//! ```

use crate::codec::bytes::{read_u32, slice, starts_with_magic};
use crate::error::{MobiError, Result};

pub const MAGIC: &[u8; 4] = b"TAGX";

const PREFIX: usize = 12;
const ENTRY_SIZE: usize = 4;

/// Meaning of a tag number inside an index entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TagEntryType {
    End,
    Pos,
    Len,
    NameOffset,
    DepthLevel,
    Koffs,
    PosFid,
    Parent,
    Child1,
    ChildN,
    ImageIndex,
    DescOffset,
    AuthorOffset,
    ImageCaptionOffset,
    ImageAttrOffset,
}

impl TagEntryType {
    pub const ALL: [TagEntryType; 15] = [
        Self::End,
        Self::Pos,
        Self::Len,
        Self::NameOffset,
        Self::DepthLevel,
        Self::Koffs,
        Self::PosFid,
        Self::Parent,
        Self::Child1,
        Self::ChildN,
        Self::ImageIndex,
        Self::DescOffset,
        Self::AuthorOffset,
        Self::ImageCaptionOffset,
        Self::ImageAttrOffset,
    ];

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.code() == code)
    }

    pub fn code(self) -> u8 {
        match self {
            Self::End => 0,
            Self::Pos => 1,
            Self::Len => 2,
            Self::NameOffset => 3,
            Self::DepthLevel => 4,
            Self::Koffs => 5,
            Self::PosFid => 6,
            Self::Parent => 21,
            Self::Child1 => 22,
            Self::ChildN => 23,
            Self::ImageIndex => 69,
            Self::DescOffset => 70,
            Self::AuthorOffset => 71,
            Self::ImageCaptionOffset => 72,
            Self::ImageAttrOffset => 73,
        }
    }
}

/// One row of the tag table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct TagEntry {
    pub tag: u8,
    pub values_per_entry: u8,
    pub bitmask: u8,
    pub control_byte: u8,
}

impl TagEntry {
    pub fn kind(&self) -> Option<TagEntryType> {
        TagEntryType::from_code(self.tag)
    }

    /// Whether this row closes a control byte.
    pub fn ends_control_byte(&self) -> bool {
        self.control_byte == 1
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct TagxTable {
    pub control_byte_count: u32,
    pub entries: Vec<TagEntry>,
}

impl TagxTable {
    /// Parse a TAGX table starting at `offset` inside an INDX record.
    pub fn parse(buf: &[u8], offset: usize) -> Result<Self> {
        let table = buf.get(offset..).unwrap_or_default();
        if !starts_with_magic(table, MAGIC) {
            return Err(MobiError::MalformedIndex(format!(
                "expected TAGX at offset {offset}"
            )));
        }
        let header_length = read_u32(table, 4)? as usize;
        if header_length < PREFIX {
            return Err(MobiError::MalformedIndex(format!(
                "TAGX length {header_length} is shorter than its prefix"
            )));
        }
        let control_byte_count = read_u32(table, 8)?;
        let rows = slice(table, PREFIX, header_length - PREFIX)?;
        let entries = rows
            .chunks_exact(ENTRY_SIZE)
            .map(|row| TagEntry {
                tag: row[0],
                values_per_entry: row[1],
                bitmask: row[2],
                control_byte: row[3],
            })
            .collect();
        Ok(Self {
            control_byte_count,
            entries,
        })
    }

    /// Bytes the table occupies.
    pub fn size(&self) -> usize {
        PREFIX + self.entries.len() * ENTRY_SIZE
    }
}
