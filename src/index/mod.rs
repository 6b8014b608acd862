//! Navigation index records (INDX with its TAGX and IDXT tables).
//!
//! Index records are decoded for inspection only. The document always
//! writes them back from their raw bytes.

pub mod idxt;
pub mod indx;
pub mod tagx;

pub use idxt::IdxtTable;
pub use indx::{IndexType, IndxHeader, OrdtInfo};
pub use tagx::{TagEntry, TagEntryType, TagxTable};

use crate::error::Result;

/// A decoded INDX record.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct IndexRecord {
    pub header: IndxHeader,
    pub tagx: Option<TagxTable>,
    pub idxt: Option<IdxtTable>,
}

impl IndexRecord {
    /// Decode the INDX header and whichever tables it points at.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let header = IndxHeader::parse(data)?;
        let tagx = match header.tagx_offset {
            0 => None,
            offset => Some(TagxTable::parse(data, offset as usize)?),
        };
        let idxt_offset = header.idxt_offset as usize;
        let idxt = if idxt_offset >= indx::MAGIC.len() && idxt_offset < data.len() {
            Some(IdxtTable::parse(
                data,
                idxt_offset,
                header.entry_count as usize,
            )?)
        } else {
            None
        };
        Ok(Self { header, tagx, idxt })
    }

    /// Like [`IndexRecord::parse`] but logs failures instead of returning them.
    pub fn decode(index: usize, data: &[u8]) -> Option<Self> {
        match Self::parse(data) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(record = index, error = %e, "undecodable index record kept raw");
                None
            }
        }
    }

    pub fn index_type(&self) -> Option<IndexType> {
        self.header.index_type()
    }

    pub fn entry_count(&self) -> u32 {
        self.header.entry_count
    }
}
