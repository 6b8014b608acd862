//! IDXT: offsets of the entries inside an index record.

use crate::codec::bytes::{read_u16, starts_with_magic};
use crate::error::{MobiError, Result};

pub const MAGIC: &[u8; 4] = b"IDXT";

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct IdxtTable {
    /// Record-relative offset of each entry.
    pub offsets: Vec<u16>,
}

impl IdxtTable {
    /// Parse `count` entry offsets following the magic at `offset`.
    pub fn parse(buf: &[u8], offset: usize, count: usize) -> Result<Self> {
        let table = buf.get(offset..).unwrap_or_default();
        if !starts_with_magic(table, MAGIC) {
            return Err(MobiError::MalformedIndex(format!(
                "expected IDXT at offset {offset}"
            )));
        }
        let offsets = (0..count)
            .map(|i| read_u16(table, MAGIC.len() + 2 * i))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { offsets })
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }
}
