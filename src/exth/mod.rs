//! EXTH metadata block embedded in record 0 after the MOBI header.
//!
//! ```text
//! "EXTH" | size: u32 | count: u32 | records... | zero pad to 4 bytes
//! record = type: u32 | length: u32 (incl. these 8 bytes) | data
//! ```
//!
//! Records keep their file order. A code may repeat (several subjects or
//! authors); unknown codes are round-tripped untouched.

pub mod record;
pub mod view;

pub use record::{ExthRecord, ExthTag};

use crate::codec::bytes::{self, read_u32};
use crate::error::{MobiError, Result};

/// Magic literal opening the block.
pub const MAGIC: &[u8; 4] = b"EXTH";

/// Size of the `{magic, size, count}` block prefix.
pub const BLOCK_PREFIX: usize = 12;

/// The ordered list of EXTH records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExthBlock {
    records: Vec<ExthRecord>,
}

impl ExthBlock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the block starting at `offset` inside `buf`.
    ///
    /// Returns the block and the extent it declares for itself, which may
    /// include padding or garbage beyond the records.
    pub fn parse(buf: &[u8], offset: usize) -> Result<(Self, usize)> {
        let magic = bytes::slice(buf, offset, 4)?;
        if magic != MAGIC {
            return Err(MobiError::MalformedHeader {
                expected: "EXTH".into(),
                actual: bytes::magic_display(magic),
            });
        }
        let declared_size = read_u32(buf, offset + 4)? as usize;
        let count = read_u32(buf, offset + 8)? as usize;

        let mut records = Vec::with_capacity(count.min(1024));
        let mut at = offset + BLOCK_PREFIX;
        for _ in 0..count {
            let code = read_u32(buf, at)?;
            let length = read_u32(buf, at + 4)?;
            let len = length as usize;
            if len < record::RECORD_PREFIX || at + len > buf.len() {
                return Err(MobiError::MalformedRecord { offset: at, length });
            }
            let data = buf[at + record::RECORD_PREFIX..at + len].to_vec();
            records.push(ExthRecord::with_code(code, data));
            at += len;
        }

        let block = Self { records };
        tracing::debug!(
            offset,
            records = block.records.len(),
            declared_size,
            "Parsed EXTH block"
        );
        Ok((block, declared_size.max(at - offset)))
    }

    /// Serialized size: prefix, records and padding to a 4-byte boundary.
    pub fn size(&self) -> usize {
        let records = self.records_len();
        BLOCK_PREFIX + records + padding(records)
    }

    /// Append the serialized block to `out`.
    pub fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(MAGIC);
        bytes::write_u32(out, self.size() as u32);
        bytes::write_u32(out, self.records.len() as u32);
        for record in &self.records {
            record.write(out);
        }
        out.resize(out.len() + padding(self.records_len()), 0);
    }

    pub fn records(&self) -> &[ExthRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records carrying `tag`, in file order.
    pub fn find(&self, tag: ExthTag) -> impl Iterator<Item = &ExthRecord> {
        self.records.iter().filter(move |r| r.is(tag))
    }

    /// Mutable records carrying `tag`, in file order.
    pub fn find_mut(&mut self, tag: ExthTag) -> impl Iterator<Item = &mut ExthRecord> {
        self.records.iter_mut().filter(move |r| r.is(tag))
    }

    /// First record carrying `tag`.
    pub fn first(&self, tag: ExthTag) -> Option<&ExthRecord> {
        self.find(tag).next()
    }

    pub fn push(&mut self, record: ExthRecord) {
        self.records.push(record);
    }

    /// Remove and return the record at `index`.
    pub fn remove(&mut self, index: usize) -> Option<ExthRecord> {
        (index < self.records.len()).then(|| self.records.remove(index))
    }

    /// Remove every record carrying `tag`, returning how many were dropped.
    pub fn remove_all(&mut self, tag: ExthTag) -> usize {
        let before = self.records.len();
        self.records.retain(|r| !r.is(tag));
        before - self.records.len()
    }

    /// Keep only the records for which `keep` returns true.
    pub fn retain_mut(&mut self, keep: impl FnMut(&mut ExthRecord) -> bool) {
        self.records.retain_mut(keep);
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    fn records_len(&self) -> usize {
        self.records.iter().map(ExthRecord::size).sum()
    }
}

fn padding(len: usize) -> usize {
    match len % 4 {
        0 => 0,
        rem => 4 - rem,
    }
}
