//! Palm database (PDB) envelope.
//!
//! ```text
//! ┌──────────────────────────────────────┐
//! │ HEADER (78 bytes)                    │
//! │  name: [u8; 32]                      │
//! │  attributes: u16, version: u16       │
//! │  creation/modification/backup: u32   │
//! │  modification_number: u32            │
//! │  app_info_id, sort_info_id: u32      │
//! │  type, creator: u32                  │
//! │  unique_id_seed: u32                 │
//! │  next_record_list_id: u32            │
//! │  record_count: u16                   │
//! ├──────────────────────────────────────┤
//! │ DIRECTORY (8 bytes per record)       │
//! │  offset: u32, attributes: u8,        │
//! │  unique_id: u24                      │
//! ├──────────────────────────────────────┤
//! │ PAD (2 bytes)                        │
//! ├──────────────────────────────────────┤
//! │ RECORDS                              │
//! └──────────────────────────────────────┘
//! ```

use std::ops::Range;

use crate::codec::bytes::{self, read_u16, read_u32, read_u8, read_uint};
use crate::codec::charset::Charset;
use crate::error::{MobiError, Result};

/// Size of the fixed header before the record directory.
pub const HEADER_SIZE: usize = 78;

/// Size of one record directory entry.
pub const ENTRY_SIZE: usize = 8;

/// Padding written after the directory.
pub const DIRECTORY_PAD: usize = 2;

/// Width of the database name field.
pub const NAME_SIZE: usize = 32;

/// `BOOK` type identifier.
pub const TYPE_BOOK: u32 = u32::from_be_bytes(*b"BOOK");

/// `MOBI` creator identifier.
pub const CREATOR_MOBI: u32 = u32::from_be_bytes(*b"MOBI");

/// One entry of the record directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordEntry {
    /// Absolute offset of the record data.
    pub offset: u32,
    /// Record attribute bits.
    pub attributes: u8,
    /// 24-bit unique identifier.
    pub unique_id: u32,
}

/// The PDB header and its record directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdbHeader {
    pub name: String,
    pub attributes: u16,
    pub version: u16,
    pub creation_date: u32,
    pub modification_date: u32,
    pub last_backup_date: u32,
    pub modification_number: u32,
    pub app_info_id: u32,
    pub sort_info_id: u32,
    pub type_id: u32,
    pub creator: u32,
    pub unique_id_seed: u32,
    pub next_record_list_id: u32,
    /// Directory as read from the source. Rewritten from scratch on write.
    pub entries: Vec<RecordEntry>,
}

impl PdbHeader {
    /// Parse the header and directory from the start of `buf`.
    pub fn parse(buf: &[u8]) -> Result<Self> {
        if buf.len() < HEADER_SIZE {
            return Err(MobiError::truncated("PDB header", HEADER_SIZE, buf.len()));
        }

        let record_count = read_u16(buf, 76)? as usize;
        let directory_end = HEADER_SIZE + record_count * ENTRY_SIZE;
        if buf.len() < directory_end {
            return Err(MobiError::truncated(
                "PDB record directory",
                directory_end,
                buf.len(),
            ));
        }

        let entries = (0..record_count)
            .map(|i| {
                let at = HEADER_SIZE + i * ENTRY_SIZE;
                Ok(RecordEntry {
                    offset: read_u32(buf, at)?,
                    attributes: read_u8(buf, at + 4)?,
                    unique_id: read_uint(buf, at + 5, 3)? as u32,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let header = Self {
            name: bytes::read_fixed_string(buf, 0, NAME_SIZE, Charset::Windows1252)?,
            attributes: read_u16(buf, 32)?,
            version: read_u16(buf, 34)?,
            creation_date: read_u32(buf, 36)?,
            modification_date: read_u32(buf, 40)?,
            last_backup_date: read_u32(buf, 44)?,
            modification_number: read_u32(buf, 48)?,
            app_info_id: read_u32(buf, 52)?,
            sort_info_id: read_u32(buf, 56)?,
            type_id: read_u32(buf, 60)?,
            creator: read_u32(buf, 64)?,
            unique_id_seed: read_u32(buf, 68)?,
            next_record_list_id: read_u32(buf, 72)?,
            entries,
        };

        tracing::debug!(
            name = %header.name,
            records = record_count,
            "Parsed PDB header"
        );
        Ok(header)
    }

    /// A header for a freshly created `BOOKMOBI` database.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            attributes: 0,
            version: 0,
            creation_date: 0,
            modification_date: 0,
            last_backup_date: 0,
            modification_number: 0,
            app_info_id: 0,
            sort_info_id: 0,
            type_id: TYPE_BOOK,
            creator: CREATOR_MOBI,
            unique_id_seed: 0,
            next_record_list_id: 0,
            entries: Vec::new(),
        }
    }

    /// Number of records declared by the directory.
    pub fn record_count(&self) -> usize {
        self.entries.len()
    }

    /// Byte range of record `index` inside a buffer of `buf_len` bytes.
    ///
    /// A record ends where the next one starts; the last record runs to the
    /// end of the buffer.
    pub fn record_range(&self, index: usize, buf_len: usize) -> Result<Range<usize>> {
        let entry = self.entries.get(index).ok_or_else(|| {
            MobiError::InvalidArgument(format!(
                "record {index} out of range (0..{})",
                self.entries.len()
            ))
        })?;
        let start = entry.offset as usize;
        let end = match self.entries.get(index + 1) {
            Some(next) => next.offset as usize,
            None => buf_len,
        };
        if start > end || end > buf_len {
            return Err(MobiError::MalformedContainer {
                expected: format!("record {index} within 0..{buf_len}"),
                actual: format!("{start}..{end}"),
            });
        }
        Ok(start..end)
    }

    /// Borrow every record's bytes from `buf`, in directory order.
    pub fn records<'a>(&self, buf: &'a [u8]) -> Result<Vec<&'a [u8]>> {
        (0..self.entries.len())
            .map(|i| self.record_range(i, buf.len()).map(|range| &buf[range]))
            .collect()
    }

    /// Append the header, a directory computed from `record_sizes`, and the
    /// trailing pad.
    ///
    /// Record 0 is the MOBI header record. Offsets are derived from the sizes
    /// alone; parsed offsets are never reused.
    pub fn write(&self, record_sizes: &[usize], out: &mut Vec<u8>) -> Result<()> {
        let count = u16::try_from(record_sizes.len()).map_err(|_| {
            MobiError::InvalidArgument(format!(
                "{} records exceed the PDB limit of {}",
                record_sizes.len(),
                u16::MAX
            ))
        })?;

        bytes::write_fixed_string(out, &self.name, NAME_SIZE, Charset::Windows1252);
        bytes::write_u16(out, self.attributes);
        bytes::write_u16(out, self.version);
        for value in [
            self.creation_date,
            self.modification_date,
            self.last_backup_date,
            self.modification_number,
            self.app_info_id,
            self.sort_info_id,
            self.type_id,
            self.creator,
            self.unique_id_seed,
            self.next_record_list_id,
        ] {
            bytes::write_u32(out, value);
        }
        bytes::write_u16(out, count);

        let mut offset = HEADER_SIZE + record_sizes.len() * ENTRY_SIZE + DIRECTORY_PAD;
        for (index, size) in record_sizes.iter().enumerate() {
            let at = u32::try_from(offset).map_err(|_| {
                MobiError::InvalidArgument(format!("record {index} starts beyond 4 GiB"))
            })?;
            bytes::write_u32(out, at);
            out.push(0);
            bytes::write_uint(out, index as u64, 3);
            offset += size;
        }

        out.resize(out.len() + DIRECTORY_PAD, 0);
        Ok(())
    }

    /// Bytes [`PdbHeader::write`] emits for `count` records.
    pub fn written_size(count: usize) -> usize {
        HEADER_SIZE + count * ENTRY_SIZE + DIRECTORY_PAD
    }
}
