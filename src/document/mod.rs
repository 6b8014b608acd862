//! A MOBI book held in memory.
//!
//! [`Document`] owns the PDB header, the MOBI header (record 0) and every
//! following record with its classified type. All mutations go through its
//! methods, which keep the record pointers in the header pointing at records
//! of the right type.

pub mod metadata;
mod template;

use std::io::Write;
use std::path::Path;

use crate::codec::bytes::chunk;
use crate::codec::charset::Charset;
use crate::codec::lz77;
use crate::codec::trailing::strip_trailing_entries;
use crate::content::{is_image, Classifier, ContentRecord, ContentType, EOF_TRAILER};
use crate::error::{MobiError, Result};
use crate::exth::{ExthRecord, ExthTag};
use crate::index::IndexRecord;
use crate::mobi::header::DEFAULT_RECORD_SIZE;
use crate::mobi::{Compression, MobiHeader, NULL_INDEX};
use crate::pdb::PdbHeader;

pub use metadata::{
    asin_record, date_record, isbn_record, language_record, string_record, Metadata, MetadataMut,
};
pub use template::EMPTY_BODY;

/// Bytes the PalmDOC encoders of some producers leave in the text.
const STRAY_CONTROL_BYTES: [u8; 16] = [
    0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x12, 0x13, 0x14, 0x15, 0x19, 0x1C,
    0x1D,
];

#[derive(Debug, Clone)]
pub struct Document {
    pdb: PdbHeader,
    header: MobiHeader,
    /// Records 1.. of the database; `records[i]` is record `i + 1`.
    records: Vec<ContentRecord>,
}

impl Document {
    /// Parse a complete `.mobi` / `.prc` / `.azw` buffer.
    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        let pdb = PdbHeader::parse(buf)?;
        let raw = pdb.records(buf)?;
        let (first, rest) = raw.split_first().ok_or_else(|| MobiError::MalformedContainer {
            expected: "at least one record".into(),
            actual: "an empty record directory".into(),
        })?;
        let header = MobiHeader::parse(first)?;

        let classifier = Classifier::new(&header);
        let records = rest
            .iter()
            .enumerate()
            .map(|(i, data)| ContentRecord::new(classifier.classify(i + 1, data), data.to_vec()))
            .collect();

        let mut doc = Self {
            pdb,
            header,
            records,
        };
        doc.relink_control_records();
        tracing::info!(
            records = doc.record_count(),
            text_records = doc.header.record_count,
            title = %doc.title(),
            "Parsed document"
        );
        Ok(doc)
    }

    /// Memory-map and parse the book at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(MobiError::FileNotFound(path.to_path_buf()));
        }
        let file = std::fs::File::open(path).map_err(|e| MobiError::io(path, e))?;
        let len = file.metadata().map_err(|e| MobiError::io(path, e))?.len();
        if len == 0 {
            return Self::from_bytes(&[]);
        }
        // SAFETY: the map is read once into owned records and dropped before
        // returning; concurrent truncation by another process is not guarded.
        let mmap = unsafe { memmap2::Mmap::map(&file) }.map_err(|e| MobiError::io(path, e))?;
        tracing::debug!(path = %path.display(), len, "Mapped book");
        Self::from_bytes(&mmap)
    }

    /// A minimal valid book: empty title, empty EXTH block and an empty
    /// HTML body.
    ///
    /// The book has no images, so the first image index (3) names the FLIS
    /// record. A cover added later is inserted there, ahead of FLIS and FCIS.
    pub fn empty() -> Self {
        let body = EMPTY_BODY.as_bytes();
        let mut header = MobiHeader::default();
        header.exth_mut();
        header.set_full_name("");
        header.text_length = body.len() as u32;
        header.record_count = 1;
        header.first_content_index = 1;
        header.last_content_index = 1;
        header.first_non_book_index = 3;
        header.first_image_index = 3;

        let mut doc = Self {
            pdb: PdbHeader::new(""),
            header,
            records: vec![
                ContentRecord::new(ContentType::Content, lz77::encode(body)),
                ContentRecord::end_of_text(),
                ContentRecord::new(ContentType::Flis, template::flis_record()),
                ContentRecord::new(ContentType::Fcis, template::fcis_record(body.len() as u32)),
                ContentRecord::new(ContentType::Unknown, EOF_TRAILER.to_vec()),
            ],
        };
        doc.reclassify();
        doc
    }

    /// Serialize the book. Directory offsets are recomputed from scratch and
    /// the end-of-file trailer is appended when missing.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let trailer = self.needs_trailer();
        let mut sizes = Vec::with_capacity(self.records.len() + 2);
        sizes.push(self.header.size());
        sizes.extend(self.records.iter().map(ContentRecord::len));
        if trailer {
            sizes.push(EOF_TRAILER.len());
        }

        let total = PdbHeader::written_size(sizes.len()) + sizes.iter().sum::<usize>();
        let mut out = Vec::with_capacity(total);
        self.pdb.write(&sizes, &mut out)?;
        self.header.write(&mut out);
        for record in &self.records {
            out.extend_from_slice(&record.data);
        }
        if trailer {
            out.extend_from_slice(&EOF_TRAILER);
        }
        debug_assert_eq!(out.len(), total);
        Ok(out)
    }

    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        writer.write_all(&self.to_bytes()?)?;
        writer.flush()?;
        Ok(())
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let bytes = self.to_bytes()?;
        std::fs::write(path, &bytes).map_err(|e| MobiError::io(path, e))?;
        tracing::info!(path = %path.display(), bytes = bytes.len(), "Saved document");
        Ok(())
    }

    fn needs_trailer(&self) -> bool {
        !self
            .records
            .last()
            .is_some_and(|r| r.data.starts_with(&EOF_TRAILER))
    }

    // ── Structure ──────────────────────────────────────────────

    pub fn pdb(&self) -> &PdbHeader {
        &self.pdb
    }

    pub fn header(&self) -> &MobiHeader {
        &self.header
    }

    /// Records after the header; element 0 is record 1.
    pub fn records(&self) -> &[ContentRecord] {
        &self.records
    }

    /// Number of records including the header.
    pub fn record_count(&self) -> usize {
        self.records.len() + 1
    }

    /// Record `index` of the database. Index 0 is the header and has no
    /// content record.
    pub fn record(&self, index: usize) -> Option<&ContentRecord> {
        index.checked_sub(1).and_then(|i| self.records.get(i))
    }

    fn record_mut(&mut self, index: usize) -> Option<&mut ContentRecord> {
        index.checked_sub(1).and_then(|i| self.records.get_mut(i))
    }

    /// Decoded INDX records with their record index. Records that fail to
    /// decode are skipped with a warning.
    pub fn indices(&self) -> Vec<(usize, IndexRecord)> {
        self.records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.kind == ContentType::Index)
            .filter_map(|(i, r)| IndexRecord::decode(i + 1, &r.data).map(|index| (i + 1, index)))
            .collect()
    }

    pub fn character_encoding(&self) -> Charset {
        self.header.charset()
    }

    // ── Title and metadata ─────────────────────────────────────

    pub fn title(&self) -> String {
        self.header.full_name()
    }

    pub fn set_title(&mut self, title: &str) {
        self.header.set_full_name(title);
        tracing::debug!(title, "Title replaced");
    }

    pub fn metadata(&self) -> Metadata<'_> {
        Metadata::new(&self.header)
    }

    pub fn metadata_mut(&mut self) -> MetadataMut<'_> {
        MetadataMut::new(&mut self.header)
    }

    // ── Images ─────────────────────────────────────────────────

    pub fn cover(&self) -> Option<&[u8]> {
        self.image_for(ExthTag::CoverOffset)
    }

    pub fn thumbnail(&self) -> Option<&[u8]> {
        self.image_for(ExthTag::ThumbnailOffset)
    }

    /// Every record from the first image on that looks like an image.
    pub fn images(&self) -> Vec<&[u8]> {
        let Some(first) = self.first_image() else {
            return Vec::new();
        };
        self.records
            .iter()
            .skip(first.saturating_sub(1))
            .filter(|r| is_image(&r.data))
            .map(|r| r.data.as_slice())
            .collect()
    }

    /// Replace the cover, or add one before the other images.
    pub fn set_cover(&mut self, image: &[u8]) -> Result<()> {
        self.set_image(ExthTag::CoverOffset, ContentType::Cover, image)
    }

    /// Replace the thumbnail, or add one right after the cover.
    pub fn set_thumbnail(&mut self, image: &[u8]) -> Result<()> {
        self.set_image(ExthTag::ThumbnailOffset, ContentType::Thumbnail, image)
    }

    fn first_image(&self) -> Option<usize> {
        match self.header.first_image_index {
            NULL_INDEX => None,
            index => Some(index as usize),
        }
    }

    fn image_index(&self, tag: ExthTag) -> Option<usize> {
        let offset = self.header.exth()?.first(tag)?.as_u32()?;
        Some(self.first_image()? + offset as usize)
    }

    fn image_for(&self, tag: ExthTag) -> Option<&[u8]> {
        self.record(self.image_index(tag)?).map(|r| r.data.as_slice())
    }

    fn set_image(&mut self, tag: ExthTag, kind: ContentType, image: &[u8]) -> Result<()> {
        if image.is_empty() {
            return Err(MobiError::InvalidArgument(format!(
                "no image bytes for the {}",
                tag.label()
            )));
        }

        if self.header.exth().and_then(|exth| exth.first(tag)).is_some() {
            let count = self.record_count();
            let index = self.image_index(tag).ok_or_else(|| {
                MobiError::InvalidArgument(format!("{} set but first image index is not", tag.label()))
            })?;
            let record = self.record_mut(index).ok_or_else(|| {
                MobiError::InvalidArgument(format!(
                    "{} points at record {index}, book has {count}",
                    tag.label()
                ))
            })?;
            record.data = image.to_vec();
            record.kind = kind;
            tracing::debug!(index, kind = %kind, "Image replaced in place");
            return Ok(());
        }

        let first_image = self.ensure_first_image();
        let mut offset = match tag {
            ExthTag::ThumbnailOffset => self
                .image_index(ExthTag::CoverOffset)
                .map_or(0, |cover| cover + 1 - first_image),
            _ => 0,
        };
        let position = (first_image + offset).min(self.record_count());
        offset = position - first_image;

        self.insert_record(position, ContentRecord::new(kind, image.to_vec()));
        self.header
            .exth_mut()
            .push(ExthRecord::from_u32(tag, offset as u32));
        self.reclassify();
        tracing::debug!(position, offset, kind = %kind, "Image record inserted");
        Ok(())
    }

    /// The first image index, set to just after the text when unset.
    fn ensure_first_image(&mut self) -> usize {
        if let Some(first) = self.first_image() {
            return first.min(self.record_count());
        }
        let mut end = self.header.text_start() + self.header.record_count as usize;
        if self.record(end).is_some_and(|r| r.kind == ContentType::EndOfText) {
            end += 1;
        }
        let first = end.min(self.record_count());
        self.header.first_image_index = first as u32;
        if self.header.first_non_book_index == NULL_INDEX {
            self.header.first_non_book_index = first as u32;
        }
        first
    }

    /// Insert `record` as record `position` and shift every pointer at or
    /// past it. The first non-book and first image indices are boundaries:
    /// an insertion right at one moves what follows, not the boundary.
    fn insert_record(&mut self, position: usize, record: ContentRecord) {
        let position = position.clamp(1, self.record_count());
        self.records.insert(position - 1, record);

        for pointer in self.header.record_pointers_mut() {
            if *pointer != NULL_INDEX && *pointer as usize >= position {
                *pointer += 1;
            }
        }
        for content in [
            &mut self.header.first_content_index,
            &mut self.header.last_content_index,
        ] {
            if *content != u16::MAX && *content as usize >= position {
                *content = content.saturating_add(1);
            }
        }

        if self.header.first_non_book_index != NULL_INDEX
            && self.header.first_non_book_index as usize > position
        {
            self.header.first_non_book_index += 1;
        }
        match self.first_image() {
            Some(first) if first > position => self.header.first_image_index += 1,
            Some(first) if self.header.has_exth() => {
                for tag in [ExthTag::CoverOffset, ExthTag::ThumbnailOffset] {
                    for record in self.header.exth_mut().find_mut(tag) {
                        if let Some(offset) = record.as_u32() {
                            if first + offset as usize >= position {
                                record.set_u32(offset + 1);
                            }
                        }
                    }
                }
            }
            _ => {}
        }
    }

    /// Classify every record again and relink the control record fields.
    fn reclassify(&mut self) {
        let classifier = Classifier::new(&self.header);
        for (i, record) in self.records.iter_mut().enumerate() {
            record.kind = classifier.classify(i + 1, &record.data);
        }
        self.relink_control_records();
    }

    /// Point the FCIS, FLIS, SRCS and DATP fields at the first record of
    /// each type, or mark them absent.
    fn relink_control_records(&mut self) {
        let locate = |kind| {
            self.records
                .iter()
                .position(|r| r.kind == kind)
                .map(|i| (i + 1) as u32)
        };
        let (fcis, flis, srcs, datp) = (
            locate(ContentType::Fcis),
            locate(ContentType::Flis),
            locate(ContentType::Srcs),
            locate(ContentType::Datp),
        );
        let h = &mut self.header;
        (h.fcis_index, h.fcis_count) = fcis.map_or((NULL_INDEX, 0), |i| (i, 1));
        (h.flis_index, h.flis_count) = flis.map_or((NULL_INDEX, 0), |i| (i, 1));
        h.srcs_index = srcs.unwrap_or(NULL_INDEX);
        if srcs.is_none() {
            h.srcs_count = 0;
        } else if h.srcs_count == 0 {
            h.srcs_count = 1;
        }
        h.datp_index = datp.unwrap_or(NULL_INDEX);
    }

    // ── Text ───────────────────────────────────────────────────

    /// The book text: every text record decompressed, stray control bytes
    /// dropped, decoded with the book's character set.
    pub fn text_content(&self) -> Result<String> {
        let code = self.header.compression_code;
        let compression = self
            .header
            .compression()
            .ok_or(MobiError::UnsupportedCompression(code))?;
        if compression == Compression::HuffCdic {
            return Err(MobiError::UnsupportedCompression(code));
        }

        let flags = self.header.extra_record_data_flags;
        let mut raw = Vec::with_capacity(self.header.text_length as usize);
        for record in self.records.iter().filter(|r| r.kind == ContentType::Content) {
            let body = strip_trailing_entries(&record.data, flags);
            match compression {
                Compression::PalmDoc => raw.extend_from_slice(&lz77::decode(body)),
                _ => raw.extend_from_slice(body),
            }
        }

        let charset = self.header.charset();
        if charset != Charset::Utf16 {
            raw.retain(|b| !STRAY_CONTROL_BYTES.contains(b));
        }
        Ok(charset.decode(&raw).replace('\u{FFFD}', ""))
    }

    /// Replace the text using the default 4096-byte record size.
    pub fn set_text_content(&mut self, text: &str) -> Result<()> {
        self.set_text_content_with_record_size(text, DEFAULT_RECORD_SIZE)
    }

    /// Replace the text, splitting it into records of `record_size`
    /// uncompressed bytes.
    ///
    /// The old text records, the index records after them and the end-of-text
    /// marker are removed up to the first image. Pointers into the removed
    /// range become absent. Each new record is compressed on its own.
    pub fn set_text_content_with_record_size(&mut self, text: &str, record_size: u16) -> Result<()> {
        if record_size == 0 {
            return Err(MobiError::InvalidArgument("record size must be positive".into()));
        }
        let encoded = self.header.charset().encode(text);
        let text_length = u32::try_from(encoded.len()).map_err(|_| {
            MobiError::InvalidArgument(format!("text of {} bytes is too long", encoded.len()))
        })?;
        let mut chunks: Vec<ContentRecord> = chunk(&encoded, record_size as usize)
            .into_iter()
            .map(|part| ContentRecord::new(ContentType::Content, lz77::encode(part)))
            .collect();
        if chunks.is_empty() {
            chunks.push(ContentRecord::new(ContentType::Content, Vec::new()));
        }

        let first = self.header.text_start().min(self.record_count());
        let text_records = chunks.len();
        let last_text = first + text_records - 1;
        let (Ok(record_count), Ok(first_u16), Ok(last_u16)) = (
            u16::try_from(text_records),
            u16::try_from(first),
            u16::try_from(last_text),
        ) else {
            return Err(MobiError::InvalidArgument(format!(
                "{text_records} text records do not fit the header"
            )));
        };

        let mut end = first + self.header.record_count as usize;
        if self.record(end).is_some_and(|r| r.kind == ContentType::EndOfText) {
            end += 1;
        }
        let old_first_image = self.first_image();
        if let Some(first_image) = old_first_image {
            end = end.max(first_image);
        }
        let end = end.clamp(first, self.record_count());

        let removed = end - first;
        let inserted = text_records + 1;
        chunks.push(ContentRecord::end_of_text());
        self.records.splice(first - 1..end - 1, chunks);

        let rebase = |index: usize| -> Option<usize> {
            if index >= end {
                Some(index - removed + inserted)
            } else if index >= first {
                None
            } else {
                Some(index)
            }
        };
        for pointer in self.header.record_pointers_mut() {
            if *pointer != NULL_INDEX {
                *pointer = rebase(*pointer as usize).map_or(NULL_INDEX, |i| i as u32);
            }
        }

        let new_first_image = first + inserted;
        if let Some(old) = old_first_image.filter(|_| self.header.has_exth()) {
            self.header.exth_mut().retain_mut(|record| {
                if !(record.is(ExthTag::CoverOffset) || record.is(ExthTag::ThumbnailOffset)) {
                    return true;
                }
                let Some(offset) = record.as_u32() else {
                    return true;
                };
                match rebase(old + offset as usize) {
                    Some(index) if index >= new_first_image => {
                        record.set_u32((index - new_first_image) as u32);
                        true
                    }
                    _ => false,
                }
            });
        }

        let h = &mut self.header;
        h.set_compression(Compression::PalmDoc);
        h.text_length = text_length;
        h.record_count = record_count;
        h.record_size = record_size;
        h.extra_record_data_flags = 0;
        h.huffman_record_offset = 0;
        h.huffman_record_count = 0;
        h.huffman_table_offset = 0;
        h.huffman_table_length = 0;
        h.first_content_index = first_u16;
        h.last_content_index = last_u16;
        h.first_non_book_index = new_first_image as u32;
        h.first_image_index = new_first_image as u32;

        self.reclassify();
        for record in self.records.iter_mut().filter(|r| r.kind == ContentType::Fcis) {
            template::patch_fcis_text_length(&mut record.data, text_length);
        }
        tracing::debug!(
            removed,
            text_records,
            text_length,
            first_image = new_first_image,
            "Text replaced"
        );
        Ok(())
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::empty()
    }
}
