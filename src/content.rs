//! Records following the MOBI header and how they are told apart.
//!
//! Records carry no type tag. Their type comes from position (text range,
//! end-of-text marker, cover and thumbnail offsets) and from magic bytes.

use crate::codec::bytes::starts_with_magic;
use crate::exth::ExthTag;
use crate::mobi::{MobiHeader, NULL_INDEX};

/// What a record after the header holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Content,
    Index,
    Tagx,
    Tag,
    Idxt,
    Flis,
    Fcis,
    Fdst,
    Datp,
    Srcs,
    Cmet,
    Audio,
    Video,
    EndOfText,
    Cover,
    Thumbnail,
    Image,
    Unknown,
}

/// Types recognized by their leading four bytes, in match order.
const MAGIC_TYPES: &[(&[u8; 4], ContentType)] = &[
    (b"INDX", ContentType::Index),
    (b"TAGX", ContentType::Tagx),
    (b"FLIS", ContentType::Flis),
    (b"FCIS", ContentType::Fcis),
    (b"FDST", ContentType::Fdst),
    (b"DATP", ContentType::Datp),
    (b"SRCS", ContentType::Srcs),
    (b"CMET", ContentType::Cmet),
    (b"AUDI", ContentType::Audio),
    (b"VIDE", ContentType::Video),
    (b"IDXT", ContentType::Idxt),
];

/// End-of-text marker written after the last text record.
pub const END_OF_TEXT: [u8; 2] = [0, 0];

/// End-of-file trailer closing a book.
pub const EOF_TRAILER: [u8; 4] = [0xE9, 0x8E, 0x0D, 0x0A];

impl ContentType {
    /// The magic literal identifying this type, if it has one.
    pub fn magic(self) -> Option<&'static [u8; 4]> {
        MAGIC_TYPES
            .iter()
            .find(|(_, t)| *t == self)
            .map(|(magic, _)| *magic)
    }

    /// The type whose magic literal starts `bytes`.
    pub fn from_magic(bytes: &[u8]) -> Option<Self> {
        MAGIC_TYPES
            .iter()
            .find(|(magic, _)| starts_with_magic(bytes, *magic))
            .map(|(_, t)| *t)
    }

    pub fn is_image(self) -> bool {
        matches!(self, Self::Cover | Self::Thumbnail | Self::Image)
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Content => "text",
            Self::Index => "INDX",
            Self::Tagx => "TAGX",
            Self::Tag => "tag",
            Self::Idxt => "IDXT",
            Self::Flis => "FLIS",
            Self::Fcis => "FCIS",
            Self::Fdst => "FDST",
            Self::Datp => "DATP",
            Self::Srcs => "SRCS",
            Self::Cmet => "CMET",
            Self::Audio => "AUDI",
            Self::Video => "VIDE",
            Self::EndOfText => "end of text",
            Self::Cover => "cover",
            Self::Thumbnail => "thumbnail",
            Self::Image => "image",
            Self::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// A record with its classified type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentRecord {
    pub kind: ContentType,
    pub data: Vec<u8>,
}

impl ContentRecord {
    pub fn new(kind: ContentType, data: Vec<u8>) -> Self {
        Self { kind, data }
    }

    pub fn end_of_text() -> Self {
        Self::new(ContentType::EndOfText, END_OF_TEXT.to_vec())
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Whether `data` starts with a known image signature.
///
/// GIF, PNG, JPEG (SOI or EOI), BMP, TIFF (both byte orders), PSD,
/// PBM/PGM/PPM (ASCII and binary) and JBIG2. Records of four bytes or less
/// never count as images.
pub fn is_image(data: &[u8]) -> bool {
    if data.len() <= 4 {
        return false;
    }
    matches!(
        (data[0], data[1]),
        (0x47, 0x49)
            | (0x89, 0x50)
            | (0xFF, 0xD8)
            | (0xFF, 0xD9)
            | (0x42, 0x4D)
            | (0x4D, 0x4D)
            | (0x49, 0x49)
            | (0x38, 0x42)
            | (0x50, 0x31..=0x36)
    ) || data[..4] == [0x97, 0x4A, 0x42, 0x32]
}

/// Header positions the classifier depends on.
#[derive(Debug, Clone)]
pub struct Classifier {
    text_start: usize,
    text_count: usize,
    first_image: Option<usize>,
    cover_offsets: Vec<u32>,
    thumbnail_offsets: Vec<u32>,
}

impl Classifier {
    pub fn new(header: &MobiHeader) -> Self {
        let offsets = |tag| {
            header
                .exth()
                .map(|exth| exth.find(tag).filter_map(|r| r.as_u32()).collect())
                .unwrap_or_default()
        };
        Self {
            text_start: header.text_start(),
            text_count: header.record_count as usize,
            first_image: (header.first_image_index != NULL_INDEX)
                .then_some(header.first_image_index as usize),
            cover_offsets: offsets(ExthTag::CoverOffset),
            thumbnail_offsets: offsets(ExthTag::ThumbnailOffset),
        }
    }

    /// Type of the record at `index` (record 0 being the header).
    ///
    /// Position beats content: a text record that happens to start with
    /// `INDX` is still text.
    pub fn classify(&self, index: usize, data: &[u8]) -> ContentType {
        let text_end = self.text_start + self.text_count;
        if index >= self.text_start && index < text_end {
            return ContentType::Content;
        }
        if index == text_end && data == END_OF_TEXT {
            return ContentType::EndOfText;
        }
        if let Some(kind) = ContentType::from_magic(data) {
            if kind != ContentType::Idxt {
                return kind;
            }
        }
        if self.is_at_offset(&self.cover_offsets, index) {
            return ContentType::Cover;
        }
        if self.is_at_offset(&self.thumbnail_offsets, index) {
            return ContentType::Thumbnail;
        }
        if is_image(data) {
            return ContentType::Image;
        }
        ContentType::Unknown
    }

    fn is_at_offset(&self, offsets: &[u32], index: usize) -> bool {
        self.first_image
            .is_some_and(|first| offsets.iter().any(|&o| first + o as usize == index))
    }
}
