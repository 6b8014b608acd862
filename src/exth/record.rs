//! A single EXTH record and the table of known record codes.

use crate::codec::bytes;

/// Size of the `{type, length}` prefix of every record.
pub const RECORD_PREFIX: usize = 8;

macro_rules! exth_tags {
    ($($variant:ident = $code:literal => $label:literal,)+) => {
        /// Known EXTH record codes.
        ///
        /// Records with codes outside this table are kept verbatim; see
        /// [`ExthRecord::code`].
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum ExthTag {
            $($variant,)+
        }

        impl ExthTag {
            /// Every known tag, in code order.
            pub const ALL: &'static [ExthTag] = &[$(ExthTag::$variant,)+];

            /// Look up a tag by its numeric code.
            pub fn from_code(code: u32) -> Option<Self> {
                match code {
                    $($code => Some(Self::$variant),)+
                    _ => None,
                }
            }

            /// The numeric code written to the file.
            pub fn code(self) -> u32 {
                match self {
                    $(Self::$variant => $code,)+
                }
            }

            /// Human-readable name, e.g. `"publishing date"`.
            pub fn label(self) -> &'static str {
                match self {
                    $(Self::$variant => $label,)+
                }
            }
        }
    };
}

exth_tags! {
    Author = 100 => "author",
    Publisher = 101 => "publisher",
    Imprint = 102 => "imprint",
    Description = 103 => "description",
    Isbn = 104 => "isbn",
    Subject = 105 => "subject",
    PublishingDate = 106 => "publishing date",
    Review = 107 => "review",
    Contributor = 108 => "contributor",
    Rights = 109 => "rights",
    SubjectCode = 110 => "subject code",
    Type = 111 => "type",
    Source = 112 => "source",
    Asin = 113 => "asin",
    VersionNumber = 114 => "version number",
    Sample = 115 => "sample",
    StartReading = 116 => "start reading",
    Adult = 117 => "adult",
    RetailPrice = 118 => "retail price",
    RetailPriceCurrency = 119 => "retail price currency",
    Tsc = 120 => "tsc",
    Kf8BoundaryOffset = 121 => "kf8 boundary offset",
    FixedLayout = 122 => "fixed layout",
    BookType = 123 => "book type",
    OrientationLock = 124 => "orientation lock",
    CountOfResources = 125 => "count of resources",
    OriginalResolution = 126 => "original resolution",
    ZeroGutter = 127 => "zero gutter",
    ZeroMargin = 128 => "zero margin",
    Kf8CoverUri = 129 => "kf8 cover uri",
    Unknown131 = 131 => "unknown 131",
    RegionMagnification = 132 => "region magnification",
    LendingEnabled = 150 => "lending enabled",
    DictionaryShortName = 200 => "dictionary short name",
    CoverOffset = 201 => "cover offset",
    ThumbnailOffset = 202 => "thumbnail offset",
    HasFakeCover = 203 => "has fake cover",
    CreatorSoftware = 204 => "creator software",
    CreatorMajor = 205 => "creator major",
    CreatorMinor = 206 => "creator minor",
    CreatorBuild = 207 => "creator build",
    Watermark = 208 => "watermark",
    TamperProofKeys = 209 => "tamper proof keys",
    FontSignature = 300 => "font signature",
    ClippingLimit = 401 => "clipping limit",
    PublisherLimit = 402 => "publisher limit",
    Unknown403 = 403 => "unknown 403",
    TtsOff = 404 => "text to speech disabled",
    Borrowed = 405 => "borrowed",
    BorrowedExpiration = 406 => "borrowed expiration",
    Unknown407 = 407 => "unknown 407",
    Unknown450 = 450 => "unknown 450",
    Unknown451 = 451 => "unknown 451",
    Unknown452 = 452 => "unknown 452",
    Unknown453 = 453 => "unknown 453",
    CdeType = 501 => "cde type",
    LastUpdateTime = 502 => "last update time",
    UpdatedTitle = 503 => "updated title",
    AsinCopy = 504 => "asin copy",
    AmazonContentReference = 505 => "amazon content reference",
    TitleLanguage = 506 => "title language",
    TitleDisplayDirection = 507 => "title display direction",
    TitlePronunciation = 508 => "title pronunciation",
    TitleCollation = 509 => "title collation",
    SecondaryTitle = 510 => "secondary title",
    SecondaryTitleLanguage = 511 => "secondary title language",
    SecondaryTitleDirection = 512 => "secondary title direction",
    SecondaryTitlePronunciation = 513 => "secondary title pronunciation",
    SecondaryTitleCollation = 514 => "secondary title collation",
    AuthorLanguage = 515 => "author language",
    AuthorDisplayDirection = 516 => "author display direction",
    AuthorPronunciation = 517 => "author pronunciation",
    AuthorCollation = 518 => "author collation",
    AuthorType = 519 => "author type",
    PublisherLanguage = 520 => "publisher language",
    PublisherDisplayDirection = 521 => "publisher display direction",
    PublisherPronunciation = 522 => "publisher pronunciation",
    PublisherCollation = 523 => "publisher collation",
    Language = 524 => "language",
    Alignment = 525 => "alignment",
    NcxIngestedBySoftware = 526 => "ncx ingested by software",
    PageProgressionDirection = 527 => "page progression direction",
    OverrideKindleFonts = 528 => "override kindle fonts",
    CompressionUpgraded = 529 => "compression upgraded",
    SoftHyphensInContent = 530 => "soft hyphens in content",
    DictionaryInLanguage = 531 => "dictionary input language",
    DictionaryOutLanguage = 532 => "dictionary output language",
    FontConverted = 533 => "font converted",
    AmazonCreatorInfo = 534 => "amazon creator info",
    CreatorBuildNumberCopy = 535 => "creator build number",
    HdMediaContainersInfo = 536 => "hd media containers info",
    ResourceContainerFidelity = 538 => "resource container fidelity",
    HdContainerMimetype = 539 => "hd container mimetype",
    SampleForSpecialPurpose = 540 => "sample for special purpose",
    KindletoolOperationInformation = 541 => "kindletool operation information",
    ContainerId = 542 => "container id",
    AssetType = 543 => "asset type",
    Unknown544 = 544 => "unknown 544",
    InMemory = 547 => "in memory",
}

impl std::fmt::Display for ExthTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One `{type, length, data}` entry of the EXTH block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExthRecord {
    code: u32,
    data: Vec<u8>,
}

impl ExthRecord {
    /// Create a record for a known tag.
    pub fn new(tag: ExthTag, data: Vec<u8>) -> Self {
        Self::with_code(tag.code(), data)
    }

    /// Create a record for any numeric code, known or not.
    pub fn with_code(code: u32, data: Vec<u8>) -> Self {
        Self { code, data }
    }

    /// Create a record holding a big-endian 32-bit integer.
    pub fn from_u32(tag: ExthTag, value: u32) -> Self {
        Self::new(tag, value.to_be_bytes().to_vec())
    }

    pub fn code(&self) -> u32 {
        self.code
    }

    /// The tag for this record's code, or `None` for codes outside the table.
    pub fn tag(&self) -> Option<ExthTag> {
        ExthTag::from_code(self.code)
    }

    pub fn is(&self, tag: ExthTag) -> bool {
        self.code == tag.code()
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn set_data(&mut self, data: Vec<u8>) {
        self.data = data;
    }

    /// Data read as an unsigned big-endian integer.
    ///
    /// `None` when the data is empty or wider than 4 bytes.
    pub fn as_u32(&self) -> Option<u32> {
        if self.data.is_empty() || self.data.len() > 4 {
            return None;
        }
        bytes::read_uint(&self.data, 0, self.data.len())
            .ok()
            .map(|v| v as u32)
    }

    /// Replace the data with a 4-byte big-endian integer.
    pub fn set_u32(&mut self, value: u32) {
        self.data = value.to_be_bytes().to_vec();
    }

    /// Serialized length including the 8-byte prefix.
    pub fn size(&self) -> usize {
        self.data.len() + RECORD_PREFIX
    }

    pub(crate) fn write(&self, out: &mut Vec<u8>) {
        bytes::write_u32(out, self.code);
        bytes::write_u32(out, self.size() as u32);
        out.extend_from_slice(&self.data);
    }
}

impl AsRef<ExthRecord> for ExthRecord {
    fn as_ref(&self) -> &ExthRecord {
        self
    }
}

impl AsMut<ExthRecord> for ExthRecord {
    fn as_mut(&mut self) -> &mut ExthRecord {
        self
    }
}
