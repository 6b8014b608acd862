//! The MOBI header stored in record 0.

pub mod header;

pub use header::{MobiHeader, DEFAULT_HEADER_LENGTH, NULL_INDEX};

/// Text compression declared by the PalmDOC part of the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    PalmDoc,
    HuffCdic,
}

impl Compression {
    pub const ALL: [Compression; 3] = [Self::None, Self::PalmDoc, Self::HuffCdic];

    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            1 => Some(Self::None),
            2 => Some(Self::PalmDoc),
            17480 => Some(Self::HuffCdic),
            _ => None,
        }
    }

    pub fn code(self) -> u16 {
        match self {
            Self::None => 1,
            Self::PalmDoc => 2,
            Self::HuffCdic => 17480,
        }
    }
}

impl std::fmt::Display for Compression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::None => "none",
            Self::PalmDoc => "PalmDOC",
            Self::HuffCdic => "HUFF/CDIC",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compression_codes_are_injective() {
        let mut codes: Vec<u16> = Compression::ALL.iter().map(|c| c.code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), Compression::ALL.len());
        for c in Compression::ALL {
            assert_eq!(Compression::from_code(c.code()), Some(c));
        }
        assert_eq!(Compression::from_code(0), None);
    }
}
