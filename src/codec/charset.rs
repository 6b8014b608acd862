//! Character sets declared by the MOBI `textEncoding` field.

use encoding_rs::{UTF_16BE, UTF_8, WINDOWS_1252};

/// Character set used for the title, string metadata and body text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Charset {
    /// Code page 1252.
    Windows1252,
    /// Code page 65001.
    Utf8,
    /// Code page 65002 (big-endian; a leading BOM is honoured on decode).
    Utf16,
    /// Any other code page. Decoded as lossy UTF-8.
    Unknown(u32),
}

impl Charset {
    /// Map a MOBI `textEncoding` code to a character set.
    pub fn from_text_encoding(code: u32) -> Self {
        match code {
            1252 => Self::Windows1252,
            65001 => Self::Utf8,
            65002 => Self::Utf16,
            other => Self::Unknown(other),
        }
    }

    /// The MOBI `textEncoding` code for this character set.
    pub fn text_encoding(self) -> u32 {
        match self {
            Self::Windows1252 => 1252,
            Self::Utf8 => 65001,
            Self::Utf16 => 65002,
            Self::Unknown(code) => code,
        }
    }

    /// Canonical label, e.g. `"UTF-8"`. `None` for unknown code pages.
    pub fn label(self) -> Option<&'static str> {
        match self {
            Self::Windows1252 => Some("Windows-1252"),
            Self::Utf8 => Some("UTF-8"),
            Self::Utf16 => Some("UTF-16"),
            Self::Unknown(_) => None,
        }
    }

    /// Decode bytes, replacing malformed sequences with U+FFFD.
    pub fn decode(self, bytes: &[u8]) -> String {
        let encoding = match self {
            Self::Windows1252 => WINDOWS_1252,
            Self::Utf16 => UTF_16BE,
            Self::Utf8 | Self::Unknown(_) => UTF_8,
        };
        let (text, _, had_errors) = encoding.decode(bytes);
        if had_errors {
            tracing::debug!(charset = ?self, len = bytes.len(), "Lossy text decode");
        }
        text.into_owned()
    }

    /// Decode up to the first NUL terminator (a `00 00` code unit for UTF-16).
    pub fn decode_nul_terminated(self, bytes: &[u8]) -> String {
        let end = match self {
            Self::Utf16 => bytes
                .chunks_exact(2)
                .position(|unit| unit == [0, 0])
                .map(|i| i * 2)
                .unwrap_or(bytes.len()),
            _ => bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len()),
        };
        self.decode(&bytes[..end])
    }

    /// Encode text. Characters missing from Windows-1252 become numeric
    /// character references, matching encoding_rs behaviour.
    pub fn encode(self, text: &str) -> Vec<u8> {
        match self {
            Self::Windows1252 => WINDOWS_1252.encode(text).0.into_owned(),
            Self::Utf16 => text.encode_utf16().flat_map(u16::to_be_bytes).collect(),
            Self::Utf8 | Self::Unknown(_) => text.as_bytes().to_vec(),
        }
    }
}

impl std::fmt::Display for Charset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.label() {
            Some(label) => f.write_str(label),
            None => write!(f, "unknown ({})", self.text_encoding()),
        }
    }
}
