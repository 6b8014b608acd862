use std::sync::OnceLock;

use crate::error::{MobiError, Result};
use crate::exth::record::ExthRecord;

static LANGUAGE_CODES: OnceLock<Vec<&'static str>> = OnceLock::new();

/// Accepted language codes: ISO 639-1 plus common region variants.
pub fn language_codes() -> &'static [&'static str] {
    LANGUAGE_CODES.get_or_init(|| {
        include_str!("../../../resources/languagecodes.txt")
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .collect()
    })
}

pub fn is_valid_language_code(code: &str) -> bool {
    language_codes().contains(&code)
}

/// Language record (UTF-8 code such as `de` or `en-US`).
#[derive(Debug)]
pub struct LanguageView<R> {
    record: R,
}

impl<R: AsRef<ExthRecord>> LanguageView<R> {
    pub fn new(record: R) -> Self {
        Self { record }
    }

    pub fn language_code(&self) -> String {
        String::from_utf8_lossy(self.record.as_ref().data()).into_owned()
    }

    pub fn record(&self) -> &ExthRecord {
        self.record.as_ref()
    }

    pub fn into_record(self) -> R {
        self.record
    }
}

impl<R: AsRef<ExthRecord> + AsMut<ExthRecord>> LanguageView<R> {
    /// Store `code` if it is in [`language_codes`].
    pub fn set_language_code(&mut self, code: &str) -> Result<()> {
        if !is_valid_language_code(code) {
            return Err(MobiError::InvalidArgument(format!(
                "invalid language code '{code}'"
            )));
        }
        self.record.as_mut().set_data(code.as_bytes().to_vec());
        Ok(())
    }
}
