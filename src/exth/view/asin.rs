use crate::error::{MobiError, Result};
use crate::exth::record::ExthRecord;

/// Whether `asin` is exactly ten ASCII letters or digits.
pub fn is_valid_asin(asin: &str) -> bool {
    asin.len() == 10 && asin.bytes().all(|b| b.is_ascii_alphanumeric())
}

/// Amazon Standard Identification Number record (UTF-8).
#[derive(Debug)]
pub struct AsinView<R> {
    record: R,
}

impl<R: AsRef<ExthRecord>> AsinView<R> {
    pub fn new(record: R) -> Self {
        Self { record }
    }

    pub fn asin(&self) -> String {
        String::from_utf8_lossy(self.record.as_ref().data()).into_owned()
    }

    pub fn record(&self) -> &ExthRecord {
        self.record.as_ref()
    }

    pub fn into_record(self) -> R {
        self.record
    }
}

impl<R: AsRef<ExthRecord> + AsMut<ExthRecord>> AsinView<R> {
    /// Store `asin`, rejecting anything but ten alphanumerics.
    pub fn set_asin(&mut self, asin: &str) -> Result<()> {
        if !is_valid_asin(asin) {
            return Err(MobiError::InvalidArgument(format!(
                "'{asin}' is not a valid ASIN"
            )));
        }
        self.record.as_mut().set_data(asin.as_bytes().to_vec());
        Ok(())
    }
}
