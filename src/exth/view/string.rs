use crate::codec::charset::Charset;
use crate::exth::record::ExthRecord;

/// Text record decoded with the document character set.
#[derive(Debug)]
pub struct StringView<R> {
    record: R,
    charset: Charset,
}

impl<R: AsRef<ExthRecord>> StringView<R> {
    pub fn new(record: R, charset: Charset) -> Self {
        Self { record, charset }
    }

    pub fn value(&self) -> String {
        self.charset.decode(self.record.as_ref().data())
    }

    pub fn record(&self) -> &ExthRecord {
        self.record.as_ref()
    }

    pub fn into_record(self) -> R {
        self.record
    }
}

impl<R: AsRef<ExthRecord> + AsMut<ExthRecord>> StringView<R> {
    pub fn set_value(&mut self, value: &str) {
        let encoded = self.charset.encode(value);
        self.record.as_mut().set_data(encoded);
    }
}
