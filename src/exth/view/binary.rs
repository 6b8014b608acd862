use crate::exth::record::ExthRecord;

/// Opaque record rendered as space-separated hex for display.
#[derive(Debug)]
pub struct BinaryView<R> {
    record: R,
}

impl<R: AsRef<ExthRecord>> BinaryView<R> {
    pub fn new(record: R) -> Self {
        Self { record }
    }

    pub fn hex(&self) -> String {
        self.record
            .as_ref()
            .data()
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn record(&self) -> &ExthRecord {
        self.record.as_ref()
    }
}
