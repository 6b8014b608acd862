use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};

use crate::exth::record::ExthRecord;

/// Format used when a date is written.
pub const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%z";

/// Parse a stored date, trying each known layout in turn.
///
/// Accepted: `2007-11-07`, `2007-11-07T10:00:00+0100` and a bare year. Dates
/// without a time are taken as midnight UTC.
pub fn parse_date(text: &str) -> Option<DateTime<FixedOffset>> {
    let text = text.trim();

    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(midnight_utc(date));
    }
    if let Ok(date_time) = DateTime::parse_from_str(text, DATE_FORMAT) {
        return Some(date_time);
    }
    if text.len() == 4 && text.bytes().all(|b| b.is_ascii_digit()) {
        let year = text.parse().ok()?;
        return NaiveDate::from_ymd_opt(year, 1, 1).map(midnight_utc);
    }
    None
}

fn midnight_utc(date: NaiveDate) -> DateTime<FixedOffset> {
    Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::MIN))
        .fixed_offset()
}

/// Date record such as the publishing date (UTF-8 text).
#[derive(Debug)]
pub struct DateView<R> {
    record: R,
}

impl<R: AsRef<ExthRecord>> DateView<R> {
    pub fn new(record: R) -> Self {
        Self { record }
    }

    /// The stored text, unparsed.
    pub fn value(&self) -> String {
        String::from_utf8_lossy(self.record.as_ref().data()).into_owned()
    }

    /// The stored text parsed as a date, or `None` if no layout matches.
    pub fn date(&self) -> Option<DateTime<FixedOffset>> {
        parse_date(&self.value())
    }

    pub fn record(&self) -> &ExthRecord {
        self.record.as_ref()
    }

    pub fn into_record(self) -> R {
        self.record
    }
}

impl<R: AsRef<ExthRecord> + AsMut<ExthRecord>> DateView<R> {
    pub fn set_date<Tz: TimeZone>(&mut self, date: &DateTime<Tz>)
    where
        Tz::Offset: std::fmt::Display,
    {
        let text = date.format(DATE_FORMAT).to_string();
        self.record.as_mut().set_data(text.into_bytes());
    }
}
