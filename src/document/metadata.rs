//! Typed access to the EXTH records of a document.
//!
//! [`Metadata`] borrows the header read-only and hands out views over the
//! records in place; [`MetadataMut`] adds the mutators. Views obtained from
//! a `MetadataMut` write straight into the header.

use chrono::{DateTime, TimeZone};

use crate::codec::charset::Charset;
use crate::error::{MobiError, Result};
use crate::exth::view::{AsinView, DateView, IsbnView, LanguageView, StringView};
use crate::exth::{ExthRecord, ExthTag};
use crate::mobi::MobiHeader;

/// Read-only metadata of a document.
#[derive(Debug, Clone, Copy)]
pub struct Metadata<'a> {
    header: &'a MobiHeader,
}

impl<'a> Metadata<'a> {
    pub(crate) fn new(header: &'a MobiHeader) -> Self {
        Self { header }
    }

    /// All records in stored order. Empty when the book has no EXTH block.
    pub fn records(&self) -> &'a [ExthRecord] {
        self.header.exth().map(|exth| exth.records()).unwrap_or_default()
    }

    fn tagged(&self, tag: ExthTag) -> impl Iterator<Item = &'a ExthRecord> {
        self.records().iter().filter(move |r| r.is(tag))
    }

    fn strings(&self, tag: ExthTag) -> Vec<StringView<&'a ExthRecord>> {
        let charset = self.header.charset();
        self.tagged(tag).map(|r| StringView::new(r, charset)).collect()
    }

    /// The first language record.
    pub fn language(&self) -> Option<LanguageView<&'a ExthRecord>> {
        self.tagged(ExthTag::Language).next().map(LanguageView::new)
    }

    pub fn authors(&self) -> Vec<StringView<&'a ExthRecord>> {
        self.strings(ExthTag::Author)
    }

    pub fn publishers(&self) -> Vec<StringView<&'a ExthRecord>> {
        self.strings(ExthTag::Publisher)
    }

    pub fn subjects(&self) -> Vec<StringView<&'a ExthRecord>> {
        self.strings(ExthTag::Subject)
    }

    pub fn reviews(&self) -> Vec<StringView<&'a ExthRecord>> {
        self.strings(ExthTag::Review)
    }

    pub fn contributors(&self) -> Vec<StringView<&'a ExthRecord>> {
        self.strings(ExthTag::Contributor)
    }

    pub fn rights(&self) -> Vec<StringView<&'a ExthRecord>> {
        self.strings(ExthTag::Rights)
    }

    pub fn sources(&self) -> Vec<StringView<&'a ExthRecord>> {
        self.strings(ExthTag::Source)
    }

    pub fn imprints(&self) -> Vec<StringView<&'a ExthRecord>> {
        self.strings(ExthTag::Imprint)
    }

    pub fn descriptions(&self) -> Vec<StringView<&'a ExthRecord>> {
        self.strings(ExthTag::Description)
    }

    pub fn publishing_dates(&self) -> Vec<DateView<&'a ExthRecord>> {
        self.tagged(ExthTag::PublishingDate).map(DateView::new).collect()
    }

    pub fn isbns(&self) -> Vec<IsbnView<&'a ExthRecord>> {
        self.tagged(ExthTag::Isbn).map(IsbnView::new).collect()
    }

    pub fn asins(&self) -> Vec<AsinView<&'a ExthRecord>> {
        self.tagged(ExthTag::Asin).map(AsinView::new).collect()
    }
}

/// Mutable metadata of a document.
#[derive(Debug)]
pub struct MetadataMut<'a> {
    header: &'a mut MobiHeader,
}

impl<'a> MetadataMut<'a> {
    pub(crate) fn new(header: &'a mut MobiHeader) -> Self {
        Self { header }
    }

    pub fn view(&self) -> Metadata<'_> {
        Metadata::new(&*self.header)
    }

    /// Append a record, creating the EXTH block if the book has none.
    pub fn add(&mut self, record: ExthRecord) {
        self.header.exth_mut().push(record);
    }

    /// Remove the record at `index` in stored order.
    pub fn remove(&mut self, index: usize) -> Option<ExthRecord> {
        if self.header.exth().is_none() {
            return None;
        }
        self.header.exth_mut().remove(index)
    }

    /// Remove every record with `tag`, returning how many went.
    pub fn remove_all(&mut self, tag: ExthTag) -> usize {
        if self.header.exth().is_none() {
            return 0;
        }
        self.header.exth_mut().remove_all(tag)
    }

    /// Drop every record. The (empty) EXTH block stays.
    pub fn clear(&mut self) {
        self.header.exth_mut().clear();
    }

    /// Writable string views over every record with `tag`.
    pub fn strings_mut(&mut self, tag: ExthTag) -> Vec<StringView<&mut ExthRecord>> {
        let charset = self.header.charset();
        self.header
            .exth_mut()
            .find_mut(tag)
            .map(|r| StringView::new(r, charset))
            .collect()
    }

    pub fn language_mut(&mut self) -> Option<LanguageView<&mut ExthRecord>> {
        self.header
            .exth_mut()
            .find_mut(ExthTag::Language)
            .next()
            .map(LanguageView::new)
    }

    pub fn publishing_dates_mut(&mut self) -> Vec<DateView<&mut ExthRecord>> {
        self.header
            .exth_mut()
            .find_mut(ExthTag::PublishingDate)
            .map(DateView::new)
            .collect()
    }

    pub fn isbns_mut(&mut self) -> Vec<IsbnView<&mut ExthRecord>> {
        self.header
            .exth_mut()
            .find_mut(ExthTag::Isbn)
            .map(IsbnView::new)
            .collect()
    }

    pub fn asins_mut(&mut self) -> Vec<AsinView<&mut ExthRecord>> {
        self.header
            .exth_mut()
            .find_mut(ExthTag::Asin)
            .map(AsinView::new)
            .collect()
    }
}

/// A new ISBN record, validated.
pub fn isbn_record(isbn: &str) -> Result<IsbnView<ExthRecord>> {
    let mut view = IsbnView::new(ExthRecord::new(ExthTag::Isbn, Vec::new()));
    view.set_isbn(isbn)?;
    Ok(view)
}

/// A new ASIN record, validated.
pub fn asin_record(asin: &str) -> Result<AsinView<ExthRecord>> {
    let mut view = AsinView::new(ExthRecord::new(ExthTag::Asin, Vec::new()));
    view.set_asin(asin)?;
    Ok(view)
}

/// A new language record, validated against the known codes.
pub fn language_record(code: &str) -> Result<LanguageView<ExthRecord>> {
    let mut view = LanguageView::new(ExthRecord::new(ExthTag::Language, Vec::new()));
    view.set_language_code(code)?;
    Ok(view)
}

/// A new text record of kind `tag` encoded with `charset`.
pub fn string_record(tag: ExthTag, value: &str, charset: Charset) -> Result<StringView<ExthRecord>> {
    if value.is_empty() {
        return Err(MobiError::InvalidArgument(format!(
            "{} must not be empty",
            tag.label()
        )));
    }
    let mut view = StringView::new(ExthRecord::new(tag, Vec::new()), charset);
    view.set_value(value);
    Ok(view)
}

/// A new date record of kind `tag`, written in the canonical format.
pub fn date_record<Tz: TimeZone>(tag: ExthTag, date: &DateTime<Tz>) -> DateView<ExthRecord>
where
    Tz::Offset: std::fmt::Display,
{
    let mut view = DateView::new(ExthRecord::new(tag, Vec::new()));
    view.set_date(date);
    view
}
