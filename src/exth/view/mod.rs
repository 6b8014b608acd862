//! Typed views over EXTH records.
//!
//! A view wraps a record handle `R` and never copies the data: `&ExthRecord`
//! gives a read-only view, `&mut ExthRecord` a writable one whose changes land
//! in the owning block, and an owned `ExthRecord` is what the record factories
//! hand back before the record is added to a document.

mod asin;
mod binary;
mod date;
mod isbn;
mod language;
mod string;

pub use asin::{is_valid_asin, AsinView};
pub use binary::BinaryView;
pub use date::{parse_date, DateView, DATE_FORMAT};
pub use isbn::{is_valid_isbn, is_valid_isbn10, is_valid_isbn13, isbn10_to_13, isbn13_to_10, IsbnView};
pub use language::{is_valid_language_code, language_codes, LanguageView};
pub use string::StringView;
