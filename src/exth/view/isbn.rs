use crate::error::{MobiError, Result};
use crate::exth::record::ExthRecord;

const ISBN13_PREFIX: &str = "978";
const CHECK_DIGITS: &[u8; 12] = b"0123456789X0";

/// Whether `isbn` is a structurally valid ISBN-10 or ISBN-13.
pub fn is_valid_isbn(isbn: &str) -> bool {
    is_valid_isbn10(isbn) || is_valid_isbn13(isbn)
}

/// `978`/`979`, then four digit groups of 1-5, 1-7, 1-6 and 1 digits.
///
/// Groups are joined by one separator (space or hyphen) used throughout, or
/// by nothing at all.
pub fn is_valid_isbn13(isbn: &str) -> bool {
    let Some(rest) = isbn
        .strip_prefix("978")
        .or_else(|| isbn.strip_prefix("979"))
    else {
        return false;
    };
    match rest.chars().next() {
        Some(sep @ (' ' | '-')) => {
            let groups: Vec<&str> = rest[1..].split(sep).collect();
            groups_match(&groups, &[5, 7, 6, 1], false)
        }
        _ => digits_between(rest, 4, 19),
    }
}

/// Four groups of 1-5, 1-7 and 1-6 digits and a final digit or `X`.
///
/// Same separator rule as [`is_valid_isbn13`].
pub fn is_valid_isbn10(isbn: &str) -> bool {
    match isbn.chars().find(|c| !c.is_ascii_digit()) {
        Some(sep @ (' ' | '-')) => {
            let groups: Vec<&str> = isbn.split(sep).collect();
            groups_match(&groups, &[5, 7, 6, 1], true)
        }
        _ if !isbn.is_ascii() => false,
        _ => {
            let (body, last) = isbn.split_at(isbn.len().saturating_sub(1));
            (last == "X" || digits_between(last, 1, 1)) && digits_between(body, 3, 18)
        }
    }
}

fn groups_match(groups: &[&str], max_lens: &[usize], x_check: bool) -> bool {
    groups.len() == max_lens.len()
        && groups.iter().zip(max_lens).enumerate().all(|(i, (group, &max))| {
            let is_check = i == max_lens.len() - 1;
            (x_check && is_check && *group == "X") || digits_between(group, 1, max)
        })
}

fn digits_between(s: &str, min: usize, max: usize) -> bool {
    (min..=max).contains(&s.len()) && s.bytes().all(|b| b.is_ascii_digit())
}

fn strip_separators(isbn: &str) -> String {
    isbn.chars().filter(|c| *c != '-' && *c != ' ').collect()
}

fn digit_values(s: &str, isbn: &str) -> Result<Vec<u32>> {
    s.chars()
        .map(|c| {
            c.to_digit(10).ok_or_else(|| {
                MobiError::InvalidArgument(format!("cannot convert ISBN '{isbn}'"))
            })
        })
        .collect()
}

/// Convert an ISBN-13 with the `978` prefix to its ISBN-10 form.
///
/// `979` ISBNs have no ISBN-10 equivalent.
pub fn isbn13_to_10(isbn: &str) -> Result<String> {
    let plain = strip_separators(isbn);
    if !plain.starts_with(ISBN13_PREFIX) {
        return Err(MobiError::InvalidArgument(format!(
            "'{isbn}' has no ISBN-10 form"
        )));
    }
    let s9 = plain.get(3..12).ok_or_else(|| {
        MobiError::InvalidArgument(format!("'{isbn}' is too short for an ISBN-13"))
    })?;
    let sum: u32 = digit_values(s9, isbn)?
        .iter()
        .enumerate()
        .map(|(i, v)| (10 - i as u32) * v)
        .sum();
    let n = 11 - (sum % 11) as usize;
    Ok(format!("{s9}{}", CHECK_DIGITS[n] as char))
}

/// Convert an ISBN-10 to its `978`-prefixed ISBN-13 form.
pub fn isbn10_to_13(isbn: &str) -> Result<String> {
    let plain = strip_separators(isbn);
    let s9 = plain.get(..9).ok_or_else(|| {
        MobiError::InvalidArgument(format!("'{isbn}' is too short for an ISBN-10"))
    })?;
    let s12 = format!("{ISBN13_PREFIX}{s9}");
    let sum: u32 = digit_values(&s12, isbn)?
        .iter()
        .enumerate()
        .map(|(i, v)| if i % 2 == 0 { *v } else { 3 * v })
        .sum();
    let n = (10 - sum % 10) % 10;
    Ok(format!("{s12}{}", CHECK_DIGITS[n as usize] as char))
}

/// ISBN record (UTF-8).
#[derive(Debug)]
pub struct IsbnView<R> {
    record: R,
}

impl<R: AsRef<ExthRecord>> IsbnView<R> {
    pub fn new(record: R) -> Self {
        Self { record }
    }

    /// The ISBN as stored, separators included.
    pub fn isbn(&self) -> String {
        String::from_utf8_lossy(self.record.as_ref().data()).into_owned()
    }

    /// Whether the stored value is an ISBN-13 (`978` or `979`, 13 digits).
    pub fn is_isbn13(&self) -> bool {
        let plain = strip_separators(&self.isbn());
        plain.len() == 13 && (plain.starts_with(ISBN13_PREFIX) || plain.starts_with("979"))
    }

    /// The ISBN-13 form without separators.
    pub fn as_isbn13(&self) -> Result<String> {
        if self.is_isbn13() {
            return Ok(strip_separators(&self.isbn()));
        }
        isbn10_to_13(&self.isbn())
    }

    /// The ISBN-10 form without separators.
    pub fn as_isbn10(&self) -> Result<String> {
        if !self.is_isbn13() {
            return Ok(strip_separators(&self.isbn()));
        }
        isbn13_to_10(&self.isbn())
    }

    pub fn record(&self) -> &ExthRecord {
        self.record.as_ref()
    }

    pub fn into_record(self) -> R {
        self.record
    }
}

impl<R: AsRef<ExthRecord> + AsMut<ExthRecord>> IsbnView<R> {
    /// Store `isbn` verbatim after validating its structure.
    pub fn set_isbn(&mut self, isbn: &str) -> Result<()> {
        if !is_valid_isbn(isbn) {
            return Err(MobiError::InvalidArgument(format!(
                "'{isbn}' is not a valid ISBN"
            )));
        }
        self.record.as_mut().set_data(isbn.as_bytes().to_vec());
        Ok(())
    }
}
