//! Integration tests for reading, mutating and writing whole books.

use assert_fs::prelude::*;
use predicates::prelude::*;

use mobikit::codec::lz77;
use mobikit::content::ContentType;
use mobikit::document::{asin_record, isbn_record, language_record, string_record};
use mobikit::exth::view::{is_valid_isbn10, is_valid_isbn13, isbn10_to_13, isbn13_to_10};
use mobikit::exth::{ExthRecord, ExthTag};
use mobikit::index::IndexType;
use mobikit::mobi::{DEFAULT_HEADER_LENGTH, NULL_INDEX};
use mobikit::pdb::PdbHeader;
use mobikit::{Document, MobiError};

const COVER: &[u8] = b"\xFF\xD8\xFF\xE0\x00\x10JFIF\x00cover-bytes";
const THUMBNAIL: &[u8] = b"\x89PNG\r\n\x1a\nthumbnail-bytes";

/// Text records the fixture is built with; header, end-of-text, FLIS, FCIS,
/// cover, thumbnail and the end-of-file trailer bring it to 150 records.
const FIXTURE_TEXT_RECORDS: usize = 143;

/// Deterministic HTML body of exactly `len` ASCII bytes.
fn fairy_tale_text(len: usize) -> String {
    const PARAGRAPHS: [&str; 4] = [
        "<p>Es war einmal ein kleines suesses Maedchen, das hatte jedermann lieb.</p>\n",
        "<p>Der Wolf dachte bei sich: das junge zarte Ding, das ist ein fetter Bissen.</p>\n",
        "<p>Hinter dem Hause stand ein grosser Garten, darin wuchsen Rapunzeln.</p>\n",
        "<p>Und wenn sie nicht gestorben sind, so leben sie noch heute.</p>\n",
    ];
    let mut text = String::from("<html><head><guide></guide></head><body>\n");
    let mut i = 0;
    while text.len() < len {
        text.push_str(PARAGRAPHS[i % PARAGRAPHS.len()]);
        i += 1;
    }
    text.truncate(len);
    text
}

/// Printable pseudo-random text from a fixed seed.
fn random_text(len: usize, mut seed: u64) -> String {
    (0..len)
        .map(|_| {
            seed = seed
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            char::from(b' ' + ((seed >> 33) % 95) as u8)
        })
        .collect()
}

/// A Grimm's fairy tales book with 150 records, 22 EXTH records, a cover
/// and a thumbnail.
fn fixture() -> Document {
    let mut doc = Document::empty();
    doc.set_title("Kinder- und Hausmärchen");
    doc.set_text_content(&fairy_tale_text(FIXTURE_TEXT_RECORDS * 4096 - 17))
        .unwrap();

    let charset = doc.character_encoding();
    let text = |tag: ExthTag, value: &str| string_record(tag, value, charset).unwrap().into_record();
    let records: Vec<ExthRecord> = vec![
        text(ExthTag::Author, "Jacob Grimm"),
        text(ExthTag::Author, "Wilhelm Grimm"),
        text(ExthTag::Publisher, "Project Gutenberg"),
        text(ExthTag::Imprint, "Gutenberg"),
        text(ExthTag::Description, "Die Sammlung der Kinder- und Hausmärchen."),
        text(ExthTag::Subject, "Fairy tales"),
        text(ExthTag::Subject, "Folklore -- Germany"),
        text(ExthTag::PublishingDate, "2007-11-07"),
        text(ExthTag::Rights, "Public domain in the USA."),
        text(ExthTag::Source, "http://www.gutenberg.org/etext/23393"),
        language_record("de").unwrap().into_record(),
        text(ExthTag::Contributor, "calibre (0.7.23)"),
        isbn_record("9783161484100").unwrap().into_record(),
        asin_record("B000JQU1VS").unwrap().into_record(),
        text(ExthTag::CdeType, "EBOK"),
        ExthRecord::from_u32(ExthTag::CreatorSoftware, 201),
        ExthRecord::from_u32(ExthTag::CreatorMajor, 0),
        ExthRecord::from_u32(ExthTag::CreatorMinor, 7),
        ExthRecord::from_u32(ExthTag::CreatorBuild, 23),
        text(ExthTag::UpdatedTitle, "Kinder- und Hausmärchen"),
    ];
    let mut meta = doc.metadata_mut();
    for record in records {
        meta.add(record);
    }

    doc.set_cover(COVER).unwrap();
    doc.set_thumbnail(THUMBNAIL).unwrap();
    reparse(&doc)
}

fn reparse(doc: &Document) -> Document {
    Document::from_bytes(&doc.to_bytes().unwrap()).unwrap()
}

/// FCIS, FLIS, SRCS and DATP header fields point at the first record of
/// their type, or are absent when there is none.
fn assert_aux_pointers(doc: &Document) {
    let h = doc.header();
    for (kind, field) in [
        (ContentType::Fcis, h.fcis_index),
        (ContentType::Flis, h.flis_index),
        (ContentType::Srcs, h.srcs_index),
        (ContentType::Datp, h.datp_index),
    ] {
        match doc.records().iter().position(|r| r.kind == kind) {
            Some(i) => assert_eq!(field as usize, i + 1, "{kind} pointer"),
            None => assert_eq!(field, NULL_INDEX, "{kind} pointer"),
        }
    }
}

fn metadata_codes(doc: &Document) -> Vec<(u32, Vec<u8>)> {
    doc.metadata()
        .records()
        .iter()
        .map(|r| (r.code(), r.data().to_vec()))
        .collect()
}

/// Rewrite the database in `bytes` after `edit` has changed its raw records.
/// Element 0 is the header record.
fn rebuild(bytes: &[u8], edit: impl FnOnce(&mut Vec<Vec<u8>>)) -> Vec<u8> {
    let pdb = PdbHeader::parse(bytes).unwrap();
    let mut records: Vec<Vec<u8>> = pdb
        .records(bytes)
        .unwrap()
        .into_iter()
        .map(<[u8]>::to_vec)
        .collect();
    edit(&mut records);
    let sizes: Vec<usize> = records.iter().map(Vec::len).collect();
    let mut out = Vec::new();
    pdb.write(&sizes, &mut out).unwrap();
    for record in &records {
        out.extend_from_slice(record);
    }
    out
}

fn get_u32(buf: &[u8], at: usize) -> u32 {
    u32::from_be_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}

fn put_u32(buf: &mut [u8], at: usize, value: u32) {
    buf[at..at + 4].copy_from_slice(&value.to_be_bytes());
}

/// An inflection INDX record with a TAGX table and `entries` IDXT offsets.
fn inflection_index(entries: u16) -> Vec<u8> {
    const TAGX_AT: u32 = 192;
    const TAGX_LEN: u32 = 20;
    let mut record = b"INDX".to_vec();
    for word in [192, 2, 0, 0, TAGX_AT + TAGX_LEN, entries as u32, 65001, 9, entries as u32] {
        record.extend_from_slice(&u32::to_be_bytes(word));
    }
    record.resize(180, 0);
    record.extend_from_slice(&TAGX_AT.to_be_bytes());
    record.resize(TAGX_AT as usize, 0);

    record.extend_from_slice(b"TAGX");
    record.extend_from_slice(&TAGX_LEN.to_be_bytes());
    record.extend_from_slice(&1u32.to_be_bytes());
    record.extend_from_slice(&[1, 1, 0x01, 0, 0, 0, 0, 1]);

    record.extend_from_slice(b"IDXT");
    for i in 0..entries {
        record.extend_from_slice(&(240 + 8 * i).to_be_bytes());
    }
    record
}

// ─── Test 1: Fixture parses to the expected counts and values ──────

#[test]
fn test_fixture_counts_and_values() {
    let doc = fixture();
    assert_eq!(doc.record_count(), 150);
    assert_eq!(doc.pdb().record_count(), 150);
    assert_eq!(doc.header().record_count as usize, FIXTURE_TEXT_RECORDS);

    let meta = doc.metadata();
    assert_eq!(meta.records().len(), 22);
    assert_eq!(meta.language().unwrap().language_code(), "de");
    assert_eq!(meta.subjects()[0].value(), "Fairy tales");
    assert_eq!(meta.publishing_dates()[0].value(), "2007-11-07");
    assert_eq!(
        meta.publishing_dates()[0]
            .date()
            .unwrap()
            .format("%Y-%m-%d")
            .to_string(),
        "2007-11-07"
    );
    let authors: Vec<String> = meta.authors().iter().map(|a| a.value()).collect();
    assert_eq!(authors, ["Jacob Grimm", "Wilhelm Grimm"]);
    assert_eq!(meta.isbns()[0].isbn(), "9783161484100");
    assert_eq!(meta.asins()[0].asin(), "B000JQU1VS");
}

// ─── Test 2: Record classification of the fixture ──────────────────

#[test]
fn test_fixture_classification() {
    let doc = fixture();
    let kinds: Vec<ContentType> = doc.records().iter().map(|r| r.kind).collect();

    assert!(kinds[..FIXTURE_TEXT_RECORDS]
        .iter()
        .all(|k| *k == ContentType::Content));
    assert_eq!(kinds[FIXTURE_TEXT_RECORDS], ContentType::EndOfText);
    assert_eq!(
        doc.record(doc.header().first_image_index as usize).unwrap().kind,
        ContentType::Cover
    );
    assert_eq!(kinds.iter().filter(|k| **k == ContentType::Thumbnail).count(), 1);
    assert_eq!(kinds.iter().filter(|k| **k == ContentType::Flis).count(), 1);
    assert_eq!(kinds.iter().filter(|k| **k == ContentType::Fcis).count(), 1);
    assert_aux_pointers(&doc);
}

// ─── Test 3: Save and open keep the semantic content ───────────────

#[test]
fn test_save_open_roundtrip() {
    let doc = fixture();
    let temp = assert_fs::TempDir::new().unwrap();
    let book = temp.child("pg23393.mobi");
    doc.save(book.path()).unwrap();
    book.assert(predicate::path::is_file());

    let reopened = Document::open(book.path()).unwrap();
    assert_eq!(reopened.title(), doc.title());
    assert_eq!(reopened.text_content().unwrap(), doc.text_content().unwrap());
    assert_eq!(reopened.images(), doc.images());
    assert_eq!(metadata_codes(&reopened), metadata_codes(&doc));
    assert_eq!(reopened.record_count(), doc.record_count());

    // Writing the reopened book again gives the same bytes.
    assert_eq!(reopened.to_bytes().unwrap(), doc.to_bytes().unwrap());
    temp.close().unwrap();
}

// ─── Test 4: Title mutation survives a round trip ──────────────────

#[test]
fn test_set_title_roundtrip() {
    let mut doc = fixture();
    doc.set_title("TEST");
    let doc = reparse(&doc);
    assert_eq!(doc.title(), "TEST");
    assert_eq!(doc.metadata().records().len(), 22);
    assert_eq!(doc.cover(), Some(COVER));
}

// ─── Test 5: Cover and thumbnail in either order ───────────────────

#[test]
fn test_cover_and_thumbnail_any_order() {
    let text = fairy_tale_text(9000);

    let mut cover_first = Document::empty();
    cover_first.set_text_content(&text).unwrap();
    cover_first.set_cover(COVER).unwrap();
    cover_first.set_thumbnail(THUMBNAIL).unwrap();

    let mut thumbnail_first = Document::empty();
    thumbnail_first.set_text_content(&text).unwrap();
    thumbnail_first.set_thumbnail(THUMBNAIL).unwrap();
    thumbnail_first.set_cover(COVER).unwrap();

    for doc in [cover_first, thumbnail_first] {
        let doc = reparse(&doc);
        assert_eq!(doc.cover(), Some(COVER));
        assert_eq!(doc.thumbnail(), Some(THUMBNAIL));
        assert_eq!(doc.text_content().unwrap(), text);
        assert_aux_pointers(&doc);
    }
}

// ─── Test 6: Replacing images keeps the record count ───────────────

#[test]
fn test_replace_images_in_place() {
    let mut doc = fixture();
    let count = doc.record_count();
    doc.set_cover(b"GIF89a-replacement").unwrap();
    doc.set_thumbnail(b"BMreplacement").unwrap();
    assert_eq!(doc.record_count(), count);

    let doc = reparse(&doc);
    assert_eq!(doc.cover(), Some(&b"GIF89a-replacement"[..]));
    assert_eq!(doc.thumbnail(), Some(&b"BMreplacement"[..]));
    assert_eq!(doc.metadata().records().len(), 22);
}

// ─── Test 7: Pointers stay consistent across mutation sequences ────

#[test]
fn test_index_consistency_after_mutations() {
    let mut doc = Document::empty();
    assert_aux_pointers(&doc);
    doc.set_thumbnail(THUMBNAIL).unwrap();
    assert_aux_pointers(&doc);
    doc.set_text_content(&fairy_tale_text(20_000)).unwrap();
    assert_aux_pointers(&doc);
    doc.set_cover(COVER).unwrap();
    assert_aux_pointers(&doc);
    doc.set_text_content("<p>kurz</p>").unwrap();
    assert_aux_pointers(&doc);

    let doc = reparse(&doc);
    assert_aux_pointers(&doc);
    assert_eq!(doc.text_content().unwrap(), "<p>kurz</p>");
    assert_eq!(doc.cover(), Some(COVER));
    assert_eq!(doc.thumbnail(), Some(THUMBNAIL));

    let h = doc.header();
    assert_eq!(h.record_count, 1);
    assert_eq!(h.first_content_index, 1);
    assert_eq!(h.last_content_index, 1);
    assert_eq!(h.first_image_index, 3);
    assert_eq!(h.first_non_book_index, 3);
}

// ─── Test 8: Replacing the fixture text keeps images and metadata ──

#[test]
fn test_fixture_text_replacement() {
    let mut doc = fixture();
    doc.set_text_content("<html><body><p>Rotkäppchen</p></body></html>")
        .unwrap();
    let doc = reparse(&doc);

    assert_eq!(
        doc.text_content().unwrap(),
        "<html><body><p>Rotkäppchen</p></body></html>"
    );
    assert_eq!(doc.header().record_count, 1);
    assert_eq!(doc.record_count(), 150 - FIXTURE_TEXT_RECORDS + 1);
    assert_eq!(doc.cover(), Some(COVER));
    assert_eq!(doc.thumbnail(), Some(THUMBNAIL));
    assert_eq!(doc.metadata().records().len(), 22);
    assert_aux_pointers(&doc);
}

// ─── Test 9: Empty document has a minimal body and empty title ─────

#[test]
fn test_empty_document() {
    let doc = reparse(&Document::empty());
    assert_eq!(doc.title(), "");
    assert_eq!(
        doc.text_content().unwrap(),
        "<html><head><guide></guide></head><body><p></p></body></html>"
    );
    assert!(doc.metadata().records().is_empty());
    assert!(doc.cover().is_none());
    assert!(doc.thumbnail().is_none());
    assert!(doc.images().is_empty());
}

// ─── Test 10: Large random text is chunked and round-trips ─────────

#[test]
fn test_large_random_text() {
    let text = random_text(3 * 4096 + 123, 23393);
    let mut doc = Document::empty();
    doc.set_text_content(&text).unwrap();
    let doc = reparse(&doc);

    let content = doc
        .records()
        .iter()
        .filter(|r| r.kind == ContentType::Content)
        .count();
    assert_eq!(content, 4);
    assert_eq!(doc.header().record_count, 4);
    assert_eq!(doc.text_content().unwrap(), text);
}

// ─── Test 11: Smaller record size gives more text records ──────────

#[test]
fn test_custom_record_size() {
    let text = fairy_tale_text(5000);
    let mut doc = Document::empty();
    doc.set_text_content_with_record_size(&text, 1024).unwrap();
    assert_eq!(doc.header().record_count, 5);
    assert_eq!(doc.header().record_size, 1024);
    assert_eq!(reparse(&doc).text_content().unwrap(), text);
    assert!(matches!(
        doc.set_text_content_with_record_size(&text, 0),
        Err(MobiError::InvalidArgument(_))
    ));
}

// ─── Test 12: Metadata edits are written out ───────────────────────

#[test]
fn test_metadata_edits_roundtrip() {
    let mut doc = fixture();
    {
        let mut meta = doc.metadata_mut();
        assert_eq!(meta.remove_all(ExthTag::Subject), 2);
        meta.language_mut()
            .unwrap()
            .set_language_code("en")
            .unwrap();
        meta.isbns_mut()[0].set_isbn("3-16-148410-X").unwrap();
    }
    let doc = reparse(&doc);
    let meta = doc.metadata();
    assert_eq!(meta.records().len(), 20);
    assert!(meta.subjects().is_empty());
    assert_eq!(meta.language().unwrap().language_code(), "en");
    assert_eq!(meta.isbns()[0].isbn(), "3-16-148410-X");
    assert_eq!(meta.isbns()[0].as_isbn13().unwrap(), "9783161484100");
    // Cover and thumbnail offsets are untouched by metadata edits.
    assert_eq!(doc.cover(), Some(COVER));
    assert_eq!(doc.thumbnail(), Some(THUMBNAIL));
}

// ─── Test 13: Invalid metadata is rejected before mutation ─────────

#[test]
fn test_invalid_metadata_rejected() {
    assert!(isbn_record("978-3-16").is_err());
    assert!(asin_record("SHORT").is_err());
    assert!(language_record("xx-nope").is_err());
    let charset = Document::empty().character_encoding();
    assert!(string_record(ExthTag::Author, "", charset).is_err());
}

// ─── Test 14: ISBN-10 / ISBN-13 conversion ─────────────────────────

#[test]
fn test_isbn_conversion_roundtrip() {
    for isbn13 in [
        "9783161484100",
        "9780306406157",
        "9780262033848",
        "9780131103627",
        "9780201633610",
    ] {
        let isbn10 = isbn13_to_10(isbn13).unwrap();
        assert!(is_valid_isbn10(&isbn10), "{isbn10}");
        let back = isbn10_to_13(&isbn10).unwrap();
        assert!(is_valid_isbn13(&back), "{back}");
        assert_eq!(back, isbn13);
    }
}

// ─── Test 15: LZ77 round trip on text and markup ───────────────────

#[test]
fn test_lz77_roundtrip_text() {
    let samples = [
        fairy_tale_text(4096),
        random_text(4096, 7),
        "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa".to_string(),
        "<p>a</p> <p>b</p> <p>c</p> <p>d</p>\n".repeat(40),
        String::new(),
    ];
    for sample in &samples {
        let encoded = lz77::encode(sample.as_bytes());
        assert_eq!(lz77::decode(&encoded), sample.as_bytes());
    }
    let markup = fairy_tale_text(4096);
    assert!(lz77::encode(markup.as_bytes()).len() < markup.len());
}

// ─── Test 16: Damaged input fails with typed errors ────────────────

#[test]
fn test_damaged_input_errors() {
    let bytes = Document::empty().to_bytes().unwrap();

    assert!(matches!(
        Document::from_bytes(&bytes[..40]),
        Err(MobiError::MalformedContainer { .. })
    ));
    assert!(Document::from_bytes(&[]).is_err());

    // Corrupt the MOBI magic in record 0.
    let mut bad = bytes.clone();
    let start = u32::from_be_bytes([bad[78], bad[79], bad[80], bad[81]]) as usize;
    bad[start + 16..start + 20].copy_from_slice(b"XOBI");
    assert!(matches!(
        Document::from_bytes(&bad),
        Err(MobiError::MalformedHeader { .. })
    ));
}

// ─── Test 17: Opening a missing or empty file ──────────────────────

#[test]
fn test_open_missing_and_empty_files() {
    let temp = assert_fs::TempDir::new().unwrap();
    let missing = temp.child("missing.mobi");
    missing.assert(predicate::path::missing());
    assert!(matches!(
        Document::open(missing.path()),
        Err(MobiError::FileNotFound(_))
    ));

    let empty = temp.child("empty.mobi");
    empty.touch().unwrap();
    assert!(Document::open(empty.path()).is_err());
    temp.close().unwrap();
}

// ─── Test 18: Index records decode and go away with the text ───────

#[test]
fn test_index_record_decoded_then_dropped_with_text() {
    // header, text, end-of-text, INDX, FLIS, FCIS, end-of-file
    let bytes = rebuild(&Document::empty().to_bytes().unwrap(), |records| {
        records.insert(3, inflection_index(2));
        put_u32(&mut records[0], 80, 4);
        put_u32(&mut records[0], 108, 4);
        put_u32(&mut records[0], 244, 3);
    });
    let doc = Document::from_bytes(&bytes).unwrap();
    assert_eq!(doc.record(3).unwrap().kind, ContentType::Index);
    assert_eq!(doc.header().indx_index, 3);
    assert_aux_pointers(&doc);

    let indices = doc.indices();
    assert_eq!(indices.len(), 1);
    let (at, index) = &indices[0];
    assert_eq!(*at, 3);
    assert_eq!(index.index_type(), Some(IndexType::Inflection));
    assert_eq!(index.entry_count(), 2);
    assert_eq!(index.tagx.as_ref().unwrap().entries.len(), 2);
    assert_eq!(index.idxt.as_ref().unwrap().offsets, vec![240, 248]);
    assert_eq!(reparse(&doc).indices(), indices);

    let mut doc = doc;
    doc.set_text_content(&fairy_tale_text(6000)).unwrap();
    assert!(doc.indices().is_empty());
    assert!(doc.records().iter().all(|r| r.kind != ContentType::Index));
    assert_eq!(doc.header().indx_index, NULL_INDEX);

    let doc = reparse(&doc);
    assert_eq!(doc.header().indx_index, NULL_INDEX);
    assert_eq!(doc.text_content().unwrap(), fairy_tale_text(6000));
    assert_aux_pointers(&doc);
}

// ─── Test 19: SRCS and DATP follow cover insertion and new text ────

#[test]
fn test_srcs_and_datp_tracked_through_mutations() {
    let srcs = b"SRCS\0\0\0\x10\0\0\0\x2f\0\0\0\x01".to_vec();
    let datp = b"DATP\0\0\0\x0d\x01\x02\x03\x04".to_vec();
    // header, text, end-of-text, FLIS, FCIS, SRCS, DATP, end-of-file
    let bytes = rebuild(&Document::empty().to_bytes().unwrap(), |records| {
        records.insert(5, datp.clone());
        records.insert(5, srcs.clone());
    });

    let mut doc = Document::from_bytes(&bytes).unwrap();
    assert_eq!(doc.record(5).unwrap().kind, ContentType::Srcs);
    assert_eq!(doc.record(6).unwrap().kind, ContentType::Datp);
    assert_eq!(doc.header().srcs_index, 5);
    assert_eq!(doc.header().srcs_count, 1);
    assert_eq!(doc.header().datp_index, 6);
    assert_aux_pointers(&doc);

    doc.set_cover(COVER).unwrap();
    assert_eq!(doc.header().srcs_index, 6);
    assert_eq!(doc.header().datp_index, 7);
    assert_aux_pointers(&doc);

    let text = fairy_tale_text(10_000);
    doc.set_text_content(&text).unwrap();
    assert_eq!(doc.header().record_count, 3);
    assert_eq!(doc.header().srcs_index, 8);
    assert_eq!(doc.header().datp_index, 9);
    assert_aux_pointers(&doc);

    let doc = reparse(&doc);
    assert_aux_pointers(&doc);
    assert_eq!(doc.header().srcs_count, 1);
    assert_eq!(doc.record(8).unwrap().data, srcs);
    assert_eq!(doc.record(9).unwrap().data, datp);
    assert_eq!(doc.cover(), Some(COVER));
    assert_eq!(doc.text_content().unwrap(), text);
}

// ─── Test 20: A short MOBI header parses and is written in full ────

#[test]
fn test_short_header_defaults_and_rewrite() {
    let mut doc = Document::empty();
    doc.set_title("Der Froschkönig");
    let text = fairy_tale_text(5000);
    doc.set_text_content(&text).unwrap();

    // Cut the header back to 232 bytes: no trailing-entry flags, INDX,
    // fragment, skeleton, DATP or guide fields.
    let cut = DEFAULT_HEADER_LENGTH - 232;
    let bytes = rebuild(&doc.to_bytes().unwrap(), |records| {
        let header = &mut records[0];
        header.drain(16 + 232..16 + DEFAULT_HEADER_LENGTH as usize);
        put_u32(header, 20, 232);
        let name_offset = get_u32(header, 84);
        put_u32(header, 84, name_offset - cut);
    });
    let record0 = get_u32(&bytes, 78) as usize;
    assert_eq!(get_u32(&bytes, record0 + 20), 232);

    let short = Document::from_bytes(&bytes).unwrap();
    let h = short.header();
    assert_eq!(h.extra_record_data_flags, 0);
    assert_eq!(h.indx_index, NULL_INDEX);
    assert_eq!(h.fragment_index, NULL_INDEX);
    assert_eq!(h.skeleton_index, NULL_INDEX);
    assert_eq!(h.datp_index, NULL_INDEX);
    assert_eq!(h.guide_index, NULL_INDEX);
    assert_eq!(h.record_count, 2);
    assert_eq!(short.title(), "Der Froschkönig");
    assert_eq!(short.text_content().unwrap(), text);
    assert_aux_pointers(&short);

    let written = short.to_bytes().unwrap();
    let record0 = get_u32(&written, 78) as usize;
    assert_eq!(get_u32(&written, record0 + 20), DEFAULT_HEADER_LENGTH);
    let doc = Document::from_bytes(&written).unwrap();
    assert_eq!(doc.header().indx_index, NULL_INDEX);
    assert_eq!(doc.header().extra_record_data_flags, 0);
    assert_eq!(doc.title(), "Der Froschkönig");
    assert_eq!(doc.text_content().unwrap(), text);
}

// ─── Test 21: Trailing entries are stripped from every text record ─

#[test]
fn test_text_with_trailing_entries() {
    let text = fairy_tale_text(9000);
    let mut doc = Document::empty();
    doc.set_text_content(&text).unwrap();
    assert_eq!(doc.header().record_count, 3);

    // Each text record gains a 2-byte multibyte overlap entry and a 3-byte
    // entry that ends with its own size.
    let bytes = rebuild(&doc.to_bytes().unwrap(), |records| {
        for record in &mut records[1..=3] {
            record.extend_from_slice(&[0xE2, 0x01, 0x41, 0x42, 0x83]);
        }
        put_u32(&mut records[0], 240, 0b11);
    });

    let doc = Document::from_bytes(&bytes).unwrap();
    assert_eq!(doc.header().extra_record_data_flags, 0b11);
    assert_eq!(doc.text_content().unwrap(), text);

    let mut doc = reparse(&doc);
    assert_eq!(doc.header().extra_record_data_flags, 0b11);
    assert_eq!(doc.text_content().unwrap(), text);

    doc.set_text_content("<html><body>neu</body></html>").unwrap();
    assert_eq!(doc.header().extra_record_data_flags, 0);
    assert_eq!(reparse(&doc).text_content().unwrap(), "<html><body>neu</body></html>");
}
