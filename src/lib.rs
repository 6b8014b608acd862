//! `mobikit` - read, edit and write MOBI e-books.
//!
//! A `.mobi` file is a Palm database (PDB) whose record 0 holds the MOBI
//! header with its EXTH metadata block, followed by PalmDoc-compressed text
//! records, index records, images and a few fixed control records. This
//! crate parses that layout into a [`Document`], lets callers change the
//! title, metadata, cover, thumbnail and text, and writes a consistent book
//! back out.

pub mod codec;
pub mod config;
pub mod content;
pub mod document;
pub mod error;
pub mod exth;
pub mod index;
pub mod mobi;
pub mod pdb;

pub use document::Document;
pub use error::{MobiError, Result};
