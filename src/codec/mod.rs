//! Low-level byte transforms: big-endian field access, character sets,
//! PalmDoc LZ77 and text-record trailing entries.

pub mod bytes;
pub mod charset;
pub mod lz77;
pub mod trailing;
