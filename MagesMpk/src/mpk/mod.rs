//! MPK archive format reader/writer
//!
//! An MPK archive is a 64-byte header, a table of 256-byte file records and
//! the concatenated payloads, little-endian throughout. Version 1 uses 32-bit
//! counts, offsets and sizes; version 2 widens them to 64 bits and adds an
//! explicit compression flag to each record.

mod description;
mod entries;
mod index;
mod layout;
mod operations;
mod options;
mod reader;
mod types;
mod writer;

pub use description::{
    DESCRIPTION_COLUMNS, DescriptionRow, DescriptionWriter, parse_description, read_description,
};
pub use entries::{PackEntry, entries_from_description, entries_from_dir, entries_from_origin};
pub use index::ArchiveIndex;
pub use operations::{MpkOperations, PackSummary, UnpackSummary};
pub use options::{PackOptions, UnpackOptions};
pub use reader::MpkReader;
pub use types::*;
pub use writer::MpkWriter;

/// MPK magic bytes
pub const MAGIC: [u8; 4] = *b"MPK\0";

/// Size of the archive header
pub const HEADER_SIZE: usize = 0x40;

/// Size of a file record, identical for both versions
pub const RECORD_SIZE: usize = 0x100;

/// Length of the name field in a file record
pub const NAME_LENGTH: usize = 0xE0;

/// Reserved bytes between the sizes and the name in a version 1 record
pub const V1_RESERVED: usize = 0x10;
