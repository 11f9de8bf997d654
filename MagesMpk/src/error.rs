//! Error types for `MagesMpk`

use std::path::PathBuf;

use thiserror::Error;

/// The error type for `MagesMpk` operations.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum Error {
    // ==================== IO Errors ====================
    /// IO error from file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ==================== MPK Format Errors ====================
    /// The data is not a valid MPK archive: bad signature, unsupported
    /// version, wrong fixed-size block length or truncated input.
    #[error("invalid MPK format: {0}")]
    InvalidFormat(String),

    /// A numeric record or header field does not fit the width its format version allows.
    #[error("{field} value {value} exceeds the {version} maximum of {max}")]
    FieldOutOfRange {
        /// The field being constructed.
        field: &'static str,
        /// The rejected value.
        value: u64,
        /// The largest value the field can hold.
        max: u64,
        /// The format version whose width table was applied.
        version: &'static str,
    },

    /// An archive name is longer than the fixed name field.
    #[error("archive name is {len} bytes, longer than the {max}-byte limit: {name}")]
    NameTooLong {
        /// The rejected name (lossy UTF-8).
        name: String,
        /// The name length in bytes.
        len: usize,
        /// The name field size.
        max: usize,
    },

    /// The record table does not hold as many records as the header declares.
    #[error("header declares {declared} records but the table holds {found}")]
    CountMismatch {
        /// Record count from the archive header.
        declared: u64,
        /// Number of complete records present.
        found: u64,
    },

    // ==================== Packing Errors ====================
    /// A source file referenced by a pack entry could not be read.
    #[error("source file for entry {id} not found: {}", path.display())]
    SourceNotFound {
        /// The entry id.
        id: u32,
        /// The on-disk path that failed.
        path: PathBuf,
        /// The underlying read error.
        #[source]
        source: std::io::Error,
    },

    // ==================== Compression Errors ====================
    /// A compressed payload is corrupt or truncated.
    #[error("decompression failed for entry {id} ({name}) at offset {offset:#X}: {message}")]
    DecompressionFailed {
        /// The entry id.
        id: u32,
        /// The entry name.
        name: String,
        /// Payload offset in the archive.
        offset: u64,
        /// The error message from the inflater.
        message: String,
    },

    /// A payload decompressed to a different length than its record declares.
    #[error("entry {id} ({name}) decompressed to {found} bytes, record declares {expected}")]
    SizeMismatch {
        /// The entry id.
        id: u32,
        /// The entry name.
        name: String,
        /// The record's actual size.
        expected: u64,
        /// Length produced by decompression.
        found: u64,
    },

    // ==================== Description Table Errors ====================
    /// A description table (CSV) line could not be parsed.
    #[error("invalid description table at line {line}: {message}")]
    InvalidDescription {
        /// 1-based line number.
        line: usize,
        /// What was wrong with it.
        message: String,
    },

    // ==================== File System Errors ====================
    /// An archive name cannot be used as an output path.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// Directory traversal error.
    #[error("directory walk error: {0}")]
    WalkDirError(String),

    /// No entry with the requested name exists in the archive.
    #[error("file not found in MPK: {0}")]
    EntryNotFound(String),
}

impl From<walkdir::Error> for Error {
    fn from(err: walkdir::Error) -> Self {
        Error::WalkDirError(err.to_string())
    }
}

/// A specialized Result type for `MagesMpk` operations.
pub type Result<T> = std::result::Result<T, Error>;
