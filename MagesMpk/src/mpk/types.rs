//! Types for MPK archive handling

use std::borrow::Cow;

use serde::Serialize;

use super::NAME_LENGTH;
use crate::error::{Error, Result};

/// Archive format version, selected by the header's major version field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum FormatVersion {
    /// 32-bit counts, offsets and sizes; compression derived from sizes
    V1,
    /// 64-bit counts, offsets and sizes; explicit compression flag
    #[default]
    V2,
}

impl FormatVersion {
    /// Parse the header's major version field
    ///
    /// # Errors
    /// Returns [`Error::InvalidFormat`] for anything other than 1 or 2.
    pub fn from_major(major: u16) -> Result<Self> {
        match major {
            1 => Ok(Self::V1),
            2 => Ok(Self::V2),
            other => Err(Error::InvalidFormat(format!(
                "unsupported MPK major version: {other} (supported: 1-2)"
            ))),
        }
    }

    /// Major version number written to the header
    #[must_use]
    pub fn major(self) -> u16 {
        match self {
            Self::V1 => 1,
            Self::V2 => 2,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::V1 => "v1",
            Self::V2 => "v2",
        }
    }

    /// On-disk width of a numeric field in this version
    #[must_use]
    pub fn width(self, field: Field) -> FieldWidth {
        match (self, field) {
            (_, Field::Id) => FieldWidth::U32,
            (Self::V1, _) => FieldWidth::U32,
            (Self::V2, _) => FieldWidth::U64,
        }
    }

    /// Check that `value` fits `field` in this version
    ///
    /// # Errors
    /// Returns [`Error::FieldOutOfRange`] if it does not.
    pub fn check(self, field: Field, value: u64) -> Result<u64> {
        let max = self.width(field).max();
        if value > max {
            return Err(Error::FieldOutOfRange {
                field: field.as_str(),
                value,
                max,
                version: self.as_str(),
            });
        }
        Ok(value)
    }
}

/// Numeric fields of the header and records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    /// Header record count
    FileCount,
    /// Record id, 32 bits in every version
    Id,
    /// Absolute payload offset
    Offset,
    /// Payload length as stored
    StoredSize,
    /// Payload length after decompression
    ActualSize,
}

impl Field {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FileCount => "file_count",
            Self::Id => "id",
            Self::Offset => "offset",
            Self::StoredSize => "stored_size",
            Self::ActualSize => "actual_size",
        }
    }
}

/// Width of an on-disk integer
///
/// Both widths are little-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldWidth {
    /// Four bytes
    U32,
    /// Eight bytes
    U64,
}

impl FieldWidth {
    /// Largest value the width can hold
    #[must_use]
    pub fn max(self) -> u64 {
        match self {
            Self::U32 => u64::from(u32::MAX),
            Self::U64 => u64::MAX,
        }
    }

    /// Size in bytes
    #[must_use]
    pub fn bytes(self) -> usize {
        match self {
            Self::U32 => 4,
            Self::U64 => 8,
        }
    }
}

/// Header of an MPK archive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveHeader {
    version: FormatVersion,
    version_minor: u16,
    file_count: u64,
}

impl ArchiveHeader {
    /// Build a header, validating the count against the version's width
    ///
    /// # Errors
    /// Returns [`Error::FieldOutOfRange`] if `file_count` does not fit.
    pub fn new(version: FormatVersion, version_minor: u16, file_count: u64) -> Result<Self> {
        let file_count = version.check(Field::FileCount, file_count)?;
        Ok(Self {
            version,
            version_minor,
            file_count,
        })
    }

    #[must_use]
    pub fn version(&self) -> FormatVersion {
        self.version
    }

    #[must_use]
    pub fn version_major(&self) -> u16 {
        self.version.major()
    }

    #[must_use]
    pub fn version_minor(&self) -> u16 {
        self.version_minor
    }

    /// Number of record slots in the table, null records included
    #[must_use]
    pub fn file_count(&self) -> u64 {
        self.file_count
    }
}

/// Field values for building a [`FileRecord`]
///
/// Numbers are taken as `u64` and narrowed by the version's width table, so an
/// out-of-range value is rejected instead of truncated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFields {
    /// Game-assigned file id
    pub id: u64,
    /// Ignored for version 1, where the flag is derived from the sizes
    pub compressed: bool,
    /// Absolute offset of the payload from the start of the archive
    pub offset: u64,
    /// Payload length in the archive
    pub stored_size: u64,
    /// Payload length once decompressed; equals `stored_size` when stored raw
    pub actual_size: u64,
    /// Archive-relative name; trailing zero bytes are trimmed
    pub name: Vec<u8>,
}

/// Entry in the record table describing one packed file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    version: FormatVersion,
    id: u32,
    /// Explicit flag, only present in version 2
    compressed: Option<bool>,
    offset: u64,
    stored_size: u64,
    actual_size: u64,
    name: Vec<u8>,
}

impl FileRecord {
    /// Build a record, validating every field against the version's widths
    ///
    /// # Errors
    /// Returns [`Error::FieldOutOfRange`] or [`Error::NameTooLong`].
    pub fn new(version: FormatVersion, fields: RecordFields) -> Result<Self> {
        let id = version.check(Field::Id, fields.id)? as u32;
        let offset = version.check(Field::Offset, fields.offset)?;
        let stored_size = version.check(Field::StoredSize, fields.stored_size)?;
        let actual_size = version.check(Field::ActualSize, fields.actual_size)?;
        let name = validate_name(fields.name)?;

        let compressed = match version {
            FormatVersion::V1 => None,
            FormatVersion::V2 => Some(fields.compressed),
        };

        Ok(Self {
            version,
            id,
            compressed,
            offset,
            stored_size,
            actual_size,
            name,
        })
    }

    #[must_use]
    pub fn version(&self) -> FormatVersion {
        self.version
    }

    #[must_use]
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Whether the payload is zlib-compressed
    ///
    /// Version 2 stores this explicitly. Version 1 has no flag: a payload is
    /// compressed exactly when its stored and actual sizes differ.
    #[must_use]
    pub fn is_compressed(&self) -> bool {
        self.compressed.unwrap_or(self.stored_size != self.actual_size)
    }

    #[must_use]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    #[must_use]
    pub fn stored_size(&self) -> u64 {
        self.stored_size
    }

    #[must_use]
    pub fn actual_size(&self) -> u64 {
        self.actual_size
    }

    /// Raw name bytes without padding
    #[must_use]
    pub fn name_bytes(&self) -> &[u8] {
        &self.name
    }

    /// Name for display and output paths (lossy UTF-8)
    #[must_use]
    pub fn name(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.name)
    }

    /// True for an all-zero record slot
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.encode().iter().all(|&b| b == 0)
    }

    /// Listing view of this record
    #[must_use]
    pub fn info(&self, index: usize) -> FileInfo {
        let compressed = self.is_compressed();
        FileInfo {
            index,
            id: self.id,
            name: self.name().into_owned(),
            compressed,
            offset: self.offset,
            stored_size: self.stored_size,
            actual_size: compressed.then_some(self.actual_size),
        }
    }
}

/// Trim trailing zero bytes and enforce the name field length
pub(crate) fn validate_name(mut name: Vec<u8>) -> Result<Vec<u8>> {
    while name.last() == Some(&0) {
        name.pop();
    }
    if name.len() > NAME_LENGTH {
        return Err(Error::NameTooLong {
            len: name.len(),
            name: String::from_utf8_lossy(&name).into_owned(),
            max: NAME_LENGTH,
        });
    }
    Ok(name)
}

/// Record metadata for listings and inventories
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileInfo {
    /// Position in the record table
    pub index: usize,
    pub id: u32,
    pub name: String,
    pub compressed: bool,
    pub offset: u64,
    pub stored_size: u64,
    /// Only reported for compressed entries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_size: Option<u64>,
}

/// A decompressed file from the MPK archive
#[derive(Debug, Clone)]
pub struct MpkFile {
    /// Record id
    pub id: u32,
    /// Archive-relative name
    pub name: String,
    /// Whether the payload was stored compressed
    pub compressed: bool,
    /// Decompressed file contents
    pub data: Vec<u8>,
}

/// Progress callback type
pub type ProgressCallback<'a> = &'a (dyn Fn(&MpkProgress) + Sync);

/// Progress information during MPK operations
#[derive(Debug, Clone)]
pub struct MpkProgress {
    /// Current operation phase
    pub phase: MpkPhase,
    /// Current item number (1-indexed)
    pub current: usize,
    /// Total number of items
    pub total: usize,
    /// Current file being processed (if applicable)
    pub current_file: Option<String>,
}

impl MpkProgress {
    /// Create a new progress update
    #[must_use]
    pub fn new(phase: MpkPhase, current: usize, total: usize) -> Self {
        Self {
            phase,
            current,
            total,
            current_file: None,
        }
    }

    /// Create a progress update with a file name
    #[must_use]
    pub fn with_file(
        phase: MpkPhase,
        current: usize,
        total: usize,
        file: impl Into<String>,
    ) -> Self {
        Self {
            phase,
            current,
            total,
            current_file: Some(file.into()),
        }
    }

    /// Get the progress percentage (0.0 - 1.0)
    #[must_use]
    pub fn percentage(&self) -> f32 {
        if self.total == 0 {
            1.0
        } else {
            self.current as f32 / self.total as f32
        }
    }
}

/// Phase of an MPK operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MpkPhase {
    /// Reading header and record table
    ReadingTable,
    /// Collecting entries to pack
    ScanningFiles,
    /// Reading and compressing source files
    CompressingFiles,
    /// Writing payloads and the record table
    WritingArchive,
    /// Reading and decompressing payloads
    DecompressingFiles,
    /// Writing extracted files to disk
    WritingFiles,
    /// Operation complete
    Complete,
}

impl MpkPhase {
    /// Get a human-readable description of this phase
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ReadingTable => "Reading record table",
            Self::ScanningFiles => "Scanning files",
            Self::CompressingFiles => "Compressing files",
            Self::WritingArchive => "Writing archive",
            Self::DecompressingFiles => "Decompressing files",
            Self::WritingFiles => "Writing files",
            Self::Complete => "Complete",
        }
    }
}
