//! In-memory record table of one archive

use super::{ArchiveHeader, FileInfo, FileRecord, FormatVersion, HEADER_SIZE, RECORD_SIZE};
use crate::error::{Error, Result};

/// Ordered record table together with the header that declares it
///
/// Records are addressed by position; ids may repeat or be sparse.
#[derive(Debug, Clone)]
pub struct ArchiveIndex {
    header: ArchiveHeader,
    records: Vec<FileRecord>,
}

impl ArchiveIndex {
    /// Parse the record table that follows `header`
    ///
    /// `table` holds whatever bytes were available after the header, up to
    /// `file_count` records.
    ///
    /// # Errors
    /// Returns [`Error::InvalidFormat`] if the table stops mid-record and
    /// [`Error::CountMismatch`] if it holds fewer records than declared.
    pub fn from_table(header: ArchiveHeader, table: &[u8]) -> Result<Self> {
        if table.len() % RECORD_SIZE != 0 {
            return Err(Error::InvalidFormat(format!(
                "record table truncated mid-record: {} bytes is not a multiple of {RECORD_SIZE}",
                table.len()
            )));
        }

        let found = (table.len() / RECORD_SIZE) as u64;
        if found != header.file_count() {
            return Err(Error::CountMismatch {
                declared: header.file_count(),
                found,
            });
        }

        let records = table
            .chunks_exact(RECORD_SIZE)
            .map(|chunk| FileRecord::decode(header.version(), chunk))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { header, records })
    }

    /// Build an index from records, deriving the header count
    ///
    /// # Errors
    /// Returns [`Error::InvalidFormat`] if a record's version differs from
    /// `version`, or [`Error::FieldOutOfRange`] if the count does not fit.
    pub fn from_records(
        version: FormatVersion,
        version_minor: u16,
        records: Vec<FileRecord>,
    ) -> Result<Self> {
        if let Some(record) = records.iter().find(|r| r.version() != version) {
            return Err(Error::InvalidFormat(format!(
                "record {} is {}, archive is {}",
                record.id(),
                record.version().as_str(),
                version.as_str()
            )));
        }

        let header = ArchiveHeader::new(version, version_minor, records.len() as u64)?;
        Ok(Self { header, records })
    }

    #[must_use]
    pub fn header(&self) -> &ArchiveHeader {
        &self.header
    }

    #[must_use]
    pub fn version(&self) -> FormatVersion {
        self.header.version()
    }

    /// Number of record slots, null records included
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Record at a table position
    #[must_use]
    pub fn get(&self, position: usize) -> Option<&FileRecord> {
        self.records.get(position)
    }

    /// All record slots in table order
    #[must_use]
    pub fn records(&self) -> &[FileRecord] {
        &self.records
    }

    /// Non-null records with their table positions
    pub fn entries(&self) -> impl Iterator<Item = (usize, &FileRecord)> {
        self.records.iter().enumerate().filter(|(_, r)| !r.is_null())
    }

    /// Number of non-null records
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.entries().count()
    }

    /// First non-null record with the given name
    #[must_use]
    pub fn find(&self, name: &str) -> Option<(usize, &FileRecord)> {
        self.entries().find(|(_, r)| r.name_bytes() == name.as_bytes())
    }

    /// Listing of every non-null record
    #[must_use]
    pub fn list(&self) -> Vec<FileInfo> {
        self.entries().map(|(i, r)| r.info(i)).collect()
    }

    /// Offset where the payload region starts
    #[must_use]
    pub fn payload_start(&self) -> u64 {
        payload_start(self.header.file_count())
    }

    /// Encode the header followed by every record slot
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(HEADER_SIZE + self.records.len() * RECORD_SIZE);
        bytes.extend_from_slice(&self.header.encode());
        for record in &self.records {
            bytes.extend_from_slice(&record.encode());
        }
        bytes
    }
}

/// Offset of the payload region for an archive with `file_count` record slots
#[must_use]
pub(crate) fn payload_start(file_count: u64) -> u64 {
    (HEADER_SIZE as u64).saturating_add(file_count.saturating_mul(RECORD_SIZE as u64))
}
