//! MPK archive reader

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use super::{
    ArchiveHeader, ArchiveIndex, FileInfo, FileRecord, FormatVersion, HEADER_SIZE, MpkFile,
    MpkPhase, MpkProgress, ProgressCallback, RECORD_SIZE,
};
use crate::compression;
use crate::error::{Error, Result};

/// Read-only view over an MPK archive
///
/// The header and record table are parsed on [`open`](Self::open); payloads
/// are read on demand.
pub struct MpkReader<R: Read + Seek> {
    reader: BufReader<R>,
    index: ArchiveIndex,
}

impl MpkReader<File> {
    /// Open an archive file
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or is not a valid archive.
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::open(File::open(path.as_ref())?)
    }
}

impl<R: Read + Seek> MpkReader<R> {
    /// Parse the header and record table from a Read + Seek source
    ///
    /// # Errors
    /// Returns [`Error::InvalidFormat`] on a bad signature, unsupported
    /// version or truncated header/table, and [`Error::CountMismatch`] if
    /// the table holds fewer records than the header declares.
    pub fn open(source: R) -> Result<Self> {
        let mut reader = BufReader::new(source);
        reader.seek(SeekFrom::Start(0))?;

        let mut header_bytes = Vec::with_capacity(HEADER_SIZE);
        (&mut reader)
            .take(HEADER_SIZE as u64)
            .read_to_end(&mut header_bytes)?;
        if header_bytes.len() < HEADER_SIZE {
            return Err(Error::InvalidFormat(format!(
                "truncated MPK header: {} of {HEADER_SIZE} bytes",
                header_bytes.len()
            )));
        }
        let header = ArchiveHeader::decode(&header_bytes)?;

        let table_len = header
            .file_count()
            .checked_mul(RECORD_SIZE as u64)
            .ok_or_else(|| {
                Error::InvalidFormat(format!(
                    "record count {} is too large",
                    header.file_count()
                ))
            })?;

        // Bounded by the bytes actually present
        let mut table = Vec::new();
        (&mut reader).take(table_len).read_to_end(&mut table)?;

        let index = ArchiveIndex::from_table(header, &table)?;

        tracing::debug!(
            "Opened MPK {} with {} records",
            header.version().as_str(),
            index.len()
        );

        Ok(Self { reader, index })
    }

    #[must_use]
    pub fn header(&self) -> &ArchiveHeader {
        self.index.header()
    }

    #[must_use]
    pub fn version(&self) -> FormatVersion {
        self.index.version()
    }

    #[must_use]
    pub fn index(&self) -> &ArchiveIndex {
        &self.index
    }

    /// Metadata of every non-null record in table order
    #[must_use]
    pub fn list_all(&self) -> Vec<FileInfo> {
        self.index.list()
    }

    /// Read one record's payload, decompressing it if needed
    ///
    /// Returns `None` for a null record; nothing is read for it.
    ///
    /// # Errors
    /// Returns [`Error::InvalidFormat`] if the payload runs past the end of
    /// the archive, [`Error::DecompressionFailed`] for a corrupt stream and
    /// [`Error::SizeMismatch`] if the inflated length differs from the record.
    pub fn extract(&mut self, record: &FileRecord) -> Result<Option<Vec<u8>>> {
        if record.is_null() {
            return Ok(None);
        }

        self.reader.seek(SeekFrom::Start(record.offset()))?;

        let mut stored = Vec::new();
        (&mut self.reader)
            .take(record.stored_size())
            .read_to_end(&mut stored)?;

        if (stored.len() as u64) < record.stored_size() {
            return Err(Error::InvalidFormat(format!(
                "payload of entry {} ({}) at offset {:#X} is truncated: {} of {} bytes",
                record.id(),
                record.name(),
                record.offset(),
                stored.len(),
                record.stored_size()
            )));
        }

        if !record.is_compressed() {
            return Ok(Some(stored));
        }

        let data = compression::decompress(&stored, record.actual_size() as usize).map_err(
            |e| Error::DecompressionFailed {
                id: record.id(),
                name: record.name().into_owned(),
                offset: record.offset(),
                message: e.to_string(),
            },
        )?;

        if data.len() as u64 != record.actual_size() {
            return Err(Error::SizeMismatch {
                id: record.id(),
                name: record.name().into_owned(),
                expected: record.actual_size(),
                found: data.len() as u64,
            });
        }

        Ok(Some(data))
    }

    /// Read the record at a table position
    ///
    /// # Errors
    /// Returns [`Error::EntryNotFound`] for a position past the table, or any
    /// [`extract`](Self::extract) error.
    pub fn extract_at(&mut self, position: usize) -> Result<Option<Vec<u8>>> {
        let record = self
            .index
            .get(position)
            .cloned()
            .ok_or_else(|| Error::EntryNotFound(format!("record #{position}")))?;
        self.extract(&record)
    }

    /// Read a file by its archive name
    ///
    /// # Errors
    /// Returns [`Error::EntryNotFound`] if no non-null record has that name.
    pub fn read_file(&mut self, name: &str) -> Result<Vec<u8>> {
        let record = self
            .index
            .find(name)
            .map(|(_, r)| r.clone())
            .ok_or_else(|| Error::EntryNotFound(name.to_string()))?;
        Ok(self.extract(&record)?.unwrap_or_default())
    }

    /// Extract every non-null record in table order
    ///
    /// Stops at the first failing entry.
    ///
    /// # Errors
    /// Returns the first [`extract`](Self::extract) error.
    pub fn extract_all(&mut self, progress: ProgressCallback) -> Result<Vec<MpkFile>> {
        let entries: Vec<FileRecord> = self.index.entries().map(|(_, r)| r.clone()).collect();
        let total = entries.len();
        let mut files = Vec::with_capacity(total);

        for (i, record) in entries.iter().enumerate() {
            let name = record.name().into_owned();
            progress(&MpkProgress::with_file(
                MpkPhase::DecompressingFiles,
                i + 1,
                total,
                name.clone(),
            ));

            if let Some(data) = self.extract(record)? {
                files.push(MpkFile {
                    id: record.id(),
                    name,
                    compressed: record.is_compressed(),
                    data,
                });
            }
        }

        progress(&MpkProgress::new(MpkPhase::Complete, total, total));

        Ok(files)
    }
}
