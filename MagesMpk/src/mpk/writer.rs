//! MPK archive writer with progress callbacks

use std::fs::File;
use std::io::{self, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;

use super::index::payload_start;
use super::{
    ArchiveHeader, ArchiveIndex, FileRecord, FormatVersion, HEADER_SIZE, MpkPhase, MpkProgress,
    PackEntry, ProgressCallback, RECORD_SIZE, RecordFields,
};
use crate::compression;
use crate::error::{Error, Result};

/// Source bytes of one entry, compressed if the entry asks for it
struct PreparedPayload {
    data: Vec<u8>,
    actual_size: u64,
}

impl PreparedPayload {
    fn load(entry: &PackEntry) -> Result<Self> {
        let raw = std::fs::read(&entry.source).map_err(|source| Error::SourceNotFound {
            id: entry.id,
            path: entry.source.clone(),
            source,
        })?;
        let actual_size = raw.len() as u64;

        let data = if entry.compressed {
            compression::compress(&raw)?
        } else {
            raw
        };

        Ok(Self { data, actual_size })
    }
}

/// Running payload cursor and the records laid out so far
struct Layout {
    version: FormatVersion,
    cursor: u64,
    records: Vec<FileRecord>,
}

impl Layout {
    /// Assign the next offset to `entry` and append its payload
    fn place<W: Write>(
        &mut self,
        entry: &PackEntry,
        payload: &PreparedPayload,
        output: &mut W,
    ) -> Result<()> {
        let stored_size = payload.data.len() as u64;
        let record = FileRecord::new(
            self.version,
            RecordFields {
                id: u64::from(entry.id),
                compressed: entry.compressed,
                offset: self.cursor,
                stored_size,
                actual_size: payload.actual_size,
                name: entry.name.as_bytes().to_vec(),
            },
        )?;

        output.write_all(&payload.data)?;

        tracing::debug!(
            "Packed #{} {} at {:#X} ({} bytes stored, {} actual, compressed: {})",
            record.id(),
            entry.name,
            record.offset(),
            stored_size,
            payload.actual_size,
            record.is_compressed()
        );

        self.cursor = self.cursor.saturating_add(stored_size);
        self.records.push(record);
        Ok(())
    }
}

/// MPK archive writer
///
/// Entries are laid out strictly in the order given: the record table lists
/// them in that order and their payloads follow the table back to back.
#[derive(Debug, Clone)]
pub struct MpkWriter {
    version: FormatVersion,
    version_minor: u16,
    parallel: bool,
}

impl MpkWriter {
    /// Create a writer for the given format version (minor version 0)
    #[must_use]
    pub fn new(version: FormatVersion) -> Self {
        Self {
            version,
            version_minor: 0,
            parallel: false,
        }
    }

    /// Create a writer from raw header version numbers
    ///
    /// # Errors
    /// Returns [`Error::InvalidFormat`] if `version_major` is not 1 or 2.
    pub fn create(version_major: u16, version_minor: u16) -> Result<Self> {
        Ok(Self::new(FormatVersion::from_major(version_major)?).with_version_minor(version_minor))
    }

    /// Set the minor version written to the header
    #[must_use]
    pub fn with_version_minor(mut self, version_minor: u16) -> Self {
        self.version_minor = version_minor;
        self
    }

    /// Compress entries on the rayon pool before laying them out
    ///
    /// Output is byte-identical to the sequential path; every payload is held
    /// in memory until the layout pass.
    #[must_use]
    pub fn with_parallel_compression(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    #[must_use]
    pub fn version(&self) -> FormatVersion {
        self.version
    }

    /// Write an archive to `output`
    ///
    /// # Errors
    /// See [`pack_with_progress`](Self::pack_with_progress).
    pub fn pack<W: Write + Seek>(&self, entries: &[PackEntry], output: W) -> Result<ArchiveIndex> {
        self.pack_with_progress(entries, output, &|_| {})
    }

    /// Write an archive to `output` with progress callback
    ///
    /// The header and a zeroed table are written first, then every payload in
    /// entry order; the finished table is written back over the placeholder.
    /// Null entries occupy zeroed record slots after the real records.
    ///
    /// # Errors
    /// Returns [`Error::SourceNotFound`] if a source file cannot be read,
    /// [`Error::FieldOutOfRange`] if an offset or size outgrows the version,
    /// [`Error::NameTooLong`] for an oversized name, or an IO error.
    pub fn pack_with_progress<W: Write + Seek>(
        &self,
        entries: &[PackEntry],
        mut output: W,
        progress: ProgressCallback,
    ) -> Result<ArchiveIndex> {
        let file_count = entries.len() as u64;
        let header = ArchiveHeader::new(self.version, self.version_minor, file_count)?;

        output.write_all(&header.encode())?;
        let table_len = file_count * RECORD_SIZE as u64;
        io::copy(&mut io::repeat(0).take(table_len), &mut output)?;

        let live: Vec<&PackEntry> = entries
            .iter()
            .filter(|e| !e.is_null(self.version))
            .collect();
        let total = live.len();
        let mut layout = Layout {
            version: self.version,
            cursor: payload_start(file_count),
            records: Vec::with_capacity(entries.len()),
        };

        if self.parallel {
            let done = AtomicUsize::new(0);
            let payloads = live
                .par_iter()
                .map(|entry| {
                    let payload = PreparedPayload::load(entry)?;
                    let current = done.fetch_add(1, Ordering::Relaxed) + 1;
                    progress(&MpkProgress::with_file(
                        MpkPhase::CompressingFiles,
                        current,
                        total,
                        entry.name.clone(),
                    ));
                    Ok(payload)
                })
                .collect::<Result<Vec<_>>>()?;

            for (i, (entry, payload)) in live.iter().zip(&payloads).enumerate() {
                progress(&MpkProgress::with_file(
                    MpkPhase::WritingArchive,
                    i + 1,
                    total,
                    entry.name.clone(),
                ));
                layout.place(entry, payload, &mut output)?;
            }
        } else {
            for (i, entry) in live.iter().enumerate() {
                progress(&MpkProgress::with_file(
                    MpkPhase::CompressingFiles,
                    i + 1,
                    total,
                    entry.name.clone(),
                ));
                let payload = PreparedPayload::load(entry)?;
                layout.place(entry, &payload, &mut output)?;
            }
        }

        let mut records = layout.records;
        let null_slot = FileRecord::new(self.version, RecordFields::default())?;
        records.resize(entries.len(), null_slot);

        progress(&MpkProgress::new(MpkPhase::WritingArchive, total, total));
        output.seek(SeekFrom::Start(HEADER_SIZE as u64))?;
        for record in &records {
            output.write_all(&record.encode())?;
        }
        output.seek(SeekFrom::End(0))?;
        output.flush()?;

        progress(&MpkProgress::new(MpkPhase::Complete, total, total));

        ArchiveIndex::from_records(self.version, self.version_minor, records)
    }

    /// Write an archive file, creating its parent directories
    ///
    /// The file handle is closed before returning, on success or failure.
    /// A failed pack may leave a partial file behind.
    ///
    /// # Errors
    /// See [`pack_with_progress`](Self::pack_with_progress).
    pub fn write_to_path(
        &self,
        entries: &[PackEntry],
        output_path: impl AsRef<Path>,
        progress: ProgressCallback,
    ) -> Result<ArchiveIndex> {
        let output_path = output_path.as_ref();

        if let Some(parent) = output_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let output = BufWriter::new(File::create(output_path)?);
        self.pack_with_progress(entries, output, progress)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mpk::MpkReader;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;
    use tempfile::tempdir;

    fn source(dir: &Path, name: &str, data: &[u8]) -> std::path::PathBuf {
        let path = dir.join(name);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, data).unwrap();
        path
    }

    fn pack(writer: &MpkWriter, entries: &[PackEntry]) -> (ArchiveIndex, Vec<u8>) {
        let mut cursor = Cursor::new(Vec::new());
        let index = writer.pack(entries, &mut cursor).unwrap();
        (index, cursor.into_inner())
    }

    #[test]
    fn test_create_rejects_major() {
        assert!(matches!(MpkWriter::create(3, 0), Err(Error::InvalidFormat(_))));
        assert_eq!(MpkWriter::create(1, 0).unwrap().version(), FormatVersion::V1);
    }

    #[test]
    fn test_offsets_are_contiguous() {
        let dir = tempdir().unwrap();
        let bin = b"binary payload ".repeat(40);
        let entries = vec![
            PackEntry::new(0, false, "a.txt", source(dir.path(), "a.txt", b"abcd")),
            PackEntry::new(1, true, "dir/b.bin", source(dir.path(), "b.bin", &bin)),
            PackEntry::new(2, false, "c.txt", source(dir.path(), "c.txt", b"c")),
        ];

        let (index, bytes) = pack(&MpkWriter::new(FormatVersion::V2), &entries);
        let records = index.records();

        assert_eq!(index.header().file_count(), 3);
        assert_eq!(records[0].offset(), 64 + 3 * 256);
        assert_eq!(records[1].offset(), records[0].offset() + 4);
        assert_eq!(records[2].offset(), records[1].offset() + records[1].stored_size());
        assert_eq!(bytes.len() as u64, records[2].offset() + 1);
        assert_eq!(records[1].actual_size(), bin.len() as u64);
        assert!(records[1].stored_size() < records[1].actual_size());
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let dir = tempdir().unwrap();
        let entries: Vec<PackEntry> = (0..16u32)
            .map(|i| {
                let data = format!("entry {i} ").repeat(i as usize * 10 + 1);
                let name = format!("files/{i}.dat");
                PackEntry::new(i, i % 2 == 0, &name, source(dir.path(), &name, data.as_bytes()))
            })
            .collect();

        let writer = MpkWriter::new(FormatVersion::V1);
        let (_, sequential) = pack(&writer, &entries);
        let (_, parallel) = pack(&writer.clone().with_parallel_compression(true), &entries);
        assert_eq!(sequential, parallel);
    }

    #[test]
    fn test_null_entries_become_trailing_slots() {
        let dir = tempdir().unwrap();
        let entries = vec![
            PackEntry::new(0, false, "", dir.path().join("unused")),
            PackEntry::new(1, false, "a.txt", source(dir.path(), "a.txt", b"abcd")),
        ];

        let (index, bytes) = pack(&MpkWriter::new(FormatVersion::V2), &entries);
        assert_eq!(index.header().file_count(), 2);
        assert_eq!(index.records()[0].name_bytes(), b"a.txt");
        assert_eq!(index.records()[0].offset(), 576);
        assert!(index.records()[1].is_null());
        assert!(bytes[64 + 256..576].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_v1_null_entry_ignores_flag() {
        let dir = tempdir().unwrap();
        let entries = vec![
            PackEntry::new(0, true, "", dir.path().join("none")),
            PackEntry::new(1, false, "a.txt", source(dir.path(), "a.txt", b"abcd")),
        ];

        let (index, _) = pack(&MpkWriter::new(FormatVersion::V1), &entries);
        assert_eq!(index.header().file_count(), 2);
        assert_eq!(index.entry_count(), 1);
        assert_eq!(index.records()[0].name_bytes(), b"a.txt");
        assert!(index.records()[1].is_null());
    }

    #[test]
    fn test_v2_flagged_empty_entry_is_packed() {
        let dir = tempdir().unwrap();
        let entries = vec![PackEntry::new(0, true, "", dir.path().join("none"))];

        let err = MpkWriter::new(FormatVersion::V2)
            .pack(&entries, Cursor::new(Vec::new()))
            .unwrap_err();
        assert!(matches!(err, Error::SourceNotFound { id: 0, .. }));
    }

    #[test]
    fn test_missing_source() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing.bin");
        let entries = vec![PackEntry::new(7, true, "missing.bin", &missing)];

        let err = MpkWriter::new(FormatVersion::V2)
            .pack(&entries, Cursor::new(Vec::new()))
            .unwrap_err();
        assert!(matches!(err, Error::SourceNotFound { id: 7, ref path, .. } if *path == missing));
    }

    #[test]
    fn test_name_too_long() {
        let dir = tempdir().unwrap();
        let name = "n".repeat(225);
        let entries = vec![PackEntry::new(0, false, &name, source(dir.path(), "n", b"n"))];

        let err = MpkWriter::new(FormatVersion::V1)
            .pack(&entries, Cursor::new(Vec::new()))
            .unwrap_err();
        assert!(matches!(err, Error::NameTooLong { len: 225, .. }));
    }

    #[test]
    fn test_header_minor_version() {
        let writer = MpkWriter::create(2, 7).unwrap();
        let (_, bytes) = pack(&writer, &[]);

        assert_eq!(bytes.len(), 64);
        let reader = MpkReader::open(Cursor::new(bytes)).unwrap();
        assert_eq!(reader.header().version_minor(), 7);
        assert_eq!(reader.header().file_count(), 0);
    }

    #[test]
    fn test_write_to_path() {
        let dir = tempdir().unwrap();
        let entries = vec![PackEntry::new(0, true, "a.txt", source(dir.path(), "a.txt", b"abcd"))];
        let output = dir.path().join("out/nested/test.mpk");

        MpkWriter::new(FormatVersion::V2)
            .write_to_path(&entries, &output, &|_| {})
            .unwrap();

        let mut reader = MpkReader::open_path(&output).unwrap();
        assert_eq!(reader.read_file("a.txt").unwrap(), b"abcd");
    }
}
