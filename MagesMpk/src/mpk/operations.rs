//! High-level MPK archive operations

use std::path::{Component, Path, PathBuf};

use serde::Serialize;

use super::{
    ArchiveIndex, DescriptionRow, DescriptionWriter, FileInfo, FileRecord, FormatVersion,
    MpkPhase, MpkProgress, MpkReader, MpkWriter, PackEntry, PackOptions, ProgressCallback,
    UnpackOptions, entries_from_description, entries_from_dir, entries_from_origin,
};
use crate::error::{Error, Result};

/// Result of a pack operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackSummary {
    pub version: FormatVersion,
    /// Record slots in the table, null slots included
    pub record_slots: u64,
    /// Entries with a payload
    pub files: usize,
    pub compressed_files: usize,
    /// Sum of payload sizes as stored
    pub stored_bytes: u64,
    /// Sum of original file sizes
    pub actual_bytes: u64,
    /// Total archive size
    pub archive_bytes: u64,
}

impl PackSummary {
    fn from_index(index: &ArchiveIndex) -> Self {
        let mut summary = Self {
            version: index.version(),
            record_slots: index.header().file_count(),
            files: 0,
            compressed_files: 0,
            stored_bytes: 0,
            actual_bytes: 0,
            archive_bytes: 0,
        };

        for (_, record) in index.entries() {
            summary.files += 1;
            summary.compressed_files += usize::from(record.is_compressed());
            summary.stored_bytes += record.stored_size();
            summary.actual_bytes += record.actual_size();
        }
        summary.archive_bytes = index.payload_start() + summary.stored_bytes;
        summary
    }
}

/// Result of an unpack operation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UnpackSummary {
    /// Files written
    pub files: usize,
    /// Bytes written
    pub bytes: u64,
    /// Description table written alongside, if requested
    pub description: Option<PathBuf>,
}

/// High-level MPK archive operations.
pub struct MpkOperations;

impl MpkOperations {
    /// Extract every entry of an archive into a directory
    ///
    /// # Errors
    /// See [`unpack_with_progress`](Self::unpack_with_progress).
    pub fn unpack<P: AsRef<Path>, Q: AsRef<Path>>(
        archive: P,
        output_dir: Q,
        options: &UnpackOptions,
    ) -> Result<UnpackSummary> {
        Self::unpack_with_progress(archive, output_dir, options, &|_| {})
    }

    /// Extract every entry of an archive into a directory with progress callback
    ///
    /// Entries are written to `output_dir/<name>` in table order, creating
    /// directories as needed. Null records are skipped. When
    /// [`UnpackOptions::description`] is set, a description table listing the
    /// written files is produced as well.
    ///
    /// # Errors
    /// Returns [`Error::InvalidFormat`] if the archive is malformed,
    /// [`Error::InvalidPath`] if an entry name would escape `output_dir`,
    /// [`Error::DecompressionFailed`] or [`Error::SizeMismatch`] for a bad
    /// payload, or an IO error.
    pub fn unpack_with_progress<P: AsRef<Path>, Q: AsRef<Path>>(
        archive: P,
        output_dir: Q,
        options: &UnpackOptions,
        progress: ProgressCallback,
    ) -> Result<UnpackSummary> {
        let archive = archive.as_ref();
        let output_dir = output_dir.as_ref();

        progress(&MpkProgress::new(MpkPhase::ReadingTable, 1, 1));
        let mut reader = MpkReader::open_path(archive)?;

        tracing::info!(
            "Unpacking {} ({}, {} entries) to {}",
            archive.display(),
            reader.version().as_str(),
            reader.index().entry_count(),
            output_dir.display()
        );

        std::fs::create_dir_all(output_dir)?;
        let mut description = options
            .description
            .as_ref()
            .map(DescriptionWriter::create)
            .transpose()?;

        let records: Vec<FileRecord> = reader.index().entries().map(|(_, r)| r.clone()).collect();
        let total = records.len();
        let mut summary = UnpackSummary::default();

        for (i, record) in records.iter().enumerate() {
            let name = record.name();
            let target = output_path(output_dir, &name)?;

            progress(&MpkProgress::with_file(
                MpkPhase::WritingFiles,
                i + 1,
                total,
                &*name,
            ));

            let Some(data) = reader.extract(record)? else {
                continue;
            };

            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&target, &data)?;

            summary.files += 1;
            summary.bytes += data.len() as u64;

            if let Some(writer) = description.as_mut() {
                writer.write_row(&DescriptionRow {
                    id: record.id(),
                    compressed: record.is_compressed(),
                    filename_on_disk: target,
                    filename_in_archive: name.into_owned(),
                })?;
            }
        }

        if let Some(writer) = description {
            writer.finish()?;
            summary.description.clone_from(&options.description);
        }

        progress(&MpkProgress::new(MpkPhase::Complete, total, total));
        tracing::info!(
            "Unpacked {} files ({} bytes) from {}",
            summary.files,
            summary.bytes,
            archive.display()
        );

        Ok(summary)
    }

    /// List the non-null entries of an archive
    ///
    /// # Errors
    /// Returns an error if the archive cannot be opened or is malformed.
    pub fn list<P: AsRef<Path>>(archive: P) -> Result<Vec<FileInfo>> {
        let reader = MpkReader::open_path(archive)?;
        Ok(reader.list_all())
    }

    /// Read a single entry by archive name
    ///
    /// # Errors
    /// Returns [`Error::EntryNotFound`] if no entry has that name, or an error
    /// if the archive or payload is malformed.
    pub fn read_file_bytes<P: AsRef<Path>>(archive: P, name: &str) -> Result<Vec<u8>> {
        let mut reader = MpkReader::open_path(archive)?;
        reader.read_file(name)
    }

    /// Pack a directory into an archive
    ///
    /// # Errors
    /// See [`pack_dir_with_progress`](Self::pack_dir_with_progress).
    pub fn pack_dir<P: AsRef<Path>, Q: AsRef<Path>>(
        output: P,
        dir: Q,
        options: &PackOptions,
    ) -> Result<PackSummary> {
        Self::pack_dir_with_progress(output, dir, options, &|_| {})
    }

    /// Pack a directory into an archive with progress callback
    ///
    /// With [`PackOptions::origin`] set, the origin archive's record table
    /// decides which files are packed and with which ids and flags; otherwise
    /// every file under `dir` is packed.
    ///
    /// # Errors
    /// Returns [`Error::SourceNotFound`] if a file named by the origin archive
    /// is missing, [`Error::WalkDirError`] if traversal fails, or any writer error.
    pub fn pack_dir_with_progress<P: AsRef<Path>, Q: AsRef<Path>>(
        output: P,
        dir: Q,
        options: &PackOptions,
        progress: ProgressCallback,
    ) -> Result<PackSummary> {
        let dir = dir.as_ref();
        progress(&MpkProgress::new(MpkPhase::ScanningFiles, 0, 1));

        let entries = if let Some(origin) = &options.origin {
            let reader = MpkReader::open_path(origin)?;
            tracing::info!(
                "Using record table of {} ({} entries)",
                origin.display(),
                reader.index().entry_count()
            );
            entries_from_origin(reader.index(), dir)?
        } else {
            entries_from_dir(dir, options.compress)?
        };

        progress(&MpkProgress::new(MpkPhase::ScanningFiles, 1, 1));
        Self::pack_entries_with_progress(output, &entries, options, progress)
    }

    /// Pack the entries listed in a description table
    ///
    /// # Errors
    /// See [`pack_by_description_with_progress`](Self::pack_by_description_with_progress).
    pub fn pack_by_description<P: AsRef<Path>, Q: AsRef<Path>>(
        output: P,
        description: Q,
        options: &PackOptions,
    ) -> Result<PackSummary> {
        Self::pack_by_description_with_progress(output, description, options, &|_| {})
    }

    /// Pack the entries listed in a description table with progress callback
    ///
    /// Ids and compression flags come from the table; [`PackOptions::compress`]
    /// and [`PackOptions::origin`] are ignored.
    ///
    /// # Errors
    /// Returns [`Error::InvalidDescription`] if the table is malformed, or any
    /// writer error.
    pub fn pack_by_description_with_progress<P: AsRef<Path>, Q: AsRef<Path>>(
        output: P,
        description: Q,
        options: &PackOptions,
        progress: ProgressCallback,
    ) -> Result<PackSummary> {
        progress(&MpkProgress::new(MpkPhase::ScanningFiles, 0, 1));
        let entries = entries_from_description(description)?;
        progress(&MpkProgress::new(MpkPhase::ScanningFiles, 1, 1));

        Self::pack_entries_with_progress(output, &entries, options, progress)
    }

    /// Pack prepared entries
    ///
    /// # Errors
    /// See [`pack_entries_with_progress`](Self::pack_entries_with_progress).
    pub fn pack_entries<P: AsRef<Path>>(
        output: P,
        entries: &[PackEntry],
        options: &PackOptions,
    ) -> Result<PackSummary> {
        Self::pack_entries_with_progress(output, entries, options, &|_| {})
    }

    /// Pack prepared entries with progress callback
    ///
    /// The output's parent directory is created if needed.
    ///
    /// # Errors
    /// Returns [`Error::SourceNotFound`] if a source file cannot be read,
    /// [`Error::FieldOutOfRange`] or [`Error::NameTooLong`] if an entry does
    /// not fit the chosen version, or an IO error.
    pub fn pack_entries_with_progress<P: AsRef<Path>>(
        output: P,
        entries: &[PackEntry],
        options: &PackOptions,
        progress: ProgressCallback,
    ) -> Result<PackSummary> {
        let output = output.as_ref();

        tracing::info!(
            "Packing {} entries into {} ({})",
            entries.len(),
            output.display(),
            options.version.as_str()
        );

        let index = MpkWriter::new(options.version)
            .with_version_minor(options.version_minor)
            .with_parallel_compression(options.parallel)
            .write_to_path(entries, output, progress)?;

        let summary = PackSummary::from_index(&index);
        tracing::info!(
            "Packed {} files ({} compressed), {} bytes",
            summary.files,
            summary.compressed_files,
            summary.archive_bytes
        );

        Ok(summary)
    }
}

/// Join an archive name onto the output directory
///
/// Only plain relative names are accepted.
fn output_path(output_dir: &Path, name: &str) -> Result<PathBuf> {
    let relative = Path::new(name);
    let is_plain = relative
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));

    let has_name = relative.components().any(|c| matches!(c, Component::Normal(_)));

    if !is_plain || !has_name {
        return Err(Error::InvalidPath(format!(
            "archive name `{name}` cannot be written under {}",
            output_dir.display()
        )));
    }

    Ok(output_dir.join(relative))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn test_output_path() {
        let base = Path::new("out");
        assert_eq!(output_path(base, "a/b.txt").unwrap(), base.join("a/b.txt"));
        assert_eq!(output_path(base, "./c.txt").unwrap(), base.join("./c.txt"));

        for name in ["", "../x", "a/../../x", "/etc/passwd", "."] {
            assert!(
                matches!(output_path(base, name), Err(Error::InvalidPath(_))),
                "{name} should be rejected"
            );
        }
    }

    #[test]
    fn test_pack_dir_and_unpack() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("src");
        std::fs::create_dir_all(source.join("dir")).unwrap();
        std::fs::write(source.join("a.txt"), b"abcd").unwrap();
        std::fs::write(source.join("dir/b.bin"), vec![7u8; 300]).unwrap();

        let archive = dir.path().join("out/test.mpk");
        let summary = MpkOperations::pack_dir(&archive, &source, &PackOptions::new()).unwrap();
        assert_eq!(summary.files, 2);
        assert_eq!(summary.compressed_files, 2);
        assert_eq!(summary.actual_bytes, 304);
        assert_eq!(
            summary.archive_bytes,
            std::fs::metadata(&archive).unwrap().len()
        );

        let names: Vec<String> = MpkOperations::list(&archive)
            .unwrap()
            .into_iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(names, vec!["a.txt", "dir/b.bin"]);

        let output = dir.path().join("unpacked");
        let csv = dir.path().join("unpacked.csv");
        let unpacked = MpkOperations::unpack(
            &archive,
            &output,
            &UnpackOptions::new().with_description(Some(csv.clone())),
        )
        .unwrap();

        assert_eq!(unpacked.files, 2);
        assert_eq!(unpacked.bytes, 304);
        assert_eq!(unpacked.description, Some(csv.clone()));
        assert_eq!(std::fs::read(output.join("a.txt")).unwrap(), b"abcd");
        assert_eq!(std::fs::read(output.join("dir/b.bin")).unwrap(), vec![7u8; 300]);

        let rows = super::super::read_description(&csv).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].filename_on_disk, output.join("dir/b.bin"));
        assert!(rows[1].compressed);
    }

    #[test]
    fn test_unpack_rejects_escaping_name() {
        let dir = tempdir().unwrap();
        let payload = dir.path().join("payload");
        std::fs::write(&payload, b"x").unwrap();

        let archive = dir.path().join("evil.mpk");
        MpkOperations::pack_entries(
            &archive,
            &[PackEntry::new(0, false, "../escape.txt", &payload)],
            &PackOptions::new(),
        )
        .unwrap();

        let err = MpkOperations::unpack(&archive, dir.path().join("out"), &UnpackOptions::new())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidPath(_)));
        assert!(!dir.path().join("escape.txt").exists());
    }

    #[test]
    fn test_read_file_bytes() {
        let dir = tempdir().unwrap();
        let payload = dir.path().join("payload");
        std::fs::write(&payload, b"hello").unwrap();

        let archive = dir.path().join("one.mpk");
        MpkOperations::pack_entries(
            &archive,
            &[PackEntry::new(3, true, "greeting.txt", &payload)],
            &PackOptions::new().with_version(FormatVersion::V1),
        )
        .unwrap();

        assert_eq!(
            MpkOperations::read_file_bytes(&archive, "greeting.txt").unwrap(),
            b"hello"
        );
        assert!(matches!(
            MpkOperations::read_file_bytes(&archive, "missing.txt"),
            Err(Error::EntryNotFound(_))
        ));
    }
}
