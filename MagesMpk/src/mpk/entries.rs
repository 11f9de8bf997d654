//! Pack entry preparation
//!
//! Entries can come from a directory walk, from an existing archive's record
//! table (to reproduce its ids, flags and order) or from a description table.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::{ArchiveIndex, DescriptionRow, FormatVersion, read_description};
use crate::error::{Error, Result};

/// One file to be packed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackEntry {
    pub id: u32,
    pub compressed: bool,
    /// Name stored in the archive, `/`-separated
    pub name: String,
    /// File the payload is read from
    pub source: PathBuf,
}

impl PackEntry {
    /// Create an entry, normalizing `\` separators in the name to `/`
    #[must_use]
    pub fn new(
        id: u32,
        compressed: bool,
        name: impl AsRef<str>,
        source: impl Into<PathBuf>,
    ) -> Self {
        Self {
            id,
            compressed,
            name: name.as_ref().replace('\\', "/"),
            source: source.into(),
        }
    }

    /// A null entry becomes an all-zero record slot and has no payload
    ///
    /// Version 1 records carry no compression flag, so the flag does not
    /// count there.
    #[must_use]
    pub fn is_null(&self, version: FormatVersion) -> bool {
        let flag_is_zero = match version {
            FormatVersion::V1 => true,
            FormatVersion::V2 => !self.compressed,
        };
        self.id == 0 && self.name.is_empty() && flag_is_zero
    }
}

impl From<DescriptionRow> for PackEntry {
    fn from(row: DescriptionRow) -> Self {
        Self::new(
            row.id,
            row.compressed,
            row.filename_in_archive,
            row.filename_on_disk,
        )
    }
}

/// Collect every regular file under `dir`
///
/// Files are visited in file-name order and numbered from 0. Names are the
/// paths relative to `dir`.
///
/// # Errors
/// Returns [`Error::InvalidPath`] if `dir` is not a directory, or
/// [`Error::WalkDirError`] if traversal fails.
pub fn entries_from_dir<P: AsRef<Path>>(dir: P, compress: bool) -> Result<Vec<PackEntry>> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(Error::InvalidPath(format!("{} is not a directory", dir.display())));
    }

    let mut entries = Vec::new();
    for entry in WalkDir::new(dir).follow_links(true).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry.path().strip_prefix(dir).map_err(|_| {
            Error::InvalidPath(format!("{} is outside {}", entry.path().display(), dir.display()))
        })?;
        let id = u32::try_from(entries.len()).map_err(|_| {
            Error::InvalidFormat(format!("more than {} files under {}", u32::MAX, dir.display()))
        })?;

        entries.push(PackEntry::new(
            id,
            compress,
            relative.to_string_lossy(),
            entry.path(),
        ));
    }

    tracing::debug!("Found {} files under {}", entries.len(), dir.display());
    Ok(entries)
}

/// Reuse the record table of an existing archive
///
/// Every non-null record becomes an entry with the same id, effective
/// compression flag and position, sourced from `dir/<name>`.
///
/// # Errors
/// Returns [`Error::SourceNotFound`] if a named file does not exist under `dir`.
pub fn entries_from_origin<P: AsRef<Path>>(
    origin: &ArchiveIndex,
    dir: P,
) -> Result<Vec<PackEntry>> {
    let dir = dir.as_ref();

    origin
        .entries()
        .map(|(_, record)| {
            let name = record.name();
            let source = dir.join(&*name);
            if !source.is_file() {
                return Err(Error::SourceNotFound {
                    id: record.id(),
                    path: source,
                    source: std::io::Error::new(
                        std::io::ErrorKind::NotFound,
                        format!("{name} is not a file"),
                    ),
                });
            }
            Ok(PackEntry::new(record.id(), record.is_compressed(), name, source))
        })
        .collect()
}

/// Read entries from a description table
///
/// # Errors
/// Returns an error if the table cannot be read or parsed.
pub fn entries_from_description<P: AsRef<Path>>(path: P) -> Result<Vec<PackEntry>> {
    let rows = read_description(path)?;
    Ok(rows.into_iter().map(PackEntry::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mpk::{FileRecord, FormatVersion, RecordFields};
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn write(dir: &Path, name: &str) {
        let path = dir.join(name);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, name).unwrap();
    }

    fn record(id: u32, compressed: bool, name: &str) -> FileRecord {
        FileRecord::new(
            FormatVersion::V2,
            RecordFields {
                id: u64::from(id),
                compressed,
                name: name.as_bytes().to_vec(),
                ..RecordFields::default()
            },
        )
        .unwrap()
    }

    #[test]
    fn test_entry_normalizes_separators() {
        let entry = PackEntry::new(1, true, "dir\\sub\\file.bin", "x");
        assert_eq!(entry.name, "dir/sub/file.bin");
        assert!(!entry.is_null(FormatVersion::V2));
        assert!(PackEntry::new(0, false, "", "x").is_null(FormatVersion::V2));
        assert!(!PackEntry::new(0, true, "", "x").is_null(FormatVersion::V2));
    }

    #[test]
    fn test_v1_null_ignores_flag() {
        assert!(PackEntry::new(0, true, "", "x").is_null(FormatVersion::V1));
        assert!(PackEntry::new(0, false, "", "x").is_null(FormatVersion::V1));
        assert!(!PackEntry::new(1, true, "", "x").is_null(FormatVersion::V1));
        assert!(!PackEntry::new(0, true, "a", "x").is_null(FormatVersion::V1));
    }

    #[test]
    fn test_entries_from_dir_sorted() {
        let dir = tempdir().unwrap();
        write(dir.path(), "b.txt");
        write(dir.path(), "a/z.txt");
        write(dir.path(), "a/y.txt");
        write(dir.path(), "c.txt");

        let entries = entries_from_dir(dir.path(), false).unwrap();
        let names: Vec<(u32, &str)> = entries.iter().map(|e| (e.id, e.name.as_str())).collect();
        assert_eq!(
            names,
            vec![(0, "a/y.txt"), (1, "a/z.txt"), (2, "b.txt"), (3, "c.txt")]
        );
        assert!(entries.iter().all(|e| !e.compressed && e.source.is_file()));
    }

    #[test]
    fn test_entries_from_dir_not_a_directory() {
        let dir = tempdir().unwrap();
        let err = entries_from_dir(dir.path().join("missing"), true).unwrap_err();
        assert!(matches!(err, Error::InvalidPath(_)));
    }

    #[test]
    fn test_entries_from_origin() {
        let dir = tempdir().unwrap();
        write(dir.path(), "sys/a.bin");
        write(dir.path(), "b.bin");

        let origin = ArchiveIndex::from_records(
            FormatVersion::V2,
            0,
            vec![
                record(10, true, "sys/a.bin"),
                FileRecord::new(FormatVersion::V2, RecordFields::default()).unwrap(),
                record(4, false, "b.bin"),
            ],
        )
        .unwrap();

        let entries = entries_from_origin(&origin, dir.path()).unwrap();
        assert_eq!(
            entries,
            vec![
                PackEntry::new(10, true, "sys/a.bin", dir.path().join("sys/a.bin")),
                PackEntry::new(4, false, "b.bin", dir.path().join("b.bin")),
            ]
        );
    }

    #[test]
    fn test_entries_from_origin_missing_file() {
        let dir = tempdir().unwrap();
        let origin =
            ArchiveIndex::from_records(FormatVersion::V2, 0, vec![record(3, true, "gone.bin")])
                .unwrap();

        let err = entries_from_origin(&origin, dir.path()).unwrap_err();
        assert!(matches!(err, Error::SourceNotFound { id: 3, .. }));
    }

    #[test]
    fn test_entries_from_description() {
        let dir = tempdir().unwrap();
        let csv = dir.path().join("files.csv");
        let text = concat!(
            "id,is_compressed,filename_on_disk,filename_in_archive\r\n",
            "7,1,disk/a.bin,dir\\a.bin\r\n",
        );
        std::fs::write(&csv, text).unwrap();

        let entries = entries_from_description(&csv).unwrap();
        assert_eq!(entries, vec![PackEntry::new(7, true, "dir/a.bin", "disk/a.bin")]);
    }
}
