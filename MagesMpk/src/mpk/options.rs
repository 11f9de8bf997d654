//! Pack and unpack options

use std::path::PathBuf;

use super::FormatVersion;

/// Options for packing an archive.
///
/// # Example
///
/// ```no_run
/// use magesmpk::mpk::{FormatVersion, PackOptions};
///
/// // Old-format archive with stored (uncompressed) entries
/// let options = PackOptions::new()
///     .with_version(FormatVersion::V1)
///     .with_compress(false);
///
/// // Reuse the ids and flags of an existing archive
/// let options = PackOptions::new().with_origin(Some("system.mpk".into()));
/// ```
#[derive(Debug, Clone)]
pub struct PackOptions {
    /// Archive format version
    /// Default: version 2
    pub version: FormatVersion,

    /// Minor version written to the header
    pub version_minor: u16,

    /// Compress entries found by a directory walk
    /// Default: true. Ignored when an origin archive or description supplies the flags.
    pub compress: bool,

    /// Archive whose record table provides ids, flags and order
    pub origin: Option<PathBuf>,

    /// Compress entries on the rayon thread pool
    pub parallel: bool,
}

impl PackOptions {
    /// Create options for a compressed version 2 archive.
    #[must_use]
    pub fn new() -> Self {
        Self {
            version: FormatVersion::V2,
            version_minor: 0,
            compress: true,
            origin: None,
            parallel: false,
        }
    }

    /// Set the archive format version.
    #[must_use]
    pub fn with_version(mut self, version: FormatVersion) -> Self {
        self.version = version;
        self
    }

    /// Set the header minor version.
    #[must_use]
    pub fn with_version_minor(mut self, version_minor: u16) -> Self {
        self.version_minor = version_minor;
        self
    }

    /// Set whether directory entries are compressed.
    #[must_use]
    pub fn with_compress(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    /// Set the origin archive.
    #[must_use]
    pub fn with_origin(mut self, origin: Option<PathBuf>) -> Self {
        self.origin = origin;
        self
    }

    /// Set whether compression runs in parallel.
    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}

impl Default for PackOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Options for unpacking an archive.
#[derive(Debug, Clone, Default)]
pub struct UnpackOptions {
    /// Write a description table of the extracted entries here
    pub description: Option<PathBuf>,
}

impl UnpackOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the description table output path.
    #[must_use]
    pub fn with_description(mut self, path: Option<PathBuf>) -> Self {
        self.description = path;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_defaults() {
        let options = PackOptions::default();
        assert_eq!(options.version, FormatVersion::V2);
        assert_eq!(options.version_minor, 0);
        assert!(options.compress);
        assert!(options.origin.is_none());
        assert!(!options.parallel);
    }

    #[test]
    fn test_builder() {
        let options = PackOptions::new()
            .with_version(FormatVersion::V1)
            .with_compress(false)
            .with_parallel(true)
            .with_origin(Some(PathBuf::from("a.mpk")));
        assert_eq!(options.version, FormatVersion::V1);
        assert!(!options.compress);
        assert!(options.parallel);
        assert_eq!(options.origin, Some(PathBuf::from("a.mpk")));

        let unpack = UnpackOptions::new().with_description(Some(PathBuf::from("list.csv")));
        assert_eq!(unpack.description, Some(PathBuf::from("list.csv")));
    }
}
