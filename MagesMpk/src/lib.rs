//! # MagesMpk
//!
//! A pure-Rust library for the MPK archive format used by MAGES. engine games.
//!
//! ## Supported Operations
//!
//! - **Unpack** - Extract every entry, optionally writing a CSV description table
//! - **Pack** - Build version 1 or version 2 archives from a directory, an
//!   existing archive's record table or a description table
//! - **List** - Inspect the record table without extracting
//!
//! ## Quick Start
//!
//! ```no_run
//! use magesmpk::mpk::{MpkOperations, PackOptions, UnpackOptions};
//!
//! // List contents of an archive
//! let files = MpkOperations::list("system.mpk")?;
//! println!("Found {} files", files.len());
//!
//! // Unpack it, keeping a description for repacking
//! let options = UnpackOptions::new().with_description(Some("system.csv".into()));
//! MpkOperations::unpack("system.mpk", "system/", &options)?;
//!
//! // Repack the edited files with the original ids and flags
//! MpkOperations::pack_by_description("system_new.mpk", "system.csv", &PackOptions::new())?;
//! # Ok::<(), magesmpk::Error>(())
//! ```
//!
//! ### Working with Streams
//!
//! ```no_run
//! use std::io::Cursor;
//! use magesmpk::mpk::{FormatVersion, MpkReader, MpkWriter, PackEntry};
//!
//! let entries = vec![PackEntry::new(0, true, "script/main.scx", "main.scx")];
//! let mut archive = Cursor::new(Vec::new());
//! MpkWriter::new(FormatVersion::V2).pack(&entries, &mut archive)?;
//!
//! archive.set_position(0);
//! let mut reader = MpkReader::open(archive)?;
//! let data = reader.read_file("script/main.scx")?;
//! # Ok::<(), magesmpk::Error>(())
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` - Enables the `magesmpk` command-line binary

pub mod compression;
pub mod error;
pub mod mpk;

// Re-exports for convenience
pub use error::{Error, Result};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::mpk::{
        ArchiveHeader, ArchiveIndex, FileInfo, FileRecord, FormatVersion, MpkOperations,
        MpkPhase, MpkProgress, MpkReader, MpkWriter, PackEntry, PackOptions, PackSummary,
        UnpackOptions, UnpackSummary,
    };
}

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// CLI module (feature-gated)
#[cfg(feature = "cli")]
pub mod cli;
