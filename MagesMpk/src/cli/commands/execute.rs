//! Command execution implementations

use super::Commands;
use super::{list, pack, unpack};
use crate::mpk::{FormatVersion, PackOptions};

fn version(old_format: bool) -> FormatVersion {
    if old_format {
        FormatVersion::V1
    } else {
        FormatVersion::V2
    }
}

impl Commands {
    /// Execute the selected command.
    ///
    /// # Errors
    /// Returns an error if the underlying command fails.
    pub fn execute(&self) -> anyhow::Result<()> {
        match self {
            Commands::Pack {
                output,
                pack_dir,
                origin,
                old_format,
                no_compress,
                parallel,
                quiet,
            } => {
                let options = PackOptions::new()
                    .with_version(version(*old_format))
                    .with_compress(!*no_compress)
                    .with_origin(origin.clone())
                    .with_parallel(*parallel);
                pack::execute_dir(output, pack_dir, &options, !*quiet)
            }
            Commands::PackByDescription {
                output,
                description,
                old_format,
                parallel,
                quiet,
            } => {
                let options = PackOptions::new()
                    .with_version(version(*old_format))
                    .with_parallel(*parallel);
                pack::execute_description(output, description, &options, !*quiet)
            }
            Commands::Unpack {
                archive,
                output_dir,
                description,
                quiet,
            } => unpack::execute(archive, output_dir, description.as_deref(), !*quiet),
            Commands::List { archive, json } => list::execute(archive, *json),
        }
    }
}
