use clap::Subcommand;
use std::path::PathBuf;

pub mod execute;
pub mod list;
pub mod pack;
pub mod unpack;

#[derive(Subcommand)]
pub enum Commands {
    /// Pack a directory into an MPK archive
    Pack {
        /// Output MPK file
        output: PathBuf,

        /// Directory containing the files to pack
        pack_dir: PathBuf,

        /// Copy ids, compression flags and order from an existing archive
        #[arg(short = 'm', long, alias = "origin_mpk_path")]
        origin: Option<PathBuf>,

        /// Write the old (version 1) format
        #[arg(short, long, alias = "old_format")]
        old_format: bool,

        /// Store files uncompressed (ignored with --origin)
        #[arg(short, long, alias = "no_compress")]
        no_compress: bool,

        /// Compress files on all cores
        #[arg(short, long)]
        parallel: bool,

        /// Suppress progress bar
        #[arg(short, long)]
        quiet: bool,
    },

    /// Pack the files listed in a CSV description table
    #[command(name = "pack-by-description", alias = "packbycsv")]
    PackByDescription {
        /// Output MPK file
        output: PathBuf,

        /// CSV with id, is_compressed, filename_on_disk and filename_in_archive columns
        description: PathBuf,

        /// Write the old (version 1) format
        #[arg(short, long, alias = "old_format")]
        old_format: bool,

        /// Compress files on all cores
        #[arg(short, long)]
        parallel: bool,

        /// Suppress progress bar
        #[arg(short, long)]
        quiet: bool,
    },

    /// Unpack an MPK archive
    Unpack {
        /// Source MPK file
        archive: PathBuf,

        /// Output directory
        output_dir: PathBuf,

        /// Also write a CSV description table for repacking
        #[arg(short = 'c', long, alias = "csv_path")]
        description: Option<PathBuf>,

        /// Suppress progress bar
        #[arg(short, long)]
        quiet: bool,
    },

    /// List MPK contents
    List {
        /// Source MPK file
        archive: PathBuf,

        /// Print the listing as JSON
        #[arg(long)]
        json: bool,
    },
}
