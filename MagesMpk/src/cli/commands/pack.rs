//! CLI commands for packing MPK archives

use std::path::Path;
use std::time::Instant;

use crate::cli::progress::{
    LOOKING_GLASS, PACKAGE, follow, format_size, print_done, print_step, simple_bar,
};
use crate::mpk::{MpkOperations, PackOptions, PackSummary};

/// Pack a directory, or the files named by an origin archive
pub fn execute_dir(
    output: &Path,
    pack_dir: &Path,
    options: &PackOptions,
    progress: bool,
) -> anyhow::Result<()> {
    if !pack_dir.is_dir() {
        anyhow::bail!("Pack directory not found: {}", pack_dir.display());
    }

    let start = Instant::now();
    if progress {
        match &options.origin {
            Some(origin) => print_step(
                1,
                2,
                LOOKING_GLASS,
                &format!("Reading record table of {}...", origin.display()),
            ),
            None => print_step(
                1,
                2,
                LOOKING_GLASS,
                &format!("Scanning {}...", pack_dir.display()),
            ),
        }
        print_step(2, 2, PACKAGE, &format!("Packing {}...", output.display()));

        let pb = simple_bar(0, "Packing");
        let summary =
            MpkOperations::pack_dir_with_progress(output, pack_dir, options, &|p| follow(&pb, p))?;
        pb.finish_and_clear();

        print_summary(&summary);
        print_done(start.elapsed());
    } else {
        MpkOperations::pack_dir(output, pack_dir, options)?;
    }

    Ok(())
}

/// Pack the files listed in a description table
pub fn execute_description(
    output: &Path,
    description: &Path,
    options: &PackOptions,
    progress: bool,
) -> anyhow::Result<()> {
    let start = Instant::now();
    if progress {
        print_step(
            1,
            2,
            LOOKING_GLASS,
            &format!("Reading {}...", description.display()),
        );
        print_step(2, 2, PACKAGE, &format!("Packing {}...", output.display()));

        let pb = simple_bar(0, "Packing");
        let summary = MpkOperations::pack_by_description_with_progress(
            output,
            description,
            options,
            &|p| follow(&pb, p),
        )?;
        pb.finish_and_clear();

        print_summary(&summary);
        print_done(start.elapsed());
    } else {
        MpkOperations::pack_by_description(output, description, options)?;
    }

    Ok(())
}

fn print_summary(summary: &PackSummary) {
    println!(
        "Packed {} files ({} compressed) into a {} archive of {}",
        summary.files,
        summary.compressed_files,
        summary.version.as_str(),
        format_size(summary.archive_bytes)
    );
}
