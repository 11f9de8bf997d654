//! CLI command for MPK extraction

use std::path::Path;
use std::time::Instant;

use crate::cli::progress::{
    DISK, LOOKING_GLASS, follow, format_size, print_done, print_step, simple_bar,
};
use crate::mpk::{MpkOperations, UnpackOptions};

pub fn execute(
    archive: &Path,
    output_dir: &Path,
    description: Option<&Path>,
    progress: bool,
) -> anyhow::Result<()> {
    if !archive.is_file() {
        anyhow::bail!("MPK file not found: {}", archive.display());
    }

    let options = UnpackOptions::new().with_description(description.map(Path::to_path_buf));

    if !progress {
        MpkOperations::unpack(archive, output_dir, &options)?;
        return Ok(());
    }

    let start = Instant::now();
    print_step(
        1,
        2,
        LOOKING_GLASS,
        &format!("Reading {}...", archive.display()),
    );
    print_step(
        2,
        2,
        DISK,
        &format!("Writing files to {}...", output_dir.display()),
    );

    let pb = simple_bar(0, "Extracting");
    let summary =
        MpkOperations::unpack_with_progress(archive, output_dir, &options, &|p| follow(&pb, p))?;
    pb.finish_and_clear();

    println!(
        "Extracted {} files ({})",
        summary.files,
        format_size(summary.bytes)
    );
    if let Some(path) = &summary.description {
        println!("Description written to {}", path.display());
    }
    print_done(start.elapsed());

    Ok(())
}
