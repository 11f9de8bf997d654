//! CLI command for listing MPK contents

use std::path::Path;

use crate::cli::progress::format_size;
use crate::mpk::MpkOperations;

pub fn execute(archive: &Path, json: bool) -> anyhow::Result<()> {
    let files = MpkOperations::list(archive)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&files)?);
        return Ok(());
    }

    println!(
        "{:>6} {:>8} {:>4} {:>12} {:>12} {:>12}  Name",
        "Index", "Id", "Zlib", "Offset", "Stored", "Actual"
    );
    for file in &files {
        let actual = file
            .actual_size
            .map_or_else(|| "-".to_string(), format_size);
        println!(
            "{:>6} {:>8} {:>4} {:>#12X} {:>12} {:>12}  {}",
            file.index,
            file.id,
            if file.compressed { "yes" } else { "no" },
            file.offset,
            format_size(file.stored_size),
            actual,
            file.name
        );
    }

    let stored: u64 = files.iter().map(|f| f.stored_size).sum();
    println!();
    println!("{} files, {} stored", files.len(), format_size(stored));

    Ok(())
}
