//! CSV description table
//!
//! A description lists the entries of an archive, one row per entry, so an
//! unpacked archive can be repacked with the same ids, flags and order:
//!
//! ```text
//! id,is_compressed,filename_on_disk,filename_in_archive
//! 0,1,out/system/font.fnt,system/font.fnt
//! ```
//!
//! Columns are found by header name on read. Rows are written with CRLF.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Column names, in the order they are written
pub const DESCRIPTION_COLUMNS: [&str; 4] =
    ["id", "is_compressed", "filename_on_disk", "filename_in_archive"];

const DELIMITER: char = ',';
const LINE_ENDING: &str = "\r\n";

/// One row of a description table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptionRow {
    pub id: u32,
    pub compressed: bool,
    pub filename_on_disk: PathBuf,
    pub filename_in_archive: String,
}

/// Read a description table from a file
///
/// # Errors
/// Returns an error if the file cannot be read, or
/// [`Error::InvalidDescription`] if a column is missing or a row is malformed.
pub fn read_description<P: AsRef<Path>>(path: P) -> Result<Vec<DescriptionRow>> {
    let file = File::open(path)?;
    parse_description(BufReader::new(file))
}

/// Parse a description table
///
/// # Errors
/// Returns [`Error::InvalidDescription`] if a column is missing or a row is malformed.
pub fn parse_description<R: BufRead>(reader: R) -> Result<Vec<DescriptionRow>> {
    let mut columns: Option<[usize; 4]> = None;
    let mut rows = Vec::new();

    for (i, line) in reader.lines().enumerate() {
        let line_number = i + 1;
        let line = line?;
        let line = line.strip_prefix('\u{feff}').unwrap_or(&line);
        if line.trim().is_empty() {
            continue;
        }

        let fields = split_fields(line).map_err(|message| Error::InvalidDescription {
            line: line_number,
            message,
        })?;

        let Some(columns) = columns else {
            columns = Some(locate_columns(&fields, line_number)?);
            continue;
        };

        rows.push(parse_row(&fields, columns, line_number)?);
    }

    if columns.is_none() {
        return Err(Error::InvalidDescription {
            line: 1,
            message: "missing header row".to_string(),
        });
    }

    Ok(rows)
}

fn locate_columns(header: &[String], line: usize) -> Result<[usize; 4]> {
    let mut columns = [0usize; 4];
    for (slot, name) in columns.iter_mut().zip(DESCRIPTION_COLUMNS) {
        *slot = header
            .iter()
            .position(|h| h.trim() == name)
            .ok_or_else(|| Error::InvalidDescription {
                line,
                message: format!("missing column `{name}`"),
            })?;
    }
    Ok(columns)
}

fn parse_row(fields: &[String], columns: [usize; 4], line: usize) -> Result<DescriptionRow> {
    let invalid = |message: String| Error::InvalidDescription { line, message };
    let field = |column: usize| {
        fields.get(columns[column]).ok_or_else(|| {
            invalid(format!(
                "expected a `{}` field, row has {} fields",
                DESCRIPTION_COLUMNS[column],
                fields.len()
            ))
        })
    };

    let id_field = field(0)?.trim();
    let id = id_field
        .parse::<u32>()
        .map_err(|e| invalid(format!("invalid id `{id_field}`: {e}")))?;

    let flag_field = field(1)?.trim();
    let compressed = parse_flag(flag_field)
        .ok_or_else(|| invalid(format!("invalid is_compressed value `{flag_field}`")))?;

    Ok(DescriptionRow {
        id,
        compressed,
        filename_on_disk: PathBuf::from(field(2)?),
        filename_in_archive: field(3)?.clone(),
    })
}

/// Integer flag, non-zero meaning compressed; `true`/`false` are accepted too
fn parse_flag(text: &str) -> Option<bool> {
    if text.eq_ignore_ascii_case("true") {
        return Some(true);
    }
    if text.eq_ignore_ascii_case("false") {
        return Some(false);
    }
    text.parse::<i64>().ok().map(|value| value != 0)
}

/// Split one line into fields, honouring double quotes
fn split_fields(line: &str) -> std::result::Result<Vec<String>, String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut quoted = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' if field.is_empty() && !quoted => {
                in_quotes = true;
                quoted = true;
            }
            DELIMITER if !in_quotes => {
                fields.push(std::mem::take(&mut field));
                quoted = false;
            }
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err("unterminated quoted field".to_string());
    }
    fields.push(field);
    Ok(fields)
}

/// Quote a field if it contains the delimiter, a quote or a line break
fn escape_field(text: &str) -> String {
    if text.contains(DELIMITER) || text.contains('\n') || text.contains('\r') || text.contains('"')
    {
        let escaped = text.replace('"', "\"\"");
        format!("\"{escaped}\"")
    } else {
        text.to_string()
    }
}

/// Streaming description table writer
///
/// The header row is written on construction.
pub struct DescriptionWriter<W: Write> {
    writer: W,
    rows: usize,
}

impl DescriptionWriter<BufWriter<File>> {
    /// Create a description file, creating its parent directories
    ///
    /// # Errors
    /// Returns an error if the file cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::new(BufWriter::new(File::create(path)?))
    }
}

impl<W: Write> DescriptionWriter<W> {
    /// Wrap a writer and emit the header row
    ///
    /// # Errors
    /// Returns an error if the header cannot be written.
    pub fn new(mut writer: W) -> Result<Self> {
        write!(writer, "{}{LINE_ENDING}", DESCRIPTION_COLUMNS.join(","))?;
        Ok(Self { writer, rows: 0 })
    }

    /// Append one row
    ///
    /// # Errors
    /// Returns an error if the row cannot be written.
    pub fn write_row(&mut self, row: &DescriptionRow) -> Result<()> {
        write!(
            self.writer,
            "{}{DELIMITER}{}{DELIMITER}{}{DELIMITER}{}{LINE_ENDING}",
            row.id,
            u8::from(row.compressed),
            escape_field(&row.filename_on_disk.to_string_lossy()),
            escape_field(&row.filename_in_archive),
        )?;
        self.rows += 1;
        Ok(())
    }

    /// Number of data rows written so far
    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Flush and return the inner writer
    ///
    /// # Errors
    /// Returns an error if flushing fails.
    pub fn finish(mut self) -> Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}
