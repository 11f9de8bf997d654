//! Compression utilities
//!
//! MPK payloads use plain zlib streams at the default level, the same bytes
//! the game's own tooling produces.

use std::io::{self, Write};

use flate2::write::ZlibEncoder;
use flate2::{Compression, Decompress, FlushDecompress, Status};

/// Upper bound on the output buffer reserved up front from a size hint
const MAX_PREALLOCATION: usize = 64 * 1024 * 1024;

/// Compress data into a zlib stream
///
/// # Errors
/// Returns an error if the encoder fails.
pub fn compress(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::with_capacity(data.len() / 2), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

/// Decompress a zlib stream
///
/// `size_hint` is only used to size the output buffer. The stream must run to
/// its end marker; input that stops short of it is reported as truncated.
///
/// # Errors
/// Returns [`io::ErrorKind::InvalidData`] for a corrupt stream and
/// [`io::ErrorKind::UnexpectedEof`] for a truncated one.
pub fn decompress(data: &[u8], size_hint: usize) -> io::Result<Vec<u8>> {
    let mut inflater = Decompress::new(true);
    let mut output = Vec::with_capacity(size_hint.clamp(64, MAX_PREALLOCATION));

    loop {
        if output.len() == output.capacity() {
            output.reserve(output.capacity().max(4096));
        }

        let before = (inflater.total_in(), inflater.total_out());
        let consumed = before.0 as usize;
        let status = inflater
            .decompress_vec(&data[consumed..], &mut output, FlushDecompress::None)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        match status {
            Status::StreamEnd => return Ok(output),
            Status::Ok | Status::BufError => {
                // Output space was available, so no progress means the input ran out
                if (inflater.total_in(), inflater.total_out()) == before {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "zlib stream ended before its end marker",
                    ));
                }
            }
        }
    }
}
