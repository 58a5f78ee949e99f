//! Gzip helpers for request and response bodies

use std::io::{self, Read, Write};

use flate2::read::GzDecoder;
use flate2::{Compression, GzBuilder};

/// Highest gzip compression level.
pub const MAX_LEVEL: u32 = 9;

/// Gzip `data` at `level` with a zeroed header timestamp and no file name,
/// so identical input always produces identical bytes.
///
/// # Errors
///
/// Returns an error if `level` is above [`MAX_LEVEL`] or the encoder fails.
pub fn gzip_deterministic(data: &[u8], level: u32) -> io::Result<Vec<u8>> {
    if level > MAX_LEVEL {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("gzip level must be between 0 and {MAX_LEVEL}, got {level}"),
        ));
    }

    let mut encoder = GzBuilder::new().mtime(0).write(Vec::new(), Compression::new(level));
    encoder.write_all(data)?;
    encoder.finish()
}

/// Decompress a gzip stream.
///
/// # Errors
///
/// Returns an error if `data` is not valid gzip.
pub fn gunzip(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut decoder = GzDecoder::new(data);
    let mut decompressed = Vec::new();
    decoder.read_to_end(&mut decompressed)?;
    Ok(decompressed)
}
