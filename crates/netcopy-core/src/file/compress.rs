//! Per-chunk LZ4 compression for file transfer.
//!
//! Compressibility is decided solely by the source file's extension against
//! a deny-list of already-compressed formats. Compressed chunks are LZ4
//! block format with the uncompressed length prepended, so the receiver can
//! both size its output buffer and bound decompression.

use std::path::Path;

use crate::error::{Error, Result};

/// Extensions of formats that are already compressed; chunks of these files
/// are sent raw.
const NON_COMPRESSIBLE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "mp3", "mp4", "avi", "zip", "gz", "bz2", "rar", "7z", "lz4",
    "pdf", "mpg", "mpeg", "ogg", "flac",
];

/// Whether chunks of this file should be compressed.
pub fn is_compressible(path: &Path) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => {
            let lower = ext.to_ascii_lowercase();
            !NON_COMPRESSIBLE_EXTENSIONS.contains(&lower.as_str())
        }
        None => true,
    }
}

/// Compress one chunk. Output carries the uncompressed length in its first
/// four bytes (little-endian), followed by the LZ4 block.
pub fn compress_chunk(data: &[u8]) -> Vec<u8> {
    lz4_flex::compress_prepend_size(data)
}

/// Decompress one chunk produced by [`compress_chunk`].
///
/// The declared uncompressed length is checked against `max_size` before
/// any allocation, so a hostile chunk cannot balloon memory.
pub fn decompress_chunk(data: &[u8], max_size: usize) -> Result<Vec<u8>> {
    if data.len() < 4 {
        return Err(Error::file("compressed chunk too short"));
    }

    let declared = u32::from_le_bytes(data[0..4].try_into().unwrap()) as usize;
    if declared > max_size {
        return Err(Error::file(format!(
            "compressed chunk declares {} bytes, limit is {}",
            declared, max_size
        )));
    }

    lz4_flex::decompress_size_prepended(data)
        .map_err(|e| Error::file(format!("decompression failed: {}", e)))
}
