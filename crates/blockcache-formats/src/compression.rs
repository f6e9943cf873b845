//! Headerless bzip2 compression
//!
//! The cache stores bzip2 streams with the 4-byte `BZh1` stream header
//! removed. Compression strips it after encoding; decompression puts it
//! back before handing the stream to the decoder. Streams are always
//! encoded with 100k blocks so that the synthesized header matches.

use bzip2::Compression;
use bzip2::read::BzDecoder;
use bzip2::write::BzEncoder;
use std::io::{Read, Write};
use thiserror::Error;

/// Stream header the cache strips from every bzip2 payload.
pub const BZIP2_HEADER: [u8; 4] = *b"BZh1";

/// Maximum allowed decompression size (64 MiB)
///
/// The largest container in a cache of this generation is well under a
/// megabyte; the cap keeps a corrupt stream from exhausting memory.
pub const MAX_DECOMPRESSION_SIZE: usize = 64 * 1024 * 1024;

/// Compression error type
#[derive(Debug, Error)]
pub enum CompressionError {
    /// Encoder failed
    #[error("bzip2 compression failed: {0}")]
    Compress(std::io::Error),

    /// Decoder failed (corrupt or truncated stream)
    #[error("bzip2 decompression failed: {0}")]
    Decompress(std::io::Error),

    /// Encoder produced a stream without the expected header
    #[error("unexpected bzip2 stream header: {0:02X?}")]
    UnexpectedHeader(Vec<u8>),

    /// Output exceeded [`MAX_DECOMPRESSION_SIZE`]
    #[error("decompressed size exceeds limit of {0} bytes")]
    TooLarge(usize),
}

/// Result type for compression operations
pub type CompressionResult<T> = Result<T, CompressionError>;

/// Compress `data` into a headerless bzip2 stream.
pub fn compress(data: &[u8]) -> CompressionResult<Vec<u8>> {
    let mut encoder = BzEncoder::new(Vec::new(), Compression::new(1));
    encoder.write_all(data).map_err(CompressionError::Compress)?;
    let mut stream = encoder.finish().map_err(CompressionError::Compress)?;

    if !stream.starts_with(&BZIP2_HEADER) {
        let head = stream.iter().take(BZIP2_HEADER.len()).copied().collect();
        return Err(CompressionError::UnexpectedHeader(head));
    }

    stream.drain(..BZIP2_HEADER.len());
    Ok(stream)
}

/// Decompress a headerless bzip2 stream.
pub fn decompress(data: &[u8]) -> CompressionResult<Vec<u8>> {
    let stream = BZIP2_HEADER.as_slice().chain(data);
    let mut decoder = BzDecoder::new(stream);
    let mut decompressed = Vec::new();

    // Read in chunks to enforce size limit
    let mut buffer = [0u8; 8192];
    loop {
        let bytes_read = decoder
            .read(&mut buffer)
            .map_err(CompressionError::Decompress)?;

        if bytes_read == 0 {
            break;
        }

        if decompressed.len() + bytes_read > MAX_DECOMPRESSION_SIZE {
            return Err(CompressionError::TooLarge(MAX_DECOMPRESSION_SIZE));
        }

        decompressed.extend_from_slice(&buffer[..bytes_read]);
    }

    Ok(decompressed)
}
