//! 24-bit big-endian ("medium") integers.
//!
//! Lengths and block numbers throughout the cache are stored in three bytes.
//! The functions here plug into binrw through `parse_with`/`write_with` so
//! that header structs can declare such fields directly.

use binrw::{BinReaderExt, BinResult, BinWriterExt, Endian};
use std::io::{Read, Seek, Write};

/// Largest value a medium field can hold.
pub const MEDIUM_MAX: u32 = 0x00FF_FFFF;

/// Decode a medium from three big-endian bytes.
pub const fn from_be_bytes(bytes: [u8; 3]) -> u32 {
    ((bytes[0] as u32) << 16) | ((bytes[1] as u32) << 8) | bytes[2] as u32
}

/// Encode the low 24 bits of `value` as three big-endian bytes.
pub const fn to_be_bytes(value: u32) -> [u8; 3] {
    [(value >> 16) as u8, (value >> 8) as u8, value as u8]
}

/// binrw parser for a 3-byte big-endian field.
pub fn parse_medium<R: Read + Seek>(reader: &mut R, _endian: Endian, _args: ()) -> BinResult<u32> {
    let bytes: [u8; 3] = reader.read_be()?;
    Ok(from_be_bytes(bytes))
}

/// binrw writer for a 3-byte big-endian field.
///
/// Values that do not fit in 24 bits are rejected rather than truncated.
pub fn write_medium<W: Write + Seek>(
    value: &u32,
    writer: &mut W,
    _endian: Endian,
    _args: (),
) -> BinResult<()> {
    if *value > MEDIUM_MAX {
        return Err(binrw::Error::AssertFail {
            pos: writer.stream_position().unwrap_or(0),
            message: format!("value {value} does not fit in 24 bits"),
        });
    }
    writer.write_be(&to_be_bytes(*value))?;
    Ok(())
}
