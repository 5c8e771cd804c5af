//! Variable-length integers as used by the Minecraft protocol.
//!
//! Seven data bits per byte, least significant group first, with the high bit
//! set on every byte except the last. Values are limited to 32 bits, so an
//! encoding never exceeds [`MAX_LEN`] bytes.

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::PingError;

/// The maximum number of bytes a 32-bit varint occupies.
pub const MAX_LEN: usize = 5;

const SEGMENT_BITS: u8 = 0b0111_1111;
const CONTINUE_BIT: u8 = 0b1000_0000;

/// Appends the minimal encoding of `value` to `buf`, returning how many bytes
/// were written.
pub fn write(buf: &mut Vec<u8>, mut value: u32) -> usize {
    let mut written = 0;
    loop {
        #[allow(clippy::cast_possible_truncation)]
        let mut byte = (value & u32::from(SEGMENT_BITS)) as u8;
        value >>= 7;
        if value != 0 {
            byte |= CONTINUE_BIT;
        }
        buf.push(byte);
        written += 1;
        if value == 0 {
            return written;
        }
    }
}

/// Encodes `value` into a fresh buffer.
#[must_use]
pub fn encode(value: u32) -> Vec<u8> {
    let mut buf = Vec::with_capacity(MAX_LEN);
    write(&mut buf, value);
    buf
}

/// The number of bytes the encoding of `value` takes.
#[must_use]
pub const fn encoded_len(value: u32) -> usize {
    match value {
        0..=0x7f => 1,
        0x80..=0x3fff => 2,
        0x4000..=0x001f_ffff => 3,
        0x0020_0000..=0x0fff_ffff => 4,
        _ => 5,
    }
}

/// Reads one varint from `reader`.
///
/// # Errors
/// [`PingError::MalformedData`] if the encoding runs past five bytes or sets
/// bits beyond the 32-bit range, or if the stream ends mid-varint. Other read
/// failures map to [`PingError::ConnectionFailed`].
pub async fn read<R: AsyncRead + Unpin>(reader: &mut R) -> Result<u32, PingError> {
    read_counted(reader).await.map(|(value, _)| value)
}

/// Reads one varint, also returning how many bytes it occupied on the wire.
///
/// Peers may send non-minimal encodings, so this can exceed
/// [`encoded_len`] of the value.
pub(crate) async fn read_counted<R: AsyncRead + Unpin>(
    reader: &mut R,
) -> Result<(u32, usize), PingError> {
    let first = reader.read_u8().await.map_err(PingError::from_read)?;
    read_continued(first, reader).await
}

/// Finishes reading a varint whose first byte was already taken from `reader`,
/// returning the value and the number of bytes read including `first`.
pub(crate) async fn read_continued<R: AsyncRead + Unpin>(
    first: u8,
    reader: &mut R,
) -> Result<(u32, usize), PingError> {
    let mut value: u32 = 0;
    let mut byte = first;
    for position in 0..MAX_LEN {
        if position > 0 {
            byte = reader.read_u8().await.map_err(PingError::from_read)?;
        }
        let segment = byte & SEGMENT_BITS;
        // the fifth byte only has room for the top four bits of a u32
        if position == MAX_LEN - 1 && segment > 0x0f {
            return Err(PingError::malformed("varint exceeds 32 bits"));
        }
        value |= u32::from(segment) << (7 * position);
        if byte & CONTINUE_BIT == 0 {
            return Ok((value, position + 1));
        }
    }
    Err(PingError::malformed("varint is longer than 5 bytes"))
}
