//! Length-prefixed packet framing.
//!
//! A packet on the wire is `varint(length) ++ varint(id) ++ payload`, where
//! `length` counts the id and payload bytes.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::{PingError, varint};

/// The largest packet length accepted from a peer.
///
/// This is the most a three-byte length varint can declare, which is also the
/// limit vanilla servers enforce.
pub const MAX_PACKET_LEN: u32 = 2_097_151;

/// A single decoded packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub id: u32,
    pub payload: Vec<u8>,
}

/// Builds the complete on-wire frame for a packet.
///
/// # Errors
/// [`PingError::MalformedData`] if the packet would not fit in a length varint.
pub fn frame(id: u32, payload: &[u8]) -> Result<Vec<u8>, PingError> {
    let body_len = varint::encoded_len(id) + payload.len();
    let declared = u32::try_from(body_len)
        .map_err(|_| PingError::malformed(format!("{body_len} byte packet is too large")))?;
    let mut buf = Vec::with_capacity(varint::MAX_LEN + body_len);
    varint::write(&mut buf, declared);
    varint::write(&mut buf, id);
    buf.extend_from_slice(payload);
    Ok(buf)
}

/// Appends a length-prefixed UTF-8 string, the protocol's `String` type.
///
/// # Errors
/// [`PingError::MalformedData`] if the string is longer than a varint can describe.
pub fn write_string(buf: &mut Vec<u8>, value: &str) -> Result<(), PingError> {
    let len = u32::try_from(value.len())
        .map_err(|_| PingError::malformed("string is too long to encode"))?;
    varint::write(buf, len);
    buf.extend_from_slice(value.as_bytes());
    Ok(())
}

/// Sends one packet with a single write.
///
/// # Errors
/// [`PingError::ConnectionFailed`] if the transport rejects the write.
pub async fn write_packet<W: AsyncWrite + Unpin>(
    writer: &mut W,
    id: u32,
    payload: &[u8],
) -> Result<(), PingError> {
    let frame = frame(id, payload)?;
    trace!(id, len = frame.len(), "writing packet");
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads one packet.
///
/// When `has_string_prefix` is set the payload is a protocol string: the
/// returned payload holds only the string's bytes, and anything the packet
/// carries after the string is consumed and discarded.
///
/// # Errors
/// [`PingError::MalformedData`] on framing violations, including a stream that
/// closes partway through a packet. A stream that closes before the packet's
/// first byte, and any other transport failure, is
/// [`PingError::ConnectionFailed`].
pub async fn read_packet<R: AsyncRead + Unpin>(
    reader: &mut R,
    has_string_prefix: bool,
) -> Result<Packet, PingError> {
    let first = reader.read_u8().await?;
    let (length, _) = varint::read_continued(first, reader).await?;
    if length > MAX_PACKET_LEN {
        return Err(PingError::malformed(format!(
            "declared packet length {length} exceeds {MAX_PACKET_LEN}"
        )));
    }
    let (id, id_len) = varint::read_counted(reader).await?;
    let mut remaining = usize_of(length)
        .checked_sub(id_len)
        .ok_or_else(|| PingError::malformed("packet length is shorter than its id"))?;
    trace!(id, length, "reading packet");

    if !has_string_prefix {
        let payload = read_exact(reader, remaining).await?;
        return Ok(Packet { id, payload });
    }

    let (string_len, string_len_len) = varint::read_counted(reader).await?;
    remaining = remaining
        .checked_sub(string_len_len)
        .and_then(|rest| rest.checked_sub(usize_of(string_len)))
        .ok_or_else(|| {
            PingError::malformed(format!(
                "string of {string_len} bytes does not fit in a {length} byte packet"
            ))
        })?;
    let payload = read_exact(reader, usize_of(string_len)).await?;
    if remaining > 0 {
        debug!(id, remaining, "discarding trailing packet bytes");
        skip(reader, remaining).await?;
    }
    Ok(Packet { id, payload })
}

async fn read_exact<R: AsyncRead + Unpin>(reader: &mut R, len: usize) -> Result<Vec<u8>, PingError> {
    let mut buf = vec![0; len];
    reader.read_exact(&mut buf).await.map_err(PingError::from_read)?;
    Ok(buf)
}

async fn skip<R: AsyncRead + Unpin>(reader: &mut R, len: usize) -> Result<(), PingError> {
    let mut limited = reader.take(len as u64);
    let skipped = tokio::io::copy(&mut limited, &mut tokio::io::sink())
        .await
        .map_err(PingError::from_read)?;
    if skipped < len as u64 {
        return Err(PingError::malformed("stream closed before the packet was complete"));
    }
    Ok(())
}

// lengths are capped at MAX_PACKET_LEN before they reach here
const fn usize_of(value: u32) -> usize {
    value as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn encode_then_read(id: u32, payload: &[u8], has_string_prefix: bool) -> Packet {
        let mut wire = Vec::new();
        write_packet(&mut wire, id, payload).await.unwrap();
        let mut reader = wire.as_slice();
        let packet = read_packet(&mut reader, has_string_prefix).await.unwrap();
        assert!(reader.is_empty(), "packet was not fully consumed");
        packet
    }

    #[test]
    fn declared_length_covers_id_and_payload() {
        let wire = frame(0x01, &[1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
        assert_eq!(wire[0], 9);
        assert_eq!(wire[1], 0x01);
        assert_eq!(&wire[2..], [1, 2, 3, 4, 5, 6, 7, 8]);

        let empty = frame(0x00, &[]).unwrap();
        assert_eq!(empty, [0x01, 0x00]);
    }

    #[test]
    fn long_payload_uses_multibyte_length() {
        let payload = vec![0xaa; 200];
        let wire = frame(0x00, &payload).unwrap();
        assert_eq!(&wire[..3], [0xc9, 0x01, 0x00]);
        assert_eq!(wire.len(), 3 + 200);
    }

    #[tokio::test]
    async fn raw_payloads_survive_framing() {
        let payloads: [&[u8]; 4] = [&[], &[0x00], &[0x80, 0xff, 0x7f, 0x01], &[0x55; 300]];
        for id in 0..=0x7f {
            for payload in payloads {
                let packet = encode_then_read(id, payload, false).await;
                assert_eq!(packet, Packet { id, payload: payload.to_vec() });
            }
        }
    }

    #[tokio::test]
    async fn string_payload_is_unwrapped() {
        let mut payload = Vec::new();
        write_string(&mut payload, r#"{"version":{"name":"1.21"}}"#).unwrap();
        let packet = encode_then_read(0x00, &payload, true).await;
        assert_eq!(packet.payload, br#"{"version":{"name":"1.21"}}"#);
    }

    #[tokio::test]
    async fn trailing_bytes_after_string_are_discarded() {
        let mut payload = Vec::new();
        write_string(&mut payload, "abc").unwrap();
        payload.extend_from_slice(&[9, 9]);
        let mut wire = frame(0x00, &payload).unwrap();
        wire.push(0x42);
        let mut reader = wire.as_slice();
        let packet = read_packet(&mut reader, true).await.unwrap();
        assert_eq!(packet.payload, b"abc");
        assert_eq!(reader, [0x42]);
    }

    #[tokio::test]
    async fn non_minimal_varints_keep_framing_aligned() {
        // id 1 sent as two bytes, then the first byte of the next packet
        let mut wire = vec![10, 0x81, 0x00];
        wire.extend(1..=8);
        wire.push(0x42);
        let mut reader = wire.as_slice();
        let packet = read_packet(&mut reader, false).await.unwrap();
        assert_eq!(packet, Packet { id: 1, payload: (1..=8).collect() });
        assert_eq!(reader, [0x42]);

        // padded string length inside a status packet
        let mut wire = vec![6, 0x00, 0x83, 0x00];
        wire.extend_from_slice(b"abc");
        wire.push(0x42);
        let mut reader = wire.as_slice();
        let packet = read_packet(&mut reader, true).await.unwrap();
        assert_eq!(packet.payload, b"abc");
        assert_eq!(reader, [0x42]);
    }

    #[tokio::test]
    async fn string_longer_than_packet_is_malformed() {
        // length 3: id, string length 10, one byte
        let wire = [0x03, 0x00, 0x0a, b'x'];
        let err = read_packet(&mut &wire[..], true).await.unwrap_err();
        assert!(matches!(err, PingError::MalformedData(_)));
    }

    #[tokio::test]
    async fn close_between_packets_is_connection_failure() {
        let err = read_packet(&mut &b""[..], false).await.unwrap_err();
        assert!(matches!(err, PingError::ConnectionFailed(_)));
    }

    #[tokio::test]
    async fn early_close_is_malformed() {
        let wire = [0x64, 0x00, 0x01, 0x02];
        let err = read_packet(&mut &wire[..], false).await.unwrap_err();
        assert!(matches!(err, PingError::MalformedData(_)));
    }

    #[tokio::test]
    async fn oversized_length_is_rejected() {
        let mut wire = varint::encode(MAX_PACKET_LEN + 1);
        wire.push(0x00);
        let err = read_packet(&mut wire.as_slice(), false).await.unwrap_err();
        assert!(matches!(err, PingError::MalformedData(_)));
    }

    #[tokio::test]
    async fn length_shorter_than_id_is_rejected() {
        let wire = [0x00, 0x00];
        let err = read_packet(&mut &wire[..], false).await.unwrap_err();
        assert!(matches!(err, PingError::MalformedData(_)));
    }
}
