//! RFC 4271 Section 4.1 message header framing: a 16-byte all-ones marker, a
//! 16-bit total length, and a 1-byte type.

use crate::error::WireError;
use crate::models::bgp::BgpMessageType;
use bytes::{BufMut, Bytes, BytesMut};

pub const MARKER_LEN: usize = 16;
pub const HEADER_LEN: usize = 19;
pub const MAX_LENGTH: usize = 4096;
pub const MAX_LENGTH_EXTENDED: usize = 65535;

const MARKER: [u8; MARKER_LEN] = [0xff; MARKER_LEN];

/// One complete framed message pulled off the front of a byte buffer.
pub struct Framed {
    pub msg_type: BgpMessageType,
    /// The message body, i.e. everything after the 19-byte header.
    pub body: Bytes,
    /// Total bytes consumed from the input, header included.
    pub consumed: usize,
}

/// Attempts to pull one complete message off the front of `buf`.
///
/// Returns `WireError::ShortRead` when fewer than 19 bytes are available or the declared
/// length exceeds the buffer -- the caller should keep buffering and retry. `max_len` should
/// be [`MAX_LENGTH_EXTENDED`] once Extended Message (RFC 8654) has been negotiated by both
/// sides of the session, [`MAX_LENGTH`] otherwise.
pub fn try_unframe(buf: &[u8], max_len: usize) -> Result<Framed, WireError> {
    if buf.len() < HEADER_LEN {
        return Err(WireError::ShortRead {
            expected: HEADER_LEN,
            available: buf.len(),
        });
    }

    if buf[..MARKER_LEN] != MARKER {
        return Err(WireError::BadMarker);
    }

    let length = u16::from_be_bytes([buf[16], buf[17]]);
    if (length as usize) < HEADER_LEN {
        return Err(WireError::BadLength(length));
    }
    if length as usize > max_len {
        return Err(WireError::BadLength(length));
    }

    if buf.len() < length as usize {
        return Err(WireError::ShortRead {
            expected: length as usize,
            available: buf.len(),
        });
    }

    let msg_type = BgpMessageType::try_from(buf[18])
        .map_err(|_| WireError::BadValue(format!("unknown BGP message type {}", buf[18])))?;

    if msg_type == BgpMessageType::KEEPALIVE && length as usize != HEADER_LEN {
        return Err(WireError::BadLength(length));
    }

    let body = Bytes::copy_from_slice(&buf[HEADER_LEN..length as usize]);
    Ok(Framed {
        msg_type,
        body,
        consumed: length as usize,
    })
}

/// Writes the 19-byte header for a message whose body is `body_len` bytes long.
pub fn encode_header(msg_type: BgpMessageType, body_len: usize) -> BytesMut {
    let mut buf = BytesMut::with_capacity(HEADER_LEN);
    buf.put_slice(&MARKER);
    buf.put_u16((HEADER_LEN + body_len) as u16);
    buf.put_u8(msg_type.into());
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keepalive_bytes() -> Vec<u8> {
        let mut header = encode_header(BgpMessageType::KEEPALIVE, 0);
        header.to_vec()
    }

    #[test]
    fn short_read_below_header_len() {
        let partial = [0xffu8; 2];
        match try_unframe(&partial, MAX_LENGTH) {
            Err(WireError::ShortRead { expected, available }) => {
                assert_eq!(expected, HEADER_LEN);
                assert_eq!(available, 2);
            }
            other => panic!("expected ShortRead, got {other:?}"),
        }
    }

    #[test]
    fn short_read_below_declared_length() {
        let mut header = encode_header(BgpMessageType::UPDATE, 10).to_vec();
        header.truncate(HEADER_LEN);
        match try_unframe(&header, MAX_LENGTH) {
            Err(WireError::ShortRead { expected, .. }) => assert_eq!(expected, HEADER_LEN + 10),
            other => panic!("expected ShortRead, got {other:?}"),
        }
    }

    #[test]
    fn bad_marker_rejected() {
        let mut bytes = keepalive_bytes();
        bytes[0] = 0x00;
        assert!(matches!(
            try_unframe(&bytes, MAX_LENGTH),
            Err(WireError::BadMarker)
        ));
    }

    #[test]
    fn bad_length_rejected() {
        let mut bytes = keepalive_bytes();
        bytes[16] = 0;
        bytes[17] = 5;
        assert!(matches!(
            try_unframe(&bytes, MAX_LENGTH),
            Err(WireError::BadLength(5))
        ));
    }

    #[test]
    fn keepalive_roundtrip() {
        let bytes = keepalive_bytes();
        let framed = try_unframe(&bytes, MAX_LENGTH).unwrap();
        assert_eq!(framed.msg_type, BgpMessageType::KEEPALIVE);
        assert!(framed.body.is_empty());
        assert_eq!(framed.consumed, HEADER_LEN);
    }

    #[test]
    fn keepalive_with_trailing_bytes_leaves_tail() {
        let mut bytes = keepalive_bytes();
        bytes.extend_from_slice(&[0xAA, 0xBB]);
        let framed = try_unframe(&bytes, MAX_LENGTH).unwrap();
        assert_eq!(framed.consumed, HEADER_LEN);
        assert_eq!(&bytes[framed.consumed..], &[0xAA, 0xBB]);
    }

    #[test]
    fn extended_max_length_allows_large_update() {
        let header = encode_header(BgpMessageType::UPDATE, 60000);
        let mut bytes = header.to_vec();
        bytes.resize(HEADER_LEN + 60000, 0);
        assert!(try_unframe(&bytes, MAX_LENGTH).is_err());
        let framed = try_unframe(&bytes, MAX_LENGTH_EXTENDED).unwrap();
        assert_eq!(framed.body.len(), 60000);
    }
}
