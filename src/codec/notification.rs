//! RFC 4271 Section 4.5 NOTIFICATION message encode/decode.

use crate::codec::ReadUtils;
use crate::error::WireError;
use crate::models::bgp::{BgpError, BgpNotificationMessage};
use bytes::{BufMut, Bytes, BytesMut};

pub fn parse_notification(mut body: Bytes) -> Result<BgpNotificationMessage, WireError> {
    let code = body.read_u8()?;
    let subcode = body.read_u8()?;
    let error = BgpError::from_code_subcode(code, subcode);
    let data = body.to_vec();
    Ok(BgpNotificationMessage { error, data })
}

pub fn encode_notification(msg: &BgpNotificationMessage) -> Bytes {
    let mut bytes = BytesMut::with_capacity(2 + msg.data.len());
    bytes.put_u8(msg.error.code());
    bytes.put_u8(msg.error.subcode());
    bytes.put_slice(&msg.data);
    bytes.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::bgp::notification::CeaseErrorSubcode;

    #[test]
    fn round_trip_known_error() {
        let msg = BgpNotificationMessage {
            error: BgpError::Cease(CeaseErrorSubcode::AdministrativeShutdown),
            data: vec![],
        };
        let encoded = encode_notification(&msg);
        let parsed = parse_notification(encoded).unwrap();
        assert_eq!(parsed, msg);
    }

    #[test]
    fn round_trip_unknown_subcode_preserves_data() {
        let msg = BgpNotificationMessage {
            error: BgpError::Unknown(6, 200),
            data: vec![0xDE, 0xAD],
        };
        let encoded = encode_notification(&msg);
        let parsed = parse_notification(encoded).unwrap();
        assert_eq!(parsed, msg);
    }

    #[test]
    fn hold_timer_expired_has_no_subcode() {
        let msg = BgpNotificationMessage {
            error: BgpError::HoldTimerExpired,
            data: vec![],
        };
        let encoded = encode_notification(&msg);
        assert_eq!(&encoded[..2], &[4, 0]);
    }
}
