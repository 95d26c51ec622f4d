//! RFC 2918 ROUTE-REFRESH message encode/decode: a bare (AFI, SAFI) pair.

use crate::codec::ReadUtils;
use crate::error::WireError;
use crate::models::bgp::BgpRouteRefreshMessage;
use crate::models::network::Safi;
use bytes::{Buf, BufMut, Bytes, BytesMut};

pub fn parse_refresh(mut body: Bytes) -> Result<BgpRouteRefreshMessage, WireError> {
    let afi = body.read_afi()?;
    body.read_u8()?; // reserved
    let safi = Safi::from(body.read_u8()?);
    Ok(BgpRouteRefreshMessage { afi, safi })
}

pub fn encode_refresh(msg: &BgpRouteRefreshMessage) -> Bytes {
    let mut bytes = BytesMut::with_capacity(4);
    bytes.put_u16(u16::from(msg.afi));
    bytes.put_u8(0);
    bytes.put_u8(u8::from(msg.safi));
    bytes.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::network::Afi;

    #[test]
    fn round_trip() {
        let msg = BgpRouteRefreshMessage {
            afi: Afi::Ipv6,
            safi: Safi::Unicast,
        };
        let encoded = encode_refresh(&msg);
        assert_eq!(encoded.len(), 4);
        let parsed = parse_refresh(encoded).unwrap();
        assert_eq!(parsed, msg);
    }
}
