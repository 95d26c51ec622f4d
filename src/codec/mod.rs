//! The BGP wire codec: framing, OPEN/UPDATE/NOTIFICATION/KEEPALIVE/ROUTE-REFRESH
//! encode and decode.

pub mod header;
pub mod notification;
pub mod open;
pub mod refresh;
pub mod update;

use crate::error::WireError;
use crate::models::bgp::{BgpMessage, BgpMessageType};
use crate::models::network::Afi;
use bytes::{Buf, BufMut, Bytes};

/// Fallible, short-read-aware reads off a [`Bytes`] cursor, mirroring the panicking
/// `bytes::Buf` accessors but returning [`WireError::ShortRead`] instead of aborting
/// when a peer sends a truncated message.
pub trait ReadUtils: Buf {
    fn require(&self, n: usize) -> Result<(), WireError> {
        if self.remaining() < n {
            Err(WireError::ShortRead {
                expected: n,
                available: self.remaining(),
            })
        } else {
            Ok(())
        }
    }

    fn read_u8(&mut self) -> Result<u8, WireError> {
        self.require(1)?;
        Ok(self.get_u8())
    }

    fn read_u16(&mut self) -> Result<u16, WireError> {
        self.require(2)?;
        Ok(self.get_u16())
    }

    fn read_u32(&mut self) -> Result<u32, WireError> {
        self.require(4)?;
        Ok(self.get_u32())
    }

    fn read_afi(&mut self) -> Result<Afi, WireError> {
        Ok(Afi::from(self.read_u16()?))
    }

    fn read_ipv4(&mut self) -> Result<std::net::Ipv4Addr, WireError> {
        self.require(4)?;
        Ok(std::net::Ipv4Addr::from(self.get_u32()))
    }

    fn read_ipv6(&mut self) -> Result<std::net::Ipv6Addr, WireError> {
        self.require(16)?;
        Ok(std::net::Ipv6Addr::from(self.get_u128()))
    }

    fn read_n_bytes(&mut self, n: usize) -> Result<Bytes, WireError>
    where
        Self: Sized,
    {
        self.require(n)?;
        Ok(self.copy_to_bytes(n))
    }
}

impl<T: Buf + ?Sized> ReadUtils for T {}

/// Decodes a message body once the header has already identified its type, dispatching to the
/// per-type codec. `opts` carries the session-negotiated four-octet-AS and ADD-PATH settings
/// UPDATE decoding needs.
pub fn decode_body(
    msg_type: BgpMessageType,
    body: Bytes,
    opts: &update::UpdateCodecOptions,
) -> Result<BgpMessage, WireError> {
    match msg_type {
        BgpMessageType::OPEN => open::parse_open(body).map(BgpMessage::Open),
        BgpMessageType::UPDATE => update::parse_update(body, opts).map(BgpMessage::Update),
        BgpMessageType::NOTIFICATION => {
            notification::parse_notification(body).map(BgpMessage::Notification)
        }
        BgpMessageType::KEEPALIVE => Ok(BgpMessage::KeepAlive),
        BgpMessageType::ROUTE_REFRESH => refresh::parse_refresh(body).map(BgpMessage::RouteRefresh),
    }
}

fn encode_body(msg: &BgpMessage, opts: &update::UpdateCodecOptions) -> Bytes {
    match msg {
        BgpMessage::Open(m) => open::encode_open(m),
        BgpMessage::Update(m) => update::encode_update(m, opts),
        BgpMessage::Notification(m) => notification::encode_notification(m),
        BgpMessage::KeepAlive => Bytes::new(),
        BgpMessage::RouteRefresh(m) => refresh::encode_refresh(m),
    }
}

/// Encodes a full, framed BGP message: header plus body.
pub fn encode_message(msg: &BgpMessage, opts: &update::UpdateCodecOptions) -> Bytes {
    let body = encode_body(msg, opts);
    let mut buf = header::encode_header(msg.msg_type(), body.len());
    buf.put(body);
    buf.freeze()
}
