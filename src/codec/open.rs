//! RFC 4271 Section 4.2 OPEN message encode/decode, including the capability
//! optional parameter (RFC 3392/5492) and RFC 9072 extended-length optional
//! parameters.

use crate::codec::ReadUtils;
use crate::error::WireError;
use crate::models::bgp::capabilities::{
    AddPathCapability, BgpCapabilityType, BgpExtendedMessageCapability, BgpRoleCapability,
    ExtendedNextHopCapability, FourOctetAsCapability, GracefulRestartCapability,
    MultiprotocolExtensionsCapability, RouteRefreshCapability,
};
use crate::models::bgp::{BgpOpenMessage, Capability, CapabilityValue, OptParam, ParamValue};
use crate::models::network::Asn;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::net::Ipv4Addr;

const BGP_VERSION: u8 = 4;

/// Non-extended OPEN parameter type used to signal RFC 9072 extended-length parameters.
const EXTENDED_LENGTH_MARKER: u8 = 255;
/// BGP Optional Parameter type for the Capabilities parameter - RFC 3392/5492.
const PARAM_TYPE_CAPABILITY: u8 = 2;

pub fn parse_open(mut body: Bytes) -> Result<BgpOpenMessage, WireError> {
    let version = body.read_u8()?;
    if version != BGP_VERSION {
        return Err(WireError::BadVersion(version));
    }

    let asn_raw = body.read_u16()?;
    let hold_time = body.read_u16()?;
    let sender_ip = Ipv4Addr::from(body.read_u32()?);

    let opt_param_len_byte = body.read_u8()?;
    let (extended_length, total_params_len) = if opt_param_len_byte == EXTENDED_LENGTH_MARKER {
        (true, body.read_u16()? as usize)
    } else {
        (false, opt_param_len_byte as usize)
    };

    let mut params_bytes = body.read_n_bytes(total_params_len)?;
    let opt_params = parse_opt_params(&mut params_bytes, extended_length)?;

    Ok(BgpOpenMessage {
        version,
        asn: Asn::new_16bit(asn_raw),
        hold_time,
        sender_ip,
        extended_length,
        opt_params,
    })
}

fn parse_opt_params(data: &mut Bytes, extended: bool) -> Result<Vec<OptParam>, WireError> {
    let mut params = vec![];

    while data.remaining() > 0 {
        let param_type = data.read_u8()?;
        let param_len = if extended {
            data.read_u16()?
        } else {
            data.read_u8()? as u16
        };
        let value = data.read_n_bytes(param_len as usize)?;

        if param_type == PARAM_TYPE_CAPABILITY {
            params.extend(parse_capabilities(value)?);
        } else {
            return Err(WireError::BadParams(format!(
                "unsupported optional parameter type {param_type}"
            )));
        }
    }

    Ok(params)
}

/// A Capabilities Optional Parameter's value is itself a sequence of capability TLVs
/// (code, length, value); this crate represents each as its own [`OptParam`].
fn parse_capabilities(mut data: Bytes) -> Result<Vec<OptParam>, WireError> {
    let mut params = vec![];

    while data.remaining() > 0 {
        let code = data.read_u8()?;
        let len = data.read_u8()? as usize;
        let cap_data = data.read_n_bytes(len)?;
        let ty = BgpCapabilityType::from(code);
        let value = parse_capability_value(code, cap_data)?;

        params.push(OptParam {
            param_type: PARAM_TYPE_CAPABILITY,
            param_len: (2 + len) as u16,
            param_value: ParamValue::Capability(Capability { ty, value }),
        });
    }

    Ok(params)
}

fn parse_capability_value(code: u8, data: Bytes) -> Result<CapabilityValue, WireError> {
    Ok(match code {
        1 => CapabilityValue::MultiprotocolExtensions(MultiprotocolExtensionsCapability::parse(
            data,
        )?),
        2 => CapabilityValue::RouteRefresh(RouteRefreshCapability::parse(data)?),
        5 => CapabilityValue::ExtendedNextHop(ExtendedNextHopCapability::parse(data)?),
        6 => CapabilityValue::BgpExtendedMessage(BgpExtendedMessageCapability::parse(data)?),
        9 => CapabilityValue::BgpRole(BgpRoleCapability::parse(data)?),
        64 => CapabilityValue::GracefulRestart(GracefulRestartCapability::parse(data)?),
        65 => CapabilityValue::FourOctetAs(FourOctetAsCapability::parse(data)?),
        69 => CapabilityValue::AddPath(AddPathCapability::parse(data)?),
        _ => CapabilityValue::Raw(data.to_vec()),
    })
}

fn encode_capability_value(value: &CapabilityValue) -> Bytes {
    match value {
        CapabilityValue::Raw(bytes) => Bytes::copy_from_slice(bytes),
        CapabilityValue::MultiprotocolExtensions(cap) => cap.encode(),
        CapabilityValue::RouteRefresh(cap) => cap.encode(),
        CapabilityValue::ExtendedNextHop(cap) => cap.encode(),
        CapabilityValue::BgpExtendedMessage(cap) => cap.encode(),
        CapabilityValue::GracefulRestart(cap) => cap.encode(),
        CapabilityValue::FourOctetAs(cap) => cap.encode(),
        CapabilityValue::AddPath(cap) => cap.encode(),
        CapabilityValue::BgpRole(cap) => cap.encode(),
    }
}

pub fn encode_open(msg: &BgpOpenMessage) -> Bytes {
    let mut params_bytes = BytesMut::new();
    for param in &msg.opt_params {
        let value = match &param.param_value {
            ParamValue::Raw(bytes) => Bytes::copy_from_slice(bytes),
            ParamValue::Capability(cap) => {
                let cap_value = encode_capability_value(&cap.value);
                let mut buf = BytesMut::with_capacity(2 + cap_value.len());
                buf.put_u8(u8::from(cap.ty));
                buf.put_u8(cap_value.len() as u8);
                buf.put(cap_value);
                buf.freeze()
            }
        };

        buf_put_param(&mut params_bytes, param.param_type, &value, msg.extended_length);
    }

    let mut bytes = BytesMut::with_capacity(10 + params_bytes.len());
    bytes.put_u8(BGP_VERSION);
    bytes.put_u16(u16::from(msg.asn));
    bytes.put_u16(msg.hold_time);
    bytes.put_u32(u32::from(msg.sender_ip));

    if msg.extended_length {
        bytes.put_u8(EXTENDED_LENGTH_MARKER);
        bytes.put_u16(params_bytes.len() as u16);
    } else {
        bytes.put_u8(params_bytes.len() as u8);
    }
    bytes.put(params_bytes);

    bytes.freeze()
}

fn buf_put_param(out: &mut BytesMut, param_type: u8, value: &Bytes, extended: bool) {
    out.put_u8(param_type);
    if extended {
        out.put_u16(value.len() as u16);
    } else {
        out.put_u8(value.len() as u8);
    }
    out.put_slice(value);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::bgp::capabilities::BgpRole;

    fn sample_open() -> BgpOpenMessage {
        BgpOpenMessage {
            version: BGP_VERSION,
            asn: Asn::new_16bit(65000),
            hold_time: 180,
            sender_ip: Ipv4Addr::new(192, 0, 2, 1),
            extended_length: false,
            opt_params: vec![
                OptParam {
                    param_type: PARAM_TYPE_CAPABILITY,
                    param_len: 6,
                    param_value: ParamValue::Capability(Capability {
                        ty: BgpCapabilityType::MULTIPROTOCOL_EXTENSIONS_FOR_BGP_4,
                        value: CapabilityValue::MultiprotocolExtensions(
                            MultiprotocolExtensionsCapability::new(
                                crate::models::network::Afi::Ipv4,
                                crate::models::network::Safi::Unicast,
                            ),
                        ),
                    }),
                },
                OptParam {
                    param_type: PARAM_TYPE_CAPABILITY,
                    param_len: 6,
                    param_value: ParamValue::Capability(Capability {
                        ty: BgpCapabilityType::SUPPORT_FOR_4_OCTET_AS_NUMBER_CAPABILITY,
                        value: CapabilityValue::FourOctetAs(FourOctetAsCapability::new(70000)),
                    }),
                },
            ],
        }
    }

    #[test]
    fn round_trip_open_message() {
        let open = sample_open();
        let encoded = encode_open(&open);
        let parsed = parse_open(encoded).unwrap();
        assert_eq!(parsed, open);
    }

    #[test]
    fn round_trip_extended_length() {
        let mut open = sample_open();
        open.extended_length = true;
        let encoded = encode_open(&open);
        let parsed = parse_open(encoded).unwrap();
        assert_eq!(parsed, open);
    }

    #[test]
    fn bad_version_rejected() {
        let mut bytes = BytesMut::new();
        bytes.put_u8(5);
        bytes.put_u16(65000);
        bytes.put_u16(180);
        bytes.put_u32(u32::from(Ipv4Addr::new(192, 0, 2, 1)));
        bytes.put_u8(0);
        assert!(matches!(
            parse_open(bytes.freeze()),
            Err(WireError::BadVersion(5))
        ));
    }

    #[test]
    fn bgp_role_capability_decodes() {
        let mut open = sample_open();
        open.opt_params.push(OptParam {
            param_type: PARAM_TYPE_CAPABILITY,
            param_len: 3,
            param_value: ParamValue::Capability(Capability {
                ty: BgpCapabilityType::BGP_ROLE,
                value: CapabilityValue::BgpRole(BgpRoleCapability::new(BgpRole::Customer)),
            }),
        });

        let encoded = encode_open(&open);
        let parsed = parse_open(encoded).unwrap();
        assert_eq!(parsed, open);
    }

    #[test]
    fn non_capability_optional_parameter_is_rejected() {
        let mut bytes = BytesMut::new();
        bytes.put_u8(BGP_VERSION);
        bytes.put_u16(65000);
        bytes.put_u16(180);
        bytes.put_u32(u32::from(Ipv4Addr::new(192, 0, 2, 1)));

        // A single optional parameter of type 1 ("Authentication Information", RFC 1771,
        // long obsolete) carrying one byte of garbage - anything other than type 2
        // (Capabilities) must be rejected, not silently stored.
        bytes.put_u8(3); // total optional parameters length
        bytes.put_u8(1); // param type
        bytes.put_u8(1); // param length
        bytes.put_u8(0xFF); // param value

        assert!(matches!(
            parse_open(bytes.freeze()),
            Err(WireError::BadParams(_))
        ));
    }

    #[test]
    fn unknown_capability_code_preserved_as_raw() {
        let mut open = sample_open();
        open.opt_params.push(OptParam {
            param_type: PARAM_TYPE_CAPABILITY,
            param_len: 4,
            param_value: ParamValue::Capability(Capability {
                ty: BgpCapabilityType::from(200),
                value: CapabilityValue::Raw(vec![0xAA, 0xBB]),
            }),
        });

        let encoded = encode_open(&open);
        let parsed = parse_open(encoded).unwrap();
        assert_eq!(parsed, open);
    }
}
