//! Shared message-building helpers for the pipe integration tests.

use bgp_pipe::codec::{header, open, update};
use bgp_pipe::models::bgp::capabilities::{BgpCapabilityType, FourOctetAsCapability, MultiprotocolExtensionsCapability};
use bgp_pipe::models::bgp::{
    Attribute, AttrFlags, AttrType, AttributeValue, BgpMessageType, BgpOpenMessage, BgpUpdateMessage, Capability,
    CapabilityValue, Nlri, OptParam, ParamValue,
};
use bgp_pipe::models::network::{Afi, Asn, NextHopAddress, Safi};
use std::net::Ipv4Addr;

#[allow(dead_code)]
pub fn capability_of(param: &OptParam) -> &Capability {
    match &param.param_value {
        ParamValue::Capability(cap) => cap,
        ParamValue::Raw(_) => panic!("not a capability param"),
    }
}

pub fn keepalive_bytes() -> Vec<u8> {
    header::encode_header(BgpMessageType::KEEPALIVE, 0).to_vec()
}

fn capability_param(ty: BgpCapabilityType, value: CapabilityValue) -> OptParam {
    OptParam {
        param_type: 2,
        param_len: 0,
        param_value: ParamValue::Capability(Capability { ty, value }),
    }
}

pub fn mp_ipv4_unicast() -> OptParam {
    capability_param(
        BgpCapabilityType::MULTIPROTOCOL_EXTENSIONS_FOR_BGP_4,
        CapabilityValue::MultiprotocolExtensions(MultiprotocolExtensionsCapability::new(Afi::Ipv4, Safi::Unicast)),
    )
}

pub fn mp_ipv6_unicast() -> OptParam {
    capability_param(
        BgpCapabilityType::MULTIPROTOCOL_EXTENSIONS_FOR_BGP_4,
        CapabilityValue::MultiprotocolExtensions(MultiprotocolExtensionsCapability::new(Afi::Ipv6, Safi::Unicast)),
    )
}

pub fn as4(asn: u32) -> OptParam {
    capability_param(
        BgpCapabilityType::SUPPORT_FOR_4_OCTET_AS_NUMBER_CAPABILITY,
        CapabilityValue::FourOctetAs(FourOctetAsCapability::new(asn)),
    )
}

/// Builds a framed OPEN message's wire bytes.
pub fn open_bytes(asn: u16, hold_time: u16, id: Ipv4Addr, opt_params: Vec<OptParam>) -> Vec<u8> {
    let msg = BgpOpenMessage {
        version: 4,
        asn: Asn::new_16bit(asn),
        hold_time,
        sender_ip: id,
        extended_length: false,
        opt_params,
    };
    let body = open::encode_open(&msg);
    let mut bytes = header::encode_header(BgpMessageType::OPEN, body.len()).to_vec();
    bytes.extend_from_slice(&body);
    bytes
}

/// A plain, empty IPv4/unicast UPDATE - the legacy End-of-RIB marker.
pub fn legacy_eor_bytes() -> Vec<u8> {
    let msg = BgpUpdateMessage::default();
    let opts = update::UpdateCodecOptions::default();
    let body = update::encode_update(&msg, &opts);
    let mut bytes = header::encode_header(BgpMessageType::UPDATE, body.len()).to_vec();
    bytes.extend_from_slice(&body);
    bytes
}

/// An UPDATE whose only attribute is MP_REACH_NLRI for the given AFI/SAFI/next-hop/prefix.
pub fn mp_reach_update_bytes(next_hop: NextHopAddress, prefix: &str) -> Vec<u8> {
    let nlri = Nlri {
        afi: Afi::Ipv6,
        safi: Safi::Unicast,
        next_hop: Some(next_hop),
        prefixes: vec![prefix.parse().unwrap()],
    };
    let msg = BgpUpdateMessage {
        withdrawn_prefixes: vec![],
        attributes: vec![Attribute {
            attr_type: AttrType::MP_REACHABLE_NLRI,
            value: AttributeValue::MpReachNlri(nlri),
            flag: AttrFlags::OPTIONAL,
        }]
        .into(),
        announced_prefixes: vec![],
        ..Default::default()
    };
    let opts = update::UpdateCodecOptions::default();
    let body = update::encode_update(&msg, &opts);
    let mut bytes = header::encode_header(BgpMessageType::UPDATE, body.len()).to_vec();
    bytes.extend_from_slice(&body);
    bytes
}

/// An UPDATE carrying both a legacy IPv4/unicast NLRI prefix and an MP_REACH_NLRI for IPv6,
/// so `BgpUpdateMessage::all_reach` has to concatenate across the two.
pub fn mixed_reach_update_bytes(v4_prefix: &str, next_hop: NextHopAddress, v6_prefix: &str) -> Vec<u8> {
    let nlri = Nlri {
        afi: Afi::Ipv6,
        safi: Safi::Unicast,
        next_hop: Some(next_hop),
        prefixes: vec![v6_prefix.parse().unwrap()],
    };
    let msg = BgpUpdateMessage {
        withdrawn_prefixes: vec![],
        attributes: vec![Attribute {
            attr_type: AttrType::MP_REACHABLE_NLRI,
            value: AttributeValue::MpReachNlri(nlri),
            flag: AttrFlags::OPTIONAL,
        }]
        .into(),
        announced_prefixes: vec![v4_prefix.parse().unwrap()],
        ..Default::default()
    };
    let opts = update::UpdateCodecOptions::default();
    let body = update::encode_update(&msg, &opts);
    let mut bytes = header::encode_header(BgpMessageType::UPDATE, body.len()).to_vec();
    bytes.extend_from_slice(&body);
    bytes
}

/// An UPDATE whose only attribute is a zero-length MP_UNREACH_NLRI for AFI=2/SAFI=1 - the
/// RFC 4760 End-of-RIB marker for IPv6 unicast.
pub fn mp_unreach_eor_bytes() -> Vec<u8> {
    let nlri = Nlri {
        afi: Afi::Ipv6,
        safi: Safi::Unicast,
        next_hop: None,
        prefixes: vec![],
    };
    let msg = BgpUpdateMessage {
        withdrawn_prefixes: vec![],
        attributes: vec![Attribute {
            attr_type: AttrType::MP_UNREACHABLE_NLRI,
            value: AttributeValue::MpUnreachNlri(nlri),
            flag: AttrFlags::OPTIONAL,
        }]
        .into(),
        announced_prefixes: vec![],
        ..Default::default()
    };
    let opts = update::UpdateCodecOptions::default();
    let body = update::encode_update(&msg, &opts);
    let mut bytes = header::encode_header(BgpMessageType::UPDATE, body.len()).to_vec();
    bytes.extend_from_slice(&body);
    bytes
}
