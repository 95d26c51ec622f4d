//! RFC 4271 Section 4.3 UPDATE message encode/decode: withdrawn routes, path
//! attributes, and NLRI.
//!
//! Attribute decoding surfaces malformed optional attributes as [`WireError`]
//! rather than silently dropping them; RFC 7606's treat-as-withdraw policy is
//! applied by the caller, which maps a decode failure to a withdrawal instead
//! of tearing down the session.

use crate::codec::ReadUtils;
use crate::error::WireError;
use crate::models::bgp::attributes::{
    AttrFlags, AttrRaw, AttrType, Attribute, AttributeValue, AtomicAggregate, Nlri, Origin,
};
use crate::models::bgp::community::{
    Community, ExtendedCommunity, ExtendedCommunityType, FourOctetAsExtCommunity,
    Ipv4AddrExtCommunity, LargeCommunity, OpaqueExtCommunity, TwoOctetAsExtCommunity,
};
use crate::models::bgp::BgpUpdateMessage;
use crate::models::network::{Afi, Asn, AsnLength, NetworkPrefix, NextHopAddress, Safi};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use ipnet::{IpNet, Ipv4Net, Ipv6Net};
use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Per-session negotiated state that changes how an UPDATE's bytes are read.
#[derive(Debug, Clone, Copy)]
pub struct UpdateCodecOptions {
    /// Whether AS_PATH/AGGREGATOR ASNs are 4 bytes (AS4 capability negotiated by both sides).
    pub asn_len: AsnLength,
    /// Whether the IPv4 unicast withdrawn/announced NLRI carries a 4-byte Path Identifier
    /// (RFC 7911 ADD-PATH, negotiated for AFI=1/SAFI=1).
    pub add_path: bool,
}

impl Default for UpdateCodecOptions {
    fn default() -> Self {
        UpdateCodecOptions {
            asn_len: AsnLength::Bits16,
            add_path: false,
        }
    }
}

/// Well-known attributes RFC 4271 Section 5 defines as singletons: a second occurrence in
/// the same UPDATE is malformed.
fn is_singleton(attr_type: u8) -> bool {
    matches!(attr_type, 1..=9 | 14 | 15 | 17 | 18 | 35)
}

pub fn parse_update(
    mut body: Bytes,
    opts: &UpdateCodecOptions,
) -> Result<BgpUpdateMessage, WireError> {
    let withdrawn_len = body.read_u16()? as usize;
    let mut withdrawn_bytes = body.read_n_bytes(withdrawn_len)?;
    let withdrawn_prefixes = parse_nlri_prefixes(&mut withdrawn_bytes, Afi::Ipv4, opts.add_path)?;

    let attr_len = body.read_u16()? as usize;
    let mut attr_bytes = body.read_n_bytes(attr_len)?;
    let attributes = parse_attributes(&mut attr_bytes, opts.asn_len)?;

    let announced_prefixes = parse_nlri_prefixes(&mut body, Afi::Ipv4, opts.add_path)?;

    Ok(BgpUpdateMessage {
        withdrawn_prefixes,
        attributes: attributes.into(),
        announced_prefixes,
        ..Default::default()
    })
}

pub fn encode_update(msg: &BgpUpdateMessage, opts: &UpdateCodecOptions) -> Bytes {
    let mut withdrawn_bytes = BytesMut::new();
    for prefix in &msg.withdrawn_prefixes {
        withdrawn_bytes.put(prefix.encode());
    }

    let mut attr_bytes = BytesMut::new();
    for attr in msg.attributes.iter() {
        attr_bytes.put(encode_attribute(attr, opts.asn_len));
    }

    let mut announced_bytes = BytesMut::new();
    for prefix in &msg.announced_prefixes {
        announced_bytes.put(prefix.encode());
    }

    let mut bytes = BytesMut::with_capacity(
        4 + withdrawn_bytes.len() + attr_bytes.len() + announced_bytes.len(),
    );
    bytes.put_u16(withdrawn_bytes.len() as u16);
    bytes.put(withdrawn_bytes);
    bytes.put_u16(attr_bytes.len() as u16);
    bytes.put(attr_bytes);
    bytes.put(announced_bytes);
    bytes.freeze()
}

/// Parses a run of `<length, prefix>` NLRI entries filling the rest of `data`, per RFC 4271
/// Section 4.3 (IPv4 withdrawn/NLRI) and RFC 4760 (the same shape inside MP_REACH/MP_UNREACH).
/// `add_path` reads a leading 4-byte Path Identifier (RFC 7911) ahead of each entry.
pub fn parse_nlri_prefixes(
    data: &mut Bytes,
    afi: Afi,
    add_path: bool,
) -> Result<Vec<NetworkPrefix>, WireError> {
    let mut prefixes = vec![];

    while data.remaining() > 0 {
        let path_id = if add_path {
            Some(data.read_u32()?)
        } else {
            None
        };

        let bit_len = data.read_u8()?;
        let byte_len = (bit_len as usize).div_ceil(8);
        let raw = data.read_n_bytes(byte_len)?;
        let prefix = build_prefix(afi, bit_len, &raw)?;

        prefixes.push(NetworkPrefix::new(prefix, path_id));
    }

    Ok(prefixes)
}

fn build_prefix(afi: Afi, bit_len: u8, raw: &[u8]) -> Result<IpNet, WireError> {
    match afi {
        Afi::Ipv4 => {
            if bit_len > 32 || raw.len() > 4 {
                return Err(WireError::BadValue(format!(
                    "IPv4 prefix length {bit_len} out of range"
                )));
            }
            let mut octets = [0u8; 4];
            octets[..raw.len()].copy_from_slice(raw);
            let net = Ipv4Net::new(Ipv4Addr::from(octets), bit_len)
                .map_err(|e| WireError::BadValue(e.to_string()))?;
            Ok(IpNet::V4(net))
        }
        Afi::Ipv6 => {
            if bit_len > 128 || raw.len() > 16 {
                return Err(WireError::BadValue(format!(
                    "IPv6 prefix length {bit_len} out of range"
                )));
            }
            let mut octets = [0u8; 16];
            octets[..raw.len()].copy_from_slice(raw);
            let net = Ipv6Net::new(Ipv6Addr::from(octets), bit_len)
                .map_err(|e| WireError::BadValue(e.to_string()))?;
            Ok(IpNet::V6(net))
        }
        Afi::Unknown(afi) => Err(WireError::BadAddressFamily { afi, safi: 0 }),
    }
}

fn encode_nlri_prefix(prefix: &NetworkPrefix) -> Bytes {
    prefix.encode()
}

fn parse_attributes(data: &mut Bytes, asn_len: AsnLength) -> Result<Vec<Attribute>, WireError> {
    let mut attrs = vec![];
    let mut seen = HashSet::new();

    while data.remaining() > 0 {
        let flags = AttrFlags::from_bits_truncate(data.read_u8()?);
        let type_byte = data.read_u8()?;
        let length = if flags.contains(AttrFlags::EXTENDED) {
            data.read_u16()? as usize
        } else {
            data.read_u8()? as usize
        };
        let value_bytes = data.read_n_bytes(length)?;

        if is_singleton(type_byte) && !seen.insert(type_byte) {
            return Err(WireError::DupAttr(format!(
                "attribute type {type_byte} appeared more than once"
            )));
        }

        let attr_type = AttrType::from(type_byte);
        let value = parse_attribute_value(attr_type, value_bytes, asn_len, flags)?;
        attrs.push(Attribute {
            attr_type,
            value,
            flag: flags,
        });
    }

    Ok(attrs)
}

fn parse_attribute_value(
    attr_type: AttrType,
    mut data: Bytes,
    asn_len: AsnLength,
    flags: AttrFlags,
) -> Result<AttributeValue, WireError> {
    use crate::models::bgp::AsPath;

    Ok(match attr_type {
        AttrType::ORIGIN => {
            if data.len() != 1 {
                return Err(WireError::BadAttrs(format!(
                    "ORIGIN length {} is not 1",
                    data.len()
                )));
            }
            let value = data.read_u8()?;
            let origin = Origin::try_from(value)
                .map_err(|_| WireError::BadAttrs(format!("unknown ORIGIN value {value}")))?;
            AttributeValue::Origin(origin)
        }
        AttrType::AS_PATH => AttributeValue::AsPath(AsPath::parse(&mut data, asn_len)?),
        AttrType::AS4_PATH => {
            AttributeValue::As4Path(AsPath::parse(&mut data, AsnLength::Bits32)?)
        }
        AttrType::NEXT_HOP => {
            if data.len() != 4 {
                return Err(WireError::BadAttrs(format!(
                    "NEXT_HOP length {} is not 4",
                    data.len()
                )));
            }
            AttributeValue::NextHop(IpAddr::V4(data.read_ipv4()?))
        }
        AttrType::MULTI_EXIT_DISCRIMINATOR => {
            AttributeValue::MultiExitDiscriminator(data.read_u32()?)
        }
        AttrType::LOCAL_PREFERENCE => AttributeValue::LocalPreference(data.read_u32()?),
        AttrType::ONLY_TO_CUSTOMER => AttributeValue::OnlyToCustomer(data.read_u32()?),
        AttrType::ATOMIC_AGGREGATE => {
            if !data.is_empty() {
                return Err(WireError::BadAttrs(
                    "ATOMIC_AGGREGATE carries a non-empty value".to_string(),
                ));
            }
            AttributeValue::AtomicAggregate(AtomicAggregate::AG)
        }
        AttrType::AGGREGATOR => {
            let (asn, ip) = parse_aggregator(&mut data, asn_len)?;
            AttributeValue::Aggregator(asn, ip)
        }
        AttrType::AS4_AGGREGATOR => {
            let (asn, ip) = parse_aggregator(&mut data, AsnLength::Bits32)?;
            AttributeValue::As4Aggregator(asn, ip)
        }
        AttrType::COMMUNITIES => {
            if !data.len().is_multiple_of(4) {
                return Err(WireError::BadAttrs(format!(
                    "COMMUNITIES length {} is not a multiple of 4",
                    data.len()
                )));
            }
            let mut communities = vec![];
            while data.remaining() > 0 {
                communities.push(parse_community(data.read_u32()?));
            }
            AttributeValue::Communities(communities)
        }
        AttrType::EXTENDED_COMMUNITIES => {
            if !data.len().is_multiple_of(8) {
                return Err(WireError::BadAttrs(format!(
                    "EXTENDED_COMMUNITIES length {} is not a multiple of 8",
                    data.len()
                )));
            }
            let mut communities = vec![];
            while data.remaining() > 0 {
                let raw = data.read_n_bytes(8)?;
                communities.push(parse_extended_community(&raw));
            }
            AttributeValue::ExtendedCommunities(communities)
        }
        AttrType::LARGE_COMMUNITIES => {
            if !data.len().is_multiple_of(12) {
                return Err(WireError::BadAttrs(format!(
                    "LARGE_COMMUNITIES length {} is not a multiple of 12",
                    data.len()
                )));
            }
            let mut communities = vec![];
            while data.remaining() > 0 {
                let global_admin = data.read_u32()?;
                let l1 = data.read_u32()?;
                let l2 = data.read_u32()?;
                communities.push(LargeCommunity::new(global_admin, [l1, l2]));
            }
            AttributeValue::LargeCommunities(communities)
        }
        AttrType::ORIGINATOR_ID => AttributeValue::OriginatorId(IpAddr::V4(data.read_ipv4()?)),
        AttrType::CLUSTER_LIST => {
            if !data.len().is_multiple_of(4) {
                return Err(WireError::BadAttrs(format!(
                    "CLUSTER_LIST length {} is not a multiple of 4",
                    data.len()
                )));
            }
            let mut clusters = vec![];
            while data.remaining() > 0 {
                clusters.push(IpAddr::V4(data.read_ipv4()?));
            }
            AttributeValue::Clusters(clusters)
        }
        AttrType::MP_REACHABLE_NLRI => AttributeValue::MpReachNlri(parse_mp_reach(data)?),
        AttrType::MP_UNREACHABLE_NLRI => AttributeValue::MpUnreachNlri(parse_mp_unreach(data)?),
        AttrType::DEVELOPMENT => AttributeValue::Development(data.to_vec()),
        _ if get_deprecated(u8::from(attr_type)) => {
            AttributeValue::Deprecated(AttrRaw {
                attr_type,
                bytes: data.to_vec(),
            })
        }
        _ => {
            let _ = flags;
            AttributeValue::Unknown(AttrRaw {
                attr_type,
                bytes: data.to_vec(),
            })
        }
    })
}

fn get_deprecated(attr_type: u8) -> bool {
    crate::models::bgp::attributes::get_deprecated_attr_type(attr_type).is_some()
}

fn parse_aggregator(data: &mut Bytes, asn_len: AsnLength) -> Result<(Asn, IpAddr), WireError> {
    let asn = match asn_len {
        AsnLength::Bits16 => Asn::new_16bit(data.read_u16()?),
        AsnLength::Bits32 => Asn::new_32bit(data.read_u32()?),
    };
    let ip = IpAddr::V4(data.read_ipv4()?);
    Ok((asn, ip))
}

fn encode_aggregator(asn: Asn, ip: IpAddr, asn_len: AsnLength) -> Bytes {
    let mut bytes = BytesMut::with_capacity(8);
    match asn_len {
        AsnLength::Bits16 => bytes.put_u16(u16::from(asn)),
        AsnLength::Bits32 => bytes.put_u32(u32::from(asn)),
    }
    match ip {
        IpAddr::V4(v4) => bytes.put_slice(&v4.octets()),
        IpAddr::V6(_) => bytes.put_slice(&[0u8; 4]),
    }
    bytes.freeze()
}

/// Regular communities - RFC 1997.
fn parse_community(value: u32) -> Community {
    match value {
        0xFFFFFF01 => Community::NoExport,
        0xFFFFFF02 => Community::NoAdvertise,
        0xFFFFFF03 => Community::NoExportSubConfed,
        _ => {
            let asn = Asn::new_16bit((value >> 16) as u16);
            let local = (value & 0xFFFF) as u16;
            Community::Custom(asn, local)
        }
    }
}

fn encode_community(community: &Community) -> u32 {
    match community {
        Community::NoExport => 0xFFFFFF01,
        Community::NoAdvertise => 0xFFFFFF02,
        Community::NoExportSubConfed => 0xFFFFFF03,
        Community::Custom(asn, local) => (u16::from(*asn) as u32) << 16 | *local as u32,
    }
}

/// Extended communities - RFC 4360 Section 2 (8-octet `<type, subtype, value>`).
fn parse_extended_community(raw: &[u8]) -> ExtendedCommunity {
    let ty = ExtendedCommunityType::from(raw[0]);
    let subtype = raw[1];

    match ty {
        ExtendedCommunityType::NonTransitiveTwoOctetAs if matches!(subtype, 0x06..=0x09) => {
            return parse_flowspec_extended_community(subtype, raw);
        }
        ExtendedCommunityType::TransitiveTwoOctetAs
        | ExtendedCommunityType::NonTransitiveTwoOctetAs => {
            let global_admin = Asn::new_16bit(u16::from_be_bytes([raw[2], raw[3]]));
            let mut local_admin = [0u8; 4];
            local_admin.copy_from_slice(&raw[4..8]);
            let community = TwoOctetAsExtCommunity {
                subtype,
                global_admin,
                local_admin,
            };
            if ty == ExtendedCommunityType::TransitiveTwoOctetAs {
                ExtendedCommunity::TransitiveTwoOctetAs(community)
            } else {
                ExtendedCommunity::NonTransitiveTwoOctetAs(community)
            }
        }
        ExtendedCommunityType::TransitiveIpv4Addr | ExtendedCommunityType::NonTransitiveIpv4Addr => {
            let global_admin =
                Ipv4Addr::new(raw[2], raw[3], raw[4], raw[5]);
            let mut local_admin = [0u8; 2];
            local_admin.copy_from_slice(&raw[6..8]);
            let community = Ipv4AddrExtCommunity {
                subtype,
                global_admin,
                local_admin,
            };
            if ty == ExtendedCommunityType::TransitiveIpv4Addr {
                ExtendedCommunity::TransitiveIpv4Addr(community)
            } else {
                ExtendedCommunity::NonTransitiveIpv4Addr(community)
            }
        }
        ExtendedCommunityType::TransitiveFourOctetAs
        | ExtendedCommunityType::NonTransitiveFourOctetAs => {
            let global_admin = Asn::new_32bit(u32::from_be_bytes([raw[2], raw[3], raw[4], raw[5]]));
            let mut local_admin = [0u8; 2];
            local_admin.copy_from_slice(&raw[6..8]);
            let community = FourOctetAsExtCommunity {
                subtype,
                global_admin,
                local_admin,
            };
            if ty == ExtendedCommunityType::TransitiveFourOctetAs {
                ExtendedCommunity::TransitiveFourOctetAs(community)
            } else {
                ExtendedCommunity::NonTransitiveFourOctetAs(community)
            }
        }
        ExtendedCommunityType::TransitiveOpaque | ExtendedCommunityType::NonTransitiveOpaque => {
            let mut value = [0u8; 6];
            value.copy_from_slice(&raw[2..8]);
            let community = OpaqueExtCommunity { subtype, value };
            if ty == ExtendedCommunityType::TransitiveOpaque {
                ExtendedCommunity::TransitiveOpaque(community)
            } else {
                ExtendedCommunity::NonTransitiveOpaque(community)
            }
        }
        ExtendedCommunityType::Unknown(_) => {
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(raw);
            ExtendedCommunity::Raw(bytes)
        }
    }
}

/// RFC 8955 Section 7 flow-spec traffic-filtering actions: subtypes 0x06-0x09 under the
/// NonTransitiveTwoOctetAs extended community type.
fn parse_flowspec_extended_community(subtype: u8, raw: &[u8]) -> ExtendedCommunity {
    use crate::models::bgp::community::{FlowSpecTrafficAction, FlowSpecTrafficMarking, FlowSpecTrafficRate};

    let as_number = u16::from_be_bytes([raw[2], raw[3]]);
    match subtype {
        0x06 => {
            let rate_bytes_per_sec = f32::from_be_bytes([raw[4], raw[5], raw[6], raw[7]]);
            ExtendedCommunity::FlowSpecTrafficRate(FlowSpecTrafficRate::new(
                as_number,
                rate_bytes_per_sec,
            ))
        }
        0x07 => {
            let flags = raw[7];
            ExtendedCommunity::FlowSpecTrafficAction(FlowSpecTrafficAction::new(
                as_number,
                flags & 0x01 != 0,
                flags & 0x02 != 0,
            ))
        }
        0x08 => {
            let global_admin = Asn::new_16bit(as_number);
            let mut local_admin = [0u8; 4];
            local_admin.copy_from_slice(&raw[4..8]);
            ExtendedCommunity::FlowSpecRedirect(TwoOctetAsExtCommunity {
                subtype,
                global_admin,
                local_admin,
            })
        }
        _ => ExtendedCommunity::FlowSpecTrafficMarking(FlowSpecTrafficMarking::new(
            as_number, raw[7],
        )),
    }
}

fn encode_extended_community(community: &ExtendedCommunity) -> [u8; 8] {
    let mut out = [0u8; 8];
    match community {
        ExtendedCommunity::TransitiveTwoOctetAs(c) | ExtendedCommunity::NonTransitiveTwoOctetAs(c) => {
            out[0] = u8::from(community.community_type());
            out[1] = c.subtype;
            out[2..4].copy_from_slice(&u16::from(c.global_admin).to_be_bytes());
            out[4..8].copy_from_slice(&c.local_admin);
        }
        ExtendedCommunity::TransitiveIpv4Addr(c) | ExtendedCommunity::NonTransitiveIpv4Addr(c) => {
            out[0] = u8::from(community.community_type());
            out[1] = c.subtype;
            out[2..6].copy_from_slice(&c.global_admin.octets());
            out[6..8].copy_from_slice(&c.local_admin);
        }
        ExtendedCommunity::TransitiveFourOctetAs(c) | ExtendedCommunity::NonTransitiveFourOctetAs(c) => {
            out[0] = u8::from(community.community_type());
            out[1] = c.subtype;
            out[2..6].copy_from_slice(&u32::from(c.global_admin).to_be_bytes());
            out[6..8].copy_from_slice(&c.local_admin);
        }
        ExtendedCommunity::TransitiveOpaque(c) | ExtendedCommunity::NonTransitiveOpaque(c) => {
            out[0] = u8::from(community.community_type());
            out[1] = c.subtype;
            out[2..8].copy_from_slice(&c.value);
        }
        ExtendedCommunity::FlowSpecTrafficRate(c) => {
            out[0] = u8::from(ExtendedCommunityType::NonTransitiveTwoOctetAs);
            out[1] = 0x06;
            out[2..4].copy_from_slice(&c.as_number.to_be_bytes());
            out[4..8].copy_from_slice(&c.rate_bytes_per_sec.to_be_bytes());
        }
        ExtendedCommunity::FlowSpecTrafficAction(c) => {
            out[0] = u8::from(ExtendedCommunityType::NonTransitiveTwoOctetAs);
            out[1] = 0x07;
            out[2..4].copy_from_slice(&c.as_number.to_be_bytes());
            let mut flags = 0u8;
            if c.terminal {
                flags |= 0x01;
            }
            if c.sample {
                flags |= 0x02;
            }
            out[7] = flags;
        }
        ExtendedCommunity::FlowSpecRedirect(c) => {
            out[0] = u8::from(ExtendedCommunityType::NonTransitiveTwoOctetAs);
            out[1] = 0x08;
            out[2..4].copy_from_slice(&u16::from(c.global_admin).to_be_bytes());
            out[4..8].copy_from_slice(&c.local_admin);
        }
        ExtendedCommunity::FlowSpecTrafficMarking(c) => {
            out[0] = u8::from(ExtendedCommunityType::NonTransitiveTwoOctetAs);
            out[1] = 0x09;
            out[2..4].copy_from_slice(&c.as_number.to_be_bytes());
            out[7] = c.dscp;
        }
        ExtendedCommunity::Raw(bytes) => out = *bytes,
    }
    out
}

/// MP_REACH_NLRI - RFC 4760 Section 3.
fn parse_mp_reach(mut data: Bytes) -> Result<Nlri, WireError> {
    let afi = data.read_afi()?;
    let safi = Safi::from(data.read_u8()?);
    let next_hop_len = data.read_u8()? as usize;
    let next_hop_bytes = data.read_n_bytes(next_hop_len)?;
    let next_hop = Some(parse_next_hop(afi, &next_hop_bytes)?);

    // SNPA count: deprecated by RFC 4760, always 0 in practice; skip any that appear.
    let snpa_count = data.read_u8()?;
    for _ in 0..snpa_count {
        let len = data.read_u8()? as usize;
        data.read_n_bytes(len)?;
    }

    let prefixes = parse_nlri_prefixes(&mut data, afi, false)?;

    Ok(Nlri {
        afi,
        safi,
        next_hop,
        prefixes,
    })
}

fn encode_mp_reach(nlri: &Nlri) -> Bytes {
    let mut bytes = BytesMut::new();
    bytes.put_u16(u16::from(nlri.afi));
    bytes.put_u8(u8::from(nlri.safi));

    let next_hop_bytes = nlri
        .next_hop
        .map(encode_next_hop)
        .unwrap_or_else(Bytes::new);
    bytes.put_u8(next_hop_bytes.len() as u8);
    bytes.put(next_hop_bytes);
    bytes.put_u8(0); // SNPA count

    for prefix in &nlri.prefixes {
        bytes.put(encode_nlri_prefix(prefix));
    }

    bytes.freeze()
}

/// MP_UNREACH_NLRI - RFC 4760 Section 4.
fn parse_mp_unreach(mut data: Bytes) -> Result<Nlri, WireError> {
    let afi = data.read_afi()?;
    let safi = Safi::from(data.read_u8()?);
    let prefixes = parse_nlri_prefixes(&mut data, afi, false)?;

    Ok(Nlri {
        afi,
        safi,
        next_hop: None,
        prefixes,
    })
}

fn encode_mp_unreach(nlri: &Nlri) -> Bytes {
    let mut bytes = BytesMut::new();
    bytes.put_u16(u16::from(nlri.afi));
    bytes.put_u8(u8::from(nlri.safi));
    for prefix in &nlri.prefixes {
        bytes.put(encode_nlri_prefix(prefix));
    }
    bytes.freeze()
}

fn parse_next_hop(afi: Afi, raw: &[u8]) -> Result<NextHopAddress, WireError> {
    match (afi, raw.len()) {
        (Afi::Ipv4, 4) => Ok(NextHopAddress::Ipv4(Ipv4Addr::new(
            raw[0], raw[1], raw[2], raw[3],
        ))),
        (Afi::Ipv6, 16) => {
            let mut octets = [0u8; 16];
            octets.copy_from_slice(raw);
            Ok(NextHopAddress::Ipv6(Ipv6Addr::from(octets)))
        }
        (Afi::Ipv6, 32) => {
            let mut global = [0u8; 16];
            global.copy_from_slice(&raw[0..16]);
            let mut local = [0u8; 16];
            local.copy_from_slice(&raw[16..32]);
            Ok(NextHopAddress::Ipv6LinkLocal(
                Ipv6Addr::from(global),
                Ipv6Addr::from(local),
            ))
        }
        (afi, len) => Err(WireError::BadValue(format!(
            "unsupported next hop length {len} for afi {afi:?}"
        ))),
    }
}

fn encode_next_hop(next_hop: NextHopAddress) -> Bytes {
    match next_hop {
        NextHopAddress::Ipv4(v4) => Bytes::copy_from_slice(&v4.octets()),
        NextHopAddress::Ipv6(v6) => Bytes::copy_from_slice(&v6.octets()),
        NextHopAddress::Ipv6LinkLocal(global, local) => {
            let mut bytes = BytesMut::with_capacity(32);
            bytes.put_slice(&global.octets());
            bytes.put_slice(&local.octets());
            bytes.freeze()
        }
    }
}

fn encode_attribute(attr: &Attribute, asn_len: AsnLength) -> Bytes {
    let (value_bytes, type_byte): (Bytes, u8) = match &attr.value {
        AttributeValue::Origin(origin) => (Bytes::copy_from_slice(&[*origin as u8]), 1),
        AttributeValue::AsPath(path) => (path.encode(asn_len), 2),
        AttributeValue::As4Path(path) => (path.encode(AsnLength::Bits32), 17),
        AttributeValue::NextHop(ip) => {
            let bytes = match ip {
                IpAddr::V4(v4) => Bytes::copy_from_slice(&v4.octets()),
                IpAddr::V6(_) => Bytes::copy_from_slice(&[0u8; 4]),
            };
            (bytes, 3)
        }
        AttributeValue::MultiExitDiscriminator(med) => {
            let mut b = BytesMut::with_capacity(4);
            b.put_u32(*med);
            (b.freeze(), 4)
        }
        AttributeValue::LocalPreference(pref) => {
            let mut b = BytesMut::with_capacity(4);
            b.put_u32(*pref);
            (b.freeze(), 5)
        }
        AttributeValue::OnlyToCustomer(asn) => {
            let mut b = BytesMut::with_capacity(4);
            b.put_u32(*asn);
            (b.freeze(), 35)
        }
        AttributeValue::AtomicAggregate(_) => (Bytes::new(), 6),
        AttributeValue::Aggregator(asn, ip) => (encode_aggregator(*asn, *ip, asn_len), 7),
        AttributeValue::As4Aggregator(asn, ip) => {
            (encode_aggregator(*asn, *ip, AsnLength::Bits32), 18)
        }
        AttributeValue::Communities(communities) => {
            let mut b = BytesMut::with_capacity(communities.len() * 4);
            for c in communities {
                b.put_u32(encode_community(c));
            }
            (b.freeze(), 8)
        }
        AttributeValue::ExtendedCommunities(communities) => {
            let mut b = BytesMut::with_capacity(communities.len() * 8);
            for c in communities {
                b.put_slice(&encode_extended_community(c));
            }
            (b.freeze(), 16)
        }
        AttributeValue::LargeCommunities(communities) => {
            let mut b = BytesMut::with_capacity(communities.len() * 12);
            for c in communities {
                b.put_u32(c.global_admin);
                b.put_u32(c.local_data[0]);
                b.put_u32(c.local_data[1]);
            }
            (b.freeze(), 32)
        }
        AttributeValue::OriginatorId(ip) => {
            let bytes = match ip {
                IpAddr::V4(v4) => Bytes::copy_from_slice(&v4.octets()),
                IpAddr::V6(_) => Bytes::copy_from_slice(&[0u8; 4]),
            };
            (bytes, 9)
        }
        AttributeValue::Clusters(clusters) => {
            let mut b = BytesMut::with_capacity(clusters.len() * 4);
            for c in clusters {
                if let IpAddr::V4(v4) = c {
                    b.put_slice(&v4.octets());
                }
            }
            (b.freeze(), 10)
        }
        AttributeValue::MpReachNlri(nlri) => (encode_mp_reach(nlri), 14),
        AttributeValue::MpUnreachNlri(nlri) => (encode_mp_unreach(nlri), 15),
        AttributeValue::Development(bytes) => (Bytes::copy_from_slice(bytes), 255),
        AttributeValue::Deprecated(raw) | AttributeValue::Unknown(raw) => {
            (Bytes::copy_from_slice(&raw.bytes), u8::from(raw.attr_type))
        }
    };

    let mut flags = attr.flag;
    if value_bytes.len() > u8::MAX as usize {
        flags.insert(AttrFlags::EXTENDED);
    } else {
        flags.remove(AttrFlags::EXTENDED);
    }

    let mut bytes = BytesMut::with_capacity(3 + value_bytes.len());
    bytes.put_u8(flags.bits());
    bytes.put_u8(type_byte);
    if flags.contains(AttrFlags::EXTENDED) {
        bytes.put_u16(value_bytes.len() as u16);
    } else {
        bytes.put_u8(value_bytes.len() as u8);
    }
    bytes.put(value_bytes);
    bytes.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::bgp::{AsPath, AsPathSegment};
    use std::borrow::Cow;
    use std::str::FromStr;

    fn opts() -> UpdateCodecOptions {
        UpdateCodecOptions::default()
    }

    #[test]
    fn round_trip_simple_update() {
        let prefix: NetworkPrefix = "10.0.0.0/24".parse().unwrap();
        let attributes: crate::models::bgp::Attributes = vec![
            AttributeValue::Origin(Origin::IGP),
            AttributeValue::AsPath(AsPath::from_sequence(vec![Asn::new_16bit(65001)])),
            AttributeValue::NextHop(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1))),
        ]
        .into_iter()
        .collect();

        let update = BgpUpdateMessage {
            withdrawn_prefixes: vec![],
            attributes,
            announced_prefixes: vec![prefix],
            ..Default::default()
        };

        let encoded = encode_update(&update, &opts());
        let parsed = parse_update(encoded, &opts()).unwrap();
        assert_eq!(parsed, update);
    }

    #[test]
    fn round_trip_withdrawals() {
        let withdrawn: NetworkPrefix = "192.168.0.0/16".parse().unwrap();
        let update = BgpUpdateMessage {
            withdrawn_prefixes: vec![withdrawn],
            attributes: Default::default(),
            announced_prefixes: vec![],
            ..Default::default()
        };
        let encoded = encode_update(&update, &opts());
        let parsed = parse_update(encoded, &opts()).unwrap();
        assert_eq!(parsed, update);
    }

    #[test]
    fn duplicate_singleton_attribute_rejected() {
        let mut attr_bytes = BytesMut::new();
        // ORIGIN twice
        attr_bytes.put_u8(AttrFlags::TRANSITIVE.bits());
        attr_bytes.put_u8(1);
        attr_bytes.put_u8(1);
        attr_bytes.put_u8(Origin::IGP as u8);
        attr_bytes.put_u8(AttrFlags::TRANSITIVE.bits());
        attr_bytes.put_u8(1);
        attr_bytes.put_u8(1);
        attr_bytes.put_u8(Origin::EGP as u8);

        let mut body = BytesMut::new();
        body.put_u16(0);
        body.put_u16(attr_bytes.len() as u16);
        body.put(attr_bytes);

        let err = parse_update(body.freeze(), &opts()).unwrap_err();
        assert!(matches!(err, WireError::DupAttr(_)));
    }

    #[test]
    fn unknown_attribute_preserved_as_raw() {
        let mut attr_bytes = BytesMut::new();
        attr_bytes.put_u8(AttrFlags::OPTIONAL.bits() | AttrFlags::TRANSITIVE.bits());
        attr_bytes.put_u8(200);
        attr_bytes.put_u8(2);
        attr_bytes.put_slice(&[0xAA, 0xBB]);

        let mut body = BytesMut::new();
        body.put_u16(0);
        body.put_u16(attr_bytes.len() as u16);
        body.put(attr_bytes);
        body.put_u16(0);

        let parsed = parse_update(body.freeze(), &opts()).unwrap();
        match &parsed.attributes[0].value {
            AttributeValue::Unknown(raw) => assert_eq!(raw.bytes, vec![0xAA, 0xBB]),
            other => panic!("expected Unknown, got {other:?}"),
        }
    }

    #[test]
    fn round_trip_communities() {
        let attributes: crate::models::bgp::Attributes = vec![AttributeValue::Communities(vec![
            Community::NoExport,
            Community::Custom(Asn::new_16bit(65000), 100),
        ])]
        .into_iter()
        .collect();

        let update = BgpUpdateMessage {
            withdrawn_prefixes: vec![],
            attributes,
            announced_prefixes: vec![],
            ..Default::default()
        };

        let encoded = encode_update(&update, &opts());
        let parsed = parse_update(encoded, &opts()).unwrap();
        assert_eq!(parsed, update);
    }

    #[test]
    fn round_trip_mp_reach_ipv6() {
        let prefix = NetworkPrefix::new(IpNet::from_str("2001:db8::/32").unwrap(), None);
        let nlri = Nlri {
            afi: Afi::Ipv6,
            safi: Safi::Unicast,
            next_hop: Some(NextHopAddress::Ipv6(Ipv6Addr::LOCALHOST)),
            prefixes: vec![prefix],
        };

        let attributes: crate::models::bgp::Attributes =
            vec![AttributeValue::MpReachNlri(nlri.clone())]
                .into_iter()
                .collect();

        let update = BgpUpdateMessage {
            withdrawn_prefixes: vec![],
            attributes,
            announced_prefixes: vec![],
            ..Default::default()
        };

        let encoded = encode_update(&update, &opts());
        let parsed = parse_update(encoded, &opts()).unwrap();
        assert_eq!(parsed.attributes.get_reachable(), Some(&nlri));
    }

    #[test]
    fn add_path_round_trip() {
        let prefix = NetworkPrefix::new(IpNet::from_str("172.16.0.0/24").unwrap(), Some(7));
        let update = BgpUpdateMessage {
            withdrawn_prefixes: vec![],
            attributes: Default::default(),
            announced_prefixes: vec![prefix],
            ..Default::default()
        };

        let opts = UpdateCodecOptions {
            asn_len: AsnLength::Bits16,
            add_path: true,
        };

        let encoded = encode_update(&update, &opts);
        let parsed = parse_update(encoded, &opts).unwrap();
        assert_eq!(parsed, update);
    }

    #[test]
    fn four_byte_as_path_round_trips() {
        let path = AsPath::from_segments(vec![AsPathSegment::AsSequence(Cow::Owned(vec![
            Asn::new_32bit(400000),
            Asn::new_32bit(500000),
        ]))]);
        let attributes: crate::models::bgp::Attributes = vec![AttributeValue::AsPath(path.clone())]
            .into_iter()
            .collect();
        let update = BgpUpdateMessage {
            withdrawn_prefixes: vec![],
            attributes,
            announced_prefixes: vec![],
            ..Default::default()
        };

        let opts = UpdateCodecOptions {
            asn_len: AsnLength::Bits32,
            add_path: false,
        };

        let encoded = encode_update(&update, &opts);
        let parsed = parse_update(encoded, &opts).unwrap();
        assert_eq!(parsed.attributes.as_path(), Some(&path));
    }
}
