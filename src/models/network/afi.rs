use num_enum::{FromPrimitive, IntoPrimitive};

/// AFI -- Address Family Identifier
///
/// <https://www.iana.org/assignments/address-family-numbers/address-family-numbers.xhtml>
#[derive(Debug, FromPrimitive, IntoPrimitive, PartialEq, Eq, Hash, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u16)]
pub enum Afi {
    Ipv4 = 1,
    Ipv6 = 2,
    #[num_enum(catch_all)]
    Unknown(u16),
}

/// SAFI -- Subsequent Address Family Identifier
///
/// SAFI can be: Unicast, Multicast, or both.
///
/// <https://www.iana.org/assignments/safi-namespace/safi-namespace.xhtml>
#[derive(Debug, FromPrimitive, IntoPrimitive, PartialEq, Eq, Hash, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum Safi {
    Unicast = 1,
    Multicast = 2,
    UnicastMulticast = 3,
    /// RFC 4364 BGP/MPLS IP VPN.
    MplsVpn = 128,
    /// RFC 6513 multicast BGP/MPLS IP VPN.
    MulticastVpn = 129,
    /// RFC 8955 flowspec NLRI.
    Flowspec = 133,
    /// RFC 8955 flowspec-action VPN NLRI.
    FlowspecVpn = 134,
    #[num_enum(catch_all)]
    Unknown(u8),
}
