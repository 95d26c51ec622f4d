use crate::codec::ReadUtils;
use crate::error::WireError;
use crate::models::network::{Afi, Safi};
#[cfg(feature = "parser")]
use bytes::{BufMut, Bytes, BytesMut};
use num_enum::{FromPrimitive, IntoPrimitive};

#[allow(non_camel_case_types)]
#[derive(Debug, FromPrimitive, IntoPrimitive, PartialEq, Eq, Hash, Copy, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum BgpCapabilityType {
    MULTIPROTOCOL_EXTENSIONS_FOR_BGP_4 = 1,
    ROUTE_REFRESH_CAPABILITY_FOR_BGP_4 = 2,
    OUTBOUND_ROUTE_FILTERING_CAPABILITY = 3,
    EXTENDED_NEXT_HOP_ENCODING = 5,
    BGP_EXTENDED_MESSAGE = 6,
    BGPSEC_CAPABILITY = 7,
    MULTIPLE_LABELS_CAPABILITY = 8,
    BGP_ROLE = 9,
    GRACEFUL_RESTART_CAPABILITY = 64,
    SUPPORT_FOR_4_OCTET_AS_NUMBER_CAPABILITY = 65,
    SUPPORT_FOR_DYNAMIC_CAPABILITY = 67,
    MULTISESSION_BGP_CAPABILITY = 68,
    ADD_PATH_CAPABILITY = 69,
    ENHANCED_ROUTE_REFRESH_CAPABILITY = 70,
    LONG_LIVED_GRACEFUL_RESTART_CAPABILITY = 71,
    ROUTING_POLICY_DISTRIBUTION = 72,
    FQDN_CAPABILITY = 73,

    /// Catch-all type for any deprecated, unassigned, or reserved codes
    #[num_enum(catch_all)]
    Unknown(u8),
}

impl BgpCapabilityType {
    pub const fn is_deprecated(&self) -> bool {
        matches!(
            self,
            BgpCapabilityType::Unknown(4 | 66 | 128 | 129 | 130 | 131 | 184 | 185)
        )
    }

    pub const fn is_reserved(&self) -> bool {
        matches!(self, BgpCapabilityType::Unknown(0 | 255))
    }

    pub const fn is_reserved_for_experimental_use(&self) -> bool {
        matches!(self, BgpCapabilityType::Unknown(239..=254))
    }
}

/// Extended Next Hop capability entry - RFC 8950, Section 3
/// Represents a single <NLRI AFI, NLRI SAFI, NextHop AFI> triple
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExtendedNextHopEntry {
    /// Address Family Identifier for NLRI (typically AFI=1 for IPv4)
    pub nlri_afi: Afi,
    /// Subsequent Address Family Identifier for NLRI (1, 2, 4, 128, 129 per RFC 8950)
    pub nlri_safi: Safi,
    /// Address Family Identifier for Next Hop (typically AFI=2 for IPv6)  
    pub nexthop_afi: Afi,
}

/// Extended Next Hop capability - RFC 8950, Section 3
/// Contains a list of supported NLRI/NextHop AFI/SAFI combinations
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExtendedNextHopCapability {
    /// List of supported AFI/SAFI combinations for extended next hop encoding
    pub entries: Vec<ExtendedNextHopEntry>,
}

impl ExtendedNextHopCapability {
    /// Create a new Extended Next Hop capability with the given entries
    pub fn new(entries: Vec<ExtendedNextHopEntry>) -> Self {
        Self { entries }
    }

    /// Check if this capability supports a specific NLRI AFI/SAFI with NextHop AFI combination
    pub fn supports(&self, nlri_afi: Afi, nlri_safi: Safi, nexthop_afi: Afi) -> bool {
        self.entries.iter().any(|entry| {
            entry.nlri_afi == nlri_afi
                && entry.nlri_safi == nlri_safi
                && entry.nexthop_afi == nexthop_afi
        })
    }

    /// Get all supported NLRI AFI/SAFI combinations for a given NextHop AFI
    pub fn supported_nlri_for_nexthop(&self, nexthop_afi: Afi) -> Vec<(Afi, Safi)> {
        self.entries
            .iter()
            .filter(|entry| entry.nexthop_afi == nexthop_afi)
            .map(|entry| (entry.nlri_afi, entry.nlri_safi))
            .collect()
    }

    /// Parse Extended Next Hop capability from raw bytes - RFC 8950, Section 3
    ///
    /// Format: Series of 6-byte entries, each containing:
    /// - NLRI AFI (2 bytes)
    /// - NLRI SAFI (2 bytes)
    /// - NextHop AFI (2 bytes)
    #[cfg(feature = "parser")]
    pub fn parse(mut data: Bytes) -> Result<Self, WireError> {
        let mut entries = Vec::new();

        // Each entry is 6 bytes (2 + 2 + 2)
        if !data.len().is_multiple_of(6) {
            return Err(WireError::BadCaps(format!(
                "Extended Next Hop capability length {} is not divisible by 6",
                data.len()
            )));
        }

        while data.len() >= 6 {
            let nlri_afi = data.read_afi()?;
            // SAFI is encoded as 2 bytes in capability, but SAFI enum is u8
            let nlri_safi_u16 = data.read_u16()?;
            let nlri_safi = Safi::from(nlri_safi_u16 as u8);
            let nexthop_afi = data.read_afi()?;

            entries.push(ExtendedNextHopEntry {
                nlri_afi,
                nlri_safi,
                nexthop_afi,
            });
        }

        Ok(ExtendedNextHopCapability::new(entries))
    }

    /// Encode Extended Next Hop capability to raw bytes - RFC 8950, Section 3
    #[cfg(feature = "parser")]
    pub fn encode(&self) -> Bytes {
        let mut bytes = BytesMut::with_capacity(self.entries.len() * 6);

        for entry in &self.entries {
            bytes.put_u16(u16::from(entry.nlri_afi)); // NLRI AFI (2 bytes)
            bytes.put_u16(u8::from(entry.nlri_safi) as u16); // NLRI SAFI (2 bytes in capability, but SAFI is u8)
            bytes.put_u16(u16::from(entry.nexthop_afi)); // NextHop AFI (2 bytes)
        }

        bytes.freeze()
    }

    /// Intersects the NLRI/NextHop AFI/SAFI entries advertised by both peers. Returns `None`
    /// if no entry is shared.
    pub fn intersect(&self, other: &Self) -> Option<Self> {
        let entries: Vec<_> = self
            .entries
            .iter()
            .filter(|e| other.entries.contains(e))
            .cloned()
            .collect();
        (!entries.is_empty()).then_some(ExtendedNextHopCapability { entries })
    }
}

/// Multiprotocol Extensions capability entry - RFC 2858, Section 7
/// Represents a single <AFI, SAFI> combination
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MultiprotocolExtensionsCapability {
    /// Address Family Identifier
    pub afi: Afi,
    /// Subsequent Address Family Identifier
    pub safi: Safi,
}

impl MultiprotocolExtensionsCapability {
    /// Create a new Multiprotocol Extensions capability
    pub fn new(afi: Afi, safi: Safi) -> Self {
        Self { afi, safi }
    }

    /// Parse Multiprotocol Extensions capability from raw bytes - RFC 2858, Section 7
    ///
    /// Format: 4 bytes total
    /// - AFI (2 bytes)
    /// - Reserved (1 byte) - should be 0
    /// - SAFI (1 byte)
    #[cfg(feature = "parser")]
    pub fn parse(mut data: Bytes) -> Result<Self, WireError> {
        if data.len() != 4 {
            return Err(WireError::BadCaps(format!(
                "Multiprotocol Extensions capability length {} is not 4",
                data.len()
            )));
        }

        let afi = data.read_afi()?;
        let _reserved = data.read_u8()?; // Reserved field, should be 0 but ignored
        let safi_u8 = data.read_u8()?;
        let safi = Safi::from(safi_u8);

        Ok(MultiprotocolExtensionsCapability::new(afi, safi))
    }

    /// Encode Multiprotocol Extensions capability to raw bytes - RFC 2858, Section 7
    #[cfg(feature = "parser")]
    pub fn encode(&self) -> Bytes {
        let mut bytes = BytesMut::with_capacity(4);
        bytes.put_u16(u16::from(self.afi)); // AFI (2 bytes)
        bytes.put_u8(0); // Reserved (1 byte) - set to 0
        bytes.put_u8(u8::from(self.safi)); // SAFI (1 byte)
        bytes.freeze()
    }

    /// Two peers agree on a family only if both advertised it.
    pub fn intersect(&self, other: &Self) -> Option<Self> {
        (self.afi == other.afi && self.safi == other.safi).then(|| self.clone())
    }
}

/// Graceful Restart capability - RFC 4724
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GracefulRestartCapability {
    /// Restart state flag - indicates BGP speaker has restarted
    pub restart_state: bool,
    /// Restart time in seconds
    pub restart_time: u16,
    /// List of address families that support Graceful Restart
    pub address_families: Vec<GracefulRestartAddressFamily>,
}

/// Address family entry for Graceful Restart capability - RFC 4724
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GracefulRestartAddressFamily {
    /// Address Family Identifier
    pub afi: Afi,
    /// Subsequent Address Family Identifier
    pub safi: Safi,
    /// Forwarding state preserved flag
    pub forwarding_state: bool,
}

impl GracefulRestartCapability {
    /// Create a new Graceful Restart capability
    pub fn new(
        restart_state: bool,
        restart_time: u16,
        address_families: Vec<GracefulRestartAddressFamily>,
    ) -> Self {
        Self {
            restart_state,
            restart_time,
            address_families,
        }
    }

    /// Parse Graceful Restart capability from raw bytes - RFC 4724
    ///
    /// Format:
    /// - Restart Flags (4 bits) + Restart Time (12 bits) = 2 bytes total
    /// - Followed by 0 or more address family entries (4 bytes each)
    #[cfg(feature = "parser")]
    pub fn parse(mut data: Bytes) -> Result<Self, WireError> {
        if data.len() < 2 {
            return Err(WireError::BadCaps(format!(
                "Graceful Restart capability length {} is less than minimum 2 bytes",
                data.len()
            )));
        }

        // Parse restart flags and time (16 bits total)
        let restart_flags_and_time = data.read_u16()?;
        let restart_state = (restart_flags_and_time & 0x8000) != 0; // Most significant bit
        let restart_time = restart_flags_and_time & 0x0FFF; // Lower 12 bits

        let mut address_families = Vec::new();

        // Parse address family entries (4 bytes each)
        if !data.len().is_multiple_of(4) {
            return Err(WireError::BadCaps(format!(
                "Graceful Restart capability remaining length {} is not divisible by 4",
                data.len()
            )));
        }

        while data.len() >= 4 {
            let afi = data.read_afi()?;
            let safi_u8 = data.read_u8()?;
            let safi = Safi::from(safi_u8);
            let flags = data.read_u8()?;
            let forwarding_state = (flags & 0x80) != 0; // Most significant bit

            address_families.push(GracefulRestartAddressFamily {
                afi,
                safi,
                forwarding_state,
            });
        }

        Ok(GracefulRestartCapability::new(
            restart_state,
            restart_time,
            address_families,
        ))
    }

    /// Encode Graceful Restart capability to raw bytes - RFC 4724
    #[cfg(feature = "parser")]
    pub fn encode(&self) -> Bytes {
        let mut bytes = BytesMut::with_capacity(2 + self.address_families.len() * 4);

        // Encode restart flags and time
        let restart_flags_and_time = if self.restart_state {
            0x8000 | (self.restart_time & 0x0FFF)
        } else {
            self.restart_time & 0x0FFF
        };
        bytes.put_u16(restart_flags_and_time);

        // Encode address family entries
        for af in &self.address_families {
            bytes.put_u16(u16::from(af.afi)); // AFI (2 bytes)
            bytes.put_u8(u8::from(af.safi)); // SAFI (1 byte)
            let flags = if af.forwarding_state { 0x80 } else { 0x00 };
            bytes.put_u8(flags); // Flags (1 byte)
        }

        bytes.freeze()
    }

    /// Restart state requires both sides to claim it; restart time is the lower of the two
    /// advertised values; address families are the intersection by AFI/SAFI.
    pub fn intersect(&self, other: &Self) -> Option<Self> {
        let address_families: Vec<_> = self
            .address_families
            .iter()
            .filter_map(|mine| {
                other
                    .address_families
                    .iter()
                    .find(|theirs| theirs.afi == mine.afi && theirs.safi == mine.safi)
                    .map(|theirs| GracefulRestartAddressFamily {
                        afi: mine.afi,
                        safi: mine.safi,
                        forwarding_state: mine.forwarding_state && theirs.forwarding_state,
                    })
            })
            .collect();

        Some(GracefulRestartCapability {
            restart_state: self.restart_state && other.restart_state,
            restart_time: self.restart_time.min(other.restart_time),
            address_families,
        })
    }
}

/// ADD-PATH capability - RFC 7911
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AddPathCapability {
    /// List of address families and their send/receive modes
    pub address_families: Vec<AddPathAddressFamily>,
}

/// Address family entry for ADD-PATH capability - RFC 7911
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AddPathAddressFamily {
    /// Address Family Identifier
    pub afi: Afi,
    /// Subsequent Address Family Identifier
    pub safi: Safi,
    /// Send/Receive mode
    pub send_receive: AddPathSendReceive,
}

/// Send/Receive mode for ADD-PATH capability - RFC 7911
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AddPathSendReceive {
    /// Can receive multiple paths (value 1)
    Receive = 1,
    /// Can send multiple paths (value 2)
    Send = 2,
    /// Can both send and receive multiple paths (value 3)
    SendReceive = 3,
}

impl TryFrom<u8> for AddPathSendReceive {
    type Error = WireError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(AddPathSendReceive::Receive),
            2 => Ok(AddPathSendReceive::Send),
            3 => Ok(AddPathSendReceive::SendReceive),
            _ => Err(WireError::BadCaps(format!(
                "Invalid ADD-PATH Send/Receive value: {}",
                value
            ))),
        }
    }
}

impl AddPathSendReceive {
    const fn bits(self) -> u8 {
        self as u8
    }

    /// Combine two advertised directions down to what both sides actually support: the
    /// peer only sends what we're willing to receive, and vice versa.
    fn intersect(self, other: Self) -> Option<Self> {
        match self.bits() & other.bits() {
            1 => Some(AddPathSendReceive::Receive),
            2 => Some(AddPathSendReceive::Send),
            3 => Some(AddPathSendReceive::SendReceive),
            _ => None,
        }
    }
}

impl AddPathCapability {
    /// Create a new ADD-PATH capability
    pub fn new(address_families: Vec<AddPathAddressFamily>) -> Self {
        Self { address_families }
    }

    /// Intersects per-family send/receive directions; a family with no remaining direction
    /// after intersection is dropped.
    pub fn intersect(&self, other: &Self) -> Option<Self> {
        let address_families: Vec<_> = self
            .address_families
            .iter()
            .filter_map(|mine| {
                other
                    .address_families
                    .iter()
                    .find(|theirs| theirs.afi == mine.afi && theirs.safi == mine.safi)
                    .and_then(|theirs| mine.send_receive.intersect(theirs.send_receive))
                    .map(|send_receive| AddPathAddressFamily {
                        afi: mine.afi,
                        safi: mine.safi,
                        send_receive,
                    })
            })
            .collect();

        (!address_families.is_empty()).then_some(AddPathCapability { address_families })
    }

    /// Parse ADD-PATH capability from raw bytes - RFC 7911
    ///
    /// Format: Series of 4-byte entries, each containing:
    /// - AFI (2 bytes)
    /// - SAFI (1 byte)
    /// - Send/Receive (1 byte)
    #[cfg(feature = "parser")]
    pub fn parse(mut data: Bytes) -> Result<Self, WireError> {
        let mut address_families = Vec::new();

        // Each entry is 4 bytes (2 + 1 + 1)
        if !data.len().is_multiple_of(4) {
            return Err(WireError::BadCaps(format!(
                "ADD-PATH capability length {} is not divisible by 4",
                data.len()
            )));
        }

        while data.len() >= 4 {
            let afi = data.read_afi()?;
            let safi_u8 = data.read_u8()?;
            let safi = Safi::from(safi_u8);
            let send_receive_u8 = data.read_u8()?;
            let send_receive = AddPathSendReceive::try_from(send_receive_u8)?;

            address_families.push(AddPathAddressFamily {
                afi,
                safi,
                send_receive,
            });
        }

        Ok(AddPathCapability::new(address_families))
    }

    /// Encode ADD-PATH capability to raw bytes - RFC 7911
    #[cfg(feature = "parser")]
    pub fn encode(&self) -> Bytes {
        let mut bytes = BytesMut::with_capacity(self.address_families.len() * 4);

        for af in &self.address_families {
            bytes.put_u16(u16::from(af.afi)); // AFI (2 bytes)
            bytes.put_u8(u8::from(af.safi)); // SAFI (1 byte)
            bytes.put_u8(af.send_receive as u8); // Send/Receive (1 byte)
        }

        bytes.freeze()
    }
}

/// Route Refresh capability - RFC 2918
/// This capability has no parameters, it's just a flag indicating support
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RouteRefreshCapability;

impl RouteRefreshCapability {
    /// Create a new Route Refresh capability
    pub fn new() -> Self {
        Self
    }

    /// Parse Route Refresh capability from raw bytes - RFC 2918
    /// This capability has length 0, so data should be empty
    #[cfg(feature = "parser")]
    pub fn parse(data: Bytes) -> Result<Self, WireError> {
        if !data.is_empty() {
            return Err(WireError::BadCaps(format!(
                "Route Refresh capability should have length 0, got {}",
                data.len()
            )));
        }
        Ok(RouteRefreshCapability::new())
    }

    /// Encode Route Refresh capability to raw bytes - RFC 2918
    /// Always returns empty bytes since this capability has no parameters
    #[cfg(feature = "parser")]
    pub fn encode(&self) -> Bytes {
        Bytes::new()
    }

    /// Stateless: advertising it at all means both sides support it.
    pub fn intersect(&self, _other: &Self) -> Option<Self> {
        Some(RouteRefreshCapability::new())
    }
}

impl Default for RouteRefreshCapability {
    fn default() -> Self {
        Self::new()
    }
}

/// BGP Extended Message capability - RFC 8654
/// This capability has no parameters, it's just a flag indicating support for extended messages
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BgpExtendedMessageCapability;

impl BgpExtendedMessageCapability {
    /// Create a new BGP Extended Message capability
    pub fn new() -> Self {
        Self
    }

    /// Parse BGP Extended Message capability from raw bytes - RFC 8654
    /// This capability has length 0, so data should be empty
    #[cfg(feature = "parser")]
    pub fn parse(data: Bytes) -> Result<Self, WireError> {
        if !data.is_empty() {
            return Err(WireError::BadCaps(format!(
                "BGP Extended Message capability should have length 0, got {}",
                data.len()
            )));
        }
        Ok(BgpExtendedMessageCapability::new())
    }

    /// Encode BGP Extended Message capability to raw bytes - RFC 8654
    /// Always returns empty bytes since this capability has no parameters
    #[cfg(feature = "parser")]
    pub fn encode(&self) -> Bytes {
        Bytes::new()
    }

    /// Extended message support only takes effect once both sides advertise it, but the
    /// capability itself is stateless: presence on both sides is all that's required.
    pub fn intersect(&self, _other: &Self) -> Option<Self> {
        Some(BgpExtendedMessageCapability::new())
    }
}

impl Default for BgpExtendedMessageCapability {
    fn default() -> Self {
        Self::new()
    }
}

/// 4-octet AS number capability - RFC 6793
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FourOctetAsCapability {
    /// The 4-octet AS number of the BGP speaker
    pub asn: u32,
}

impl FourOctetAsCapability {
    /// Create a new 4-octet AS capability
    pub fn new(asn: u32) -> Self {
        Self { asn }
    }

    /// Parse 4-octet AS capability from raw bytes - RFC 6793
    /// Format: 4 bytes containing the AS number
    #[cfg(feature = "parser")]
    pub fn parse(mut data: Bytes) -> Result<Self, WireError> {
        if data.len() != 4 {
            return Err(WireError::BadCaps(format!(
                "4-octet AS capability length {} is not 4",
                data.len()
            )));
        }

        let asn = data.read_u32()?;
        Ok(FourOctetAsCapability::new(asn))
    }

    /// Encode 4-octet AS capability to raw bytes - RFC 6793
    #[cfg(feature = "parser")]
    pub fn encode(&self) -> Bytes {
        let mut bytes = BytesMut::with_capacity(4);
        bytes.put_u32(self.asn);
        bytes.freeze()
    }

    /// Each side keeps its own 4-octet ASN; the receiver's advertised value is authoritative
    /// for what that peer calls itself.
    pub fn intersect(&self, _other: &Self) -> Option<Self> {
        Some(self.clone())
    }
}

/// BGP Role capability - RFC 9234
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BgpRoleCapability {
    /// The BGP Role of this speaker
    pub role: BgpRole,
}

/// BGP Role values - RFC 9234, Section 4.1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BgpRole {
    /// Provider (value 0)
    Provider = 0,
    /// Route Server (value 1)
    RouteServer = 1,
    /// Route Server Client (value 2)
    RouteServerClient = 2,
    /// Customer (value 3)
    Customer = 3,
    /// Peer (Lateral Peer) (value 4)
    Peer = 4,
}

impl TryFrom<u8> for BgpRole {
    type Error = WireError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(BgpRole::Provider),
            1 => Ok(BgpRole::RouteServer),
            2 => Ok(BgpRole::RouteServerClient),
            3 => Ok(BgpRole::Customer),
            4 => Ok(BgpRole::Peer),
            _ => Err(WireError::BadCaps(format!(
                "Unknown BGP Role value: {}",
                value
            ))),
        }
    }
}

impl BgpRoleCapability {
    /// Create a new BGP Role capability
    pub fn new(role: BgpRole) -> Self {
        Self { role }
    }

    /// Parse BGP Role capability from raw bytes - RFC 9234
    /// Format: 1 byte containing the role value
    #[cfg(feature = "parser")]
    pub fn parse(mut data: Bytes) -> Result<Self, WireError> {
        if data.len() != 1 {
            return Err(WireError::BadCaps(format!(
                "BGP Role capability length {} is not 1",
                data.len()
            )));
        }

        let role_u8 = data.read_u8()?;
        let role = BgpRole::try_from(role_u8)?;
        Ok(BgpRoleCapability::new(role))
    }

    /// Encode BGP Role capability to raw bytes - RFC 9234
    #[cfg(feature = "parser")]
    pub fn encode(&self) -> Bytes {
        let mut bytes = BytesMut::with_capacity(1);
        bytes.put_u8(self.role as u8);
        bytes.freeze()
    }

    /// RFC 9234 Section 4.2: roles only intersect when they form one of the valid
    /// provider/customer, peer/peer, or route-server/route-server-client pairings.
    pub fn intersect(&self, other: &Self) -> Option<Self> {
        use BgpRole::*;
        let valid = matches!(
            (self.role, other.role),
            (Provider, Customer)
                | (Customer, Provider)
                | (Peer, Peer)
                | (RouteServer, RouteServerClient)
                | (RouteServerClient, RouteServer)
        );
        valid.then(|| self.clone())
    }
}
