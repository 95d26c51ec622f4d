//! BGP messages and relevant structs.

pub mod aspath;
pub mod attributes;
pub mod capabilities;
pub mod community;
#[cfg(feature = "flowspec")]
pub mod flowspec;
pub mod notification;

pub use attributes::*;
pub use community::*;
pub use notification::*;

use crate::models::network::*;
use capabilities::{
    AddPathCapability, BgpCapabilityType, BgpExtendedMessageCapability, BgpRoleCapability,
    ExtendedNextHopCapability, FourOctetAsCapability, GracefulRestartCapability,
    MultiprotocolExtensionsCapability, RouteRefreshCapability,
};
use num_enum::{IntoPrimitive, TryFromPrimitive};
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

pub type BgpIdentifier = Ipv4Addr;

#[derive(Debug, TryFromPrimitive, IntoPrimitive, Copy, Clone, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum BgpMessageType {
    OPEN = 1,
    UPDATE = 2,
    NOTIFICATION = 3,
    KEEPALIVE = 4,
    ROUTE_REFRESH = 5,
}

// https://tools.ietf.org/html/rfc4271#section-4
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BgpMessage {
    Open(BgpOpenMessage),
    Update(BgpUpdateMessage),
    Notification(BgpNotificationMessage),
    KeepAlive,
    RouteRefresh(BgpRouteRefreshMessage),
}

impl BgpMessage {
    pub const fn msg_type(&self) -> BgpMessageType {
        match self {
            BgpMessage::Open(_) => BgpMessageType::OPEN,
            BgpMessage::Update(_) => BgpMessageType::UPDATE,
            BgpMessage::Notification(_) => BgpMessageType::NOTIFICATION,
            BgpMessage::KeepAlive => BgpMessageType::KEEPALIVE,
            BgpMessage::RouteRefresh(_) => BgpMessageType::ROUTE_REFRESH,
        }
    }
}

/// RFC 2918 Route Refresh message: just an (AFI, SAFI) pair naming the family to refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BgpRouteRefreshMessage {
    pub afi: Afi,
    pub safi: Safi,
}

/// BGP Open Message
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
///  +-+-+-+-+-+-+-+-+
///  |    Version    |
///  +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///  |     My Autonomous System      |
///  +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///  |           Hold Time           |
///  +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///  |                         BGP Identifier                        |
///  +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///  | Opt Parm Len  |
///  +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///  |                                                               |
///  |             Optional Parameters (variable)                    |
///  |                                                               |
///  +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BgpOpenMessage {
    pub version: u8,
    pub asn: Asn,
    pub hold_time: u16,
    pub sender_ip: Ipv4Addr,
    pub extended_length: bool,
    pub opt_params: Vec<OptParam>,
}

impl BgpOpenMessage {
    /// Iterates over the capabilities carried in this OPEN's optional parameters, skipping
    /// any raw (non-capability) optional parameters.
    pub fn capabilities(&self) -> impl Iterator<Item = &Capability> {
        self.opt_params.iter().filter_map(|p| match &p.param_value {
            ParamValue::Capability(cap) => Some(cap),
            ParamValue::Raw(_) => None,
        })
    }

    /// Builds the capability set keyed by [`CapKey`], as used for intersection (spec.md §4.4).
    /// When a key appears more than once, the last occurrence wins.
    pub fn capability_set(&self) -> std::collections::HashMap<CapKey, Capability> {
        self.capabilities()
            .map(|cap| (CapKey::for_capability(cap), cap.clone()))
            .collect()
    }
}

/// Key used to group capabilities for intersection: the capability code, plus - for
/// Multiprotocol Extensions (RFC 2858), which a peer may advertise once per AFI/SAFI pair -
/// the AFI/SAFI that disambiguates repeated instances of the same code. Every other capability
/// is singleton per code, so its AFI/SAFI components are zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CapKey(u8, u16, u8);

impl CapKey {
    pub fn for_capability(cap: &Capability) -> Self {
        match &cap.value {
            CapabilityValue::MultiprotocolExtensions(mp) => {
                CapKey(u8::from(cap.ty), u16::from(mp.afi), u8::from(mp.safi))
            }
            _ => CapKey(u8::from(cap.ty), 0, 0),
        }
    }

    pub fn singleton(code: BgpCapabilityType) -> Self {
        CapKey(u8::from(code), 0, 0)
    }
}

/// Computes the capability intersection of two observed OPEN messages: for each key present
/// in both, the two values are combined via [`CapabilityValue::intersect`]; if that returns
/// `None`, the receiver's (`theirs`) value is kept instead, matching the "intersection
/// replaces the Pipe's global Caps" rule.
pub fn intersect_capability_sets(
    ours: &BgpOpenMessage,
    theirs: &BgpOpenMessage,
) -> std::collections::HashMap<CapKey, Capability> {
    let ours = ours.capability_set();
    let theirs = theirs.capability_set();

    ours.into_iter()
        .filter_map(|(key, mine)| {
            let theirs_cap = theirs.get(&key)?;
            let combined = mine.intersect(theirs_cap).unwrap_or_else(|| theirs_cap.clone());
            Some((key, combined))
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OptParam {
    pub param_type: u8,
    pub param_len: u16,
    pub param_value: ParamValue,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ParamValue {
    Raw(Vec<u8>),
    Capability(Capability),
}

/// BGP Capability.
///
/// - RFC3392: <https://datatracker.ietf.org/doc/html/rfc3392>
/// - Capability codes: <https://www.iana.org/assignments/capability-codes/capability-codes.xhtml#capability-codes-2>
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Capability {
    pub ty: BgpCapabilityType,
    pub value: CapabilityValue,
}

/// Parsed BGP capability values
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CapabilityValue {
    /// Raw unparsed capability data
    Raw(Vec<u8>),
    /// Multiprotocol Extensions capability - RFC 2858, Section 7
    MultiprotocolExtensions(MultiprotocolExtensionsCapability),
    /// Route Refresh capability - RFC 2918
    RouteRefresh(RouteRefreshCapability),
    /// Extended Next Hop capability - RFC 8950, Section 3
    ExtendedNextHop(ExtendedNextHopCapability),
    /// Extended Message capability - RFC 8654
    BgpExtendedMessage(BgpExtendedMessageCapability),
    /// Graceful Restart capability - RFC 4724
    GracefulRestart(GracefulRestartCapability),
    /// 4-octet AS number capability - RFC 6793
    FourOctetAs(FourOctetAsCapability),
    /// ADD-PATH capability - RFC 7911
    AddPath(AddPathCapability),
    /// BGP Role capability - RFC 9234
    BgpRole(BgpRoleCapability),
}

impl CapabilityValue {
    /// Combines a locally observed capability value with the same-coded value the peer
    /// advertised. Unknown/raw values intersect by byte equality; known variants delegate
    /// to their own `intersect`.
    pub fn intersect(&self, other: &Self) -> Option<Self> {
        match (self, other) {
            (CapabilityValue::Raw(a), CapabilityValue::Raw(b)) => {
                (a == b).then(|| CapabilityValue::Raw(a.clone()))
            }
            (
                CapabilityValue::MultiprotocolExtensions(a),
                CapabilityValue::MultiprotocolExtensions(b),
            ) => a.intersect(b).map(CapabilityValue::MultiprotocolExtensions),
            (CapabilityValue::RouteRefresh(a), CapabilityValue::RouteRefresh(b)) => {
                a.intersect(b).map(CapabilityValue::RouteRefresh)
            }
            (CapabilityValue::ExtendedNextHop(a), CapabilityValue::ExtendedNextHop(b)) => {
                a.intersect(b).map(CapabilityValue::ExtendedNextHop)
            }
            (CapabilityValue::BgpExtendedMessage(a), CapabilityValue::BgpExtendedMessage(b)) => {
                a.intersect(b).map(CapabilityValue::BgpExtendedMessage)
            }
            (CapabilityValue::GracefulRestart(a), CapabilityValue::GracefulRestart(b)) => {
                a.intersect(b).map(CapabilityValue::GracefulRestart)
            }
            (CapabilityValue::FourOctetAs(a), CapabilityValue::FourOctetAs(b)) => {
                a.intersect(b).map(CapabilityValue::FourOctetAs)
            }
            (CapabilityValue::AddPath(a), CapabilityValue::AddPath(b)) => {
                a.intersect(b).map(CapabilityValue::AddPath)
            }
            (CapabilityValue::BgpRole(a), CapabilityValue::BgpRole(b)) => {
                a.intersect(b).map(CapabilityValue::BgpRole)
            }
            // Mismatched variants under the same code never happen in practice (the code
            // determines the variant); treat as no agreement.
            _ => None,
        }
    }
}

impl Capability {
    /// Intersects two capabilities advertised under the same code. Panics in debug builds
    /// if the codes differ, since callers are expected to have already grouped by code.
    pub fn intersect(&self, other: &Self) -> Option<Self> {
        debug_assert_eq!(self.ty, other.ty);
        self.value.intersect(&other.value).map(|value| Capability {
            ty: self.ty,
            value,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
/// BGP Update Message.
///
/// Corresponding RFC section: <https://datatracker.ietf.org/doc/html/rfc4271#section-4.3>
pub struct BgpUpdateMessage {
    /// Withdrawn prefixes in this update message.
    ///
    /// **IMPORTANT:** Do **not** access this field directly in order to get all withdrawn prefixes.
    /// Some withdrawn prefixes may be present in the [`AttributeValue::MpUnreachNlri`] attribute,
    /// and will **not** be included here. Accessing this field directly may cause you to miss
    /// IPv6 or multi-protocol prefixes.
    ///
    /// Call [`BgpUpdateMessage::all_unreach`] instead to get the full set.
    ///
    /// See
    /// * RFC4271 Section 4.3: <https://datatracker.ietf.org/doc/html/rfc4271#section-4.3>
    /// * RFC4760 Section 4: <https://datatracker.ietf.org/doc/html/rfc4760#section-4>
    pub withdrawn_prefixes: Vec<NetworkPrefix>,

    /// BGP path attributes.
    pub attributes: Attributes,

    /// Network prefixes that are being advertised in this update message.
    ///
    /// **IMPORTANT:** Do **not** access this field directly in order to get all announced prefixes.
    /// Some advertised prefixes may be present in the [`AttributeValue::MpReachNlri`] attribute,
    /// and will **not** be included here. Accessing this field directly may cause you to miss
    /// IPv6 or multi-protocol prefixes.
    ///
    /// Call [`BgpUpdateMessage::all_reach`] instead to get the full set.
    ///
    /// See
    ///
    /// * RFC4271 Section 4.3: <https://datatracker.ietf.org/doc/html/rfc4271#section-4.3>
    /// * RFC4760 Section 3: <https://datatracker.ietf.org/doc/html/rfc4760#section-3>
    pub announced_prefixes: Vec<NetworkPrefix>,

    /// Cached, invalidation-counted concatenation backing [`all_reach`]/[`all_unreach`].
    ///
    /// [`all_reach`]: BgpUpdateMessage::all_reach
    /// [`all_unreach`]: BgpUpdateMessage::all_unreach
    #[cfg_attr(feature = "serde", serde(skip))]
    effective_cache: EffectiveCache,
}

/// Generation-counted cache for the concatenated reachable/unreachable prefix lists. Never
/// participates in equality or cloning: two updates with the same fields are equal and clone
/// identically regardless of whether either has already computed its effective prefix list.
#[derive(Debug, Default)]
struct EffectiveCache {
    generation: AtomicU64,
    reach: Mutex<Option<(u64, Vec<NetworkPrefix>)>>,
    unreach: Mutex<Option<(u64, Vec<NetworkPrefix>)>>,
}

impl Clone for EffectiveCache {
    fn clone(&self) -> Self {
        EffectiveCache::default()
    }
}

impl PartialEq for EffectiveCache {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

impl Eq for EffectiveCache {}

impl BgpUpdateMessage {
    /// Invalidates the cached effective reachable/unreachable prefix lists. Call this after
    /// mutating `withdrawn_prefixes`, `announced_prefixes`, or `attributes` directly -
    /// otherwise `all_reach`/`all_unreach` keep serving a stale concatenation.
    pub fn invalidate_cache(&self) {
        self.effective_cache.generation.fetch_add(1, Ordering::AcqRel);
    }

    /// The full set of prefixes this update announces: `announced_prefixes` (implicitly
    /// IPv4/unicast) concatenated with MP_REACH_NLRI's prefixes, if present.
    pub fn all_reach(&self) -> Vec<NetworkPrefix> {
        Self::effective(
            &self.effective_cache.generation,
            &self.effective_cache.reach,
            || {
                let mut all = self.announced_prefixes.clone();
                if let Some(nlri) = self.attributes.get_reachable() {
                    all.extend(nlri.prefixes.iter().copied());
                }
                all
            },
        )
    }

    /// The full set of prefixes this update withdraws: `withdrawn_prefixes` (implicitly
    /// IPv4/unicast) concatenated with MP_UNREACH_NLRI's prefixes, if present.
    pub fn all_unreach(&self) -> Vec<NetworkPrefix> {
        Self::effective(
            &self.effective_cache.generation,
            &self.effective_cache.unreach,
            || {
                let mut all = self.withdrawn_prefixes.clone();
                if let Some(nlri) = self.attributes.get_unreachable() {
                    all.extend(nlri.prefixes.iter().copied());
                }
                all
            },
        )
    }

    fn effective(
        generation: &AtomicU64,
        cache: &Mutex<Option<(u64, Vec<NetworkPrefix>)>>,
        compute: impl FnOnce() -> Vec<NetworkPrefix>,
    ) -> Vec<NetworkPrefix> {
        let current_gen = generation.load(Ordering::Acquire);
        let mut cache = cache.lock().unwrap();
        if let Some((cached_gen, prefixes)) = cache.as_ref() {
            if *cached_gen == current_gen {
                return prefixes.clone();
            }
        }

        let computed = compute();
        *cache = Some((current_gen, computed.clone()));
        computed
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BgpNotificationMessage {
    pub error: BgpError,
    pub data: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_type() {
        let open = BgpMessage::Open(BgpOpenMessage {
            version: 4,
            asn: Asn::new_32bit(1),
            hold_time: 180,
            sender_ip: Ipv4Addr::new(192, 0, 2, 1),
            extended_length: false,
            opt_params: vec![],
        });
        assert_eq!(open.msg_type(), BgpMessageType::OPEN);

        let update = BgpMessage::Update(BgpUpdateMessage::default());
        assert_eq!(update.msg_type(), BgpMessageType::UPDATE);

        let notification = BgpMessage::Notification(BgpNotificationMessage {
            error: BgpError::Unknown(0, 0),
            data: vec![],
        });
        assert_eq!(notification.msg_type(), BgpMessageType::NOTIFICATION);

        let keepalive = BgpMessage::KeepAlive;
        assert_eq!(keepalive.msg_type(), BgpMessageType::KEEPALIVE);
    }
}
