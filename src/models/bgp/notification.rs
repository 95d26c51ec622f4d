//! BGP NOTIFICATION error code / subcode, carried on [`super::BgpNotificationMessage`].
//!
//! <https://datatracker.ietf.org/doc/html/rfc4271#section-4.5>
//! <https://datatracker.ietf.org/doc/html/rfc4271#section-6>

use num_enum::{IntoPrimitive, TryFromPrimitive};

#[allow(non_camel_case_types)]
#[derive(Debug, TryFromPrimitive, IntoPrimitive, PartialEq, Eq, Copy, Clone, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum MessageHeaderErrorSubcode {
    ConnectionNotSynchronized = 1,
    BadMessageLength = 2,
    BadMessageType = 3,
}

#[allow(non_camel_case_types)]
#[derive(Debug, TryFromPrimitive, IntoPrimitive, PartialEq, Eq, Copy, Clone, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum OpenMessageErrorSubcode {
    UnsupportedVersionNumber = 1,
    BadPeerAs = 2,
    BadBgpIdentifier = 3,
    UnsupportedOptionalParameter = 4,
    /// Deprecated in RFC 4271; kept for round-tripping older captures.
    AuthenticationFailure = 5,
    UnacceptableHoldTime = 6,
    UnsupportedCapability = 7,
    RoleMismatch = 11,
}

#[allow(non_camel_case_types)]
#[derive(Debug, TryFromPrimitive, IntoPrimitive, PartialEq, Eq, Copy, Clone, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum UpdateMessageErrorSubcode {
    MalformedAttributeList = 1,
    UnrecognizedWellKnownAttribute = 2,
    MissingWellKnownAttribute = 3,
    AttributeFlagsError = 4,
    AttributeLengthError = 5,
    InvalidOriginAttribute = 6,
    /// Deprecated in RFC 4271.
    AsRoutingLoop = 7,
    InvalidNextHopAttribute = 8,
    OptionalAttributeError = 9,
    InvalidNetworkField = 10,
    MalformedAsPath = 11,
}

#[allow(non_camel_case_types)]
#[derive(Debug, TryFromPrimitive, IntoPrimitive, PartialEq, Eq, Copy, Clone, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum FiniteStateMachineErrorSubcode {
    UnspecifiedError = 0,
    ReceiveUnexpectedMessageInOpenSent = 1,
    ReceiveUnexpectedMessageInOpenConfirm = 2,
    ReceiveUnexpectedMessageInEstablished = 3,
}

#[allow(non_camel_case_types)]
#[derive(Debug, TryFromPrimitive, IntoPrimitive, PartialEq, Eq, Copy, Clone, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum CeaseErrorSubcode {
    MaxNumberOfPrefixesReached = 1,
    AdministrativeShutdown = 2,
    PeerDeConfigured = 3,
    AdministrativeReset = 4,
    ConnectionRejected = 5,
    OtherConfigurationChange = 6,
    ConnectionCollisionResolution = 7,
    OutOfResources = 8,
    HardReset = 9,
    BfdDown = 10,
}

/// The error code / subcode pair a BGP NOTIFICATION message carries.
///
/// `Unknown` preserves any code/subcode combination this crate doesn't otherwise model,
/// so a NOTIFICATION round-trips even when peers use vendor-specific subcodes.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BgpError {
    MessageHeaderError(MessageHeaderErrorSubcode),
    OpenMessageError(OpenMessageErrorSubcode),
    UpdateMessageError(UpdateMessageErrorSubcode),
    HoldTimerExpired,
    FiniteStateMachineError(FiniteStateMachineErrorSubcode),
    Cease(CeaseErrorSubcode),
    Unknown(u8, u8),
}

impl BgpError {
    pub fn code(&self) -> u8 {
        match self {
            BgpError::MessageHeaderError(_) => 1,
            BgpError::OpenMessageError(_) => 2,
            BgpError::UpdateMessageError(_) => 3,
            BgpError::HoldTimerExpired => 4,
            BgpError::FiniteStateMachineError(_) => 5,
            BgpError::Cease(_) => 6,
            BgpError::Unknown(code, _) => *code,
        }
    }

    pub fn subcode(&self) -> u8 {
        match self {
            BgpError::MessageHeaderError(s) => (*s).into(),
            BgpError::OpenMessageError(s) => (*s).into(),
            BgpError::UpdateMessageError(s) => (*s).into(),
            BgpError::HoldTimerExpired => 0,
            BgpError::FiniteStateMachineError(s) => (*s).into(),
            BgpError::Cease(s) => (*s).into(),
            BgpError::Unknown(_, subcode) => *subcode,
        }
    }

    pub fn from_code_subcode(code: u8, subcode: u8) -> BgpError {
        match code {
            1 => MessageHeaderErrorSubcode::try_from(subcode)
                .map(BgpError::MessageHeaderError)
                .unwrap_or(BgpError::Unknown(code, subcode)),
            2 => OpenMessageErrorSubcode::try_from(subcode)
                .map(BgpError::OpenMessageError)
                .unwrap_or(BgpError::Unknown(code, subcode)),
            3 => UpdateMessageErrorSubcode::try_from(subcode)
                .map(BgpError::UpdateMessageError)
                .unwrap_or(BgpError::Unknown(code, subcode)),
            4 => BgpError::HoldTimerExpired,
            5 => FiniteStateMachineErrorSubcode::try_from(subcode)
                .map(BgpError::FiniteStateMachineError)
                .unwrap_or(BgpError::Unknown(code, subcode)),
            6 => CeaseErrorSubcode::try_from(subcode)
                .map(BgpError::Cease)
                .unwrap_or(BgpError::Unknown(code, subcode)),
            _ => BgpError::Unknown(code, subcode),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_known_codes() {
        let err = BgpError::Cease(CeaseErrorSubcode::AdministrativeShutdown);
        assert_eq!(err.code(), 6);
        assert_eq!(err.subcode(), 2);
        assert_eq!(BgpError::from_code_subcode(6, 2), err);
    }

    #[test]
    fn preserves_unknown_subcodes() {
        let err = BgpError::from_code_subcode(6, 200);
        assert_eq!(err, BgpError::Unknown(6, 200));
    }

    #[test]
    fn preserves_unknown_codes() {
        let err = BgpError::from_code_subcode(99, 1);
        assert_eq!(err, BgpError::Unknown(99, 1));
    }
}
