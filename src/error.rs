/*!
Error taxonomy for the BGP wire codec and pipeline lifecycle.

Wire errors are raised while decoding a single BGP message off the byte stream; they
never carry partial application state. Lifecycle errors describe a `Pipe` or `Input`
being used outside the state it's in. Callback filter errors are deliberately untyped:
they're arbitrary strings a callback attaches to an event to explain why it dropped
or rejected a message.
*/
use std::fmt::{Display, Formatter};
use std::{error::Error, fmt, io};

/// Errors raised while decoding or encoding a single BGP message.
#[derive(Debug)]
pub enum WireError {
    /// Fewer bytes are available than the header or a field declares.
    ShortRead { expected: usize, available: usize },
    /// The 16-byte marker is not all-ones.
    BadMarker,
    /// The declared message length is outside `[19, 4096]` (or `[19, 65535]` under the
    /// extended message length capability).
    BadLength(u16),
    /// An OPEN message declared a BGP version this crate doesn't speak.
    BadVersion(u8),
    /// An OPEN message's optional parameters didn't parse: a parameter's declared length
    /// runs past the end of the optional parameters block.
    BadParams(String),
    /// A capability TLV's declared length didn't match what its type expects.
    BadCaps(String),
    /// An UPDATE message's path attributes didn't parse: a bad flag/length/value combination.
    BadAttrs(String),
    /// A well-known singleton attribute (RFC 4271 Section 6.3) appeared more than once.
    DupAttr(String),
    /// An MP_REACH_NLRI/MP_UNREACH_NLRI AFI/SAFI pair this crate doesn't decode.
    BadAddressFamily { afi: u16, safi: u8 },
    /// A field decoded syntactically but holds a value RFC 4271 forbids.
    BadValue(String),
    Io(io::Error),
}

impl Display for WireError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            WireError::ShortRead {
                expected,
                available,
            } => write!(f, "short read: needed {expected} bytes, had {available}"),
            WireError::BadMarker => write!(f, "bad marker: expected 16 bytes of 0xff"),
            WireError::BadLength(len) => write!(f, "bad message length: {len}"),
            WireError::BadVersion(v) => write!(f, "unsupported BGP version: {v}"),
            WireError::BadParams(s) => write!(f, "bad optional parameters: {s}"),
            WireError::BadCaps(s) => write!(f, "bad capability: {s}"),
            WireError::BadAttrs(s) => write!(f, "bad path attribute: {s}"),
            WireError::DupAttr(s) => write!(f, "duplicate attribute: {s}"),
            WireError::BadAddressFamily { afi, safi } => {
                write!(f, "unsupported address family: afi={afi} safi={safi}")
            }
            WireError::BadValue(s) => write!(f, "bad value: {s}"),
            WireError::Io(e) => write!(f, "io error: {e}"),
        }
    }
}

impl Error for WireError {}

impl From<io::Error> for WireError {
    fn from(e: io::Error) -> Self {
        WireError::Io(e)
    }
}

/// Errors raised when a `Pipe` or `Input` is used outside the state it's in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleError {
    /// `Pipe::start` called on a pipe that's already running.
    Started,
    /// An operation that requires a running pipe was attempted on one that's stopped.
    Stopped,
    /// A write was attempted on an `Input` whose byte stream has already been closed.
    InputClosed,
    /// A read was attempted on a `Line` whose out-channel has already been closed.
    OutputClosed,
}

impl Display for LifecycleError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleError::Started => write!(f, "pipe already started"),
            LifecycleError::Stopped => write!(f, "pipe is stopped"),
            LifecycleError::InputClosed => write!(f, "input is closed"),
            LifecycleError::OutputClosed => write!(f, "output is closed"),
        }
    }
}

impl Error for LifecycleError {}
