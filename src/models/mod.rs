//! Wire-format types shared by the codec and the pipeline: BGP messages, path
//! attributes, capabilities, and the network primitives (AFI/SAFI, ASN, prefixes)
//! they're built from.

pub mod bgp;
pub mod network;

pub use bgp::*;
pub use network::*;
