/*!
A bidirectional BGP message pipeline: wire-format codec plus a concurrent, callback-driven
processing pipe sitting between two peers.

The crate has two halves:

- [`codec`] turns bytes off the wire into typed [`models::bgp::BgpMessage`] values and back,
  covering RFC 4271 OPEN/UPDATE/NOTIFICATION/KEEPALIVE framing and RFC 2918 ROUTE-REFRESH.
  [`models`] holds the message, attribute, capability, and network-primitive types the codec
  produces and consumes.
- [`pipe`] wires two directions of traffic (what was sent, what was received) into a [`pipe::Pipe`]:
  each direction is a [`pipe::Line`] made of one or more [`pipe::Input`]s, every inbound message
  runs through a per-Input, per-message-type ordered chain of [`pipe::Callback`]s, and session
  lifecycle transitions (OPEN seen, session alive, session established, end-of-RIB) are published
  on a shared [`pipe::EventBus`] that [`pipe::Handler`]s subscribe to.

# Example

```no_run
use bgp_pipe::pipe::{CallbackFilter, Direction, Options, Pipe};
use std::io::Write;

# async fn run() {
let pipe = Pipe::new(Options::default());
pipe.start().unwrap();

let input = pipe.attach_input(Direction::R, &[], false, CallbackFilter::all());
input.write_bytes(&[0xffu8; 19]).await.ok();
# }
```

# RFCs Supported

- [RFC 4271](https://datatracker.ietf.org/doc/html/rfc4271): A Border Gateway Protocol 4 (BGP-4)
- [RFC 2918](https://datatracker.ietf.org/doc/html/rfc2918): Route Refresh Capability for BGP-4
- [RFC 3392](https://datatracker.ietf.org/doc/html/rfc3392) / [RFC 5492](https://datatracker.ietf.org/doc/html/rfc5492): Capabilities Advertisement with BGP-4
- [RFC 4760](https://datatracker.ietf.org/doc/html/rfc4760): Multiprotocol Extensions for BGP-4
- [RFC 4724](https://datatracker.ietf.org/doc/html/rfc4724): Graceful Restart Mechanism for BGP
- [RFC 6793](https://datatracker.ietf.org/doc/html/rfc6793): BGP Support for Four-Octet AS Number Space
- [RFC 7606](https://datatracker.ietf.org/doc/html/rfc7606): Revised Error Handling for BGP UPDATE Messages
- [RFC 7911](https://datatracker.ietf.org/doc/html/rfc7911): Advertisement of Multiple Paths in BGP (ADD-PATH)
- [RFC 8654](https://datatracker.ietf.org/doc/html/rfc8654): Extended Message Support for BGP
- [RFC 8950](https://datatracker.ietf.org/doc/html/rfc8950): Advertising IPv4 NLRI with an IPv6 Next Hop
- [RFC 9072](https://datatracker.ietf.org/doc/html/rfc9072): Extended Optional Parameters Length for BGP OPEN
- [RFC 9234](https://datatracker.ietf.org/doc/html/rfc9234): Route Leak Prevention and Detection Using Roles
- [RFC 8955](https://datatracker.ietf.org/doc/html/rfc8955) / [RFC 8956](https://datatracker.ietf.org/doc/html/rfc8956): Dissemination of Flow Specification Rules (behind the `flowspec` feature)
*/

pub mod codec;
pub mod error;
pub mod models;
pub mod pipe;

pub use error::{LifecycleError, WireError};
pub use pipe::{Options, Pipe};
