//! The [`Message`] envelope that flows through a [`super::line::Line`]: a raw or parsed BGP
//! message plus the per-message processing context (action bits, callback cursor, tags).

use crate::models::bgp::BgpMessage;
use crate::pipe::Direction;
use bitflags::bitflags;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

bitflags! {
    /// Accumulated on a message's [`MessageContext`] as callbacks run; combines with a
    /// callback's truthy/falsy return to decide whether the message keeps moving.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Action: u8 {
        /// Keep running the remaining callbacks (the default, value zero).
        const CONTINUE = 0;
        /// Opt this message out of pool recycling; the caller intends to retain it.
        const BORROW   = 0b0001;
        /// Stop the callback chain immediately and do not forward the message.
        const DROP     = 0b0010;
        /// Stop the callback chain but forward the message as-is.
        const ACCEPT   = 0b0100;
    }
}

/// The wire-format message type, mirroring `spec.md`'s six-way split (the codec's
/// [`crate::models::bgp::BgpMessageType`] only covers the four RFC 4271 base types plus
/// route-refresh; `Invalid` exists only on this side, for payloads that failed to parse).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageType {
    Open = 0,
    Update = 1,
    Notify = 2,
    KeepAlive = 3,
    Refresh = 4,
    Invalid = 5,
}

pub const MESSAGE_TYPE_COUNT: usize = 6;

impl MessageType {
    pub const ALL: [MessageType; MESSAGE_TYPE_COUNT] = [
        MessageType::Open,
        MessageType::Update,
        MessageType::Notify,
        MessageType::KeepAlive,
        MessageType::Refresh,
        MessageType::Invalid,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

impl From<crate::models::bgp::BgpMessageType> for MessageType {
    fn from(ty: crate::models::bgp::BgpMessageType) -> Self {
        use crate::models::bgp::BgpMessageType as Wire;
        match ty {
            Wire::OPEN => MessageType::Open,
            Wire::UPDATE => MessageType::Update,
            Wire::NOTIFICATION => MessageType::Notify,
            Wire::KEEPALIVE => MessageType::KeepAlive,
            Wire::ROUTE_REFRESH => MessageType::Refresh,
        }
    }
}

/// The raw payload buffer backing a [`Message`]: either a caller-owned copy, or a cheaply
/// cloned handle the caller supplied directly (the structured/MRT-bridge ingress path).
/// `Bytes` is itself a refcounted immutable buffer, so "ref" here means "shares the original
/// allocation with the caller" rather than "borrows caller memory" the way a raw pointer would.
#[derive(Debug, Clone)]
pub enum RawData {
    Ref(Bytes),
    Owned(Bytes),
}

impl RawData {
    pub fn bytes(&self) -> &Bytes {
        match self {
            RawData::Ref(b) | RawData::Owned(b) => b,
        }
    }

    pub fn is_ref(&self) -> bool {
        matches!(self, RawData::Ref(_))
    }

    /// Promotes a `Ref` to an `Owned` copy of the same bytes (spec.md's `CopyData`
    /// operation). A no-op if already owned.
    pub fn copy_data(&mut self) {
        if let RawData::Ref(b) = self {
            *self = RawData::Owned(Bytes::copy_from_slice(b));
        }
    }
}

/// Per-message processing envelope: which Input it belongs to, the accumulating [`Action`]
/// bits, the cursor into the frozen per-type callback slice, and an arbitrary tag map.
///
/// The owning Pipe/Line/Input named in spec.md §3 are not stored here as back-references;
/// the processor task that drives a message already holds `Arc` handles to all three and
/// passes them down the call stack explicitly, which avoids a reference cycle through the
/// message pool.
#[derive(Debug, Default)]
pub struct MessageContext {
    pub action: Action,
    pub cursor: usize,
    pub current_callback: Option<u64>,
    pub tags: HashMap<String, String>,
}

impl MessageContext {
    pub fn reset(&mut self) {
        self.action = Action::CONTINUE;
        self.cursor = 0;
        self.current_callback = None;
        self.tags.clear();
    }
}

/// One message in flight through a Line: raw bytes, an optional parsed view, and its
/// processing context.
///
/// Invariant: at most one of `raw`/`parsed` is authoritative for re-serialisation purposes.
/// Parsing populates `parsed` without discarding `raw`. Mutating `parsed` (via
/// [`Message::set_parsed`]) drops `raw`, which forces re-serialisation through the codec.
#[derive(Debug)]
pub struct Message {
    pub direction: Direction,
    pub seq: u64,
    pub timestamp: DateTime<Utc>,
    pub msg_type: MessageType,
    raw: Option<RawData>,
    parsed: Option<BgpMessage>,
    pub ctx: MessageContext,
}

impl Message {
    pub fn new(direction: Direction) -> Self {
        Message {
            direction,
            seq: 0,
            timestamp: Utc::now(),
            msg_type: MessageType::Invalid,
            raw: None,
            parsed: None,
            ctx: MessageContext::default(),
        }
    }

    pub fn raw(&self) -> Option<&RawData> {
        self.raw.as_ref()
    }

    pub fn parsed(&self) -> Option<&BgpMessage> {
        self.parsed.as_ref()
    }

    pub fn is_parsed(&self) -> bool {
        self.parsed.is_some()
    }

    pub fn set_raw(&mut self, raw: RawData, msg_type: MessageType) {
        self.raw = Some(raw);
        self.msg_type = msg_type;
    }

    /// Populates the parsed view from the raw buffer without discarding `raw` - both remain
    /// valid, since nothing was mutated yet.
    pub fn set_parsed_from_wire(&mut self, parsed: BgpMessage) {
        self.parsed = Some(parsed);
    }

    /// A callback-driven mutation of the parsed view: drops `raw`, marking the message
    /// "must re-serialise" the next time it's written out.
    pub fn set_parsed(&mut self, parsed: BgpMessage) {
        self.parsed = Some(parsed);
        self.raw = None;
    }

    pub fn parsed_mut(&mut self) -> Option<&mut BgpMessage> {
        self.parsed.as_mut()
    }

    pub fn must_reserialize(&self) -> bool {
        self.raw.is_none()
    }

    /// Resets a message to its pristine state before it's reissued from the pool.
    fn reset(&mut self) {
        self.seq = 0;
        self.timestamp = Utc::now();
        self.msg_type = MessageType::Invalid;
        self.raw = None;
        self.parsed = None;
        self.ctx.reset();
    }
}

/// A concurrent free-list of [`Message`] envelopes, opaque to users beyond [`Pool::get`] and
/// [`Pool::put`]. Messages tagged `Action::BORROW` when they leave the chain must never be
/// `put` back - the caller owns them from that point on.
#[derive(Debug, Default)]
pub struct Pool {
    free: Mutex<Vec<Box<Message>>>,
}

impl Pool {
    pub fn new() -> Self {
        Pool::default()
    }

    pub fn get(&self, direction: Direction) -> Box<Message> {
        if let Some(mut msg) = self.free.lock().unwrap().pop() {
            msg.reset();
            msg.direction = direction;
            msg
        } else {
            Box::new(Message::new(direction))
        }
    }

    pub fn put(&self, msg: Box<Message>) {
        self.free.lock().unwrap().push(msg);
    }
}
