//! The bidirectional message pipeline (spec.md §3-§5): a [`Pipe`] owns two [`Line`]s (local
//! and remote), a shared [`EventBus`], and a [`message::Pool`] of recycled envelopes.

pub mod callback;
pub mod event;
pub mod line;
pub mod message;
mod observer;

pub use callback::{Callback, CallbackChain, CallbackFilter, CallbackFn, FilterOp};
pub use event::{Event, EventBus, EventHandle, Handler, HandlerFn};
pub use line::{Input, Line};
pub use message::{Action, Message, MessageContext, MessageType, Pool, RawData};

use crate::codec::update::UpdateCodecOptions;
use crate::error::LifecycleError;
use crate::models::bgp::capabilities::BgpCapabilityType;
use crate::models::bgp::{intersect_capability_sets, CapKey, Capability, CapabilityValue};
use crate::models::network::AsnLength;
use bitflags::bitflags;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

/// Which side of the session a [`Line`]/[`Input`] carries traffic for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Locally originated traffic (what this process sends to the peer).
    L,
    /// Peer-originated traffic (what this process received from the peer).
    R,
}

impl Direction {
    pub const fn mask(self) -> DirectionMask {
        match self {
            Direction::L => DirectionMask::L,
            Direction::R => DirectionMask::R,
        }
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DirectionMask: u8 {
        const L = 0b01;
        const R = 0b10;
        const BOTH = Self::L.bits() | Self::R.bits();
    }
}

/// A logging sink [`Options`] can inject; defaults to [`NopLogger`]. Mirrors the `log` crate's
/// level taxonomy so a [`DefaultLogger`] can forward straight into it.
pub trait LogSink: Send + Sync {
    fn log(&self, level: log::Level, message: &str);
}

/// The default, silent sink.
#[derive(Debug, Default)]
pub struct NopLogger;

impl LogSink for NopLogger {
    fn log(&self, _level: log::Level, _message: &str) {}
}

/// Forwards into the `log` crate's global logger.
#[derive(Debug, Default)]
pub struct DefaultLogger;

impl LogSink for DefaultLogger {
    fn log(&self, level: log::Level, message: &str) {
        log::log!(level, "{message}");
    }
}

/// Construction-time knobs for a [`Pipe`]. `callbacks` are applied to every [`Input`] this
/// `Pipe` attaches via [`Pipe::attach_input`] (a per-Input chain is frozen at attach time, so
/// callbacks added afterwards only affect Inputs attached after that point); `handlers` are
/// registered on the shared [`EventBus`] up front, with more addable later via
/// [`Pipe::on_event`].
pub struct Options {
    pub log: Arc<dyn LogSink>,
    /// Bounded-channel capacity for every in-channel, out-channel, and the event bus.
    pub channel_capacity: usize,
    pub callbacks: Vec<Arc<Callback>>,
    pub handlers: Vec<Arc<Handler>>,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            log: Arc::new(NopLogger),
            channel_capacity: 10,
            callbacks: Vec::new(),
            handlers: Vec::new(),
        }
    }
}

/// State shared between both `Line`s: the message pool, the event bus, negotiated codec
/// options, and the session-wide capability intersection.
pub struct PipeShared {
    pub pool: Pool,
    pub events: Arc<EventBus>,
    pub log: Arc<dyn LogSink>,
    seq: AtomicU64,
    pub(crate) extended_message: AtomicBool,
    asn_four_byte: AtomicBool,
    add_path: AtomicBool,
    caps: RwLock<HashMap<CapKey, Capability>>,
}

impl PipeShared {
    pub(crate) fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::Relaxed)
    }

    pub(crate) fn codec_opts(&self) -> UpdateCodecOptions {
        UpdateCodecOptions {
            asn_len: if self.asn_four_byte.load(Ordering::Acquire) {
                AsnLength::Bits32
            } else {
                AsnLength::Bits16
            },
            add_path: self.add_path.load(Ordering::Acquire),
        }
    }

    /// The negotiated capability set as of the last ESTABLISHED detection, keyed by
    /// [`CapKey`]. Empty before the session reaches ESTABLISHED.
    pub fn negotiated_caps(&self) -> HashMap<CapKey, Capability> {
        self.caps.read().unwrap().clone()
    }

    fn apply_negotiated_caps(&self, caps: HashMap<CapKey, Capability>) {
        let four_octet_key = CapKey::singleton(BgpCapabilityType::SUPPORT_FOR_4_OCTET_AS_NUMBER_CAPABILITY);
        let add_path_key = CapKey::singleton(BgpCapabilityType::ADD_PATH_CAPABILITY);
        let extended_message_key = CapKey::singleton(BgpCapabilityType::BGP_EXTENDED_MESSAGE);

        self.asn_four_byte.store(
            matches!(
                caps.get(&four_octet_key).map(|c| &c.value),
                Some(CapabilityValue::FourOctetAs(_))
            ),
            Ordering::Release,
        );
        self.add_path.store(
            matches!(caps.get(&add_path_key).map(|c| &c.value), Some(CapabilityValue::AddPath(_))),
            Ordering::Release,
        );
        self.extended_message.store(
            matches!(
                caps.get(&extended_message_key).map(|c| &c.value),
                Some(CapabilityValue::BgpExtendedMessage(_))
            ),
            Ordering::Release,
        );

        *self.caps.write().unwrap() = caps;
    }
}

/// The top-level bidirectional pipeline: two `Line`s (local and remote), the shared state they
/// both read and mutate, and the `EventBus` dispatcher task.
pub struct Pipe {
    pub local: Arc<Line>,
    pub remote: Arc<Line>,
    shared: Arc<PipeShared>,
    default_callbacks: Vec<Arc<Callback>>,
    next_input_id: AtomicU64,
    started: AtomicBool,
}

impl Pipe {
    pub fn new(options: Options) -> Arc<Self> {
        let events = Arc::new(EventBus::new(options.channel_capacity));

        for handler in &options.handlers {
            events.register(handler.clone());
        }

        let shared = Arc::new(PipeShared {
            pool: Pool::new(),
            events: events.clone(),
            log: options.log.clone(),
            seq: AtomicU64::new(1),
            extended_message: AtomicBool::new(false),
            asn_four_byte: AtomicBool::new(false),
            add_path: AtomicBool::new(false),
            caps: RwLock::new(HashMap::new()),
        });

        let local = Line::new(Direction::L, shared.clone(), options.channel_capacity);
        let remote = Line::new(Direction::R, shared.clone(), options.channel_capacity);

        events.register(established_detector(shared.clone(), local.clone(), remote.clone()));

        Arc::new(Pipe {
            local,
            remote,
            shared,
            default_callbacks: options.callbacks,
            next_input_id: AtomicU64::new(1),
            started: AtomicBool::new(false),
        })
    }

    /// Spawns the event bus dispatcher and publishes `pipe.START`. Idempotent: calling this
    /// more than once returns `LifecycleError::Started` without spawning a second dispatcher.
    pub fn start(self: &Arc<Self>) -> Result<(), LifecycleError> {
        if self.started.swap(true, Ordering::AcqRel) {
            return Err(LifecycleError::Started);
        }
        let events = self.shared.events.clone();
        tokio::spawn(events.run());

        let publish_events = self.shared.events.clone();
        tokio::spawn(async move {
            publish_events.publish(event::kind::START, None, None, None, vec![]).await;
        });
        Ok(())
    }

    /// Closes both Lines' Inputs and publishes `pipe.STOP`.
    pub async fn stop(&self) -> Result<(), LifecycleError> {
        if !self.started.load(Ordering::Acquire) {
            return Err(LifecycleError::Stopped);
        }
        self.local.close_inputs();
        self.remote.close_inputs();
        self.shared.events.publish(event::kind::STOP, None, None, None, vec![]).await;
        Ok(())
    }

    /// Attaches a new Input to the given direction's Line, using this Pipe's default callback
    /// set plus any additional callbacks supplied here.
    pub fn attach_input(
        self: &Arc<Self>,
        direction: Direction,
        extra_callbacks: &[Arc<Callback>],
        reverse: bool,
        filter: CallbackFilter,
    ) -> Arc<Input> {
        let id = self.next_input_id.fetch_add(1, Ordering::Relaxed) as u32;
        let line = match direction {
            Direction::L => &self.local,
            Direction::R => &self.remote,
        };
        let callbacks: Vec<Arc<Callback>> = self
            .default_callbacks
            .iter()
            .cloned()
            .chain(extra_callbacks.iter().cloned())
            .collect();
        line.attach_input(id, &callbacks, reverse, filter, 10)
    }

    pub fn get_msg(&self, direction: Direction) -> Box<Message> {
        self.shared.pool.get(direction)
    }

    pub fn put_msg(&self, msg: Box<Message>) {
        self.shared.pool.put(msg);
    }

    pub fn on_event(&self, handler: Arc<Handler>) {
        self.shared.events.register(handler);
    }

    pub fn shared(&self) -> Arc<PipeShared> {
        self.shared.clone()
    }

    /// Feeds an already-parsed message from an external MRT/BMP reader straight into the
    /// named direction's first attached Input, skipping the wire codec entirely. The message
    /// re-serialises through the codec on its way out, since no raw bytes ever back it.
    #[cfg(feature = "mrt-bridge")]
    pub async fn write_from_mrt(
        &self,
        direction: Direction,
        parsed: crate::models::bgp::BgpMessage,
    ) -> Result<(), LifecycleError> {
        let line = match direction {
            Direction::L => &self.local,
            Direction::R => &self.remote,
        };
        let input = line.inputs().into_iter().next().ok_or(LifecycleError::InputClosed)?;
        let mut msg = self.shared.pool.get(direction);
        msg.msg_type = MessageType::from(parsed.msg_type());
        msg.set_parsed(parsed);
        input.write_msg(msg).await
    }
}

/// Builds the internal handler that detects session establishment: on every `pipe.ALIVE`, once
/// both Lines have recorded an OPEN, it intersects their capability sets, stores the result,
/// publishes `pipe.ESTABLISHED`, and drops itself (spec.md §4.4 / §9 Open Question (a)).
fn established_detector(shared: Arc<PipeShared>, local: Arc<Line>, remote: Arc<Line>) -> Arc<Handler> {
    let func: HandlerFn = Arc::new(move |_event| {
        if !local.is_alive() || !remote.is_alive() {
            return true;
        }
        let (Some(local_open), Some(remote_open)) = (local.last_open(), remote.last_open()) else {
            return true;
        };

        let caps = intersect_capability_sets(&local_open, &remote_open);
        let family_count = caps
            .values()
            .filter(|cap| matches!(&cap.value, CapabilityValue::MultiprotocolExtensions(_)))
            .count() as u32;
        shared.apply_negotiated_caps(caps);
        local.set_negotiated_family_count(family_count);
        remote.set_negotiated_family_count(family_count);
        shared.events.try_publish(event::kind::ESTABLISHED, None, None, vec![]);
        false
    });

    Arc::new(Handler::new(0, vec![event::kind::ALIVE.to_string()], DirectionMask::BOTH, func))
}
