//! [`Line`] and [`Input`] (spec.md §4.2): per-direction byte/message ingress, the callback-chain
//! processor, and fan-in to a single ordered output channel.

use crate::codec::{self, header};
use crate::error::{LifecycleError, WireError};
use crate::models::bgp::BgpOpenMessage;
use crate::pipe::callback::{Callback, CallbackChain, CallbackFilter};
use crate::pipe::event::kind;
use crate::pipe::message::{Message, MessageType, RawData};
use crate::pipe::{observer, Action, Direction, PipeShared};
use bytes::{Buf, BytesMut};
use chrono::Utc;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::mpsc;

/// One Input's byte-ingress carry-over buffer plus its dedicated in-channel and frozen
/// callback view.
pub struct Input {
    pub id: u32,
    pub direction: Direction,
    shared: Arc<PipeShared>,
    in_tx: mpsc::Sender<Box<Message>>,
    in_rx: Mutex<Option<mpsc::Receiver<Box<Message>>>>,
    carry: Mutex<BytesMut>,
    chain: CallbackChain,
    pub reverse: bool,
    pub filter: CallbackFilter,
    out_tx: mpsc::Sender<Box<Message>>,
    closed: AtomicBool,
}

impl Input {
    #[allow(clippy::too_many_arguments)]
    fn new(
        id: u32,
        direction: Direction,
        shared: Arc<PipeShared>,
        callbacks: &[Arc<Callback>],
        reverse: bool,
        filter: CallbackFilter,
        out_tx: mpsc::Sender<Box<Message>>,
        capacity: usize,
    ) -> Self {
        let (in_tx, in_rx) = mpsc::channel(capacity);
        let chain = CallbackChain::build(callbacks, direction.mask(), reverse);
        Input {
            id,
            direction,
            shared,
            in_tx,
            in_rx: Mutex::new(Some(in_rx)),
            carry: Mutex::new(BytesMut::new()),
            chain,
            reverse,
            filter,
            out_tx,
            closed: AtomicBool::new(false),
        }
    }

    fn max_len(&self) -> usize {
        if self.shared.extended_message.load(Ordering::Acquire) {
            header::MAX_LENGTH_EXTENDED
        } else {
            header::MAX_LENGTH
        }
    }

    /// Frames as many complete messages as `carry` currently holds, advancing it past each.
    /// Parsing is deliberately deferred to the callback chain (spec.md §4.2's `parse(m)` on
    /// first non-raw-ok callback) rather than attempted here. A framing failure (bad marker,
    /// bad length) ends the drain but still returns whatever was framed before it, alongside
    /// the error the caller must turn into a `PARSE` event.
    fn drain_frames(&self, carry: &mut BytesMut) -> (Vec<Box<Message>>, Option<WireError>) {
        let mut out = Vec::new();
        loop {
            match header::try_unframe(carry, self.max_len()) {
                Ok(framed) => {
                    let consumed = framed.consumed;
                    let mut msg = self.shared.pool.get(self.direction);
                    msg.timestamp = Utc::now();
                    msg.seq = self.shared.next_seq();
                    msg.set_raw(RawData::Owned(framed.body.clone()), MessageType::from(framed.msg_type));
                    carry.advance(consumed);
                    out.push(msg);
                }
                Err(WireError::ShortRead { .. }) => return (out, None),
                Err(WireError::BadMarker) => {
                    carry.clear();
                    return (out, Some(WireError::BadMarker));
                }
                Err(WireError::BadLength(len)) => {
                    let skip = (len as usize).max(header::HEADER_LEN).min(carry.len());
                    carry.advance(skip);
                    return (out, Some(WireError::BadLength(len)));
                }
                Err(other) => {
                    carry.clear();
                    return (out, Some(other));
                }
            }
        }
    }

    /// Synchronous byte ingress (the `std::io::Write` entry point). Intended for callers
    /// driving the pipeline from a dedicated non-async thread; it uses `blocking_send` to
    /// enqueue framed messages, which panics if called from within a Tokio worker thread.
    pub fn write_sync(&self, bytes: &[u8]) -> Result<usize, WireError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(WireError::BadValue("input closed".to_string()));
        }
        let (frames, err) = {
            let mut carry = self.carry.lock().unwrap();
            carry.extend_from_slice(bytes);
            self.drain_frames(&mut carry)
        };

        for msg in frames {
            if self.in_tx.blocking_send(msg).is_err() {
                return Err(WireError::BadValue("input closed".to_string()));
            }
        }
        if let Some(e) = err {
            self.shared
                .events
                .try_publish(kind::PARSE, Some(self.direction), Some(e.to_string()), vec![]);
            return Err(e);
        }
        Ok(bytes.len())
    }

    /// Async byte ingress, used by the Line's internal plumbing and by async callers.
    pub async fn write_bytes(&self, bytes: &[u8]) -> Result<usize, WireError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(WireError::BadValue("input closed".to_string()));
        }
        let (frames, err) = {
            let mut carry = self.carry.lock().unwrap();
            carry.extend_from_slice(bytes);
            self.drain_frames(&mut carry)
        };

        for msg in frames {
            if self.in_tx.send(msg).await.is_err() {
                return Err(WireError::BadValue("input closed".to_string()));
            }
        }
        if let Some(e) = err {
            self.shared
                .events
                .publish(kind::PARSE, Some(self.direction), None, Some(e.to_string()), vec![])
                .await;
            return Err(e);
        }
        Ok(bytes.len())
    }

    /// Structured ingress: enqueues an already-constructed message, assigning a sequence
    /// number and timestamp if unset.
    pub async fn write_msg(&self, mut msg: Box<Message>) -> Result<(), LifecycleError> {
        if self.closed.load(Ordering::Acquire) {
            self.shared.pool.put(msg);
            return Err(LifecycleError::InputClosed);
        }
        if msg.seq == 0 {
            msg.seq = self.shared.next_seq();
        }
        if self.in_tx.send(msg).await.is_err() {
            return Err(LifecycleError::InputClosed);
        }
        Ok(())
    }

    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    /// Drives this Input's processor: drains the in-channel, runs the callback chain on each
    /// message, runs the session observer, and forwards survivors to the Line's out-channel.
    async fn run(self: Arc<Self>, line: Arc<Line>, shared: Arc<PipeShared>) {
        let mut rx = self
            .in_rx
            .lock()
            .unwrap()
            .take()
            .expect("Input::run called more than once");

        while let Some(mut msg) = rx.recv().await {
            msg.ctx.action &= Action::BORROW;
            let survived = self.run_chain(&mut msg, &shared).await;

            if survived {
                observer::observe(&msg, &line, &shared).await;
            }

            if !survived || msg.ctx.action.contains(Action::DROP) {
                if !msg.ctx.action.contains(Action::BORROW) {
                    shared.pool.put(msg);
                }
                continue;
            }

            if self.out_tx.send(msg).await.is_err() {
                // Line's output already closed; nothing more to do with this message.
            }
        }
    }

    /// Runs the frozen callback slice for `msg`'s type, honouring the cursor so a
    /// re-dispatched message resumes after the last callback it completed.
    async fn run_chain(&self, msg: &mut Message, shared: &PipeShared) -> bool {
        let callbacks = self.chain.for_type(msg.msg_type);

        while msg.ctx.cursor < callbacks.len() {
            let cb = &callbacks[msg.ctx.cursor];
            msg.ctx.cursor += 1;

            if cb.is_dropped() || !cb.is_enabled() {
                continue;
            }
            if !self.filter.should_run(cb.id) {
                continue;
            }

            if !cb.raw_ok && !msg.is_parsed() {
                match self.try_parse(msg, shared) {
                    Ok(()) => {}
                    Err(e) => {
                        shared
                            .events
                            .publish(
                                kind::PARSE,
                                Some(msg.direction),
                                None,
                                Some(e.to_string()),
                                vec![],
                            )
                            .await;
                        return false;
                    }
                }
            }

            msg.ctx.current_callback = Some(cb.id);
            let ok = (cb.func)(msg);
            if !ok {
                msg.ctx.action |= Action::DROP;
            }
            if msg.ctx.action.contains(Action::DROP) {
                return false;
            }
            if msg.ctx.action.contains(Action::ACCEPT) {
                break;
            }
        }

        true
    }

    fn try_parse(&self, msg: &mut Message, shared: &PipeShared) -> Result<(), WireError> {
        let Some(raw) = msg.raw() else {
            return Ok(());
        };
        let wire_type = crate::models::bgp::BgpMessageType::try_from(msg.msg_type)
            .map_err(|_| WireError::BadValue("unparseable message type".to_string()))?;
        let parsed = codec::decode_body(wire_type, raw.bytes().clone(), &shared.codec_opts())?;
        msg.set_parsed_from_wire(parsed);
        Ok(())
    }
}

impl std::io::Write for Input {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.write_sync(buf)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl TryFrom<MessageType> for crate::models::bgp::BgpMessageType {
    type Error = ();

    fn try_from(value: MessageType) -> Result<Self, Self::Error> {
        use crate::models::bgp::BgpMessageType as Wire;
        Ok(match value {
            MessageType::Open => Wire::OPEN,
            MessageType::Update => Wire::UPDATE,
            MessageType::Notify => Wire::NOTIFICATION,
            MessageType::KeepAlive => Wire::KEEPALIVE,
            MessageType::Refresh => Wire::ROUTE_REFRESH,
            MessageType::Invalid => return Err(()),
        })
    }
}

/// A direction-bound component: one or more Inputs fanning in to a single ordered out-channel,
/// plus the session observables spec.md §3/§4.4 attach to a Line.
pub struct Line {
    pub direction: Direction,
    shared: Arc<PipeShared>,
    inputs: RwLock<Vec<Arc<Input>>>,
    out_tx: mpsc::Sender<Box<Message>>,
    out_rx: Mutex<Option<mpsc::Receiver<Box<Message>>>>,
    active_inputs: AtomicU32,

    pub(crate) last_open_ts: AtomicI64,
    pub(crate) last_keepalive_ts: AtomicI64,
    pub(crate) last_update_ts: AtomicI64,
    pub(crate) open: RwLock<Option<BgpOpenMessage>>,
    pub(crate) eor_seen: RwLock<HashSet<(u16, u8)>>,
    pub(crate) eor_done: AtomicBool,
    negotiated_family_count: AtomicU32,
}

impl Line {
    pub(crate) fn new(direction: Direction, shared: Arc<PipeShared>, capacity: usize) -> Arc<Self> {
        let (out_tx, out_rx) = mpsc::channel(capacity);
        Arc::new(Line {
            direction,
            shared,
            inputs: RwLock::new(Vec::new()),
            out_tx,
            out_rx: Mutex::new(Some(out_rx)),
            active_inputs: AtomicU32::new(0),
            last_open_ts: AtomicI64::new(0),
            last_keepalive_ts: AtomicI64::new(0),
            last_update_ts: AtomicI64::new(0),
            open: RwLock::new(None),
            eor_seen: RwLock::new(HashSet::new()),
            eor_done: AtomicBool::new(false),
            negotiated_family_count: AtomicU32::new(1),
        })
    }

    pub fn set_negotiated_family_count(&self, count: u32) {
        self.negotiated_family_count.store(count.max(1), Ordering::Release);
    }

    pub fn negotiated_family_count(&self) -> u32 {
        self.negotiated_family_count.load(Ordering::Acquire)
    }

    pub fn last_open(&self) -> Option<BgpOpenMessage> {
        self.open.read().unwrap().clone()
    }

    pub fn is_alive(&self) -> bool {
        self.last_open_ts.load(Ordering::Acquire) != 0 && self.last_keepalive_ts.load(Ordering::Acquire) != 0
    }

    /// Attaches a new Input to this Line, building its frozen callback view from `callbacks`.
    pub(crate) fn attach_input(
        self: &Arc<Self>,
        id: u32,
        callbacks: &[Arc<Callback>],
        reverse: bool,
        filter: CallbackFilter,
        capacity: usize,
    ) -> Arc<Input> {
        let input = Arc::new(Input::new(
            id,
            self.direction,
            self.shared.clone(),
            callbacks,
            reverse,
            filter,
            self.out_tx.clone(),
            capacity,
        ));
        self.inputs.write().unwrap().push(input.clone());
        self.active_inputs.fetch_add(1, Ordering::AcqRel);

        let task_input = input.clone();
        let task_line = self.clone();
        let task_shared = self.shared.clone();
        tokio::spawn(async move {
            task_input.clone().run(task_line.clone(), task_shared).await;
            task_line.active_inputs.fetch_sub(1, Ordering::AcqRel);
        });

        input
    }

    pub fn inputs(&self) -> Vec<Arc<Input>> {
        self.inputs.read().unwrap().clone()
    }

    /// Closes every Input's in-channel; their processors drain remaining messages and exit.
    pub fn close_inputs(&self) {
        for input in self.inputs.read().unwrap().iter() {
            input.close();
        }
    }

    /// Drains up to `max` messages from the out-channel, re-serialising each through the
    /// codec and recycling it to the pool. Returns the encoded bytes.
    pub async fn read(&self, max: usize) -> Vec<u8> {
        let Some(mut out_rx) = self.out_rx.lock().unwrap().take() else {
            return Vec::new();
        };
        let mut bytes = Vec::new();

        while bytes.len() < max {
            match out_rx.try_recv() {
                Ok(msg) => self.encode_and_recycle(msg, &mut bytes),
                Err(_) => break,
            }
        }

        *self.out_rx.lock().unwrap() = Some(out_rx);
        bytes
    }

    /// Blocking variant of [`Line::read`] used by `WriteTo`: waits for at least one message.
    pub async fn read_blocking(&self) -> Option<Vec<u8>> {
        let mut out_rx_guard = self.out_rx.lock().unwrap().take()?;
        let msg = out_rx_guard.recv().await;
        let result = msg.map(|m| {
            let mut bytes = Vec::new();
            self.encode_and_recycle(m, &mut bytes);
            bytes
        });
        *self.out_rx.lock().unwrap() = Some(out_rx_guard);
        result
    }

    /// Serialises `msg` (bit-exactly replaying its original bytes when nothing re-parsed it;
    /// otherwise re-encoding the parsed view) and returns it to the pool unless a callback
    /// tagged it `Action::BORROW`.
    fn encode_and_recycle(&self, msg: Box<Message>, bytes: &mut Vec<u8>) {
        if let Some(raw) = msg.raw() {
            if !msg.must_reserialize() {
                bytes.extend_from_slice(&header::encode_header(
                    crate::models::bgp::BgpMessageType::try_from(msg.msg_type)
                        .unwrap_or(crate::models::bgp::BgpMessageType::KEEPALIVE),
                    raw.bytes().len(),
                ));
                bytes.extend_from_slice(raw.bytes());
                self.recycle(msg);
                return;
            }
        }
        if let Some(parsed) = msg.parsed() {
            let encoded = codec::encode_message(parsed, &self.shared.codec_opts());
            bytes.extend_from_slice(&encoded);
        }
        self.recycle(msg);
    }

    fn recycle(&self, msg: Box<Message>) {
        if !msg.ctx.action.contains(Action::BORROW) {
            self.shared.pool.put(msg);
        }
    }
}

