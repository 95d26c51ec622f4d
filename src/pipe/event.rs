//! The [`EventBus`]: ordered broadcast of [`Event`]s to [`Handler`]s with optional completion
//! synchronisation, per spec.md §4.5.

use crate::pipe::message::Message;
use crate::pipe::{Action, Direction, DirectionMask};
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::{mpsc, oneshot};

/// Public event type strings, per spec.md §6.
pub mod kind {
    pub const START: &str = "pipe.START";
    pub const STOP: &str = "pipe.STOP";
    pub const PARSE: &str = "pipe.PARSE";
    pub const OPEN: &str = "pipe.OPEN";
    pub const ALIVE: &str = "pipe.ALIVE";
    pub const UPDATE: &str = "pipe.UPDATE";
    pub const ESTABLISHED: &str = "pipe.ESTABLISHED";
    pub const EOR_AF: &str = "pipe.EOR_AF";
    pub const EOR: &str = "pipe.EOR";
}

/// One in-flight event. `message`, when present, is tagged `Action::BORROW` on construction
/// so it survives pool recycling for the lifetime of the event.
#[derive(Debug)]
pub struct Event {
    pub event_type: String,
    pub direction: Option<Direction>,
    pub message: Option<Box<Message>>,
    pub error: Option<String>,
    pub value: Vec<String>,
    pub seq: u64,
    pub timestamp: DateTime<Utc>,
    pub action: Action,
    done_tx: Option<oneshot::Sender<()>>,
}

/// Returned from [`EventBus::publish`]; callers who want to block until every handler has run
/// call [`EventHandle::wait`]. Dropping the handle without waiting is fire-and-forget.
pub struct EventHandle {
    rx: oneshot::Receiver<()>,
}

impl EventHandle {
    pub async fn wait(self) {
        let _ = self.rx.await;
    }
}

pub type HandlerFn = Arc<dyn Fn(&mut Event) -> bool + Send + Sync>;

/// A registered event handler. `event_types` containing `"*"` subscribes to every event type
/// in addition to (or instead of) a named subset.
pub struct Handler {
    pub id: u64,
    pub event_types: Vec<String>,
    pub pre: bool,
    pub post: bool,
    pub order: i64,
    pub direction_mask: DirectionMask,
    enabled: AtomicBool,
    dropped: AtomicBool,
    pub func: HandlerFn,
}

impl std::fmt::Debug for Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handler")
            .field("id", &self.id)
            .field("event_types", &self.event_types)
            .finish_non_exhaustive()
    }
}

impl Handler {
    pub fn new(id: u64, event_types: Vec<String>, direction_mask: DirectionMask, func: HandlerFn) -> Self {
        Handler {
            id,
            event_types,
            pre: false,
            post: false,
            order: 0,
            direction_mask,
            enabled: AtomicBool::new(true),
            dropped: AtomicBool::new(false),
            func,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(AtomicOrdering::Acquire)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, AtomicOrdering::Release);
    }

    pub fn is_dropped(&self) -> bool {
        self.dropped.load(AtomicOrdering::Acquire)
    }

    /// Marks this handler to be skipped on every future dispatch (sticky, not undone).
    pub fn drop_self(&self) {
        self.dropped.store(true, AtomicOrdering::Release);
    }

    fn matches_type(&self, ty: &str) -> bool {
        self.event_types.iter().any(|t| t == "*" || t == ty)
    }
}

/// Single-dispatcher ordered event bus. `publish` enqueues onto a bounded channel; the
/// dispatcher (run via [`EventBus::run`]) drains it FIFO, runs matching handlers
/// synchronously, then signals the event's completion.
pub struct EventBus {
    tx: mpsc::Sender<Event>,
    rx: Mutex<Option<mpsc::Receiver<Event>>>,
    handlers: RwLock<Vec<Arc<Handler>>>,
    seq: AtomicU64,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity);
        EventBus {
            tx,
            rx: Mutex::new(Some(rx)),
            handlers: RwLock::new(Vec::new()),
            seq: AtomicU64::new(1),
        }
    }

    pub fn register(&self, handler: Arc<Handler>) {
        self.handlers.write().unwrap().push(handler);
    }

    /// Constructs and enqueues an event, blocking until the bus accepts it (or the bus is
    /// closed). Returns a handle the caller may `wait()` on for handler completion.
    pub async fn publish(
        &self,
        event_type: impl Into<String>,
        direction: Option<Direction>,
        mut message: Option<Box<Message>>,
        error: Option<String>,
        value: Vec<String>,
    ) -> EventHandle {
        if let Some(m) = message.as_mut() {
            m.ctx.action |= Action::BORROW;
        }

        let (done_tx, done_rx) = oneshot::channel();
        let seq = self.seq.fetch_add(1, AtomicOrdering::Relaxed);
        let event = Event {
            event_type: event_type.into(),
            direction,
            message,
            error,
            value,
            seq,
            timestamp: Utc::now(),
            action: Action::CONTINUE,
            done_tx: Some(done_tx),
        };

        let _ = self.tx.send(event).await;
        EventHandle { rx: done_rx }
    }

    /// Non-blocking publish with no attached message, for callers that can't `.await` (a
    /// synchronous `Write::write`, or a `Handler` running inline inside [`EventBus::dispatch_one`]).
    /// Returns `false` if the bus's channel is full or closed; the event is simply dropped.
    pub fn try_publish(
        &self,
        event_type: impl Into<String>,
        direction: Option<Direction>,
        error: Option<String>,
        value: Vec<String>,
    ) -> bool {
        let seq = self.seq.fetch_add(1, AtomicOrdering::Relaxed);
        let event = Event {
            event_type: event_type.into(),
            direction,
            message: None,
            error,
            value,
            seq,
            timestamp: Utc::now(),
            action: Action::CONTINUE,
            done_tx: None,
        };
        self.tx.try_send(event).is_ok()
    }

    /// Runs the dispatcher loop to completion (i.e. until the bus is closed - every `Sender`
    /// clone, including the one owned by the `Pipe`, has been dropped). Intended to be spawned
    /// once by `Pipe::start`.
    pub async fn run(self: Arc<Self>) {
        let mut rx = self
            .rx
            .lock()
            .unwrap()
            .take()
            .expect("EventBus::run called more than once");

        while let Some(mut event) = rx.recv().await {
            self.dispatch_one(&mut event);
            if let Some(done_tx) = event.done_tx.take() {
                let _ = done_tx.send(());
            }
        }
    }

    fn dispatch_one(&self, event: &mut Event) {
        let mut matching: Vec<Arc<Handler>> = {
            let handlers = self.handlers.read().unwrap();
            handlers
                .iter()
                .filter(|h| !h.is_dropped() && h.is_enabled())
                .filter(|h| h.matches_type(&event.event_type))
                .filter(|h| {
                    event
                        .direction
                        .map(|d| h.direction_mask.intersects(d.mask()))
                        .unwrap_or(true)
                })
                .cloned()
                .collect()
        };

        matching.sort_by(|a, b| {
            let pre_cmp = b.pre.cmp(&a.pre);
            if pre_cmp != Ordering::Equal {
                return pre_cmp;
            }
            let post_cmp = a.post.cmp(&b.post);
            if post_cmp != Ordering::Equal {
                return post_cmp;
            }
            a.order.cmp(&b.order)
        });

        for handler in matching {
            let keep = (handler.func)(event);
            if !keep {
                handler.drop_self();
            }
            if event.action.intersects(Action::DROP | Action::ACCEPT) {
                break;
            }
        }
    }
}
