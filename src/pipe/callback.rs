//! [`Callback`] registration and the attach-time [`CallbackChain`] transformation described in
//! spec.md §4.3: an unordered callback list becomes, per Input, an immutable ordered slice per
//! message type.

use crate::pipe::message::{Message, MessageType, MESSAGE_TYPE_COUNT};
use crate::pipe::DirectionMask;
use std::cmp::Ordering;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;

/// A callback's accept/reject decision. `true` lets the message continue down the chain
/// (subject to whatever `Action` bits it set on the context); `false` is shorthand for
/// also setting `Action::DROP`.
pub type CallbackFn = Arc<dyn Fn(&mut Message) -> bool + Send + Sync>;

/// One registered callback. Ordering within a message type's slice is (pre desc, post asc,
/// `order` asc - or desc for a reverse Input).
pub struct Callback {
    pub id: u64,
    pub name: Option<String>,
    pub pre: bool,
    pub post: bool,
    pub order: i64,
    pub direction_mask: DirectionMask,
    /// Empty means "every message type".
    pub type_mask: Vec<MessageType>,
    pub raw_ok: bool,
    enabled: AtomicBool,
    dropped: AtomicBool,
    pub func: CallbackFn,
}

impl std::fmt::Debug for Callback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Callback")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("pre", &self.pre)
            .field("post", &self.post)
            .field("order", &self.order)
            .finish_non_exhaustive()
    }
}

impl Callback {
    pub fn new(id: u64, direction_mask: DirectionMask, func: CallbackFn) -> Self {
        Callback {
            id,
            name: None,
            pre: false,
            post: false,
            order: 0,
            direction_mask,
            type_mask: Vec::new(),
            raw_ok: false,
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

    /// One-way: once dropped, a callback is skipped for the rest of the Pipe's life.
    pub fn drop_callback(&self) {
        self.dropped.store(true, AtomicOrdering::Release);
    }

    fn matches_type(&self, ty: MessageType) -> bool {
        self.type_mask.is_empty() || self.type_mask.contains(&ty)
    }
}

/// The per-Input filter that skips callbacks by id comparison (spec.md §4.3). `All` is the
/// sole "no filtering" spelling (Open Question (b) in spec.md §9).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    All,
}

#[derive(Debug, Clone, Copy)]
pub struct CallbackFilter {
    pub op: FilterOp,
    pub id: u64,
}

impl CallbackFilter {
    pub fn all() -> Self {
        CallbackFilter {
            op: FilterOp::All,
            id: 0,
        }
    }

    pub fn should_run(&self, cb_id: u64) -> bool {
        match self.op {
            FilterOp::All => true,
            FilterOp::Eq => cb_id == self.id,
            FilterOp::Ne => cb_id != self.id,
            FilterOp::Lt => cb_id < self.id,
            FilterOp::Le => cb_id <= self.id,
            FilterOp::Gt => cb_id > self.id,
            FilterOp::Ge => cb_id >= self.id,
        }
    }
}

/// The frozen, per-message-type ordered callback slices produced for one Input at attach
/// time. Built once; never mutated afterwards (individual `Callback`s still carry their own
/// atomic enabled/dropped flags, checked per invocation).
#[derive(Debug)]
pub struct CallbackChain {
    slices: [Vec<Arc<Callback>>; MESSAGE_TYPE_COUNT],
}

impl CallbackChain {
    pub fn build(callbacks: &[Arc<Callback>], direction_mask: DirectionMask, reverse: bool) -> Self {
        let mut slices: [Vec<Arc<Callback>>; MESSAGE_TYPE_COUNT] = std::array::from_fn(|_| Vec::new());

        for ty in MessageType::ALL {
            let mut matching: Vec<Arc<Callback>> = callbacks
                .iter()
                .filter(|cb| cb.direction_mask.intersects(direction_mask))
                .filter(|cb| cb.matches_type(ty))
                .cloned()
                .collect();

            matching.sort_by(|a, b| {
                let pre_cmp = b.pre.cmp(&a.pre);
                if pre_cmp != Ordering::Equal {
                    return pre_cmp;
                }
                let post_cmp = a.post.cmp(&b.post);
                if post_cmp != Ordering::Equal {
                    return post_cmp;
                }
                if reverse {
                    b.order.cmp(&a.order)
                } else {
                    a.order.cmp(&b.order)
                }
            });

            slices[ty.index()] = matching;
        }

        CallbackChain { slices }
    }

    pub fn for_type(&self, ty: MessageType) -> &[Arc<Callback>] {
        &self.slices[ty.index()]
    }
}
