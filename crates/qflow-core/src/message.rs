use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_MESSAGE_ID: AtomicU64 = AtomicU64::new(1);

/// Stable identity of a message payload, independent of its content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MessageId(pub u64);

impl MessageId {
    /// Allocates a process-unique id.
    pub fn next() -> Self {
        MessageId(NEXT_MESSAGE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The producer-visible receipt acknowledgment of one message.
///
/// # Protocol
/// The flow limit calls `withhold` at most once per held message and calls
/// `release` only after a matching `withhold`.
pub trait AckGate: Send + Sync {
    fn withhold(&self);
    fn release(&self);
}

/// A message payload as tracked by flow control: identity, byte size and
/// its acknowledgment gate.
pub struct Message {
    id: MessageId,
    content_size: u64,
    gate: Arc<dyn AckGate>,
}

impl Message {
    pub fn new(content_size: u64, gate: impl AckGate + 'static) -> Self {
        Self::with_id(MessageId::next(), content_size, Arc::new(gate))
    }

    pub fn with_id(id: MessageId, content_size: u64, gate: Arc<dyn AckGate>) -> Self {
        Self {
            id,
            content_size,
            gate,
        }
    }

    #[inline]
    pub fn id(&self) -> MessageId {
        self.id
    }

    #[inline]
    pub fn content_size(&self) -> u64 {
        self.content_size
    }

    pub fn gate(&self) -> &dyn AckGate {
        self.gate.as_ref()
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("id", &self.id)
            .field("content_size", &self.content_size)
            .finish()
    }
}

/// A queue slot handed to the flow limit on enqueue and dequeue. Control
/// markers carry no payload and are ignored.
#[derive(Debug, Clone)]
pub struct QueuedMessage {
    pub position: u64,
    pub payload: Option<Arc<Message>>,
}

impl QueuedMessage {
    pub fn new(position: u64, payload: Arc<Message>) -> Self {
        Self {
            position,
            payload: Some(payload),
        }
    }

    pub fn marker(position: u64) -> Self {
        Self {
            position,
            payload: None,
        }
    }
}
