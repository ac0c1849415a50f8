//! # Producer flow control for a single queue
//!
//! Tracks the queue's message count and byte size and withholds producer
//! receipt acknowledgments while the queue is over its stop threshold.
//!
//! ## Hysteresis
//! Flow control turns on when an enqueue pushes count or size strictly above
//! a stop threshold, and turns off only when a dequeue brings both strictly
//! below their resume thresholds.

use crate::error::{AccountingKind, FlowError, Result};
use crate::event::{FlowEvent, FlowObserver, FlowReport, FlowTrigger};
use crate::message::{Message, MessageId, QueuedMessage};
use crate::sync::Mutex;
use crate::thresholds::{CapacityBound, ThresholdSet};
use bytes::{Buf, BufMut};
use qflow_codec::FlowRecord;
use qflow_dsa::PendingAckIndex;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

struct FlowState {
    thresholds: ThresholdSet,
    count: u32,
    size: u64,
    flow_stopped: bool,
    transitions: u64,
    /// Messages whose receipt is withheld, oldest first.
    index: PendingAckIndex<MessageId, Arc<Message>>,
}

impl FlowState {
    fn record(&self) -> FlowRecord {
        FlowRecord {
            stop_count: self.thresholds.stop_count,
            resume_count: self.thresholds.resume_count,
            stop_size: self.thresholds.stop_size,
            resume_size: self.thresholds.resume_size,
            count: self.count,
            size: self.size,
        }
    }

    fn stop_trigger(&self) -> Option<FlowTrigger> {
        let t = &self.thresholds;
        if t.stop_count != 0 && self.count > t.stop_count {
            Some(FlowTrigger::Count { limit: t.stop_count })
        } else if t.stop_size != 0 && self.size > t.stop_size {
            Some(FlowTrigger::Size { limit: t.stop_size })
        } else {
            None
        }
    }

    fn below_resume(&self) -> bool {
        let t = &self.thresholds;
        (t.resume_size == 0 || self.size < t.resume_size)
            && (t.resume_count == 0 || self.count < t.resume_count)
    }
}

/// Flow limit owned by one queue.
///
/// `enqueued` and `dequeued` may be called from different threads; counters
/// and the pending index sit behind a single mutex, which is also held while
/// withheld acknowledgments are released.
pub struct QueueFlowLimit {
    queue_name: String,
    state: Mutex<FlowState>,
    observer: RwLock<Option<Arc<dyn FlowObserver>>>,
}

impl QueueFlowLimit {
    /// Validates `thresholds` against `bound` and creates an idle limit.
    pub fn new(queue_name: &str, thresholds: ThresholdSet, bound: CapacityBound) -> Result<Self> {
        let thresholds = thresholds.validate(queue_name, bound)?;
        tracing::info!(
            "Queue \"{}\": Flow limit created: flowStopCount={}, flowResumeCount={}, flowStopSize={}, flowResumeSize={}",
            queue_name,
            thresholds.stop_count,
            thresholds.resume_count,
            thresholds.stop_size,
            thresholds.resume_size
        );
        Ok(Self {
            queue_name: queue_name.to_string(),
            state: Mutex::new(FlowState {
                thresholds,
                count: 0,
                size: 0,
                flow_stopped: false,
                transitions: 0,
                index: PendingAckIndex::new(),
            }),
            observer: RwLock::new(None),
        })
    }

    fn lock(&self) -> crate::sync::MutexGuard<'_, FlowState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn queue_name(&self) -> &str {
        &self.queue_name
    }

    /// Accounts for a message admitted to the queue, withholding its receipt
    /// if the queue is flow controlled or earlier receipts are still held.
    pub fn enqueued(&self, msg: &QueuedMessage) {
        let Some(payload) = msg.payload.as_ref() else {
            return;
        };

        let event = {
            let mut state = self.lock();
            let (Some(count), Some(size)) = (
                state.count.checked_add(1),
                state.size.checked_add(payload.content_size()),
            ) else {
                tracing::error!(
                    "Queue \"{}\": flow limit counters overflow on enqueue of {} (message {}); message not accounted. count={}, size={}",
                    self.queue_name,
                    msg.position,
                    payload.id(),
                    state.count,
                    state.size
                );
                return;
            };
            state.count = count;
            state.size = size;

            let mut event = None;
            if !state.flow_stopped {
                if let Some(trigger) = state.stop_trigger() {
                    state.flow_stopped = true;
                    state.transitions += 1;
                    match trigger {
                        FlowTrigger::Count { limit } => tracing::info!(
                            "Queue \"{}\": has reached {} enqueued messages. Producer flow control activated.",
                            self.queue_name,
                            limit
                        ),
                        FlowTrigger::Size { limit } => tracing::info!(
                            "Queue \"{}\": has reached {} enqueued bytes. Producer flow control activated.",
                            self.queue_name,
                            limit
                        ),
                    }
                    event = Some(FlowEvent::Activated {
                        queue: self.queue_name.clone(),
                        transition: state.transitions,
                        trigger,
                    });
                }
            }

            if state.flow_stopped || !state.index.is_empty() {
                // Held until flow resumes or this message leaves the queue.
                match state.index.insert(payload.id(), Arc::clone(payload)) {
                    Ok(()) => payload.gate().withhold(),
                    Err(_) => tracing::error!(
                        "Queue \"{}\": has enqueued a msg twice: {} (message {})",
                        self.queue_name,
                        msg.position,
                        payload.id()
                    ),
                }
            }
            event
        };

        if let Some(event) = event {
            self.notify(&event);
        }
    }

    /// Accounts for a message permanently removed from the queue and releases
    /// withheld receipts as the queue drains.
    ///
    /// # Errors
    /// `FlowError::Accounting` if the dequeue has no matching enqueue. The
    /// counters are left untouched in that case.
    pub fn dequeued(&self, msg: &QueuedMessage) -> Result<()> {
        let Some(payload) = msg.payload.as_ref() else {
            return Ok(());
        };
        let content_size = payload.content_size();

        let event = {
            let mut state = self.lock();
            if state.count == 0 {
                return Err(self.underflow(AccountingKind::Count));
            }
            if content_size > state.size {
                return Err(self.underflow(AccountingKind::Size));
            }
            state.count -= 1;
            state.size -= content_size;

            let mut event = None;
            if state.flow_stopped && state.below_resume() {
                state.flow_stopped = false;
                state.transitions += 1;
                tracing::info!(
                    "Queue \"{}\": has drained below the flow control resume level. Producer flow control deactivated.",
                    self.queue_name
                );
                event = Some(FlowEvent::Deactivated {
                    queue: self.queue_name.clone(),
                    transition: state.transitions,
                });
            }

            if !state.index.is_empty() {
                if !state.flow_stopped {
                    for held in state.index.drain_ordered() {
                        held.gate().release();
                    }
                } else if let Some(held) = state.index.remove(&payload.id()) {
                    // Leaving the queue: its producer must not wait for a resume.
                    held.gate().release();
                }
            }
            event
        };

        if let Some(event) = event {
            self.notify(&event);
        }
        Ok(())
    }

    fn underflow(&self, kind: AccountingKind) -> FlowError {
        FlowError::Accounting {
            queue: self.queue_name.clone(),
            kind,
        }
    }

    fn notify(&self, event: &FlowEvent) {
        let observer = self
            .observer
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(observer) = observer {
            observer.on_event(event);
        }
    }

    /// Attaches an instrumentation observer and pushes it the current
    /// thresholds and flow state.
    ///
    /// The observer is installed under the state lock, so every transition
    /// after the report is delivered to it. An event may still arrive before
    /// `on_attach`; compare its `transition` with the report's.
    pub fn set_observer(&self, observer: Arc<dyn FlowObserver>) {
        let report = {
            let state = self.lock();
            *self.observer.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&observer));
            FlowReport {
                thresholds: state.thresholds,
                flow_stopped: state.flow_stopped,
                transition: state.transitions,
            }
        };
        observer.on_attach(&report);
    }

    pub fn is_flow_control_active(&self) -> bool {
        self.lock().flow_stopped
    }

    pub fn thresholds(&self) -> ThresholdSet {
        self.lock().thresholds
    }

    pub fn flow_stop_count(&self) -> u32 {
        self.lock().thresholds.stop_count
    }

    pub fn flow_resume_count(&self) -> u32 {
        self.lock().thresholds.resume_count
    }

    pub fn flow_stop_size(&self) -> u64 {
        self.lock().thresholds.stop_size
    }

    pub fn flow_resume_size(&self) -> u64 {
        self.lock().thresholds.resume_size
    }

    pub fn count(&self) -> u32 {
        self.lock().count
    }

    pub fn size(&self) -> u64 {
        self.lock().size
    }

    /// Number of messages whose receipt is currently withheld.
    pub fn pending_acks(&self) -> usize {
        self.lock().index.len()
    }

    /// Thresholds and counters as they would be persisted.
    pub fn snapshot(&self) -> FlowRecord {
        self.lock().record()
    }

    /// Writes the checkpoint record for this limit.
    pub fn encode<B: BufMut>(&self, buf: &mut B) {
        self.lock().record().encode(buf);
    }

    /// Replaces thresholds and counters with a checkpointed record.
    ///
    /// Recovered values are trusted as-is; they were validated when first
    /// configured. The flow-stopped flag and held receipts are untouched.
    pub fn decode<B: Buf>(&self, buf: &mut B) -> Result<()> {
        let record = FlowRecord::decode(buf)?;
        let mut state = self.lock();
        state.thresholds = ThresholdSet::new(
            record.stop_count,
            record.resume_count,
            record.stop_size,
            record.resume_size,
        );
        state.count = record.count;
        state.size = record.size;
        Ok(())
    }

    pub fn encoded_size(&self) -> usize {
        FlowRecord::encoded_size()
    }
}

impl fmt::Display for QueueFlowLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        let t = &state.thresholds;
        write!(
            f,
            "; flowStopCount={}, flowResumeCount={}; flowStopSize={}, flowResumeSize={}",
            t.stop_count, t.resume_count, t.stop_size, t.resume_size
        )?;
        write!(
            f,
            "; count={}, size={}, flowStopped={}",
            state.count, state.size, state.flow_stopped
        )
    }
}

impl fmt::Debug for QueueFlowLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueFlowLimit")
            .field("queue", &self.queue_name)
            .finish()
    }
}
