use crate::thresholds::ThresholdSet;

/// Which stop threshold tripped flow control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowTrigger {
    Count { limit: u32 },
    Size { limit: u64 },
}

/// A flow-control state change, tagged with the per-queue transition number
/// so observers can order notifications delivered from different threads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowEvent {
    Activated {
        queue: String,
        transition: u64,
        trigger: FlowTrigger,
    },
    Deactivated {
        queue: String,
        transition: u64,
    },
}

impl FlowEvent {
    pub fn transition(&self) -> u64 {
        match self {
            FlowEvent::Activated { transition, .. } | FlowEvent::Deactivated { transition, .. } => {
                *transition
            }
        }
    }

    pub fn is_activation(&self) -> bool {
        matches!(self, FlowEvent::Activated { .. })
    }
}

/// Configuration and current state, pushed to an observer when it attaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowReport {
    pub thresholds: ThresholdSet,
    pub flow_stopped: bool,
    /// Transition number the report reflects; later events carry larger ones.
    pub transition: u64,
}

/// Instrumentation hook (e.g. a management agent).
///
/// Callbacks run outside the flow-state lock.
pub trait FlowObserver: Send + Sync {
    fn on_attach(&self, _report: &FlowReport) {}

    fn on_event(&self, event: &FlowEvent);
}
