use crate::config::{current_defaults, FlowDefaults};
use crate::error::{FlowError, Result};
use crate::flow::QueueFlowLimit;
use crate::settings::{
    QueueSettings, FLOW_RESUME_COUNT_KEY, FLOW_RESUME_SIZE_KEY, FLOW_STOP_COUNT_KEY,
    FLOW_STOP_SIZE_KEY, MAX_COUNT_KEY, MAX_SIZE_KEY,
};
use crate::thresholds::{CapacityBound, ThresholdSet};

/// What the factory needs to know about the queue being created.
#[derive(Debug, Clone)]
pub struct QueueDescriptor {
    pub name: String,
    /// Capacity bound from the queue's size policy. When absent it is read
    /// from `qpid.max_count` / `qpid.max_size` in the declare arguments, with
    /// the broker default max queue size standing in for a missing size.
    pub bound: Option<CapacityBound>,
}

impl QueueDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bound: None,
        }
    }

    pub fn with_bound(mut self, bound: CapacityBound) -> Self {
        self.bound = Some(bound);
        self
    }
}

/// Decides whether a new queue gets a flow limit, and with which thresholds.
#[derive(Debug, Clone, Copy)]
pub struct FlowLimitFactory {
    defaults: FlowDefaults,
}

impl FlowLimitFactory {
    pub fn new(defaults: FlowDefaults) -> Self {
        Self { defaults }
    }

    /// A factory over whatever `set_defaults` last installed.
    pub fn from_process_defaults() -> Self {
        Self::new(current_defaults())
    }

    pub fn defaults(&self) -> FlowDefaults {
        self.defaults
    }

    /// Returns `Ok(None)` when the queue should run without flow control:
    /// ring queues, explicitly disabled limits, and queues with neither
    /// explicit thresholds nor a default stop ratio.
    pub fn create(
        &self,
        queue: &QueueDescriptor,
        settings: &QueueSettings,
    ) -> Result<Option<QueueFlowLimit>> {
        if settings.policy_type().is_some_and(|p| p.is_ring()) {
            tracing::debug!("Queue \"{}\": ring policy, no flow limit", queue.name);
            return Ok(None);
        }

        let bound = queue.bound.unwrap_or_else(|| CapacityBound {
            max_count: u32::try_from(settings.capacity(MAX_COUNT_KEY, 0)).unwrap_or(u32::MAX),
            max_size: settings.capacity(MAX_SIZE_KEY, self.defaults.max_queue_size),
        });

        if settings.contains(FLOW_STOP_COUNT_KEY) || settings.contains(FLOW_STOP_SIZE_KEY) {
            let stop_count = count_setting(&queue.name, settings, FLOW_STOP_COUNT_KEY)?;
            let resume_count = count_setting(&queue.name, settings, FLOW_RESUME_COUNT_KEY)?;
            let stop_size = settings.capacity(FLOW_STOP_SIZE_KEY, 0);
            let resume_size = settings.capacity(FLOW_RESUME_SIZE_KEY, 0);
            if stop_count == 0 && stop_size == 0 {
                tracing::debug!("Queue \"{}\": flow control disabled by settings", queue.name);
                return Ok(None);
            }
            let thresholds = ThresholdSet::new(stop_count, resume_count, stop_size, resume_size);
            return QueueFlowLimit::new(&queue.name, thresholds, bound).map(Some);
        }

        if self.defaults.is_enabled() {
            let max_size = settings.capacity(MAX_SIZE_KEY, self.defaults.max_queue_size);
            let thresholds = ThresholdSet::new(
                0,
                0,
                self.defaults.stop_size_for(max_size),
                self.defaults.resume_size_for(max_size),
            );
            return QueueFlowLimit::new(&queue.name, thresholds, bound).map(Some);
        }

        Ok(None)
    }
}

/// Count thresholds are persisted as 32-bit values.
fn count_setting(queue: &str, settings: &QueueSettings, key: &str) -> Result<u32> {
    let value = settings.capacity(key, 0);
    u32::try_from(value).map_err(|_| {
        FlowError::invalid(
            format!("Queue \"{}\"", queue),
            format!("{}={} exceeds the maximum message count {}", key, value, u32::MAX),
        )
    })
}

/// Creates the flow limit for a new queue using the broker-wide defaults.
pub fn create_flow_limit(
    queue: &QueueDescriptor,
    settings: &QueueSettings,
) -> Result<Option<QueueFlowLimit>> {
    FlowLimitFactory::from_process_defaults().create(queue, settings)
}
