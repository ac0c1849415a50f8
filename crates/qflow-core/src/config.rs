use crate::error::{FlowError, Result};
use serde::Deserialize;
use std::path::Path;
use std::sync::{PoisonError, RwLock};

/// Broker-wide defaults applied to queues declared without explicit
/// flow thresholds.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct FlowDefaults {
    /// Queue size assumed when a queue does not declare `qpid.max_size`.
    pub max_queue_size: u64,
    /// Percent of the max size at which flow control starts. 0 disables.
    pub flow_stop_ratio: u32,
    /// Percent of the max size below which flow control ends.
    pub flow_resume_ratio: u32,
}

impl Default for FlowDefaults {
    fn default() -> Self {
        Self {
            max_queue_size: 100 * 1024 * 1024,
            flow_stop_ratio: 80,
            flow_resume_ratio: 70,
        }
    }
}

impl FlowDefaults {
    /// No default flow control; only explicitly configured queues get a limit.
    pub const DISABLED: Self = Self {
        max_queue_size: 0,
        flow_stop_ratio: 0,
        flow_resume_ratio: 0,
    };

    pub fn new(max_queue_size: u64, flow_stop_ratio: u32, flow_resume_ratio: u32) -> Result<Self> {
        let defaults = Self {
            max_queue_size,
            flow_stop_ratio,
            flow_resume_ratio,
        };
        defaults.validate()?;
        Ok(defaults)
    }

    pub fn validate(&self) -> Result<()> {
        if self.flow_stop_ratio > 100 || self.flow_resume_ratio > 100 {
            return Err(FlowError::invalid(
                "broker defaults",
                format!(
                    "Default queue flow ratios must be between 0 and 100, inclusive: flowStopRatio={} flowResumeRatio={}",
                    self.flow_stop_ratio, self.flow_resume_ratio
                ),
            ));
        }
        if self.flow_resume_ratio > self.flow_stop_ratio {
            return Err(FlowError::invalid(
                "broker defaults",
                format!(
                    "Default queue flow stop ratio must be >= flow resume ratio: flowStopRatio={} flowResumeRatio={}",
                    self.flow_stop_ratio, self.flow_resume_ratio
                ),
            ));
        }
        Ok(())
    }

    pub fn is_enabled(&self) -> bool {
        self.flow_stop_ratio != 0
    }

    /// `round(max_size * stop_ratio / 100)`, half rounding up.
    pub fn stop_size_for(&self, max_size: u64) -> u64 {
        ((max_size as u128 * self.flow_stop_ratio as u128 + 50) / 100) as u64
    }

    /// `floor(max_size * resume_ratio / 100)`.
    pub fn resume_size_for(&self, max_size: u64) -> u64 {
        ((max_size as u128 * self.flow_resume_ratio as u128) / 100) as u64
    }
}

/// The `[flow]` section of the broker configuration file.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct BrokerFlowConfig {
    #[serde(default)]
    pub flow: FlowDefaults,
}

impl BrokerFlowConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s)?;
        config.flow.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }
}

static PROCESS_DEFAULTS: RwLock<FlowDefaults> = RwLock::new(FlowDefaults::DISABLED);

/// Installs the broker-wide defaults used by every queue created afterwards.
///
/// On failure the previously installed defaults stay in effect.
pub fn set_defaults(max_queue_size: u64, flow_stop_ratio: u32, flow_resume_ratio: u32) -> Result<()> {
    let defaults = FlowDefaults::new(max_queue_size, flow_stop_ratio, flow_resume_ratio)?;
    *PROCESS_DEFAULTS.write().unwrap_or_else(PoisonError::into_inner) = defaults;
    tracing::info!(
        "Flow defaults: maxQueueSize={}, flowStopRatio={}, flowResumeRatio={}",
        max_queue_size,
        flow_stop_ratio,
        flow_resume_ratio
    );
    Ok(())
}

pub fn current_defaults() -> FlowDefaults {
    *PROCESS_DEFAULTS.read().unwrap_or_else(PoisonError::into_inner)
}
