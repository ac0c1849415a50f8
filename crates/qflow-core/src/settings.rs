//! Per-queue declare arguments as seen by the flow limit.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const FLOW_STOP_COUNT_KEY: &str = "qpid.flow_stop_count";
pub const FLOW_RESUME_COUNT_KEY: &str = "qpid.flow_resume_count";
pub const FLOW_STOP_SIZE_KEY: &str = "qpid.flow_stop_size";
pub const FLOW_RESUME_SIZE_KEY: &str = "qpid.flow_resume_size";
pub const MAX_COUNT_KEY: &str = "qpid.max_count";
pub const MAX_SIZE_KEY: &str = "qpid.max_size";
pub const POLICY_TYPE_KEY: &str = "qpid.policy_type";

/// A loosely-typed argument value as it arrives from a declare.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl SettingValue {
    /// Interprets the value as a non-negative integer.
    ///
    /// Accepts integers and decimal strings. Floats, negatives, booleans and
    /// anything unparseable yield `None`.
    pub fn as_capacity(&self) -> Option<u64> {
        match self {
            SettingValue::Int(v) => u64::try_from(*v).ok(),
            SettingValue::Str(s) => s.trim().parse::<u64>().ok(),
            SettingValue::Float(_) | SettingValue::Bool(_) => None,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            SettingValue::Bool(_) => "bool",
            SettingValue::Int(_) => "integer",
            SettingValue::Float(_) => "float",
            SettingValue::Str(_) => "string",
        }
    }
}

impl From<i32> for SettingValue {
    fn from(v: i32) -> Self {
        SettingValue::Int(v as i64)
    }
}

impl From<i64> for SettingValue {
    fn from(v: i64) -> Self {
        SettingValue::Int(v)
    }
}

impl From<u32> for SettingValue {
    fn from(v: u32) -> Self {
        SettingValue::Int(v as i64)
    }
}

impl From<u64> for SettingValue {
    fn from(v: u64) -> Self {
        match i64::try_from(v) {
            Ok(v) => SettingValue::Int(v),
            Err(_) => SettingValue::Str(v.to_string()),
        }
    }
}

impl From<f64> for SettingValue {
    fn from(v: f64) -> Self {
        SettingValue::Float(v)
    }
}

impl From<bool> for SettingValue {
    fn from(v: bool) -> Self {
        SettingValue::Bool(v)
    }
}

impl From<&str> for SettingValue {
    fn from(v: &str) -> Self {
        SettingValue::Str(v.to_string())
    }
}

impl From<String> for SettingValue {
    fn from(v: String) -> Self {
        SettingValue::Str(v)
    }
}

/// Size-bounding policy of the owning queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyType {
    Reject,
    FlowToDisk,
    Ring,
    RingStrict,
}

impl PolicyType {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "reject" => Some(PolicyType::Reject),
            "flow_to_disk" => Some(PolicyType::FlowToDisk),
            "ring" => Some(PolicyType::Ring),
            "ring_strict" => Some(PolicyType::RingStrict),
            _ => None,
        }
    }

    /// Ring queues discard on overflow, so they never need producer flow control.
    pub fn is_ring(self) -> bool {
        matches!(self, PolicyType::Ring | PolicyType::RingStrict)
    }
}

/// Declare arguments for one queue.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueueSettings(BTreeMap<String, SettingValue>);

impl QueueSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: impl Into<SettingValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: &str, value: impl Into<SettingValue>) {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&SettingValue> {
        self.0.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn policy_type(&self) -> Option<PolicyType> {
        match self.get(POLICY_TYPE_KEY)? {
            SettingValue::Str(s) => PolicyType::parse(s),
            _ => None,
        }
    }

    /// Tolerant capacity lookup: a missing key yields `default` silently, a
    /// present but unusable value yields `default` with a warning.
    pub fn capacity(&self, key: &str, default: u64) -> u64 {
        let Some(value) = self.get(key) else {
            return default;
        };
        tracing::debug!("Value for {} specified as {}: {:?}", key, value.kind(), value);
        match value.as_capacity() {
            Some(v) => v,
            None => {
                tracing::warn!(
                    "Cannot convert {} to unsigned integer, using default ({})",
                    key,
                    default
                );
                default
            }
        }
    }
}
