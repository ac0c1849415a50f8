//! # qflow-core: Producer Flow Control
//!
//! Per-queue backpressure: a queue over its stop threshold withholds the
//! receipt acknowledgments of newly enqueued messages until it drains below
//! its resume threshold.

pub mod completion;
pub mod config;
pub mod error;
pub mod event;
pub mod factory;
pub mod flow;
pub mod message;
pub mod settings;
pub mod thresholds;
mod sync;

pub use completion::ReceiveCompletion;
pub use config::{current_defaults, set_defaults, BrokerFlowConfig, FlowDefaults};
pub use error::{AccountingKind, FlowError, Result};
pub use event::{FlowEvent, FlowObserver, FlowReport, FlowTrigger};
pub use factory::{create_flow_limit, FlowLimitFactory, QueueDescriptor};
pub use flow::QueueFlowLimit;
pub use message::{AckGate, Message, MessageId, QueuedMessage};
pub use settings::{PolicyType, QueueSettings, SettingValue};
pub use thresholds::{CapacityBound, ThresholdSet};

pub use qflow_codec::{FlowRecord, ENCODED_SIZE};
