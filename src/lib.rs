//! # qflow
//!
//! Producer-side flow control for broker queues. Re-exports the workspace
//! crates under one roof.

pub use qflow_codec as codec;
pub use qflow_core::*;
pub use qflow_dsa as dsa;
