//! # qflow-codec: Flow Limit Persistence Layout
//!
//! Fixed-width big-endian record written by the store on checkpoint and read
//! back on recovery:
//!
//! | field          | width |
//! |----------------|-------|
//! | stop_count     | u32   |
//! | resume_count   | u32   |
//! | stop_size      | u64   |
//! | resume_size    | u64   |
//! | count          | u32   |
//! | size           | u64   |

use bytes::{Buf, BufMut};

/// Total encoded width of a [`FlowRecord`].
pub const ENCODED_SIZE: usize = 4 + 4 + 8 + 8 + 4 + 8;

static_assertions::const_assert_eq!(ENCODED_SIZE, 36);

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("flow record truncated: need {needed} bytes, have {available}")]
    Truncated { needed: usize, available: usize },
}

/// Thresholds plus live counters, as persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlowRecord {
    pub stop_count: u32,
    pub resume_count: u32,
    pub stop_size: u64,
    pub resume_size: u64,
    pub count: u32,
    pub size: u64,
}

impl FlowRecord {
    /// Appends the 36-byte layout to `buf`.
    pub fn encode<B: BufMut>(&self, buf: &mut B) {
        buf.put_u32(self.stop_count);
        buf.put_u32(self.resume_count);
        buf.put_u64(self.stop_size);
        buf.put_u64(self.resume_size);
        buf.put_u32(self.count);
        buf.put_u64(self.size);
    }

    /// Reads one record from the front of `buf`.
    ///
    /// No threshold validation happens here: recovery trusts what was
    /// checkpointed. A short buffer is left unconsumed.
    pub fn decode<B: Buf>(buf: &mut B) -> Result<Self, CodecError> {
        if buf.remaining() < ENCODED_SIZE {
            return Err(CodecError::Truncated {
                needed: ENCODED_SIZE,
                available: buf.remaining(),
            });
        }
        Ok(Self {
            stop_count: buf.get_u32(),
            resume_count: buf.get_u32(),
            stop_size: buf.get_u64(),
            resume_size: buf.get_u64(),
            count: buf.get_u32(),
            size: buf.get_u64(),
        })
    }

    #[inline(always)]
    pub const fn encoded_size() -> usize {
        ENCODED_SIZE
    }
}
