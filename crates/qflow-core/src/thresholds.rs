use crate::error::{FlowError, Result};
use std::fmt::Display;

/// Capacity limits of the owning queue's size policy. Zero means unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CapacityBound {
    pub max_count: u32,
    pub max_size: u64,
}

/// The four configured flow thresholds. Zero on a stop axis means that axis
/// never triggers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ThresholdSet {
    pub stop_count: u32,
    pub resume_count: u32,
    pub stop_size: u64,
    pub resume_size: u64,
}

impl ThresholdSet {
    pub fn new(stop_count: u32, resume_count: u32, stop_size: u64, resume_size: u64) -> Self {
        Self {
            stop_count,
            resume_count,
            stop_size,
            resume_size,
        }
    }

    /// Checks the thresholds against each other and the queue's capacity,
    /// collapsing an unset resume threshold onto its stop threshold.
    ///
    /// Never clamps: any inconsistency is returned as `InvalidConfiguration`.
    pub fn validate(mut self, queue: &str, bound: CapacityBound) -> Result<Self> {
        validate_axis(bound.max_count, self.stop_count, &mut self.resume_count, "count", queue)?;
        validate_axis(bound.max_size, self.stop_size, &mut self.resume_size, "size", queue)?;
        Ok(self)
    }
}

fn validate_axis<T>(max: T, stop: T, resume: &mut T, kind: &str, queue: &str) -> Result<()>
where
    T: Copy + Ord + Default + Display,
{
    let zero = T::default();
    if *resume > stop {
        return Err(FlowError::invalid(
            format!("Queue \"{}\"", queue),
            format!(
                "qpid.flow_resume_{kind}={} must not exceed qpid.flow_stop_{kind}={}",
                resume, stop
            ),
        ));
    }
    if *resume == zero {
        *resume = stop;
    }
    if max != zero && max < stop {
        return Err(FlowError::invalid(
            format!("Queue \"{}\"", queue),
            format!(
                "qpid.flow_stop_{kind}={} must not exceed qpid.max_{kind}={}",
                stop, max
            ),
        ));
    }
    Ok(())
}
