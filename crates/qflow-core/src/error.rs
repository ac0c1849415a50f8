use qflow_codec::CodecError;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountingKind {
    Count,
    Size,
}

impl fmt::Display for AccountingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountingKind::Count => f.write_str("count"),
            AccountingKind::Size => f.write_str("size"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    /// Thresholds or default ratios are inconsistent. `scope` is the queue
    /// name, or "broker defaults" for the process-wide policy.
    #[error("{scope}: {reason}")]
    InvalidConfiguration { scope: String, reason: String },
    /// A dequeue without a matching enqueue.
    #[error("Flow limit {kind} underflow on dequeue. Queue={queue}")]
    Accounting { queue: String, kind: AccountingKind },
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("flow config: {0}")]
    Config(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl FlowError {
    pub(crate) fn invalid(scope: impl Into<String>, reason: impl Into<String>) -> Self {
        FlowError::InvalidConfiguration {
            scope: scope.into(),
            reason: reason.into(),
        }
    }

    pub fn is_invalid_configuration(&self) -> bool {
        matches!(self, FlowError::InvalidConfiguration { .. })
    }
}

impl From<toml::de::Error> for FlowError {
    fn from(e: toml::de::Error) -> Self {
        FlowError::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, FlowError>;
