use crate::message::AckGate;
use std::sync::Arc;
use tokio::sync::watch;

/// Counts outstanding completers on a message's receipt.
///
/// The producer session sends its acknowledgment once `outstanding()` drops
/// back to zero. Flow control is one completer; the store may be another.
#[derive(Clone)]
pub struct ReceiveCompletion {
    outstanding: Arc<watch::Sender<usize>>,
}

impl ReceiveCompletion {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0);
        Self {
            outstanding: Arc::new(tx),
        }
    }

    pub fn start_completer(&self) {
        self.outstanding.send_modify(|n| *n += 1);
    }

    /// Returns false if there was nothing outstanding to finish.
    pub fn finish_completer(&self) -> bool {
        self.outstanding.send_if_modified(|n| {
            if *n == 0 {
                return false;
            }
            *n -= 1;
            true
        })
    }

    pub fn outstanding(&self) -> usize {
        *self.outstanding.borrow()
    }

    pub fn is_complete(&self) -> bool {
        self.outstanding() == 0
    }

    /// Resolves once every completer has finished.
    pub async fn wait(&self) {
        let mut rx = self.outstanding.subscribe();
        // The sender lives as long as `self`, so the channel cannot close here.
        let _ = rx.wait_for(|n| *n == 0).await;
    }
}

impl Default for ReceiveCompletion {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ReceiveCompletion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReceiveCompletion")
            .field("outstanding", &self.outstanding())
            .finish()
    }
}

impl AckGate for ReceiveCompletion {
    fn withhold(&self) {
        self.start_completer();
    }

    fn release(&self) {
        if !self.finish_completer() {
            tracing::warn!("ReceiveCompletion: release without a withheld completer ignored");
        }
    }
}
