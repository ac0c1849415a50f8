//! # qflow-dsa: Pending-Acknowledgment Index
//!
//! Holds the messages whose receipt acknowledgment is being withheld by
//! producer flow control.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use core::fmt;

/// Returned by [`PendingAckIndex::insert`] when the key is already held.
/// Carries back the value that was not inserted.
#[derive(Debug, PartialEq, Eq)]
pub struct DuplicateEntry<V>(pub V);

/// An insertion-ordered set of held messages, keyed by a stable identity.
///
/// ## Ordering
/// Every insert is stamped with a monotonically increasing sequence number.
/// `drain_ordered` releases entries oldest first, so producers are resumed in
/// the order they were stalled.
///
/// ## Identity
/// Keys are message handles (ids), never payload content. A key is present at
/// most once.
pub struct PendingAckIndex<K, V> {
    /// Arrival sequence -> (key, value).
    entries: BTreeMap<u64, (K, V)>,
    /// Key -> arrival sequence.
    by_key: BTreeMap<K, u64>,
    next_seq: u64,
}

impl<K: Ord + Copy, V> PendingAckIndex<K, V> {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            by_key: BTreeMap::new(),
            next_seq: 0,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.by_key.contains_key(key)
    }

    /// Holds `value` under `key`.
    ///
    /// # Protocol
    /// Rejects a key that is already held and hands the value back; the
    /// existing entry keeps its original arrival position.
    pub fn insert(&mut self, key: K, value: V) -> Result<(), DuplicateEntry<V>> {
        if self.by_key.contains_key(&key) {
            return Err(DuplicateEntry(value));
        }
        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);
        self.by_key.insert(key, seq);
        self.entries.insert(seq, (key, value));
        Ok(())
    }

    /// Removes a single entry by key, returning its value if it was held.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let seq = self.by_key.remove(key)?;
        self.entries.remove(&seq).map(|(_, value)| value)
    }

    /// Empties the index, returning every held value oldest first.
    pub fn drain_ordered(&mut self) -> Vec<V> {
        self.by_key.clear();
        let entries = core::mem::take(&mut self.entries);
        entries.into_values().map(|(_, value)| value).collect()
    }

    /// Iterates held keys in arrival order.
    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.entries.values().map(|(key, _)| key)
    }
}

impl<K: Ord + Copy, V> Default for PendingAckIndex<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: fmt::Debug, V> fmt::Debug for PendingAckIndex<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingAckIndex")
            .field("held", &self.entries.len())
            .field("next_seq", &self.next_seq)
            .finish()
    }
}
