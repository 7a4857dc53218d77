//! Registered sample callbacks.

use super::errors::SubscriberError;
use super::types::TimestampedSample;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

/// Identifies one registered sample callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Callback invoked with every emitted sample.
pub type SampleCallback = Arc<dyn Fn(&TimestampedSample) -> Result<(), SubscriberError> + Send + Sync>;

/// The set of live callbacks and its size.
///
/// The count is kept next to the list so lifecycle transitions can be read
/// without taking the list lock.
#[derive(Default)]
pub struct SubscriberSet {
    entries: Mutex<Vec<(SubscriptionId, SampleCallback)>>,
    count: AtomicUsize,
    next_id: AtomicU64,
}

impl SubscriberSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a callback, returning its id and the count before insertion.
    pub fn insert(&self, callback: SampleCallback) -> (SubscriptionId, usize) {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut entries = self.entries.lock();
        entries.push((id, callback));
        let previous = self.count.fetch_add(1, Ordering::SeqCst);
        (id, previous)
    }

    /// Remove a callback, returning the count after removal if it was present.
    pub fn remove(&self, id: SubscriptionId) -> Option<usize> {
        let mut entries = self.entries.lock();
        let index = entries.iter().position(|(existing, _)| *existing == id)?;
        entries.swap_remove(index);
        Some(self.count.fetch_sub(1, Ordering::SeqCst) - 1)
    }

    /// Drop every callback.
    pub fn clear(&self) -> usize {
        let mut entries = self.entries.lock();
        let removed = entries.len();
        entries.clear();
        self.count.store(0, Ordering::SeqCst);
        removed
    }

    pub fn len(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the current callbacks, taken so emission can run unlocked.
    pub fn snapshot(&self) -> Vec<(SubscriptionId, SampleCallback)> {
        self.entries.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> SampleCallback {
        Arc::new(|_: &TimestampedSample| -> Result<(), SubscriberError> { Ok(()) })
    }

    #[test]
    fn test_insert_reports_previous_count() {
        let set = SubscriberSet::new();
        let (a, before_a) = set.insert(noop());
        let (b, before_b) = set.insert(noop());

        assert_eq!(before_a, 0);
        assert_eq!(before_b, 1);
        assert_ne!(a, b);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_remove_reports_remaining_count() {
        let set = SubscriberSet::new();
        let (a, _) = set.insert(noop());
        let (b, _) = set.insert(noop());

        assert_eq!(set.remove(a), Some(1));
        assert_eq!(set.remove(a), None);
        assert_eq!(set.remove(b), Some(0));
        assert!(set.is_empty());
    }

    #[test]
    fn test_snapshot_is_detached() {
        let set = SubscriberSet::new();
        let (a, _) = set.insert(noop());
        let snapshot = set.snapshot();
        set.remove(a);

        assert_eq!(snapshot.len(), 1);
        assert!(set.snapshot().is_empty());
    }

    #[test]
    fn test_clear() {
        let set = SubscriberSet::new();
        set.insert(noop());
        set.insert(noop());
        assert_eq!(set.clear(), 2);
        assert_eq!(set.len(), 0);
    }
}
