//! Listener registry with explicit subscribe/unsubscribe tokens.

use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Token returned by a subscription; pass it back to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

pub type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

pub struct Listeners<T: ?Sized> {
    next_id: AtomicU64,
    entries: Mutex<Vec<(ListenerId, Listener<T>)>>,
}

impl<T: ?Sized> Listeners<T> {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            entries: Mutex::new(Vec::new()),
        }
    }

    pub fn subscribe<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.insert(Arc::new(listener))
    }

    pub fn insert(&self, listener: Listener<T>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.entries.lock().push((id, listener));
        id
    }

    /// Returns `false` when the token was unknown or already removed.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|(entry_id, _)| *entry_id != id);
        entries.len() != before
    }

    /// Call every listener with `value`; returns how many were called.
    ///
    /// Listeners run outside the registry lock, so they may subscribe or
    /// unsubscribe from inside the callback.
    pub fn emit(&self, value: &T) -> usize {
        let snapshot = self.snapshot();
        for listener in &snapshot {
            listener(value);
        }
        snapshot.len()
    }

    /// The listeners registered right now, in subscription order.
    pub fn snapshot(&self) -> Vec<Listener<T>> {
        self.entries.lock().iter().map(|(_, l)| l.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl<T: ?Sized> Default for Listeners<T> {
    fn default() -> Self {
        Self::new()
    }
}
