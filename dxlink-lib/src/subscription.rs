//! Stop handles for monitors and push subscriptions.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Something that can be stopped. Implementations need not be idempotent;
/// [`Subscription`] guarantees `stop` reaches them at most once.
pub trait Stop: Send + Sync {
    fn stop(&self);
}

/// Adapter turning a closure into a [`Stop`].
pub struct StopFn<F>(pub F);

impl<F: Fn() + Send + Sync> Stop for StopFn<F> {
    fn stop(&self) {
        (self.0)()
    }
}

struct StopOnce {
    stopped: AtomicBool,
    inner: Box<dyn Stop>,
}

/// A single stop handle. Stopping is idempotent; clones share the same state.
#[derive(Clone)]
#[must_use = "dropping a subscription does not stop it; call `stop`"]
pub struct Subscription {
    inner: Option<Arc<StopOnce>>,
}

impl Subscription {
    pub fn new(stop: impl Stop + 'static) -> Self {
        Self {
            inner: Some(Arc::new(StopOnce {
                stopped: AtomicBool::new(false),
                inner: Box::new(stop),
            })),
        }
    }

    pub fn from_fn(f: impl Fn() + Send + Sync + 'static) -> Self {
        Self::new(StopFn(f))
    }

    /// A handle for something that never started.
    pub fn noop() -> Self {
        Self { inner: None }
    }

    pub fn is_noop(&self) -> bool {
        self.inner.is_none()
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.as_ref().is_none_or(|once| once.stopped.load(Ordering::SeqCst))
    }

    pub fn stop(&self) {
        if let Some(once) = &self.inner {
            if !once.stopped.swap(true, Ordering::SeqCst) {
                once.inner.stop();
            }
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("noop", &self.is_noop())
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

/// Several subscriptions behind one `stop`. Always valid, possibly empty.
#[derive(Debug, Clone, Default)]
#[must_use = "dropping subscriptions does not stop them; call `stop`"]
pub struct Subscriptions {
    handles: Vec<Subscription>,
}

impl Subscriptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, subscription: Subscription) {
        if !subscription.is_noop() {
            self.handles.push(subscription);
        }
    }

    pub fn extend(&mut self, other: Subscriptions) {
        self.handles.extend(other.handles);
    }

    /// Number of live handles held.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn stop(&self) {
        for handle in &self.handles {
            handle.stop();
        }
    }
}
