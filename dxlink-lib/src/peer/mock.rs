//! In-memory peer used by tests and the CLI demo.

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tracing::debug;
use uuid::Uuid;

use super::{ChannelProperties, NotifyFn, Peer};
use crate::channel::Channel;
use crate::error::PeerError;
use crate::listeners::{ListenerId, Listeners};
use crate::subscription::Subscription;

#[derive(Default)]
struct MockState {
    values: HashMap<Uuid, Bytes>,
    properties: HashMap<Uuid, ChannelProperties>,
    read_failures: HashMap<Uuid, PeerError>,
    describe_failures: HashMap<Uuid, PeerError>,
    writes: Vec<(Channel, Bytes)>,
    read_delay: Option<Duration>,
}

struct MockInner {
    id: String,
    connected: watch::Sender<bool>,
    state: Mutex<MockState>,
    notifiers: Mutex<HashMap<Uuid, Arc<Listeners<Bytes>>>>,
    reads: AtomicUsize,
    concurrent_io: bool,
}

/// A peer whose channels are plain in-memory values.
///
/// Clones share state, so a test can keep a handle to poke values, inject
/// failures or drop the connection while the code under test holds another.
#[derive(Clone)]
pub struct MockPeer {
    inner: Arc<MockInner>,
}

impl MockPeer {
    pub fn new(id: impl Into<String>) -> Self {
        Self::build(id.into(), true)
    }

    /// A mock that declares it cannot overlap operations.
    pub fn single_io(id: impl Into<String>) -> Self {
        Self::build(id.into(), false)
    }

    fn build(id: String, concurrent_io: bool) -> Self {
        let (connected, _) = watch::channel(true);
        Self {
            inner: Arc::new(MockInner {
                id,
                connected,
                state: Mutex::new(MockState::default()),
                notifiers: Mutex::new(HashMap::new()),
                reads: AtomicUsize::new(0),
                concurrent_io,
            }),
        }
    }

    /// Expose `channel` with an initial value and every property its descriptor allows.
    pub fn with_channel(self, channel: Channel, value: impl Into<Bytes>) -> Self {
        {
            let mut state = self.inner.state.lock();
            state.values.insert(channel.characteristic, value.into());
            state.properties.insert(
                channel.characteristic,
                ChannelProperties {
                    readable: true,
                    writable: true,
                    notifiable: channel.notify,
                },
            );
        }
        self
    }

    pub fn set_value(&self, channel: &Channel, value: impl Into<Bytes>) {
        self.inner.state.lock().values.insert(channel.characteristic, value.into());
    }

    pub fn value(&self, channel: &Channel) -> Option<Bytes> {
        self.inner.state.lock().values.get(&channel.characteristic).cloned()
    }

    /// Store `value` and push it to the channel's subscribers.
    pub fn notify(&self, channel: &Channel, value: impl Into<Bytes>) -> usize {
        let value = value.into();
        self.set_value(channel, value.clone());
        let listeners = self.inner.notifiers.lock().get(&channel.characteristic).cloned();
        listeners.map_or(0, |l| l.emit(&value))
    }

    pub fn fail_reads(&self, channel: &Channel, error: PeerError) {
        self.inner.state.lock().read_failures.insert(channel.characteristic, error);
    }

    pub fn fail_describe(&self, channel: &Channel, error: PeerError) {
        self.inner.state.lock().describe_failures.insert(channel.characteristic, error);
    }

    pub fn clear_failures(&self, channel: &Channel) {
        let mut state = self.inner.state.lock();
        state.read_failures.remove(&channel.characteristic);
        state.describe_failures.remove(&channel.characteristic);
    }

    /// Delay every read; lets tests race a disconnect against an in-flight read.
    pub fn set_read_delay(&self, delay: Option<Duration>) {
        self.inner.state.lock().read_delay = delay;
    }

    pub fn disconnect(&self) {
        debug!(peer = %self.inner.id, "mock disconnect");
        self.inner.connected.send_replace(false);
    }

    pub fn reconnect(&self) {
        self.inner.connected.send_replace(true);
    }

    pub fn writes(&self) -> Vec<(Channel, Bytes)> {
        self.inner.state.lock().writes.clone()
    }

    pub fn read_count(&self) -> usize {
        self.inner.reads.load(Ordering::SeqCst)
    }

    pub fn subscriber_count(&self, channel: &Channel) -> usize {
        self.inner
            .notifiers
            .lock()
            .get(&channel.characteristic)
            .map_or(0, |l| l.len())
    }

    fn connected(&self) -> bool {
        *self.inner.connected.borrow()
    }
}

#[async_trait]
impl Peer for MockPeer {
    fn id(&self) -> &str {
        &self.inner.id
    }

    async fn is_connected(&self) -> Result<bool, PeerError> {
        Ok(self.connected())
    }

    async fn read(&self, channel: &Channel) -> Result<Bytes, PeerError> {
        if !self.connected() {
            return Err(PeerError::not_connected());
        }
        self.inner.reads.fetch_add(1, Ordering::SeqCst);

        let delay = self.inner.state.lock().read_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let state = self.inner.state.lock();
        if let Some(error) = state.read_failures.get(&channel.characteristic) {
            return Err(error.clone());
        }
        state
            .values
            .get(&channel.characteristic)
            .cloned()
            .ok_or_else(|| PeerError::new(format!("Characteristic {} not found", channel.characteristic)))
    }

    async fn write(&self, channel: &Channel, value: Bytes) -> Result<(), PeerError> {
        if !self.connected() {
            return Err(PeerError::not_connected());
        }
        let mut state = self.inner.state.lock();
        state.values.insert(channel.characteristic, value.clone());
        state.writes.push((*channel, value));
        Ok(())
    }

    async fn describe(&self, channel: &Channel) -> Result<Option<ChannelProperties>, PeerError> {
        if !self.connected() {
            return Err(PeerError::not_connected());
        }
        let state = self.inner.state.lock();
        if let Some(error) = state.describe_failures.get(&channel.characteristic) {
            return Err(error.clone());
        }
        Ok(state.properties.get(&channel.characteristic).copied())
    }

    async fn subscribe(&self, channel: &Channel, on_data: NotifyFn) -> Result<Subscription, PeerError> {
        if !self.connected() {
            return Err(PeerError::not_connected());
        }
        let listeners = self
            .inner
            .notifiers
            .lock()
            .entry(channel.characteristic)
            .or_insert_with(|| Arc::new(Listeners::new()))
            .clone();
        let id: ListenerId = listeners.subscribe(move |value: &Bytes| on_data(value.clone()));
        Ok(Subscription::from_fn(move || {
            listeners.unsubscribe(id);
        }))
    }

    fn connection_state(&self) -> Result<watch::Receiver<bool>, PeerError> {
        Ok(self.inner.connected.subscribe())
    }

    fn concurrent_io(&self) -> bool {
        self.inner.concurrent_io
    }
}
