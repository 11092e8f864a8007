//! Single-owner I/O queue for peers whose backend cannot overlap operations.
//!
//! Several monitors poll the same peer at once. Backends that break under
//! overlapping GATT operations are wrapped here: every read, write, describe
//! and subscribe waits its turn on a fair (FIFO) async mutex.

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use tokio::sync::{Mutex, watch};
use tracing::trace;

use super::{ChannelProperties, NotifyFn, Peer};
use crate::channel::Channel;
use crate::error::PeerError;
use crate::subscription::Subscription;

pub struct SerializedPeer<P> {
    inner: P,
    queue: Mutex<()>,
}

impl<P: Peer> SerializedPeer<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            queue: Mutex::new(()),
        }
    }

    pub fn into_inner(self) -> P {
        self.inner
    }
}

/// Share a peer between monitors, queueing its I/O when the backend requires it.
pub fn shared_peer<P: Peer + 'static>(peer: P) -> Arc<dyn Peer> {
    if peer.concurrent_io() {
        Arc::new(peer)
    } else {
        Arc::new(SerializedPeer::new(peer))
    }
}

#[async_trait]
impl<P: Peer> Peer for SerializedPeer<P> {
    fn id(&self) -> &str {
        self.inner.id()
    }

    async fn is_connected(&self) -> Result<bool, PeerError> {
        // State queries do not touch the radio
        self.inner.is_connected().await
    }

    async fn read(&self, channel: &Channel) -> Result<Bytes, PeerError> {
        let _turn = self.queue.lock().await;
        trace!(peer = self.inner.id(), channel = channel.name, "queued read");
        self.inner.read(channel).await
    }

    async fn write(&self, channel: &Channel, value: Bytes) -> Result<(), PeerError> {
        let _turn = self.queue.lock().await;
        trace!(peer = self.inner.id(), channel = channel.name, "queued write");
        self.inner.write(channel, value).await
    }

    async fn describe(&self, channel: &Channel) -> Result<Option<ChannelProperties>, PeerError> {
        let _turn = self.queue.lock().await;
        self.inner.describe(channel).await
    }

    async fn subscribe(&self, channel: &Channel, on_data: NotifyFn) -> Result<Subscription, PeerError> {
        let _turn = self.queue.lock().await;
        self.inner.subscribe(channel, on_data).await
    }

    fn connection_state(&self) -> Result<watch::Receiver<bool>, PeerError> {
        self.inner.connection_state()
    }

    fn concurrent_io(&self) -> bool {
        true
    }
}
